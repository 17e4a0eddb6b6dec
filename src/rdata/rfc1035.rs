//! Record data from [RFC 1035]: initial record types.
//!
//! [RFC 1035]: https://tools.ietf.org/html/rfc1035

use crate::base::name::{escape, Name};
use crate::base::record::RecordHeader;
use crate::base::wire::{ParseError, Parser};
use bytes::Bytes;
use core::fmt;
use std::net::Ipv4Addr;

//------------ A -------------------------------------------------------------

/// A record data.
///
/// A records convey the IPv4 address of a host.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct A {
    addr: Ipv4Addr,
}

impl A {
    pub fn new(addr: Ipv4Addr) -> Self {
        A { addr }
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        parser.parse_ipv4().map(Self::new)
    }
}

impl fmt::Display for A {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.addr.fmt(f)
    }
}

//------------ Record types containing a single name -------------------------

macro_rules! name_type {
    ( $(#[$attr:meta])* $target:ident, $field:ident ) => {
        $(#[$attr])*
        #[derive(Clone, Debug, Eq, Hash, PartialEq)]
        pub struct $target {
            $field: Name,
        }

        impl $target {
            pub fn new($field: Name) -> Self {
                $target { $field }
            }

            pub fn $field(&self) -> &Name {
                &self.$field
            }

            pub fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
                Name::parse(parser).map(Self::new)
            }
        }

        impl fmt::Display for $target {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                self.$field.fmt(f)
            }
        }
    };
}

name_type! {
    /// NS record data.
    ///
    /// NS records specify hosts that are authoritative for a class and
    /// domain.
    Ns, nsdname
}

name_type! {
    /// CNAME record data.
    ///
    /// The CNAME record specifies the canonical or primary name for domain
    /// name alias.
    Cname, cname
}

name_type! {
    /// PTR record data.
    ///
    /// PTR records are used in special domains to point to some other
    /// location in the domain space. Most notably, they map addresses back
    /// to host names.
    Ptr, ptrdname
}

//------------ Mx ------------------------------------------------------------

/// Mx record data.
///
/// The Mx record specifies a host willing to serve as a mail exchange for
/// the owner name.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Mx {
    preference: u16,
    exchange: Name,
}

impl Mx {
    pub fn new(preference: u16, exchange: Name) -> Self {
        Mx {
            preference,
            exchange,
        }
    }

    /// The preference for this record.
    ///
    /// Lower values are preferred.
    pub fn preference(&self) -> u16 {
        self.preference
    }

    pub fn exchange(&self) -> &Name {
        &self.exchange
    }

    pub fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        Ok(Mx::new(parser.parse_u16_be()?, Name::parse(parser)?))
    }
}

impl fmt::Display for Mx {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.preference, self.exchange)
    }
}

//------------ Txt -----------------------------------------------------------

/// Txt record data.
///
/// Txt records hold descriptive text. The data is a sequence of character
/// strings of up to 255 octets each.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Txt {
    strings: Vec<Bytes>,
}

impl Txt {
    pub fn new(strings: Vec<Bytes>) -> Self {
        Txt { strings }
    }

    /// Returns the character strings.
    pub fn strings(&self) -> &[Bytes] {
        &self.strings
    }

    /// Returns the character strings lossily converted to text.
    pub fn text(&self) -> Vec<String> {
        self.strings
            .iter()
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect()
    }

    /// Takes the character strings making up the record data.
    ///
    /// Consumes exactly the record data length. A character string
    /// reaching past the end of the record data is an error.
    pub fn parse(
        header: &RecordHeader,
        parser: &mut Parser,
    ) -> Result<Self, ParseError> {
        let end = parser.pos() + usize::from(header.rdlen());
        let mut strings = Vec::new();
        while parser.pos() < end {
            let len = usize::from(parser.parse_u8()?);
            if parser.pos() + len > end {
                return Err(ParseError::form_error(
                    "character string exceeds record data",
                ));
            }
            strings.push(parser.parse_bytes(len)?);
        }
        Ok(Txt { strings })
    }
}

impl fmt::Display for Txt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut sep = "";
        for s in &self.strings {
            write!(f, "{}\"{}\"", sep, escape(s))?;
            sep = " ";
        }
        Ok(())
    }
}

//------------ Soa -----------------------------------------------------------

/// Soa record data.
///
/// Soa records mark the top of a zone and contain information pertinent
/// to name server maintenance operations.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Soa {
    mname: Name,
    rname: Name,
    serial: u32,
    refresh: u32,
    retry: u32,
    expire: u32,
    minimum: u32,
}

impl Soa {
    pub fn new(
        mname: Name,
        rname: Name,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    ) -> Self {
        Soa {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        }
    }

    /// The primary name server for the zone.
    pub fn mname(&self) -> &Name {
        &self.mname
    }

    /// The mailbox for the person responsible for this zone.
    pub fn rname(&self) -> &Name {
        &self.rname
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn refresh(&self) -> u32 {
        self.refresh
    }

    pub fn retry(&self) -> u32 {
        self.retry
    }

    pub fn expire(&self) -> u32 {
        self.expire
    }

    /// The minimum TTL to be exported with any RR from this zone.
    pub fn minimum(&self) -> u32 {
        self.minimum
    }

    pub fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        Ok(Soa::new(
            Name::parse(parser)?,
            Name::parse(parser)?,
            parser.parse_u32_be()?,
            parser.parse_u32_be()?,
            parser.parse_u32_be()?,
            parser.parse_u32_be()?,
            parser.parse_u32_be()?,
        ))
    }
}

impl fmt::Display for Soa {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.mname,
            self.rname,
            self.serial,
            self.refresh,
            self.retry,
            self.expire,
            self.minimum
        )
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::iana::{Class, Rtype};

    fn txt_header(rdlen: u16) -> RecordHeader {
        RecordHeader::new(Name::root(), Rtype::TXT, Class::IN, 0, rdlen)
    }

    #[test]
    fn parse_mx_with_compressed_exchange() {
        // `mail.` at offset 0, then MX data pointing into it.
        let octets = Bytes::from_static(b"\x04mail\x00\x00\x0a\xc0\x00");
        let mut parser = Parser::at(octets, 6).unwrap();
        let mx = Mx::parse(&mut parser).unwrap();
        assert_eq!(mx.preference(), 10);
        assert_eq!(mx.to_string(), "10 mail.");
        assert_eq!(parser.remaining(), 0);
    }

    #[test]
    fn parse_txt() {
        let octets = Bytes::from_static(b"\x05hello\x07w\"or\\ld\x00");
        let mut parser = Parser::new(octets);
        let txt = Txt::parse(&txt_header(15), &mut parser).unwrap();
        assert_eq!(txt.text(), ["hello", "w\"or\\ld", ""]);
        assert_eq!(txt.to_string(), "\"hello\" \"w\\\"or\\\\ld\" \"\"");
    }

    #[test]
    fn parse_txt_overlong_string() {
        let octets = Bytes::from_static(b"\x05hello\x07world!!");
        let mut parser = Parser::new(octets);
        assert!(matches!(
            Txt::parse(&txt_header(10), &mut parser),
            Err(ParseError::Form(_))
        ));
    }

    #[test]
    fn parse_soa() {
        let octets = Bytes::from_static(
            b"\x02ns\x00\x05admin\x00\
              \x00\x00\x00\x01\x00\x00\x0e\x10\x00\x00\x07\x08\
              \x00\x09\x3a\x80\x00\x00\x01\x2c",
        );
        let soa = Soa::parse(&mut Parser::new(octets)).unwrap();
        assert_eq!(soa.mname().to_string(), "ns.");
        assert_eq!(soa.serial(), 1);
        assert_eq!(soa.minimum(), 300);
        assert_eq!(soa.to_string(), "ns. admin. 1 3600 1800 604800 300");
    }
}
