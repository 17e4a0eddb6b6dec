//! Record data and the record registry.
//!
//! The record data of a resource record is decoded by a function looked up
//! by record type in a [`Registry`]. The registry returned by
//! [`Registry::standard`] knows the types a stub resolver typically needs.
//! All other types are kept as [`UnknownRecordData`] holding the raw octets,
//! so a response never fails to decode merely because it contains a type
//! nobody registered.
//!
//! The types are grouped into submodules for the RFCs they are defined in.
//! All types are also re-exported at the top level here.

pub mod rfc1035;
pub mod rfc3596;
pub mod rfc6891;

pub use self::rfc1035::{Cname, Mx, Ns, Ptr, Soa, Txt, A};
pub use self::rfc3596::Aaaa;
pub use self::rfc6891::Opt;

use crate::base::iana::Rtype;
use crate::base::record::{Record, RecordHeader};
use crate::base::wire::{ParseError, Parser};
use bytes::Bytes;
use core::fmt;
use std::collections::HashMap;

//------------ RecordData ----------------------------------------------------

/// The decoded data of a resource record.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum RecordData {
    A(A),
    Aaaa(Aaaa),
    Ns(Ns),
    Cname(Cname),
    Ptr(Ptr),
    Mx(Mx),
    Txt(Txt),
    Soa(Soa),
    Opt(Opt),
    Unknown(UnknownRecordData),
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RecordData::A(ref data) => data.fmt(f),
            RecordData::Aaaa(ref data) => data.fmt(f),
            RecordData::Ns(ref data) => data.fmt(f),
            RecordData::Cname(ref data) => data.fmt(f),
            RecordData::Ptr(ref data) => data.fmt(f),
            RecordData::Mx(ref data) => data.fmt(f),
            RecordData::Txt(ref data) => data.fmt(f),
            RecordData::Soa(ref data) => data.fmt(f),
            RecordData::Opt(ref data) => data.fmt(f),
            RecordData::Unknown(ref data) => data.fmt(f),
        }
    }
}

//------------ UnknownRecordData ---------------------------------------------

/// Record data for a type without a registered decoder.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownRecordData {
    rtype: Rtype,
    data: Bytes,
}

impl UnknownRecordData {
    pub fn new(rtype: Rtype, data: Bytes) -> Self {
        UnknownRecordData { rtype, data }
    }

    pub fn rtype(&self) -> Rtype {
        self.rtype
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn parse(
        header: &RecordHeader,
        parser: &mut Parser,
    ) -> Result<Self, ParseError> {
        Ok(UnknownRecordData {
            rtype: header.rtype(),
            data: parser.parse_bytes(usize::from(header.rdlen()))?,
        })
    }
}

/// Displays the data in the generic format of RFC 3597.
impl fmt::Display for UnknownRecordData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\\# {}", self.data.len())?;
        if !self.data.is_empty() {
            f.write_str(" ")?;
            for ch in self.data.iter() {
                write!(f, "{:02x}", ch)?;
            }
        }
        Ok(())
    }
}

//------------ Registry ------------------------------------------------------

/// A function decoding the record data of one record type.
///
/// The function receives the already parsed record header and a parser
/// positioned at the start of the record data. It must consume exactly
/// `header.rdlen()` octets.
pub type DecodeFn =
    fn(&RecordHeader, &mut Parser) -> Result<RecordData, ParseError>;

/// A table of record data decoders keyed by record type.
#[derive(Clone, Default)]
pub struct Registry {
    decoders: HashMap<Rtype, DecodeFn>,
}

impl Registry {
    /// Creates an empty registry.
    ///
    /// All records decoded with it end up as [`RecordData::Unknown`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with decoders for the common record types.
    pub fn standard() -> Self {
        let mut res = Self::new();
        res.register(Rtype::A, |_, parser| A::parse(parser).map(RecordData::A));
        res.register(Rtype::AAAA, |_, parser| {
            Aaaa::parse(parser).map(RecordData::Aaaa)
        });
        res.register(Rtype::NS, |_, parser| {
            Ns::parse(parser).map(RecordData::Ns)
        });
        res.register(Rtype::CNAME, |_, parser| {
            Cname::parse(parser).map(RecordData::Cname)
        });
        res.register(Rtype::PTR, |_, parser| {
            Ptr::parse(parser).map(RecordData::Ptr)
        });
        res.register(Rtype::MX, |_, parser| {
            Mx::parse(parser).map(RecordData::Mx)
        });
        res.register(Rtype::TXT, |header, parser| {
            Txt::parse(header, parser).map(RecordData::Txt)
        });
        res.register(Rtype::SOA, |_, parser| {
            Soa::parse(parser).map(RecordData::Soa)
        });
        res.register(Rtype::OPT, |header, parser| {
            Opt::parse(header, parser).map(RecordData::Opt)
        });
        res
    }

    /// Registers a decoder, returning the one it replaces.
    pub fn register(
        &mut self,
        rtype: Rtype,
        decode: DecodeFn,
    ) -> Option<DecodeFn> {
        self.decoders.insert(rtype, decode)
    }

    /// Returns the decoder for a record type.
    pub fn get(&self, rtype: Rtype) -> Option<DecodeFn> {
        self.decoders.get(&rtype).copied()
    }

    /// Decodes a complete record from the parser.
    ///
    /// Fails with [`ParseError::Desync`] if the decoder consumed any other
    /// number of octets than the record data length.
    pub fn decode_record(
        &self,
        parser: &mut Parser,
    ) -> Result<Record, ParseError> {
        let header = RecordHeader::parse(parser)?;
        let rdlen = header.rdlen();
        parser.check_len(usize::from(rdlen))?;
        let start = parser.pos();
        let data = match self.get(header.rtype()) {
            Some(decode) => decode(&header, parser)?,
            None => RecordData::Unknown(UnknownRecordData::parse(
                &header, parser,
            )?),
        };
        let consumed = parser.pos() - start;
        if consumed != usize::from(rdlen) {
            return Err(ParseError::Desync {
                rtype: header.rtype(),
                expected: rdlen,
                consumed,
            });
        }
        Ok(Record::new(header, data))
    }
}

//--- Debug

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut types: Vec<_> = self.decoders.keys().collect();
        types.sort();
        f.debug_struct("Registry").field("types", &types).finish()
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use std::net::Ipv4Addr;

    /// An A record for `a.` followed by a TYPE65280 record for `b.`.
    const RECORDS: &[u8] = b"\x01a\x00\x00\x01\x00\x01\x00\x00\x0e\x10\x00\x04\
          \xc0\x00\x02\x01\
          \x01b\x00\xff\x00\x00\x01\x00\x00\x00\x3c\x00\x03\
          \x01\x02\x03";

    #[test]
    fn decode_known_and_unknown() {
        let registry = Registry::standard();
        let mut parser = Parser::new(Bytes::from_static(RECORDS));

        let record = registry.decode_record(&mut parser).unwrap();
        assert_eq!(record.owner().to_string(), "a.");
        assert_eq!(record.ttl(), 3600);
        assert_eq!(
            record.data(),
            &RecordData::A(A::new(Ipv4Addr::new(192, 0, 2, 1)))
        );

        let record = registry.decode_record(&mut parser).unwrap();
        assert_eq!(record.rtype(), Rtype::from_int(0xff00));
        match record.data() {
            RecordData::Unknown(data) => {
                assert_eq!(data.data().as_ref(), b"\x01\x02\x03")
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(record.data().to_string(), "\\# 3 010203");
        assert_eq!(parser.remaining(), 0);
    }

    #[test]
    fn empty_registry_keeps_raw_data() {
        let mut parser = Parser::new(Bytes::from_static(RECORDS));
        let record = Registry::new().decode_record(&mut parser).unwrap();
        assert!(matches!(record.data(), RecordData::Unknown(_)));
        assert_eq!(parser.pos(), 17);
    }

    #[test]
    fn decoder_consuming_too_little_is_desync() {
        let mut registry = Registry::standard();
        registry.register(Rtype::A, |header, parser| {
            parser.advance(2)?;
            Ok(RecordData::Unknown(UnknownRecordData::new(
                header.rtype(),
                Bytes::new(),
            )))
        });
        let mut parser = Parser::new(Bytes::from_static(RECORDS));
        assert_eq!(
            registry.decode_record(&mut parser),
            Err(ParseError::Desync {
                rtype: Rtype::A,
                expected: 4,
                consumed: 2
            })
        );
    }

    #[test]
    fn decoder_consuming_too_much_is_desync() {
        let mut registry = Registry::new();
        registry.register(Rtype::A, |header, parser| {
            parser.advance(6)?;
            Ok(RecordData::Unknown(UnknownRecordData::new(
                header.rtype(),
                Bytes::new(),
            )))
        });
        let mut parser = Parser::new(Bytes::from_static(RECORDS));
        assert!(matches!(
            registry.decode_record(&mut parser),
            Err(ParseError::Desync { consumed: 6, .. })
        ));
    }

    #[test]
    fn short_record_data() {
        let mut parser =
            Parser::new(Bytes::from_static(&RECORDS[..16]));
        assert_eq!(
            Registry::standard().decode_record(&mut parser),
            Err(ParseError::ShortInput)
        );
    }
}
