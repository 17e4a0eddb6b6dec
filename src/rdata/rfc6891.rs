//! Record data from [RFC 6891]: EDNS(0) and the OPT pseudo-record.
//!
//! The OPT record repurposes the fields of the record header. The class
//! carries the sender’s UDP payload size and the TTL carries the upper
//! eight bits of the extended response code, the EDNS version, and the
//! DO flag:
//!
//! ```text
//!                 +0 (MSB)                            +1 (LSB)
//!      +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//!   0: |         EXTENDED-RCODE        |            VERSION            |
//!      +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//!   2: | DO|                           Z                               |
//!      +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//! ```
//!
//! [RFC 6891]: https://tools.ietf.org/html/rfc6891

use crate::base::iana::{Class, OptRcode, Rcode, Rtype};
use crate::base::record::RecordHeader;
use crate::base::wire::{ComposeError, Composer, ParseError, Parser};
use bytes::Bytes;
use core::fmt;

/// The DO bit within the TTL field.
const DNSSEC_OK: u32 = 0x8000;

//------------ Opt -----------------------------------------------------------

/// The content of an OPT pseudo-record.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Opt {
    udp_payload_size: u16,
    ext_rcode: u8,
    version: u8,
    dnssec_ok: bool,
    options: Bytes,
}

impl Opt {
    /// Creates an OPT record for a request.
    pub fn new(udp_payload_size: u16, dnssec_ok: bool) -> Self {
        Opt {
            udp_payload_size,
            ext_rcode: 0,
            version: 0,
            dnssec_ok,
            options: Bytes::new(),
        }
    }

    /// Returns the UDP payload size the sender can receive.
    pub fn udp_payload_size(&self) -> u16 {
        self.udp_payload_size
    }

    /// Returns the upper eight bits of the extended response code.
    pub fn ext_rcode(&self) -> u8 {
        self.ext_rcode
    }

    /// Returns the full response code given the header’s code.
    pub fn rcode(&self, header_rcode: Rcode) -> OptRcode {
        OptRcode::from_parts(header_rcode, self.ext_rcode)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn dnssec_ok(&self) -> bool {
        self.dnssec_ok
    }

    /// Returns the raw options.
    pub fn options(&self) -> &Bytes {
        &self.options
    }

    /// Returns the value of the TTL field.
    fn ttl(&self) -> u32 {
        let mut ttl =
            u32::from(self.ext_rcode) << 24 | u32::from(self.version) << 16;
        if self.dnssec_ok {
            ttl |= DNSSEC_OK
        }
        ttl
    }

    /// Decodes the record from its header and data.
    pub fn parse(
        header: &RecordHeader,
        parser: &mut Parser,
    ) -> Result<Self, ParseError> {
        let ttl = header.ttl() as u32;
        Ok(Opt {
            udp_payload_size: header.class().to_int(),
            ext_rcode: (ttl >> 24) as u8,
            version: (ttl >> 16) as u8,
            dnssec_ok: ttl & DNSSEC_OK != 0,
            options: parser.parse_bytes(usize::from(header.rdlen()))?,
        })
    }

    /// Appends the complete OPT record with the root as owner.
    pub fn compose_record(
        &self,
        target: &mut Composer,
    ) -> Result<(), ComposeError> {
        let rdlen = u16::try_from(self.options.len())
            .map_err(|_| ComposeError::ShortBuf)?;
        target.append_u8(0)?;
        Rtype::OPT.compose(target)?;
        Class::from_int(self.udp_payload_size).compose(target)?;
        target.append_u32_be(self.ttl())?;
        target.append_u16_be(rdlen)?;
        target.append_slice(&self.options)
    }
}

impl fmt::Display for Opt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "OPT udp={} version={} ext_rcode={}",
            self.udp_payload_size, self.version, self.ext_rcode
        )?;
        if self.dnssec_ok {
            f.write_str(" do")?;
        }
        Ok(())
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::rdata::{RecordData, Registry};

    #[test]
    fn compose_and_decode() {
        let mut target = Composer::new();
        Opt::new(4096, true).compose_record(&mut target).unwrap();
        assert_eq!(
            target.as_slice(),
            b"\x00\x00\x29\x10\x00\x00\x00\x80\x00\x00\x00"
        );

        let mut parser = Parser::new(target.finish());
        let record = Registry::standard().decode_record(&mut parser).unwrap();
        match record.into_data() {
            RecordData::Opt(opt) => {
                assert_eq!(opt.udp_payload_size(), 4096);
                assert!(opt.dnssec_ok());
                assert_eq!(opt.version(), 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn extended_rcode() {
        let octets =
            Bytes::from_static(b"\x00\x00\x29\x04\xd0\x01\x00\x00\x00\x00\x00");
        let mut parser = Parser::new(octets);
        let header = RecordHeader::parse(&mut parser).unwrap();
        let opt = Opt::parse(&header, &mut parser).unwrap();
        assert_eq!(opt.udp_payload_size(), 1232);
        assert_eq!(opt.ext_rcode(), 1);
        assert!(!opt.dnssec_ok());
        assert_eq!(opt.rcode(Rcode::NOERROR), OptRcode::BADVERS);
    }
}
