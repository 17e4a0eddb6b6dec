//! The header of a DNS message.
//!
//! Each DNS message starts with a twelve octet long header section
//! containing some general information related to the message as well as
//! the number of records in each of the four sections that follow the
//! header. Its content and format are defined in section 4.1.1 of
//! [RFC 1035].
//!
//! The header is split into two types: [`Header`] contains the ID and the
//! flags word, [`HeaderCounts`] the four section counts.
//!
//! [RFC 1035]: https://tools.ietf.org/html/rfc1035

use super::iana::{Opcode, Rcode};
use super::wire::{ComposeError, Composer, ParseError, Parser};
use core::fmt;

//------------ Header --------------------------------------------------------

/// The first part of the header of a DNS message.
///
/// The data is layed out like this:
///
/// ```text
///                                 1  1  1  1  1  1
///   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      ID                       |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |QR|   Opcode  |AA|TC|RD|RA|Z |AD|CD|   RCODE   |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// The basic structure and most of the fields are defined in [RFC 1035],
/// except for the AD and CD flags, which are defined in [RFC 4035].
///
/// [RFC 1035]: https://tools.ietf.org/html/rfc1035
/// [RFC 4035]: https://tools.ietf.org/html/rfc4035
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Header {
    id: u16,
    bits: u16,
}

const QR: u16 = 0x8000;
const AA: u16 = 0x0400;
const TC: u16 = 0x0200;
const RD: u16 = 0x0100;
const RA: u16 = 0x0080;
const Z: u16 = 0x0040;
const AD: u16 = 0x0020;
const CD: u16 = 0x0010;

/// # Creation and Conversion
///
impl Header {
    /// Creates a new header.
    ///
    /// All fields are zero or false, so the opcode is [`Opcode::QUERY`]
    /// and the response code is [`Rcode::NOERROR`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a header from the ID and the raw flags word.
    pub fn from_parts(id: u16, bits: u16) -> Self {
        Header { id, bits }
    }

    /// Returns the raw flags word.
    pub fn bits(self) -> u16 {
        self.bits
    }

    /// Takes the header from the beginning of a parser.
    pub fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        Ok(Header {
            id: parser.parse_u16_be()?,
            bits: parser.parse_u16_be()?,
        })
    }

    pub fn compose(self, target: &mut Composer) -> Result<(), ComposeError> {
        target.append_u16_be(self.id)?;
        target.append_u16_be(self.bits)
    }
}

/// # Field Access
///
impl Header {
    /// Returns the value of the ID field.
    ///
    /// The ID is chosen by whoever created a query and is copied into the
    /// response by a server. It allows matching responses to queries.
    pub fn id(self) -> u16 {
        self.id
    }

    pub fn set_id(&mut self, value: u16) {
        self.id = value
    }

    /// Returns whether the message is a response.
    pub fn qr(self) -> bool {
        self.get(QR)
    }

    pub fn set_qr(&mut self, set: bool) {
        self.set(QR, set)
    }

    /// Returns the value of the Opcode field.
    pub fn opcode(self) -> Opcode {
        Opcode::from_int(((self.bits >> 11) & 0x0F) as u8)
    }

    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.bits = self.bits & !0x7800
            | (u16::from(opcode.to_int() & 0x0F) << 11);
    }

    /// Returns all flags contained in the header.
    pub fn flags(self) -> Flags {
        Flags {
            qr: self.qr(),
            aa: self.aa(),
            tc: self.tc(),
            rd: self.rd(),
            ra: self.ra(),
            ad: self.ad(),
            cd: self.cd(),
        }
    }

    /// Returns whether the authoritative answer bit is set.
    pub fn aa(self) -> bool {
        self.get(AA)
    }

    pub fn set_aa(&mut self, set: bool) {
        self.set(AA, set)
    }

    /// Returns whether the truncation bit is set.
    ///
    /// A server sets this bit if the response didn’t fit into the message.
    /// The query should then be retried over a stream transport.
    pub fn tc(self) -> bool {
        self.get(TC)
    }

    pub fn set_tc(&mut self, set: bool) {
        self.set(TC, set)
    }

    /// Returns whether the recursion desired bit is set.
    pub fn rd(self) -> bool {
        self.get(RD)
    }

    pub fn set_rd(&mut self, set: bool) {
        self.set(RD, set)
    }

    /// Returns whether the recursion available bit is set.
    pub fn ra(self) -> bool {
        self.get(RA)
    }

    pub fn set_ra(&mut self, set: bool) {
        self.set(RA, set)
    }

    /// Returns whether the reserved bit is set.
    pub fn z(self) -> bool {
        self.get(Z)
    }

    pub fn set_z(&mut self, set: bool) {
        self.set(Z, set)
    }

    /// Returns whether the authentic data bit is set.
    pub fn ad(self) -> bool {
        self.get(AD)
    }

    pub fn set_ad(&mut self, set: bool) {
        self.set(AD, set)
    }

    /// Returns whether the checking disabled bit is set.
    pub fn cd(self) -> bool {
        self.get(CD)
    }

    pub fn set_cd(&mut self, set: bool) {
        self.set(CD, set)
    }

    /// Returns the value of the four bit RCODE field.
    pub fn rcode(self) -> Rcode {
        Rcode::masked(self.bits as u8)
    }

    pub fn set_rcode(&mut self, rcode: Rcode) {
        self.bits = self.bits & !0x000F | u16::from(rcode.to_int() & 0x0F);
    }

    fn get(self, mask: u16) -> bool {
        self.bits & mask != 0
    }

    fn set(&mut self, mask: u16, set: bool) {
        if set {
            self.bits |= mask
        } else {
            self.bits &= !mask
        }
    }
}

//------------ Flags ---------------------------------------------------------

/// The flags contained in the DNS message header.
///
/// Displays as a space separated list of the upper case names of all set
/// flags, e.g., `QR RD RA`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Flags {
    pub qr: bool,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub ad: bool,
    pub cd: bool,
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = [
            (self.qr, "QR"),
            (self.aa, "AA"),
            (self.tc, "TC"),
            (self.rd, "RD"),
            (self.ra, "RA"),
            (self.ad, "AD"),
            (self.cd, "CD"),
        ];
        let mut sep = "";
        for (set, name) in names {
            if set {
                write!(f, "{}{}", sep, name)?;
                sep = " ";
            }
        }
        Ok(())
    }
}

//------------ HeaderCounts --------------------------------------------------

/// The section count part of the header section of a DNS message.
///
/// The counters are arranged in the same order as the sections themselves:
/// QDCOUNT for the question section, ANCOUNT for the answer section,
/// NSCOUNT for the authority section, and ARCOUNT for the additional
/// section.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HeaderCounts {
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl HeaderCounts {
    pub fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        Ok(HeaderCounts {
            qdcount: parser.parse_u16_be()?,
            ancount: parser.parse_u16_be()?,
            nscount: parser.parse_u16_be()?,
            arcount: parser.parse_u16_be()?,
        })
    }

    pub fn compose(self, target: &mut Composer) -> Result<(), ComposeError> {
        target.append_u16_be(self.qdcount)?;
        target.append_u16_be(self.ancount)?;
        target.append_u16_be(self.nscount)?;
        target.append_u16_be(self.arcount)
    }
}

//============ Testing =======================================================
