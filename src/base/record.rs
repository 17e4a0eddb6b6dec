//! Resource Records.
//!
//! All records share a common envelope, the [`RecordHeader`], consisting of
//! the owner name, record type, class, TTL, and the length of the record
//! data. The record data itself is decoded by a
//! [`Registry`][crate::rdata::Registry] into a [`RecordData`] value.

use super::iana::{Class, Rtype};
use super::name::Name;
use super::wire::{ParseError, Parser};
use crate::rdata::RecordData;
use core::fmt;

//------------ RecordHeader --------------------------------------------------

/// The header of a resource record.
///
/// The TTL is kept as the signed 32 bit value it is on the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordHeader {
    owner: Name,
    rtype: Rtype,
    class: Class,
    ttl: i32,
    rdlen: u16,
}

impl RecordHeader {
    pub fn new(
        owner: Name,
        rtype: Rtype,
        class: Class,
        ttl: i32,
        rdlen: u16,
    ) -> Self {
        RecordHeader {
            owner,
            rtype,
            class,
            ttl,
            rdlen,
        }
    }

    /// Takes a record header from the parser.
    ///
    /// The parser is left at the start of the record data.
    pub fn parse(parser: &mut Parser) -> Result<Self, ParseError> {
        Ok(RecordHeader {
            owner: Name::parse(parser)?,
            rtype: Rtype::parse(parser)?,
            class: Class::parse(parser)?,
            ttl: parser.parse_i32_be()?,
            rdlen: parser.parse_u16_be()?,
        })
    }

    pub fn owner(&self) -> &Name {
        &self.owner
    }

    pub fn rtype(&self) -> Rtype {
        self.rtype
    }

    pub fn class(&self) -> Class {
        self.class
    }

    pub fn ttl(&self) -> i32 {
        self.ttl
    }

    /// Returns the length of the record data in the message.
    pub fn rdlen(&self) -> u16 {
        self.rdlen
    }
}

//------------ Record --------------------------------------------------------

/// A resource record with decoded data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    header: RecordHeader,
    data: RecordData,
}

impl Record {
    pub fn new(header: RecordHeader, data: RecordData) -> Self {
        Record { header, data }
    }

    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    pub fn owner(&self) -> &Name {
        &self.header.owner
    }

    pub fn rtype(&self) -> Rtype {
        self.header.rtype
    }

    pub fn class(&self) -> Class {
        self.header.class
    }

    pub fn ttl(&self) -> i32 {
        self.header.ttl
    }

    pub fn data(&self) -> &RecordData {
        &self.data
    }

    pub fn into_data(self) -> RecordData {
        self.data
    }

    /// Returns a copy of the record with its TTL reduced by `secs`.
    ///
    /// The result never drops below zero.
    #[must_use]
    pub fn aged(&self, secs: u32) -> Self {
        let mut res = self.clone();
        let secs = i32::try_from(secs).unwrap_or(i32::MAX);
        res.header.ttl = self.header.ttl.saturating_sub(secs).max(0);
        res
    }
}

//--- Display

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.header.owner,
            self.header.ttl,
            self.header.class,
            self.header.rtype,
            self.data
        )
    }
}
