//! Basics.
//!
//! This module provides the types for working with DNS data in wire
//! format: a read and a write cursor over message octets, domain names
//! with compression handling, the message header, questions, resource
//! records, and complete messages.
//!
//! ## Parsing and Composing Messages
//!
//! We use the term *parsing* for extracting data from a wire-format
//! representation and *composing* for producing such a representation.
//!
//! Both parsing and composing happen on buffers holding a complete DNS
//! message. This is necessary because compressed domain names refer to
//! other parts of the message by absolute offset. Parsing happens through
//! a [`Parser`][wire::Parser] and never reads beyond the end of the
//! message. Composing happens through a [`Composer`][wire::Composer] with
//! a fixed capacity.
//!
//! Record data is decoded through a [`Registry`][crate::rdata::Registry]
//! which maps record types to decoding functions.

pub use self::header::{Header, HeaderCounts};
pub use self::message::{Message, Request};
pub use self::name::Name;
pub use self::question::Question;
pub use self::record::{Record, RecordHeader};
pub use self::wire::{ComposeError, Composer, ParseError, Parser};

pub mod header;
pub mod iana;
pub mod message;
pub mod name;
pub mod question;
pub mod record;
pub mod wire;
