//! A DNS stub lookup client.
//!
//! This crate provides the pieces needed to ask name servers questions and
//! make sense of their answers: reading and writing DNS messages in wire
//! format, and sending them to servers over UDP and TCP.
//!
//! # Modules
//!
//! * [base] contains the wire format types: a read and a write cursor,
//!   domain names with compression handling, the message header,
//!   questions, records, and messages, as well as the IANA code types.
//! * [rdata] contains the record registry and the data types of the
//!   record types it decodes by default.
#![cfg_attr(feature = "net", doc = "* [net]:")]
#![cfg_attr(not(feature = "net"), doc = "* net:")]
//!   Sending queries over UDP and TCP, a response cache, and the lookup
//!   client that resolves questions against a set of name servers.
//! * [utils] contains helpers for configuration values.
//!
//! # Reference of Feature Flags
//!
//! * `net`: Enables the
#![cfg_attr(feature = "net", doc = "  [net]")]
#![cfg_attr(not(feature = "net"), doc = "  net")]
//!   module. This pulls in [Tokio](https://tokio.rs/) and the crates used
//!   for socket pools and the cache. The feature is enabled by default.
#![allow(renamed_and_removed_lints)]
#![allow(clippy::unknown_clippy_lints)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod base;
pub mod net;
pub mod rdata;
pub mod utils;
