//! IANA Definitions for DNS.
//!
//! This module contains types for the parameters defined in IANA registries
//! that a stub client needs to deal with.
//!
//! All types wrap the raw integer. Well-defined values are available as
//! associated constants, all other values can be created via `from_int()`.
//! Values from the wire that the crate doesn’t know about are therefore
//! never an error.

pub use self::class::Class;
pub use self::opcode::Opcode;
pub use self::rcode::{OptRcode, Rcode};
pub use self::rtype::Rtype;

#[macro_use]
mod macros;

pub mod class;
pub mod opcode;
pub mod rcode;
pub mod rtype;
