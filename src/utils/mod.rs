//! Various utility modules.

#[cfg(feature = "net")]
pub mod config;
