//! Sending and receiving DNS messages.
//!
//! This module provides types and functions for sending queries to name
//! servers and receiving their responses.
#![cfg(feature = "net")]
#![cfg_attr(docsrs, doc(cfg(feature = "net")))]

pub mod client;
