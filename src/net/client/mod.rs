//! Sending queries to name servers and receiving responses.
//!
//! The module is layered. At the bottom are the two transports, [udp] and
//! [tcp], which both implement the [`Transport`][transport::Transport]
//! trait. A transport sends a single request to a single server and returns
//! the raw response once it has checked that the response belongs to the
//! request. Both transports keep their sockets in pools that can be shared
//! between clients.
//!
//! On top of that, [lookup] provides the [`LookupClient`][lookup::LookupClient]
//! that resolves a question against a list of name servers with retries,
//! fallback from UDP to TCP for truncated responses, timeouts, and
//! cancellation. Successful responses are kept in a
//! [`ResponseCache`][cache::ResponseCache].
//!
//! # Example
//!
//! ```no_run
//! # use domain_lookup::base::iana::{Class, Rtype};
//! # use domain_lookup::net::client::lookup::LookupClient;
//! # async fn _test() {
//! let client = LookupClient::new(vec!["192.0.2.53".parse().unwrap()]);
//! let response = client
//!     .query("example.com".parse().unwrap(), Rtype::A, Class::IN)
//!     .await
//!     .unwrap();
//! for record in response.message().answer() {
//!     println!("{}", record);
//! }
//! # }
//! ```

pub mod audit;
pub mod cache;
pub mod clock;
pub mod error;
pub mod lookup;
pub mod nameserver;
pub mod tcp;
pub mod transport;
pub mod udp;
