//! A cache for responses.
//!
//! The [`ResponseCache`] stores error-free responses keyed by the server
//! that gave them and the question they answer. An entry stays valid for
//! the smallest TTL of the records in the response, possibly raised to a
//! configured minimum. A response retrieved from the cache has the TTLs of
//! all its records reduced by the number of whole seconds the entry has
//! been in the cache. The stored response itself is never changed.
//!
//! Expired entries are removed when they are looked up. In addition, a
//! sweep over the whole cache is started in the background at most once
//! per cleanup interval when a new entry is stored.
//!
//! Time is taken from a [`Clock`] so that tests can use a
//! [`FakeClock`][super::clock::FakeClock] and move time forward
//! explicitly.

use super::clock::{Clock, Elapsed, SystemClock};
use crate::base::iana::{Class, Rtype};
use crate::base::message::Message;
use crate::base::question::Question;
use crate::utils::config::DefMinMax;
use moka::future::Cache;
use parking_lot::Mutex;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

//------------ Constants -----------------------------------------------------

/// Configuration limits for the maximum number of entries in the cache.
const MAX_CACHE_ENTRIES: DefMinMax<u64> =
    DefMinMax::new(1_000, 1, 1_000_000_000);

/// Limits for the interval between two cleanup sweeps.
const CLEANUP_INTERVAL: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(600),
    Duration::from_secs(1),
    Duration::from_secs(7 * 24 * 3600),
);

/// The validity used for an infinite minimum TTL.
///
/// This is the largest timeout that can be expressed in signed 32 bit
/// milliseconds, a little less than 25 days.
const INFINITE_TTL: Duration = Duration::from_millis(i32::MAX as u64);

/// Entries valid for less than this aren’t stored.
const MIN_VALIDITY: Duration = Duration::from_secs(1);

//------------ MinimumTtl ----------------------------------------------------

/// A lower bound for the time a response is cached.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MinimumTtl {
    /// Responses are cached for at least this long.
    Duration(Duration),

    /// Responses are cached for as long as possible.
    Infinite,
}

//------------ Config --------------------------------------------------------

/// Configuration of a response cache.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of cache entries.
    max_cache_entries: u64,

    /// Optional lower bound for the validity of an entry.
    minimum_ttl: Option<MinimumTtl>,

    /// Minimum time between two cleanup sweeps.
    cleanup_interval: Duration,
}

impl Config {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Default::default()
    }

    pub fn max_cache_entries(&self) -> u64 {
        self.max_cache_entries
    }

    /// Sets the maximum number of cache entries.
    ///
    /// The value is limited to the range from 1 to 1,000,000,000. The
    /// default is 1000.
    pub fn set_max_cache_entries(&mut self, value: u64) {
        self.max_cache_entries = MAX_CACHE_ENTRIES.limit(value)
    }

    pub fn minimum_ttl(&self) -> Option<MinimumTtl> {
        self.minimum_ttl
    }

    /// Sets the minimum time a response is cached for.
    ///
    /// If a response’s smallest TTL is less than this, the entry is kept
    /// for the minimum instead. By default there is no minimum.
    pub fn set_minimum_ttl(&mut self, value: Option<MinimumTtl>) {
        self.minimum_ttl = value
    }

    pub fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }

    /// Sets the minimum time between two cleanup sweeps.
    ///
    /// The default is ten minutes.
    pub fn set_cleanup_interval(&mut self, value: Duration) {
        self.cleanup_interval = CLEANUP_INTERVAL.limit(value)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_cache_entries: MAX_CACHE_ENTRIES.default(),
            minimum_ttl: None,
            cleanup_interval: CLEANUP_INTERVAL.default(),
        }
    }
}

//------------ Key -----------------------------------------------------------

/// The key for cache entries.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Key {
    /// The server the response came from.
    server: SocketAddr,

    /// The question name in lower case presentation format.
    qname: String,

    qclass: Class,

    qtype: Rtype,
}

impl Key {
    /// Creates the key for a question sent to a server.
    pub fn new(server: SocketAddr, question: &Question) -> Self {
        Key {
            server,
            qname: question.qname().to_canonical(),
            qclass: question.qclass(),
            qtype: question.qtype(),
        }
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }
}

//------------ Value ---------------------------------------------------------

/// The value to be cached.
#[derive(Debug)]
struct Value<C: Clock> {
    /// Creation time of the cache entry.
    created_at: C::Instant,

    /// The amount time the cache entry is valid.
    valid_for: Duration,

    /// The cached response.
    response: Message,
}

impl<C: Clock> Value<C> {
    /// Returns whether the entry has expired.
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.valid_for
    }

    /// Returns the response with decremented TTLs or `None` if expired.
    fn get_response(&self) -> Option<Message> {
        let elapsed = self.created_at.elapsed();
        if elapsed >= self.valid_for {
            return None;
        }
        let secs = u32::try_from(elapsed.as_secs()).unwrap_or(u32::MAX);
        Some(self.response.aged(secs))
    }
}

//------------ ResponseCache -------------------------------------------------

/// A cache for responses from name servers.
///
/// Clones share the same entries.
#[derive(Clone)]
pub struct ResponseCache<C: Clock = SystemClock> {
    /// The cache entries.
    cache: Cache<Key, Arc<Value<C>>>,

    /// The configuration of this cache.
    config: Config,

    /// The clock to use for expiring cache entries.
    clock: C,

    /// State for scheduling cleanup sweeps.
    cleanup: Arc<Cleanup<C>>,
}

/// Keeps track of cleanup sweeps.
struct Cleanup<C: Clock> {
    /// Whether a sweep is currently running.
    running: AtomicBool,

    /// When the last sweep was started.
    last: Mutex<C::Instant>,
}

/// Clears the running flag of a sweep when dropped.
struct RunningGuard<C: Clock>(Arc<Cleanup<C>>);

impl<C: Clock> Drop for RunningGuard<C> {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::Release)
    }
}

impl ResponseCache {
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(Default::default())
    }

    /// Creates a new cache with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self::with_clock_config(SystemClock::new(), config)
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> ResponseCache<C> {
    /// Creates a new cache that takes its time from `clock`.
    pub fn with_clock_config(clock: C, config: Config) -> Self {
        let last = clock.now();
        Self {
            cache: Cache::new(config.max_cache_entries),
            config,
            clock,
            cleanup: Arc::new(Cleanup {
                running: AtomicBool::new(false),
                last: Mutex::new(last),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stores a response.
    ///
    /// Returns whether the response was stored. Truncated responses,
    /// responses with an error code or without any records aren’t, nor
    /// are those that would be valid for less than a second. An existing
    /// entry for the key is replaced.
    pub async fn put(&self, key: Key, response: &Message) -> bool {
        let valid_for = match validity(response, &self.config) {
            Some(valid_for) => valid_for,
            None => {
                trace!(server = %key.server, "response not cacheable");
                return false;
            }
        };
        trace!(
            server = %key.server,
            qname = %key.qname,
            ?valid_for,
            "caching response"
        );
        let value = Value {
            created_at: self.clock.now(),
            valid_for,
            response: response.clone(),
        };
        self.cache.insert(key, Arc::new(value)).await;
        self.maybe_start_cleanup();
        true
    }

    /// Looks up a response.
    ///
    /// An expired entry is removed and treated as absent.
    pub async fn get(&self, key: &Key) -> Option<Message> {
        let value = self.cache.get(key).await?;
        match value.get_response() {
            Some(response) => {
                trace!(server = %key.server, qname = %key.qname, "cache hit");
                self.maybe_start_cleanup();
                Some(response)
            }
            None => {
                trace!(
                    server = %key.server,
                    qname = %key.qname,
                    "cache entry expired"
                );
                self.cache.invalidate(key).await;
                None
            }
        }
    }

    /// Removes a single entry.
    pub async fn remove(&self, key: &Key) {
        self.cache.invalidate(key).await
    }

    /// Returns the number of entries, including expired ones not yet
    /// removed.
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    /// Returns whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub async fn cleanup(&self) -> usize {
        let expired: Vec<_> = self
            .cache
            .iter()
            .filter(|(_, value)| value.is_expired())
            .map(|(key, _)| key)
            .collect();
        for key in &expired {
            self.cache.invalidate(&**key).await;
        }
        self.cache.run_pending_tasks().await;
        debug!(removed = expired.len(), "cache cleanup done");
        expired.len()
    }

    /// Starts a background sweep if one is due and none is running.
    ///
    /// Outside of a Tokio runtime no sweep is started.
    fn maybe_start_cleanup(&self) {
        {
            let last = self.cleanup.last.lock();
            if last.elapsed() < self.config.cleanup_interval {
                return;
            }
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        if self.cleanup.running.swap(true, Ordering::AcqRel) {
            return;
        }
        *self.cleanup.last.lock() = self.clock.now();
        let this = self.clone();
        handle.spawn(async move {
            // Resets the flag even if the runtime drops the task.
            let _guard = RunningGuard(this.cleanup.clone());
            this.cleanup().await;
        });
    }
}

impl<C: Clock> fmt::Debug for ResponseCache<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.cache.entry_count())
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish()
    }
}

//------------ Utility functions ---------------------------------------------

/// Computes how long a response can be cached.
///
/// Returns `None` if it can’t be cached at all.
fn validity(response: &Message, config: &Config) -> Option<Duration> {
    if response.has_error() || response.is_truncated() {
        return None;
    }
    let ttl = response.min_ttl()?;
    let ttl = Duration::from_secs(u64::try_from(ttl).unwrap_or(0));
    let ttl = match config.minimum_ttl {
        None => ttl,
        Some(MinimumTtl::Duration(min)) => ttl.max(min),
        Some(MinimumTtl::Infinite) => INFINITE_TTL,
    };
    if ttl < MIN_VALIDITY {
        None
    } else {
        Some(ttl)
    }
}

//============ Testing =======================================================
