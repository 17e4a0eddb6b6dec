//! A time interface that can be replaced by a fake time implementation
//! during testing.

use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};
use std::time;
use std::time::Duration;

//------------ Clock ---------------------------------------------------------

/// A source of instants that implement the [Elapsed] trait.
pub trait Clock: Clone + Debug + Send + Sync + 'static {
    /// The type that implements the [Elapsed] trait.
    type Instant: Clone + Debug + Elapsed + Send + Sync + 'static;

    /// Record the current time in an [Self::Instant] object.
    fn now(&self) -> Self::Instant;
}

//------------ Elapsed -------------------------------------------------------

/// Reporting the time that has elapsed since an instant was taken.
pub trait Elapsed {
    /// Return the elapsed time.
    fn elapsed(&self) -> Duration;
}

//------------ SystemClock ---------------------------------------------------

/// Implementation of the [Clock] trait using the Instant type from
/// std::time.
#[derive(Clone, Debug, Default)]
pub struct SystemClock {}

impl SystemClock {
    pub fn new() -> Self {
        Self {}
    }
}

impl Clock for SystemClock {
    type Instant = time::Instant;

    fn now(&self) -> Self::Instant {
        Self::Instant::now()
    }
}

impl Elapsed for time::Instant {
    fn elapsed(&self) -> Duration {
        self.elapsed()
    }
}

//------------ FakeClock -----------------------------------------------------

/// A clock that only moves when told to.
///
/// Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct FakeClock {
    /// The current fake time.
    now: Arc<Mutex<Duration>>,
}

impl FakeClock {
    /// Creates a new clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now.saturating_add(by);
    }

    /// Return the current (fake) time.
    fn curr_time(&self) -> Duration {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for FakeClock {
    type Instant = FakeInstant;

    fn now(&self) -> Self::Instant {
        FakeInstant {
            start: self.curr_time(),
            clock: self.clone(),
        }
    }
}

//------------ FakeInstant ---------------------------------------------------

/// An instant that provides fake time.
#[derive(Clone, Debug)]
pub struct FakeInstant {
    /// When the FakeInstant was created.
    start: Duration,

    /// The clock that was used to create it.
    clock: FakeClock,
}

impl Elapsed for FakeInstant {
    fn elapsed(&self) -> Duration {
        self.clock.curr_time().saturating_sub(self.start)
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fake_time() {
        let clock = FakeClock::new();
        let start = clock.now();
        assert_eq!(start.elapsed(), Duration::ZERO);
        clock.clone().advance(Duration::from_millis(1500));
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
        let later = clock.now();
        clock.advance(Duration::from_secs(1));
        assert_eq!(later.elapsed(), Duration::from_secs(1));
    }
}
