//! Limits for configuration values.

use std::cmp;

//------------ DefMinMax -----------------------------------------------------

/// The default, minimum, and maximum values for a config variable.
#[derive(Clone, Copy, Debug)]
pub struct DefMinMax<T> {
    /// The default value,
    def: T,

    /// The minimum value,
    min: T,

    /// The maximum value,
    max: T,
}

impl<T> DefMinMax<T> {
    /// Creates a new value.
    pub const fn new(def: T, min: T, max: T) -> Self {
        Self { def, min, max }
    }

    /// Returns the default value.
    pub fn default(self) -> T {
        self.def
    }

    /// Returns the smallest acceptable value.
    pub fn min(self) -> T {
        self.min
    }

    /// Returns the largest acceptable value.
    pub fn max(self) -> T {
        self.max
    }

    /// Trims the given value to fit into the minimum/maximum range.
    pub fn limit(self, value: T) -> T
    where
        T: Ord,
    {
        cmp::max(self.min, cmp::min(self.max, value))
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::DefMinMax;
    use std::time::Duration;

    #[test]
    fn limit() {
        const TIMEOUT: DefMinMax<Duration> = DefMinMax::new(
            Duration::from_secs(5),
            Duration::from_millis(1),
            Duration::from_secs(60),
        );
        assert_eq!(TIMEOUT.default(), Duration::from_secs(5));
        assert_eq!(TIMEOUT.limit(Duration::ZERO), TIMEOUT.min());
        assert_eq!(TIMEOUT.limit(Duration::from_secs(3600)), TIMEOUT.max());
        assert_eq!(
            TIMEOUT.limit(Duration::from_secs(7)),
            Duration::from_secs(7)
        );
    }
}
