//! Time source used when a request carries no date header.

use chrono::{DateTime, Utc};

/// A source of the current time.
///
/// Returning `None` means the clock is unavailable; signing a request without
/// a date header then fails with
/// [`SigningError::InvalidTimestamp`](crate::SigningError::InvalidTimestamp).
pub trait Clock: Send + Sync {
    /// The current time in UTC.
    fn now(&self) -> Option<DateTime<Utc>>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Option<DateTime<Utc>> {
        Some(Utc::now())
    }
}

/// A clock frozen at a single instant, or permanently unavailable.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use rustack_sigv4::clock::{Clock, FixedClock};
///
/// let t = Utc.with_ymd_and_hms(2011, 9, 9, 23, 36, 0).unwrap();
/// assert_eq!(FixedClock::at(t).now(), Some(t));
/// assert_eq!(FixedClock::unavailable().now(), None);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(Option<DateTime<Utc>>);

impl FixedClock {
    /// A clock that always reports `instant`.
    #[must_use]
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(Some(instant))
    }

    /// A clock that never reports a time.
    #[must_use]
    pub fn unavailable() -> Self {
        Self(None)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Option<DateTime<Utc>> {
        self.0
    }
}
