//! A source of the current time, so session expiry can be tested.

use time::OffsetDateTime;

/// Something that can tell the current time.
pub trait Clock: Send + Sync {
    /// The current date and time.
    fn now(&self) -> OffsetDateTime;
}

/// A [Clock] that reads the system time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
