//! Time structures for deadline-bounded busy-waits.
//!
//! The driver never sleeps; it polls the chip and its own state machine
//! until a deadline passes. The clock is abstracted behind [`Monotonic`] so
//! tests can inject a deterministic one.

use core::ops::{Add, AddAssign, Sub, SubAssign};

/// A point in time, measured in microseconds since some epoch.
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant {
    us: i64,
}

impl Instant {
    pub const fn from_us(us: i64) -> Self {
        Self { us }
    }

    pub const fn as_us(&self) -> i64 {
        self.us
    }
}

/// A span of time, measured in microseconds.
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    us: i64,
}

impl Duration {
    pub const fn from_us(us: i64) -> Self {
        Self { us }
    }

    pub const fn from_ms(ms: i64) -> Self {
        Self { us: ms * 1000 }
    }

    pub const fn as_us(&self) -> i64 {
        self.us
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Self::Output {
        Instant::from_us(self.us + rhs.us)
    }
}

impl AddAssign<Duration> for Instant {
    fn add_assign(&mut self, rhs: Duration) {
        self.us += rhs.us;
    }
}

impl Sub<Duration> for Instant {
    type Output = Instant;

    fn sub(self, rhs: Duration) -> Self::Output {
        Instant::from_us(self.us - rhs.us)
    }
}

impl SubAssign<Duration> for Instant {
    fn sub_assign(&mut self, rhs: Duration) {
        self.us -= rhs.us;
    }
}

impl Sub<Instant> for Instant {
    type Output = Duration;

    fn sub(self, rhs: Instant) -> Self::Output {
        Duration::from_us(self.us - rhs.us)
    }
}

/// A monotonic clock. Implemented by the host platform; the driver only
/// ever compares `now()` against deadlines, it never sleeps on it.
pub trait Monotonic {
    fn now(&self) -> Instant;
}
