//! Wrapping millisecond timestamps.
//!
//! The control loop is fed from a free-running `u32` millisecond counter that
//! wraps roughly every 49.7 days. Timestamps are never compared directly;
//! every check is phrased as "elapsed since start >= duration" so the wrapping
//! subtraction stays correct across the rollover.

use core::time::Duration;

use crate::telemetry::TelemetryInstant;

/// Monotonic millisecond timestamp taken from a wrapping counter.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Millis(u32);

impl Millis {
    /// Timestamp at counter value zero.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw counter value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Milliseconds elapsed since `earlier`, correct across one counter wrap.
    #[must_use]
    pub const fn elapsed_since(self, earlier: Self) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Returns `true` once at least `duration_ms` have passed since `start`.
    #[must_use]
    pub const fn has_elapsed(self, start: Self, duration_ms: u32) -> bool {
        self.elapsed_since(start) >= duration_ms
    }

    /// Timestamp `delta_ms` after `self`, wrapping with the counter.
    #[must_use]
    pub const fn wrapping_add(self, delta_ms: u32) -> Self {
        Self(self.0.wrapping_add(delta_ms))
    }
}

impl From<u32> for Millis {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl TelemetryInstant for Millis {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(u64::from(self.elapsed_since(earlier)))
    }
}
