//! Over/under-current protection and the fault latch.
//!
//! A limit violation latches the channel's fault flag and disables the channel
//! on the spot. The latch only drops when a later *measured* reading is back in
//! range; the synthetic zero reading of a disabled channel does not count, so a
//! tripped channel stays faulted until something actually re-energizes it.
//!
//! [`FaultTracker`] caches the lowest faulted index so the LED indicator can
//! read it without scanning.

use core::fmt;

use crate::scheduler::{Channel, ChannelIndexError};
use crate::sensor::CurrentReading;
use crate::telemetry::ControllerTelemetry;
use crate::time::Millis;

/// Which current limit a reading violated.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FaultKind {
    Overcurrent,
    Undercurrent,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::Overcurrent => f.write_str("overcurrent"),
            FaultKind::Undercurrent => f.write_str("undercurrent"),
        }
    }
}

/// Effect of a fault flag update.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FaultTransition {
    Raised,
    Cleared,
    Unchanged,
}

/// Result of running protection against one reading.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ProtectionOutcome {
    pub fault: Option<FaultKind>,
    pub transition: FaultTransition,
    /// `true` when this evaluation switched the channel off.
    pub disabled: bool,
}

impl ProtectionOutcome {
    pub const UNCHANGED: Self = Self {
        fault: None,
        transition: FaultTransition::Unchanged,
        disabled: false,
    };
}

/// Cache of the lowest-index faulted channel.
///
/// The fault flags themselves live on the channels; this only tracks which of
/// them the indicator should report. Callers must route every flag change
/// through [`FaultTracker::set_fault`] to keep the cache exact.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FaultTracker {
    first_faulted: Option<usize>,
}

impl FaultTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            first_faulted: None,
        }
    }

    #[must_use]
    pub const fn first_faulted(&self) -> Option<usize> {
        self.first_faulted
    }

    #[must_use]
    pub const fn has_any_fault(&self) -> bool {
        self.first_faulted.is_some()
    }

    /// Updates one channel's fault flag and the first-fault cache.
    ///
    /// Raising only moves the cache to a lower index. Clearing the cached
    /// channel rescans in ascending order for the next faulted one.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelIndexError`] if `index` is outside `channels`.
    pub fn set_fault(
        &mut self,
        channels: &mut [Channel],
        index: usize,
        faulted: bool,
    ) -> Result<FaultTransition, ChannelIndexError> {
        let count = channels.len();
        let channel = channels
            .get_mut(index)
            .ok_or(ChannelIndexError::new(index, count))?;

        let was_faulted = channel.is_faulted();
        channel.set_faulted(faulted);

        let transition = match (was_faulted, faulted) {
            (false, true) => {
                if self.first_faulted.is_none_or(|first| index < first) {
                    self.first_faulted = Some(index);
                }
                FaultTransition::Raised
            }
            (true, false) => {
                if self.first_faulted == Some(index) {
                    self.first_faulted = channels.iter().position(Channel::is_faulted);
                }
                FaultTransition::Cleared
            }
            _ => FaultTransition::Unchanged,
        };

        Ok(transition)
    }
}

/// Applies the current limits to `reading` for channel `index`.
///
/// Invalid readings are ignored. A violation latches the fault and, if the
/// channel was still enabled, disables it. An in-range measured reading clears
/// a latched fault without re-enabling the channel.
///
/// # Errors
///
/// Returns [`ChannelIndexError`] when a valid reading names a channel outside
/// `channels`.
pub fn evaluate_and_protect(
    channels: &mut [Channel],
    faults: &mut FaultTracker,
    index: usize,
    reading: &CurrentReading,
    now: Millis,
    telemetry: &mut ControllerTelemetry,
) -> Result<ProtectionOutcome, ChannelIndexError> {
    if !reading.is_valid {
        return Ok(ProtectionOutcome::UNCHANGED);
    }

    let Some(kind) = reading.fault_kind() else {
        if !reading.is_measured {
            return Ok(ProtectionOutcome::UNCHANGED);
        }

        let transition = faults.set_fault(channels, index, false)?;
        if transition == FaultTransition::Cleared {
            telemetry.record_fault_cleared(index, now);
        }
        return Ok(ProtectionOutcome {
            fault: None,
            transition,
            disabled: false,
        });
    };

    let transition = faults.set_fault(channels, index, true)?;
    if transition == FaultTransition::Raised {
        telemetry.record_fault_raised(index, kind, reading.current_a, now);
    }

    let mut disabled = false;
    if let Some(channel) = channels.get_mut(index)
        && channel.is_enabled()
    {
        channel.force_disable(now);
        telemetry.record_channel_disabled(index, now);
        disabled = true;
    }

    Ok(ProtectionOutcome {
        fault: Some(kind),
        transition,
        disabled,
    })
}
