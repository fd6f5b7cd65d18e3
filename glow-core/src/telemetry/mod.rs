//! Telemetry event catalog and the bounded recorder shared by firmware and host
//! targets.
//!
//! Control code records what happened (state changes, probe classifications,
//! phase transitions, faults) into a fixed-size ring; the firmware drains it to
//! defmt and the emulator prints it. Nothing in the control path depends on a
//! record being read.

use core::{fmt, time::Duration};

use heapless::{HistoryBuf, OldestOrdered};

use crate::protection::FaultKind;
use crate::scheduler::{ChannelPhase, ThermalClass};
use crate::sensor::CurrentReading;
use crate::supervisor::ControllerState;
use crate::time::Millis;

/// Monotonic identifier assigned to each recorded event.
pub type EventId = u32;

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    StateChanged(ControllerState),
    ChannelClassified(usize),
    PhaseChanged(usize, ChannelPhase),
    FaultRaised(usize),
    FaultCleared(usize),
    ChannelDisabled(usize),
    ChannelEnabled(usize),
    TemperatureSample(usize),
    InvalidChannel(usize),
}

impl TelemetryEventKind {
    /// Channel the event refers to, if any.
    #[must_use]
    pub const fn channel(self) -> Option<usize> {
        match self {
            TelemetryEventKind::StateChanged(_) => None,
            TelemetryEventKind::ChannelClassified(index)
            | TelemetryEventKind::PhaseChanged(index, _)
            | TelemetryEventKind::FaultRaised(index)
            | TelemetryEventKind::FaultCleared(index)
            | TelemetryEventKind::ChannelDisabled(index)
            | TelemetryEventKind::ChannelEnabled(index)
            | TelemetryEventKind::TemperatureSample(index)
            | TelemetryEventKind::InvalidChannel(index) => Some(index),
        }
    }

    /// Returns `true` for events an operator should notice.
    #[must_use]
    pub const fn is_fault(self) -> bool {
        matches!(
            self,
            TelemetryEventKind::FaultRaised(_)
                | TelemetryEventKind::ChannelDisabled(_)
                | TelemetryEventKind::InvalidChannel(_)
        )
    }
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::StateChanged(state) => write!(f, "state {state}"),
            TelemetryEventKind::ChannelClassified(index) => write!(f, "classified ch{index}"),
            TelemetryEventKind::PhaseChanged(index, phase) => write!(f, "ch{index} {phase}"),
            TelemetryEventKind::FaultRaised(index) => write!(f, "fault-raised ch{index}"),
            TelemetryEventKind::FaultCleared(index) => write!(f, "fault-cleared ch{index}"),
            TelemetryEventKind::ChannelDisabled(index) => write!(f, "disabled ch{index}"),
            TelemetryEventKind::ChannelEnabled(index) => write!(f, "enabled ch{index}"),
            TelemetryEventKind::TemperatureSample(index) => write!(f, "sample ch{index}"),
            TelemetryEventKind::InvalidChannel(index) => write!(f, "invalid-channel {index}"),
        }
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TelemetryPayload {
    None,
    /// Supervisor transition with the time spent in the previous state.
    Transition(TransitionTelemetry),
    /// Probe classification result.
    Classification(ClassificationTelemetry),
    /// Limit violation that latched a fault.
    Fault(FaultTelemetry),
    /// Periodic current/temperature sample.
    Reading(ReadingTelemetry),
}

impl TelemetryPayload {
    #[must_use]
    pub const fn none() -> Self {
        TelemetryPayload::None
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TransitionTelemetry {
    pub elapsed_in_previous: Option<Duration>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClassificationTelemetry {
    pub temperature_c: f32,
    pub class: ThermalClass,
    pub total_duration_ms: u32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FaultTelemetry {
    pub kind: FaultKind,
    pub current_a: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReadingTelemetry {
    pub current_a: f32,
    pub temperature_c: f32,
}

impl From<&CurrentReading> for ReadingTelemetry {
    fn from(reading: &CurrentReading) -> Self {
        Self {
            current_a: reading.current_a,
            temperature_c: reading.estimated_temperature_c,
        }
    }
}

impl fmt::Display for TelemetryPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryPayload::None => Ok(()),
            TelemetryPayload::Transition(details) => match details.elapsed_in_previous {
                Some(elapsed) => write!(f, "after {} ms", elapsed.as_millis()),
                None => Ok(()),
            },
            TelemetryPayload::Classification(details) => write!(
                f,
                "{:.1} C {} budget {} ms",
                details.temperature_c, details.class, details.total_duration_ms
            ),
            TelemetryPayload::Fault(details) => {
                write!(f, "{} at {:.2} A", details.kind, details.current_a)
            }
            TelemetryPayload::Reading(details) => {
                write!(f, "{:.2} A {:.1} C", details.current_a, details.temperature_c)
            }
        }
    }
}

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 128;

/// Monotonic instant wrappers usable as telemetry timestamps.
pub trait TelemetryInstant: Copy {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

pub type TelemetryRing<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer. Once full, the
/// oldest record is overwritten.
pub struct TelemetryRecorder<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: TelemetryRing<TInstant, CAPACITY>,
    last_transition_at: Option<TInstant>,
    next_event_id: EventId,
}

/// Recorder used by the controller, stamped with loop milliseconds.
pub type ControllerTelemetry = TelemetryRecorder<Millis>;

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: Copy + TelemetryInstant,
{
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            last_transition_at: None,
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Identifier the next recorded event will receive.
    pub const fn next_event_id(&self) -> EventId {
        self.next_event_id
    }

    /// Records with an id at or after `first_id` that are still retained.
    ///
    /// Consumers keep a cursor, drain with this, then advance the cursor to
    /// [`Self::next_event_id`]. Records overwritten in between are skipped.
    pub fn records_since(
        &self,
        first_id: EventId,
    ) -> impl Iterator<Item = &TelemetryRecord<TInstant>> {
        let pending =
            usize::try_from(self.next_event_id.wrapping_sub(first_id)).unwrap_or(usize::MAX);
        let skip = self.ring.len().saturating_sub(pending);
        self.ring.oldest_ordered().skip(skip)
    }

    /// Records a supervisor transition with the time since the previous one.
    pub fn record_state_change(&mut self, state: ControllerState, timestamp: TInstant) -> EventId {
        let elapsed = self
            .last_transition_at
            .map(|previous| timestamp.saturating_duration_since(previous));
        self.last_transition_at = Some(timestamp);

        self.record(
            TelemetryEventKind::StateChanged(state),
            TelemetryPayload::Transition(TransitionTelemetry {
                elapsed_in_previous: elapsed,
            }),
            timestamp,
        )
    }

    pub fn record_classification(
        &mut self,
        channel: usize,
        temperature_c: f32,
        class: ThermalClass,
        total_duration_ms: u32,
        timestamp: TInstant,
    ) -> EventId {
        self.record(
            TelemetryEventKind::ChannelClassified(channel),
            TelemetryPayload::Classification(ClassificationTelemetry {
                temperature_c,
                class,
                total_duration_ms,
            }),
            timestamp,
        )
    }

    pub fn record_phase_change(
        &mut self,
        channel: usize,
        phase: ChannelPhase,
        timestamp: TInstant,
    ) -> EventId {
        self.record(
            TelemetryEventKind::PhaseChanged(channel, phase),
            TelemetryPayload::none(),
            timestamp,
        )
    }

    pub fn record_fault_raised(
        &mut self,
        channel: usize,
        kind: FaultKind,
        current_a: f32,
        timestamp: TInstant,
    ) -> EventId {
        self.record(
            TelemetryEventKind::FaultRaised(channel),
            TelemetryPayload::Fault(FaultTelemetry { kind, current_a }),
            timestamp,
        )
    }

    pub fn record_fault_cleared(&mut self, channel: usize, timestamp: TInstant) -> EventId {
        self.record(
            TelemetryEventKind::FaultCleared(channel),
            TelemetryPayload::none(),
            timestamp,
        )
    }

    pub fn record_channel_disabled(&mut self, channel: usize, timestamp: TInstant) -> EventId {
        self.record(
            TelemetryEventKind::ChannelDisabled(channel),
            TelemetryPayload::none(),
            timestamp,
        )
    }

    pub fn record_channel_enabled(&mut self, channel: usize, timestamp: TInstant) -> EventId {
        self.record(
            TelemetryEventKind::ChannelEnabled(channel),
            TelemetryPayload::none(),
            timestamp,
        )
    }

    pub fn record_temperature_sample(
        &mut self,
        channel: usize,
        reading: &CurrentReading,
        timestamp: TInstant,
    ) -> EventId {
        self.record(
            TelemetryEventKind::TemperatureSample(channel),
            TelemetryPayload::Reading(ReadingTelemetry::from(reading)),
            timestamp,
        )
    }

    pub fn record_invalid_channel(&mut self, channel: usize, timestamp: TInstant) -> EventId {
        self.record(
            TelemetryEventKind::InvalidChannel(channel),
            TelemetryPayload::none(),
            timestamp,
        )
    }

    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: TInstant,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }
}

impl<TInstant, const CAPACITY: usize> Default for TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: Copy + TelemetryInstant,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_change_records_time_in_previous_state() {
        let mut recorder = ControllerTelemetry::new();
        recorder.record_state_change(ControllerState::BootDelay, Millis::new(0));
        recorder.record_state_change(ControllerState::FullPower, Millis::new(1_250));

        let details = recorder.latest().map(|record| record.details);
        assert_eq!(
            details,
            Some(TelemetryPayload::Transition(TransitionTelemetry {
                elapsed_in_previous: Some(Duration::from_millis(1_250)),
            }))
        );
    }

    #[test]
    fn ring_overwrites_oldest_records() {
        let mut recorder: TelemetryRecorder<Millis, 4> = TelemetryRecorder::new();
        for channel in 0..6 {
            recorder.record_fault_cleared(channel, Millis::new(0));
        }

        assert_eq!(recorder.len(), 4);
        let first = recorder.oldest_first().next().map(|record| record.id);
        assert_eq!(first, Some(2));
    }

    #[test]
    fn records_since_skips_already_drained_events() {
        let mut recorder: TelemetryRecorder<Millis, 8> = TelemetryRecorder::new();
        recorder.record_channel_enabled(0, Millis::new(0));
        recorder.record_channel_enabled(1, Millis::new(0));
        let cursor = recorder.next_event_id();
        recorder.record_channel_disabled(1, Millis::new(5));

        let pending: heapless::Vec<TelemetryEventKind, 4> = recorder
            .records_since(cursor)
            .map(|record| record.event)
            .collect();
        assert_eq!(pending.as_slice(), &[TelemetryEventKind::ChannelDisabled(1)]);
    }

    #[test]
    fn events_keep_full_channel_index() {
        let high = TelemetryEventKind::PhaseChanged(16, ChannelPhase::FullPower);
        let low = TelemetryEventKind::PhaseChanged(0, ChannelPhase::FullPower);

        assert_ne!(high, low);
        assert_eq!(high.channel(), Some(16));
        assert_eq!(TelemetryEventKind::InvalidChannel(300).channel(), Some(300));
        assert_eq!(
            TelemetryEventKind::StateChanged(ControllerState::LowPower).channel(),
            None
        );
    }

    #[test]
    fn fault_payload_display_names_kind() {
        let payload = TelemetryPayload::Fault(FaultTelemetry {
            kind: FaultKind::Overcurrent,
            current_a: 25.0,
        });
        let mut text: heapless::String<32> = heapless::String::new();
        core::fmt::write(&mut text, format_args!("{payload}")).expect("fits");
        assert_eq!(text.as_str(), "overcurrent at 25.00 A");
    }
}
