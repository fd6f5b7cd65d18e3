//! Telemetry logging for the firmware target.
//!
//! The controller records into the shared `glow-core` ring; this module drains
//! whatever is new after each control tick and mirrors it to defmt on the MCU
//! or stdout on the host so bring-up does not need a debugger attached.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use glow_core::board::channel_label;
use glow_core::telemetry::{
    ControllerTelemetry, EventId, TelemetryEventKind, TelemetryPayload, TelemetryRecord,
};
use glow_core::time::Millis;

/// Cursor over a [`ControllerTelemetry`] ring.
pub struct TelemetryDrain {
    cursor: EventId,
}

impl TelemetryDrain {
    pub const fn new() -> Self {
        Self { cursor: 0 }
    }

    /// Logs every record added since the previous flush and returns how many
    /// were emitted. Records overwritten before a flush are lost.
    pub fn flush(&mut self, recorder: &ControllerTelemetry) -> usize {
        let mut emitted = 0;
        for record in recorder.records_since(self.cursor) {
            log_record(record);
            emitted += 1;
        }
        self.cursor = recorder.next_event_id();
        emitted
    }
}

impl Default for TelemetryDrain {
    fn default() -> Self {
        Self::new()
    }
}

fn log_record(record: &TelemetryRecord<Millis>) {
    let label = record.event.channel().map_or("--", channel_label);
    emit_log(
        record.id,
        record.timestamp.as_u32(),
        label,
        &record.event,
        &record.details,
    );
}

#[cfg(target_os = "none")]
fn emit_log(
    id: EventId,
    timestamp_ms: u32,
    label: &'static str,
    event: &TelemetryEventKind,
    details: &TelemetryPayload,
) {
    if event.is_fault() {
        defmt::warn!(
            "telemetry:glow #{} t={}ms {} {} {}",
            id,
            timestamp_ms,
            label,
            defmt::Display2Format(event),
            defmt::Display2Format(details)
        );
    } else {
        defmt::info!(
            "telemetry:glow #{} t={}ms {} {} {}",
            id,
            timestamp_ms,
            label,
            defmt::Display2Format(event),
            defmt::Display2Format(details)
        );
    }
}

#[cfg(not(target_os = "none"))]
fn emit_log(
    id: EventId,
    timestamp_ms: u32,
    label: &'static str,
    event: &TelemetryEventKind,
    details: &TelemetryPayload,
) {
    println!("telemetry:glow #{id} t={timestamp_ms}ms {label} {event} {details}");
}
