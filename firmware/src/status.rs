#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! The control task publishes the supervisor state and the first faulted
//! channel here after every tick; the indicator task reads them back without
//! touching the controller itself.

use glow_core::indicator::FaultStatus;
use glow_core::supervisor::ControllerState;
use portable_atomic::{AtomicU8, Ordering};

const NO_FAULT: u8 = 0;

/// Encoded [`ControllerState`].
static STATE: AtomicU8 = AtomicU8::new(encode_state(ControllerState::BootDelay));
/// First faulted channel index + 1 (0 == no fault).
static FIRST_FAULT: AtomicU8 = AtomicU8::new(NO_FAULT);

const fn encode_state(state: ControllerState) -> u8 {
    match state {
        ControllerState::BootDelay => 0,
        ControllerState::FullPower => 1,
        ControllerState::RampDown => 2,
        ControllerState::Idle => 3,
        ControllerState::LowPower => 4,
    }
}

const fn decode_state(raw: u8) -> ControllerState {
    match raw {
        1 => ControllerState::FullPower,
        2 => ControllerState::RampDown,
        3 => ControllerState::Idle,
        4 => ControllerState::LowPower,
        _ => ControllerState::BootDelay,
    }
}

pub fn record_state(state: ControllerState) {
    STATE.store(encode_state(state), Ordering::Relaxed);
}

pub fn state() -> ControllerState {
    decode_state(STATE.load(Ordering::Relaxed))
}

pub fn is_heating() -> bool {
    state().is_heating()
}

/// Stores the indicator view of the fault cache.
pub fn record_fault_status(status: FaultStatus) {
    let encoded = status
        .first_faulted()
        .and_then(|index| u8::try_from(index + 1).ok())
        .unwrap_or(NO_FAULT);
    FIRST_FAULT.store(encoded, Ordering::Relaxed);
}

pub fn fault_status() -> FaultStatus {
    match FIRST_FAULT.load(Ordering::Relaxed) {
        NO_FAULT => FaultStatus::CLEAR,
        raw => FaultStatus::new(Some(usize::from(raw - 1))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_status_survives_publication() {
        record_fault_status(FaultStatus::new(Some(0)));
        assert_eq!(fault_status().first_faulted(), Some(0));

        record_fault_status(FaultStatus::new(Some(5)));
        assert_eq!(fault_status().blink_count(), Some(6));

        record_fault_status(FaultStatus::CLEAR);
        assert!(!fault_status().has_any_fault());
    }

    #[test]
    fn heating_follows_published_state() {
        record_state(ControllerState::FullPower);
        assert!(is_heating());

        record_state(ControllerState::LowPower);
        assert!(!is_heating());
        assert_eq!(state(), ControllerState::LowPower);
    }
}
