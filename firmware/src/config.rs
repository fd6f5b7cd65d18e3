#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Board-level configuration for the STM32G0 glow plug controller.
//!
//! The shared defaults assume a 5 V, 10-bit converter. This board samples the
//! IS dividers with the G0 ADC running from the 3.3 V rail, configured for
//! 10-bit conversions so the raw code range stays the same.

use glow_core::config::{ControllerConfig, SenseConfig};

/// Control loop period.
pub const CONTROL_PERIOD_MS: u64 = 10;
/// Indicator refresh period.
pub const INDICATOR_PERIOD_MS: u64 = 10;
/// PWM carrier for both output timers.
pub const PWM_FREQUENCY_HZ: u32 = 500;

const BOARD_SENSE: SenseConfig = SenseConfig {
    adc_vref_volts: 3.3,
    ..SenseConfig::DEFAULT
};

/// Controller configuration for this board.
pub const BOARD_CONFIG: ControllerConfig = ControllerConfig::DEFAULT.with_sense(BOARD_SENSE);
