//! Current-sense model for the BTS50010 IS output.
//!
//! The conversion chain is raw ADC code → divided input voltage → IS voltage →
//! load current → estimated element temperature. Every stage is a pure function
//! of the configured constants; the only side effect is the raw sample pulled
//! from the [`SampleSource`] collaborator.

use crate::config::{ControllerConfig, CurrentLimits, SenseConfig, ThermalModel};
use crate::protection::FaultKind;

/// Raw analog sampling collaborator.
pub trait SampleSource {
    /// Returns the raw ADC code for a channel's sense input, `0..=adc_max`.
    fn read_raw(&mut self, channel: usize) -> u16;
}

/// Snapshot of one channel's current and derived temperature.
///
/// Produced fresh on every poll and never stored beyond the evaluation that
/// consumes it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CurrentReading {
    pub current_a: f32,
    pub estimated_temperature_c: f32,
    /// `false` only when the channel index was out of range.
    pub is_valid: bool,
    /// `true` when the values came from an actual ADC conversion rather than
    /// the zero reading synthesized for a disabled channel.
    pub is_measured: bool,
    pub is_overcurrent: bool,
    pub is_undercurrent: bool,
}

impl CurrentReading {
    /// Reading returned for an out-of-range channel.
    #[must_use]
    pub const fn invalid(ambient_c: f32) -> Self {
        Self {
            current_a: 0.0,
            estimated_temperature_c: ambient_c,
            is_valid: false,
            is_measured: false,
            is_overcurrent: false,
            is_undercurrent: false,
        }
    }

    /// Valid zero-current reading for a channel that is not being driven.
    #[must_use]
    pub const fn idle(ambient_c: f32) -> Self {
        Self {
            current_a: 0.0,
            estimated_temperature_c: ambient_c,
            is_valid: true,
            is_measured: false,
            is_overcurrent: false,
            is_undercurrent: false,
        }
    }

    /// Returns the limit violated by this reading, overcurrent taking priority.
    #[must_use]
    pub const fn fault_kind(&self) -> Option<FaultKind> {
        if self.is_overcurrent {
            Some(FaultKind::Overcurrent)
        } else if self.is_undercurrent {
            Some(FaultKind::Undercurrent)
        } else {
            None
        }
    }

    /// Returns `true` when either current limit is violated.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        self.is_overcurrent || self.is_undercurrent
    }
}

/// Converts raw sense samples into currents and temperatures.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SensorModel {
    sense: SenseConfig,
    thermal: ThermalModel,
    limits: CurrentLimits,
}

impl SensorModel {
    #[must_use]
    pub const fn new(sense: SenseConfig, thermal: ThermalModel, limits: CurrentLimits) -> Self {
        Self {
            sense,
            thermal,
            limits,
        }
    }

    #[must_use]
    pub const fn from_config(config: &ControllerConfig) -> Self {
        Self::new(config.sense, config.thermal, config.limits)
    }

    #[must_use]
    pub const fn thermal(&self) -> &ThermalModel {
        &self.thermal
    }

    /// Ambient temperature reported for idle or invalid readings.
    #[must_use]
    pub const fn ambient_c(&self) -> f32 {
        self.thermal.ambient_c
    }

    /// Reconstructs the IS pin voltage from a raw ADC code.
    #[must_use]
    pub fn raw_to_voltage(&self, raw: u16) -> f32 {
        let raw = raw.min(self.sense.adc_max);
        let adc_volts = f32::from(raw) * self.sense.volts_per_count();
        adc_volts * self.sense.divider_gain()
    }

    /// Samples a channel and returns its reconstructed IS voltage.
    pub fn read_voltage<S>(&self, source: &mut S, channel: usize) -> f32
    where
        S: SampleSource + ?Sized,
    {
        self.raw_to_voltage(source.read_raw(channel))
    }

    /// Converts an IS voltage into the load current through the plug.
    #[must_use]
    pub fn voltage_to_current(&self, sense_volts: f32) -> f32 {
        let sense_current = sense_volts / self.sense.sense_resistor_ohms;
        sense_current * (self.sense.sense_ratio / 10_000.0) * self.sense.calibration_factor
    }

    /// Estimates the element temperature from its load current.
    ///
    /// Near-zero currents report ambient. Otherwise the effective resistance
    /// `supply / current` is mapped through the linear R-T model and clamped
    /// to `[ambient, max]`.
    #[must_use]
    pub fn estimate_temperature(&self, current_a: f32) -> f32 {
        let thermal = &self.thermal;
        if current_a.is_nan() || current_a <= thermal.no_load_current_a {
            return thermal.ambient_c;
        }

        let resistance = thermal.supply_volts / current_a;
        let delta_r = resistance - thermal.cold_resistance_ohms;
        let delta_t = delta_r / (thermal.cold_resistance_ohms * thermal.temp_coefficient);

        (thermal.ambient_c + delta_t).clamp(thermal.ambient_c, thermal.max_c)
    }

    /// Builds a measured reading for `current_a`, applying the current limits.
    #[must_use]
    pub fn classify(&self, current_a: f32) -> CurrentReading {
        let limits = &self.limits;
        CurrentReading {
            current_a,
            estimated_temperature_c: self.estimate_temperature(current_a),
            is_valid: true,
            is_measured: true,
            is_overcurrent: current_a > limits.max_a,
            is_undercurrent: current_a < limits.min_a && current_a > limits.noise_floor_a,
        }
    }

    /// Samples a channel and classifies the resulting current.
    pub fn measure<S>(&self, source: &mut S, channel: usize) -> CurrentReading
    where
        S: SampleSource + ?Sized,
    {
        let volts = self.read_voltage(source, channel);
        self.classify(self.voltage_to_current(volts))
    }

    /// Raw ADC code the front-end would produce for a given load current.
    ///
    /// Inverse of [`Self::measure`], used by simulated sample sources.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn raw_for_current(&self, current_a: f32) -> u16 {
        let sense = &self.sense;
        let gain = (sense.sense_ratio / 10_000.0) * sense.calibration_factor;
        let sense_volts = (current_a / gain) * sense.sense_resistor_ohms;
        let adc_volts = sense_volts / sense.divider_gain();
        let counts = adc_volts / sense.volts_per_count() + 0.5;

        if counts.is_nan() || counts <= 0.0 {
            0
        } else if counts >= f32::from(sense.adc_max) {
            sense.adc_max
        } else {
            counts as u16
        }
    }
}

impl Default for SensorModel {
    fn default() -> Self {
        Self::from_config(&ControllerConfig::DEFAULT)
    }
}
