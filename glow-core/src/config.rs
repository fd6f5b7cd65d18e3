//! Compile-time configuration for the glow plug controller.
//!
//! The defaults reproduce the bench-tuned constants of the six-channel
//! BTS50010 board. Every threshold and duration is treated as read-only
//! configuration by the rest of the crate; targets that need different values
//! start from [`ControllerConfig::DEFAULT`] and override fields through the
//! `with_*` helpers before calling [`ControllerConfig::validate`].

use core::fmt;

/// Analog front-end between the BTS50010 IS pin and the ADC input.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SenseConfig {
    /// Upper divider leg, IS pin to ADC input.
    pub divider_r1_ohms: f32,
    /// Lower divider leg, ADC input to ground.
    pub divider_r2_ohms: f32,
    /// ADC reference voltage.
    pub adc_vref_volts: f32,
    /// Largest raw code the ADC can return.
    pub adc_max: u16,
    pub sense_resistor_ohms: f32,
    /// kILIS ratio of the high-side switch (load current per sense current).
    pub sense_ratio: f32,
    /// Empirical multiplier. The board read 9.67 A against a 16 A reference
    /// load, hence 16 / 9.67.
    pub calibration_factor: f32,
}

impl SenseConfig {
    pub const DEFAULT: Self = Self {
        divider_r1_ohms: 4_700.0,
        divider_r2_ohms: 1_500.0,
        adc_vref_volts: 5.0,
        adc_max: 1_023,
        sense_resistor_ohms: 1.0,
        sense_ratio: 10_000.0,
        calibration_factor: 1.65,
    };

    /// Factor that reconstructs the IS voltage from the ADC input voltage.
    #[must_use]
    pub const fn divider_gain(&self) -> f32 {
        (self.divider_r1_ohms + self.divider_r2_ohms) / self.divider_r2_ohms
    }

    /// Volts represented by one ADC code.
    #[must_use]
    pub const fn volts_per_count(&self) -> f32 {
        self.adc_vref_volts / (self.adc_max as f32 + 1.0)
    }
}

impl Default for SenseConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Linear resistance/temperature approximation of a glow plug element.
///
/// This is a coarse model: `R(T) = R_cold * (1 + alpha * (T - ambient))`
/// with the supply voltage assumed constant across the element.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThermalModel {
    pub supply_volts: f32,
    pub cold_resistance_ohms: f32,
    /// Resistance temperature coefficient per degree Celsius.
    pub temp_coefficient: f32,
    pub ambient_c: f32,
    pub max_c: f32,
    /// Currents at or below this are treated as "no load".
    pub no_load_current_a: f32,
}

impl ThermalModel {
    pub const DEFAULT: Self = Self {
        supply_volts: 13.8,
        cold_resistance_ohms: 0.8,
        temp_coefficient: 0.006,
        ambient_c: 25.0,
        max_c: 1_000.0,
        no_load_current_a: 0.1,
    };
}

impl Default for ThermalModel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Safe operating window for a single channel, in amperes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CurrentLimits {
    pub min_a: f32,
    pub max_a: f32,
    /// Undercurrent is only reported above this floor so an idle or
    /// just-starting channel is not flagged.
    pub noise_floor_a: f32,
}

impl CurrentLimits {
    pub const DEFAULT: Self = Self {
        min_a: 1.0,
        max_a: 20.0,
        noise_floor_a: 0.5,
    };
}

impl Default for CurrentLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Timing and duty parameters for the per-channel heating schedule.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScheduleConfig {
    /// Time every channel spends at 100 % after its staggered start.
    pub full_power_ms: u32,
    /// Total budget for a plug classified as cold.
    pub cold_total_ms: u32,
    /// Total budget for a plug classified as hot.
    pub hot_total_ms: u32,
    /// Offset between consecutive channel starts.
    pub stagger_delay_ms: u32,
    /// Probe temperatures at or above this classify a plug as hot.
    pub hot_threshold_c: f32,
    pub reduced_duty: f32,
    pub probe_duty: f32,
    /// Blocking settle time between energizing the probe and sampling it.
    pub probe_settle_ms: u32,
    /// Blocking pause after the probe releases all outputs.
    pub probe_release_ms: u32,
}

impl ScheduleConfig {
    pub const DEFAULT: Self = Self {
        full_power_ms: 5_000,
        cold_total_ms: 15_000,
        hot_total_ms: 10_000,
        stagger_delay_ms: 500,
        hot_threshold_c: 200.0,
        reduced_duty: 0.6,
        probe_duty: 0.1,
        probe_settle_ms: 200,
        probe_release_ms: 50,
    };

    /// Returns the reduced-power time left once full power has elapsed.
    #[must_use]
    pub const fn reduced_phase_ms(&self, total_ms: u32) -> u32 {
        total_ms.saturating_sub(self.full_power_ms)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Fault LED timing.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlinkConfig {
    pub on_ms: u32,
    pub off_ms: u32,
    /// Dark interval between repetitions of the blink count.
    pub pause_ms: u32,
}

impl BlinkConfig {
    pub const DEFAULT: Self = Self {
        on_ms: 300,
        off_ms: 200,
        pause_ms: 1_500,
    };
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Throttle for the periodic per-channel temperature sample.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TemperatureLogConfig {
    pub interval_ms: u32,
    /// Samples are only emitted while the channel draws more than this.
    pub min_current_a: f32,
}

impl TemperatureLogConfig {
    pub const DEFAULT: Self = Self {
        interval_ms: 1_000,
        min_current_a: 1.0,
    };
}

impl Default for TemperatureLogConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Complete controller configuration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ControllerConfig {
    pub sense: SenseConfig,
    pub thermal: ThermalModel,
    pub limits: CurrentLimits,
    pub schedule: ScheduleConfig,
    pub blink: BlinkConfig,
    pub temperature_log: TemperatureLogConfig,
    /// Wait after power-up before the probe runs.
    pub boot_delay_ms: u32,
}

impl ControllerConfig {
    pub const DEFAULT: Self = Self {
        sense: SenseConfig::DEFAULT,
        thermal: ThermalModel::DEFAULT,
        limits: CurrentLimits::DEFAULT,
        schedule: ScheduleConfig::DEFAULT,
        blink: BlinkConfig::DEFAULT,
        temperature_log: TemperatureLogConfig::DEFAULT,
        boot_delay_ms: 1_000,
    };

    #[must_use]
    pub const fn with_sense(mut self, sense: SenseConfig) -> Self {
        self.sense = sense;
        self
    }

    #[must_use]
    pub const fn with_thermal(mut self, thermal: ThermalModel) -> Self {
        self.thermal = thermal;
        self
    }

    #[must_use]
    pub const fn with_limits(mut self, limits: CurrentLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub const fn with_schedule(mut self, schedule: ScheduleConfig) -> Self {
        self.schedule = schedule;
        self
    }

    #[must_use]
    pub const fn with_boot_delay_ms(mut self, boot_delay_ms: u32) -> Self {
        self.boot_delay_ms = boot_delay_ms;
        self
    }

    /// Checks the configuration for values the control code cannot honor.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sense = &self.sense;
        if sense.divider_r2_ohms <= 0.0 || sense.divider_r1_ohms < 0.0 {
            return Err(ConfigError::InvalidDivider);
        }
        if sense.adc_max == 0 || sense.adc_vref_volts <= 0.0 {
            return Err(ConfigError::InvalidAdcRange);
        }
        if sense.sense_resistor_ohms <= 0.0 {
            return Err(ConfigError::InvalidSenseResistor);
        }

        let thermal = &self.thermal;
        if thermal.cold_resistance_ohms <= 0.0 || thermal.temp_coefficient <= 0.0 {
            return Err(ConfigError::InvalidThermalModel);
        }
        if thermal.max_c < thermal.ambient_c {
            return Err(ConfigError::InvalidThermalModel);
        }

        let limits = &self.limits;
        if limits.min_a >= limits.max_a {
            return Err(ConfigError::InvertedCurrentLimits);
        }
        if limits.noise_floor_a > limits.min_a {
            return Err(ConfigError::NoiseFloorAboveMinimum);
        }

        let schedule = &self.schedule;
        for duty in [schedule.reduced_duty, schedule.probe_duty] {
            if !(0.0..=1.0).contains(&duty) {
                return Err(ConfigError::DutyOutOfRange);
            }
        }
        if schedule.hot_total_ms < schedule.full_power_ms
            || schedule.cold_total_ms < schedule.full_power_ms
        {
            return Err(ConfigError::BudgetShorterThanFullPower);
        }
        if schedule.hot_total_ms > schedule.cold_total_ms {
            return Err(ConfigError::HotBudgetExceedsCold);
        }

        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Reasons [`ControllerConfig::validate`] rejects a configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    InvalidDivider,
    InvalidAdcRange,
    InvalidSenseResistor,
    InvalidThermalModel,
    InvertedCurrentLimits,
    NoiseFloorAboveMinimum,
    DutyOutOfRange,
    BudgetShorterThanFullPower,
    HotBudgetExceedsCold,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ConfigError::InvalidDivider => "voltage divider legs must be positive",
            ConfigError::InvalidAdcRange => "ADC range and reference must be non-zero",
            ConfigError::InvalidSenseResistor => "sense resistor must be positive",
            ConfigError::InvalidThermalModel => "thermal model constants are out of range",
            ConfigError::InvertedCurrentLimits => "minimum current must be below maximum",
            ConfigError::NoiseFloorAboveMinimum => "noise floor exceeds minimum current",
            ConfigError::DutyOutOfRange => "duty cycles must lie within 0.0..=1.0",
            ConfigError::BudgetShorterThanFullPower => {
                "heating budgets must cover the full-power phase"
            }
            ConfigError::HotBudgetExceedsCold => "hot budget must not exceed cold budget",
        };
        f.write_str(message)
    }
}
