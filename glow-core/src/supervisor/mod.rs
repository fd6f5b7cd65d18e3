//! Top-level controller state machine.
//!
//! ```text
//! BootDelay --(boot delay elapsed, probe)--> FullPower --(all finished)--> LowPower
//!     \--(no channel enabled)--> Idle
//! ```
//!
//! The supervisor owns the hardware collaborators and the
//! [`OutputScheduler`]. It is driven by [`GlowController::tick`] from a
//! periodic loop and never blocks except for the one-time probe.

use core::fmt;

use crate::config::{ConfigError, ControllerConfig};
use crate::indicator::FaultStatus;
use crate::scheduler::{ChannelIndexError, OutputDriver, OutputScheduler, SettleDelay};
use crate::sensor::SampleSource;
use crate::telemetry::ControllerTelemetry;
use crate::time::Millis;

/// Supervisor states.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControllerState {
    BootDelay,
    /// Channels are being scheduled; individual channels may be waiting,
    /// at full power, or already reduced.
    FullPower,
    /// Reserved; no transition currently enters it.
    RampDown,
    /// Nothing was eligible to heat at boot.
    Idle,
    /// Every channel finished; outputs are held at zero until reboot.
    LowPower,
}

impl ControllerState {
    /// Returns `true` while the plugs may be energized.
    #[must_use]
    pub const fn is_heating(self) -> bool {
        matches!(self, ControllerState::FullPower)
    }

    /// States the controller never leaves without a reboot.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, ControllerState::Idle | ControllerState::LowPower)
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ControllerState::BootDelay => "boot-delay",
            ControllerState::FullPower => "full-power",
            ControllerState::RampDown => "ramp-down",
            ControllerState::Idle => "idle",
            ControllerState::LowPower => "low-power",
        };
        f.write_str(label)
    }
}

/// Glow plug controller for `N` channels.
pub struct GlowController<const N: usize, S, D, W>
where
    S: SampleSource,
    D: OutputDriver,
    W: SettleDelay,
{
    config: ControllerConfig,
    state: ControllerState,
    state_started_at: Millis,
    scheduler: OutputScheduler<N>,
    sensors: S,
    driver: D,
    delay: W,
}

impl<const N: usize, S, D, W> GlowController<N, S, D, W>
where
    S: SampleSource,
    D: OutputDriver,
    W: SettleDelay,
{
    /// Validates `config` and builds a controller in `BootDelay` starting at
    /// `now`.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] reported by [`ControllerConfig::validate`].
    pub fn new(
        config: ControllerConfig,
        sensors: S,
        driver: D,
        delay: W,
        now: Millis,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            config,
            state: ControllerState::BootDelay,
            state_started_at: now,
            scheduler: OutputScheduler::new(&config),
            sensors,
            driver,
            delay,
        })
    }

    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub const fn state(&self) -> ControllerState {
        self.state
    }

    pub const fn state_started_at(&self) -> Millis {
        self.state_started_at
    }

    pub const fn is_heating(&self) -> bool {
        self.state.is_heating()
    }

    pub const fn scheduler(&self) -> &OutputScheduler<N> {
        &self.scheduler
    }

    pub const fn sensors(&self) -> &S {
        &self.sensors
    }

    pub const fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }

    pub const fn driver(&self) -> &D {
        &self.driver
    }

    pub const fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub const fn delay(&self) -> &W {
        &self.delay
    }

    /// Snapshot for the LED indicator.
    pub const fn fault_status(&self) -> FaultStatus {
        FaultStatus::new(self.scheduler.faults().first_faulted())
    }

    /// Enables or disables a channel; see [`OutputScheduler::set_enabled`].
    /// Disabling also drives the output low immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelIndexError`] for an out-of-range index.
    pub fn set_channel_enabled(
        &mut self,
        index: usize,
        enabled: bool,
        now: Millis,
        telemetry: &mut ControllerTelemetry,
    ) -> Result<(), ChannelIndexError> {
        self.scheduler.set_enabled(index, enabled, now, telemetry)?;
        if !enabled {
            self.driver.apply_duty(index, 0.0);
        }
        Ok(())
    }

    /// Runs one iteration of the control loop.
    pub fn tick(&mut self, now: Millis, telemetry: &mut ControllerTelemetry) {
        match self.state {
            ControllerState::BootDelay => {
                if now.has_elapsed(self.state_started_at, self.config.boot_delay_ms) {
                    self.start_heating(now, telemetry);
                }
            }
            ControllerState::FullPower => {
                self.scheduler
                    .tick(now, &mut self.sensors, &mut self.driver, telemetry);
                if self.scheduler.all_finished() {
                    self.scheduler.release_all(&mut self.driver);
                    self.transition(ControllerState::LowPower, now, telemetry);
                }
            }
            ControllerState::RampDown | ControllerState::Idle | ControllerState::LowPower => {}
        }
    }

    fn start_heating(&mut self, now: Millis, telemetry: &mut ControllerTelemetry) {
        self.scheduler.probe(
            &mut self.sensors,
            &mut self.driver,
            &mut self.delay,
            now,
            telemetry,
        );

        if self.scheduler.has_eligible_channels() {
            self.scheduler.begin(now, telemetry);
            self.transition(ControllerState::FullPower, now, telemetry);
        } else {
            self.scheduler.release_all(&mut self.driver);
            self.transition(ControllerState::Idle, now, telemetry);
        }
    }

    fn transition(
        &mut self,
        next: ControllerState,
        now: Millis,
        telemetry: &mut ControllerTelemetry,
    ) {
        self.state = next;
        self.state_started_at = now;
        telemetry.record_state_change(next, now);
    }
}
