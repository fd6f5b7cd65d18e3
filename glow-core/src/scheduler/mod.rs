//! Per-channel heating schedule.
//!
//! Each channel runs its own small state machine:
//!
//! ```text
//! Off -> WaitingToStart -> FullPower -> ReducedPower -> Finished
//! ```
//!
//! Channels leave `WaitingToStart` one stagger interval apart so the plugs do
//! not all draw inrush current at the same instant. The total heating budget of
//! each channel is chosen once by the probe (hot plugs get the shorter budget)
//! and is frozen before the channel starts. A disabled channel is pinned to
//! `Finished` with zero duty for the rest of the run.

mod channel;

use core::fmt;

pub use channel::{Channel, ChannelPhase, ThermalClass};

use crate::config::{ControllerConfig, ScheduleConfig, TemperatureLogConfig};
use crate::protection::{self, FaultTracker, ProtectionOutcome};
use crate::sensor::{CurrentReading, SampleSource, SensorModel};
use crate::telemetry::ControllerTelemetry;
use crate::time::Millis;

/// PWM actuator collaborator.
pub trait OutputDriver {
    /// Writes a duty cycle to a channel. Implementations clamp to `0.0..=1.0`.
    fn apply_duty(&mut self, channel: usize, duty: f32);

    /// Drives every output to zero.
    fn release_all(&mut self);
}

/// Output driver that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopOutputDriver;

impl NoopOutputDriver {
    pub const fn new() -> Self {
        Self
    }
}

impl OutputDriver for NoopOutputDriver {
    fn apply_duty(&mut self, _: usize, _: f32) {}

    fn release_all(&mut self) {}
}

/// Bounded blocking wait used while the probe current settles.
pub trait SettleDelay {
    fn block_ms(&mut self, ms: u32);
}

/// Request addressed a channel outside `0..channel_count`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChannelIndexError {
    pub index: usize,
    pub channel_count: usize,
}

impl ChannelIndexError {
    pub const fn new(index: usize, channel_count: usize) -> Self {
        Self {
            index,
            channel_count,
        }
    }
}

impl fmt::Display for ChannelIndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "channel {} out of range (0..{})",
            self.index, self.channel_count
        )
    }
}

/// Owns the per-channel timing state for all `N` outputs.
#[derive(Clone, Debug)]
pub struct OutputScheduler<const N: usize> {
    channels: [Channel; N],
    faults: FaultTracker,
    sensor: SensorModel,
    schedule: ScheduleConfig,
    temperature_log: TemperatureLogConfig,
    started_at: Option<Millis>,
    invalid_requests: u32,
}

impl<const N: usize> OutputScheduler<N> {
    /// Creates a scheduler with every channel enabled and idle.
    pub fn new(config: &ControllerConfig) -> Self {
        let cold_budget = config.schedule.cold_total_ms;
        let ambient = config.thermal.ambient_c;
        Self {
            channels: core::array::from_fn(|index| Channel::new(index, cold_budget, ambient)),
            faults: FaultTracker::new(),
            sensor: SensorModel::from_config(config),
            schedule: config.schedule,
            temperature_log: config.temperature_log,
            started_at: None,
            invalid_requests: 0,
        }
    }

    pub fn channels(&self) -> &[Channel; N] {
        &self.channels
    }

    pub const fn sensor(&self) -> &SensorModel {
        &self.sensor
    }

    pub const fn faults(&self) -> &FaultTracker {
        &self.faults
    }

    /// Number of out-of-range channel requests observed so far.
    pub const fn invalid_requests(&self) -> u32 {
        self.invalid_requests
    }

    /// Returns `true` when at least one channel can still be scheduled.
    pub fn has_eligible_channels(&self) -> bool {
        self.channels.iter().any(Channel::is_eligible)
    }

    /// Returns `true` while any channel is waiting or energized.
    pub fn is_active(&self) -> bool {
        self.channels.iter().any(|channel| channel.phase().is_active())
    }

    /// Returns `true` once every enabled channel has finished its budget.
    pub fn all_finished(&self) -> bool {
        self.started_at.is_some()
            && !self.is_active()
            && self
                .channels
                .iter()
                .all(|channel| !channel.is_enabled() || channel.phase() == ChannelPhase::Finished)
    }

    /// Enables or disables a channel.
    ///
    /// Disabling is immediate: duty drops to zero and the channel is pinned to
    /// `Finished`. Enabling only restores eligibility before the schedule has
    /// started; once it is running a re-enabled channel stays `Finished`.
    pub fn set_enabled(
        &mut self,
        index: usize,
        enabled: bool,
        now: Millis,
        telemetry: &mut ControllerTelemetry,
    ) -> Result<(), ChannelIndexError> {
        if index >= N {
            self.note_invalid();
            telemetry.record_invalid_channel(index, now);
            return Err(ChannelIndexError::new(index, N));
        }

        let started = self.started_at.is_some();
        let channel = &mut self.channels[index];
        if enabled == channel.is_enabled() {
            return Ok(());
        }

        if enabled {
            channel.enable(!started);
            telemetry.record_channel_enabled(index, now);
        } else {
            channel.force_disable(now);
            telemetry.record_channel_disabled(index, now);
        }
        Ok(())
    }

    /// Sets or clears a channel's fault latch, keeping the first-fault cache
    /// consistent.
    pub fn set_fault(
        &mut self,
        index: usize,
        faulted: bool,
    ) -> Result<protection::FaultTransition, ChannelIndexError> {
        let result = self.faults.set_fault(&mut self.channels, index, faulted);
        if result.is_err() {
            self.note_invalid();
        }
        result
    }

    /// Records the probe temperature and freezes the channel's heating budget.
    ///
    /// Ignored once the schedule has started so a running channel's budget
    /// never changes.
    pub fn classify(
        &mut self,
        index: usize,
        temperature_c: f32,
    ) -> Result<ThermalClass, ChannelIndexError> {
        if index >= N {
            self.note_invalid();
            return Err(ChannelIndexError::new(index, N));
        }

        let channel = &mut self.channels[index];
        if self.started_at.is_some() {
            return Ok(channel.thermal_class());
        }

        let class = if temperature_c >= self.schedule.hot_threshold_c {
            ThermalClass::Hot
        } else {
            ThermalClass::Cold
        };
        let budget = match class {
            ThermalClass::Hot => self.schedule.hot_total_ms,
            ThermalClass::Cold => self.schedule.cold_total_ms,
        };
        channel.set_budget(temperature_c, class, budget);
        Ok(class)
    }

    /// Reads a channel's current. Disabled channels short-circuit to a valid
    /// zero reading and out-of-range indices yield an invalid one.
    pub fn read_channel_current<S>(&mut self, index: usize, sensors: &mut S) -> CurrentReading
    where
        S: SampleSource + ?Sized,
    {
        let ambient = self.sensor.ambient_c();
        let Some(channel) = self.channels.get(index) else {
            self.note_invalid();
            return CurrentReading::invalid(ambient);
        };

        if !channel.is_enabled() {
            return CurrentReading::idle(ambient);
        }

        self.sensor.measure(sensors, index)
    }

    /// Applies the current limits to a reading, latching faults and disabling
    /// the offending channel.
    pub fn evaluate_and_protect(
        &mut self,
        index: usize,
        reading: &CurrentReading,
        now: Millis,
        telemetry: &mut ControllerTelemetry,
    ) -> Result<ProtectionOutcome, ChannelIndexError> {
        let result = protection::evaluate_and_protect(
            &mut self.channels,
            &mut self.faults,
            index,
            reading,
            now,
            telemetry,
        );
        if result.is_err() {
            self.note_invalid();
            telemetry.record_invalid_channel(index, now);
        }
        result
    }

    /// Drives every enabled channel at the probe duty, waits for the current to
    /// settle, and classifies each channel from its estimated temperature.
    ///
    /// This is the one intentional blocking stall in the controller; it runs
    /// once at boot before any channel is live.
    pub fn probe<S, D, W>(
        &mut self,
        sensors: &mut S,
        driver: &mut D,
        delay: &mut W,
        now: Millis,
        telemetry: &mut ControllerTelemetry,
    ) where
        S: SampleSource + ?Sized,
        D: OutputDriver + ?Sized,
        W: SettleDelay + ?Sized,
    {
        let probe_duty = self.schedule.probe_duty;
        for channel in self.channels.iter_mut().filter(|channel| channel.is_eligible()) {
            channel.set_duty(probe_duty);
            driver.apply_duty(channel.index(), probe_duty);
        }

        delay.block_ms(self.schedule.probe_settle_ms);

        for index in 0..N {
            if !self.channels[index].is_eligible() {
                continue;
            }

            let reading = self.read_channel_current(index, sensors);
            if !reading.is_valid {
                continue;
            }

            let temperature = reading.estimated_temperature_c;
            if let Ok(class) = self.classify(index, temperature) {
                let budget = self.channels[index].total_duration_ms();
                telemetry.record_classification(index, temperature, class, budget, now);
            }
        }

        for channel in &mut self.channels {
            channel.set_duty(0.0);
            driver.apply_duty(channel.index(), 0.0);
        }

        delay.block_ms(self.schedule.probe_release_ms);
    }

    /// Starts the staggered schedule at `now`.
    ///
    /// Eligible channels enter `WaitingToStart` with start times offset by
    /// `index * stagger_delay`; everything else is pinned to `Finished`.
    pub fn begin(&mut self, now: Millis, telemetry: &mut ControllerTelemetry) {
        if self.started_at.is_some() {
            return;
        }
        self.started_at = Some(now);

        let stagger = self.schedule.stagger_delay_ms;
        for channel in &mut self.channels {
            let offset = u32::try_from(channel.index())
                .unwrap_or(u32::MAX)
                .saturating_mul(stagger);
            let next = if channel.is_eligible() {
                channel.schedule_start(now, offset);
                ChannelPhase::WaitingToStart
            } else {
                channel.enter_phase(ChannelPhase::Finished, now, 0.0);
                ChannelPhase::Finished
            };
            telemetry.record_phase_change(channel.index(), next, now);
        }
    }

    /// Runs one control iteration: protection first, then phase timing, then
    /// the duty of every channel is written to the driver.
    pub fn tick<S, D>(
        &mut self,
        now: Millis,
        sensors: &mut S,
        driver: &mut D,
        telemetry: &mut ControllerTelemetry,
    ) where
        S: SampleSource + ?Sized,
        D: OutputDriver + ?Sized,
    {
        if self.started_at.is_none() {
            return;
        }

        self.monitor(now, sensors, telemetry);

        for index in 0..N {
            if let Some(next) = self.advance(index, now) {
                telemetry.record_phase_change(index, next, now);
            }
        }

        self.apply(driver);
    }

    /// Forces every channel to zero duty and releases the outputs.
    pub fn release_all<D>(&mut self, driver: &mut D)
    where
        D: OutputDriver + ?Sized,
    {
        for channel in &mut self.channels {
            channel.set_duty(0.0);
        }
        driver.release_all();
    }

    fn monitor<S>(&mut self, now: Millis, sensors: &mut S, telemetry: &mut ControllerTelemetry)
    where
        S: SampleSource + ?Sized,
    {
        for index in 0..N {
            let reading = self.read_channel_current(index, sensors);
            // Out-of-limit readings are reported with the fault instead.
            if let Ok(outcome) = self.evaluate_and_protect(index, &reading, now, telemetry)
                && outcome.fault.is_none()
            {
                self.log_temperature(index, &reading, now, telemetry);
            }
        }
    }

    fn log_temperature(
        &mut self,
        index: usize,
        reading: &CurrentReading,
        now: Millis,
        telemetry: &mut ControllerTelemetry,
    ) {
        if !reading.is_measured || reading.current_a <= self.temperature_log.min_current_a {
            return;
        }

        let interval = self.temperature_log.interval_ms;
        let channel = &mut self.channels[index];
        let due = channel
            .last_temperature_log()
            .is_none_or(|last| now.has_elapsed(last, interval));
        if due {
            channel.mark_temperature_logged(now);
            telemetry.record_temperature_sample(index, reading, now);
        }
    }

    fn advance(&mut self, index: usize, now: Millis) -> Option<ChannelPhase> {
        let full_power_ms = self.schedule.full_power_ms;
        let reduced_duty = self.schedule.reduced_duty;
        let channel = &mut self.channels[index];
        let since = channel.phase_started_at();

        match channel.phase() {
            ChannelPhase::WaitingToStart => {
                let offset = channel.stagger_start().elapsed_since(since);
                now.has_elapsed(since, offset).then(|| {
                    channel.enter_phase(ChannelPhase::FullPower, now, 1.0);
                    ChannelPhase::FullPower
                })
            }
            ChannelPhase::FullPower => now.has_elapsed(since, full_power_ms).then(|| {
                channel.enter_phase(ChannelPhase::ReducedPower, now, reduced_duty);
                ChannelPhase::ReducedPower
            }),
            ChannelPhase::ReducedPower => {
                let remaining = self.schedule.reduced_phase_ms(channel.total_duration_ms());
                now.has_elapsed(since, remaining).then(|| {
                    channel.enter_phase(ChannelPhase::Finished, now, 0.0);
                    ChannelPhase::Finished
                })
            }
            ChannelPhase::Off | ChannelPhase::Finished => None,
        }
    }

    fn apply<D>(&self, driver: &mut D)
    where
        D: OutputDriver + ?Sized,
    {
        for channel in &self.channels {
            driver.apply_duty(channel.index(), channel.commanded_duty());
        }
    }

    fn note_invalid(&mut self) {
        self.invalid_requests = self.invalid_requests.saturating_add(1);
    }
}
