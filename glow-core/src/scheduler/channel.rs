use core::fmt;

use crate::time::Millis;

/// Lifecycle of one glow plug output.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChannelPhase {
    Off,
    WaitingToStart,
    FullPower,
    ReducedPower,
    Finished,
}

impl ChannelPhase {
    /// Returns `true` while the channel is waiting for its slot or energized.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            ChannelPhase::WaitingToStart | ChannelPhase::FullPower | ChannelPhase::ReducedPower
        )
    }
}

impl fmt::Display for ChannelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChannelPhase::Off => "off",
            ChannelPhase::WaitingToStart => "waiting",
            ChannelPhase::FullPower => "full-power",
            ChannelPhase::ReducedPower => "reduced-power",
            ChannelPhase::Finished => "finished",
        };
        f.write_str(label)
    }
}

/// Probe outcome that selects a channel's heating budget.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ThermalClass {
    Hot,
    Cold,
}

impl fmt::Display for ThermalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThermalClass::Hot => f.write_str("hot"),
            ThermalClass::Cold => f.write_str("cold"),
        }
    }
}

/// Runtime state of one output.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Channel {
    index: usize,
    enabled: bool,
    duty_cycle: f32,
    phase: ChannelPhase,
    phase_started_at: Millis,
    stagger_start: Millis,
    total_duration_ms: u32,
    initial_temperature_c: f32,
    thermal_class: ThermalClass,
    faulted: bool,
    last_temperature_log: Option<Millis>,
}

impl Channel {
    pub(crate) const fn new(index: usize, total_duration_ms: u32, ambient_c: f32) -> Self {
        Self {
            index,
            enabled: true,
            duty_cycle: 0.0,
            phase: ChannelPhase::Off,
            phase_started_at: Millis::ZERO,
            stagger_start: Millis::ZERO,
            total_duration_ms,
            initial_temperature_c: ambient_c,
            thermal_class: ThermalClass::Cold,
            faulted: false,
            last_temperature_log: None,
        }
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn is_faulted(&self) -> bool {
        self.faulted
    }

    #[must_use]
    pub const fn phase(&self) -> ChannelPhase {
        self.phase
    }

    /// Nominal duty of the current phase.
    #[must_use]
    pub const fn duty_cycle(&self) -> f32 {
        self.duty_cycle
    }

    /// Duty actually written to the output: zero while disabled or faulted.
    #[must_use]
    pub fn commanded_duty(&self) -> f32 {
        if !self.enabled || self.faulted {
            0.0
        } else {
            self.duty_cycle.clamp(0.0, 1.0)
        }
    }

    #[must_use]
    pub const fn phase_started_at(&self) -> Millis {
        self.phase_started_at
    }

    /// Earliest time the channel may leave `WaitingToStart`.
    #[must_use]
    pub const fn stagger_start(&self) -> Millis {
        self.stagger_start
    }

    #[must_use]
    pub const fn total_duration_ms(&self) -> u32 {
        self.total_duration_ms
    }

    #[must_use]
    pub const fn initial_temperature_c(&self) -> f32 {
        self.initial_temperature_c
    }

    #[must_use]
    pub const fn thermal_class(&self) -> ThermalClass {
        self.thermal_class
    }

    /// Can still join a schedule that has not started.
    pub(crate) const fn is_eligible(&self) -> bool {
        self.enabled && !self.faulted && matches!(self.phase, ChannelPhase::Off)
    }

    pub(crate) const fn last_temperature_log(&self) -> Option<Millis> {
        self.last_temperature_log
    }

    pub(crate) const fn mark_temperature_logged(&mut self, now: Millis) {
        self.last_temperature_log = Some(now);
    }

    pub(crate) const fn set_duty(&mut self, duty: f32) {
        self.duty_cycle = duty;
    }

    pub(crate) const fn set_faulted(&mut self, faulted: bool) {
        self.faulted = faulted;
    }

    pub(crate) const fn set_budget(
        &mut self,
        temperature_c: f32,
        class: ThermalClass,
        total_duration_ms: u32,
    ) {
        self.initial_temperature_c = temperature_c;
        self.thermal_class = class;
        self.total_duration_ms = total_duration_ms;
    }

    pub(crate) const fn schedule_start(&mut self, now: Millis, offset_ms: u32) {
        self.phase = ChannelPhase::WaitingToStart;
        self.phase_started_at = now;
        self.stagger_start = now.wrapping_add(offset_ms);
        self.duty_cycle = 0.0;
    }

    pub(crate) const fn enter_phase(&mut self, phase: ChannelPhase, now: Millis, duty: f32) {
        self.phase = phase;
        self.phase_started_at = now;
        self.duty_cycle = duty;
    }

    /// Turns the output off and pins the channel to `Finished`.
    pub(crate) const fn force_disable(&mut self, now: Millis) {
        self.enabled = false;
        self.enter_phase(ChannelPhase::Finished, now, 0.0);
    }

    /// Re-enables the channel. `restore_schedule` returns it to `Off` so it can
    /// still take part in a schedule that has not started yet.
    pub(crate) const fn enable(&mut self, restore_schedule: bool) {
        self.enabled = true;
        if restore_schedule && matches!(self.phase, ChannelPhase::Finished) {
            self.phase = ChannelPhase::Off;
        }
    }
}
