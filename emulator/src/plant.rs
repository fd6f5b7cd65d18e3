//! Simulated glow plugs for the host emulator.
//!
//! Each plug is a first-order thermal mass heated in proportion to its PWM
//! duty and cooling toward ambient. Its resistance follows the same linear
//! R-T model the controller inverts, so a healthy plug reads back close to its
//! true temperature. The sense input reports the on-state current whenever
//! the output is driven, as a sampler synchronised to the PWM high phase would.

use std::cell::RefCell;
use std::rc::Rc;

use glow_core::board::CHANNEL_COUNT;
use glow_core::config::{ControllerConfig, ThermalModel};
use glow_core::scheduler::{OutputDriver, SettleDelay};
use glow_core::sensor::{SampleSource, SensorModel};
use glow_core::time::Millis;

/// Heating rate at 100 % duty, degrees per second.
const HEAT_RATE_C_PER_S: f32 = 250.0;
/// Newtonian cooling coefficient, per second.
const COOLING_PER_S: f32 = 0.3;
/// Current drawn through a shorted plug.
const SHORT_CIRCUIT_A: f32 = 25.0;
/// Current reported for a plug with a broken element.
const OPEN_LOAD_LEAK_A: f32 = 0.8;
/// Largest single integration step.
const MAX_STEP_MS: u32 = 10;

/// Injected plug failure.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PlugCondition {
    Healthy,
    /// Shorts to ground once the simulated clock reaches the given time.
    ShortsAt(u32),
    /// Broken element; only leakage current flows.
    OpenLoad,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plug {
    pub temperature_c: f32,
    pub duty: f32,
    pub condition: PlugCondition,
}

impl Plug {
    pub const fn at(temperature_c: f32) -> Self {
        Self {
            temperature_c,
            duty: 0.0,
            condition: PlugCondition::Healthy,
        }
    }

    fn resistance(&self, thermal: &ThermalModel) -> f32 {
        let rise = (self.temperature_c - thermal.ambient_c).max(0.0);
        thermal.cold_resistance_ohms * (1.0 + thermal.temp_coefficient * rise)
    }

    /// On-state current seen by the sense input at `now_ms`.
    pub fn current(&self, thermal: &ThermalModel, now_ms: u32) -> f32 {
        if self.duty <= 0.0 {
            return 0.0;
        }

        match self.condition {
            PlugCondition::ShortsAt(at) if now_ms >= at => SHORT_CIRCUIT_A,
            PlugCondition::OpenLoad => OPEN_LOAD_LEAK_A,
            PlugCondition::Healthy | PlugCondition::ShortsAt(_) => {
                thermal.supply_volts / self.resistance(thermal)
            }
        }
    }

    fn integrate(&mut self, ambient_c: f32, dt_s: f32) {
        let heating = HEAT_RATE_C_PER_S * self.duty;
        let cooling = COOLING_PER_S * (self.temperature_c - ambient_c);
        self.temperature_c += (heating - cooling) * dt_s;
    }
}

/// Complete simulated bench: six plugs plus the simulated clock.
#[derive(Clone, Debug)]
pub struct PlantState {
    now_ms: u32,
    plugs: [Plug; CHANNEL_COUNT],
    thermal: ThermalModel,
    sensor: SensorModel,
}

impl PlantState {
    pub fn new(config: &ControllerConfig, plugs: [Plug; CHANNEL_COUNT]) -> Self {
        Self {
            now_ms: 0,
            plugs,
            thermal: config.thermal,
            sensor: SensorModel::from_config(config),
        }
    }

    pub fn now(&self) -> Millis {
        Millis::new(self.now_ms)
    }

    pub fn plugs(&self) -> &[Plug; CHANNEL_COUNT] {
        &self.plugs
    }

    pub fn current(&self, channel: usize) -> f32 {
        self.plugs
            .get(channel)
            .map_or(0.0, |plug| plug.current(&self.thermal, self.now_ms))
    }

    /// Advances the clock, integrating plug temperatures in small steps.
    pub fn advance(&mut self, ms: u32) {
        let mut remaining = ms;
        while remaining > 0 {
            let step = remaining.min(MAX_STEP_MS);
            // Steps are at most 10 ms, well inside f32's exact range.
            let dt_s = f32::from(u16::try_from(step).unwrap_or(u16::MAX)) / 1_000.0;
            for plug in &mut self.plugs {
                plug.integrate(self.thermal.ambient_c, dt_s);
            }
            self.now_ms = self.now_ms.wrapping_add(step);
            remaining -= step;
        }
    }
}

/// Shared handle to the plant; the controller's three collaborators each hold
/// one.
#[derive(Clone, Debug)]
pub struct SharedPlant(Rc<RefCell<PlantState>>);

impl SharedPlant {
    pub fn new(state: PlantState) -> Self {
        Self(Rc::new(RefCell::new(state)))
    }

    pub fn now(&self) -> Millis {
        self.0.borrow().now()
    }

    pub fn advance(&self, ms: u32) {
        self.0.borrow_mut().advance(ms);
    }

    pub fn snapshot(&self) -> PlantState {
        self.0.borrow().clone()
    }

    pub fn sensors(&self) -> PlantSensors {
        PlantSensors(self.clone())
    }

    pub fn outputs(&self) -> PlantOutputs {
        PlantOutputs(self.clone())
    }

    pub fn delay(&self) -> PlantDelay {
        PlantDelay(self.clone())
    }
}

pub struct PlantSensors(SharedPlant);

impl SampleSource for PlantSensors {
    fn read_raw(&mut self, channel: usize) -> u16 {
        let state = self.0.0.borrow();
        state.sensor.raw_for_current(state.current(channel))
    }
}

pub struct PlantOutputs(SharedPlant);

impl OutputDriver for PlantOutputs {
    fn apply_duty(&mut self, channel: usize, duty: f32) {
        if let Some(plug) = self.0.0.borrow_mut().plugs.get_mut(channel) {
            plug.duty = if duty.is_nan() { 0.0 } else { duty.clamp(0.0, 1.0) };
        }
    }

    fn release_all(&mut self) {
        for plug in &mut self.0.0.borrow_mut().plugs {
            plug.duty = 0.0;
        }
    }
}

/// Blocking waits advance simulated time instead of sleeping.
pub struct PlantDelay(SharedPlant);

impl SettleDelay for PlantDelay {
    fn block_ms(&mut self, ms: u32) {
        self.0.advance(ms);
    }
}
