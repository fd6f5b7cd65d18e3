#![allow(dead_code)]

use glow_core::board::CHANNEL_COUNT;
use glow_core::config::ControllerConfig;
use glow_core::scheduler::{ChannelPhase, OutputDriver, SettleDelay};
use glow_core::sensor::{SampleSource, SensorModel};
use glow_core::supervisor::GlowController;
use glow_core::telemetry::{ControllerTelemetry, EventId, TelemetryEventKind};
use glow_core::time::Millis;

/// Nominal running current of a healthy cold plug.
pub const NOMINAL_A: f32 = 12.0;
/// Current of a plug that is still hot (~340 C by the thermal model).
pub const HOT_A: f32 = 6.0;
pub const TICK_MS: u32 = 10;

/// Sense inputs that report a fixed current per channel.
pub struct MockSensors {
    model: SensorModel,
    pub currents: [f32; CHANNEL_COUNT],
}

impl MockSensors {
    pub fn uniform(current_a: f32) -> Self {
        Self {
            model: SensorModel::default(),
            currents: [current_a; CHANNEL_COUNT],
        }
    }
}

impl SampleSource for MockSensors {
    fn read_raw(&mut self, channel: usize) -> u16 {
        self.currents
            .get(channel)
            .map_or(0, |current| self.model.raw_for_current(*current))
    }
}

/// Records the last duty written to each output.
#[derive(Default)]
pub struct MockDriver {
    pub duties: [f32; CHANNEL_COUNT],
    pub writes: usize,
    pub releases: usize,
}

impl OutputDriver for MockDriver {
    fn apply_duty(&mut self, channel: usize, duty: f32) {
        if let Some(slot) = self.duties.get_mut(channel) {
            *slot = duty.clamp(0.0, 1.0);
            self.writes += 1;
        }
    }

    fn release_all(&mut self) {
        self.duties = [0.0; CHANNEL_COUNT];
        self.releases += 1;
    }
}

#[derive(Default)]
pub struct MockDelay {
    pub waits: Vec<u32>,
}

impl SettleDelay for MockDelay {
    fn block_ms(&mut self, ms: u32) {
        self.waits.push(ms);
    }
}

pub type TestController = GlowController<CHANNEL_COUNT, MockSensors, MockDriver, MockDelay>;

/// Controller plus a drained copy of everything it recorded.
pub struct Harness {
    pub controller: TestController,
    pub telemetry: ControllerTelemetry,
    pub log: Vec<(u32, TelemetryEventKind)>,
    cursor: EventId,
    pub now: u32,
}

impl Harness {
    pub fn new(sensors: MockSensors) -> Self {
        let controller = GlowController::new(
            ControllerConfig::DEFAULT,
            sensors,
            MockDriver::default(),
            MockDelay::default(),
            Millis::ZERO,
        )
        .expect("default config is valid");

        Self {
            controller,
            telemetry: ControllerTelemetry::new(),
            log: Vec::new(),
            cursor: 0,
            now: 0,
        }
    }

    /// Ticks every [`TICK_MS`] until `to` (inclusive), draining telemetry
    /// after each tick.
    pub fn run_until(&mut self, to: u32) {
        while self.now <= to {
            self.step();
        }
    }

    /// Runs a single tick at the current time and advances the clock.
    pub fn step(&mut self) {
        self.controller
            .tick(Millis::new(self.now), &mut self.telemetry);
        self.drain();
        self.now += TICK_MS;
    }

    pub fn drain(&mut self) {
        self.log.extend(
            self.telemetry
                .records_since(self.cursor)
                .map(|record| (record.timestamp.as_u32(), record.event)),
        );
        self.cursor = self.telemetry.next_event_id();
    }

    pub fn duties(&self) -> [f32; CHANNEL_COUNT] {
        self.controller.driver().duties
    }

    pub fn set_current(&mut self, channel: usize, current_a: f32) {
        self.controller.sensors_mut().currents[channel] = current_a;
    }

    pub fn phase(&self, channel: usize) -> ChannelPhase {
        self.controller.scheduler().channels()[channel].phase()
    }

    /// First time `event` was recorded.
    pub fn first(&self, event: TelemetryEventKind) -> Option<u32> {
        self.log
            .iter()
            .find(|(_, recorded)| *recorded == event)
            .map(|(at, _)| *at)
    }

    pub fn count(&self, predicate: impl Fn(&TelemetryEventKind) -> bool) -> usize {
        self.log.iter().filter(|(_, event)| predicate(event)).count()
    }
}
