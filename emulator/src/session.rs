use std::fmt;
use std::io::{self, Write};

use crossterm::style::Stylize;
use glow_core::board::{CHANNEL_COUNT, channel_label};
use glow_core::config::{ConfigError, ControllerConfig};
use glow_core::indicator::{BlinkPattern, LedLevel};
use glow_core::supervisor::{ControllerState, GlowController};
use glow_core::telemetry::{ControllerTelemetry, EventId, TelemetryEventKind, TelemetryRecord};
use glow_core::time::Millis;

use crate::plant::{
    PlantDelay, PlantOutputs, PlantSensors, PlantState, Plug, PlugCondition, SharedPlant,
};

/// Synthetic control period.
pub const TICK_MS: u32 = 10;
/// How long the LED pattern keeps being narrated after heating ends.
const INDICATOR_TAIL_MS: u32 = 5_000;
/// Hard stop in case a run never reaches a terminal state.
const MAX_RUN_MS: u32 = 60_000;

const AMBIENT_C: f32 = 25.0;
const PREHEATED_C: f32 = 400.0;
const SHORTED_CHANNEL: usize = 2;
const SHORT_AT_MS: u32 = 6_000;
const OPEN_CHANNEL: usize = 4;

type EmulatedController = GlowController<CHANNEL_COUNT, PlantSensors, PlantOutputs, PlantDelay>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Profile {
    /// Every plug starts at ambient.
    Cold,
    /// Every plug is still warm from a previous run.
    Hot,
    /// GP3 shorts part way through full power.
    Overcurrent,
    /// GP5 has a broken element.
    OpenCircuit,
}

impl Profile {
    pub const ALL: [Profile; 4] = [
        Profile::Cold,
        Profile::Hot,
        Profile::Overcurrent,
        Profile::OpenCircuit,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Profile::Cold => "cold",
            Profile::Hot => "hot",
            Profile::Overcurrent => "overcurrent",
            Profile::OpenCircuit => "open-circuit",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        Self::ALL
            .into_iter()
            .find(|profile| tag.eq_ignore_ascii_case(profile.tag()))
            .ok_or_else(|| {
                format!("Unknown profile '{tag}'. Expected cold, hot, overcurrent, or open-circuit")
            })
    }

    fn plugs(self) -> [Plug; CHANNEL_COUNT] {
        let mut plugs = [Plug::at(AMBIENT_C); CHANNEL_COUNT];
        match self {
            Profile::Cold => {}
            Profile::Hot => plugs = [Plug::at(PREHEATED_C); CHANNEL_COUNT],
            Profile::Overcurrent => {
                plugs[SHORTED_CHANNEL].condition = PlugCondition::ShortsAt(SHORT_AT_MS);
            }
            Profile::OpenCircuit => plugs[OPEN_CHANNEL].condition = PlugCondition::OpenLoad,
        }
        plugs
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Outcome of a complete emulated run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSummary {
    pub final_state: ControllerState,
    pub first_faulted: Option<usize>,
    pub elapsed_ms: u32,
    pub events: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run ended in {} after {} ms with {} events",
            self.final_state, self.elapsed_ms, self.events
        )?;
        match self.first_faulted {
            Some(index) => write!(f, "; first fault on {}", channel_label(index)),
            None => f.write_str("; no faults"),
        }
    }
}

/// One controller wired to a simulated plant.
pub struct Session {
    profile: Profile,
    plant: SharedPlant,
    controller: EmulatedController,
    telemetry: ControllerTelemetry,
    cursor: EventId,
    events: usize,
    pattern: BlinkPattern,
    led: Option<LedLevel>,
}

impl Session {
    pub fn new(profile: Profile) -> Result<Self, ConfigError> {
        let config = ControllerConfig::DEFAULT;
        let plant = SharedPlant::new(PlantState::new(&config, profile.plugs()));
        let controller = GlowController::new(
            config,
            plant.sensors(),
            plant.outputs(),
            plant.delay(),
            plant.now(),
        )?;

        Ok(Self {
            profile,
            plant,
            controller,
            telemetry: ControllerTelemetry::new(),
            cursor: 0,
            events: 0,
            pattern: BlinkPattern::new(config.blink),
            led: None,
        })
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn controller(&self) -> &EmulatedController {
        &self.controller
    }

    pub fn plant(&self) -> &SharedPlant {
        &self.plant
    }

    /// Runs one control period and narrates anything it produced.
    pub fn step<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        let now = self.plant.now();
        self.controller.tick(now, &mut self.telemetry);
        self.flush(writer)?;

        let level = self.pattern.update(
            self.plant.now(),
            self.controller.fault_status(),
            self.controller.is_heating(),
        );
        if self.led != Some(level) {
            self.led = Some(level);
            write_led(writer, self.plant.now(), level)?;
        }

        self.plant.advance(TICK_MS);
        Ok(())
    }

    /// Steps until the controller settles, then keeps the indicator running a
    /// little longer so a fault code is visible in the output.
    pub fn run<W: Write>(&mut self, writer: &mut W) -> io::Result<RunSummary> {
        let start = self.plant.now();
        let mut settled_at: Option<Millis> = None;

        loop {
            self.step(writer)?;
            let now = self.plant.now();

            if settled_at.is_none() && self.controller.state().is_terminal() {
                settled_at = Some(now);
            }
            let tail_done = settled_at.is_some_and(|at| now.has_elapsed(at, INDICATOR_TAIL_MS));
            if tail_done || now.has_elapsed(start, MAX_RUN_MS) {
                break;
            }
        }

        Ok(RunSummary {
            final_state: self.controller.state(),
            first_faulted: self.controller.fault_status().first_faulted(),
            elapsed_ms: self.plant.now().elapsed_since(start),
            events: self.events,
        })
    }

    fn flush<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        for record in self.telemetry.records_since(self.cursor) {
            write_record(writer, record)?;
            self.events += 1;
        }
        self.cursor = self.telemetry.next_event_id();
        Ok(())
    }
}

fn write_record<W: Write>(writer: &mut W, record: &TelemetryRecord<Millis>) -> io::Result<()> {
    let label = record.event.channel().map_or("--", channel_label);
    let line = format!(
        "[+{:>6}ms] {label:<3} {} {}",
        record.timestamp.as_u32(),
        record.event,
        record.details
    );

    if record.event.is_fault() {
        writeln!(writer, "{}", line.red().bold())
    } else if matches!(record.event, TelemetryEventKind::StateChanged(_)) {
        writeln!(writer, "{}", line.cyan())
    } else {
        writeln!(writer, "{line}")
    }
}

fn write_led<W: Write>(writer: &mut W, now: Millis, level: LedLevel) -> io::Result<()> {
    let text = if level.is_on() { "led on" } else { "led off" };
    writeln!(writer, "[+{:>6}ms] --  {}", now.as_u32(), text.yellow())
}
