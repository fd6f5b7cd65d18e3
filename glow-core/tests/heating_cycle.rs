mod support;

use glow_core::board::CHANNEL_COUNT;
use glow_core::indicator::{BlinkPattern, LedLevel};
use glow_core::scheduler::{ChannelPhase, ThermalClass};
use glow_core::supervisor::{ControllerState, GlowController};
use glow_core::telemetry::{ControllerTelemetry, TelemetryEventKind};
use glow_core::time::Millis;
use support::{HOT_A, Harness, MockDelay, MockDriver, MockSensors, NOMINAL_A, TICK_MS};

#[test]
fn cold_start_runs_full_budget_then_settles_in_low_power() {
    let mut harness = Harness::new(MockSensors::uniform(NOMINAL_A));

    harness.run_until(990);
    assert_eq!(harness.controller.state(), ControllerState::BootDelay);
    assert_eq!(harness.duties(), [0.0; CHANNEL_COUNT]);

    harness.run_until(1_000);
    assert_eq!(harness.controller.state(), ControllerState::FullPower);
    assert_eq!(harness.controller.driver().duties, [0.0; CHANNEL_COUNT]);
    assert_eq!(harness.controller.sensors().currents, [NOMINAL_A; CHANNEL_COUNT]);
    for channel in harness.controller.scheduler().channels() {
        assert_eq!(channel.thermal_class(), ThermalClass::Cold);
        assert_eq!(channel.total_duration_ms(), 15_000);
        assert_eq!(channel.phase(), ChannelPhase::WaitingToStart);
    }

    harness.run_until(18_490);
    assert_eq!(harness.controller.state(), ControllerState::FullPower);
    assert_eq!(harness.phase(5), ChannelPhase::ReducedPower);

    harness.run_until(18_500);
    assert_eq!(harness.controller.state(), ControllerState::LowPower);
    assert_eq!(harness.duties(), [0.0; CHANNEL_COUNT]);
    assert_eq!(harness.controller.driver().releases, 1);
    assert!(harness.controller.scheduler().all_finished());
    assert!(!harness.controller.fault_status().has_any_fault());

    let state_changes: Vec<_> = harness
        .log
        .iter()
        .filter_map(|(at, event)| match event {
            TelemetryEventKind::StateChanged(state) => Some((*at, *state)),
            _ => None,
        })
        .collect();
    assert_eq!(
        state_changes,
        vec![
            (1_000, ControllerState::FullPower),
            (18_500, ControllerState::LowPower)
        ]
    );

    harness.run_until(30_000);
    assert_eq!(harness.controller.state(), ControllerState::LowPower);
}

#[test]
fn every_channel_runs_full_then_reduced_then_finished() {
    let mut harness = Harness::new(MockSensors::uniform(NOMINAL_A));
    let mut applied = Vec::new();
    while harness.now <= 18_500 {
        let at = harness.now;
        harness.step();
        applied.push((at, harness.duties()));
    }
    let duties_at = |at: u32| {
        applied
            .iter()
            .find(|(tick, _)| *tick == at)
            .map(|(_, duties)| *duties)
            .expect("ticked at this time")
    };

    for channel in 0..CHANNEL_COUNT {
        let offset = 500 * u32::try_from(channel).expect("small index");
        // The boot tick only starts the schedule, so channel 0 goes live a tick later.
        let full_at = (1_000 + offset).max(1_000 + TICK_MS);
        let reduced_at = full_at + 5_000;
        let finished_at = full_at + 15_000;

        assert_eq!(
            harness.first(TelemetryEventKind::PhaseChanged(channel, ChannelPhase::FullPower)),
            Some(full_at),
            "channel {channel}"
        );
        assert_eq!(duties_at(full_at)[channel], 1.0, "channel {channel}");
        assert_eq!(duties_at(reduced_at - TICK_MS)[channel], 1.0, "channel {channel}");

        assert_eq!(
            harness.first(TelemetryEventKind::PhaseChanged(
                channel,
                ChannelPhase::ReducedPower
            )),
            Some(reduced_at),
            "channel {channel}"
        );
        assert_eq!(duties_at(reduced_at)[channel], 0.6, "channel {channel}");
        assert_eq!(duties_at(finished_at - TICK_MS)[channel], 0.6, "channel {channel}");

        assert_eq!(
            harness.first(TelemetryEventKind::PhaseChanged(channel, ChannelPhase::Finished)),
            Some(finished_at),
            "channel {channel}"
        );
        assert_eq!(duties_at(finished_at)[channel], 0.0, "channel {channel}");
    }
}

#[test]
fn status_led_is_lit_only_while_heating() {
    let mut harness = Harness::new(MockSensors::uniform(NOMINAL_A));
    let mut pattern = BlinkPattern::new(harness.controller.config().blink);

    while harness.now <= 25_000 {
        let at = harness.now;
        harness.step();
        let level = pattern.update(
            Millis::new(at),
            harness.controller.fault_status(),
            harness.controller.is_heating(),
        );
        let expected = if (1_000..18_500).contains(&at) {
            LedLevel::On
        } else {
            LedLevel::Off
        };
        assert_eq!(level, expected, "at {at} ms");
    }
}

#[test]
fn channels_start_one_stagger_interval_apart() {
    let mut harness = Harness::new(MockSensors::uniform(NOMINAL_A));

    harness.run_until(1_490);
    assert_eq!(harness.duties()[0], 1.0);
    assert_eq!(harness.duties()[1], 0.0);
    assert_eq!(harness.phase(1), ChannelPhase::WaitingToStart);

    harness.step();
    assert_eq!(harness.duties()[1], 1.0);

    harness.run_until(3_500);
    for channel in 1..CHANNEL_COUNT {
        let start = 1_000 + 500 * u32::try_from(channel).expect("small index");
        assert_eq!(
            harness.first(TelemetryEventKind::PhaseChanged(
                channel,
                ChannelPhase::FullPower
            )),
            Some(start),
            "channel {channel}"
        );
    }
    // The first channel is picked up on the tick after the probe.
    assert_eq!(
        harness.first(TelemetryEventKind::PhaseChanged(0, ChannelPhase::FullPower)),
        Some(1_000 + TICK_MS)
    );
}

#[test]
fn full_power_drops_to_reduced_duty() {
    let mut harness = Harness::new(MockSensors::uniform(NOMINAL_A));

    harness.run_until(6_000);
    assert_eq!(harness.duties()[0], 1.0);
    assert_eq!(harness.phase(0), ChannelPhase::FullPower);

    harness.step();
    assert_eq!(harness.phase(0), ChannelPhase::ReducedPower);
    assert_eq!(harness.duties()[0], 0.6);
    assert_eq!(harness.duties()[5], 1.0);
}

#[test]
fn hot_plug_gets_shorter_budget() {
    let mut sensors = MockSensors::uniform(NOMINAL_A);
    sensors.currents[1] = HOT_A;
    let mut harness = Harness::new(sensors);

    harness.run_until(1_000);
    let hot = &harness.controller.scheduler().channels()[1];
    assert_eq!(hot.thermal_class(), ThermalClass::Hot);
    assert_eq!(hot.total_duration_ms(), 10_000);
    assert!(hot.initial_temperature_c() >= 200.0);

    harness.run_until(12_000);
    assert_eq!(
        harness.first(TelemetryEventKind::PhaseChanged(1, ChannelPhase::Finished)),
        Some(11_500)
    );
    assert_eq!(
        harness.first(TelemetryEventKind::PhaseChanged(1, ChannelPhase::ReducedPower)),
        Some(6_500)
    );
    assert_eq!(harness.phase(0), ChannelPhase::ReducedPower);
}

#[test]
fn probe_blocks_for_settle_and_release() {
    let mut harness = Harness::new(MockSensors::uniform(NOMINAL_A));
    harness.run_until(1_000);

    assert_eq!(harness.controller.scheduler().channels().len(), CHANNEL_COUNT);
    let classified = harness.count(|event| matches!(event, TelemetryEventKind::ChannelClassified(_)));
    assert_eq!(classified, CHANNEL_COUNT);

    assert_eq!(harness.controller.delay().waits, vec![200, 50]);
    assert_eq!(harness.duties(), [0.0; CHANNEL_COUNT]);
}

#[test]
fn channel_disabled_before_boot_never_energizes() {
    let mut harness = Harness::new(MockSensors::uniform(NOMINAL_A));
    harness
        .controller
        .set_channel_enabled(4, false, Millis::ZERO, &mut harness.telemetry)
        .expect("in range");

    let mut peak = 0.0_f32;
    while harness.now <= 19_000 {
        harness.step();
        peak = peak.max(harness.duties()[4]);
    }

    assert_eq!(peak, 0.0);
    assert_eq!(harness.phase(4), ChannelPhase::Finished);
    assert_eq!(harness.controller.state(), ControllerState::LowPower);
    assert_eq!(
        harness.count(|event| *event == TelemetryEventKind::TemperatureSample(4)),
        0
    );
}

#[test]
fn reenable_before_boot_restores_channel() {
    let mut harness = Harness::new(MockSensors::uniform(NOMINAL_A));
    let now = Millis::new(100);
    harness
        .controller
        .set_channel_enabled(2, false, now, &mut harness.telemetry)
        .expect("in range");
    harness
        .controller
        .set_channel_enabled(2, true, now, &mut harness.telemetry)
        .expect("in range");

    harness.run_until(2_010);
    assert_eq!(harness.phase(2), ChannelPhase::FullPower);
}

#[test]
fn reenable_after_start_stays_finished() {
    let mut harness = Harness::new(MockSensors::uniform(NOMINAL_A));
    harness.run_until(3_000);

    let telemetry = &mut harness.telemetry;
    harness
        .controller
        .set_channel_enabled(3, false, Millis::new(3_000), telemetry)
        .expect("in range");
    assert_eq!(harness.controller.driver().duties[3], 0.0);
    harness
        .controller
        .set_channel_enabled(3, true, Millis::new(3_000), telemetry)
        .expect("in range");

    harness.run_until(5_000);
    assert_eq!(harness.phase(3), ChannelPhase::Finished);
    assert_eq!(harness.duties()[3], 0.0);
}

#[test]
fn out_of_range_channel_is_reported_not_fatal() {
    let mut harness = Harness::new(MockSensors::uniform(NOMINAL_A));
    let result = harness.controller.set_channel_enabled(
        CHANNEL_COUNT,
        false,
        Millis::ZERO,
        &mut harness.telemetry,
    );

    assert!(result.is_err());
    assert_eq!(harness.controller.scheduler().invalid_requests(), 1);

    harness.drain();
    assert_eq!(
        harness.first(TelemetryEventKind::InvalidChannel(CHANNEL_COUNT)),
        Some(0)
    );

    harness.run_until(1_010);
    assert_eq!(harness.controller.state(), ControllerState::FullPower);
}

#[test]
fn temperature_samples_are_throttled_per_channel() {
    let mut harness = Harness::new(MockSensors::uniform(NOMINAL_A));
    harness.run_until(4_000);

    // One sample per channel per second from the first heating tick.
    for channel in 0..CHANNEL_COUNT {
        let samples =
            harness.count(|event| *event == TelemetryEventKind::TemperatureSample(channel));
        assert_eq!(samples, 3, "channel {channel}");
    }
}

#[test]
fn schedule_survives_counter_wrap() {
    let start = Millis::new(u32::MAX - 5_000);
    let mut telemetry = ControllerTelemetry::new();
    let mut controller: GlowController<CHANNEL_COUNT, _, _, _> = GlowController::new(
        glow_core::config::ControllerConfig::DEFAULT,
        MockSensors::uniform(NOMINAL_A),
        MockDriver::default(),
        MockDelay::default(),
        start,
    )
    .expect("default config is valid");

    let mut elapsed = 0;
    while elapsed <= 18_500 {
        controller.tick(start.wrapping_add(elapsed), &mut telemetry);
        elapsed += TICK_MS;
    }

    assert_eq!(controller.state(), ControllerState::LowPower);
    assert_eq!(
        controller.state_started_at(),
        start.wrapping_add(18_500)
    );
}
