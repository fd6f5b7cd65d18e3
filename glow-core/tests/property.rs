mod support;

use glow_core::board::CHANNEL_COUNT;
use glow_core::config::ControllerConfig;
use glow_core::scheduler::OutputScheduler;
use glow_core::sensor::SensorModel;
use glow_core::time::Millis;
use proptest::prelude::*;
use support::{Harness, MockSensors, NOMINAL_A, TICK_MS};

prop_compose! {
    // A run of (channel, raise/clear) flag updates, including some out-of-range channels.
    fn fault_updates()(
        updates in prop::collection::vec((0usize..CHANNEL_COUNT + 2, any::<bool>()), 1..64)
    ) -> Vec<(usize, bool)> {
        updates
    }
}

prop_compose! {
    // Per-channel time at which the channel gets disabled, or never.
    fn disable_plan()(
        plan in prop::collection::vec(prop::option::of(0u32..20_000), CHANNEL_COUNT)
    ) -> Vec<Option<u32>> {
        plan
    }
}

proptest! {
    #[test]
    fn first_faulted_is_always_the_lowest_faulted_index(updates in fault_updates()) {
        let mut scheduler = OutputScheduler::<CHANNEL_COUNT>::new(&ControllerConfig::DEFAULT);
        let mut expected = [false; CHANNEL_COUNT];

        for (index, faulted) in updates {
            let result = scheduler.set_fault(index, faulted);
            if index < CHANNEL_COUNT {
                prop_assert!(result.is_ok());
                expected[index] = faulted;
            } else {
                prop_assert!(result.is_err());
            }

            let lowest = expected.iter().position(|flag| *flag);
            prop_assert_eq!(scheduler.faults().first_faulted(), lowest);
            prop_assert_eq!(scheduler.faults().has_any_fault(), lowest.is_some());
            for (channel, flag) in scheduler.channels().iter().zip(expected) {
                prop_assert_eq!(channel.is_faulted(), flag);
            }
        }
    }

    #[test]
    fn temperature_estimate_stays_within_model_bounds(current in -5.0f32..40.0) {
        let model = SensorModel::default();
        let thermal = model.thermal();
        let estimate = model.estimate_temperature(current);

        prop_assert!(estimate >= thermal.ambient_c);
        prop_assert!(estimate <= thermal.max_c);
        if current <= thermal.no_load_current_a {
            prop_assert_eq!(estimate, thermal.ambient_c);
        }
    }

    #[test]
    fn temperature_estimate_never_rises_with_current(low in 0.11f32..30.0, step in 0.0f32..10.0) {
        let model = SensorModel::default();
        let high = low + step;
        prop_assert!(model.estimate_temperature(high) <= model.estimate_temperature(low));
    }

    #[test]
    fn disabled_channels_never_receive_duty(plan in disable_plan()) {
        let mut harness = Harness::new(MockSensors::uniform(NOMINAL_A));

        while harness.now <= 20_000 {
            for (channel, at) in plan.iter().enumerate() {
                let now = harness.now;
                if at.is_some_and(|at| at / TICK_MS * TICK_MS == now) {
                    harness
                        .controller
                        .set_channel_enabled(channel, false, Millis::new(now), &mut harness.telemetry)
                        .map_err(|err| TestCaseError::fail(err.to_string()))?;
                }
            }

            harness.step();

            let duties = harness.duties();
            for channel in harness.controller.scheduler().channels() {
                if !channel.is_enabled() {
                    prop_assert_eq!(duties[channel.index()], 0.0);
                    prop_assert_eq!(channel.commanded_duty(), 0.0);
                }
            }
        }

        prop_assert!(harness.controller.state().is_terminal());
    }
}
