//! STM32G0 adapters for the `glow-core` collaborator traits.
//!
//! Channel order follows `glow_core::board::GLOW_CHANNELS`: GP1-GP4 on TIM1
//! CH1-CH4 (PA8-PA11), GP5-GP6 on TIM3 CH1-CH2 (PA6, PA7). The IS dividers
//! are sampled on PA0, PA1, PA4, PA5, PB0 and PB1 in the same order.

#![cfg(target_os = "none")]

use embassy_stm32::adc::{Adc, AnyAdcChannel, Resolution, SampleTime};
use embassy_stm32::peripherals::{ADC1, TIM1, TIM3};
use embassy_stm32::timer::GeneralInstance4Channel;
use embassy_stm32::timer::simple_pwm::{SimplePwm, SimplePwmChannel};
use embassy_time::{Duration, Instant, block_for};
use glow_core::board::CHANNEL_COUNT;
use glow_core::scheduler::{OutputDriver, SettleDelay};
use glow_core::sensor::SampleSource;
use glow_core::time::Millis;

/// Current loop time as a wrapping millisecond stamp.
#[allow(clippy::cast_possible_truncation)]
pub fn now_millis() -> Millis {
    // Truncation is the wrap.
    Millis::new(Instant::now().as_millis() as u32)
}

/// Six PWM outputs spread across TIM1 and TIM3.
pub struct PwmBank<'d> {
    tim1: [SimplePwmChannel<'d, TIM1>; 4],
    tim3: [SimplePwmChannel<'d, TIM3>; 2],
}

impl<'d> PwmBank<'d> {
    /// Splits both timers into channels, enables them at zero duty.
    pub fn new(tim1: SimplePwm<'d, TIM1>, tim3: SimplePwm<'d, TIM3>) -> Self {
        let tim1 = tim1.split();
        let tim3 = tim3.split();
        let mut bank = Self {
            tim1: [tim1.ch1, tim1.ch2, tim1.ch3, tim1.ch4],
            tim3: [tim3.ch1, tim3.ch2],
        };

        for channel in &mut bank.tim1 {
            channel.set_duty_cycle_fully_off();
            channel.enable();
        }
        for channel in &mut bank.tim3 {
            channel.set_duty_cycle_fully_off();
            channel.enable();
        }
        bank
    }
}

impl OutputDriver for PwmBank<'_> {
    fn apply_duty(&mut self, channel: usize, duty: f32) {
        let duty = if duty.is_nan() { 0.0 } else { duty.clamp(0.0, 1.0) };
        match channel {
            0..=3 => set_fraction(&mut self.tim1[channel], duty),
            4 | 5 => set_fraction(&mut self.tim3[channel - 4], duty),
            _ => {}
        }
    }

    fn release_all(&mut self) {
        for channel in &mut self.tim1 {
            channel.set_duty_cycle_fully_off();
        }
        for channel in &mut self.tim3 {
            channel.set_duty_cycle_fully_off();
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn set_fraction<T: GeneralInstance4Channel>(channel: &mut SimplePwmChannel<'_, T>, duty: f32) {
    let max = channel.max_duty_cycle();
    let counts = (f32::from(max) * duty + 0.5) as u16;
    channel.set_duty_cycle(counts.min(max));
}

/// IS divider inputs sampled through ADC1.
pub struct SenseBank<'d> {
    adc: Adc<'d, ADC1>,
    inputs: [AnyAdcChannel<ADC1>; CHANNEL_COUNT],
}

impl<'d> SenseBank<'d> {
    pub fn new(mut adc: Adc<'d, ADC1>, inputs: [AnyAdcChannel<ADC1>; CHANNEL_COUNT]) -> Self {
        adc.set_resolution(Resolution::BITS10);
        adc.set_sample_time(SampleTime::CYCLES79_5);
        Self { adc, inputs }
    }
}

impl SampleSource for SenseBank<'_> {
    fn read_raw(&mut self, channel: usize) -> u16 {
        match self.inputs.get_mut(channel) {
            Some(input) => self.adc.blocking_read(input),
            None => 0,
        }
    }
}

/// Busy-wait used only by the boot probe.
#[derive(Copy, Clone, Debug, Default)]
pub struct BlockingSettle;

impl SettleDelay for BlockingSettle {
    fn block_ms(&mut self, ms: u32) {
        block_for(Duration::from_millis(u64::from(ms)));
    }
}
