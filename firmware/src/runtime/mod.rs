use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::adc::{Adc, AdcChannel};
use embassy_stm32::gpio::{Level, Output, OutputType, Speed};
use embassy_stm32::time::hz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use glow_core::supervisor::GlowController;

use crate::config::{BOARD_CONFIG, PWM_FREQUENCY_HZ};
use crate::hw::{BlockingSettle, PwmBank, SenseBank, now_millis};

mod control_task;
mod indicator_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        TIM1,
        TIM3,
        ADC1,
        PA0,
        PA1,
        PA4,
        PA5,
        PA6,
        PA7,
        PA8,
        PA9,
        PA10,
        PA11,
        PB0,
        PB1,
        PC6,
        ..
    } = hal::init(config);

    let frequency = hz(PWM_FREQUENCY_HZ);
    let tim1 = SimplePwm::new(
        TIM1,
        Some(PwmPin::new(PA8, OutputType::PushPull)),
        Some(PwmPin::new(PA9, OutputType::PushPull)),
        Some(PwmPin::new(PA10, OutputType::PushPull)),
        Some(PwmPin::new(PA11, OutputType::PushPull)),
        frequency,
        CountingMode::EdgeAlignedUp,
    );
    let tim3 = SimplePwm::new(
        TIM3,
        Some(PwmPin::new(PA6, OutputType::PushPull)),
        Some(PwmPin::new(PA7, OutputType::PushPull)),
        None,
        None,
        frequency,
        CountingMode::EdgeAlignedUp,
    );
    let outputs = PwmBank::new(tim1, tim3);

    let sense = SenseBank::new(
        Adc::new(ADC1),
        [
            PA0.degrade_adc(),
            PA1.degrade_adc(),
            PA4.degrade_adc(),
            PA5.degrade_adc(),
            PB0.degrade_adc(),
            PB1.degrade_adc(),
        ],
    );

    let led = Output::new(PC6, Level::Low, Speed::Low);

    let controller = GlowController::new(BOARD_CONFIG, sense, outputs, BlockingSettle, now_millis())
        .expect("glow controller configuration");

    spawner
        .spawn(control_task::run(controller))
        .expect("failed to spawn control task");
    spawner
        .spawn(indicator_task::run(led, BOARD_CONFIG.blink))
        .expect("failed to spawn indicator task");

    core::future::pending::<()>().await;
}
