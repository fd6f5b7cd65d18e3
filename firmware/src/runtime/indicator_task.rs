use embassy_stm32::gpio::Output;
use embassy_time::{Duration, Ticker};
use glow_core::config::BlinkConfig;
use glow_core::indicator::{BlinkPattern, LedLevel};

use crate::config::INDICATOR_PERIOD_MS;
use crate::hw::now_millis;
use crate::status;

#[embassy_executor::task]
pub async fn run(mut led: Output<'static>, config: BlinkConfig) -> ! {
    let mut pattern = BlinkPattern::new(config);
    let mut ticker = Ticker::every(Duration::from_millis(INDICATOR_PERIOD_MS));

    loop {
        match pattern.update(now_millis(), status::fault_status(), status::is_heating()) {
            LedLevel::On => led.set_high(),
            LedLevel::Off => led.set_low(),
        }

        ticker.next().await;
    }
}
