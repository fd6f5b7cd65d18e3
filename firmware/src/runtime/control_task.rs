use embassy_time::{Duration, Ticker};
use glow_core::board::CHANNEL_COUNT;
use glow_core::supervisor::GlowController;
use glow_core::telemetry::ControllerTelemetry;

use crate::config::CONTROL_PERIOD_MS;
use crate::hw::{BlockingSettle, PwmBank, SenseBank, now_millis};
use crate::status;
use crate::telemetry::TelemetryDrain;

pub type BoardController =
    GlowController<CHANNEL_COUNT, SenseBank<'static>, PwmBank<'static>, BlockingSettle>;

#[embassy_executor::task]
pub async fn run(mut controller: BoardController) -> ! {
    let mut telemetry = ControllerTelemetry::new();
    let mut drain = TelemetryDrain::new();
    let mut ticker = Ticker::every(Duration::from_millis(CONTROL_PERIOD_MS));

    loop {
        controller.tick(now_millis(), &mut telemetry);

        status::record_state(controller.state());
        status::record_fault_status(controller.fault_status());
        drain.flush(&telemetry);

        ticker.next().await;
    }
}
