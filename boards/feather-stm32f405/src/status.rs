#![deny(unsafe_code)]
#![deny(warnings)]
//! Status LED (PC1)
//!
//! Lit while the connection chain runs, dark once the hub session is up, and
//! flashed briefly for every telemetry publish.

use embassy_stm32::gpio::Output;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;

const PUBLISH_FLASH_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Activity {
    Connecting,
    Connected,
    Published,
}

static ACTIVITY: Signal<CriticalSectionRawMutex, Activity> = Signal::new();

pub fn report(activity: Activity) {
    ACTIVITY.signal(activity);
}

/// Drive the LED from reported activity forever
pub async fn run(led: &mut Output<'static>) -> ! {
    loop {
        match ACTIVITY.wait().await {
            Activity::Connecting => led.set_high(),
            Activity::Connected => led.set_low(),
            Activity::Published => {
                led.set_high();
                Timer::after_millis(PUBLISH_FLASH_MS).await;
                led.set_low();
            }
        }
    }
}
