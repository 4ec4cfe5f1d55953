#![deny(unsafe_code)]
#![deny(warnings)]
//! Sensor-board serial link (USART3, 115200 8N1)
//!
//! The reader decodes every complete line into a fresh `TelemetryRecord` and
//! posts it to `LATEST_FRAME`. Only the network task consumes it, so the record
//! it owns is never written from two places. Frames that arrive between two
//! publishes overwrite each other; the newest one is sent.
//!
//! Reception runs on a circular DMA ring, so bytes keep landing while a chunk
//! is being decoded.

use defmt::{debug, info, warn, Debug2Format};
use embassy_stm32::mode::Async;
use embassy_stm32::usart::{RingBufferedUartRx, UartRx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use hub_bridge_core::{decode_frame, LineAssembler, LineEvent, TelemetryRecord, MAX_FRAME_LEN};
use static_cell::ConstStaticCell;

pub const BAUD_RATE: u32 = 115_200;

/// DMA ring; two full frames of slack between reads
const RX_RING_LEN: usize = 2 * MAX_FRAME_LEN;

static RX_RING: ConstStaticCell<[u8; RX_RING_LEN]> = ConstStaticCell::new([0; RX_RING_LEN]);

static LATEST_FRAME: Signal<CriticalSectionRawMutex, TelemetryRecord> = Signal::new();

/// Most recent decoded frame not yet consumed
pub fn take_frame() -> Option<TelemetryRecord> {
    LATEST_FRAME.try_take()
}

/// Attach the DMA ring to `rx`; `None` if the ring is already in use
pub fn ring_buffered(rx: UartRx<'static, Async>) -> Option<RingBufferedUartRx<'static>> {
    Some(rx.into_ring_buffered(RX_RING.try_take()?))
}

/// Read and decode frames forever
pub async fn run(mut rx: RingBufferedUartRx<'static>) -> ! {
    let mut assembler = LineAssembler::<MAX_FRAME_LEN>::new();
    let mut chunk = [0u8; 64];
    info!("Serial reader started at {} baud", BAUD_RATE);

    loop {
        let len = match rx.read(&mut chunk).await {
            Ok(len) => len,
            Err(e) => {
                // Ring overrun or framing error: the partial line is unreliable
                warn!("UART error: {}", Debug2Format(&e));
                assembler.reset();
                continue;
            }
        };

        for &byte in &chunk[..len] {
            match assembler.push(byte) {
                None | Some(LineEvent::Line("")) => {}
                Some(LineEvent::Line(line)) => match decode_frame(line) {
                    Ok(record) => {
                        debug!("Frame decoded: {}", record);
                        LATEST_FRAME.signal(record);
                    }
                    Err(e) => warn!("Dropping frame: {}", e),
                },
                Some(LineEvent::Overflow) => {
                    warn!("Dropping frame longer than {} bytes", MAX_FRAME_LEN)
                }
                Some(LineEvent::Invalid) => warn!("Dropping non-UTF-8 frame"),
            }
        }
    }
}
