#![deny(unsafe_code)]
#![deny(warnings)]
//! Static buffers for the hub session
//!
//! Every connection attempt reuses the same TCP, TLS and MQTT buffers. They are
//! handed out once as `&'static mut` and reborrowed per session, so only one
//! session can hold them at a time.
//!
//! # Buffer Sizing
//!
//! **TLS read (18 KB)**: TLS 1.3 maximum plaintext (16384) plus record header,
//! AEAD tag and padding allowance.
//!
//! **TLS write (16 KB)**: maximum TLS 1.3 record size for outgoing data.
//!
//! **TCP (4 KB each way)**, **MQTT (2 KB)**: one QoS 0 telemetry PUBLISH
//! (under 1 KB of JSON) plus CONNECT with a SAS token password.
//!
//! All buffers live in main SRAM. `ConstStaticCell` places them in `.bss`
//! without staging them on the stack first.

use static_cell::ConstStaticCell;

pub const TLS_READ_BUF_SIZE: usize = 18 * 1024;
pub const TLS_WRITE_BUF_SIZE: usize = 16 * 1024;
pub const TCP_BUF_SIZE: usize = 4096;
pub const MQTT_BUF_SIZE: usize = 2048;

static TLS_READ: ConstStaticCell<[u8; TLS_READ_BUF_SIZE]> =
    ConstStaticCell::new([0; TLS_READ_BUF_SIZE]);
static TLS_WRITE: ConstStaticCell<[u8; TLS_WRITE_BUF_SIZE]> =
    ConstStaticCell::new([0; TLS_WRITE_BUF_SIZE]);
static TCP_RX: ConstStaticCell<[u8; TCP_BUF_SIZE]> = ConstStaticCell::new([0; TCP_BUF_SIZE]);
static TCP_TX: ConstStaticCell<[u8; TCP_BUF_SIZE]> = ConstStaticCell::new([0; TCP_BUF_SIZE]);
static MQTT: ConstStaticCell<[u8; MQTT_BUF_SIZE]> = ConstStaticCell::new([0; MQTT_BUF_SIZE]);

pub struct SessionBuffers {
    pub tls_read: &'static mut [u8; TLS_READ_BUF_SIZE],
    pub tls_write: &'static mut [u8; TLS_WRITE_BUF_SIZE],
    pub tcp_rx: &'static mut [u8; TCP_BUF_SIZE],
    pub tcp_tx: &'static mut [u8; TCP_BUF_SIZE],
    pub mqtt: &'static mut [u8; MQTT_BUF_SIZE],
}

impl SessionBuffers {
    /// Claim the buffers; `None` if they were already claimed
    pub fn take() -> Option<Self> {
        Some(Self {
            tls_read: TLS_READ.try_take()?,
            tls_write: TLS_WRITE.try_take()?,
            tcp_rx: TCP_RX.try_take()?,
            tcp_tx: TCP_TX.try_take()?,
            mqtt: MQTT.try_take()?,
        })
    }
}
