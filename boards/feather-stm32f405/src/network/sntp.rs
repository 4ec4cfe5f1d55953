#![deny(unsafe_code)]
#![deny(warnings)]
//! SNTP client for the `TimeSyncing` state
//!
//! One 48-byte client request per attempt, validated by source address and
//! stratum, with half the round-trip time added to the server's transmit
//! timestamp. The caller pins the result to the monotonic timer through
//! `hub_bridge_core::clock::WallClock`.

use defmt::{error, info, warn, Debug2Format, Format};
use embassy_futures::select::{select, Either};
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::Stack;
use embassy_time::{Duration, Instant, Timer};

use super::config::SntpConfig;
use super::error::NetworkError;
use super::socket::resolve;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970)
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

const NTP_PORT: u16 = 123;
const NTP_PACKET_LEN: usize = 48;

/// Delay between failed attempts
const RETRY_DELAY_MS: u64 = 2000;

/// Server time with microsecond precision, taken at `mono_micros`
#[derive(Debug, Clone, Copy, Format)]
pub struct Timestamp {
    pub unix_secs: u64,
    /// Microseconds component (0-999,999)
    pub micros: u32,
    /// Monotonic time at which the response arrived
    pub mono_micros: u64,
}

impl Timestamp {
    fn from_ntp(ntp_secs: u64, ntp_frac: u32, mono_micros: u64) -> Self {
        Self {
            unix_secs: ntp_secs.saturating_sub(NTP_UNIX_OFFSET),
            // NTP fraction is in units of 2^-32 s
            micros: ((ntp_frac as u64 * 1_000_000) >> 32) as u32,
            mono_micros,
        }
    }

    fn add_micros(mut self, micros: u64) -> Self {
        let total = self.micros as u64 + micros;
        self.unix_secs = self.unix_secs.saturating_add(total / 1_000_000);
        self.micros = (total % 1_000_000) as u32;
        self
    }
}

pub struct SntpClient {
    config: SntpConfig,
}

impl SntpClient {
    pub fn new() -> Self {
        Self {
            config: SntpConfig::default(),
        }
    }

    /// Query the configured servers in order until one answers
    pub async fn sync(&self, stack: &Stack<'static>) -> Result<Timestamp, NetworkError> {
        for server in self.config.servers {
            for attempt in 0..self.config.retry_count {
                info!("SNTP request to {} (attempt {})", server, attempt + 1);
                match self.request(stack, server).await {
                    Ok(timestamp) => {
                        info!(
                            "SNTP time: {}.{:06} UTC",
                            timestamp.unix_secs, timestamp.micros
                        );
                        return Ok(timestamp);
                    }
                    Err(e) => {
                        warn!("SNTP request to {} failed: {}", server, e);
                        Timer::after_millis(RETRY_DELAY_MS).await;
                    }
                }
            }
        }
        error!("All SNTP servers failed");
        Err(NetworkError::AllServersFailed)
    }

    async fn request(
        &self,
        stack: &Stack<'static>,
        server: &str,
    ) -> Result<Timestamp, NetworkError> {
        let endpoint = resolve(stack, server, NTP_PORT).await?;

        let mut rx_meta = [PacketMetadata::EMPTY; 2];
        let mut rx_buffer = [0u8; 64];
        let mut tx_meta = [PacketMetadata::EMPTY; 2];
        let mut tx_buffer = [0u8; 64];
        let mut socket = UdpSocket::new(
            *stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        socket.bind(0).map_err(|_| NetworkError::SocketError)?;

        // LI=0, VN=3, Mode=3 (client)
        let mut request = [0u8; NTP_PACKET_LEN];
        request[0] = 0x1B;
        let sent_at = Instant::now();
        socket
            .send_to(&request, endpoint)
            .await
            .map_err(|_| NetworkError::SocketError)?;

        let mut response = [0u8; NTP_PACKET_LEN];
        let timeout = Timer::after(Duration::from_millis(self.config.timeout_ms));
        let (len, from) = match select(timeout, socket.recv_from(&mut response)).await {
            Either::First(_) => return Err(NetworkError::Timeout),
            Either::Second(result) => result.map_err(|_| NetworkError::SocketError)?,
        };
        let received_at = Instant::now();

        if len < NTP_PACKET_LEN || from.endpoint.addr != endpoint.addr {
            warn!("Unexpected SNTP reply from {}", Debug2Format(&from));
            return Err(NetworkError::InvalidResponse);
        }

        let stratum = response[1];
        if stratum == 0 || stratum > self.config.max_stratum {
            warn!(
                "Rejecting stratum {} (max {})",
                stratum, self.config.max_stratum
            );
            return Err(NetworkError::ServerError);
        }

        let tx_secs =
            u32::from_be_bytes([response[40], response[41], response[42], response[43]]) as u64;
        let tx_frac = u32::from_be_bytes([response[44], response[45], response[46], response[47]]);

        let half_rtt = received_at.duration_since(sent_at).as_micros() / 2;
        Ok(Timestamp::from_ntp(tx_secs, tx_frac, received_at.as_micros()).add_micros(half_rtt))
    }
}

impl Default for SntpClient {
    fn default() -> Self {
        Self::new()
    }
}
