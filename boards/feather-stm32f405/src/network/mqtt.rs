#![deny(warnings)]
//! IoT Hub session over MQTT v5 and TLS 1.3
//!
//! One call to `HubSession::run` covers `MqttConnecting` and `Connected`:
//! resolve, TCP connect, TLS handshake, MQTT CONNECT with the SAS token as
//! password, then the publish loop. The session ends when the token reaches
//! its refresh point or on the first transport error. Either way the caller
//! decides what happens next; nothing here retries.

#![allow(unsafe_code)] // TopicName::new_unchecked

use defmt::{debug, error, info, warn, Debug2Format};
use embassy_net::Stack;
use embassy_time::{Instant, Timer};
use embedded_tls::{
    Aes128GcmSha256, CryptoProvider, NoVerify, TlsConfig, TlsConnection, TlsContext, TlsVerifier,
};
use heapless::String;
use hub_bridge_core::hub::{self, MAX_TOPIC_LEN, MAX_USER_NAME_LEN};
use hub_bridge_core::{
    HubConfig, SasToken, TelemetrySchedule, TelemetryState, TokenRefresh, WallClock,
    PAYLOAD_CAPACITY,
};
use rust_mqtt::{
    buffer::BumpBuffer,
    client::{
        options::{ConnectOptions, PublicationOptions, TopicReference},
        Client,
    },
    config::{KeepAlive, SessionExpiryInterval},
    types::{MqttBinary, MqttString, QoS, TopicName},
    Bytes,
};

use crate::serial;
use crate::status::{self, Activity};
use crate::tls_buffers::SessionBuffers;

use super::error::{MqttError, NetworkError, TlsError};
use super::socket::{resolve, AsyncTcpSocket};

/// Publish loop wake-up period; bounds how late a token refresh is noticed
const LOOP_TICK_MS: u64 = 1000;

const KEEP_ALIVE_SECS: u16 = 60;

/// Why a session ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum SessionEnd {
    /// The token is about to expire; sign a new one and reconnect
    TokenRefreshDue,
}

/// Crypto provider wrapping the hardware RNG
///
/// Server certificates are not verified: embedded-tls has no X.509 chain
/// validation on this target.
struct SimpleCryptoProvider<'a, RNG> {
    rng: &'a mut RNG,
    verifier: NoVerify,
}

impl<'a, RNG> SimpleCryptoProvider<'a, RNG> {
    fn new(rng: &'a mut RNG) -> Self {
        Self {
            rng,
            verifier: NoVerify,
        }
    }
}

impl<'a, RNG> CryptoProvider for SimpleCryptoProvider<'a, RNG>
where
    RNG: rand_core::CryptoRngCore,
{
    type CipherSuite = Aes128GcmSha256;
    type Signature = &'static [u8];

    fn rng(&mut self) -> impl rand_core::CryptoRngCore {
        &mut *self.rng
    }

    fn verifier(
        &mut self,
    ) -> Result<&mut impl TlsVerifier<Self::CipherSuite>, embedded_tls::TlsError> {
        Ok(&mut self.verifier)
    }
}

/// Sign a token valid for `config.token_ttl_secs` from the current wall time
pub fn sign_token(config: &HubConfig, clock: &WallClock) -> Result<SasToken, NetworkError> {
    let now = clock
        .now_unix(Instant::now().as_micros())
        .ok_or(NetworkError::ClockNotSynced)?;
    Ok(SasToken::generate(
        config.host,
        config.device_id,
        config.device_key,
        config.token_expiry(now),
    )?)
}

/// Long-lived IoT Hub connection settings and derived names
pub struct HubSession {
    config: HubConfig,
    user_name: String<MAX_USER_NAME_LEN>,
    topic: String<MAX_TOPIC_LEN>,
}

impl HubSession {
    pub fn new(config: HubConfig) -> Result<Self, NetworkError> {
        let user_name = hub::user_name(config.host, config.device_id, config.user_agent)?;
        let topic = hub::telemetry_topic(config.device_id)?;
        Ok(Self {
            config,
            user_name,
            topic,
        })
    }

    /// Connect with `token` and publish telemetry until the session ends
    pub async fn run<RNG>(
        &self,
        stack: &Stack<'static>,
        rng: &mut RNG,
        buffers: &mut SessionBuffers,
        token: &SasToken,
        telemetry: &mut TelemetryState,
        clock: &WallClock,
    ) -> Result<SessionEnd, NetworkError>
    where
        RNG: rand_core::RngCore + rand_core::CryptoRng,
    {
        let host = self.config.host;
        info!("Connecting to {}:{}", host, self.config.port);

        let endpoint = resolve(stack, host, self.config.port).await?;
        info!("Resolved {} to {}", host, Debug2Format(&endpoint));

        let mut socket = AsyncTcpSocket::new(*stack, &mut *buffers.tcp_rx, &mut *buffers.tcp_tx);
        socket.connect(endpoint).await?;
        debug!("TCP connection established");

        let tls_config = TlsConfig::new().with_server_name(host);
        let mut tls_connection = TlsConnection::<AsyncTcpSocket, Aes128GcmSha256>::new(
            socket,
            &mut *buffers.tls_read,
            &mut *buffers.tls_write,
        );
        let provider = SimpleCryptoProvider::new(rng);
        tls_connection
            .open(TlsContext::new(&tls_config, provider))
            .await
            .map_err(|e| {
                error!("TLS handshake failed: {:?}", Debug2Format(&e));
                TlsError::HandshakeFailed
            })?;
        debug!("TLS 1.3 handshake complete");

        let mut buffer = BumpBuffer::new(&mut *buffers.mqtt);
        let mut mqtt_client = Client::<'_, _, _, 1, 1, 1, 0>::new(&mut buffer);

        let client_id = mqtt_string(hub::client_id(self.config.device_id)?)?;
        let user_name = mqtt_string(self.user_name.as_str())?;
        let password = MqttBinary::new(token.password().as_bytes().into()).map_err(|e| {
            error!("SAS token rejected as MQTT password: {:?}", Debug2Format(&e));
            MqttError::ProtocolError
        })?;

        let connect_opts = ConnectOptions {
            session_expiry_interval: SessionExpiryInterval::EndOnDisconnect,
            clean_start: true,
            keep_alive: KeepAlive::Seconds(KEEP_ALIVE_SECS),
            will: None,
            user_name: Some(user_name),
            password: Some(password),
        };

        mqtt_client
            .connect(tls_connection, &connect_opts, Some(client_id))
            .await
            .map_err(|e| {
                error!("MQTT connect failed: {:?}", Debug2Format(&e));
                MqttError::ConnectionFailed
            })?;

        info!("Connected to IoT Hub as {}", self.config.device_id);
        status::report(Activity::Connected);

        // SAFETY: telemetry_topic() rejects device ids containing wildcards or
        // NUL, and the fixed prefix and message properties contain neither.
        let topic_name = unsafe { TopicName::new_unchecked(mqtt_string(self.topic.as_str())?) };
        let pub_options = PublicationOptions {
            retain: false,
            message_expiry_interval: None,
            topic: TopicReference::Name(topic_name),
            qos: QoS::AtMostOnce,
        };

        let refresh = TokenRefresh::new(token.expires_at(), self.config.refresh_margin_secs);
        if let Some(now) = clock.now_unix(Instant::now().as_micros()) {
            info!("SAS token refresh in {} s", refresh.secs_until_due(now));
        }
        let mut schedule = TelemetrySchedule::new(self.config.telemetry_interval_ms);
        let mut payload = [0u8; PAYLOAD_CAPACITY];

        loop {
            if let Some(now) = clock.now_unix(Instant::now().as_micros()) {
                if refresh.due(now) {
                    info!("SAS token expires at {}; refreshing", token.expires_at());
                    return Ok(SessionEnd::TokenRefreshDue);
                }
            }

            if schedule.poll(Instant::now().as_millis()) {
                if let Some(record) = serial::take_frame() {
                    telemetry.replace(record);
                }

                let count = telemetry.message_count();
                match telemetry.encode(&mut payload) {
                    Ok(len) => {
                        mqtt_client
                            .publish(&pub_options, Bytes::from(&payload[..len]))
                            .await
                            .map_err(|e| {
                                error!("Publish #{} failed: {:?}", count, Debug2Format(&e));
                                MqttError::PublishFailed
                            })?;
                        info!("Published telemetry #{} ({} bytes)", count, len);
                        status::report(Activity::Published);
                    }
                    Err(e) => warn!("Skipping telemetry #{}: {}", count, e),
                }
            }

            let wait = schedule
                .ms_until_due(Instant::now().as_millis())
                .min(LOOP_TICK_MS);
            Timer::after_millis(wait).await;
        }
    }
}

fn mqtt_string(s: &str) -> Result<MqttString<'_>, MqttError> {
    MqttString::new(s.into()).map_err(|e| {
        error!("Invalid MQTT string: {:?}", Debug2Format(&e));
        MqttError::ProtocolError
    })
}
