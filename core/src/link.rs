//! Connection state machine and timing gates
//!
//! The agent walks a linear chain of states to reach `Connected`. Any failure
//! drops it back to `Disconnected` and the whole chain runs again; there is no
//! partial resume. While connected, the SAS token is refreshed proactively a
//! margin before it expires instead of waiting for the hub to drop the session.

/// Agent connection states, in chain order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Nothing established
    Disconnected,
    /// Bringing the network link up (PHY link and DHCP)
    Associating,
    /// Waiting for SNTP so the token expiry can be computed
    TimeSyncing,
    /// Signing a fresh SAS token
    TokenGenerating,
    /// TCP, TLS and MQTT CONNECT
    MqttConnecting,
    /// Session up; telemetry may be published
    Connected,
}

impl LinkState {
    /// Next state after the current step succeeds
    pub fn advance(self) -> Self {
        match self {
            Self::Disconnected => Self::Associating,
            Self::Associating => Self::TimeSyncing,
            Self::TimeSyncing => Self::TokenGenerating,
            Self::TokenGenerating => Self::MqttConnecting,
            Self::MqttConnecting | Self::Connected => Self::Connected,
        }
    }

    /// State after the current step fails
    pub fn fail(self) -> Self {
        Self::Disconnected
    }

    /// State after the refresh margin is reached while connected
    pub fn refresh_token(self) -> Self {
        match self {
            Self::Connected => Self::TokenGenerating,
            other => other,
        }
    }
}

/// Proactive SAS token refresh deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TokenRefresh {
    expires_at: u64,
    margin_secs: u64,
}

impl TokenRefresh {
    /// Track a token expiring at `expires_at` (Unix seconds)
    pub const fn new(expires_at: u64, margin_secs: u64) -> Self {
        Self {
            expires_at,
            margin_secs,
        }
    }

    /// Unix time at which the token should be replaced
    pub fn refresh_at(&self) -> u64 {
        self.expires_at.saturating_sub(self.margin_secs)
    }

    /// True once `now` reaches the refresh point
    pub fn due(&self, now: u64) -> bool {
        now >= self.refresh_at()
    }

    /// Seconds left until the refresh point
    pub fn secs_until_due(&self, now: u64) -> u64 {
        self.refresh_at().saturating_sub(now)
    }
}

/// Elapsed-time gate for telemetry publishes
///
/// The first poll is always due. Each due poll arms the next deadline one
/// interval after the poll time.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetrySchedule {
    interval_ms: u64,
    next_due_ms: Option<u64>,
}

impl TelemetrySchedule {
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            next_due_ms: None,
        }
    }

    /// Returns true if a send is due at `now_ms` and arms the next deadline
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let due = self.next_due_ms.map_or(true, |next| now_ms >= next);
        if due {
            self.next_due_ms = Some(now_ms.saturating_add(self.interval_ms));
        }
        due
    }

    /// Milliseconds until the next send is due (0 if already due)
    pub fn ms_until_due(&self, now_ms: u64) -> u64 {
        self.next_due_ms
            .map_or(0, |next| next.saturating_sub(now_ms))
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_order() {
        let mut state = LinkState::Disconnected;
        let expected = [
            LinkState::Associating,
            LinkState::TimeSyncing,
            LinkState::TokenGenerating,
            LinkState::MqttConnecting,
            LinkState::Connected,
            LinkState::Connected,
        ];
        for next in expected {
            state = state.advance();
            assert_eq!(state, next);
        }
    }

    #[test]
    fn test_any_failure_restarts_chain() {
        for state in [
            LinkState::Associating,
            LinkState::TimeSyncing,
            LinkState::TokenGenerating,
            LinkState::MqttConnecting,
            LinkState::Connected,
        ] {
            assert_eq!(state.fail(), LinkState::Disconnected);
        }
    }

    #[test]
    fn test_refresh_only_from_connected() {
        assert_eq!(
            LinkState::Connected.refresh_token(),
            LinkState::TokenGenerating
        );
        assert_eq!(
            LinkState::TimeSyncing.refresh_token(),
            LinkState::TimeSyncing
        );
    }

    #[test]
    fn test_token_refresh_margin() {
        let refresh = TokenRefresh::new(10_000, 300);
        assert_eq!(refresh.refresh_at(), 9_700);
        assert!(!refresh.due(9_699));
        assert!(refresh.due(9_700));
        assert_eq!(refresh.secs_until_due(9_000), 700);
        assert_eq!(refresh.secs_until_due(9_800), 0);

        // Margin larger than the expiry saturates to "due immediately"
        assert!(TokenRefresh::new(100, 300).due(0));
    }

    #[test]
    fn test_schedule_first_poll_due() {
        let mut schedule = TelemetrySchedule::new(2_000);
        assert_eq!(schedule.ms_until_due(0), 0);
        assert!(schedule.poll(5));
        assert!(!schedule.poll(1_000));
        assert_eq!(schedule.ms_until_due(1_000), 1_005);
        assert!(schedule.poll(2_005));
        assert!(!schedule.poll(2_006));
        assert_eq!(schedule.interval_ms(), 2_000);
    }
}
