//! Connection policy for the push-event client.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// HTTP long-polling against `/events/poll`
    Polling,
    /// WebSocket against `/ws/live`
    WebSocket,
}

/// How the client connects and reconnects.
///
/// Deserializable from a JS object such as
/// `{ transports: ["polling"], reconnectionAttempts: 5, timeout: 10000 }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransportPolicy {
    /// Transports to try, in order.
    pub transports: Vec<Transport>,
    /// Consecutive reconnection attempts before giving up; `None` retries forever.
    pub reconnection_attempts: Option<u32>,
    /// Connection timeout in milliseconds.
    #[serde(rename = "timeout")]
    pub timeout_ms: u32,
    pub reconnection_delay_ms: u32,
    pub reconnection_delay_max_ms: u32,
    /// How long the server may hold a long-poll request open.
    pub poll_wait_ms: u32,
}

impl Default for TransportPolicy {
    fn default() -> Self {
        Self {
            transports: vec![Transport::WebSocket, Transport::Polling],
            reconnection_attempts: None,
            timeout_ms: 20_000,
            reconnection_delay_ms: 1_000,
            reconnection_delay_max_ms: 5_000,
            poll_wait_ms: 25_000,
        }
    }
}

impl TransportPolicy {
    /// Long-polling only, five reconnection attempts, 10 second timeout.
    pub fn polling_only() -> Self {
        Self {
            transports: vec![Transport::Polling],
            reconnection_attempts: Some(5),
            timeout_ms: 10_000,
            ..Self::default()
        }
    }

    pub fn allows(&self, transport: Transport) -> bool {
        self.transports.contains(&transport)
    }

    /// First transport to try. Falls back to polling for an empty list.
    pub fn preferred(&self) -> Transport {
        self.transports.first().copied().unwrap_or(Transport::Polling)
    }

    /// Transport to use once `failed` could not be opened at all.
    pub fn fallback(&self, failed: Transport) -> Option<Transport> {
        self.transports.iter().copied().find(|&t| t != failed)
    }

    /// Whether another attempt is allowed after `failures` consecutive failures.
    pub fn should_reconnect(&self, failures: u32) -> bool {
        self.reconnection_attempts.map_or(true, |max| failures <= max)
    }

    /// Delay before the attempt following `failures` consecutive failures.
    pub fn backoff_ms(&self, failures: u32) -> u32 {
        let exp = failures.saturating_sub(1).min(16);
        let delay = u64::from(self.reconnection_delay_ms) << exp;
        delay.min(u64::from(self.reconnection_delay_max_ms)) as u32
    }

    /// Abort deadline for a long-poll request.
    pub fn poll_deadline_ms(&self) -> u32 {
        self.poll_wait_ms.saturating_add(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polling_only() {
        let policy = TransportPolicy::polling_only();
        assert!(policy.allows(Transport::Polling));
        assert!(!policy.allows(Transport::WebSocket));
        assert_eq!(policy.preferred(), Transport::Polling);
        assert_eq!(policy.fallback(Transport::Polling), None);
        assert_eq!(policy.timeout_ms, 10_000);
    }

    #[test]
    fn test_default_negotiates() {
        let policy = TransportPolicy::default();
        assert_eq!(policy.preferred(), Transport::WebSocket);
        assert_eq!(policy.fallback(Transport::WebSocket), Some(Transport::Polling));
        assert!(policy.should_reconnect(1_000));
    }

    #[test]
    fn test_bounded_attempts() {
        let policy = TransportPolicy::polling_only();
        assert!((1..=5).all(|n| policy.should_reconnect(n)));
        assert!(!policy.should_reconnect(6));
    }

    #[test]
    fn test_backoff() {
        let policy = TransportPolicy::default();
        let delays: Vec<u32> = (1..=5).map(|n| policy.backoff_ms(n)).collect();
        assert_eq!(delays, [1_000, 2_000, 4_000, 5_000, 5_000]);
        assert_eq!(policy.backoff_ms(u32::MAX), 5_000);
    }

    #[test]
    fn test_deserialize_js_options() {
        let policy: TransportPolicy = serde_json::from_str(
            r#"{"transports": ["polling"], "reconnectionAttempts": 5, "timeout": 10000}"#,
        )
        .unwrap();
        assert_eq!(policy, TransportPolicy::polling_only());

        let empty: TransportPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, TransportPolicy::default());
    }
}
