//! Liveness pulses fed to the watchdog.

use std::fmt;

use tokio::time::Instant;

/// Why a pulse was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseCause {
    ConnectionEstablished,
    Authorized,
    MessageReceived,
    MessageSent,
}

impl PulseCause {
    /// Human-readable cause, as written to the watchdog log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished => "connection established",
            Self::Authorized => "authorization response received",
            Self::MessageReceived => "new message in chat",
            Self::MessageSent => "message sent",
        }
    }
}

impl fmt::Display for PulseCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timestamped proof of life.
///
/// Uses the tokio clock so paused-time tests see consistent instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub cause: PulseCause,
    pub at: Instant,
}

impl Pulse {
    /// Creates a pulse stamped now.
    pub fn now(cause: PulseCause) -> Self {
        Self {
            cause,
            at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cause_strings() {
        assert_eq!(PulseCause::MessageReceived.to_string(), "new message in chat");
        assert_eq!(PulseCause::MessageSent.as_str(), "message sent");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_uses_tokio_clock() {
        let first = Pulse::now(PulseCause::ConnectionEstablished);
        tokio::time::advance(Duration::from_secs(3)).await;
        let second = Pulse::now(PulseCause::MessageReceived);

        assert_eq!(second.at - first.at, Duration::from_secs(3));
    }
}
