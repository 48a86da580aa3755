//! Connection lifecycle types and the status events the engine publishes.

use std::fmt;

use crate::credentials::{Credentials, Nickname};

/// Which of the two chat connections a socket serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionRole {
    /// Read-only live feed.
    Read,
    /// Authenticated connection used to submit messages.
    Write,
}

impl ConnectionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one connection attempt.
///
/// Ordered: a connection moves `Initiated → Established → Closed`, each at
/// most once per attempt. `Established` is skipped when the connect fails,
/// but `Closed` is always the last state reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConnectionStatus {
    Initiated,
    Established,
    Closed,
}

impl ConnectionStatus {
    /// Returns true if `self` is a legal successor of `previous`.
    ///
    /// `None` means nothing has been reported for the attempt yet.
    #[must_use]
    pub fn may_follow(self, previous: Option<ConnectionStatus>) -> bool {
        match (previous, self) {
            (None, Self::Initiated) => true,
            (Some(Self::Initiated), Self::Established | Self::Closed) => true,
            (Some(Self::Established), Self::Closed) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Established => "established",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events published on the status queue for the display layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// A connection changed lifecycle state.
    Connection {
        role: ConnectionRole,
        status: ConnectionStatus,
    },

    /// Token authorization succeeded; this is the account's nickname.
    NicknameReceived(Nickname),

    /// Registration issued new credentials (already persisted).
    CredentialsIssued(Credentials),

    /// The server rejected the token. Reported once; the engine stops.
    AuthRejected,
}

impl StatusEvent {
    pub fn connection(role: ConnectionRole, status: ConnectionStatus) -> Self {
        Self::Connection { role, status }
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection { role, status } => write!(f, "{role} connection {status}"),
            Self::NicknameReceived(nickname) => write!(f, "signed in as {nickname}"),
            Self::CredentialsIssued(creds) => write!(f, "registered as {}", creds.nickname),
            Self::AuthRejected => f.write_str("token rejected by server"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_order() {
        assert!(ConnectionStatus::Initiated < ConnectionStatus::Established);
        assert!(ConnectionStatus::Established < ConnectionStatus::Closed);
    }

    #[test]
    fn test_may_follow_happy_path() {
        assert!(ConnectionStatus::Initiated.may_follow(None));
        assert!(ConnectionStatus::Established.may_follow(Some(ConnectionStatus::Initiated)));
        assert!(ConnectionStatus::Closed.may_follow(Some(ConnectionStatus::Established)));
    }

    #[test]
    fn test_may_follow_failed_connect() {
        assert!(ConnectionStatus::Closed.may_follow(Some(ConnectionStatus::Initiated)));
    }

    #[test]
    fn test_may_follow_rejects_repeats_and_skips() {
        assert!(!ConnectionStatus::Initiated.may_follow(Some(ConnectionStatus::Initiated)));
        assert!(!ConnectionStatus::Closed.may_follow(Some(ConnectionStatus::Closed)));
        assert!(!ConnectionStatus::Established.may_follow(None));
        assert!(!ConnectionStatus::Closed.may_follow(None));
        assert!(!ConnectionStatus::Established.may_follow(Some(ConnectionStatus::Closed)));
    }

    #[test]
    fn test_status_event_display() {
        let event = StatusEvent::connection(ConnectionRole::Write, ConnectionStatus::Established);
        assert_eq!(event.to_string(), "write connection established");
        assert_eq!(
            StatusEvent::NicknameReceived(Nickname::new("eve")).to_string(),
            "signed in as eve"
        );
    }
}
