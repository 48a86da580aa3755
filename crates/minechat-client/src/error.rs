//! Error types for the minechat engine.
//!
//! Every fault a cohort can hit is a [`ClientError`]. The supervisor treats
//! all of them as cohort-fatal and retries after its backoff; a rejected
//! token is not an error there but a tagged outcome (see
//! [`crate::supervisor::SupervisorExit`]).
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use minechat_core::{ConnectionRole, DomainError};
use minechat_protocol::ProtocolError;
use thiserror::Error;

// ============================================================================
// Client Error Type
// ============================================================================

/// Engine errors.
#[derive(Error, Debug)]
pub enum ClientError {
    /// DNS failure, refused or reset while connecting.
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        /// `host:port` that was dialed.
        address: String,
        #[source]
        source: io::Error,
    },

    /// The server closed the stream (EOF) while the session expected it open.
    #[error("Server closed the {role} connection")]
    StreamClosed {
        /// Connection that hit EOF.
        role: ConnectionRole,
    },

    /// Mid-session I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The server sent something the protocol does not allow.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// No liveness pulse within the silence window.
    #[error("No sign of life from the server for {silence:?}")]
    WatchdogTimeout {
        /// Configured silence timeout.
        silence: Duration,
    },

    /// The server rejected the token (one-shot helpers only; the
    /// supervisor reports rejection as an exit value).
    #[error("Token rejected by server")]
    AuthRejected,

    /// A cohort task returned although it is meant to run forever.
    #[error("{task} task stopped unexpectedly")]
    TaskEnded {
        /// Name of the task.
        task: &'static str,
    },

    /// An internal queue lost its other end.
    #[error("{queue} queue closed")]
    ChannelClosed {
        /// Name of the queue.
        queue: &'static str,
    },

    /// No token configured and none found in the credential store.
    #[error("No token available{}; register first or pass --token", nickname_hint(.nickname))]
    NoCredentials {
        /// Nickname that was looked up, if any.
        nickname: Option<String>,
    },

    /// Invalid configuration value or unreadable config file.
    #[error("Invalid configuration in {path}: {reason}")]
    Config {
        /// Config file (or `<defaults>`).
        path: PathBuf,
        reason: String,
    },

    /// Invalid domain value (e.g. a blank nickname).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// JSON encode/decode failure outside the handshake.
    #[error("Failed to parse record: {0}")]
    ParseError(#[from] serde_json::Error),
}

fn nickname_hint(nickname: &Option<String>) -> String {
    nickname
        .as_ref()
        .map(|n| format!(" for {n:?}"))
        .unwrap_or_default()
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Convenience Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ClientError>;

// ============================================================================
// Tests
// ============================================================================
