//! Scoped TCP connection with lifecycle reporting.
//!
//! A [`ConnectionGuard`] owns one socket to the chat server. It reports
//! `Initiated` before dialing, `Established` once connected and `Closed`
//! exactly once when the guard goes away: after [`ConnectionGuard::close`],
//! on drop (including a cancelled cohort) and after a failed connect.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use minechat_core::{ConnectionRole, ConnectionStatus, StatusEvent};

use crate::config::Endpoint;
use crate::error::{ClientError, Result};

// ============================================================================
// Status Reporter
// ============================================================================

/// Publishes the status sequence of one connection attempt.
///
/// Drop reports `Closed` if it has not been reported yet, which covers every
/// exit path of the owning scope.
struct StatusReporter {
    role: ConnectionRole,
    status_tx: Option<mpsc::UnboundedSender<StatusEvent>>,
    last: Option<ConnectionStatus>,
}

impl StatusReporter {
    fn new(role: ConnectionRole, status_tx: Option<mpsc::UnboundedSender<StatusEvent>>) -> Self {
        Self {
            role,
            status_tx,
            last: None,
        }
    }

    fn report(&mut self, status: ConnectionStatus) {
        if !status.may_follow(self.last) {
            return;
        }
        self.last = Some(status);
        debug!(role = %self.role, status = %status, "Connection status changed");
        if let Some(tx) = &self.status_tx {
            // Ignore send errors - the display layer may already be gone
            let _ = tx.send(StatusEvent::connection(self.role, status));
        }
    }
}

impl Drop for StatusReporter {
    fn drop(&mut self) {
        self.report(ConnectionStatus::Closed);
    }
}

// ============================================================================
// Connection Guard
// ============================================================================

/// One live connection to the chat server.
pub struct ConnectionGuard {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    address: String,
    reporter: StatusReporter,
}

impl ConnectionGuard {
    /// Connects to `endpoint` for `role`.
    ///
    /// Connect failures (DNS, refused, unreachable) are returned as
    /// [`ClientError::Connect`] without retrying; `Closed` is still reported.
    pub async fn open(
        role: ConnectionRole,
        endpoint: &Endpoint,
        status_tx: Option<mpsc::UnboundedSender<StatusEvent>>,
    ) -> Result<Self> {
        let mut reporter = StatusReporter::new(role, status_tx);
        reporter.report(ConnectionStatus::Initiated);

        let address = endpoint.address();
        debug!(role = %role, address = %address, "Connecting");

        let stream = TcpStream::connect(&address)
            .await
            .map_err(|source| ClientError::Connect {
                address: address.clone(),
                source,
            })?;

        reporter.report(ConnectionStatus::Established);

        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
            address,
            reporter,
        })
    }

    pub fn role(&self) -> ConnectionRole {
        self.reporter.role
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Buffered read half.
    pub fn reader(&mut self) -> &mut BufReader<OwnedReadHalf> {
        &mut self.reader
    }

    /// Both halves, borrowed together for request/response exchanges.
    pub fn split(&mut self) -> (&mut BufReader<OwnedReadHalf>, &mut OwnedWriteHalf) {
        (&mut self.reader, &mut self.writer)
    }

    /// Shuts the socket down, waits for it, then reports `Closed`.
    pub async fn close(mut self) {
        if let Err(e) = self.writer.shutdown().await {
            // Typically the peer has already reset the socket
            warn!(role = %self.role(), error = %e, "Error while closing connection");
        }
        debug!(role = %self.role(), address = %self.address, "Connection closed");
        self.reporter.report(ConnectionStatus::Closed);
    }
}

// ============================================================================
// Tests
// ============================================================================
