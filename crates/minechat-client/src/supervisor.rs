//! Reconnect supervisor: runs one cohort at a time until shutdown.
//!
//! A cohort is everything bound to one pair of live connections: the
//! inbound reader, the history persister, the outbound sender and the
//! watchdog. Each attempt goes through three phases:
//!
//! 1. **Connecting**: open the read and write connections, then authorize
//!    on the write connection (bounded by the silence timeout).
//! 2. **Running**: drive all four tasks in one `select!`. The first one to
//!    finish, for any reason, ends the cohort and drops the others.
//! 3. **Tearing down**: close both connections, then wait the fixed backoff
//!    before the next attempt.
//!
//! Process-level state survives cohorts: the history log handle, the
//! persistence queue and the outbound queue. Connections and the pulse
//! queue are fresh for every attempt.
//!
//! Cancelling the token short-circuits every phase, including the backoff.
//! A rejected token is terminal and reported exactly once.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use minechat_core::{ChatLine, ConnectionRole, Pulse, PulseCause, StatusEvent, Token};
use minechat_protocol::AuthResponse;

use crate::config::ClientConfig;
use crate::connection::ConnectionGuard;
use crate::error::{ClientError, Result};
use crate::handshake;
use crate::history::{load_history, HistoryLog};
use crate::reader::InboundReader;
use crate::sender::OutboundSender;
use crate::watchdog::Watchdog;

// ============================================================================
// Public Types
// ============================================================================

/// Why [`ReconnectSupervisor::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// The cancellation token fired. Not a fault.
    Shutdown,
    /// The server rejected the token; retrying would not help.
    AuthRejected,
}

/// Queue ends handed to the front end.
///
/// Dropping `display_rx` or `status_rx` is harmless: the engine ignores
/// send failures on both.
pub struct SessionHandles {
    /// Messages to submit, one per entry. The empty string is a keepalive.
    pub outbound_tx: mpsc::UnboundedSender<String>,
    /// History replay followed by live lines, in order.
    pub display_rx: mpsc::UnboundedReceiver<ChatLine>,
    /// Connection, nickname and rejection events.
    pub status_rx: mpsc::UnboundedReceiver<StatusEvent>,
}

#[derive(Debug)]
enum CohortEnd {
    Shutdown,
    Rejected,
    Failed(ClientError),
}

impl CohortEnd {
    /// Maps the result of a task that is meant to run forever.
    fn from_task<T>(task: &'static str, result: Result<T>) -> Self {
        match result {
            Ok(_) => Self::Failed(ClientError::TaskEnded { task }),
            Err(e) => Self::Failed(e),
        }
    }
}

// ============================================================================
// Supervisor
// ============================================================================

/// Owns the process-level state shared by all cohorts.
pub struct ReconnectSupervisor {
    config: ClientConfig,
    token: Token,
    cancel_token: CancellationToken,
    history: HistoryLog,
    display_tx: mpsc::UnboundedSender<ChatLine>,
    status_tx: mpsc::UnboundedSender<StatusEvent>,
    persist_tx: mpsc::UnboundedSender<ChatLine>,
    persist_rx: mpsc::UnboundedReceiver<ChatLine>,
    outbound_tx: mpsc::UnboundedSender<String>,
    outbound_rx: mpsc::UnboundedReceiver<String>,
}

impl ReconnectSupervisor {
    /// Opens the history log and replays it onto the display queue.
    ///
    /// Nothing touches the network until [`run`](Self::run).
    pub async fn start(
        config: ClientConfig,
        token: Token,
        cancel_token: CancellationToken,
    ) -> Result<(Self, SessionHandles)> {
        let (display_tx, display_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let replay = load_history(&config.history_path).await?;
        debug!(lines = replay.len(), "Replaying history");
        for line in replay {
            // Ignore send errors - display_rx is returned below and still alive
            let _ = display_tx.send(ChatLine::new(&line));
        }

        let history = HistoryLog::open(&config.history_path).await?;

        let handles = SessionHandles {
            outbound_tx: outbound_tx.clone(),
            display_rx,
            status_rx,
        };
        let supervisor = Self {
            config,
            token,
            cancel_token,
            history,
            display_tx,
            status_tx,
            persist_tx,
            persist_rx,
            outbound_tx,
            outbound_rx,
        };
        Ok((supervisor, handles))
    }

    /// Runs cohorts until shutdown or token rejection.
    pub async fn run(mut self) -> SupervisorExit {
        info!(
            read = %self.config.read,
            write = %self.config.write,
            "Chat engine starting"
        );

        let mut attempt = 0u32;
        let exit = loop {
            attempt = attempt.saturating_add(1);

            let end = self
                .run_cohort()
                .instrument(info_span!("cohort", attempt))
                .await;

            // Lines read by a dead cohort are still queued; write them now
            self.flush_history().await;

            match end {
                CohortEnd::Shutdown => break SupervisorExit::Shutdown,
                CohortEnd::Rejected => {
                    let _ = self.status_tx.send(StatusEvent::AuthRejected);
                    break SupervisorExit::AuthRejected;
                }
                CohortEnd::Failed(e) => {
                    warn!(
                        attempt,
                        error = %e,
                        delay = ?self.config.reconnect_delay,
                        "Cohort failed, reconnecting"
                    );
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => break SupervisorExit::Shutdown,
                _ = sleep(self.config.reconnect_delay) => {}
            }
        };

        info!(?exit, attempts = attempt, "Chat engine stopped");
        exit
    }

    async fn flush_history(&mut self) {
        if let Err(e) = self.history.drain(&mut self.persist_rx).await {
            warn!(error = %e, path = %self.history.path().display(), "Failed to flush history");
        }
    }

    /// One connect → run → teardown cycle. Both connections are closed
    /// before this returns.
    async fn run_cohort(&mut self) -> CohortEnd {
        let (pulse_tx, pulse_rx) = mpsc::unbounded_channel();

        let mut read_conn = match self.connect(ConnectionRole::Read, &pulse_tx).await {
            Ok(conn) => conn,
            Err(end) => return end,
        };
        let mut write_conn = match self.connect(ConnectionRole::Write, &pulse_tx).await {
            Ok(conn) => conn,
            Err(end) => {
                read_conn.close().await;
                return end;
            }
        };

        let end = self
            .drive(&mut read_conn, &mut write_conn, pulse_tx, pulse_rx)
            .await;
        debug!(?end, "Tearing down cohort");

        read_conn.close().await;
        write_conn.close().await;
        end
    }

    async fn connect(
        &self,
        role: ConnectionRole,
        pulse_tx: &mpsc::UnboundedSender<Pulse>,
    ) -> std::result::Result<ConnectionGuard, CohortEnd> {
        let endpoint = self.config.endpoint(role);
        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => Err(CohortEnd::Shutdown),
            result = ConnectionGuard::open(role, endpoint, Some(self.status_tx.clone())) => {
                let conn = result.map_err(CohortEnd::Failed)?;
                info!(role = %role, address = %conn.address(), "Connected");
                let _ = pulse_tx.send(Pulse::now(PulseCause::ConnectionEstablished));
                Ok(conn)
            }
        }
    }

    /// Authorizes, then runs the cohort tasks until the first one ends.
    async fn drive(
        &mut self,
        read_conn: &mut ConnectionGuard,
        write_conn: &mut ConnectionGuard,
        pulse_tx: mpsc::UnboundedSender<Pulse>,
        mut pulse_rx: mpsc::UnboundedReceiver<Pulse>,
    ) -> CohortEnd {
        let Self {
            config,
            token,
            cancel_token,
            history,
            display_tx,
            status_tx,
            persist_tx,
            persist_rx,
            outbound_tx,
            outbound_rx,
        } = self;

        // Connecting: handshake on the write connection
        let silence = config.silence_timeout;
        let response = {
            let (reader, writer) = write_conn.split();
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => return CohortEnd::Shutdown,
                result = timeout(silence, handshake::authorize(reader, writer, token)) => {
                    match result {
                        Ok(Ok(response)) => response,
                        Ok(Err(e)) => return CohortEnd::Failed(e),
                        Err(_) => {
                            return CohortEnd::Failed(ClientError::WatchdogTimeout { silence })
                        }
                    }
                }
            }
        };

        let credentials = match response {
            AuthResponse::Authorized(credentials) => credentials,
            AuthResponse::Rejected => return CohortEnd::Rejected,
        };
        let _ = status_tx.send(StatusEvent::NicknameReceived(credentials.nickname));
        let _ = pulse_tx.send(Pulse::now(PulseCause::Authorized));

        // Running
        let inbound = InboundReader::new(display_tx.clone(), persist_tx.clone(), pulse_tx.clone());
        let sender = OutboundSender::new(pulse_tx);
        let watchdog = Watchdog::new(config.watchdog(), outbound_tx.clone());
        let (_, writer) = write_conn.split();
        let read_stream = read_conn.reader();

        info!("Cohort running");
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => CohortEnd::Shutdown,
            result = watchdog.run(&mut pulse_rx) => CohortEnd::from_task("watchdog", result),
            result = inbound.run(read_stream) => match result {
                Ok(_) => CohortEnd::Failed(ClientError::StreamClosed {
                    role: ConnectionRole::Read,
                }),
                Err(e) => CohortEnd::Failed(e),
            },
            result = history.persist_from(persist_rx) => CohortEnd::from_task("persister", result),
            result = sender.run(writer, outbound_rx) => CohortEnd::from_task("sender", result),
        }
    }
}
