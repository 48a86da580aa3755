//! minechat client - reconnecting chat engine
//!
//! # Architecture
//!
//! The engine keeps two TCP connections to the chat server: a read-only
//! live feed and an authenticated write connection. Everything bound to one
//! pair of live connections forms a *cohort*:
//!
//! 1. **Inbound reader**: feed lines → display queue + persistence queue
//! 2. **History persister**: persistence queue → append-only session log
//! 3. **Outbound sender**: outbound queue → write connection
//! 4. **Watchdog**: liveness pulses in, keepalives out, timeout on silence
//!
//! The [`ReconnectSupervisor`] runs one cohort at a time and replaces it
//! whenever any member ends. The front end only sees queues
//! ([`SessionHandles`]) and a `CancellationToken` for shutdown.
//!
//! Registration and one-shot sends live in [`account`]; they use the same
//! connection guard and handshake code outside the reconnect loop.

pub mod account;
pub mod config;
pub mod connection;
pub mod error;
pub mod handshake;
pub mod history;
pub mod reader;
pub mod sender;
pub mod store;
pub mod supervisor;
pub mod watchdog;

// Re-export commonly used types
pub use account::{register_account, resolve_token, send_once};
pub use config::{ClientConfig, Endpoint};
pub use connection::ConnectionGuard;
pub use error::{ClientError, Result};
pub use history::{load_history, HistoryLog};
pub use reader::InboundReader;
pub use sender::OutboundSender;
pub use store::CredentialStore;
pub use supervisor::{ReconnectSupervisor, SessionHandles, SupervisorExit};
pub use watchdog::{Watchdog, WatchdogConfig};
