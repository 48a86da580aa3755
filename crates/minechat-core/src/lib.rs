//! minechat Core - Shared types for the chat client
//!
//! This crate provides the domain types shared between the wire
//! protocol (`minechat-protocol`) and the reconnecting engine
//! (`minechat-client`).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod chat;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod pulse;

// Re-exports for convenience
pub use chat::{format_entry, ChatLine, PersistedEntry, HISTORY_TIMESTAMP_FORMAT};
pub use connection::{ConnectionRole, ConnectionStatus, StatusEvent};
pub use credentials::{Credentials, Nickname, Token};
pub use error::{DomainError, DomainResult};
pub use pulse::{Pulse, PulseCause};
