//! minechat Protocol - Wire format of the line-oriented chat server
//!
//! Every exchange is UTF-8 text terminated by `\n`. The server greets each
//! new connection with one line; the write connection then authorizes with
//! a token (or registers a new account) and submits messages terminated by
//! an empty line.

pub mod error;
pub mod frame;
pub mod parse;

pub use error::ProtocolError;
pub use frame::{sanitize_line, OutboundFrame, REGISTRATION_REQUEST};
pub use parse::{parse_auth_response, parse_registration_response, AuthResponse};
