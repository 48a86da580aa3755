//! Outbound frames sent on the write connection.

use minechat_core::{Nickname, Token};

/// Registration request: a blank line in place of a token.
///
/// A single `\n`, not the `\n\n` message terminator.
pub const REGISTRATION_REQUEST: &str = "\n";

/// Replaces embedded line breaks so user text stays on one protocol line.
///
/// A raw `\n` inside a message would end the frame early (and a blank line
/// would submit it), so `\r\n`, `\r` and `\n` all become single spaces.
pub fn sanitize_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// Everything the client ever writes to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Token authorization: `<token>\n`.
    Token(Token),

    /// Start of the registration exchange.
    RegistrationRequest,

    /// Desired nickname during registration: `<nickname>\n`.
    Nickname(Nickname),

    /// Chat message: `<text>\n\n`. The trailing blank line ends the message.
    Message(String),
}

impl OutboundFrame {
    pub fn token(token: &Token) -> Self {
        Self::Token(token.clone())
    }

    pub fn nickname(nickname: &Nickname) -> Self {
        Self::Nickname(nickname.clone())
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self::Message(text.into())
    }

    /// The empty message, used as a keepalive ping.
    pub fn keepalive() -> Self {
        Self::Message(String::new())
    }

    /// Returns true for the empty keepalive message.
    pub fn is_keepalive(&self) -> bool {
        matches!(self, Self::Message(text) if text.is_empty())
    }

    /// Encodes the frame exactly as it goes on the wire.
    pub fn encode(&self) -> String {
        match self {
            Self::Token(token) => format!("{}\n", sanitize_line(token.expose())),
            Self::RegistrationRequest => REGISTRATION_REQUEST.to_string(),
            Self::Nickname(nickname) => format!("{}\n", sanitize_line(nickname.as_str())),
            Self::Message(text) => format!("{}\n\n", sanitize_line(text)),
        }
    }
}
