//! Account identity issued by the chat server.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DomainError, DomainResult};

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Display name of a chat account.
///
/// The server may adjust a requested nickname during registration, so the
/// value in issued [`Credentials`] is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nickname(String);

impl Nickname {
    /// Creates a nickname without validation.
    pub fn new(nickname: impl Into<String>) -> Self {
        Self(nickname.into())
    }

    /// Parses user input into a nickname suitable for a registration request.
    ///
    /// Surrounding whitespace is dropped. Returns an error for blank input,
    /// since an empty line is the protocol's registration request itself.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyField {
                field: "nickname".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nickname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Nickname {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Nickname {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque account token (`account_hash` on the wire).
///
/// Never validated locally: only the server's handshake response decides
/// whether a token is good. `Debug` output is redacted so tokens do not leak
/// into logs.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for transmission.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// A nickname/token pair as issued by the server.
///
/// Serializes to the same JSON object the server sends, which is also the
/// record format of the credential store:
/// `{"nickname": "...", "account_hash": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub nickname: Nickname,
    pub account_hash: Token,
}

impl Credentials {
    pub fn new(nickname: impl Into<Nickname>, account_hash: impl Into<Token>) -> Self {
        Self {
            nickname: nickname.into(),
            account_hash: account_hash.into(),
        }
    }

    /// Returns the token used for authorization.
    pub fn token(&self) -> &Token {
        &self.account_hash
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_wire_shape() {
        let creds = Credentials::new("alice", "abc-123");
        let json = serde_json::to_value(&creds).unwrap();

        assert_eq!(json["nickname"], "alice");
        assert_eq!(json["account_hash"], "abc-123");
    }

    #[test]
    fn test_credentials_from_server_json() {
        let creds: Credentials =
            serde_json::from_str(r#"{"nickname": "bob", "account_hash": "f00", "extra": 1}"#)
                .unwrap();

        assert_eq!(creds.nickname.as_str(), "bob");
        assert_eq!(creds.token().expose(), "f00");
    }

    #[test]
    fn test_credentials_missing_field_rejected() {
        let result: Result<Credentials, _> = serde_json::from_str(r#"{"nickname": "bob"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::new("super-secret");
        let debug = format!("{token:?}");
        assert!(!debug.contains("super-secret"));

        let creds = Credentials::new("alice", "super-secret");
        assert!(!format!("{creds:?}").contains("super-secret"));
    }

    #[test]
    fn test_nickname_parse_trims() {
        let nick = Nickname::parse("  Carol \n").unwrap();
        assert_eq!(nick.as_str(), "Carol");
    }

    #[test]
    fn test_nickname_parse_rejects_blank() {
        let err = Nickname::parse("   ").unwrap_err();
        assert!(matches!(err, DomainError::EmptyField { .. }));
    }
}
