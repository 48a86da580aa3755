//! Parsing server handshake responses.

use minechat_core::Credentials;
use serde_json::Value;

use crate::error::ProtocolError;

/// Outcome of token authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResponse {
    /// The token is known; the server sent the account's credentials.
    Authorized(Credentials),

    /// The server answered `null`: unknown token.
    Rejected,
}

fn decode(line: &str) -> Result<Value, ProtocolError> {
    serde_json::from_str(line.trim()).map_err(|e| ProtocolError::InvalidJson {
        line: line.trim().to_string(),
        reason: e.to_string(),
    })
}

fn credentials_from(value: Value) -> Result<Credentials, ProtocolError> {
    if !value.is_object() {
        return Err(ProtocolError::MalformedCredentials {
            reason: format!("expected a JSON object, got {value}"),
        });
    }
    serde_json::from_value(value).map_err(|e| ProtocolError::MalformedCredentials {
        reason: e.to_string(),
    })
}

/// Parses the response line to a token authorization.
///
/// `null` is a regular [`AuthResponse::Rejected`], not an error.
pub fn parse_auth_response(line: &str) -> Result<AuthResponse, ProtocolError> {
    match decode(line)? {
        Value::Null => Ok(AuthResponse::Rejected),
        value => credentials_from(value).map(AuthResponse::Authorized),
    }
}

/// Parses the final line of the registration exchange.
///
/// Registration has no soft failure: `null` or anything other than a
/// credentials object is an error.
pub fn parse_registration_response(line: &str) -> Result<Credentials, ProtocolError> {
    match decode(line)? {
        Value::Null => Err(ProtocolError::MissingCredentials),
        value => credentials_from(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_authorized() {
        let line = r#"{"nickname": "Sleepy Ivan", "account_hash": "4632b104-88ff"}"#;
        match parse_auth_response(line).unwrap() {
            AuthResponse::Authorized(creds) => {
                assert_eq!(creds.nickname.as_str(), "Sleepy Ivan");
                assert_eq!(creds.token().expose(), "4632b104-88ff");
            }
            other => panic!("Expected Authorized, got {other:?}"),
        }
    }

    #[test]
    fn test_auth_response_null_is_rejection() {
        let response = parse_auth_response("null\n").unwrap();
        assert_eq!(response, AuthResponse::Rejected);
    }

    #[test]
    fn test_auth_response_invalid_json() {
        let err = parse_auth_response("Enter your personal hash").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidJson { .. }));
    }

    #[test]
    fn test_auth_response_missing_field() {
        let err = parse_auth_response(r#"{"nickname": "x"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedCredentials { .. }));
    }

    #[test]
    fn test_auth_response_non_object() {
        let err = parse_auth_response("[1, 2]").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedCredentials { .. }));
    }

    #[test]
    fn test_registration_response() {
        let creds =
            parse_registration_response(r#"{"nickname": "new one", "account_hash": "h"}"#)
                .unwrap();
        assert_eq!(creds.nickname.as_str(), "new one");
    }

    #[test]
    fn test_registration_response_null_is_error() {
        let err = parse_registration_response("null").unwrap_err();
        assert_eq!(err, ProtocolError::MissingCredentials);
    }

    #[test]
    fn test_error_display_mentions_line() {
        let err = parse_auth_response("oops").unwrap_err();
        assert!(err.to_string().contains("oops"));
    }
}
