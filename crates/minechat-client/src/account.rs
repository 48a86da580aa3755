//! One-shot account operations outside the reconnecting session.
//!
//! Each helper opens a single write connection, runs one exchange and
//! closes it again. Nothing here retries.

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::info;

use minechat_core::{ConnectionRole, Credentials, DomainError, Nickname, StatusEvent, Token};
use minechat_protocol::{AuthResponse, OutboundFrame};

use crate::config::ClientConfig;
use crate::connection::ConnectionGuard;
use crate::error::{ClientError, Result};
use crate::handshake;
use crate::sender::write_frame;
use crate::store::CredentialStore;

/// Registers a new account and saves the issued credentials.
///
/// The server may hand out a different nickname than requested; the
/// returned [`Credentials`] are authoritative. They are appended to the
/// credential store exactly once and announced as
/// [`StatusEvent::CredentialsIssued`].
pub async fn register_account(
    config: &ClientConfig,
    nickname: &Nickname,
    status_tx: Option<mpsc::UnboundedSender<StatusEvent>>,
) -> Result<Credentials> {
    let mut conn =
        ConnectionGuard::open(ConnectionRole::Write, &config.write, status_tx.clone()).await?;

    let result = {
        let (reader, writer) = conn.split();
        timeout(
            config.silence_timeout,
            handshake::register(reader, writer, nickname),
        )
        .await
    };
    conn.close().await;

    let credentials = result.map_err(|_| ClientError::WatchdogTimeout {
        silence: config.silence_timeout,
    })??;

    CredentialStore::new(&config.credentials_path)
        .append(&credentials)
        .await?;

    if let Some(tx) = status_tx {
        let _ = tx.send(StatusEvent::CredentialsIssued(credentials.clone()));
    }
    Ok(credentials)
}

/// Authorizes with `token`, submits one message and disconnects.
///
/// Returns the nickname the server associated with the token.
pub async fn send_once(config: &ClientConfig, token: &Token, text: &str) -> Result<Nickname> {
    if text.trim().is_empty() {
        return Err(DomainError::EmptyField {
            field: "message".to_string(),
        }
        .into());
    }

    let mut conn = ConnectionGuard::open(ConnectionRole::Write, &config.write, None).await?;

    let result = {
        let (reader, writer) = conn.split();
        timeout(config.silence_timeout, async {
            let credentials = match handshake::authorize(reader, &mut *writer, token).await? {
                AuthResponse::Authorized(credentials) => credentials,
                AuthResponse::Rejected => return Err(ClientError::AuthRejected),
            };
            write_frame(writer, &OutboundFrame::message(text)).await?;
            Ok::<_, ClientError>(credentials.nickname)
        })
        .await
    };
    conn.close().await;

    let nickname = result.map_err(|_| ClientError::WatchdogTimeout {
        silence: config.silence_timeout,
    })??;
    info!(nickname = %nickname, "Message sent");
    Ok(nickname)
}

/// Picks the token for a session.
///
/// An explicit token wins; otherwise the configured nickname is looked up
/// in the credential store.
pub async fn resolve_token(config: &ClientConfig) -> Result<Token> {
    if let Some(token) = config.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(Token::new(token));
    }

    let Some(nickname) = config.nickname.as_deref() else {
        return Err(ClientError::NoCredentials { nickname: None });
    };
    let nickname = Nickname::parse(nickname)?;

    CredentialStore::new(&config.credentials_path)
        .find(&nickname)
        .await?
        .map(|credentials| credentials.account_hash)
        .ok_or_else(|| ClientError::NoCredentials {
            nickname: Some(nickname.to_string()),
        })
}
