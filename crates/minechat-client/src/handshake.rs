//! Token authorization and account registration on the write connection.
//!
//! Both exchanges start by consuming the server's greeting line:
//!
//! ```text
//! S: Hello %username%! Enter your personal hash or leave it empty to create new account.
//! C: <token>                      C: (blank line)
//! S: {"nickname": ..} | null      S: Enter preferred nickname below:
//!                                 C: <nickname>
//!                                 S: {"nickname": .., "account_hash": ..}
//! ```
//!
//! Persisting newly issued credentials is the caller's job.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite};
use tracing::{debug, info, warn};

use minechat_core::{ConnectionRole, Credentials, Nickname, Token};
use minechat_protocol::{
    parse_auth_response, parse_registration_response, AuthResponse, OutboundFrame,
};

use crate::error::{ClientError, Result};
use crate::sender::write_frame;

/// Reads one line; EOF before a line is a [`ClientError::StreamClosed`].
async fn read_required_line<R>(reader: &mut R) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(ClientError::StreamClosed {
            role: ConnectionRole::Write,
        });
    }
    let line = line.trim_end().to_string();
    debug!(line = %line, "RECEIVE");
    Ok(line)
}

/// Authorizes with an existing token.
///
/// Returns [`AuthResponse::Rejected`] when the server answers `null`; the
/// caller decides what to do with a rejection, nothing is retried here.
pub async fn authorize<R, W>(
    reader: &mut R,
    writer: &mut W,
    token: &Token,
) -> Result<AuthResponse>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    read_required_line(reader).await?;
    write_frame(writer, &OutboundFrame::token(token)).await?;

    let response = parse_auth_response(&read_required_line(reader).await?)?;
    match &response {
        AuthResponse::Authorized(creds) => {
            info!(nickname = %creds.nickname, "Authorization succeeded");
        }
        AuthResponse::Rejected => warn!("Server rejected the token"),
    }
    Ok(response)
}

/// Registers a new account under `nickname`.
///
/// Every deviation from the expected exchange is an error.
pub async fn register<R, W>(
    reader: &mut R,
    writer: &mut W,
    nickname: &Nickname,
) -> Result<Credentials>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    read_required_line(reader).await?;
    write_frame(writer, &OutboundFrame::RegistrationRequest).await?;

    // Instruction line, only consumed to stay in sync
    read_required_line(reader).await?;
    write_frame(writer, &OutboundFrame::nickname(nickname)).await?;

    let creds = parse_registration_response(&read_required_line(reader).await?)?;
    info!(requested = %nickname, nickname = %creds.nickname, "Registration succeeded");
    Ok(creds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

    const GREETING: &[u8] =
        b"Hello %username%! Enter your personal hash or leave it empty to create new account.\n";

    /// Runs `exchange` against a scripted server and returns what the client wrote.
    async fn scripted<F, Fut, T>(server_lines: &[&[u8]], exchange: F) -> (T, String)
    where
        F: FnOnce(BufReader<ReadHalf<DuplexStream>>, WriteHalf<DuplexStream>) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let (client, mut server) = tokio::io::duplex(4096);
        for line in server_lines {
            server.write_all(line).await.unwrap();
        }
        // Buffered lines stay readable; anything beyond them is EOF
        server.shutdown().await.unwrap();

        let (read_half, write_half) = tokio::io::split(client);
        let result = exchange(BufReader::new(read_half), write_half).await;

        let mut written = String::new();
        // Client halves are dropped by `exchange`, so this sees EOF
        server.read_to_string(&mut written).await.unwrap();
        (result, written)
    }

    #[tokio::test]
    async fn test_authorize_success() {
        let token = Token::new("4632b104");
        let (result, written) = scripted(
            &[GREETING, b"{\"nickname\": \"Ivan\", \"account_hash\": \"4632b104\"}\n"],
            |mut r, mut w| async move { authorize(&mut r, &mut w, &token).await },
        )
        .await;

        match result.unwrap() {
            AuthResponse::Authorized(creds) => assert_eq!(creds.nickname.as_str(), "Ivan"),
            other => panic!("Expected Authorized, got {other:?}"),
        }
        assert_eq!(written, "4632b104\n");
    }

    #[tokio::test]
    async fn test_authorize_rejected_is_not_an_error() {
        let token = Token::new("bad-token");
        let (result, written) = scripted(&[GREETING, b"null\n"], |mut r, mut w| async move {
            authorize(&mut r, &mut w, &token).await
        })
        .await;

        assert_eq!(result.unwrap(), AuthResponse::Rejected);
        assert_eq!(written, "bad-token\n");
    }

    #[tokio::test]
    async fn test_authorize_garbage_is_protocol_error() {
        let token = Token::new("t");
        let (result, _) = scripted(&[GREETING, b"Welcome to chat!\n"], |mut r, mut w| async move {
            authorize(&mut r, &mut w, &token).await
        })
        .await;

        assert!(matches!(result, Err(ClientError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_authorize_eof_before_response() {
        let token = Token::new("t");
        let (result, _) = scripted(&[GREETING], |mut r, mut w| async move {
            authorize(&mut r, &mut w, &token).await
        })
        .await;

        assert!(matches!(
            result,
            Err(ClientError::StreamClosed {
                role: ConnectionRole::Write
            })
        ));
    }

    #[tokio::test]
    async fn test_register_exchange() {
        let nickname = Nickname::new("Fresh Nick");
        let (result, written) = scripted(
            &[
                GREETING,
                b"Enter preferred nickname below:\n",
                b"{\"nickname\": \"Fresh Nick 2\", \"account_hash\": \"abc\"}\n",
            ],
            |mut r, mut w| async move { register(&mut r, &mut w, &nickname).await },
        )
        .await;

        let creds = result.unwrap();
        assert_eq!(creds, Credentials::new("Fresh Nick 2", "abc"));
        assert_eq!(written, "\nFresh Nick\n");
    }

    #[tokio::test]
    async fn test_register_null_is_error() {
        let nickname = Nickname::new("x");
        let (result, _) = scripted(
            &[GREETING, b"Enter preferred nickname below:\n", b"null\n"],
            |mut r, mut w| async move { register(&mut r, &mut w, &nickname).await },
        )
        .await;

        assert!(matches!(result, Err(ClientError::Protocol(_))));
    }
}
