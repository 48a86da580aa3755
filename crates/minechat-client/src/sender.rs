//! Outbound sender for the authenticated write connection.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use minechat_core::{Pulse, PulseCause};
use minechat_protocol::OutboundFrame;

use crate::error::{ClientError, Result};

/// Writes one frame and flushes it.
pub async fn write_frame<W>(writer: &mut W, frame: &OutboundFrame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = frame.encode();
    writer.write_all(bytes.as_bytes()).await?;
    writer.flush().await?;
    match frame {
        // Never log the token itself
        OutboundFrame::Token(_) => debug!("SEND: <token>"),
        _ => debug!(frame = ?bytes, "SEND"),
    }
    Ok(())
}

/// Drains the outbound queue onto the write connection.
///
/// Must only run after a successful token handshake on the same
/// connection. The queue is borrowed, not owned, so messages that were not
/// yet dequeued when a cohort dies are sent by the next one.
pub struct OutboundSender {
    pulse_tx: mpsc::UnboundedSender<Pulse>,
}

impl OutboundSender {
    pub fn new(pulse_tx: mpsc::UnboundedSender<Pulse>) -> Self {
        Self { pulse_tx }
    }

    /// Sends queued messages forever, one fully flushed frame at a time.
    ///
    /// The empty message is the keepalive ping. Each successful send
    /// pulses the watchdog.
    pub async fn run<W>(
        &self,
        writer: &mut W,
        outbound_rx: &mut mpsc::UnboundedReceiver<String>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while let Some(text) = outbound_rx.recv().await {
            let frame = OutboundFrame::message(text);
            write_frame(writer, &frame).await?;

            if frame.is_keepalive() {
                debug!("Keepalive sent");
            } else {
                info!("Message submitted");
            }
            let _ = self.pulse_tx.send(Pulse::now(PulseCause::MessageSent));
        }
        Err(ClientError::ChannelClosed { queue: "outbound" })
    }
}
