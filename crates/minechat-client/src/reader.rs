//! Inbound reader for the read-only live feed.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use minechat_core::{ChatLine, Pulse, PulseCause};

use crate::error::{ClientError, Result};

/// Fans every received line out to the display and persistence queues.
///
/// Both queues see lines in socket order. Each line also pulses the
/// watchdog.
pub struct InboundReader {
    display_tx: mpsc::UnboundedSender<ChatLine>,
    persist_tx: mpsc::UnboundedSender<ChatLine>,
    pulse_tx: mpsc::UnboundedSender<Pulse>,
}

impl InboundReader {
    pub fn new(
        display_tx: mpsc::UnboundedSender<ChatLine>,
        persist_tx: mpsc::UnboundedSender<ChatLine>,
        pulse_tx: mpsc::UnboundedSender<Pulse>,
    ) -> Self {
        Self {
            display_tx,
            persist_tx,
            pulse_tx,
        }
    }

    /// Reads lines until EOF.
    ///
    /// Returns the number of lines read when the server closes the stream.
    /// Invalid UTF-8 and I/O failures are returned as errors.
    pub async fn run<R>(&self, reader: &mut R) -> Result<u64>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut count = 0u64;

        while let Some(raw) = lines.next_line().await? {
            let line = ChatLine::new(&raw);
            debug!(text = %line.text(), "RECEIVE");

            // Ignore send errors - the display layer may be shutting down
            let _ = self.display_tx.send(line.clone());

            self.persist_tx
                .send(line)
                .map_err(|_| ClientError::ChannelClosed {
                    queue: "persistence",
                })?;

            let _ = self.pulse_tx.send(Pulse::now(PulseCause::MessageReceived));
            count = count.saturating_add(1);
        }

        info!(lines = count, "Live feed reached EOF");
        Ok(count)
    }
}
