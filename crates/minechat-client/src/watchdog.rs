//! Liveness watchdog for one cohort.
//!
//! The watchdog keeps a single reference point, the most recent pulse, and
//! derives two deadlines from it:
//!
//! - `last_pulse + keepalive_interval`: queue an empty message so the
//!   server has something to answer. Repeats every interval while silent.
//! - `last_pulse + silence_timeout`: give up with
//!   [`ClientError::WatchdogTimeout`].
//!
//! A keepalive is not a pulse by itself; only its successful send (reported
//! by the sender) resets the window.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use minechat_core::Pulse;

use crate::config::{DEFAULT_KEEPALIVE, DEFAULT_SILENCE_TIMEOUT};
use crate::error::{ClientError, Result};

/// Watchdog timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// Silence before a keepalive is queued.
    pub keepalive_interval: Duration,
    /// Silence before the cohort is declared dead.
    pub silence_timeout: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: DEFAULT_KEEPALIVE,
            silence_timeout: DEFAULT_SILENCE_TIMEOUT,
        }
    }
}

/// Tracks pulses and enforces the silence timeout.
pub struct Watchdog {
    config: WatchdogConfig,
    outbound_tx: mpsc::UnboundedSender<String>,
}

impl Watchdog {
    pub fn new(config: WatchdogConfig, outbound_tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            config,
            outbound_tx,
        }
    }

    /// Watches the pulse queue until the silence timeout expires.
    ///
    /// Never returns `Ok`. The window starts when this is first polled;
    /// pulses queued earlier only move it forward.
    pub async fn run(&self, pulse_rx: &mut mpsc::UnboundedReceiver<Pulse>) -> Result<()> {
        let WatchdogConfig {
            keepalive_interval,
            silence_timeout,
        } = self.config;

        let mut last_pulse = Instant::now();
        let mut next_keepalive = last_pulse + keepalive_interval;

        loop {
            let deadline = last_pulse + silence_timeout;

            // Order matters: a pulse already queued at the deadline wins, and
            // the deadline wins over a keepalive due at the same instant.
            tokio::select! {
                biased;

                pulse = pulse_rx.recv() => {
                    let Some(pulse) = pulse else {
                        return Err(ClientError::ChannelClosed { queue: "pulse" });
                    };
                    debug!(cause = %pulse.cause, "Pulse");
                    last_pulse = last_pulse.max(pulse.at);
                    next_keepalive = last_pulse + keepalive_interval;
                }

                _ = sleep_until(deadline) => {
                    // A producer woken on the same tick may not have sent yet
                    tokio::task::yield_now().await;
                    let mut boundary_pulse = false;
                    while let Ok(pulse) = pulse_rx.try_recv() {
                        if pulse.at > last_pulse && pulse.at <= deadline {
                            debug!(cause = %pulse.cause, "Pulse at the silence boundary");
                            last_pulse = pulse.at;
                            boundary_pulse = true;
                        }
                    }
                    if boundary_pulse {
                        next_keepalive = last_pulse + keepalive_interval;
                        continue;
                    }

                    warn!(silence = ?silence_timeout, "Watchdog timeout");
                    return Err(ClientError::WatchdogTimeout {
                        silence: silence_timeout,
                    });
                }

                _ = sleep_until(next_keepalive) => {
                    debug!("Idle, queueing keepalive");
                    self.outbound_tx
                        .send(String::new())
                        .map_err(|_| ClientError::ChannelClosed { queue: "outbound" })?;
                    next_keepalive += keepalive_interval;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minechat_core::PulseCause;

    fn watchdog() -> (Watchdog, mpsc::UnboundedReceiver<String>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        (Watchdog::new(WatchdogConfig::default(), outbound_tx), outbound_rx)
    }

    fn count(rx: &mut mpsc::UnboundedReceiver<String>) -> usize {
        let mut n = 0;
        while let Ok(msg) = rx.try_recv() {
            assert!(msg.is_empty(), "keepalive must be empty, got {msg:?}");
            n += 1;
        }
        n
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_times_out_after_one_keepalive() {
        let (watchdog, mut outbound_rx) = watchdog();
        let (_pulse_tx, mut pulse_rx) = mpsc::unbounded_channel();
        let start = Instant::now();

        let result = watchdog.run(&mut pulse_rx).await;

        assert!(matches!(result, Err(ClientError::WatchdogTimeout { .. })));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(11), "elapsed {elapsed:?}");
        assert_eq!(count(&mut outbound_rx), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_regular_pulses_keep_cohort_alive() {
        let (watchdog, mut outbound_rx) = watchdog();
        let (pulse_tx, mut pulse_rx) = mpsc::unbounded_channel();
        let start = Instant::now();

        let feeder = async move {
            for _ in 0..5 {
                tokio::time::sleep(Duration::from_secs(9)).await;
                pulse_tx.send(Pulse::now(PulseCause::MessageReceived)).unwrap();
            }
            // Dropping the sender ends the watchdog without a timeout
        };
        let (result, ()) = tokio::join!(watchdog.run(&mut pulse_rx), feeder);

        assert!(matches!(
            result,
            Err(ClientError::ChannelClosed { queue: "pulse" })
        ));
        assert!(start.elapsed() >= Duration::from_secs(45));
        // One keepalive 5s into each 9s gap
        assert_eq!(count(&mut outbound_rx), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_from_last_pulse() {
        let (watchdog, mut outbound_rx) = watchdog();
        let (pulse_tx, mut pulse_rx) = mpsc::unbounded_channel();
        let start = Instant::now();

        let feeder = async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            pulse_tx.send(Pulse::now(PulseCause::MessageSent)).unwrap();
            // Keep the queue open past the deadline
            tokio::time::sleep(Duration::from_secs(60)).await;
        };
        let result = tokio::select! {
            result = watchdog.run(&mut pulse_rx) => result,
            _ = feeder => panic!("watchdog outlived the feeder"),
        };

        assert!(matches!(result, Err(ClientError::WatchdogTimeout { .. })));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(17), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(18), "elapsed {elapsed:?}");
        // At 5s, then 12s; the one due at 17s loses to the deadline
        assert_eq!(count(&mut outbound_rx), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_at_exact_boundary_resets_window() {
        let (watchdog, mut outbound_rx) = watchdog();
        let (pulse_tx, mut pulse_rx) = mpsc::unbounded_channel();
        let start = Instant::now();

        let feeder = async move {
            tokio::time::sleep(DEFAULT_SILENCE_TIMEOUT).await;
            pulse_tx.send(Pulse::now(PulseCause::MessageReceived)).unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        };
        let result = tokio::select! {
            result = watchdog.run(&mut pulse_rx) => result,
            _ = feeder => panic!("watchdog outlived the feeder"),
        };

        assert!(matches!(result, Err(ClientError::WatchdogTimeout { .. })));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(20), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(21), "elapsed {elapsed:?}");
        // At 5s and 15s; the ones due at 10s and 20s lose to the deadline
        assert_eq!(count(&mut outbound_rx), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_at_boundary_from_other_task_resets_window() {
        let (watchdog, _outbound_rx) = watchdog();
        let (pulse_tx, mut pulse_rx) = mpsc::unbounded_channel();
        let start = Instant::now();

        let feeder = tokio::spawn(async move {
            tokio::time::sleep(DEFAULT_SILENCE_TIMEOUT).await;
            pulse_tx.send(Pulse::now(PulseCause::MessageSent)).unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let result = watchdog.run(&mut pulse_rx).await;
        feeder.abort();

        assert!(matches!(result, Err(ClientError::WatchdogTimeout { .. })));
        assert!(start.elapsed() >= Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_after_boundary_does_not_reset_window() {
        let (watchdog, _outbound_rx) = watchdog();
        let (pulse_tx, mut pulse_rx) = mpsc::unbounded_channel();
        let start = Instant::now();

        let feeder = async move {
            tokio::time::sleep(DEFAULT_SILENCE_TIMEOUT + Duration::from_millis(1)).await;
            pulse_tx.send(Pulse::now(PulseCause::MessageReceived)).unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        };
        let result = tokio::select! {
            result = watchdog.run(&mut pulse_rx) => result,
            _ = feeder => panic!("watchdog outlived the feeder"),
        };

        assert!(matches!(result, Err(ClientError::WatchdogTimeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_pulse_does_not_move_window_back() {
        let (watchdog, _outbound_rx) = watchdog();
        let (pulse_tx, mut pulse_rx) = mpsc::unbounded_channel();
        let stale = Pulse::now(PulseCause::ConnectionEstablished);
        tokio::time::advance(Duration::from_secs(3)).await;
        pulse_tx.send(stale).unwrap();
        let start = Instant::now();

        let result = watchdog.run(&mut pulse_rx).await;

        assert!(matches!(result, Err(ClientError::WatchdogTimeout { .. })));
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_outbound_queue_is_an_error() {
        let (watchdog, outbound_rx) = watchdog();
        drop(outbound_rx);
        let (_pulse_tx, mut pulse_rx) = mpsc::unbounded_channel();

        let result = watchdog.run(&mut pulse_rx).await;

        assert!(matches!(
            result,
            Err(ClientError::ChannelClosed { queue: "outbound" })
        ));
    }
}
