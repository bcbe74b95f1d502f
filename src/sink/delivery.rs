use tracing::{debug, info, warn};

use crate::error::SinkError;
use crate::message::Message;
use crate::sink::retry::RetryConfig;
use crate::sink::SinkWriter;

/// Outcome of delivering one batch, with per-index attribution for parts
/// that were still failing when attempts ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Parts confirmed accepted by the sink.
    pub delivered: usize,
    /// Write attempts performed (1 when everything succeeded first try).
    pub attempts: u32,
    /// `(original index, last error)` for parts that never went through.
    pub failed: Vec<(usize, SinkError)>,
}

impl DeliveryReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives batches into a [`SinkWriter`] and owns the recovery policy the
/// dispatch loop deliberately leaves to its caller:
///
/// - per-part failures are retried by rebuilding a sub-batch of exactly the
///   failed indices, re-mapping any survivors back to their original
///   positions;
/// - `NotConnected` and `Timeout` trigger a reconnect (with backoff), then a
///   retry of everything still pending; parts the sink accepted before the
///   connection dropped may be redelivered, so delivery is at-least-once;
/// - `Closed` ends delivery immediately.
pub struct Delivery<W> {
    writer: W,
    retry: RetryConfig,
}

impl<W: SinkWriter> Delivery<W> {
    pub fn new(writer: W, retry: RetryConfig) -> Self {
        Self { writer, retry }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Deliver `msg`, retrying per the configured policy.
    ///
    /// Returns a [`DeliveryReport`] once every part is either delivered or
    /// has exhausted its attempts with a recoverable error. Returns `Err`
    /// when the sink is closed or a reconnect fails.
    pub async fn send(&mut self, msg: &Message) -> Result<DeliveryReport, SinkError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut pending: Vec<usize> = (0..msg.len()).collect();
        let mut delivered = 0usize;
        let mut attempt = 0u32;

        while !pending.is_empty() {
            let sub: Message = pending.iter().filter_map(|&i| msg.get(i).cloned()).collect();
            attempt += 1;
            debug!(attempt, parts = sub.len(), "writing batch");

            match self.writer.write(&sub).await {
                Ok(()) => {
                    delivered += pending.len();
                    pending.clear();
                }
                Err(SinkError::Closed) => {
                    warn!(attempt, pending = pending.len(), "sink closed, abandoning batch");
                    return Err(SinkError::Closed);
                }
                Err(SinkError::Batch(batch)) => {
                    // Map sub-batch indices back to the caller's batch. The
                    // dispatch contract keeps them in range of `pending`.
                    let failed: Vec<(usize, SinkError)> = batch
                        .iter()
                        .map(|(sub_idx, err)| (pending[sub_idx], err.clone()))
                        .collect();
                    delivered += pending.len() - failed.len();

                    if attempt >= max_attempts {
                        warn!(
                            failed = failed.len(),
                            attempts = attempt,
                            "giving up on parts that kept failing"
                        );
                        return Ok(DeliveryReport {
                            delivered,
                            attempts: attempt,
                            failed,
                        });
                    }

                    for (index, err) in &failed {
                        warn!(index, error = %err, "part write failed, will retry");
                    }
                    pending = failed.iter().map(|(i, _)| *i).collect();
                    tokio::time::sleep(self.retry.delay_for_attempt(attempt - 1)).await;
                }
                Err(err) => {
                    // The whole attempt failed without per-part attribution.
                    // Nothing counts as delivered beyond what the sink
                    // observably accepted on its own; for the fatal kinds
                    // the session must be re-established first.
                    if attempt >= max_attempts {
                        return Err(err);
                    }
                    warn!(error = %err, attempt, "batch write failed, backing off");
                    tokio::time::sleep(self.retry.delay_for_attempt(attempt - 1)).await;
                    if err.is_fatal() {
                        self.writer.connect().await?;
                    }
                }
            }
        }

        info!(delivered, attempts = attempt, "batch delivered");
        Ok(DeliveryReport {
            delivered,
            attempts: attempt,
            failed: Vec::new(),
        })
    }
}
