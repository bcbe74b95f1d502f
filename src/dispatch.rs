use std::future::Future;

use tracing::debug;

use crate::error::{BatchError, SinkError};
use crate::message::{Message, Part};

/// Drive every part of `msg` through `send`, one part at a time and in
/// ascending index order.
///
/// Each part is awaited to completion before the next index is visited, so
/// no two sends are ever in flight at once. The callback receives an owned
/// [`Part`] (cloning one is a refcount bump).
///
/// Failure handling:
/// - a recoverable error is recorded against its exact index and iteration
///   continues; once the batch is exhausted the recorded pairs come back
///   together as [`SinkError::Batch`];
/// - a fatal error ([`SinkError::is_fatal`]) stops iteration immediately and
///   is returned unchanged. Parts past the failing index are never sent, and
///   any recoverable errors recorded earlier in the call are dropped; the
///   caller must treat the batch as undelivered beyond what it observed
///   succeed.
///
/// This function never retries a part and never undoes the side effects of
/// parts already sent.
pub async fn iterate_batched_send<F, Fut>(msg: &Message, mut send: F) -> Result<(), SinkError>
where
    F: FnMut(usize, Part) -> Fut,
    Fut: Future<Output = Result<(), SinkError>>,
{
    let mut batch_err: Option<BatchError> = None;

    for (index, part) in msg.iter().enumerate() {
        match send(index, part.clone()).await {
            Ok(()) => {}
            Err(err) if err.is_fatal() => {
                debug!(index, error = %err, "fatal send error, aborting batch");
                return Err(err);
            }
            Err(err) => {
                batch_err = Some(match batch_err.take() {
                    Some(agg) => agg.add_err_at(index, err),
                    None => BatchError::new(err.clone()).add_err_at(index, err),
                });
            }
        }
    }

    match batch_err {
        Some(agg) => {
            debug!(failed = agg.len(), total = msg.len(), "batch completed with part failures");
            Err(SinkError::Batch(agg))
        }
        None => Ok(()),
    }
}
