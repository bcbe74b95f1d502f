// src/sink/mod.rs
use crate::error::SinkError;
use crate::message::Message;

mod delivery;
mod http;
mod retry;

pub use delivery::{Delivery, DeliveryReport};
pub use http::HttpSink;
pub use retry::{with_retry, BackoffStrategy, Recoverable, RetryConfig};

/// Connection-oriented writer for an output sink (abstracts the transport).
///
/// Implementations report failures through the [`SinkError`] taxonomy: a
/// closed writer fails with [`SinkError::Closed`], an unconnected one with
/// [`SinkError::NotConnected`], and per-part rejections come back as
/// [`SinkError::Batch`] with exact index attribution.
#[async_trait::async_trait]
pub trait SinkWriter {
    /// Establish (or re-establish) the connection to the sink.
    async fn connect(&mut self) -> Result<(), SinkError>;

    /// Write one batch, part by part and in order.
    async fn write(&mut self, msg: &Message) -> Result<(), SinkError>;

    /// Shut the writer down. Further writes fail with [`SinkError::Closed`].
    async fn close(&mut self) -> Result<(), SinkError>;
}
