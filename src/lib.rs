// src/lib.rs

// Re-export the payload type parts are built from
pub use bytes::Bytes;

pub mod config;
mod dispatch;
mod error;
mod message;
pub mod sink;

pub use config::SinkConfig;
pub use dispatch::iterate_batched_send;
pub use error::{BatchError, SinkError};
pub use message::{Message, Part};
pub use sink::{Delivery, DeliveryReport, HttpSink, RetryConfig, SinkWriter};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing subscriber.
/// Uses RUST_LOG env var for filtering (defaults to info).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(true))
        .with(filter)
        .init();
}
