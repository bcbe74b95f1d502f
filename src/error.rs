use std::fmt;

/// Errors surfaced by sink writers and the dispatch layer.
///
/// `Closed`, `NotConnected` and `Timeout` are connection-level: once one of
/// them is observed the transport is unusable and the rest of the batch must
/// not be attempted. Every other variant is a per-part failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The sink has been shut down and will not accept further writes.
    Closed,
    /// No active connection to the target source or sink.
    NotConnected,
    /// The send operation exceeded its allotted time.
    Timeout,
    /// The sink rejected the part with a non-success HTTP status.
    Http { status: u16, endpoint: String },
    /// Transport failure below the HTTP layer.
    Network(String),
    /// The part payload could not be serialized.
    Serialize(String),
    /// Per-index failures collected across one batch, see [`BatchError`].
    Batch(BatchError),
}

impl SinkError {
    /// Whether this error invalidates the whole batch rather than one part.
    ///
    /// Classification is by variant, never by message text, so wrapped or
    /// rephrased variants of the same kind still classify correctly.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SinkError::Closed | SinkError::NotConnected | SinkError::Timeout
        )
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Closed => write!(f, "type was closed"),
            SinkError::NotConnected => write!(f, "not connected to target source or sink"),
            SinkError::Timeout => write!(f, "action timed out"),
            SinkError::Http { status, endpoint } => {
                write!(f, "HTTP {} from {}", status, endpoint)
            }
            SinkError::Network(msg) => write!(f, "network error: {}", msg),
            SinkError::Serialize(msg) => write!(f, "serialization error: {}", msg),
            SinkError::Batch(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for SinkError {}

/// Collects one error per failed part index across a single batch write.
///
/// Construction is lazy: the dispatcher only creates an accumulator once the
/// first recoverable failure appears, so a `BatchError` is never empty.
/// Indices are recorded in visit order, which for batched dispatch means
/// they are unique and ascending.
#[derive(Debug, Clone)]
pub struct BatchError {
    representative: Box<SinkError>,
    failed: Vec<(usize, SinkError)>,
}

impl BatchError {
    /// Create an accumulator whose representative error is `err`.
    ///
    /// The representative stands in for the whole collection wherever a
    /// single error is expected (its message is the `Display` form).
    pub fn new(err: SinkError) -> Self {
        Self {
            representative: Box::new(err),
            failed: Vec::new(),
        }
    }

    /// Record the error observed at `index`, returning the accumulator so
    /// additions chain as the dispatcher walks the batch.
    pub fn add_err_at(mut self, index: usize, err: SinkError) -> Self {
        self.failed.push((index, err));
        self
    }

    /// The error recorded first, used as the single-error view of the batch.
    pub fn representative(&self) -> &SinkError {
        &self.representative
    }

    /// Failed `(index, error)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SinkError)> {
        self.failed.iter().map(|(i, e)| (*i, e))
    }

    /// Indices of the failed parts, in insertion order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.failed.iter().map(|(i, _)| *i)
    }

    pub fn len(&self) -> usize {
        self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failed.is_empty()
    }
}

// Equality is over the set of (index, error) pairs: insertion order and the
// representative slot do not participate.
impl PartialEq for BatchError {
    fn eq(&self, other: &Self) -> bool {
        self.failed.len() == other.failed.len()
            && self.failed.iter().all(|pair| other.failed.contains(pair))
    }
}

impl Eq for BatchError {}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.representative.fmt(f)
    }
}

impl std::error::Error for BatchError {}
