use thiserror::Error;

/// Nominal error kinds surfaced across the decode/geometry/filter/export
/// pipeline. Anything thrown by libvips itself lands in `BackendFailed`;
/// a caught native panic is mapped here too, with message "internal error".
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("empty body")]
    EmptyBody,

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid param: {0}")]
    InvalidParam(String),

    #[error("resolution exceeded: {0}")]
    ResolutionExceeded(String),

    #[error("load failed: {0}")]
    LoadFailed(String),

    #[error("backend failed: {0}")]
    BackendFailed(String),

    #[error("encode failed: {0}")]
    EncodeFailed(String),

    #[error("cancelled")]
    Cancelled,
}

impl ProcessorError {
    /// Wraps a panic payload caught at a backend call boundary. The source
    /// implementation relies on recovering native panics from the imaging
    /// library; we can only catch Rust-side panics (e.g. an unwrap deep in
    /// a filter), but the mapping is kept identical for parity.
    pub fn from_panic(_payload: Box<dyn std::any::Any + Send>) -> Self {
        ProcessorError::BackendFailed("internal error".to_string())
    }
}

/// Minimal cooperative cancellation token. The core pipeline is synchronous
/// (libvips calls block the worker thread), so a full `std::task::Context`
/// would be overkill; callers check `is_cancelled()` between filters and
/// between `max_bytes` export retries, mirroring the source's `ctx.Err()`.
#[derive(Clone, Debug, Default)]
pub struct Cancellation(std::sync::Arc<std::sync::atomic::AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), ProcessorError> {
        if self.is_cancelled() {
            Err(ProcessorError::Cancelled)
        } else {
            Ok(())
        }
    }
}
