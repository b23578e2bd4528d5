//! Error types for MailSift

/// Result type alias using MailSift's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for MailSift operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Corpus store errors (constraint violations, query failures)
    #[error("store error: {0}")]
    Store(String),

    /// Boundary validation errors (unknown category, confidence out of range)
    #[error("validation error: {0}")]
    Validation(String),

    /// Permanent reasoning-service errors (auth failure, bad request)
    #[error("reasoning service error: {0}")]
    Service(String),

    /// Transient upstream failure (HTTP 5xx, connection reset)
    #[error("reasoning service unavailable: {0}")]
    Backend(String),

    /// The reasoning service rejected the request rate
    #[error("reasoning service rate limited")]
    RateLimited,

    /// A bounded network operation timed out
    #[error("operation timed out")]
    Timeout,

    /// Structured output that could not be parsed or failed validation
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Training/prediction errors (too little data, incompatible artifact)
    #[error("model error: {0}")]
    Model(String),

    /// Prediction was requested before any artifact was trained
    #[error("model not trained: {0}")]
    ModelNotTrained(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new permanent service error
    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }

    /// Create a new transient backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a new malformed-response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Create a new model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether retrying the failed operation may succeed.
    ///
    /// Drives the labeler's bounded backoff loop: rate limits, timeouts,
    /// and transient upstream failures are retryable; validation and parse
    /// failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout | Self::Backend(_))
    }
}
