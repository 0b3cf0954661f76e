//! Souschef error types

/// Outward disposition of an error, independent of transport.
///
/// The HTTP surface maps each kind to a status code; library consumers can
/// branch on it without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    RateLimited,
    BackendTimeout,
    BackendUnavailable,
    MalformedResponse,
    Internal,
}

impl ErrorKind {
    /// HTTP status code for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Auth => 401,
            ErrorKind::RateLimited => 429,
            ErrorKind::BackendTimeout => 504,
            ErrorKind::BackendUnavailable => 503,
            ErrorKind::MalformedResponse | ErrorKind::Internal => 500,
        }
    }

    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Auth => "UNAUTHORIZED",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::BackendTimeout => "BACKEND_TIMEOUT",
            ErrorKind::BackendUnavailable => "BACKEND_UNAVAILABLE",
            ErrorKind::MalformedResponse => "MALFORMED_RESPONSE",
            ErrorKind::Internal => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// Souschef error types
#[derive(Debug, thiserror::Error)]
pub enum SouschefError {
    // Transport errors from a single attempt
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("authentication with the generative backend failed")]
    AuthenticationFailed,

    // Outcomes after the retry budget is spent
    #[error("generative backend timed out after {attempts} attempt(s)")]
    BackendTimeout { attempts: u32 },

    #[error("generative backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("{0} is not configured")]
    NotConfigured(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty response from model")]
    EmptyResponse,

    #[error("invalid structured response: {0}")]
    InvalidStructuredResponse(String),

    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    // Inbound validation
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("image size ({size} bytes) exceeds maximum ({max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("invalid image: {0}")]
    InvalidImage(String),

    // Admission
    #[error("{0}")]
    Unauthorized(String),

    #[error("rate limit exceeded: {per_minute} requests per minute, {per_hour} requests per hour")]
    RateLimitExceeded { per_minute: u32, per_hour: u32 },

    // Infrastructure
    #[error("backend error: {0}")]
    Backend(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SouschefError {
    /// Whether this error is worth retrying.
    ///
    /// Only network and availability failures qualify: timeouts, refused or
    /// reset connections, and gateway-class statuses (502/503/504).
    pub fn is_transient(&self) -> bool {
        match self {
            SouschefError::Http(_) | SouschefError::Timeout | SouschefError::Connection(_) => true,
            SouschefError::Api { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// Classify for outward reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SouschefError::InvalidInput(_)
            | SouschefError::ImageTooLarge { .. }
            | SouschefError::InvalidImage(_) => ErrorKind::Validation,
            SouschefError::Unauthorized(_) => ErrorKind::Auth,
            SouschefError::RateLimitExceeded { .. } => ErrorKind::RateLimited,
            SouschefError::BackendTimeout { .. } | SouschefError::Timeout => ErrorKind::BackendTimeout,
            SouschefError::BackendUnavailable(_)
            | SouschefError::NotConfigured(_)
            | SouschefError::Connection(_) => ErrorKind::BackendUnavailable,
            SouschefError::MalformedResponse(_) | SouschefError::InvalidStructuredResponse(_) => {
                ErrorKind::MalformedResponse
            }
            _ => ErrorKind::Internal,
        }
    }

    /// Message safe to show a caller.
    ///
    /// Internal errors collapse to a generic sentence; everything else
    /// carries its own display text.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal | ErrorKind::MalformedResponse => {
                "An unexpected error occurred. Please try again later.".to_string()
            }
            ErrorKind::BackendTimeout => {
                "The AI service took too long to respond. Please try again.".to_string()
            }
            ErrorKind::BackendUnavailable => {
                "Unable to reach the AI service. Please try again later.".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Convert a transient error left over after the last attempt into
    /// its exhausted-retry outcome.
    pub(crate) fn into_exhausted(self, attempts: u32) -> SouschefError {
        match self {
            SouschefError::Timeout => SouschefError::BackendTimeout { attempts },
            SouschefError::Connection(msg) | SouschefError::Http(msg) => {
                SouschefError::BackendUnavailable(msg)
            }
            SouschefError::Api { status, message } if matches!(status, 502..=504) => {
                SouschefError::BackendUnavailable(format!("{status}: {message}"))
            }
            other => SouschefError::GenerationFailed(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for SouschefError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            // Malformed URL or header: a fault in how the request was built.
            SouschefError::Configuration(err.to_string())
        } else if err.is_timeout() {
            SouschefError::Timeout
        } else if err.is_connect() {
            SouschefError::Connection(err.to_string())
        } else if err.is_decode() {
            SouschefError::MalformedResponse(err.to_string())
        } else {
            SouschefError::Http(err.to_string())
        }
    }
}

/// Result type alias for Souschef operations
pub type Result<T> = std::result::Result<T, SouschefError>;
