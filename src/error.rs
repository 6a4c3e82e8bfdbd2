//! Error taxonomy for the command and monitoring layer.
//!
//! DESIGN
//! ======
//! `ApiError` describes what went wrong talking to the backend. `CypherError`
//! classifies failures the way the conversation and progress views surface
//! them: rejected input, unresolved actions, failed remote calls, and failed
//! polls. Every variant carries a grepable code via [`ErrorCode`].

// =============================================================================
// ERROR CODE TRAIT
// =============================================================================

/// Stable machine-readable code plus a retry hint for any surfaced error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// TRANSPORT ERRORS
// =============================================================================

/// Errors produced while talking to the analysis backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// An identifier cannot be placed in a URL path segment.
    #[error("invalid path segment: {0:?}")]
    InvalidPath(String),

    /// The request never produced a response (connect, timeout, reset).
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::InvalidPath(_) => "E_API_PATH",
            Self::Request(_) => "E_API_REQUEST",
            Self::Status { .. } => "E_API_STATUS",
            Self::Decode(_) => "E_API_DECODE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// SURFACED ERRORS
// =============================================================================

/// Failures of the conversation, dispatch, and monitoring operations.
#[derive(Debug, thiserror::Error)]
pub enum CypherError {
    /// Empty or whitespace-only message; never reaches the backend.
    #[error("message is empty")]
    InvalidInput,

    /// Another exchange is still awaiting its response.
    #[error("a message is already being processed")]
    Busy,

    /// `retry_last` with no previously sent message.
    #[error("nothing to retry")]
    NothingToRetry,

    /// The action identifier is not one this client knows how to perform.
    #[error("unknown action: {0}")]
    UnresolvedAction(String),

    /// The action is known but its parameters cannot produce an effect.
    #[error("invalid parameters for {action}: {reason}")]
    InvalidParams { action: String, reason: String },

    /// A conversational exchange or mutation failed.
    #[error("remote call failed: {0}")]
    RemoteCallFailure(#[source] ApiError),

    /// A progress poll failed to complete.
    #[error("progress poll failed: {0}")]
    PollTransportFailure(#[source] ApiError),
}

impl ErrorCode for CypherError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput => "E_INVALID_INPUT",
            Self::Busy => "E_BUSY",
            Self::NothingToRetry => "E_NOTHING_TO_RETRY",
            Self::UnresolvedAction(_) => "E_UNRESOLVED_ACTION",
            Self::InvalidParams { .. } => "E_INVALID_PARAMS",
            Self::RemoteCallFailure(_) => "E_REMOTE_CALL",
            Self::PollTransportFailure(_) => "E_POLL_TRANSPORT",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::RemoteCallFailure(e) | Self::PollTransportFailure(e) => e.retryable(),
            Self::Busy => true,
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
