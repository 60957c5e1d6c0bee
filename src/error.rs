use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ─── Unfurl pipeline errors ──────────────────────────────────────────────────

/// Typed failure of a single unfurl invocation.
///
/// Every stage of the pipeline fails with one of these; the orchestrator turns
/// them into `UnfurlOutcome::Failed`. Callers never see a raw `reqwest` or
/// parser error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnfurlError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("could not resolve host '{0}'")]
    UnresolvableHost(String),

    #[error("host '{host}' is not allowed: {reason}")]
    BlockedHost { host: String, reason: String },

    #[error("request timed out after {0}ms")]
    FetchTimeout(u128),

    #[error("more than {0} redirects")]
    TooManyRedirects(usize),

    #[error("response exceeds {limit} bytes")]
    ResponseTooLarge { limit: usize },

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("upstream returned HTTP {status}")]
    HttpError { status: u16 },

    #[error("content type '{0}' cannot be previewed")]
    UnsupportedType(String),
}

impl UnfurlError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidUrl(_) => FailureKind::InvalidUrl,
            Self::UnresolvableHost(_) => FailureKind::UnresolvableHost,
            Self::BlockedHost { .. } => FailureKind::BlockedHost,
            Self::FetchTimeout(_) => FailureKind::FetchTimeout,
            Self::TooManyRedirects(_) => FailureKind::TooManyRedirects,
            Self::ResponseTooLarge { .. } => FailureKind::ResponseTooLarge,
            Self::NetworkError(_) => FailureKind::NetworkError,
            Self::HttpError { status } => FailureKind::HttpError { status: *status },
            Self::UnsupportedType(_) => FailureKind::UnsupportedType,
        }
    }

    pub(crate) fn blocked_host(host: &str, reason: impl Into<String>) -> Self {
        Self::BlockedHost {
            host: host.to_string(),
            reason: reason.into(),
        }
    }
}

/// Machine-readable failure kind carried by `UnfurlOutcome::Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FailureKind {
    InvalidUrl,
    UnresolvableHost,
    BlockedHost,
    FetchTimeout,
    TooManyRedirects,
    ResponseTooLarge,
    NetworkError,
    HttpError { status: u16 },
    UnsupportedType,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUrl => "InvalidUrl",
            Self::UnresolvableHost => "UnresolvableHost",
            Self::BlockedHost => "BlockedHost",
            Self::FetchTimeout => "FetchTimeout",
            Self::TooManyRedirects => "TooManyRedirects",
            Self::ResponseTooLarge => "ResponseTooLarge",
            Self::NetworkError => "NetworkError",
            Self::HttpError { .. } => "HttpError",
            Self::UnsupportedType => "UnsupportedType",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpError { status } => write!(f, "HttpError({status})"),
            other => f.write_str(other.as_str()),
        }
    }
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
