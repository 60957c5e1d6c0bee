use crate::error::{FailureKind, UnfurlError};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

/// Reason code carried by every blocked outcome.
pub const UNSAFE_CONTENT_BLOCKED: &str = "unsafe_content_blocked";

/// An absolute http(s) URL whose host resolved only to public addresses.
///
/// Only the validator constructs these, so holding one proves the target was
/// checked. `addrs` are the vetted addresses the fetcher must connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    url: Url,
    addrs: Vec<SocketAddr>,
}

impl TargetUrl {
    pub(crate) fn new(url: Url, addrs: Vec<SocketAddr>) -> Self {
        Self { url, addrs }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    pub fn into_url(self) -> Url {
        self.url
    }
}

/// What the fetcher brought back. `extractable` is false when the declared
/// content type is outside the allowlist; the body is left unread then.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub final_url: Url,
    pub status: u16,
    /// Lowercase media-type essence, parameters stripped
    pub content_type: Option<String>,
    /// `charset` parameter of the declared Content-Type, lowercased
    pub charset: Option<String>,
    pub extractable: bool,
    pub body: Vec<u8>,
    pub elapsed: Duration,
}

impl FetchResult {
    pub fn content_type_or_unknown(&self) -> &str {
        self.content_type.as_deref().unwrap_or("unknown")
    }
}

/// A fetch either completes or stops at a hop that URL screening refused.
/// A screened hop is never requested.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Complete(FetchResult),
    Screened { url: Url, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationVerdict {
    Safe,
    UnsafeContent,
    UnsafeType,
}

/// Normalized link preview. `canonical_url` is always set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    pub canonical_url: String,
    /// OpenGraph `og:type`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub page_type: Option<String>,
}

impl Preview {
    pub fn bare(canonical_url: impl Into<String>) -> Self {
        Self {
            title: None,
            description: None,
            image_url: None,
            site_name: None,
            canonical_url: canonical_url.into(),
            page_type: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    UnsafeContentBlocked,
}

impl BlockReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsafeContentBlocked => UNSAFE_CONTENT_BLOCKED,
        }
    }
}

/// Result of one `unfurl` call. Exactly one variant, never a partial preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnfurlOutcome {
    Preview(Preview),
    Blocked { reason: BlockReason },
    Failed {
        #[serde(flatten)]
        kind: FailureKind,
        detail: String,
    },
}

impl UnfurlOutcome {
    pub fn blocked() -> Self {
        Self::Blocked {
            reason: BlockReason::UnsafeContentBlocked,
        }
    }

    pub fn preview(&self) -> Option<&Preview> {
        match self {
            Self::Preview(preview) => Some(preview),
            _ => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

impl From<UnfurlError> for UnfurlOutcome {
    fn from(err: UnfurlError) -> Self {
        Self::Failed {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}
