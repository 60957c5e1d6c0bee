//! Link unfurling: validate → fetch (every hop screened) → classify → extract.

pub mod classifier;
pub mod extractor;
pub mod fetcher;
pub mod orchestrator;
pub mod types;
pub mod validator;

pub use classifier::{ContentClassifier, UnsafeContentPredicate};
pub use extractor::{HtmlMetadataExtractor, MetadataExtractor};
pub use fetcher::{FetchPolicy, SafeFetcher};
pub use orchestrator::{Unfurler, UnfurlerBuilder};
pub use types::{
    BlockReason, ClassificationVerdict, FetchOutcome, FetchResult, Preview, TargetUrl,
    UNSAFE_CONTENT_BLOCKED, UnfurlOutcome,
};
pub use validator::{HostResolver, SystemResolver, UrlValidator};
