pub mod content_policy;
pub mod screening;
pub mod url_validation;

pub use content_policy::SignaturePolicy;
pub use screening::{Blocklist, PatternScreen, SafeBrowsingScreen, UrlScreen, UrlScreener};
pub use url_validation::{blocked_range, is_public_ip};
