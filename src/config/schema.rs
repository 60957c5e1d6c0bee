use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Unfurler/0.1 (+link-preview)";

/// EICAR anti-virus test signature. Matching it proves the marker scan is wired.
pub const EICAR_MARKER: &str =
    "X5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!H+H*";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub unfurl: UnfurlConfig,

    #[serde(default)]
    pub safety: SafetyConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Outbound fetch limits for a single unfurl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnfurlConfig {
    /// Connect + read bound for one HTTP exchange (default: 5)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// End-to-end budget for validate + fetch + classify + extract (default: 8)
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    /// Maximum redirect hops followed (default: 5)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum response body size in bytes (default: 2 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Content types that are parsed for metadata
    #[serde(default = "default_allowed_content_types")]
    pub allowed_content_types: Vec<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Hosts exempt from the private-range check, e.g. a local dev server.
    /// Entries are host names or IP literals exactly as they appear in URLs.
    #[serde(default)]
    pub private_host_allowlist: Vec<String>,
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_deadline_secs() -> u64 {
    8
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_allowed_content_types() -> Vec<String> {
    vec!["text/html".into(), "application/xhtml+xml".into()]
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

impl Default for UnfurlConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            deadline_secs: default_deadline_secs(),
            max_redirects: default_max_redirects(),
            max_body_bytes: default_max_body_bytes(),
            allowed_content_types: default_allowed_content_types(),
            user_agent: default_user_agent(),
            private_host_allowlist: Vec::new(),
        }
    }
}

impl UnfurlConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

/// URL screening and content-safety policy sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Exact URLs, exact hosts, or `*` wildcard patterns that are always blocked
    #[serde(default)]
    pub blocklist: Vec<String>,
    /// Regexes matched against the full requested URL
    #[serde(default)]
    pub url_patterns: Vec<String>,
    /// Byte markers (case-insensitive) that mark a payload unsafe
    #[serde(default = "default_content_markers")]
    pub content_markers: Vec<String>,
    /// Regexes matched against HTML payloads
    #[serde(default)]
    pub script_patterns: Vec<String>,
    /// Treat executables/archives served as HTML as unsafe (default: true)
    #[serde(default = "default_true")]
    pub block_sniffed_binaries: bool,
    /// Google Safe Browsing key; lookup is skipped when unset
    #[serde(default)]
    pub safe_browsing_api_key: Option<String>,
    #[serde(default = "default_safe_browsing_endpoint")]
    pub safe_browsing_endpoint: String,
}

fn default_content_markers() -> Vec<String> {
    vec![EICAR_MARKER.into()]
}

fn default_true() -> bool {
    true
}

fn default_safe_browsing_endpoint() -> String {
    "https://safebrowsing.googleapis.com/v4/threatMatches:find".into()
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            blocklist: Vec::new(),
            url_patterns: Vec::new(),
            content_markers: default_content_markers(),
            script_patterns: Vec::new(),
            block_sniffed_binaries: true,
            safe_browsing_api_key: None,
            safe_browsing_endpoint: default_safe_browsing_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway port (default: 3000)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            host: default_gateway_host(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unfurl = &self.unfurl;
        if unfurl.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "unfurl.request_timeout_secs must be >= 1".into(),
            ));
        }
        if unfurl.deadline_secs < unfurl.request_timeout_secs {
            return Err(ConfigError::Validation(
                "unfurl.deadline_secs must be >= unfurl.request_timeout_secs".into(),
            ));
        }
        if unfurl.max_body_bytes == 0 {
            return Err(ConfigError::Validation(
                "unfurl.max_body_bytes must be >= 1".into(),
            ));
        }
        if unfurl.allowed_content_types.is_empty() {
            return Err(ConfigError::Validation(
                "unfurl.allowed_content_types must not be empty".into(),
            ));
        }
        for ct in &unfurl.allowed_content_types {
            if ct.parse::<mime::Mime>().is_err() {
                return Err(ConfigError::Validation(format!(
                    "unfurl.allowed_content_types: '{ct}' is not a media type"
                )));
            }
        }
        for (field, patterns) in [
            ("safety.url_patterns", &self.safety.url_patterns),
            ("safety.script_patterns", &self.safety.script_patterns),
        ] {
            for pattern in patterns {
                if let Err(e) = regex::Regex::new(pattern) {
                    return Err(ConfigError::Validation(format!("{field}: {e}")));
                }
            }
        }
        Ok(())
    }
}
