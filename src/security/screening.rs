//! Pre-fetch URL screening: manual blocklist, regex safety net, and an
//! optional Google Safe Browsing lookup. A hit blocks the link outright.

use crate::config::SafetyConfig;
use crate::error::ConfigError;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const SAFE_BROWSING_TIMEOUT: Duration = Duration::from_secs(3);

/// One screening rule. Returns the human-readable reason on a hit.
pub trait UrlScreen: Send + Sync {
    fn name(&self) -> &str;

    fn check<'a>(
        &'a self,
        url: &'a Url,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
}

// ── Manual blocklist ─────────────────────────────────────────────────────────

/// Exact URL, exact host, or `*`/`?` wildcard entries. Wildcards are tested
/// against both the full URL and the bare host.
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    urls: HashSet<String>,
    hosts: HashSet<String>,
    wildcards: Vec<(String, Regex)>,
}

impl Blocklist {
    pub fn new<I, S>(entries: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            if entry.contains(['*', '?']) {
                list.wildcards.push((entry.to_string(), wildcard_regex(entry)?));
            } else if let Ok(url) = Url::parse(entry) {
                list.urls.insert(url.to_string());
            } else {
                list.hosts.insert(entry.to_ascii_lowercase());
            }
        }
        Ok(list)
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.hosts.is_empty() && self.wildcards.is_empty()
    }

    pub fn matches(&self, url: &Url) -> Option<String> {
        if self.urls.contains(url.as_str()) {
            return Some("url is in manual blocklist".into());
        }
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if self.hosts.contains(&host) {
            return Some(format!("host '{host}' is in manual blocklist"));
        }
        self.wildcards
            .iter()
            .find(|(_, re)| re.is_match(url.as_str()) || re.is_match(&host))
            .map(|(pattern, _)| format!("matches blocklist pattern '{pattern}'"))
    }
}

fn wildcard_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    re.push('$');
    RegexBuilder::new(&re).case_insensitive(true).build()
}

impl UrlScreen for Blocklist {
    fn name(&self) -> &str {
        "blocklist"
    }

    fn check<'a>(
        &'a self,
        url: &'a Url,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        let hit = self.matches(url);
        Box::pin(async move { hit })
    }
}

// ── Regex safety net ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct PatternScreen {
    patterns: Vec<Regex>,
}

impl PatternScreen {
    pub fn new(patterns: &[String]) -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<_, _>>()?,
        })
    }
}

impl UrlScreen for PatternScreen {
    fn name(&self) -> &str {
        "regex"
    }

    fn check<'a>(
        &'a self,
        url: &'a Url,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        let hit = self
            .patterns
            .iter()
            .find(|re| re.is_match(url.as_str()))
            .map(|re| format!("matches pattern {}", re.as_str()));
        Box::pin(async move { hit })
    }
}

// ── Safe Browsing ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ThreatMatchesResponse {
    #[serde(default)]
    matches: Vec<ThreatMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreatMatch {
    #[serde(default)]
    threat_type: Option<String>,
}

/// Google Safe Browsing v4 `threatMatches:find`. Fails open: an unreachable
/// or erroring API never blocks a link.
#[derive(Debug, Clone)]
pub struct SafeBrowsingScreen {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl SafeBrowsingScreen {
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(SAFE_BROWSING_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Load(format!("safe browsing client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn lookup(&self, url: &Url) -> Option<String> {
        let payload = serde_json::json!({
            "client": {
                "clientId": env!("CARGO_PKG_NAME"),
                "clientVersion": env!("CARGO_PKG_VERSION"),
            },
            "threatInfo": {
                "threatTypes": [
                    "MALWARE",
                    "SOCIAL_ENGINEERING",
                    "UNWANTED_SOFTWARE",
                    "POTENTIALLY_HARMFUL_APPLICATION"
                ],
                "platformTypes": ["ANY_PLATFORM"],
                "threatEntryTypes": ["URL"],
                "threatEntries": [{"url": url.as_str()}],
            }
        });

        let response = match self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "safe browsing lookup failed; allowing");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "safe browsing API error; allowing");
            return None;
        }

        match response.json::<ThreatMatchesResponse>().await {
            Ok(body) => body.matches.first().map(|m| {
                let threat = m.threat_type.as_deref().unwrap_or("Unknown Threat");
                tracing::warn!(url = %url, threat, "safe browsing threat detected");
                format!("flagged as {threat}")
            }),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable safe browsing response; allowing");
                None
            }
        }
    }
}

impl UrlScreen for SafeBrowsingScreen {
    fn name(&self) -> &str {
        "safe_browsing"
    }

    fn check<'a>(
        &'a self,
        url: &'a Url,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(self.lookup(url))
    }
}

// ── Screen chain ─────────────────────────────────────────────────────────────

/// Runs screens in order and stops at the first hit.
#[derive(Clone, Default)]
pub struct UrlScreener {
    screens: Vec<Arc<dyn UrlScreen>>,
}

impl UrlScreener {
    pub fn from_config(config: &SafetyConfig) -> Result<Self, ConfigError> {
        let mut screener = Self::default();

        let blocklist = Blocklist::new(&config.blocklist)
            .map_err(|e| ConfigError::Validation(format!("safety.blocklist: {e}")))?;
        if !blocklist.is_empty() {
            screener = screener.with(Arc::new(blocklist));
        }
        if !config.url_patterns.is_empty() {
            let patterns = PatternScreen::new(&config.url_patterns)
                .map_err(|e| ConfigError::Validation(format!("safety.url_patterns: {e}")))?;
            screener = screener.with(Arc::new(patterns));
        }
        if let Some(key) = config.safe_browsing_api_key.as_deref().filter(|k| !k.is_empty()) {
            screener = screener.with(Arc::new(SafeBrowsingScreen::new(
                &config.safe_browsing_endpoint,
                key,
            )?));
        }
        Ok(screener)
    }

    pub fn with(mut self, screen: Arc<dyn UrlScreen>) -> Self {
        self.screens.push(screen);
        self
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    /// First hit as `"<screen>: <reason>"`, or `None` when every screen passes.
    pub async fn screen(&self, url: &Url) -> Option<String> {
        for screen in &self.screens {
            if let Some(reason) = screen.check(url).await {
                return Some(format!("{}: {reason}", screen.name()));
            }
        }
        None
    }
}
