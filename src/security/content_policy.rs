//! Default content-safety predicate: byte markers, script regexes, and
//! magic-byte sniffing of payloads that claim to be markup.

use crate::config::SafetyConfig;
use crate::unfurl::UnsafeContentPredicate;
use regex::Regex;

#[derive(Debug, Clone, Default)]
pub struct SignaturePolicy {
    markers: Vec<Vec<u8>>,
    script_patterns: Vec<Regex>,
    sniff_binaries: bool,
}

impl SignaturePolicy {
    pub fn from_config(config: &SafetyConfig) -> Result<Self, regex::Error> {
        let script_patterns = config
            .script_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            markers: config
                .content_markers
                .iter()
                .filter(|m| !m.is_empty())
                .map(|m| m.as_bytes().to_ascii_lowercase())
                .collect(),
            script_patterns,
            sniff_binaries: config.block_sniffed_binaries,
        })
    }

    fn matched_marker(&self, body: &[u8]) -> bool {
        if self.markers.is_empty() {
            return false;
        }
        let lowered = body.to_ascii_lowercase();
        self.markers
            .iter()
            .any(|marker| lowered.windows(marker.len()).any(|w| w == marker.as_slice()))
    }

    fn matched_script(&self, body: &[u8]) -> bool {
        if self.script_patterns.is_empty() {
            return false;
        }
        let text = String::from_utf8_lossy(body);
        self.script_patterns.iter().any(|re| re.is_match(&text))
    }

    fn sniffed_binary(&self, body: &[u8]) -> Option<&'static str> {
        if !self.sniff_binaries {
            return None;
        }
        let kind = infer::get(body)?;
        matches!(
            kind.matcher_type(),
            infer::MatcherType::App | infer::MatcherType::Archive
        )
        .then(|| kind.mime_type())
    }
}

impl UnsafeContentPredicate for SignaturePolicy {
    fn is_unsafe(&self, body: &[u8], content_type: &str) -> bool {
        if let Some(sniffed) = self.sniffed_binary(body) {
            tracing::debug!(declared = content_type, sniffed, "binary payload behind markup type");
            return true;
        }
        self.matched_marker(body) || self.matched_script(body)
    }
}
