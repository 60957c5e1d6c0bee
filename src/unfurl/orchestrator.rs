use super::classifier::{ContentClassifier, UnsafeContentPredicate};
use super::extractor::{HtmlMetadataExtractor, MetadataExtractor};
use super::fetcher::{FetchPolicy, SafeFetcher};
use super::types::{ClassificationVerdict, FetchOutcome, UnfurlOutcome};
use super::validator::{HostResolver, SystemResolver, UrlValidator};
use crate::config::Config;
use crate::error::{ConfigError, UnfurlError};
use crate::security::content_policy::SignaturePolicy;
use crate::security::screening::UrlScreener;
use std::sync::Arc;
use std::time::Duration;

/// Public entry point: `unfurl(url) -> UnfurlOutcome`.
///
/// Holds only immutable collaborators, so one instance can serve any number
/// of concurrent calls. Nothing survives a call; there is no cache.
#[derive(Clone)]
pub struct Unfurler {
    validator: UrlValidator,
    fetcher: SafeFetcher,
    classifier: ContentClassifier,
    extractor: Arc<dyn MetadataExtractor>,
    deadline: Duration,
}

impl Unfurler {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    pub fn builder(config: &Config) -> UnfurlerBuilder {
        UnfurlerBuilder {
            config: config.clone(),
            resolver: None,
            predicate: None,
            extractor: None,
            screener: None,
            fetch_policy: None,
            deadline: None,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub async fn unfurl(&self, raw: &str) -> UnfurlOutcome {
        self.unfurl_within(raw, self.deadline).await
    }

    /// Runs the whole pipeline under one caller-supplied deadline. On expiry
    /// the pipeline future is dropped, which aborts any in-flight connection.
    pub async fn unfurl_within(&self, raw: &str, deadline: Duration) -> UnfurlOutcome {
        match tokio::time::timeout(deadline, self.run(raw)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                tracing::debug!(url = raw, kind = %err.kind(), error = %err, "unfurl failed");
                err.into()
            }
            Err(_) => {
                tracing::debug!(
                    url = raw,
                    deadline_ms = deadline.as_millis(),
                    "unfurl deadline expired"
                );
                UnfurlError::FetchTimeout(deadline.as_millis()).into()
            }
        }
    }

    async fn run(&self, raw: &str) -> Result<UnfurlOutcome, UnfurlError> {
        let target = self.validator.validate(raw).await?;
        tracing::debug!(url = %target.url(), addrs = ?target.addrs(), "target validated");

        let result = match self.fetcher.fetch(target).await? {
            FetchOutcome::Complete(result) => result,
            FetchOutcome::Screened { url, reason } => {
                return Ok(Self::blocked(raw, &format!("{reason} (at {url})")));
            }
        };
        tracing::debug!(
            url = %result.final_url,
            status = result.status,
            content_type = result.content_type_or_unknown(),
            bytes = result.body.len(),
            elapsed_ms = result.elapsed.as_millis(),
            "fetched"
        );

        match self.classifier.classify(&result) {
            ClassificationVerdict::Safe => {
                let preview = self.extractor.extract(&result);
                tracing::info!(
                    url = raw,
                    title = preview.title.as_deref().unwrap_or_default(),
                    "link unfurled"
                );
                Ok(UnfurlOutcome::Preview(preview))
            }
            ClassificationVerdict::UnsafeContent => {
                Ok(Self::blocked(raw, "content matched unsafe-content policy"))
            }
            ClassificationVerdict::UnsafeType => Err(UnfurlError::UnsupportedType(
                result.content_type_or_unknown().to_string(),
            )),
        }
    }

    fn blocked(raw: &str, reason: &str) -> UnfurlOutcome {
        tracing::warn!(url = raw, reason, "link blocked");
        UnfurlOutcome::blocked()
    }
}

/// Wires the pipeline from a [`Config`], with seams for tests and embedders.
pub struct UnfurlerBuilder {
    config: Config,
    resolver: Option<Arc<dyn HostResolver>>,
    predicate: Option<Arc<dyn UnsafeContentPredicate>>,
    extractor: Option<Arc<dyn MetadataExtractor>>,
    screener: Option<UrlScreener>,
    fetch_policy: Option<FetchPolicy>,
    deadline: Option<Duration>,
}

impl UnfurlerBuilder {
    pub fn resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn predicate(mut self, predicate: Arc<dyn UnsafeContentPredicate>) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn MetadataExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn screener(mut self, screener: UrlScreener) -> Self {
        self.screener = Some(screener);
        self
    }

    pub fn fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = Some(policy);
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn build(self) -> Result<Unfurler, ConfigError> {
        let config = self.config;
        config.validate()?;

        let resolver = self.resolver.unwrap_or_else(|| Arc::new(SystemResolver));
        let validator = UrlValidator::new(resolver, &config.unfurl.private_host_allowlist);

        let predicate: Arc<dyn UnsafeContentPredicate> = match self.predicate {
            Some(predicate) => predicate,
            None => Arc::new(
                SignaturePolicy::from_config(&config.safety)
                    .map_err(|e| ConfigError::Validation(format!("safety.script_patterns: {e}")))?,
            ),
        };
        let screener = match self.screener {
            Some(screener) => screener,
            None => UrlScreener::from_config(&config.safety)?,
        };
        let policy = self
            .fetch_policy
            .unwrap_or_else(|| FetchPolicy::from(&config.unfurl));

        Ok(Unfurler {
            fetcher: SafeFetcher::new(validator.clone(), policy).with_screener(screener),
            validator,
            classifier: ContentClassifier::new(predicate),
            extractor: self
                .extractor
                .unwrap_or_else(|| Arc::new(HtmlMetadataExtractor)),
            deadline: self.deadline.unwrap_or_else(|| config.unfurl.deadline()),
        })
    }
}
