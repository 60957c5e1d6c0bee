use super::types::{FetchOutcome, FetchResult, TargetUrl};
use super::validator::UrlValidator;
use crate::config::UnfurlConfig;
use crate::error::UnfurlError;
use crate::security::screening::UrlScreener;
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use std::time::{Duration, Instant};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.1";

/// Limits applied to one fetch (all hops together share `max_redirects`).
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub request_timeout: Duration,
    pub max_redirects: usize,
    pub max_body_bytes: usize,
    /// Lowercase media-type essences, e.g. `text/html`
    pub allowed_content_types: Vec<String>,
    pub user_agent: String,
}

impl From<&UnfurlConfig> for FetchPolicy {
    fn from(config: &UnfurlConfig) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            max_redirects: config.max_redirects,
            max_body_bytes: config.max_body_bytes,
            allowed_content_types: config
                .allowed_content_types
                .iter()
                .map(|ct| essence(ct))
                .collect(),
            user_agent: config.user_agent.clone(),
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from(&UnfurlConfig::default())
    }
}

/// `text/html; charset=utf-8` → `text/html`. Unparsable entries are kept
/// lowercased as-is; `Config::validate` rejects them before this runs.
fn essence(content_type: &str) -> String {
    content_type.trim().parse::<mime::Mime>().map_or_else(
        |_| content_type.trim().to_ascii_lowercase(),
        |m| m.essence_str().to_ascii_lowercase(),
    )
}

/// HTTP GET with bounded time, size, and redirect depth.
///
/// Redirects are followed by hand so every hop goes back through the
/// [`UrlValidator`] and the [`UrlScreener`] before it is requested; a
/// redirect cannot reach a host or URL the first request could not. Each hop
/// connects only to the addresses the validator vetted.
#[derive(Clone)]
pub struct SafeFetcher {
    validator: UrlValidator,
    screener: UrlScreener,
    policy: FetchPolicy,
}

impl SafeFetcher {
    pub fn new(validator: UrlValidator, policy: FetchPolicy) -> Self {
        Self {
            validator,
            screener: UrlScreener::default(),
            policy,
        }
    }

    pub fn with_screener(mut self, screener: UrlScreener) -> Self {
        self.screener = screener;
        self
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    pub async fn fetch(&self, target: TargetUrl) -> Result<FetchOutcome, UnfurlError> {
        let started = Instant::now();
        let mut current = target;
        let mut hops = 0usize;

        loop {
            if let Some(reason) = self.screener.screen(current.url()).await {
                return Ok(FetchOutcome::Screened {
                    url: current.into_url(),
                    reason,
                });
            }

            let mut response = self.send(&current).await?;
            let status = response.status();

            if status.is_redirection()
                && let Some(location) = response.headers().get(LOCATION)
            {
                if hops >= self.policy.max_redirects {
                    return Err(UnfurlError::TooManyRedirects(self.policy.max_redirects));
                }
                let location = location
                    .to_str()
                    .map_err(|_| UnfurlError::InvalidUrl("non-ascii redirect location".into()))?;
                let next = current
                    .url()
                    .join(location)
                    .map_err(|e| UnfurlError::InvalidUrl(format!("redirect location: {e}")))?;
                drop(response);

                hops += 1;
                tracing::debug!(
                    hop = hops,
                    from = %current.url(),
                    to = %next,
                    "following redirect"
                );
                current = self.validator.validate_url(next).await?;
                continue;
            }

            if !status.is_success() {
                return Err(UnfurlError::HttpError {
                    status: status.as_u16(),
                });
            }

            let declared = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<mime::Mime>().ok());
            let content_type = declared
                .as_ref()
                .map(|m| m.essence_str().to_ascii_lowercase());
            let charset = declared
                .as_ref()
                .and_then(|m| m.get_param(mime::CHARSET))
                .map(|c| c.as_str().to_ascii_lowercase());
            let extractable = content_type
                .as_deref()
                .is_some_and(|ct| self.policy.allowed_content_types.iter().any(|a| a == ct));

            let body = if extractable {
                self.read_capped(&mut response).await?
            } else {
                Vec::new()
            };

            return Ok(FetchOutcome::Complete(FetchResult {
                final_url: current.into_url(),
                status: status.as_u16(),
                content_type,
                charset,
                extractable,
                body,
                elapsed: started.elapsed(),
            }));
        }
    }

    async fn send(&self, target: &TargetUrl) -> Result<reqwest::Response, UnfurlError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.policy.request_timeout)
            .timeout(self.policy.request_timeout)
            .user_agent(self.policy.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy();
        if let Some(domain) = target.url().domain() {
            builder = builder.resolve_to_addrs(domain, target.addrs());
        }
        let client = builder
            .build()
            .map_err(|e| UnfurlError::NetworkError(format!("client setup: {e}")))?;

        client
            .get(target.url().clone())
            .header(ACCEPT, ACCEPT_HTML)
            .send()
            .await
            .map_err(|e| self.classify(&e))
    }

    /// Streams the body, giving up as soon as it passes the cap. Returning
    /// early drops the response, which closes the connection.
    async fn read_capped(&self, response: &mut reqwest::Response) -> Result<Vec<u8>, UnfurlError> {
        let limit = self.policy.max_body_bytes;
        if let Some(declared) = response.content_length()
            && declared > limit as u64
        {
            return Err(UnfurlError::ResponseTooLarge { limit });
        }

        let mut body = Vec::with_capacity(
            response
                .content_length()
                .map_or(0, |len| usize::try_from(len).unwrap_or(limit).min(limit)),
        );
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify(&e))? {
            if body.len() + chunk.len() > limit {
                return Err(UnfurlError::ResponseTooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    fn classify(&self, err: &reqwest::Error) -> UnfurlError {
        if err.is_timeout() {
            UnfurlError::FetchTimeout(self.policy.request_timeout.as_millis())
        } else if err.is_connect() {
            UnfurlError::NetworkError(format!("connect failed: {err}"))
        } else {
            UnfurlError::NetworkError(err.to_string())
        }
    }
}
