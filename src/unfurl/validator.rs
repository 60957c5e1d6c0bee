use super::types::TargetUrl;
use crate::error::UnfurlError;
use crate::security::url_validation::{blocked_literal_host, blocked_range};
use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use url::{Host, Url};

/// DNS seam. Production uses the system resolver; tests inject fixed answers.
pub trait HostResolver: Send + Sync {
    fn resolve<'a>(
        &'a self,
        host: &'a str,
        port: u16,
    ) -> Pin<Box<dyn Future<Output = io::Result<Vec<SocketAddr>>> + Send + 'a>>;
}

/// Resolver backed by the operating system (`getaddrinfo` via tokio).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn resolve<'a>(
        &'a self,
        host: &'a str,
        port: u16,
    ) -> Pin<Box<dyn Future<Output = io::Result<Vec<SocketAddr>>> + Send + 'a>> {
        Box::pin(async move {
            let addrs = tokio::net::lookup_host((host, port)).await?;
            Ok(addrs.collect())
        })
    }
}

/// Turns raw strings into [`TargetUrl`]s, refusing anything that is not a
/// public http(s) destination. Hosts in `exempt` skip the range check only;
/// scheme and resolution rules still apply to them.
#[derive(Clone)]
pub struct UrlValidator {
    resolver: Arc<dyn HostResolver>,
    exempt: Arc<HashSet<String>>,
}

impl UrlValidator {
    pub fn new<I, S>(resolver: Arc<dyn HostResolver>, exempt: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let exempt = exempt
            .into_iter()
            .map(|host| normalize_host(host.as_ref()))
            .collect();
        Self {
            resolver,
            exempt: Arc::new(exempt),
        }
    }

    fn is_exempt(&self, host: &str) -> bool {
        !self.exempt.is_empty() && self.exempt.contains(&normalize_host(host))
    }

    pub async fn validate(&self, raw: &str) -> Result<TargetUrl, UnfurlError> {
        let url = Url::parse(raw.trim()).map_err(|e| UnfurlError::InvalidUrl(format!("{e}")))?;
        self.validate_url(url).await
    }

    /// Same checks as [`validate`](Self::validate) for an already-parsed URL,
    /// used on every redirect hop.
    pub async fn validate_url(&self, url: Url) -> Result<TargetUrl, UnfurlError> {
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(UnfurlError::InvalidUrl(format!(
                    "unsupported scheme '{other}'"
                )));
            }
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(UnfurlError::InvalidUrl(
                "credentials in URL are not allowed".into(),
            ));
        }
        let port = url
            .port_or_known_default()
            .ok_or_else(|| UnfurlError::InvalidUrl("URL has no port".into()))?;

        let addrs = match url.host() {
            None => return Err(UnfurlError::InvalidUrl("URL has no host".into())),
            Some(Host::Ipv4(v4)) => vec![self.vet(&v4.to_string(), IpAddr::V4(v4), port)?],
            Some(Host::Ipv6(v6)) => vec![self.vet(&v6.to_string(), IpAddr::V6(v6), port)?],
            Some(Host::Domain(domain)) => self.resolve_domain(domain, port).await?,
        };

        Ok(TargetUrl::new(url, addrs))
    }

    async fn resolve_domain(
        &self,
        domain: &str,
        port: u16,
    ) -> Result<Vec<SocketAddr>, UnfurlError> {
        if !self.is_exempt(domain)
            && let Some(reason) = blocked_literal_host(domain)
        {
            return Err(UnfurlError::blocked_host(domain, reason));
        }

        let resolved = self.resolver.resolve(domain, port).await.map_err(|e| {
            tracing::debug!(host = domain, error = %e, "dns resolution failed");
            UnfurlError::UnresolvableHost(domain.to_string())
        })?;
        if resolved.is_empty() {
            return Err(UnfurlError::UnresolvableHost(domain.to_string()));
        }

        resolved
            .into_iter()
            .map(|addr| self.vet(domain, addr.ip(), port))
            .collect()
    }

    fn vet(&self, host: &str, ip: IpAddr, port: u16) -> Result<SocketAddr, UnfurlError> {
        if !self.is_exempt(host)
            && let Some(reason) = blocked_range(&ip)
        {
            return Err(UnfurlError::blocked_host(host, format!("{ip} is {reason}")));
        }
        Ok(SocketAddr::new(ip, port))
    }
}

fn normalize_host(host: &str) -> String {
    host.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}
