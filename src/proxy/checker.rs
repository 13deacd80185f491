//! Proxy prober: one request to the test URL through one proxy, classified
//! into a [`ProbeResult`]

use crate::proxy::models::{ProbeResult, ProxyEntry, ProxyProtocol};
use reqwest::{Client, Proxy as ReqwestProxy, StatusCode};
use std::error::Error as StdError;
use std::future::Future;
use std::time::{Duration, Instant};

/// Default timeout for proxy checks in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of concurrent checks
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default URL to test proxies against
pub const DEFAULT_TEST_URL: &str = "http://www.google.com";

/// Configuration for a probing run
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Deadline for each probe, covering connect, handshake and response headers
    pub timeout: Duration,
    /// Maximum number of probes in flight
    pub concurrency: usize,
    /// URL to fetch through each proxy
    pub test_url: String,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            test_url: DEFAULT_TEST_URL.to_string(),
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_test_url(mut self, url: impl Into<String>) -> Self {
        self.test_url = url.into();
        self
    }
}

/// Prefix `http://` onto a test URL that has no explicit http(s) scheme
pub fn normalize_test_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

/// Something that can probe a single proxy entry.
///
/// Implementations must contain every failure in the returned result.
pub trait Probe: Send + Sync + 'static {
    fn probe(&self, entry: &ProxyEntry) -> impl Future<Output = ProbeResult> + Send;
}

/// Prober that issues a GET to the test URL through the proxy with reqwest.
///
/// Certificate validation is switched off for both the proxy and the target:
/// the probe measures reachability, not certificate trust. This is an
/// intentional relaxation and offers no security property.
#[derive(Debug, Clone)]
pub struct ProxyChecker {
    config: CheckerConfig,
}

impl ProxyChecker {
    /// Create a new proxy checker with default configuration
    pub fn new() -> Self {
        Self::with_config(CheckerConfig::default())
    }

    /// Create a new proxy checker with custom configuration
    pub fn with_config(mut config: CheckerConfig) -> Self {
        config.test_url = normalize_test_url(&config.test_url);
        Self { config }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Check a single proxy
    pub async fn check_proxy(&self, entry: &ProxyEntry) -> ProbeResult {
        let start = Instant::now();

        let result = match tokio::time::timeout(self.config.timeout, self.fetch_status(entry)).await
        {
            Ok(Ok(status)) => {
                let elapsed = elapsed_ms(start);
                if status == StatusCode::OK {
                    ProbeResult::success(entry, elapsed)
                } else {
                    ProbeResult::http_error(entry, elapsed, status.as_u16())
                }
            }
            Ok(Err(e)) if e.is_timeout() => ProbeResult::timeout(entry, self.config.timeout),
            Ok(Err(e)) => ProbeResult::failed(entry, &root_cause(&e)),
            Err(_) => ProbeResult::timeout(entry, self.config.timeout),
        };

        tracing::debug!(
            endpoint = %entry.endpoint,
            protocol = %entry.protocol,
            status = %result.status,
            latency_ms = result.latency_ms,
            error = %result.error_detail,
            "Probe finished"
        );

        result
    }

    async fn fetch_status(&self, entry: &ProxyEntry) -> reqwest::Result<StatusCode> {
        let client = self.create_client(entry)?;
        let response = client.get(&self.config.test_url).send().await?;
        Ok(response.status())
    }

    /// Create a reqwest client routed through the proxy
    fn create_client(&self, entry: &ProxyEntry) -> reqwest::Result<Client> {
        let reqwest_proxy = match entry.protocol {
            ProxyProtocol::Http | ProxyProtocol::Https => ReqwestProxy::all(entry.url())?,
            // socks5h: the proxy resolves the target host
            ProxyProtocol::Socks5 => ReqwestProxy::all(format!("socks5h://{}", entry.endpoint))?,
        };

        Client::builder()
            .proxy(reqwest_proxy)
            .timeout(self.config.timeout)
            .danger_accept_invalid_certs(true)
            .build()
    }
}

impl Default for ProxyChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for ProxyChecker {
    fn probe(&self, entry: &ProxyEntry) -> impl Future<Output = ProbeResult> + Send {
        self.check_proxy(entry)
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Message of the innermost error in the source chain
fn root_cause(err: &(dyn StdError + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::{ProbeStatus, MAX_ERROR_DETAIL_CHARS, TIMEOUT_DETAIL};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Entry pointing at the mock server, which then plays the HTTP proxy
    fn entry_for(server: &MockServer) -> ProxyEntry {
        ProxyEntry::new(server.address().to_string(), ProxyProtocol::Http)
    }

    fn checker(timeout: Duration) -> ProxyChecker {
        ProxyChecker::with_config(
            CheckerConfig::new()
                .with_timeout(timeout)
                .with_test_url("http://probe.test/ip"),
        )
    }

    /// A local port with nothing listening on it
    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_checker_config_default() {
        let config = CheckerConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.test_url, DEFAULT_TEST_URL);
    }

    #[test]
    fn test_checker_config_builder() {
        let config = CheckerConfig::new()
            .with_timeout(Duration::from_secs(30))
            .with_concurrency(20)
            .with_test_url("http://example.com");

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.concurrency, 20);
        assert_eq!(config.test_url, "http://example.com");
    }

    #[test]
    fn test_normalize_test_url() {
        assert_eq!(normalize_test_url("www.google.com"), "http://www.google.com");
        assert_eq!(normalize_test_url("http://httpbin.org/ip"), "http://httpbin.org/ip");
        assert_eq!(normalize_test_url("https://httpbin.org/ip"), "https://httpbin.org/ip");
    }

    #[test]
    fn test_checker_normalizes_test_url() {
        let checker = ProxyChecker::with_config(CheckerConfig::new().with_test_url("example.com"));
        assert_eq!(checker.config().test_url, "http://example.com");
    }

    #[tokio::test]
    async fn test_status_200_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"origin\":\"1.2.3.4\"}"))
            .mount(&server)
            .await;

        let result = checker(Duration::from_secs(5)).check_proxy(&entry_for(&server)).await;

        assert_eq!(result.status, ProbeStatus::Success);
        assert!(result.latency_ms > 0.0);
        assert!(result.error_detail.is_empty());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_200_status_is_failed_with_http_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = checker(Duration::from_secs(5)).check_proxy(&entry_for(&server)).await;

        assert_eq!(result.status, ProbeStatus::Failed);
        assert_eq!(result.error_detail, "HTTP 404");
        assert!(result.latency_ms > 0.0);
    }

    #[tokio::test]
    async fn test_other_2xx_is_not_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let result = checker(Duration::from_secs(5)).check_proxy(&entry_for(&server)).await;

        assert_eq!(result.status, ProbeStatus::Failed);
        assert_eq!(result.error_detail, "HTTP 204");
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout_with_configured_latency() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let result = checker(Duration::from_secs(2)).check_proxy(&entry_for(&server)).await;

        assert_eq!(result.status, ProbeStatus::Timeout);
        assert_eq!(result.latency_ms, 2000.0);
        assert_eq!(result.error_detail, TIMEOUT_DETAIL);
    }

    #[tokio::test]
    async fn test_refused_connection_is_failed_with_zero_latency() {
        let entry = ProxyEntry::new(format!("127.0.0.1:{}", closed_port()), ProxyProtocol::Http);

        let result = checker(Duration::from_secs(5)).check_proxy(&entry).await;

        assert_eq!(result.status, ProbeStatus::Failed);
        assert_eq!(result.latency_ms, 0.0);
        assert!(!result.error_detail.is_empty());
        assert!(result.error_detail.chars().count() <= MAX_ERROR_DETAIL_CHARS);
    }

    #[tokio::test]
    async fn test_refused_socks5_proxy_is_failed() {
        let entry = ProxyEntry::new(
            format!("user:pw@127.0.0.1:{}", closed_port()),
            ProxyProtocol::Socks5,
        );

        let result = checker(Duration::from_secs(5)).check_proxy(&entry).await;

        assert_eq!(result.status, ProbeStatus::Failed);
        assert_eq!(result.latency_ms, 0.0);
        assert_eq!(result.endpoint, entry.endpoint);
        assert_eq!(result.protocol, ProxyProtocol::Socks5);
    }

    #[tokio::test]
    async fn test_probe_trait_delegates_to_check_proxy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let result = Probe::probe(&checker(Duration::from_secs(5)), &entry_for(&server)).await;
        assert!(result.is_success());
    }
}
