//! Blocking HTTP certificate fetcher.
//!
//! Only `200 OK` counts as success. Redirects are not followed: a trusted
//! certificate URL that answers with a 3xx is a failure, never a hop to
//! another host.

use std::io::Read;
use std::time::Duration;

use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::CertificateFetcher;
use crate::error::{ConfigError, FetchError};

/// User agent sent with every certificate request.
pub const FETCHER_USER_AGENT: &str = concat!("sns-verify/", env!("CARGO_PKG_VERSION"));

/// HTTP fetcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpFetcherConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Largest accepted certificate response, in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// Base delay for exponential backoff, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

fn default_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_max_bytes() -> u64 {
    64 * 1024
}

fn default_backoff_base_ms() -> u64 {
    200
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            max_bytes: default_max_bytes(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

impl HttpFetcherConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `SNS_VERIFY_CERT_TIMEOUT` | Request timeout in seconds (default: 10) |
    /// | `SNS_VERIFY_CERT_MAX_RETRIES` | Retries for transient failures (default: 2) |
    /// | `SNS_VERIFY_CERT_MAX_BYTES` | Response size limit (default: 65536) |
    pub fn from_env() -> Self {
        Self {
            timeout_secs: env_parse("SNS_VERIFY_CERT_TIMEOUT").unwrap_or_else(default_timeout),
            max_retries: env_parse("SNS_VERIFY_CERT_MAX_RETRIES")
                .unwrap_or_else(default_max_retries),
            max_bytes: env_parse("SNS_VERIFY_CERT_MAX_BYTES").unwrap_or_else(default_max_bytes),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Certificate fetcher over HTTPS using a blocking reqwest client.
///
/// The blocking client runs its own runtime; do not call it from inside an
/// async task without `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct HttpCertificateFetcher {
    client: Client,
    config: HttpFetcherConfig,
}

impl HttpCertificateFetcher {
    /// Build the client. A zero timeout is raised to one second.
    pub fn new(mut config: HttpFetcherConfig) -> Result<Self, ConfigError> {
        config.timeout_secs = config.timeout_secs.max(1);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(FETCHER_USER_AGENT));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .default_headers(default_headers)
            .build()
            .map_err(|e| ConfigError::HttpClient {
                message: e.to_string(),
            })?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(HttpFetcherConfig::from_env())
    }

    pub fn config(&self) -> &HttpFetcherConfig {
        &self.config
    }

    fn fetch_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().map_err(|e| self.map_error(e))?;
        let status = response.status();

        if status != StatusCode::OK {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let limit = self.config.max_bytes;
        if let Some(size) = response.content_length() {
            if size > limit {
                return Err(FetchError::TooLarge { size, limit });
            }
        }

        // Content-Length is absent for chunked responses; never read past the limit.
        let mut body = Vec::new();
        response
            .take(limit.saturating_add(1))
            .read_to_end(&mut body)
            .map_err(|e| self.map_io_error(e))?;
        let size = body.len() as u64;
        if size > limit {
            return Err(FetchError::TooLarge { size, limit });
        }

        Ok(body)
    }

    fn map_io_error(&self, err: std::io::Error) -> FetchError {
        if err.kind() == std::io::ErrorKind::TimedOut {
            FetchError::Timeout(Duration::from_secs(self.config.timeout_secs))
        } else {
            FetchError::Network {
                message: err.to_string(),
            }
        }
    }

    fn map_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(Duration::from_secs(self.config.timeout_secs))
        } else {
            err.into()
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = self.config.backoff_base_ms.max(1);
        let capped_ms = base_ms
            .saturating_mul(1 << attempt.min(10))
            .min(Duration::from_secs(30).as_millis() as u64);
        let jittered_ms = rand::thread_rng().gen_range(capped_ms / 2..=capped_ms);
        Duration::from_millis(jittered_ms.max(1))
    }
}

impl CertificateFetcher for HttpCertificateFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let max_retries = self.config.max_retries;
        let mut retries = 0;

        loop {
            debug!(url, attempt = retries + 1, "fetching signing certificate");

            match self.fetch_once(url) {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_retryable() && retries < max_retries => {
                    retries += 1;
                    let backoff = self.backoff(retries);

                    warn!(
                        url,
                        error = %e,
                        retry = retries,
                        max_retries = max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying certificate fetch"
                    );

                    std::thread::sleep(backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpFetcherConfig::default();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.max_bytes, 65536);
    }

    #[test]
    fn test_config_deserialize_fills_defaults() {
        let config: HttpFetcherConfig = serde_json::from_str(r#"{"max_retries": 0}"#).unwrap();
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.backoff_base_ms, 200);
    }

    #[test]
    fn test_builders() {
        let config = HttpFetcherConfig::default()
            .with_timeout(Duration::from_millis(10))
            .with_max_retries(5)
            .with_max_bytes(10)
            .with_backoff_base(Duration::from_millis(3));
        assert_eq!(config.timeout_secs, 1);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.max_bytes, 10);
        assert_eq!(config.backoff_base_ms, 3);
    }

    #[test]
    fn test_zero_timeout_is_raised() {
        let config = HttpFetcherConfig {
            timeout_secs: 0,
            ..HttpFetcherConfig::default()
        };
        let fetcher = HttpCertificateFetcher::new(config).unwrap();
        assert_eq!(fetcher.config().timeout_secs, 1);
    }

    #[test]
    fn test_backoff_base_saturates() {
        let config = HttpFetcherConfig::default().with_backoff_base(Duration::MAX);
        assert_eq!(config.backoff_base_ms, u64::MAX);

        let fetcher = HttpCertificateFetcher::new(config).unwrap();
        assert!(fetcher.backoff(3) <= Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_is_bounded() {
        let fetcher = HttpCertificateFetcher::new(HttpFetcherConfig::default()).unwrap();
        for attempt in 1..=40 {
            let backoff = fetcher.backoff(attempt);
            assert!(backoff >= Duration::from_millis(1));
            assert!(backoff <= Duration::from_secs(30));
        }
    }

    #[test]
    fn test_user_agent() {
        assert!(FETCHER_USER_AGENT.starts_with("sns-verify/"));
    }
}
