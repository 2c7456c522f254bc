//! Trust policy for signing certificate URLs.
//!
//! A certificate is only ever fetched from a URL that:
//! - uses the `https` scheme (exact, lowercase),
//! - has a path ending in `.pem`,
//! - has a host matching the trusted host pattern.
//!
//! The host check is what keeps certificates hosted on other services under
//! `amazonaws.com` (S3 buckets, for example) from being accepted.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::{ConfigError, VerifyError, VerifyResult};

/// Default trusted host pattern (SNS endpoints, including China regions).
pub const DEFAULT_CERT_HOST_PATTERN: &str = r"^sns\.[a-zA-Z0-9\-]{3,}\.amazonaws\.com(\.cn)?$";

const REQUIRED_SCHEME_PREFIX: &str = "https://";
const REQUIRED_EXTENSION: &str = ".pem";

static DEFAULT_HOST_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_CERT_HOST_PATTERN).unwrap());

/// Compiled certificate URL policy.
#[derive(Debug, Clone)]
pub struct CertUrlPolicy {
    host_pattern: Regex,
}

impl CertUrlPolicy {
    /// Policy with [`DEFAULT_CERT_HOST_PATTERN`].
    pub fn new() -> Self {
        Self {
            host_pattern: DEFAULT_HOST_REGEX.clone(),
        }
    }

    /// Policy with a custom host pattern.
    ///
    /// The pattern always has to match the whole host; it is wrapped in
    /// `^(?:...)$` before compiling.
    pub fn with_host_pattern(pattern: &str) -> Result<Self, ConfigError> {
        let anchored = format!("^(?:{pattern})$");
        let host_pattern =
            Regex::new(&anchored).map_err(|source| ConfigError::InvalidTrustPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self { host_pattern })
    }

    pub fn host_pattern(&self) -> &str {
        self.host_pattern.as_str()
    }

    /// Check a certificate URL, returning it parsed when trusted.
    pub fn check(&self, raw: &str) -> VerifyResult<Url> {
        let untrusted = || VerifyError::UntrustedCertificateSource {
            url: raw.to_string(),
        };

        // Url normalizes scheme case, so check the raw text first.
        if !raw.starts_with(REQUIRED_SCHEME_PREFIX) {
            return Err(untrusted());
        }

        let url = Url::parse(raw).map_err(|_| untrusted())?;
        if url.scheme() != "https" || !url.path().ends_with(REQUIRED_EXTENSION) {
            return Err(untrusted());
        }

        match url.host_str() {
            Some(host) if self.host_pattern.is_match(host) => Ok(url),
            _ => Err(untrusted()),
        }
    }

    pub fn is_trusted(&self, raw: &str) -> bool {
        self.check(raw).is_ok()
    }
}

impl Default for CertUrlPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_sns_hosts() {
        let policy = CertUrlPolicy::new();
        for url in [
            "https://sns.foo.amazonaws.com/bar.pem",
            "https://sns.us-west-2.amazonaws.com/SimpleNotificationService-b95095beb82e8f6a046b3aafc7f4149a.pem",
            "https://sns.cn-north-1.amazonaws.com.cn/SimpleNotificationService-abc.pem",
            "https://sns.us-gov-west-1.amazonaws.com/cert.pem",
        ] {
            assert!(policy.is_trusted(url), "{url} should be trusted");
        }
    }

    #[test]
    fn test_rejects_wrong_scheme() {
        let policy = CertUrlPolicy::new();
        for url in [
            "http://sns.foo.amazonaws.com/bar.pem",
            "HTTPS://sns.foo.amazonaws.com/bar.pem",
            "Https://sns.foo.amazonaws.com/bar.pem",
            "ftp://sns.foo.amazonaws.com/bar.pem",
            "//sns.foo.amazonaws.com/bar.pem",
            "sns.foo.amazonaws.com/bar.pem",
        ] {
            assert!(!policy.is_trusted(url), "{url} should be rejected");
        }
    }

    #[test]
    fn test_rejects_non_pem_paths() {
        let policy = CertUrlPolicy::new();
        for url in [
            "https://sns.foo.amazonaws.com/bar",
            "https://sns.foo.amazonaws.com/bar.pem.txt",
            "https://sns.foo.amazonaws.com/bar.crt",
            "https://sns.foo.amazonaws.com/",
            "https://sns.foo.amazonaws.com/bar?x=.pem",
        ] {
            assert!(!policy.is_trusted(url), "{url} should be rejected");
        }
    }

    #[test]
    fn test_rejects_untrusted_hosts() {
        let policy = CertUrlPolicy::new();
        for url in [
            "https://foo.amazonaws.com/bar.pem",
            "https://evil.amazonaws.com/x.pem",
            "https://sns.evil.amazonaws.com.attacker.net/x.pem",
            "https://my-bucket.s3.amazonaws.com/sns.foo.amazonaws.com/x.pem",
            "https://s3.amazonaws.com/sns.us-east-1.amazonaws.com/x.pem",
            "https://sns.ab.amazonaws.com/x.pem",
            "https://sns.foo.amazonaws.com.cn.evil.com/x.pem",
            "https://sns.foo.amazonaws.com@evil.com/x.pem",
            "https://xsns.foo.amazonaws.com/x.pem",
            "https://sns.f_o.amazonaws.com/x.pem",
            "https://sns.foo.bar.amazonaws.com/x.pem",
        ] {
            assert!(!policy.is_trusted(url), "{url} should be rejected");
        }
    }

    #[test]
    fn test_rejects_garbage() {
        let policy = CertUrlPolicy::new();
        for url in ["", "https://", "https:///x.pem", "not a url"] {
            assert!(matches!(
                policy.check(url),
                Err(VerifyError::UntrustedCertificateSource { .. })
            ));
        }
    }

    #[test]
    fn test_custom_pattern() {
        let policy = CertUrlPolicy::with_host_pattern(r"certs\.example\.internal").unwrap();
        assert!(policy.is_trusted("https://certs.example.internal/signing.pem"));
        assert!(!policy.is_trusted("https://sns.foo.amazonaws.com/bar.pem"));
    }

    #[test]
    fn test_custom_pattern_is_anchored() {
        let policy = CertUrlPolicy::with_host_pattern(r"example\.com").unwrap();
        assert!(policy.is_trusted("https://example.com/a.pem"));
        assert!(!policy.is_trusted("https://example.com.evil.net/a.pem"));
        assert!(!policy.is_trusted("https://evilexample.com/a.pem"));
    }

    #[test]
    fn test_invalid_pattern_rejected_at_construction() {
        let err = CertUrlPolicy::with_host_pattern("sns\\.(").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTrustPattern { .. }));
    }
}
