//! Error types for message verification.

use std::time::Duration;

/// Verification errors.
///
/// Every variant is a terminal outcome of a single `validate` call. None of
/// them is retried or recovered inside the validator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Envelope is missing `Type` or a field required for its type.
    #[error("invalid message: {message}")]
    Validation { message: String },

    /// `SignatureVersion` is absent or not one of the supported versions.
    #[error("unsupported signature version: {version:?}")]
    UnsupportedSignatureVersion { version: String },

    /// Signing certificate URL failed the scheme, extension or host checks.
    #[error("certificate is located on an untrusted source: {url}")]
    UntrustedCertificateSource { url: String },

    /// Certificate could not be retrieved, or the response held no certificate.
    #[error("signing certificate unavailable from {url}: {reason}")]
    CertificateUnavailable { url: String, reason: String },

    /// Fetched bytes are not a usable X.509 certificate.
    #[error("invalid signing certificate: {reason}")]
    InvalidCertificate { reason: String },

    /// `Signature` field is not valid base64.
    #[error("invalid signature encoding: {reason}")]
    InvalidSignatureEncoding { reason: String },

    /// Cryptographic verification failed.
    #[error("message signature is invalid")]
    SignatureMismatch,
}

impl VerifyError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::UnsupportedSignatureVersion { .. } => "unsupported_signature_version",
            Self::UntrustedCertificateSource { .. } => "untrusted_certificate_source",
            Self::CertificateUnavailable { .. } => "certificate_unavailable",
            Self::InvalidCertificate { .. } => "invalid_certificate",
            Self::InvalidSignatureEncoding { .. } => "invalid_signature_encoding",
            Self::SignatureMismatch => "signature_mismatch",
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Result type for verification operations.
pub type VerifyResult<T> = Result<T, VerifyError>;

/// Failure reported by a certificate fetcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, connection reset).
    #[error("network error: {message}")]
    Network { message: String },

    /// Server answered with anything other than 200.
    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    /// Request did not complete in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Response body exceeded the configured limit.
    #[error("response too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    /// Fetch was abandoned by the caller.
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether a fetcher may retry after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout(_) => true,
            Self::Status { status } => *status == 429 || (500..=599).contains(status),
            Self::TooLarge { .. } | Self::Cancelled => false,
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::Status {
                status: status.as_u16(),
            };
        }
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Construction-time configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Trusted host pattern is not a valid regular expression.
    #[error("invalid trusted host pattern {pattern:?}: {source}")]
    InvalidTrustPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// HTTP client could not be built.
    #[error("failed to create HTTP client: {message}")]
    HttpClient { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels_are_distinct() {
        let errors = [
            VerifyError::validation("x"),
            VerifyError::UnsupportedSignatureVersion {
                version: "3".into(),
            },
            VerifyError::UntrustedCertificateSource { url: "u".into() },
            VerifyError::CertificateUnavailable {
                url: "u".into(),
                reason: "r".into(),
            },
            VerifyError::InvalidCertificate { reason: "r".into() },
            VerifyError::InvalidSignatureEncoding { reason: "r".into() },
            VerifyError::SignatureMismatch,
        ];

        let mut kinds: Vec<_> = errors.iter().map(VerifyError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_fetch_error_retryable() {
        assert!(FetchError::Network {
            message: "reset".into()
        }
        .is_retryable());
        assert!(FetchError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(FetchError::Status { status: 503 }.is_retryable());
        assert!(FetchError::Status { status: 429 }.is_retryable());

        assert!(!FetchError::Status { status: 404 }.is_retryable());
        assert!(!FetchError::Status { status: 301 }.is_retryable());
        assert!(!FetchError::Cancelled.is_retryable());
        assert!(!FetchError::TooLarge { size: 2, limit: 1 }.is_retryable());
    }
}
