//! Signature verification for SNS HTTP(S) push notifications.
//!
//! This crate proves that a notification was produced by SNS and not forged
//! by someone who can reach your endpoint:
//!
//! - Typed, validated message envelope with the canonical signing string
//! - Certificate URL trust policy (checked before any network call)
//! - Pluggable certificate fetcher, with a blocking HTTP implementation and
//!   an in-memory caching wrapper
//! - RSA verification with SHA-1 (`SignatureVersion` 1) or SHA-256 (2)
//!
//! # Quick Start
//!
//! ```no_run
//! use sns_verify::{Envelope, HttpCertificateFetcher, HttpFetcherConfig, MessageValidator};
//!
//! # fn example(body: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpCertificateFetcher::new(HttpFetcherConfig::default())?;
//! let validator = MessageValidator::new(fetcher);
//!
//! // JSON decoding of the POST body is up to the caller.
//! let envelope: Envelope = serde_json::from_str(body)?;
//! validator.validate(&envelope)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! The validator itself takes one knob, the trusted certificate host pattern
//! ([`ValidatorConfig`]). The bundled HTTP fetcher reads:
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `SNS_VERIFY_CERT_TIMEOUT` | Request timeout in seconds (default: 10) |
//! | `SNS_VERIFY_CERT_MAX_RETRIES` | Retries for transient failures (default: 2) |
//! | `SNS_VERIFY_CERT_MAX_BYTES` | Certificate response size limit (default: 65536) |

pub mod certificate;
pub mod envelope;
pub mod error;
pub mod fetch;
pub mod signature;
pub mod trust;
pub mod validator;

// Re-export main types
pub use envelope::{Envelope, MessageType, SIGNABLE_KEYS};
pub use error::{ConfigError, FetchError, VerifyError, VerifyResult};
pub use fetch::{fetcher_fn, CacheConfig, CachingFetcher, CertificateFetcher, FnFetcher};
#[cfg(feature = "http")]
pub use fetch::{HttpCertificateFetcher, HttpFetcherConfig, FETCHER_USER_AGENT};
pub use signature::SignatureVersion;
pub use trust::{CertUrlPolicy, DEFAULT_CERT_HOST_PATTERN};
pub use validator::{MessageValidator, ValidatorConfig};
