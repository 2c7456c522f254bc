//! SNS message validator.
//!
//! # Verification Steps
//!
//! 1. Resolve `SignatureVersion` to a digest (before any network call)
//! 2. Check `SigningCertURL` against the trust policy (before any network call)
//! 3. Fetch the certificate
//! 4. Extract the RSA public key
//! 5. Build the signing string and decode `Signature`
//! 6. Verify the signature with the selected digest
//!
//! Each step fails with its own [`VerifyError`] variant. The validator keeps
//! no state between calls and never caches certificates; wrap the fetcher in
//! a [`CachingFetcher`](crate::fetch::CachingFetcher) for that.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::certificate::public_key_from_pem;
use crate::envelope::Envelope;
use crate::error::{ConfigError, VerifyError, VerifyResult};
use crate::fetch::CertificateFetcher;
use crate::signature::{decode_signature, verify_pkcs1v15, SignatureVersion};
use crate::trust::CertUrlPolicy;

/// Validator settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Override for the trusted certificate host pattern.
    ///
    /// `None` uses [`DEFAULT_CERT_HOST_PATTERN`](crate::trust::DEFAULT_CERT_HOST_PATTERN).
    #[serde(default)]
    pub cert_host_pattern: Option<String>,
}

impl ValidatorConfig {
    pub fn with_cert_host_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.cert_host_pattern = Some(pattern.into());
        self
    }
}

/// Verifies that messages were signed by SNS.
#[derive(Debug, Clone)]
pub struct MessageValidator<F> {
    fetcher: F,
    policy: CertUrlPolicy,
}

impl<F: CertificateFetcher> MessageValidator<F> {
    /// Validator with the default trusted host pattern.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            policy: CertUrlPolicy::new(),
        }
    }

    /// Validator with explicit settings. The host pattern is compiled here,
    /// once.
    pub fn with_config(fetcher: F, config: ValidatorConfig) -> Result<Self, ConfigError> {
        let policy = match config.cert_host_pattern.as_deref() {
            Some(pattern) => CertUrlPolicy::with_host_pattern(pattern)?,
            None => CertUrlPolicy::new(),
        };
        Ok(Self { fetcher, policy })
    }

    pub fn policy(&self) -> &CertUrlPolicy {
        &self.policy
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Validate a message, reporting which check failed.
    pub fn validate(&self, envelope: &Envelope) -> VerifyResult<()> {
        // 1. Signature version
        let version = SignatureVersion::parse(envelope.signature_version())?;

        // 2. Certificate URL trust, before anything touches the network
        let raw_url = envelope.signing_cert_url().unwrap_or_default();
        let cert_url = match self.policy.check(raw_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = raw_url, "rejected untrusted signing certificate URL");
                return Err(e);
            }
        };

        // 3. Certificate retrieval, from the normalized URL the policy accepted
        let cert_url = cert_url.as_str();
        debug!(url = cert_url, "retrieving signing certificate");
        let pem = self
            .fetcher
            .fetch(cert_url)
            .map_err(|e| VerifyError::CertificateUnavailable {
                url: cert_url.to_string(),
                reason: e.to_string(),
            })?;

        // 4. Public key
        let key = public_key_from_pem(cert_url, &pem)?;

        // 5. Signing string and signature bytes
        let string_to_sign = envelope.string_to_sign();
        let signature = decode_signature(envelope.signature().unwrap_or_default())?;

        // 6. Cryptographic check
        verify_pkcs1v15(&key, version, string_to_sign.as_bytes(), &signature)?;

        debug!(
            message_id = envelope.message_id().unwrap_or_default(),
            message_type = %envelope.message_type(),
            digest = version.digest_name(),
            "message signature verified"
        );
        Ok(())
    }

    /// Whether a message is authentic. Never panics or errors on a bad message.
    pub fn is_valid(&self, envelope: &Envelope) -> bool {
        match self.validate(envelope) {
            Ok(()) => true,
            Err(e) => {
                debug!(
                    kind = e.kind(),
                    error = %e,
                    message_id = envelope.message_id().unwrap_or_default(),
                    "message failed validation"
                );
                false
            }
        }
    }
}

#[cfg(feature = "http")]
impl MessageValidator<crate::fetch::HttpCertificateFetcher> {
    /// Validator over the bundled HTTP fetcher, configured from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(crate::fetch::HttpCertificateFetcher::from_env()?))
    }
}
