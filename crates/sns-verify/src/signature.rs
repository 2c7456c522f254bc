//! Signature version selection and RSA verification.
//!
//! SNS signs the canonical string with RSASSA-PKCS1-v1_5. The digest is
//! chosen by the message's `SignatureVersion`:
//!
//! | Version | Digest  |
//! |---------|---------|
//! | `1`     | SHA-1   |
//! | `2`     | SHA-256 |

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha1::Sha1;
use sha2::Sha256;

use crate::error::{VerifyError, VerifyResult};

/// Supported signature versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureVersion {
    /// RSA with SHA-1.
    V1,
    /// RSA with SHA-256.
    V2,
}

impl SignatureVersion {
    /// Resolve the `SignatureVersion` field. Absent is unsupported.
    pub fn parse(value: Option<&str>) -> VerifyResult<Self> {
        match value {
            Some("1") => Ok(Self::V1),
            Some("2") => Ok(Self::V2),
            other => Err(VerifyError::UnsupportedSignatureVersion {
                version: other.unwrap_or_default().to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "1",
            Self::V2 => "2",
        }
    }

    /// Digest name, for logs.
    pub fn digest_name(&self) -> &'static str {
        match self {
            Self::V1 => "sha1",
            Self::V2 => "sha256",
        }
    }
}

impl fmt::Display for SignatureVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode the base64 `Signature` field.
pub fn decode_signature(signature_b64: &str) -> VerifyResult<Vec<u8>> {
    BASE64
        .decode(signature_b64)
        .map_err(|e| VerifyError::InvalidSignatureEncoding {
            reason: format!("invalid base64 signature: {}", e),
        })
}

/// Verify an RSASSA-PKCS1-v1_5 signature over `message`.
pub fn verify_pkcs1v15(
    key: &RsaPublicKey,
    version: SignatureVersion,
    message: &[u8],
    signature: &[u8],
) -> VerifyResult<()> {
    let signature = Signature::try_from(signature).map_err(|_| VerifyError::SignatureMismatch)?;

    let verified = match version {
        SignatureVersion::V1 => VerifyingKey::<Sha1>::new(key.clone()).verify(message, &signature),
        SignatureVersion::V2 => {
            VerifyingKey::<Sha256>::new(key.clone()).verify(message, &signature)
        }
    };

    verified.map_err(|_| VerifyError::SignatureMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported_versions() {
        assert_eq!(SignatureVersion::parse(Some("1")), Ok(SignatureVersion::V1));
        assert_eq!(SignatureVersion::parse(Some("2")), Ok(SignatureVersion::V2));
    }

    #[test]
    fn test_parse_rejects_everything_else() {
        for version in ["0", "3", "", " 1", "1 ", "01", "v1", "1.0", "SHA256"] {
            assert_eq!(
                SignatureVersion::parse(Some(version)),
                Err(VerifyError::UnsupportedSignatureVersion {
                    version: version.to_string()
                }),
                "version {version:?} must be rejected"
            );
        }
    }

    #[test]
    fn test_parse_absent_fails_closed() {
        assert!(matches!(
            SignatureVersion::parse(None),
            Err(VerifyError::UnsupportedSignatureVersion { .. })
        ));
    }

    #[test]
    fn test_decode_signature() {
        assert_eq!(decode_signature("c2ln").unwrap(), b"sig");
        assert!(matches!(
            decode_signature("not base64!"),
            Err(VerifyError::InvalidSignatureEncoding { .. })
        ));
        // URL-safe alphabet is not the SNS encoding.
        assert!(decode_signature("-_-_").is_err());
    }
}
