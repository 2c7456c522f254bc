//! Signing certificate parsing.
//!
//! The fetched document must be a PEM-encoded X.509 certificate carrying an
//! RSA public key. Chain building and expiry are not checked here: trust is
//! established by the URL policy, not by the certificate contents.

use rsa::pkcs8::DecodePublicKey as _;
use rsa::RsaPublicKey;
use tracing::debug;
use x509_parser::pem::parse_x509_pem;

use crate::error::{VerifyError, VerifyResult};

const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Extract the RSA public key from fetched certificate bytes.
///
/// `url` is only used for error context.
pub fn public_key_from_pem(url: &str, pem_bytes: &[u8]) -> VerifyResult<RsaPublicKey> {
    if pem_bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(VerifyError::CertificateUnavailable {
            url: url.to_string(),
            reason: "empty certificate response".to_string(),
        });
    }

    let (_, pem) = parse_x509_pem(pem_bytes).map_err(|e| VerifyError::CertificateUnavailable {
        url: url.to_string(),
        reason: format!("response is not PEM: {}", e),
    })?;

    if pem.label != CERTIFICATE_LABEL {
        return Err(VerifyError::InvalidCertificate {
            reason: format!("unexpected PEM label {:?}", pem.label),
        });
    }

    let cert = pem
        .parse_x509()
        .map_err(|e| VerifyError::InvalidCertificate {
            reason: format!("invalid X.509 certificate: {}", e),
        })?;

    let spki = cert.public_key();
    debug!(
        subject = %cert.subject(),
        algorithm = %spki.algorithm.algorithm,
        "parsed signing certificate"
    );

    RsaPublicKey::from_public_key_der(spki.raw).map_err(|e| VerifyError::InvalidCertificate {
        reason: format!("certificate does not carry an RSA public key: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::traits::PublicKeyParts;

    const URL: &str = "https://sns.foo.amazonaws.com/bar.pem";

    const SIGNING_CERT: &str = include_str!("../tests/fixtures/signing-cert.pem");
    const EC_CERT: &str = include_str!("../tests/fixtures/ec-cert.pem");

    #[test]
    fn test_extracts_rsa_key() {
        let key = public_key_from_pem(URL, SIGNING_CERT.as_bytes()).unwrap();
        assert_eq!(key.size(), 256);
    }

    #[test]
    fn test_empty_is_unavailable() {
        for body in [&b""[..], &b"  \n"[..]] {
            assert!(matches!(
                public_key_from_pem(URL, body),
                Err(VerifyError::CertificateUnavailable { .. })
            ));
        }
    }

    #[test]
    fn test_non_pem_is_unavailable() {
        let html = b"<html><body>Access Denied</body></html>";
        assert!(matches!(
            public_key_from_pem(URL, html),
            Err(VerifyError::CertificateUnavailable { .. })
        ));
    }

    #[test]
    fn test_corrupt_der_is_invalid() {
        let pem = "-----BEGIN CERTIFICATE-----\nAAECAwQFBgcICQ==\n-----END CERTIFICATE-----\n";
        assert!(matches!(
            public_key_from_pem(URL, pem.as_bytes()),
            Err(VerifyError::InvalidCertificate { .. })
        ));
    }

    #[test]
    fn test_wrong_label_is_invalid() {
        let pem = SIGNING_CERT.replace("CERTIFICATE", "PUBLIC KEY");
        assert!(matches!(
            public_key_from_pem(URL, pem.as_bytes()),
            Err(VerifyError::InvalidCertificate { .. })
        ));
    }

    #[test]
    fn test_ec_key_is_invalid() {
        assert!(matches!(
            public_key_from_pem(URL, EC_CERT.as_bytes()),
            Err(VerifyError::InvalidCertificate { .. })
        ));
    }
}
