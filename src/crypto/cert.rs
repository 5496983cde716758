use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use rcgen::{Certificate, CertificateParams};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Self-signed identity presented during DTLS handshakes, together with the
/// sha-256 fingerprint advertised in SDP answers. WebRTC peers authenticate
/// each other through the fingerprint, not a certificate chain, so the
/// certificate itself is throwaway: ECDSA P-256, generated at startup.
pub(crate) struct DtlsIdentity {
    pub(crate) x509: X509,
    pub(crate) pkey: PKey<Private>,
    pub(crate) fingerprint: String,
}

pub(crate) fn generate_identity() -> Result<DtlsIdentity> {
    let mut params = CertificateParams::new(vec!["tinyrtc".to_owned()]);
    params.alg = &rcgen::PKCS_ECDSA_P256_SHA256;
    let cert = Certificate::from_params(params)?;

    let der = cert.serialize_der()?;
    let fingerprint = fingerprint_sha256(&der);
    let x509 = X509::from_der(&der)?;
    let pkey = PKey::private_key_from_der(&cert.serialize_private_key_der())?;

    Ok(DtlsIdentity {
        x509,
        pkey,
        fingerprint,
    })
}

/// Lowercase, colon-separated sha-256 digest of the DER encoding, the form
/// `a=fingerprint:sha-256` expects.
fn fingerprint_sha256(der: &[u8]) -> String {
    let digest = Sha256::digest(der);
    digest
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<String>>()
        .join(":")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_generate_identity() {
        let identity = generate_identity().unwrap();
        // 32 bytes as hex pairs joined by colons
        assert_eq!(identity.fingerprint.len(), 32 * 3 - 1);
        assert!(identity
            .fingerprint
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase() || c == ':'));
        assert!(identity.x509.public_key().is_ok());
    }

    #[test]
    fn test_fingerprint_format() {
        assert_eq!(
            fingerprint_sha256(b"test"),
            "9f:86:d0:81:88:4c:7d:65:9a:2f:ea:a0:c5:5a:d0:15:a3:bf:4f:1b:2b:0b:82:2c:d1:5d:6c:15:b0:f0:0a:08"
        );
    }
}
