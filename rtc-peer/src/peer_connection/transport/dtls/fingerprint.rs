use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

use shared::error::{Error, Result};

pub(crate) const DEFAULT_FINGERPRINT_ALGORITHM: &str = "sha-256";

/// DTLSFingerprint specifies the hash function algorithm and certificate
/// fingerprint as described in <https://tools.ietf.org/html/rfc4572>.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCDtlsFingerprint {
    /// Algorithm specifies one of the the hash function algorithms defined in
    /// the 'Hash function Textual Names' registry.
    pub algorithm: String,

    /// Value specifies the value of the certificate fingerprint in lowercase
    /// hex string as expressed utilizing the syntax of 'fingerprint' in
    /// <https://tools.ietf.org/html/rfc4572#section-5>.
    pub value: String,
}

impl RTCDtlsFingerprint {
    /// parse splits an SDP `a=fingerprint` value into algorithm and value.
    pub(crate) fn parse(attribute_value: &str) -> Result<Self> {
        let parts: Vec<&str> = attribute_value.split_whitespace().collect();
        if parts.len() != 2 {
            return Err(Error::ErrSessionDescriptionInvalidFingerprint);
        }
        Ok(RTCDtlsFingerprint {
            algorithm: parts[0].to_lowercase(),
            value: parts[1].to_lowercase(),
        })
    }

    /// matches hashes `certificate` with this fingerprint's algorithm and
    /// compares the result, ignoring hex case.
    pub(crate) fn matches(&self, certificate: &[u8]) -> Result<bool> {
        let computed = fingerprint_value(&self.algorithm, certificate)?;
        Ok(computed.eq_ignore_ascii_case(&self.value))
    }
}

/// fingerprint_value hashes a DER certificate and renders it as lowercase
/// colon separated hex.
pub(crate) fn fingerprint_value(algorithm: &str, certificate: &[u8]) -> Result<String> {
    let digest = match algorithm.to_lowercase().as_str() {
        "sha-256" => Sha256::digest(certificate).to_vec(),
        "sha-384" => Sha384::digest(certificate).to_vec(),
        "sha-512" => Sha512::digest(certificate).to_vec(),
        _ => return Err(Error::ErrUnsupportedFingerprintAlgorithm),
    };

    Ok(digest
        .iter()
        .map(|b| hex::encode([*b]))
        .collect::<Vec<String>>()
        .join(":"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fingerprint_value() -> Result<()> {
        let der = b"not really a certificate";

        let tests = vec![("sha-256", 32), ("SHA-384", 48), ("sha-512", 64)];
        for (algorithm, len) in tests {
            let value = fingerprint_value(algorithm, der)?;
            assert_eq!(value.split(':').count(), len, "{algorithm}");
            assert!(value.chars().all(|c| c == ':' || c.is_ascii_hexdigit()));
            assert_eq!(value, value.to_lowercase());
        }

        assert_eq!(
            fingerprint_value("md5", der),
            Err(Error::ErrUnsupportedFingerprintAlgorithm)
        );
        Ok(())
    }

    #[test]
    fn test_fingerprint_parse_and_match() -> Result<()> {
        let der = [1u8, 2, 3, 4];
        let value = fingerprint_value("sha-256", &der)?;

        let fp = RTCDtlsFingerprint::parse(&format!("SHA-256 {}", value.to_uppercase()))?;
        assert_eq!(fp.algorithm, "sha-256");
        assert!(fp.matches(&der)?);
        assert!(!fp.matches(&[4u8, 3, 2, 1])?);

        assert_eq!(
            RTCDtlsFingerprint::parse("sha-256"),
            Err(Error::ErrSessionDescriptionInvalidFingerprint)
        );
        Ok(())
    }
}
