//! Self-signed X.509 certificates used for the DTLS handshake.
//!
//! A PeerConnection advertises the SHA-256 fingerprint of its certificate
//! in SDP; the remote side checks it against the certificate presented in
//! the handshake.

use std::ops::Add;
use std::time::{Duration, SystemTime};

use rcgen::{CertificateParams, KeyPair};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, Ed25519KeyPair};

use crate::peer_connection::transport::dtls::fingerprint::{
    fingerprint_value, RTCDtlsFingerprint, DEFAULT_FINGERPRINT_ALGORITHM,
};
use shared::error::{Error, Result};
use shared::util::math_rand_alpha;

/// Key algorithm of a certificate's private key.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CertificateKeyKind {
    EcdsaP256,
    Ed25519,
}

/// The private key and certificate chain handed to the DTLS handshaker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DtlsCertificate {
    /// DER encoded certificates, leaf first.
    pub certificate: Vec<Vec<u8>>,
    /// PKCS#8 DER encoded private key.
    pub private_key: Vec<u8>,
    pub key_kind: CertificateKeyKind,
}

/// Certificate represents a x509Cert used to authenticate WebRTC communications.
#[derive(Clone, Debug)]
pub struct RTCCertificate {
    pub(crate) dtls_certificate: DtlsCertificate,
    pub(crate) expires: SystemTime,
}

impl PartialEq for RTCCertificate {
    fn eq(&self, other: &Self) -> bool {
        self.dtls_certificate == other.dtls_certificate
    }
}

impl RTCCertificate {
    /// Generates a new certificate with default [`CertificateParams`] using the
    /// given keypair.
    pub fn from_params(params: CertificateParams, key_pair: KeyPair) -> Result<Self> {
        let key_kind = key_kind_of(&key_pair)?;
        let not_after = params.not_after;

        let x509_cert = params.self_signed(&key_pair)?;
        let private_key = key_pair.serialize_der();
        validate_private_key(key_kind, &private_key)?;

        let expires = if cfg!(target_arch = "arm") {
            // adding the rcgen default validity to now overflows on armv7
            SystemTime::now().add(Duration::from_secs(172800))
        } else {
            not_after.into()
        };

        Ok(Self {
            dtls_certificate: DtlsCertificate {
                certificate: vec![x509_cert.der().to_vec()],
                private_key,
                key_kind,
            },
            expires,
        })
    }

    /// Generates a new certificate with a random common name. ECDSA P-256 and
    /// Ed25519 key pairs are supported.
    pub fn from_key_pair(key_pair: KeyPair) -> Result<Self> {
        RTCCertificate::from_params(CertificateParams::new(vec![math_rand_alpha(16)])?, key_pair)
    }

    /// generate creates a certificate with a fresh ECDSA P-256 key.
    pub fn generate() -> Result<Self> {
        let key_pair = KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)?;
        RTCCertificate::from_key_pair(key_pair)
    }

    /// from_existing wraps an already generated chain and key.
    pub fn from_existing(dtls_certificate: DtlsCertificate, expires: SystemTime) -> Self {
        Self {
            dtls_certificate,
            expires,
        }
    }

    /// Parses a certificate from the format produced by
    /// [`RTCCertificate::serialize_pem`].
    #[cfg(feature = "pem")]
    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let blocks = pem::parse_many(pem_str).map_err(|_| Error::ErrCertificatePEMFormatError)?;

        let mut expires = None;
        let mut private_key = None;
        let mut certificate = vec![];
        for block in blocks {
            match block.tag() {
                "EXPIRES" => {
                    let contents = block.contents();
                    if contents.len() < 8 {
                        return Err(Error::ErrCertificatePEMFormatError);
                    }
                    let mut bytes = [0u8; 8];
                    bytes.copy_from_slice(&contents[..8]);
                    expires = SystemTime::UNIX_EPOCH
                        .checked_add(Duration::from_secs(u64::from_le_bytes(bytes)));
                }
                "PRIVATE KEY" => private_key = Some(block.contents().to_vec()),
                "CERTIFICATE" => certificate.push(block.contents().to_vec()),
                _ => return Err(Error::ErrCertificatePEMFormatError),
            }
        }

        let (expires, private_key) = match (expires, private_key) {
            (Some(expires), Some(private_key)) if !certificate.is_empty() => {
                (expires, private_key)
            }
            _ => return Err(Error::ErrCertificatePEMFormatError),
        };

        let key_pair = KeyPair::try_from(private_key.as_slice())?;
        let key_kind = key_kind_of(&key_pair)?;

        Ok(RTCCertificate::from_existing(
            DtlsCertificate {
                certificate,
                private_key,
                key_kind,
            },
            expires,
        ))
    }

    /// Serializes the certificate (including the private key) in PKCS#8 format
    /// in PEM, preceded by an `EXPIRES` block.
    #[cfg(feature = "pem")]
    pub fn serialize_pem(&self) -> String {
        let expires = self
            .expires
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let mut blocks = vec![
            pem::Pem::new("EXPIRES", expires.to_le_bytes().to_vec()),
            pem::Pem::new("PRIVATE KEY", self.dtls_certificate.private_key.clone()),
        ];
        for der in &self.dtls_certificate.certificate {
            blocks.push(pem::Pem::new("CERTIFICATE", der.clone()));
        }
        pem::encode_many(&blocks)
    }

    /// expires returns the timestamp after which this certificate is no longer valid.
    pub fn expires(&self) -> SystemTime {
        self.expires
    }

    /// is_expired reports whether the certificate validity has run out.
    pub fn is_expired(&self) -> bool {
        self.expires.duration_since(SystemTime::now()).is_err()
    }

    /// get_fingerprints returns certificate fingerprints, one of which
    /// is computed with the digest algorithm used in the certificate signature.
    pub fn get_fingerprints(&self) -> Vec<RTCDtlsFingerprint> {
        self.dtls_certificate
            .certificate
            .iter()
            .filter_map(|der| {
                fingerprint_value(DEFAULT_FINGERPRINT_ALGORITHM, der)
                    .ok()
                    .map(|value| RTCDtlsFingerprint {
                        algorithm: DEFAULT_FINGERPRINT_ALGORITHM.to_owned(),
                        value,
                    })
            })
            .collect()
    }

    pub(crate) fn dtls_certificate(&self) -> &DtlsCertificate {
        &self.dtls_certificate
    }
}

fn key_kind_of(key_pair: &KeyPair) -> Result<CertificateKeyKind> {
    if key_pair.is_compatible(&rcgen::PKCS_ECDSA_P256_SHA256) {
        Ok(CertificateKeyKind::EcdsaP256)
    } else if key_pair.is_compatible(&rcgen::PKCS_ED25519) {
        Ok(CertificateKeyKind::Ed25519)
    } else {
        Err(Error::ErrPrivateKeyType)
    }
}

fn validate_private_key(kind: CertificateKeyKind, der: &[u8]) -> Result<()> {
    match kind {
        CertificateKeyKind::EcdsaP256 => EcdsaKeyPair::from_pkcs8(
            &ring::signature::ECDSA_P256_SHA256_ASN1_SIGNING,
            der,
            &SystemRandom::new(),
        )
        .map(|_| ())
        .map_err(|e| Error::Other(e.to_string())),
        CertificateKeyKind::Ed25519 => Ed25519KeyPair::from_pkcs8_maybe_unchecked(der)
            .map(|_| ())
            .map_err(|e| Error::Other(e.to_string())),
    }
}
