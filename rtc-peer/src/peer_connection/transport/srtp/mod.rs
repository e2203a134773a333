//! SRTP and SRTCP sessions.
//!
//! The cipher transforms are supplied through [`SrtpContextFactory`]; this
//! module owns everything around them: splitting the DTLS exported keying
//! material, demultiplexing decrypted packets into per-SSRC read streams and
//! encrypting outbound packets onto the mux.

use std::fmt;

use bytes::Bytes;

use shared::error::{Error, Result};

pub(crate) mod session;
pub(crate) mod stream;

pub use session::Session;
pub use stream::Stream;

/// Label used with the DTLS keying material exporter (RFC 5764 4.2).
pub const SRTP_EXPORTER_LABEL: &str = "EXTRACTOR-dtls_srtp";

/// SrtpProtectionProfile is the SRTP profile negotiated by the DTLS use_srtp extension.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SrtpProtectionProfile {
    #[default]
    Aes128CmHmacSha1_80 = 0x0001,
    Aes128CmHmacSha1_32 = 0x0002,
    AeadAes128Gcm = 0x0007,
    AeadAes256Gcm = 0x0008,
}

impl SrtpProtectionProfile {
    pub fn key_len(&self) -> usize {
        match *self {
            SrtpProtectionProfile::Aes128CmHmacSha1_80
            | SrtpProtectionProfile::Aes128CmHmacSha1_32
            | SrtpProtectionProfile::AeadAes128Gcm => 16,
            SrtpProtectionProfile::AeadAes256Gcm => 32,
        }
    }

    pub fn salt_len(&self) -> usize {
        match *self {
            SrtpProtectionProfile::Aes128CmHmacSha1_80
            | SrtpProtectionProfile::Aes128CmHmacSha1_32 => 14,
            SrtpProtectionProfile::AeadAes128Gcm | SrtpProtectionProfile::AeadAes256Gcm => 12,
        }
    }

    /// keying_material_len is the number of bytes to export from DTLS:
    /// a key and a salt for each direction.
    pub fn keying_material_len(&self) -> usize {
        2 * (self.key_len() + self.salt_len())
    }
}

impl fmt::Display for SrtpProtectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            SrtpProtectionProfile::Aes128CmHmacSha1_80 => "SRTP_AES128_CM_HMAC_SHA1_80",
            SrtpProtectionProfile::Aes128CmHmacSha1_32 => "SRTP_AES128_CM_HMAC_SHA1_32",
            SrtpProtectionProfile::AeadAes128Gcm => "SRTP_AEAD_AES_128_GCM",
            SrtpProtectionProfile::AeadAes256Gcm => "SRTP_AEAD_AES_256_GCM",
        };
        write!(f, "{s}")
    }
}

pub(crate) fn default_srtp_protection_profiles() -> Vec<SrtpProtectionProfile> {
    vec![
        SrtpProtectionProfile::AeadAes128Gcm,
        SrtpProtectionProfile::AeadAes256Gcm,
        SrtpProtectionProfile::Aes128CmHmacSha1_80,
        SrtpProtectionProfile::Aes128CmHmacSha1_32,
    ]
}

/// SrtpContext is one direction of an SRTP/SRTCP cryptographic context.
pub trait SrtpContext {
    fn encrypt_rtp(&mut self, plaintext: &[u8]) -> Result<Bytes>;
    fn decrypt_rtp(&mut self, encrypted: &[u8]) -> Result<Bytes>;
    fn encrypt_rtcp(&mut self, plaintext: &[u8]) -> Result<Bytes>;
    fn decrypt_rtcp(&mut self, encrypted: &[u8]) -> Result<Bytes>;
}

/// SrtpContextFactory builds cipher contexts once DTLS has produced keys.
pub trait SrtpContextFactory {
    fn new_context(
        &self,
        profile: SrtpProtectionProfile,
        master_key: &[u8],
        master_salt: &[u8],
    ) -> Result<Box<dyn SrtpContext + Send + Sync>>;
}

/// SessionKeys bundles the keys required to setup an SRTP session
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionKeys {
    pub(crate) local_master_key: Vec<u8>,
    pub(crate) local_master_salt: Vec<u8>,
    pub(crate) remote_master_key: Vec<u8>,
    pub(crate) remote_master_salt: Vec<u8>,
}

impl SessionKeys {
    /// from_keying_material splits RFC 5764 keying material laid out as
    /// client_key | server_key | client_salt | server_salt.
    pub(crate) fn from_keying_material(
        profile: SrtpProtectionProfile,
        material: &[u8],
        is_client: bool,
    ) -> Result<Self> {
        let key_len = profile.key_len();
        let salt_len = profile.salt_len();
        if material.len() < profile.keying_material_len() {
            return Err(Error::ErrDtlsKeyExtractionFailed);
        }

        let mut offset = 0;
        let client_write_key = material[offset..offset + key_len].to_vec();
        offset += key_len;

        let server_write_key = material[offset..offset + key_len].to_vec();
        offset += key_len;

        let client_write_salt = material[offset..offset + salt_len].to_vec();
        offset += salt_len;

        let server_write_salt = material[offset..offset + salt_len].to_vec();

        Ok(if is_client {
            SessionKeys {
                local_master_key: client_write_key,
                local_master_salt: client_write_salt,
                remote_master_key: server_write_key,
                remote_master_salt: server_write_salt,
            }
        } else {
            SessionKeys {
                local_master_key: server_write_key,
                local_master_salt: server_write_salt,
                remote_master_key: client_write_key,
                remote_master_salt: client_write_salt,
            }
        })
    }
}
