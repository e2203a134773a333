use std::sync::Arc;

use async_trait::async_trait;
use util::Conn;

use crate::peer_connection::certificate::DtlsCertificate;
use crate::peer_connection::transport::srtp::SrtpProtectionProfile;
use shared::error::Result;

/// Side of the DTLS handshake once the role has been resolved.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DtlsHandshakeRole {
    Client,
    Server,
}

/// DtlsHandshakeConfig is everything the handshake needs from the transport.
#[derive(Debug, Clone)]
pub struct DtlsHandshakeConfig {
    pub role: DtlsHandshakeRole,
    pub certificate: DtlsCertificate,
    /// Offered (client) or accepted (server) profiles for the use_srtp extension.
    pub srtp_protection_profiles: Vec<SrtpProtectionProfile>,
}

/// DtlsConn is an established DTLS association.
///
/// Reads and writes on the [`Conn`] carry application data records, which
/// the SCTP association runs over.
#[async_trait]
pub trait DtlsConn: Conn {
    /// DER encoded certificate chain presented by the peer.
    fn remote_certificates(&self) -> Vec<Vec<u8>>;

    /// Profile agreed by the use_srtp extension, if any.
    fn selected_srtp_protection_profile(&self) -> Option<SrtpProtectionProfile>;

    /// Exports `len` bytes of keying material with the DTLS-SRTP exporter label.
    async fn srtp_keying_material(&self, len: usize) -> Result<Vec<u8>>;

    fn into_conn(self: Arc<Self>) -> Arc<dyn Conn + Send + Sync>;
}

/// DtlsHandshaker runs the DTLS 1.2 handshake over an ICE-selected connection.
#[async_trait]
pub trait DtlsHandshaker {
    async fn handshake(
        &self,
        conn: Arc<dyn Conn + Send + Sync>,
        config: DtlsHandshakeConfig,
    ) -> Result<Arc<dyn DtlsConn + Send + Sync>>;
}
