//! Inert transport collaborators for unit tests that only exercise signaling.

use std::sync::Arc;

use async_trait::async_trait;
use util::Conn;

use crate::api::APIBuilder;
use crate::peer_connection::configuration::media_engine::MediaEngine;
use crate::peer_connection::configuration::{RTCConfiguration, RTCConfigurationBuilder};
use crate::peer_connection::transport::dtls::handshaker::{
    DtlsConn, DtlsHandshakeConfig, DtlsHandshaker,
};
use crate::peer_connection::transport::ice::agent::{
    IceAgent, IceAgentConfig, IceAgentFactory, OnAgentCandidateHdlrFn,
    OnAgentConnectionStateChangeHdlrFn, OnAgentSelectedCandidatePairChangeHdlrFn,
};
use crate::peer_connection::transport::sctp::association::{
    SctpAssociation, SctpConfig, SctpFactory,
};
use crate::peer_connection::transport::srtp::{
    SrtpContext, SrtpContextFactory, SrtpProtectionProfile,
};
use crate::peer_connection::transport::{RTCIceCandidate, RTCIceCandidatePair};
use crate::peer_connection::RTCPeerConnection;
use shared::error::{Error, Result};

/// IdleAgent hands out credentials but never gathers or connects, which is
/// enough to drive signaling.
struct IdleAgent {
    config: IceAgentConfig,
}

#[async_trait]
impl IceAgent for IdleAgent {
    fn on_candidate(&self, _f: OnAgentCandidateHdlrFn) {}

    fn on_connection_state_change(&self, _f: OnAgentConnectionStateChangeHdlrFn) {}

    fn on_selected_candidate_pair_change(&self, _f: OnAgentSelectedCandidatePairChangeHdlrFn) {}

    async fn gather_candidates(&self) -> Result<()> {
        Ok(())
    }

    async fn local_candidates(&self) -> Result<Vec<RTCIceCandidate>> {
        Ok(vec![])
    }

    async fn local_credentials(&self) -> (String, String) {
        (self.config.local_ufrag.clone(), self.config.local_pwd.clone())
    }

    async fn set_remote_credentials(&self, _ufrag: String, _pwd: String) -> Result<()> {
        Ok(())
    }

    async fn add_remote_candidate(&self, _candidate: &RTCIceCandidate) -> Result<()> {
        Ok(())
    }

    async fn dial(&self, _ufrag: String, _pwd: String) -> Result<Arc<dyn Conn + Send + Sync>> {
        std::future::pending().await
    }

    async fn accept(&self, _ufrag: String, _pwd: String) -> Result<Arc<dyn Conn + Send + Sync>> {
        std::future::pending().await
    }

    async fn selected_candidate_pair(&self) -> Option<RTCIceCandidatePair> {
        None
    }

    async fn restart(&self, _ufrag: String, _pwd: String) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub(crate) struct Idle;

impl IceAgentFactory for Idle {
    fn new_agent(&self, config: IceAgentConfig) -> Result<Arc<dyn IceAgent + Send + Sync>> {
        Ok(Arc::new(IdleAgent { config }))
    }
}

#[async_trait]
impl DtlsHandshaker for Idle {
    async fn handshake(
        &self,
        _conn: Arc<dyn Conn + Send + Sync>,
        _config: DtlsHandshakeConfig,
    ) -> Result<Arc<dyn DtlsConn + Send + Sync>> {
        Err(Error::ErrDtlsHandshakeFailed("idle transport".to_owned()))
    }
}

impl SrtpContextFactory for Idle {
    fn new_context(
        &self,
        _profile: SrtpProtectionProfile,
        _master_key: &[u8],
        _master_salt: &[u8],
    ) -> Result<Box<dyn SrtpContext + Send + Sync>> {
        Err(Error::OtherSrtpErr("idle transport".to_owned()))
    }
}

#[async_trait]
impl SctpFactory for Idle {
    async fn client(
        &self,
        _conn: Arc<dyn Conn + Send + Sync>,
        _config: SctpConfig,
    ) -> Result<Arc<dyn SctpAssociation + Send + Sync>> {
        Err(Error::Other("idle transport".to_owned()))
    }

    async fn server(
        &self,
        _conn: Arc<dyn Conn + Send + Sync>,
        _config: SctpConfig,
    ) -> Result<Arc<dyn SctpAssociation + Send + Sync>> {
        Err(Error::Other("idle transport".to_owned()))
    }
}

pub(crate) async fn new_pc_with(configuration: RTCConfiguration) -> Result<RTCPeerConnection> {
    let mut m = MediaEngine::default();
    m.register_default_codecs()?;
    let idle = Arc::new(Idle);

    APIBuilder::new()
        .with_media_engine(m)
        .with_ice_agent_factory(Arc::clone(&idle) as _)
        .with_dtls_handshaker(Arc::clone(&idle) as _)
        .with_srtp_factory(Arc::clone(&idle) as _)
        .with_sctp_factory(idle)
        .build()
        .new_peer_connection(configuration)
        .await
}

pub(crate) async fn new_pc() -> Result<RTCPeerConnection> {
    new_pc_with(RTCConfigurationBuilder::new().build()).await
}
