//! The [`API`] object and its builder.
//!
//! An `API` bundles everything a PeerConnection needs that is not part of
//! its per-connection configuration: registered codecs, interceptors,
//! non-standard settings, and the four protocol collaborators (ICE agent,
//! DTLS handshake, SRTP transforms, SCTP association).

#[cfg(test)]
mod api_test;

use std::sync::Arc;

use interceptor::registry::Registry;
use interceptor::Interceptor;

use crate::peer_connection::certificate::RTCCertificate;
use crate::peer_connection::configuration::media_engine::MediaEngine;
use crate::peer_connection::configuration::setting_engine::SettingEngine;
use crate::peer_connection::configuration::RTCConfiguration;
use crate::peer_connection::transport::dtls::handshaker::DtlsHandshaker;
use crate::peer_connection::transport::ice::agent::IceAgentFactory;
use crate::peer_connection::transport::ice::gatherer::{RTCIceGatherOptions, RTCIceGatherer};
use crate::peer_connection::transport::sctp::association::SctpFactory;
use crate::peer_connection::transport::srtp::SrtpContextFactory;
use crate::peer_connection::transport::{RTCDtlsTransport, RTCIceTransport, RTCSctpTransport};
use crate::peer_connection::RTCPeerConnection;
use crate::rtp_transceiver::rtp_codec::RtpCodecKind;
use crate::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use crate::rtp_transceiver::rtp_sender::RTCRtpSender;
use crate::media_stream::track_local::TrackLocal;
use shared::error::{Error, Result};

/// API bundles the global functions of the WebRTC and ORTC API.
pub struct API {
    pub(crate) setting_engine: Arc<SettingEngine>,
    pub(crate) media_engine: Arc<MediaEngine>,
    pub(crate) interceptor_registry: Registry,

    pub(crate) ice_agent_factory: Option<Arc<dyn IceAgentFactory + Send + Sync>>,
    pub(crate) dtls_handshaker: Option<Arc<dyn DtlsHandshaker + Send + Sync>>,
    pub(crate) srtp_factory: Option<Arc<dyn SrtpContextFactory + Send + Sync>>,
    pub(crate) sctp_factory: Option<Arc<dyn SctpFactory + Send + Sync>>,
}

impl API {
    /// new_peer_connection creates a new PeerConnection with the provided configuration against the received API object
    pub async fn new_peer_connection(
        &self,
        configuration: RTCConfiguration,
    ) -> Result<RTCPeerConnection> {
        RTCPeerConnection::new(self, configuration).await
    }

    /// new_ice_gatherer creates a new ice gatherer.
    /// This constructor is part of the ORTC API. It is not
    /// meant to be used together with the basic WebRTC API.
    pub fn new_ice_gatherer(&self, opts: RTCIceGatherOptions) -> Result<RTCIceGatherer> {
        Ok(RTCIceGatherer::new(
            opts.ice_servers,
            opts.ice_gather_policy,
            Arc::clone(&self.setting_engine),
            self.ice_agent_factory()?,
        ))
    }

    /// new_ice_transport creates a new ice transport.
    /// This constructor is part of the ORTC API. It is not
    /// meant to be used together with the basic WebRTC API.
    pub fn new_ice_transport(&self, gatherer: Arc<RTCIceGatherer>) -> RTCIceTransport {
        RTCIceTransport::new(gatherer)
    }

    /// new_dtls_transport creates a new dtls_transport transport.
    /// This constructor is part of the ORTC API. It is not
    /// meant to be used together with the basic WebRTC API.
    pub fn new_dtls_transport(
        &self,
        ice_transport: Arc<RTCIceTransport>,
        mut certificates: Vec<RTCCertificate>,
    ) -> Result<RTCDtlsTransport> {
        if !certificates.is_empty() {
            if certificates.iter().any(|c| c.is_expired()) {
                return Err(Error::ErrCertificateExpired);
            }
        } else {
            certificates = vec![RTCCertificate::generate()?];
        }

        Ok(RTCDtlsTransport::new(
            ice_transport,
            certificates,
            Arc::clone(&self.setting_engine),
            self.dtls_handshaker()?,
            self.srtp_factory()?,
        ))
    }

    /// new_sctp_transport creates a new SCTPTransport.
    /// This constructor is part of the ORTC API. It is not
    /// meant to be used together with the basic WebRTC API.
    pub fn new_sctp_transport(
        &self,
        dtls_transport: Arc<RTCDtlsTransport>,
    ) -> Result<RTCSctpTransport> {
        Ok(RTCSctpTransport::new(
            dtls_transport,
            Arc::clone(&self.setting_engine),
            self.sctp_factory()?,
        ))
    }

    /// new_rtp_receiver constructs a new RTPReceiver
    pub fn new_rtp_receiver(
        &self,
        kind: RtpCodecKind,
        transport: Arc<RTCDtlsTransport>,
        interceptor: Arc<dyn Interceptor + Send + Sync>,
    ) -> RTCRtpReceiver {
        RTCRtpReceiver::new(
            self.setting_engine.get_receive_mtu(),
            kind,
            transport,
            Arc::clone(&self.media_engine),
            interceptor,
        )
    }

    /// new_rtp_sender constructs a new RTPSender
    pub async fn new_rtp_sender(
        &self,
        track: Option<Arc<dyn TrackLocal + Send + Sync>>,
        kind: RtpCodecKind,
        transport: Arc<RTCDtlsTransport>,
        interceptor: Arc<dyn Interceptor + Send + Sync>,
    ) -> RTCRtpSender {
        RTCRtpSender::new(
            self.setting_engine.get_receive_mtu(),
            track,
            kind,
            transport,
            Arc::clone(&self.media_engine),
            interceptor,
            false,
        )
        .await
    }

    /// Returns the internal [`SettingEngine`].
    pub fn setting_engine(&self) -> &SettingEngine {
        &self.setting_engine
    }

    /// Returns the internal [`MediaEngine`].
    pub fn media_engine(&self) -> &MediaEngine {
        &self.media_engine
    }

    pub(crate) fn ice_agent_factory(&self) -> Result<Arc<dyn IceAgentFactory + Send + Sync>> {
        self.ice_agent_factory
            .clone()
            .ok_or(Error::ErrNoTransportFactory("ICE agent factory"))
    }

    pub(crate) fn dtls_handshaker(&self) -> Result<Arc<dyn DtlsHandshaker + Send + Sync>> {
        self.dtls_handshaker
            .clone()
            .ok_or(Error::ErrNoTransportFactory("DTLS handshaker"))
    }

    pub(crate) fn srtp_factory(&self) -> Result<Arc<dyn SrtpContextFactory + Send + Sync>> {
        self.srtp_factory
            .clone()
            .ok_or(Error::ErrNoTransportFactory("SRTP context factory"))
    }

    pub(crate) fn sctp_factory(&self) -> Result<Arc<dyn SctpFactory + Send + Sync>> {
        self.sctp_factory
            .clone()
            .ok_or(Error::ErrNoTransportFactory("SCTP factory"))
    }
}

/// APIBuilder collects the engines and collaborators an [`API`] is made of.
///
/// ```
/// use rtc_peer::api::APIBuilder;
/// use rtc_peer::peer_connection::configuration::media_engine::MediaEngine;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut media_engine = MediaEngine::default();
/// media_engine.register_default_codecs()?;
///
/// let api = APIBuilder::new().with_media_engine(media_engine).build();
/// # let _ = api;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct APIBuilder {
    setting_engine: Option<Arc<SettingEngine>>,
    media_engine: Option<Arc<MediaEngine>>,
    interceptor_registry: Option<Registry>,

    ice_agent_factory: Option<Arc<dyn IceAgentFactory + Send + Sync>>,
    dtls_handshaker: Option<Arc<dyn DtlsHandshaker + Send + Sync>>,
    srtp_factory: Option<Arc<dyn SrtpContextFactory + Send + Sync>>,
    sctp_factory: Option<Arc<dyn SctpFactory + Send + Sync>>,
}

impl APIBuilder {
    pub fn new() -> Self {
        APIBuilder::default()
    }

    pub fn build(mut self) -> API {
        API {
            setting_engine: self
                .setting_engine
                .take()
                .unwrap_or_else(|| Arc::new(SettingEngine::default())),
            media_engine: self
                .media_engine
                .take()
                .unwrap_or_else(|| Arc::new(MediaEngine::default())),
            interceptor_registry: self.interceptor_registry.take().unwrap_or_default(),
            ice_agent_factory: self.ice_agent_factory.take(),
            dtls_handshaker: self.dtls_handshaker.take(),
            srtp_factory: self.srtp_factory.take(),
            sctp_factory: self.sctp_factory.take(),
        }
    }

    /// WithSettingEngine allows providing a SettingEngine to the API.
    /// Settings should not be changed after passing the engine to an API.
    pub fn with_setting_engine(mut self, setting_engine: SettingEngine) -> Self {
        self.setting_engine = Some(Arc::new(setting_engine));
        self
    }

    /// WithMediaEngine allows providing a MediaEngine to the API.
    /// Settings can be changed after passing the engine to an API.
    pub fn with_media_engine(mut self, media_engine: MediaEngine) -> Self {
        self.media_engine = Some(Arc::new(media_engine));
        self
    }

    /// with_interceptor_registry allows providing Interceptors to the API.
    /// Settings should not be changed after passing the registry to an API.
    pub fn with_interceptor_registry(mut self, interceptor_registry: Registry) -> Self {
        self.interceptor_registry = Some(interceptor_registry);
        self
    }

    /// with_ice_agent_factory sets the ICE implementation every gatherer creates its agent with.
    pub fn with_ice_agent_factory(
        mut self,
        factory: Arc<dyn IceAgentFactory + Send + Sync>,
    ) -> Self {
        self.ice_agent_factory = Some(factory);
        self
    }

    pub fn with_dtls_handshaker(mut self, handshaker: Arc<dyn DtlsHandshaker + Send + Sync>) -> Self {
        self.dtls_handshaker = Some(handshaker);
        self
    }

    pub fn with_srtp_factory(mut self, factory: Arc<dyn SrtpContextFactory + Send + Sync>) -> Self {
        self.srtp_factory = Some(factory);
        self
    }

    pub fn with_sctp_factory(mut self, factory: Arc<dyn SctpFactory + Send + Sync>) -> Self {
        self.sctp_factory = Some(factory);
        self
    }
}
