
pub mod certificate;
pub mod configuration;
pub mod event;
mod internal;
pub(crate) mod operation;
pub mod sdp;
pub mod state;
pub mod transport;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::SystemTime;

use interceptor::{Attributes, RTCPPacket};
use tokio::sync::Mutex;

use crate::api::API;
use crate::data_channel::init::RTCDataChannelInit;
use crate::data_channel::parameters::DataChannelParameters;
use crate::data_channel::RTCDataChannel;
use crate::media_stream::track_local::TrackLocal;
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::rtp_codec::RtpCodecKind;
use crate::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use crate::rtp_transceiver::rtp_sender::RTCRtpSender;
use crate::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use crate::statistics::report::RTCStatsReport;
use configuration::bundle_policy::RTCBundlePolicy;
use configuration::ice_transport_policy::RTCIceTransportPolicy;
use configuration::offer_answer_options::{RTCAnswerOptions, RTCOfferOptions};
use configuration::rtcp_mux_policy::RTCRtcpMuxPolicy;
use configuration::RTCConfiguration;
use event::*;
use internal::PeerConnectionInternal;
use sdp::{populate_local_candidates, RTCSessionDescription};
use state::{
    RTCIceConnectionState, RTCIceGatheringState, RTCPeerConnectionState, RTCSignalingState,
};
use transport::{RTCIceCandidate, RTCIceCandidateInit, RTCSctpTransport};
use shared::error::{Error, Result};

const ATTR_KEY_ICE_OPTIONS: &str = "ice-options";
const ICE_OPTION_TRICKLE: &str = "trickle";

/// PeerConnection represents a WebRTC connection that establishes a
/// peer-to-peer communications with another PeerConnection instance in a
/// browser, or to another endpoint implementing the required protocols.
///
/// Every mutating call is executed on the connection's operations queue,
/// one at a time and in the order the calls were made. Event handlers run
/// on a dedicated task and may call back into the connection.
pub struct RTCPeerConnection {
    internal: Arc<PeerConnectionInternal>,
}

impl std::fmt::Debug for RTCPeerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RTCPeerConnection")
            .field("signaling_state", &self.signaling_state())
            .field("connection_state", &self.connection_state())
            .finish()
    }
}

impl RTCPeerConnection {
    /// creates a PeerConnection with the configuration in
    /// [`RTCConfiguration`]. Use [`API::new_peer_connection`] instead.
    pub(crate) async fn new(api: &API, configuration: RTCConfiguration) -> Result<Self> {
        let internal = PeerConnectionInternal::new(api, configuration).await?;
        log::debug!("created peer connection");
        Ok(RTCPeerConnection { internal })
    }

    /// on_signaling_state_change sets an event handler which is invoked when the
    /// peer connection's signaling state changes
    pub fn on_signaling_state_change(&self, f: OnSignalingStateChangeHdlrFn) {
        self.internal
            .events
            .handlers
            .on_signaling_state_change
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_data_channel sets an event handler which is invoked when a data
    /// channel message arrives from a remote peer.
    pub fn on_data_channel(&self, f: OnDataChannelHdlrFn) {
        self.internal
            .events
            .handlers
            .on_data_channel
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_negotiation_needed sets an event handler which is invoked when
    /// a change has occurred which requires session negotiation
    pub fn on_negotiation_needed(&self, f: OnNegotiationNeededHdlrFn) {
        self.internal
            .events
            .handlers
            .on_negotiation_needed
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_ice_candidate sets an event handler which is invoked when a new ICE
    /// candidate is found. `None` marks the end of gathering.
    pub fn on_ice_candidate(&self, f: OnICECandidateHdlrFn) {
        self.internal
            .events
            .handlers
            .on_ice_candidate
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_ice_gathering_state_change sets an event handler which is invoked when the
    /// ICE candidate gathering state has changed.
    pub fn on_ice_gathering_state_change(&self, f: OnICEGatheringStateChangeHdlrFn) {
        self.internal
            .events
            .handlers
            .on_ice_gathering_state_change
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_track sets an event handler which is called when remote track
    /// arrives from a remote peer.
    pub fn on_track(&self, f: OnTrackHdlrFn) {
        self.internal
            .events
            .handlers
            .on_track
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_ice_connection_state_change sets an event handler which is called
    /// when an ICE connection state is changed.
    pub fn on_ice_connection_state_change(&self, f: OnICEConnectionStateChangeHdlrFn) {
        self.internal
            .events
            .handlers
            .on_ice_connection_state_change
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_peer_connection_state_change sets an event handler which is called
    /// when the PeerConnectionState has changed
    pub fn on_peer_connection_state_change(&self, f: OnPeerConnectionStateChangeHdlrFn) {
        self.internal
            .events
            .handlers
            .on_peer_connection_state_change
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// get_configuration returns a PeerConnection's current configuration.
    pub async fn get_configuration(&self) -> RTCConfiguration {
        self.internal.configuration.lock().await.clone()
    }

    /// set_configuration updates the configuration of this PeerConnection object.
    pub async fn set_configuration(&self, configuration: RTCConfiguration) -> Result<()> {
        // https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-setconfiguration (step #2)
        if self.internal.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let has_local_description = self.internal.descriptions.lock().await.local().is_some();
        let mut current = self.internal.configuration.lock().await;

        // https://www.w3.org/TR/webrtc/#set-the-configuration (step #3)
        if !configuration.peer_identity.is_empty()
            && configuration.peer_identity != current.peer_identity
        {
            return Err(Error::ErrModifyingPeerIdentity);
        }

        // https://www.w3.org/TR/webrtc/#set-the-configuration (step #4)
        if !configuration.certificates.is_empty()
            && configuration.certificates != current.certificates
        {
            return Err(Error::ErrModifyingCertificates);
        }

        // https://www.w3.org/TR/webrtc/#set-the-configuration (step #5)
        if configuration.bundle_policy != RTCBundlePolicy::Unspecified
            && configuration.bundle_policy != current.bundle_policy
        {
            return Err(Error::ErrModifyingBundlePolicy);
        }

        // https://www.w3.org/TR/webrtc/#set-the-configuration (step #6)
        if configuration.rtcp_mux_policy != RTCRtcpMuxPolicy::Unspecified
            && configuration.rtcp_mux_policy != current.rtcp_mux_policy
        {
            return Err(Error::ErrModifyingRTCPMuxPolicy);
        }

        // https://www.w3.org/TR/webrtc/#set-the-configuration (step #7)
        if configuration.ice_candidate_pool_size != 0
            && current.ice_candidate_pool_size != configuration.ice_candidate_pool_size
            && has_local_description
        {
            return Err(Error::ErrModifyingICECandidatePoolSize);
        }

        // https://www.w3.org/TR/webrtc/#set-the-configuration (step #11)
        // nothing is applied until every server validated
        if !configuration.ice_servers.is_empty() {
            configuration.validated_ice_urls()?;
        }

        if configuration.ice_candidate_pool_size != 0 {
            current.ice_candidate_pool_size = configuration.ice_candidate_pool_size;
        }

        // https://www.w3.org/TR/webrtc/#set-the-configuration (step #8)
        if configuration.ice_transport_policy != RTCIceTransportPolicy::Unspecified {
            current.ice_transport_policy = configuration.ice_transport_policy;
        }

        if !configuration.ice_servers.is_empty() {
            current.ice_servers = configuration.ice_servers;
        }

        Ok(())
    }

    /// create_offer starts the PeerConnection and generates the localDescription
    /// <https://w3c.github.io/webrtc-pc/#dom-rtcpeerconnection-createoffer>
    pub async fn create_offer(
        &self,
        options: Option<RTCOfferOptions>,
    ) -> Result<RTCSessionDescription> {
        if self.internal.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let internal = Arc::clone(&self.internal);
        let ice_restart = options.is_some_and(|o| o.ice_restart);
        self.internal
            .ops
            .run("create_offer", async move {
                internal.create_offer(ice_restart).await
            })
            .await
    }

    /// create_answer starts the PeerConnection and generates the localDescription
    pub async fn create_answer(
        &self,
        _options: Option<RTCAnswerOptions>,
    ) -> Result<RTCSessionDescription> {
        if self.internal.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let internal = Arc::clone(&self.internal);
        self.internal
            .ops
            .run("create_answer", async move { internal.create_answer().await })
            .await
    }

    /// set_local_description sets the SessionDescription of the local peer.
    /// An empty `sdp` applies the last offer or answer this connection created.
    pub async fn set_local_description(&self, desc: RTCSessionDescription) -> Result<()> {
        let internal = Arc::clone(&self.internal);
        self.internal
            .ops
            .run("set_local_description", async move {
                internal.set_local_description(desc).await
            })
            .await
    }

    /// local_description returns pending_local_description if it is not null and
    /// otherwise it returns current_local_description. This property is used to
    /// determine if set_local_description has already been called.
    /// <https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-localdescription>
    pub async fn local_description(&self) -> Option<RTCSessionDescription> {
        let local = self.internal.descriptions.lock().await.local().cloned();
        self.with_local_candidates(local).await
    }

    /// set_remote_description sets the SessionDescription of the remote peer
    pub async fn set_remote_description(&self, desc: RTCSessionDescription) -> Result<()> {
        let internal = Arc::clone(&self.internal);
        self.internal
            .ops
            .run("set_remote_description", async move {
                internal.set_remote_description(desc).await
            })
            .await
    }

    /// remote_description returns pending_remote_description if it is not null and
    /// otherwise it returns current_remote_description. This property is used to
    /// determine if setRemoteDescription has already been called.
    /// <https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-remotedescription>
    pub async fn remote_description(&self) -> Option<RTCSessionDescription> {
        self.internal.remote_description().await
    }

    /// current_local_description represents the local description that was
    /// successfully negotiated the last time the PeerConnection transitioned
    /// into the stable state plus any local candidates that have been generated
    /// by the ICEAgent since the offer or answer was created.
    pub async fn current_local_description(&self) -> Option<RTCSessionDescription> {
        let local = self.internal.descriptions.lock().await.current_local.clone();
        self.with_local_candidates(local).await
    }

    /// pending_local_description represents a local description that is in the
    /// process of being negotiated plus any local candidates that have been
    /// generated by the ICEAgent since the offer or answer was created. If the
    /// PeerConnection is in the stable state, the value is None.
    pub async fn pending_local_description(&self) -> Option<RTCSessionDescription> {
        let local = self.internal.descriptions.lock().await.pending_local.clone();
        self.with_local_candidates(local).await
    }

    /// current_remote_description represents the last remote description that was
    /// successfully negotiated the last time the PeerConnection transitioned
    /// into the stable state plus any remote candidates that have been supplied
    /// via add_ice_candidate() since the offer or answer was created.
    pub async fn current_remote_description(&self) -> Option<RTCSessionDescription> {
        self.internal.descriptions.lock().await.current_remote.clone()
    }

    /// pending_remote_description represents a remote description that is in the
    /// process of being negotiated, complete with any remote candidates that
    /// have been supplied via add_ice_candidate() since the offer or answer was
    /// created. If the PeerConnection is in the stable state, the value is None.
    pub async fn pending_remote_description(&self) -> Option<RTCSessionDescription> {
        self.internal.descriptions.lock().await.pending_remote.clone()
    }

    async fn with_local_candidates(
        &self,
        description: Option<RTCSessionDescription>,
    ) -> Option<RTCSessionDescription> {
        let candidates = self
            .internal
            .ice_gatherer
            .get_local_candidates()
            .await
            .unwrap_or_default();
        populate_local_candidates(
            description.as_ref(),
            &candidates,
            self.internal.ice_gathering_state(),
        )
    }

    /// add_ice_candidate accepts an ICE candidate string and adds it
    /// to the existing set of candidates. An empty candidate signals the
    /// end of remote candidates and is ignored.
    pub async fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> Result<()> {
        let internal = Arc::clone(&self.internal);
        self.internal
            .ops
            .run("add_ice_candidate", async move {
                if internal.remote_description().await.is_none() {
                    return Err(Error::ErrNoRemoteDescription);
                }

                let candidate_value = match candidate.candidate.strip_prefix("candidate:") {
                    Some(s) => s,
                    None => candidate.candidate.as_str(),
                };
                if candidate_value.is_empty() {
                    return Ok(());
                }

                let candidate = RTCIceCandidate::unmarshal(candidate_value)?;
                internal
                    .ice_transport
                    .add_remote_candidate(Some(candidate))
                    .await
            })
            .await
    }

    /// restart_ice flags the connection for an ICE restart. The next offer
    /// carries new credentials.
    pub fn restart_ice(&self) {
        self.internal
            .ice_restart_requested
            .store(true, Ordering::SeqCst);
        self.internal.trigger_negotiation_needed();
    }

    /// get_senders returns the RTPSender that are currently attached to this PeerConnection
    pub async fn get_senders(&self) -> Vec<Arc<RTCRtpSender>> {
        let transceivers = self.internal.rtp_transceivers.lock().await;
        transceivers.iter().map(|t| t.sender()).collect()
    }

    /// get_receivers returns the RTPReceivers that are currently attached to this PeerConnection
    pub async fn get_receivers(&self) -> Vec<Arc<RTCRtpReceiver>> {
        let transceivers = self.internal.rtp_transceivers.lock().await;
        transceivers.iter().map(|t| t.receiver()).collect()
    }

    /// get_transceivers returns the RtpTransceiver that are currently attached to this PeerConnection
    pub async fn get_transceivers(&self) -> Vec<Arc<RTCRtpTransceiver>> {
        self.internal.rtp_transceivers.lock().await.clone()
    }

    /// add_track adds a Track to the PeerConnection
    pub async fn add_track(
        &self,
        track: Arc<dyn TrackLocal + Send + Sync>,
    ) -> Result<Arc<RTCRtpSender>> {
        let internal = Arc::clone(&self.internal);
        self.internal
            .ops
            .run("add_track", async move { internal.add_track(track).await })
            .await
    }

    /// remove_track removes a Track from the PeerConnection
    pub async fn remove_track(&self, sender: &Arc<RTCRtpSender>) -> Result<()> {
        let internal = Arc::clone(&self.internal);
        let sender = Arc::clone(sender);
        self.internal
            .ops
            .run("remove_track", async move {
                internal.remove_track(&sender).await
            })
            .await
    }

    /// add_transceiver_from_kind Create a new RtpTransceiver and adds it to the set of transceivers.
    pub async fn add_transceiver_from_kind(
        &self,
        kind: RtpCodecKind,
        init: Option<RTCRtpTransceiverInit>,
    ) -> Result<Arc<RTCRtpTransceiver>> {
        if self.internal.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let direction = match init.map(|init| init.direction) {
            Some(direction) => direction,
            None => RTCRtpTransceiverDirection::Sendrecv,
        };

        let internal = Arc::clone(&self.internal);
        self.internal
            .ops
            .run("add_transceiver_from_kind", async move {
                let t = internal.new_transceiver_from_kind(kind, direction).await?;
                internal.add_rtp_transceiver(Arc::clone(&t)).await;
                Ok(t)
            })
            .await
    }

    /// add_transceiver_from_track Create a new RtpTransceiver(SendRecv or SendOnly) and add it to the set of transceivers.
    pub async fn add_transceiver_from_track(
        &self,
        track: Arc<dyn TrackLocal + Send + Sync>,
        init: Option<RTCRtpTransceiverInit>,
    ) -> Result<Arc<RTCRtpTransceiver>> {
        if self.internal.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let direction = match init.map(|init| init.direction) {
            Some(direction) => direction,
            None => RTCRtpTransceiverDirection::Sendrecv,
        };

        let internal = Arc::clone(&self.internal);
        self.internal
            .ops
            .run("add_transceiver_from_track", async move {
                let t = internal
                    .new_transceiver_from_track(direction, track)
                    .await?;
                internal.add_rtp_transceiver(Arc::clone(&t)).await;
                Ok(t)
            })
            .await
    }

    /// create_data_channel creates a new DataChannel object with the given label
    /// and optional DataChannelInit used to configure properties of the
    /// underlying channel such as data reliability.
    pub async fn create_data_channel(
        &self,
        label: &str,
        options: Option<RTCDataChannelInit>,
    ) -> Result<Arc<RTCDataChannel>> {
        // https://w3c.github.io/webrtc-pc/#peer-to-peer-data-api (Step #2)
        if self.internal.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        // https://w3c.github.io/webrtc-pc/#peer-to-peer-data-api (Step #5)
        if label.len() > u16::MAX as usize {
            return Err(Error::ErrStringSizeLimit);
        }

        let mut params = DataChannelParameters {
            label: label.to_owned(),
            ordered: true,
            ..Default::default()
        };

        // https://w3c.github.io/webrtc-pc/#peer-to-peer-data-api (Step #19)
        if let Some(options) = options {
            // Ordered indicates if data is allowed to be delivered out of order. The
            // default value of true, guarantees that data will be delivered in order.
            // https://w3c.github.io/webrtc-pc/#peer-to-peer-data-api (Step #9)
            if let Some(ordered) = options.ordered {
                params.ordered = ordered;
            }

            // https://w3c.github.io/webrtc-pc/#peer-to-peer-data-api (Step #7)
            params.max_packet_life_time = options.max_packet_life_time;

            // https://w3c.github.io/webrtc-pc/#peer-to-peer-data-api (Step #8)
            params.max_retransmits = options.max_retransmits;

            // https://w3c.github.io/webrtc-pc/#peer-to-peer-data-api (Step #10)
            if let Some(protocol) = options.protocol {
                params.protocol = protocol;
            }

            // https://w3c.github.io/webrtc-pc/#peer-to-peer-data-api (Step #11)
            if params.protocol.len() > u16::MAX as usize {
                return Err(Error::ErrProtocolTooLarge);
            }

            // https://w3c.github.io/webrtc-pc/#peer-to-peer-data-api (Step #12)
            params.negotiated = options.negotiated;
        }

        // https://w3c.github.io/webrtc-pc/#peer-to-peer-data-api (Step #16)
        if params.max_packet_life_time.is_some() && params.max_retransmits.is_some() {
            return Err(Error::ErrRetransmitsOrPacketLifeTime);
        }

        let internal = Arc::clone(&self.internal);
        let label = label.to_owned();
        self.internal
            .ops
            .run("create_data_channel", async move {
                internal.create_data_channel(&label, params).await
            })
            .await
    }

    /// write_rtcp sends a user provided RTCP packet to the connected peer. If no peer is connected the
    /// packet is discarded. It also runs any configured interceptors.
    pub async fn write_rtcp(&self, pkts: &[RTCPPacket]) -> Result<usize> {
        let a = Attributes::new();
        self.internal.interceptor_rtcp_writer.write(pkts, &a).await
    }

    /// set_identity_provider is not supported.
    pub fn set_identity_provider(&self, _provider: &str) -> Result<()> {
        Err(Error::ErrPeerConnSetIdentityProviderNotImplemented)
    }

    /// can_trickle_ice_candidates reports if the remote endpoint indicated
    /// support for receiving trickled ICE candidates. `None` until a remote
    /// description was applied.
    pub async fn can_trickle_ice_candidates(&self) -> Option<bool> {
        let remote = self.internal.remote_description().await?;
        let parsed = remote.parsed?;
        let session_level = parsed.attributes.iter();
        let media_level = parsed
            .media_descriptions
            .iter()
            .flat_map(|m| m.attributes.iter());
        Some(session_level.chain(media_level).any(|a| {
            a.key == ATTR_KEY_ICE_OPTIONS
                && a.value
                    .as_deref()
                    .is_some_and(|v| v.split_whitespace().any(|o| o == ICE_OPTION_TRICKLE))
        }))
    }

    /// signaling_state attribute returns the signaling state of the
    /// PeerConnection instance.
    pub fn signaling_state(&self) -> RTCSignalingState {
        self.internal.signaling_state()
    }

    /// icegathering_state attribute returns the ICE gathering state of the
    /// PeerConnection instance.
    pub fn ice_gathering_state(&self) -> RTCIceGatheringState {
        self.internal.ice_gathering_state()
    }

    /// ice_connection_state returns the ICE connection state of the
    /// PeerConnection instance.
    pub fn ice_connection_state(&self) -> RTCIceConnectionState {
        self.internal.ice_connection_state()
    }

    /// connection_state attribute returns the connection state of the
    /// PeerConnection instance.
    pub fn connection_state(&self) -> RTCPeerConnectionState {
        self.internal.connection_state()
    }

    /// sctp returns the SCTPTransport for this PeerConnection
    ///
    /// The SCTP transport over which SCTP data is sent and received. If SCTP has not been negotiated, the value is nil.
    /// <https://www.w3.org/TR/webrtc/#attributes-15>
    pub fn sctp(&self) -> Arc<RTCSctpTransport> {
        Arc::clone(&self.internal.sctp_transport)
    }

    /// get_stats returns a snapshot of the connection, its transport, every
    /// data channel and every RTP stream that was bound so far.
    ///
    /// <https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-getstats>
    pub async fn get_stats(&self) -> RTCStatsReport {
        self.internal.get_stats(SystemTime::now()).await
    }

    /// close ends the PeerConnection. Queued operations are dropped.
    pub async fn close(&self) -> Result<()> {
        self.internal.close().await
    }

    /// graceful_close ends the PeerConnection after every queued operation
    /// completed and every pending event handler returned.
    pub async fn graceful_close(&self) -> Result<()> {
        if self.internal.is_closed() {
            return Ok(());
        }
        self.internal.ops.graceful_close().await;
        self.internal.events.flush().await;
        let result = self.internal.close().await;
        // track and channel handlers end once close stopped their reads
        self.internal.events.join_spawned().await;
        result
    }
}
