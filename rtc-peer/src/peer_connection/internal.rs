use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use ::sdp::description::session::{
    Origin, SessionDescription, ATTR_KEY_GROUP, ATTR_KEY_MSID, ATTR_KEY_SSRC,
};
use ::sdp::extmap::{SDES_MID_URI, SDES_RTP_STREAM_ID_URI};
use ::sdp::util::ConnectionRole;
use interceptor::{Attributes, Interceptor, RTCPPacket, RTCPWriter, RTCPWriterFn};
use tokio::sync::{watch, Mutex};
use util::marshal::Unmarshal;

use crate::api::API;
use crate::constants::{SDES_REPAIR_RTP_STREAM_ID_URI, SDP_ATTRIBUTE_RID};
use crate::data_channel::RTCDataChannel;
use crate::data_channel::state::RTCDataChannelState;
use crate::media_stream::track_local::TrackLocal;
use crate::media_stream::track_local::track_local_static_sample::TrackLocalStaticSample;
use crate::peer_connection::configuration::media_engine::MediaEngine;
use crate::peer_connection::configuration::sdp_semantics::RTCSdpSemantics;
use crate::peer_connection::configuration::setting_engine::SettingEngine;
use crate::peer_connection::configuration::RTCConfiguration;
use crate::peer_connection::event::{EventDispatcher, RTCPeerConnectionEvent};
use crate::peer_connection::operation::{Operation, Operations};
use crate::peer_connection::sdp::{
    codecs_from_media_description, description_is_plan_b, extract_fingerprint, extract_ice_details, filter_track_with_ssrc,
    get_by_mid, get_mid_value, get_peer_direction, get_rids, have_application_media_section,
    have_data_channel, is_lite_set, populate_sdp, track_details_for_rid, track_details_for_ssrc,
    track_details_from_sdp, update_sdp_origin, MediaSection, PopulateSdpParams, RTCSdpType,
    RTCSessionDescription, TrackDetails, MEDIA_SECTION_APPLICATION,
};
use crate::peer_connection::state::peer_connection_state::NegotiationNeededState;
use crate::peer_connection::state::signaling_state::{check_next_signaling_state, StateChangeOp};
use crate::peer_connection::state::{
    RTCIceConnectionState, RTCIceGatheringState, RTCPeerConnectionState, RTCSignalingState,
};
use crate::peer_connection::transport::dtls::role::{DEFAULT_DTLS_ROLE_ANSWER, DEFAULT_DTLS_ROLE_OFFER};
use crate::peer_connection::transport::ice::gatherer::RTCIceGatherOptions;
use crate::peer_connection::transport::sctp::capabilities::SCTPTransportCapabilities;
use crate::peer_connection::transport::srtp::stream::Stream;
use crate::peer_connection::transport::{
    DTLSParameters, RTCDtlsFingerprint, RTCDtlsRole, RTCDtlsTransport, RTCDtlsTransportState,
    RTCIceGatherer, RTCIceGathererState, RTCIceParameters, RTCIceRole, RTCIceTransport,
    RTCIceTransportState, RTCSctpTransport, RTCSctpTransportState,
};
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::statistics::accumulator::DataChannelTally;
use crate::statistics::report::{
    RTCStatsReport, RTCStatsReportEntry, PEER_CONNECTION_STATS_ID, TRANSPORT_STATS_ID,
};
use crate::statistics::stats::{
    RTCPeerConnectionStats, RTCStats, RTCStatsType, RTCTransportStats,
};
use crate::rtp_transceiver::rtp_codec::{RTCRtpHeaderExtensionCapability, RtpCodecKind};
use crate::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use crate::rtp_transceiver::rtp_sender::RTCRtpSender;
use crate::rtp_transceiver::{
    create_stream_info, find_by_mid, handle_unknown_rtp_packet, satisfy_type_and_direction,
    RTCRtpCodingParameters, RTCRtpReceiveParameters, RTCRtpRtxParameters, RTCRtpTransceiver,
    TriggerNegotiationNeededFnOption, SSRC,
};
use shared::error::{flatten_errs, Error, RTCErrorKind, Result};

/// Undeclared SSRCs probed concurrently before new ones are dropped.
pub(crate) const SIMULCAST_MAX_PROBE_ROUTINES: usize = 25;

const MAX_OFFER_RETRIES: usize = 128;

/// Offer/answer state guarded as a whole so every transition is atomic.
#[derive(Default)]
pub(super) struct SignalingDescriptions {
    pub(super) current_local: Option<RTCSessionDescription>,
    pub(super) pending_local: Option<RTCSessionDescription>,
    pub(super) current_remote: Option<RTCSessionDescription>,
    pub(super) pending_remote: Option<RTCSessionDescription>,
    pub(super) last_offer: String,
    pub(super) last_answer: String,
}

impl SignalingDescriptions {
    pub(super) fn local(&self) -> Option<&RTCSessionDescription> {
        self.pending_local.as_ref().or(self.current_local.as_ref())
    }

    pub(super) fn remote(&self) -> Option<&RTCSessionDescription> {
        self.pending_remote.as_ref().or(self.current_remote.as_ref())
    }
}

pub(crate) struct PeerConnectionInternal {
    pub(super) ops: Operations,
    pub(super) events: EventDispatcher,

    pub(super) configuration: Mutex<RTCConfiguration>,

    pub(super) signaling_state: AtomicU8,
    pub(super) ice_connection_state: AtomicU8,
    pub(super) peer_connection_state: AtomicU8,

    pub(super) is_closed: AtomicBool,
    pub(super) is_negotiation_ongoing: AtomicBool,
    pub(super) negotiation_needed_state: AtomicU8,
    pub(super) ice_restart_requested: AtomicBool,
    pub(super) rtp_started: AtomicBool,
    pub(super) greater_mid: AtomicIsize,
    pub(super) data_channels_requested: AtomicUsize,
    /// Mid of the application section this side offered first.
    pub(super) data_mid: Mutex<Option<String>>,

    pub(super) descriptions: Mutex<SignalingDescriptions>,
    pub(super) sdp_origin: Mutex<Origin>,
    pub(super) remote_ice_credentials: Mutex<Option<(String, String)>>,

    pub(super) rtp_transceivers: Mutex<Vec<Arc<RTCRtpTransceiver>>>,

    pub(super) ice_gatherer: Arc<RTCIceGatherer>,
    pub(super) ice_transport: Arc<RTCIceTransport>,
    pub(super) dtls_transport: Arc<RTCDtlsTransport>,
    pub(super) sctp_transport: Arc<RTCSctpTransport>,

    pub(super) setting_engine: Arc<SettingEngine>,
    pub(super) media_engine: Arc<MediaEngine>,
    pub(super) interceptor: Arc<dyn Interceptor + Send + Sync>,
    pub(super) interceptor_rtcp_writer: Arc<dyn RTCPWriter + Send + Sync>,

    closed_tx: watch::Sender<bool>,
}

impl PeerConnectionInternal {
    pub(super) async fn new(api: &API, mut configuration: RTCConfiguration) -> Result<Arc<Self>> {
        let ice_servers = configuration.validated_ice_urls()?;
        let ice_gatherer = Arc::new(api.new_ice_gatherer(RTCIceGatherOptions {
            ice_servers,
            ice_gather_policy: configuration.ice_transport_policy,
        })?);
        let ice_transport = Arc::new(api.new_ice_transport(Arc::clone(&ice_gatherer)));
        let dtls_transport = Arc::new(api.new_dtls_transport(
            Arc::clone(&ice_transport),
            configuration.certificates.clone(),
        )?);
        if configuration.certificates.is_empty() {
            configuration.certificates = dtls_transport.certificates.clone();
        }
        let sctp_transport = Arc::new(api.new_sctp_transport(Arc::clone(&dtls_transport))?);

        let interceptor = api.interceptor_registry.build("")?;
        let weak_dtls = Arc::downgrade(&dtls_transport);
        let interceptor_rtcp_writer = interceptor
            .bind_rtcp_writer(Arc::new(RTCPWriterFn(Box::new(
                move |pkts: &[RTCPPacket], _attributes: &Attributes| {
                    let pkts: Vec<_> = pkts.iter().map(|p| p.cloned()).collect();
                    let weak_dtls = weak_dtls.clone();
                    Box::pin(async move {
                        match weak_dtls.upgrade() {
                            Some(dtls_transport) => dtls_transport.write_rtcp(&pkts).await,
                            None => Ok(0),
                        }
                    })
                },
            ))))
            .await;

        let media_engine = if api.setting_engine.disable_media_engine_copy {
            Arc::clone(&api.media_engine)
        } else {
            Arc::new(api.media_engine.clone_to())
        };

        let (closed_tx, _) = watch::channel(false);
        let pc = Arc::new(PeerConnectionInternal {
            ops: Operations::new(),
            events: EventDispatcher::new(),
            configuration: Mutex::new(configuration),
            signaling_state: AtomicU8::new(RTCSignalingState::Stable as u8),
            ice_connection_state: AtomicU8::new(RTCIceConnectionState::New as u8),
            peer_connection_state: AtomicU8::new(RTCPeerConnectionState::New as u8),
            is_closed: AtomicBool::new(false),
            is_negotiation_ongoing: AtomicBool::new(false),
            negotiation_needed_state: AtomicU8::new(NegotiationNeededState::Empty as u8),
            ice_restart_requested: AtomicBool::new(false),
            rtp_started: AtomicBool::new(false),
            greater_mid: AtomicIsize::new(0),
            data_channels_requested: AtomicUsize::new(0),
            data_mid: Mutex::new(None),
            descriptions: Mutex::new(SignalingDescriptions::default()),
            sdp_origin: Mutex::new(Origin::default()),
            remote_ice_credentials: Mutex::new(None),
            rtp_transceivers: Mutex::new(vec![]),
            ice_gatherer,
            ice_transport,
            dtls_transport,
            sctp_transport,
            setting_engine: Arc::clone(&api.setting_engine),
            media_engine,
            interceptor,
            interceptor_rtcp_writer,
            closed_tx,
        });

        pc.wire_transport_events();

        Ok(pc)
    }

    /// wire_transport_events routes transport callbacks into the event
    /// dispatcher. Every callback holds the PeerConnection weakly.
    fn wire_transport_events(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.ice_transport
            .on_connection_state_change(Box::new(move |state: RTCIceTransportState| {
                let weak = weak.clone();
                Box::pin(async move {
                    if let Some(pc) = weak.upgrade() {
                        let cs = RTCIceConnectionState::from(state);
                        pc.do_ice_connection_state_change(cs);
                        pc.update_connection_state(cs, pc.dtls_transport.state());
                    }
                })
            }));

        let weak = Arc::downgrade(self);
        self.dtls_transport
            .on_state_change(Box::new(move |state: RTCDtlsTransportState| {
                let weak = weak.clone();
                Box::pin(async move {
                    if let Some(pc) = weak.upgrade() {
                        pc.update_connection_state(pc.ice_connection_state(), state);
                    }
                })
            }));

        let weak = Arc::downgrade(self);
        self.ice_gatherer
            .on_state_change(Box::new(move |state: RTCIceGathererState| {
                let weak = weak.clone();
                Box::pin(async move {
                    if let Some(pc) = weak.upgrade() {
                        let gathering_state = RTCIceGatheringState::from(state);
                        log::info!("ICE gathering state changed: {gathering_state}");
                        pc.events.emit(
                            RTCPeerConnectionEvent::OnIceGatheringStateChangeEvent(gathering_state),
                        );
                    }
                })
            }));

        let weak = Arc::downgrade(self);
        self.ice_gatherer.on_local_candidate(Box::new(move |candidate| {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(pc) = weak.upgrade() {
                    pc.events
                        .emit(RTCPeerConnectionEvent::OnIceCandidateEvent(candidate));
                }
            })
        }));

        let weak = Arc::downgrade(self);
        self.sctp_transport.on_data_channel(Box::new(move |dc| {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(pc) = weak.upgrade() {
                    // handlers must be registered before the channel reports open
                    pc.events
                        .emit_and_wait(RTCPeerConnectionEvent::OnDataChannel(dc))
                        .await;
                }
            })
        }));
    }

    pub(super) fn signaling_state(&self) -> RTCSignalingState {
        self.signaling_state.load(Ordering::SeqCst).into()
    }

    pub(super) fn ice_connection_state(&self) -> RTCIceConnectionState {
        self.ice_connection_state.load(Ordering::SeqCst).into()
    }

    pub(super) fn connection_state(&self) -> RTCPeerConnectionState {
        self.peer_connection_state.load(Ordering::SeqCst).into()
    }

    pub(super) fn ice_gathering_state(&self) -> RTCIceGatheringState {
        RTCIceGatheringState::from(self.ice_gatherer.state())
    }

    pub(super) fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::SeqCst)
    }

    pub(super) async fn remote_description(&self) -> Option<RTCSessionDescription> {
        self.descriptions.lock().await.remote().cloned()
    }

    fn do_signaling_state_change(&self, state: RTCSignalingState) {
        log::info!("signaling state changed to {state}");
        self.events
            .emit(RTCPeerConnectionEvent::OnSignalingStateChangeEvent(state));
    }

    fn do_ice_connection_state_change(&self, state: RTCIceConnectionState) {
        if self.ice_connection_state.swap(state as u8, Ordering::SeqCst) == state as u8 {
            return;
        }
        log::info!("ICE connection state changed: {state}");
        self.events
            .emit(RTCPeerConnectionEvent::OnIceConnectionStateChangeEvent(state));
    }

    pub(super) fn update_connection_state(
        &self,
        ice_connection_state: RTCIceConnectionState,
        dtls_transport_state: RTCDtlsTransportState,
    ) {
        let connection_state = RTCPeerConnectionState::derive(
            self.is_closed(),
            ice_connection_state,
            dtls_transport_state,
        );

        if self
            .peer_connection_state
            .swap(connection_state as u8, Ordering::SeqCst)
            == connection_state as u8
        {
            return;
        }

        log::info!("peer connection state changed: {connection_state}");
        self.events
            .emit(RTCPeerConnectionEvent::OnConnectionStateChangeEvent(
                connection_state,
            ));
    }

    fn local_fingerprints(&self) -> Result<Vec<RTCDtlsFingerprint>> {
        self.dtls_transport
            .certificates
            .first()
            .map(|cert| cert.get_fingerprints())
            .ok_or(Error::ErrNonCertificate)
    }

    /// generate_unmatched_sdp describes every local transceiver without
    /// looking at the remote side. Used for the first offer.
    async fn generate_unmatched_sdp(
        &self,
        transceivers: &[Arc<RTCRtpTransceiver>],
        sdp_semantics: RTCSdpSemantics,
    ) -> Result<SessionDescription> {
        let d = SessionDescription::new_jsep_session_description(false);

        let ice_params = self.ice_gatherer.get_local_parameters().await?;
        let candidates = self.ice_gatherer.get_local_candidates().await?;

        let is_plan_b = sdp_semantics == RTCSdpSemantics::PlanB;
        let mut media_sections = vec![];

        if is_plan_b {
            let mut video = vec![];
            let mut audio = vec![];
            for t in transceivers {
                t.sender().set_negotiated().await;
                match t.kind() {
                    RtpCodecKind::Video => video.push(Arc::clone(t)),
                    RtpCodecKind::Audio => audio.push(Arc::clone(t)),
                    _ => {}
                }
            }

            if !video.is_empty() {
                media_sections.push(MediaSection {
                    id: "video".to_owned(),
                    transceivers: video,
                    ..Default::default()
                });
            }
            if !audio.is_empty() {
                media_sections.push(MediaSection {
                    id: "audio".to_owned(),
                    transceivers: audio,
                    ..Default::default()
                });
            }
            if self.data_channels_requested.load(Ordering::SeqCst) != 0 {
                media_sections.push(MediaSection {
                    id: "data".to_owned(),
                    data: true,
                    ..Default::default()
                });
            }
        } else {
            for t in transceivers {
                let Some(mid) = t.mid() else {
                    continue;
                };
                if t.stopped() {
                    continue;
                }
                t.sender().set_negotiated().await;
                media_sections.push(MediaSection {
                    id: mid,
                    transceivers: vec![Arc::clone(t)],
                    ..Default::default()
                });
            }

            if self.data_channels_requested.load(Ordering::SeqCst) != 0 {
                media_sections.push(MediaSection {
                    id: self.data_section_mid(&media_sections).await?,
                    data: true,
                    ..Default::default()
                });
            }
        }

        let params = PopulateSdpParams {
            is_plan_b,
            media_description_fingerprint: self.setting_engine.sdp_media_level_fingerprints,
            is_ice_lite: self.setting_engine.candidates.ice_lite,
            connection_role: DEFAULT_DTLS_ROLE_OFFER.to_connection_role(),
            ice_gathering_state: self.ice_gathering_state(),
            match_bundle_group: None,
        };
        populate_sdp(
            d,
            &self.local_fingerprints()?,
            &self.media_engine,
            &candidates,
            &ice_params,
            &media_sections,
            params,
        )
        .await
    }

    pub(super) async fn get_stats(&self, now: SystemTime) -> RTCStatsReport {
        let mut entries = vec![];

        let data_channels = self.sctp_transport.data_channels.lock().await.clone();
        let mut tally = DataChannelTally::default();
        for dc in &data_channels {
            tally.add(dc.stats.was_opened(), dc.ready_state());
        }
        entries.push(RTCStatsReportEntry::PeerConnection(RTCPeerConnectionStats {
            stats: RTCStats {
                timestamp: now,
                typ: RTCStatsType::PeerConnection,
                id: PEER_CONNECTION_STATS_ID.to_owned(),
            },
            data_channels_opened: tally.opened,
            data_channels_closed: tally.closed,
        }));

        // reading stats never creates the ICE agent
        let ice_local_username_fragment = match self.ice_gatherer.get_agent().await {
            Some(agent) => agent.local_credentials().await.0,
            None => String::new(),
        };
        entries.push(RTCStatsReportEntry::Transport(RTCTransportStats {
            stats: RTCStats {
                timestamp: now,
                typ: RTCStatsType::Transport,
                id: TRANSPORT_STATS_ID.to_owned(),
            },
            ice_role: self.ice_transport.role().await,
            ice_local_username_fragment,
            ice_state: self.ice_transport.state(),
            dtls_state: self.dtls_transport.state(),
            dtls_role: self.dtls_transport.role().await,
            selected_candidate_pair: self
                .ice_transport
                .get_selected_candidate_pair()
                .await
                .map(|pair| pair.to_string())
                .unwrap_or_default(),
        }));

        for dc in &data_channels {
            entries.push(RTCStatsReportEntry::DataChannel(dc.collect_stats(now)));
        }

        let transceivers = self.rtp_transceivers.lock().await.clone();
        for t in transceivers {
            let mid = t.mid().unwrap_or_default();
            let sender = t.sender();
            if sender.has_sent() {
                for s in sender.collect_stats(now, &mid).await {
                    entries.push(RTCStatsReportEntry::OutboundRtp(s));
                }
            }
            for s in t.receiver().collect_stats(now, &mid).await {
                entries.push(RTCStatsReportEntry::InboundRtp(s));
            }
        }

        RTCStatsReport::new(entries)
    }

    /// data_section_mid returns the mid of a locally offered application
    /// section. It is drawn like a transceiver mid and kept for later offers.
    async fn data_section_mid(&self, media_sections: &[MediaSection]) -> Result<String> {
        let mut data_mid = self.data_mid.lock().await;
        if let Some(mid) = data_mid.as_ref() {
            if !media_sections.iter().any(|m| m.id == *mid) {
                return Ok(mid.clone());
            }
        }

        for _ in 0..MAX_OFFER_RETRIES {
            let next = self.greater_mid.fetch_add(1, Ordering::SeqCst);
            let mid = match &self.setting_engine.mid_generator {
                Some(generator) => generator(next),
                None => format!("{next}"),
            };
            if !media_sections.iter().any(|m| m.id == mid) {
                *data_mid = Some(mid.clone());
                return Ok(mid);
            }
        }
        Err(Error::ErrExcessiveRetries)
    }

    /// generate_matched_sdp answers the remote media sections in order and,
    /// when offering, appends the local transceivers the remote never saw.
    async fn generate_matched_sdp(
        self: &Arc<Self>,
        transceivers: Vec<Arc<RTCRtpTransceiver>>,
        sdp_semantics: RTCSdpSemantics,
        include_unmatched: bool,
        connection_role: ConnectionRole,
    ) -> Result<SessionDescription> {
        let d = SessionDescription::new_jsep_session_description(false);

        let ice_params = self.ice_gatherer.get_local_parameters().await?;
        let candidates = self.ice_gatherer.get_local_candidates().await?;

        let remote_description = self.remote_description().await;
        let detected_plan_b = description_is_plan_b(remote_description.as_ref());
        if (sdp_semantics == RTCSdpSemantics::UnifiedPlan && detected_plan_b)
            || (sdp_semantics == RTCSdpSemantics::PlanB && !detected_plan_b)
        {
            return Err(Error::ErrIncorrectSDPSemantics);
        }

        let mut local_transceivers = transceivers;
        let mut media_sections = vec![];
        let mut already_have_application_media_section = false;

        if let Some(parsed) = remote_description.as_ref().and_then(|r| r.parsed.as_ref()) {
            for media in &parsed.media_descriptions {
                let Some(mid_value) = get_mid_value(media) else {
                    continue;
                };
                if mid_value.is_empty() {
                    return Err(Error::ErrPeerConnRemoteDescriptionWithoutMidValue);
                }

                if media.media_name.media == MEDIA_SECTION_APPLICATION {
                    media_sections.push(MediaSection {
                        id: mid_value.to_owned(),
                        data: true,
                        ..Default::default()
                    });
                    already_have_application_media_section = true;
                    continue;
                }

                let kind = RtpCodecKind::from(media.media_name.media.as_str());
                let direction = get_peer_direction(media);
                if kind == RtpCodecKind::Unspecified
                    || direction == RTCRtpTransceiverDirection::Unspecified
                {
                    continue;
                }

                let mut media_transceivers = vec![];
                if !detected_plan_b {
                    let Some(t) = find_by_mid(mid_value, &mut local_transceivers) else {
                        return Err(Error::ErrPeerConnTransceiverMidNil);
                    };
                    t.sender().set_negotiated().await;
                    media_transceivers.push(t);
                } else {
                    // fill the section with every local transceiver that fits it
                    while let Some(t) =
                        satisfy_type_and_direction(kind, direction, &mut local_transceivers)
                    {
                        t.sender().set_negotiated().await;
                        media_transceivers.push(t);
                    }
                    if media_transceivers.is_empty() {
                        media_transceivers.push(
                            self.new_transceiver(kind, RTCRtpTransceiverDirection::Inactive, None)
                                .await,
                        );
                    }
                }

                media_sections.push(MediaSection {
                    id: mid_value.to_owned(),
                    transceivers: media_transceivers,
                    rid_map: get_rids(media),
                    offered_direction: (!include_unmatched).then_some(direction),
                    ..Default::default()
                });
            }
        }

        let match_bundle_group = if include_unmatched {
            for t in local_transceivers {
                let Some(mid) = t.mid() else {
                    continue;
                };
                t.sender().set_negotiated().await;
                media_sections.push(MediaSection {
                    id: mid,
                    transceivers: vec![t],
                    ..Default::default()
                });
            }

            if self.data_channels_requested.load(Ordering::SeqCst) != 0
                && !already_have_application_media_section
            {
                media_sections.push(MediaSection {
                    id: if detected_plan_b {
                        "data".to_owned()
                    } else {
                        self.data_section_mid(&media_sections).await?
                    },
                    data: true,
                    ..Default::default()
                });
            }
            None
        } else {
            Some(
                remote_description
                    .as_ref()
                    .and_then(|d| d.parsed.as_ref())
                    .and_then(|d| d.attribute(ATTR_KEY_GROUP))
                    .cloned()
                    .unwrap_or_default(),
            )
        };

        let params = PopulateSdpParams {
            is_plan_b: detected_plan_b,
            media_description_fingerprint: self.setting_engine.sdp_media_level_fingerprints,
            is_ice_lite: self.setting_engine.candidates.ice_lite,
            connection_role,
            ice_gathering_state: self.ice_gathering_state(),
            match_bundle_group,
        };
        populate_sdp(
            d,
            &self.local_fingerprints()?,
            &self.media_engine,
            &candidates,
            &ice_params,
            &media_sections,
            params,
        )
        .await
    }

    fn has_local_description_changed(
        transceivers: &[Arc<RTCRtpTransceiver>],
        desc: &RTCSessionDescription,
    ) -> bool {
        for t in transceivers {
            if t.stopped() {
                continue;
            }
            let Some(m) = t.mid().and_then(|mid| get_by_mid(&mid, desc)) else {
                return true;
            };
            if get_peer_direction(m) != t.direction() {
                return true;
            }
        }
        false
    }

    pub(super) async fn create_offer(
        self: &Arc<Self>,
        ice_restart: bool,
    ) -> Result<RTCSessionDescription> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        if ice_restart | self.ice_restart_requested.swap(false, Ordering::SeqCst) {
            self.ice_transport.restart().await?;
        }

        let sdp_semantics = self.configuration.lock().await.sdp_semantics;
        let is_plan_b = sdp_semantics == RTCSdpSemantics::PlanB;

        // Transceivers added while the offer is generated change it; retry
        // until it is stable.
        let mut count = 0;
        let offer = loop {
            let current_remote = self.descriptions.lock().await.current_remote.clone();
            if let Some(parsed) = current_remote.as_ref().and_then(|d| d.parsed.as_ref()) {
                for media in &parsed.media_descriptions {
                    let Some(numeric_mid) = get_mid_value(media).and_then(|mid| mid.parse::<isize>().ok())
                    else {
                        continue;
                    };
                    self.greater_mid
                        .fetch_max(numeric_mid + 1, Ordering::SeqCst);
                }
            }

            let transceivers = self.rtp_transceivers.lock().await.clone();
            if !is_plan_b {
                for t in &transceivers {
                    if t.mid().is_some() {
                        continue;
                    }
                    let next = self.greater_mid.fetch_add(1, Ordering::SeqCst);
                    let mid = match &self.setting_engine.mid_generator {
                        Some(generator) => generator(next),
                        None => format!("{next}"),
                    };
                    t.set_mid(mid)?;
                }
            }

            let mut d = if current_remote.is_none() {
                self.generate_unmatched_sdp(&transceivers, sdp_semantics)
                    .await?
            } else {
                self.generate_matched_sdp(
                    transceivers.clone(),
                    sdp_semantics,
                    true,
                    DEFAULT_DTLS_ROLE_OFFER.to_connection_role(),
                )
                .await?
            };

            update_sdp_origin(&mut *self.sdp_origin.lock().await, &mut d);

            let offer = RTCSessionDescription {
                sdp_type: RTCSdpType::Offer,
                sdp: d.marshal(),
                parsed: Some(d),
            };

            let current = self.rtp_transceivers.lock().await.clone();
            if is_plan_b || !Self::has_local_description_changed(&current, &offer) {
                break offer;
            }

            count += 1;
            if count >= MAX_OFFER_RETRIES {
                return Err(Error::ErrExcessiveRetries);
            }
        };

        self.descriptions.lock().await.last_offer = offer.sdp.clone();
        Ok(offer)
    }

    pub(super) async fn create_answer(self: &Arc<Self>) -> Result<RTCSessionDescription> {
        let remote_description = self.remote_description().await;
        let Some(remote_description) = remote_description else {
            return Err(Error::ErrNoRemoteDescription);
        };
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }
        let signaling_state = self.signaling_state();
        if signaling_state != RTCSignalingState::HaveRemoteOffer
            && signaling_state != RTCSignalingState::HaveLocalPranswer
        {
            return Err(Error::ErrIncorrectSignalingState);
        }

        let mut connection_role = self.setting_engine.answering_dtls_role.to_connection_role();
        if connection_role == ConnectionRole::Unspecified {
            connection_role = DEFAULT_DTLS_ROLE_ANSWER.to_connection_role();
            let remote_is_lite = remote_description
                .parsed
                .as_ref()
                .is_some_and(is_lite_set);
            if remote_is_lite && !self.setting_engine.candidates.ice_lite {
                connection_role = RTCDtlsRole::Server.to_connection_role();
            }
        }

        let sdp_semantics = self.configuration.lock().await.sdp_semantics;
        let transceivers = self.rtp_transceivers.lock().await.clone();
        let mut d = self
            .generate_matched_sdp(transceivers, sdp_semantics, false, connection_role)
            .await?;
        update_sdp_origin(&mut *self.sdp_origin.lock().await, &mut d);

        let answer = RTCSessionDescription {
            sdp_type: RTCSdpType::Answer,
            sdp: d.marshal(),
            parsed: Some(d),
        };

        self.descriptions.lock().await.last_answer = answer.sdp.clone();
        Ok(answer)
    }

    // 4.4.1.6 Set the SessionDescription
    async fn set_description(
        self: &Arc<Self>,
        sd: &RTCSessionDescription,
        op: StateChangeOp,
    ) -> Result<()> {
        if sd.sdp_type == RTCSdpType::Unspecified {
            return Err(Error::ErrPeerConnSDPTypeInvalidValue);
        }

        let cur = self.signaling_state();
        let next_state = {
            let mut descriptions = self.descriptions.lock().await;
            match (op, sd.sdp_type) {
                // stable->SetLocal(offer)->have-local-offer
                (StateChangeOp::SetLocal, RTCSdpType::Offer) => {
                    if sd.sdp != descriptions.last_offer {
                        return Err(Error::ErrSDPDoesNotMatchOffer);
                    }
                    let next = check_next_signaling_state(
                        cur,
                        RTCSignalingState::HaveLocalOffer,
                        op,
                        sd.sdp_type,
                    )?;
                    descriptions.pending_local = Some(sd.clone());
                    next
                }
                // have-remote-offer->SetLocal(answer)->stable
                // have-local-pranswer->SetLocal(answer)->stable
                (StateChangeOp::SetLocal, RTCSdpType::Answer) => {
                    if sd.sdp != descriptions.last_answer {
                        return Err(Error::ErrSDPDoesNotMatchAnswer);
                    }
                    let next =
                        check_next_signaling_state(cur, RTCSignalingState::Stable, op, sd.sdp_type)?;
                    descriptions.current_local = Some(sd.clone());
                    descriptions.current_remote = descriptions.pending_remote.take();
                    descriptions.pending_local = None;
                    next
                }
                // have-remote-offer->SetLocal(pranswer)->have-local-pranswer
                (StateChangeOp::SetLocal, RTCSdpType::Pranswer) => {
                    if sd.sdp != descriptions.last_answer {
                        return Err(Error::ErrSDPDoesNotMatchAnswer);
                    }
                    let next = check_next_signaling_state(
                        cur,
                        RTCSignalingState::HaveLocalPranswer,
                        op,
                        sd.sdp_type,
                    )?;
                    descriptions.pending_local = Some(sd.clone());
                    next
                }
                // any non-stable state->SetLocal(rollback)->stable
                (StateChangeOp::SetLocal, RTCSdpType::Rollback) => {
                    let next =
                        check_next_signaling_state(cur, RTCSignalingState::Stable, op, sd.sdp_type)?;
                    descriptions.pending_local = None;
                    descriptions.pending_remote = None;
                    next
                }
                // stable->SetRemote(offer)->have-remote-offer
                (StateChangeOp::SetRemote, RTCSdpType::Offer) => {
                    let next = check_next_signaling_state(
                        cur,
                        RTCSignalingState::HaveRemoteOffer,
                        op,
                        sd.sdp_type,
                    )?;
                    descriptions.pending_remote = Some(sd.clone());
                    next
                }
                // have-local-offer->SetRemote(answer)->stable
                // have-remote-pranswer->SetRemote(answer)->stable
                (StateChangeOp::SetRemote, RTCSdpType::Answer) => {
                    let next =
                        check_next_signaling_state(cur, RTCSignalingState::Stable, op, sd.sdp_type)?;
                    descriptions.current_remote = Some(sd.clone());
                    descriptions.current_local = descriptions.pending_local.take();
                    descriptions.pending_remote = None;
                    next
                }
                // have-local-offer->SetRemote(pranswer)->have-remote-pranswer
                (StateChangeOp::SetRemote, RTCSdpType::Pranswer) => {
                    let next = check_next_signaling_state(
                        cur,
                        RTCSignalingState::HaveRemotePranswer,
                        op,
                        sd.sdp_type,
                    )?;
                    descriptions.pending_remote = Some(sd.clone());
                    next
                }
                // any non-stable state->SetRemote(rollback)->stable
                (StateChangeOp::SetRemote, RTCSdpType::Rollback) => {
                    let next =
                        check_next_signaling_state(cur, RTCSignalingState::Stable, op, sd.sdp_type)?;
                    descriptions.pending_local = None;
                    descriptions.pending_remote = None;
                    next
                }
                _ => return Err(Error::ErrPeerConnStateChangeInvalid),
            }
        };

        self.signaling_state
            .store(next_state as u8, Ordering::SeqCst);
        if next_state == RTCSignalingState::Stable {
            self.is_negotiation_ongoing.store(false, Ordering::SeqCst);
            self.trigger_negotiation_needed();
        }
        self.do_signaling_state_change(next_state);
        Ok(())
    }

    pub(super) async fn set_local_description(
        self: &Arc<Self>,
        mut desc: RTCSessionDescription,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let have_local_description = self.descriptions.lock().await.current_local.is_some();

        if desc.sdp_type != RTCSdpType::Rollback {
            // JSEP 5.4
            if desc.sdp.is_empty() {
                let descriptions = self.descriptions.lock().await;
                match desc.sdp_type {
                    RTCSdpType::Answer | RTCSdpType::Pranswer => {
                        desc.sdp = descriptions.last_answer.clone()
                    }
                    RTCSdpType::Offer => desc.sdp = descriptions.last_offer.clone(),
                    _ => return Err(Error::ErrPeerConnSDPTypeInvalidValueSetLocalDescription),
                }
            }
            desc.parsed = Some(desc.unmarshal()?);
        }

        self.set_description(&desc, StateChangeOp::SetLocal).await?;

        if desc.sdp_type == RTCSdpType::Answer {
            if let Some(parsed) = &desc.parsed {
                let mut transceivers = self.rtp_transceivers.lock().await.clone();
                for media in &parsed.media_descriptions {
                    let Some(mid_value) = get_mid_value(media) else {
                        continue;
                    };
                    if media.media_name.media == MEDIA_SECTION_APPLICATION {
                        continue;
                    }
                    let Some(t) = find_by_mid(mid_value, &mut transceivers) else {
                        continue;
                    };
                    let previous_direction = t.current_direction();
                    // 4.9.1.7.3 applying a local answer
                    t.set_current_direction(get_peer_direction(media));
                    t.process_new_current_direction(previous_direction).await?;
                }
            }

            self.start_rtp_senders().await?;

            if let Some(remote_description) = self.remote_description().await {
                self.schedule_start_rtp(have_local_description, remote_description);
            }
        }

        if desc.sdp_type != RTCSdpType::Rollback
            && self.ice_gatherer.state() == RTCIceGathererState::New
        {
            self.ice_gatherer.gather().await?;
        }

        Ok(())
    }

    /// check_remote_description rejects a remote description before any
    /// state changes so a failed call leaves the connection untouched.
    fn check_remote_description(parsed: &SessionDescription) -> Result<()> {
        for media in &parsed.media_descriptions {
            if let Some(mid_value) = get_mid_value(media) {
                if mid_value.is_empty() {
                    return Err(Error::ErrPeerConnRemoteDescriptionWithoutMidValue);
                }
            }
            if RtpCodecKind::from(media.media_name.media.to_lowercase().as_str())
                != RtpCodecKind::Unspecified
            {
                codecs_from_media_description(media)?;
            }
        }
        extract_fingerprint(parsed)?;
        extract_ice_details(parsed)?;
        Ok(())
    }

    pub(super) async fn set_remote_description(
        self: &Arc<Self>,
        mut desc: RTCSessionDescription,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let is_renegotiation = self.descriptions.lock().await.current_remote.is_some();

        if desc.sdp_type != RTCSdpType::Rollback {
            let parsed = desc.unmarshal()?;
            Self::check_remote_description(&parsed)?;
            desc.parsed = Some(parsed);
        }

        self.set_description(&desc, StateChangeOp::SetRemote).await?;

        let Some(parsed) = desc.parsed.as_ref() else {
            return Ok(());
        };

        // codecs are narrowed only once the signaling state accepted the description
        self.media_engine.update_from_remote_description(parsed)?;

        let we_offer = desc.sdp_type == RTCSdpType::Answer;
        let remote_is_plan_b = description_is_plan_b(Some(&desc));

        if !remote_is_plan_b {
            let mut local_transceivers = self.rtp_transceivers.lock().await.clone();
            for media in &parsed.media_descriptions {
                let Some(mid_value) = get_mid_value(media) else {
                    continue;
                };
                if media.media_name.media == MEDIA_SECTION_APPLICATION {
                    continue;
                }

                let kind = RtpCodecKind::from(media.media_name.media.as_str());
                let direction = get_peer_direction(media);
                if kind == RtpCodecKind::Unspecified
                    || direction == RTCRtpTransceiverDirection::Unspecified
                {
                    continue;
                }

                let existing = find_by_mid(mid_value, &mut local_transceivers);

                if !we_offer {
                    let t = match existing {
                        Some(t) => t,
                        None => match satisfy_type_and_direction(
                            kind,
                            direction,
                            &mut local_transceivers,
                        ) {
                            Some(t) => t,
                            None => {
                                let local_direction =
                                    if direction == RTCRtpTransceiverDirection::Recvonly {
                                        RTCRtpTransceiverDirection::Sendonly
                                    } else {
                                        RTCRtpTransceiverDirection::Recvonly
                                    };
                                let t = self.new_transceiver(kind, local_direction, None).await;
                                t.set_mid(mid_value.to_owned())?;
                                self.add_rtp_transceiver(Arc::clone(&t)).await;
                                t
                            }
                        },
                    };
                    if t.mid().is_none() {
                        t.set_mid(mid_value.to_owned())?;
                    }
                } else {
                    let Some(t) = existing else {
                        continue;
                    };
                    // 4.5.9.2.9 the answer decides the current direction
                    let previous_direction = t.current_direction();
                    let reversed_direction = direction.reverse();
                    t.set_current_direction(reversed_direction);
                    t.process_new_current_direction(previous_direction).await?;
                }
            }
        }

        let (remote_ufrag, remote_pwd, candidates) = extract_ice_details(parsed)?;

        if is_renegotiation {
            let credentials_changed = self
                .remote_ice_credentials
                .lock()
                .await
                .as_ref()
                .is_none_or(|(ufrag, pwd)| *ufrag != remote_ufrag || *pwd != remote_pwd);
            if credentials_changed {
                // the remote peer restarted ICE
                if !we_offer {
                    self.ice_transport.restart().await?;
                }
                self.ice_transport
                    .set_remote_credentials(remote_ufrag.clone(), remote_pwd.clone())
                    .await?;
            }
        }
        *self.remote_ice_credentials.lock().await = Some((remote_ufrag.clone(), remote_pwd.clone()));

        for candidate in candidates {
            self.ice_transport
                .add_remote_candidate(Some(candidate))
                .await?;
        }

        if is_renegotiation {
            if we_offer {
                self.start_rtp_senders().await?;
                self.schedule_start_rtp(true, desc.clone());
            }
            return Ok(());
        }

        let remote_is_lite = is_lite_set(parsed);
        let fingerprint = extract_fingerprint(parsed)?;

        // RFC 8445 S6.1.1 a full agent facing a lite one is always controlling
        let local_is_lite = self.setting_engine.candidates.ice_lite;
        let ice_role = if (we_offer && remote_is_lite == local_is_lite)
            || (remote_is_lite && !local_is_lite)
        {
            RTCIceRole::Controlling
        } else {
            RTCIceRole::Controlled
        };

        if we_offer {
            self.start_rtp_senders().await?;
        }

        self.spawn_start_transports(
            ice_role,
            RTCDtlsRole::from(parsed),
            RTCIceParameters {
                username_fragment: remote_ufrag,
                password: remote_pwd,
                ice_lite: remote_is_lite,
            },
            fingerprint,
        );

        if we_offer {
            self.schedule_start_rtp(false, desc.clone());
        }

        Ok(())
    }

    /// spawn_start_transports brings up ICE, DTLS and, when negotiated, SCTP
    /// in the background. ICE blocks until connected.
    fn spawn_start_transports(
        self: &Arc<Self>,
        ice_role: RTCIceRole,
        dtls_role: RTCDtlsRole,
        remote_ice_parameters: RTCIceParameters,
        fingerprint: RTCDtlsFingerprint,
    ) {
        let weak = Arc::downgrade(self);
        let ice_transport = Arc::clone(&self.ice_transport);
        let dtls_transport = Arc::clone(&self.dtls_transport);
        tokio::spawn(async move {
            if let Err(err) = ice_transport
                .start(&remote_ice_parameters, Some(ice_role))
                .await
            {
                log::warn!("failed to start ICE transport: {err}");
                return;
            }

            if let Err(err) = dtls_transport
                .start(DTLSParameters {
                    role: dtls_role,
                    fingerprints: vec![fingerprint],
                })
                .await
            {
                log::warn!("failed to start DTLS transport: {err}");
                return;
            }

            let Some(pc) = weak.upgrade() else {
                return;
            };
            let has_application = pc
                .remote_description()
                .await
                .and_then(|d| d.parsed)
                .is_some_and(|parsed| have_application_media_section(&parsed));
            if has_application {
                pc.start_sctp().await;
            }
        });
    }

    async fn start_sctp(&self) {
        if let Err(err) = self
            .sctp_transport
            .start(SCTPTransportCapabilities {
                max_message_size: 0,
            })
            .await
        {
            log::warn!("failed to start SCTP transport: {err}");
            return;
        }

        let data_channels = self.sctp_transport.data_channels.lock().await.clone();
        let mut opened = 0;
        for dc in data_channels {
            if dc.ready_state() != RTCDataChannelState::Connecting {
                continue;
            }
            match dc.open(&self.sctp_transport).await {
                Ok(()) => opened += 1,
                Err(err) => {
                    log::warn!("failed to open data channel {}: {err}", dc.label());
                    dc.fire_error(err).await;
                }
            }
        }
        log::debug!("opened {opened} pending data channels");
    }

    /// schedule_start_rtp starts RTP once SRTP keys exist. The start itself
    /// runs as an operation so it never races a concurrent negotiation.
    fn schedule_start_rtp(self: &Arc<Self>, is_renegotiation: bool, remote: RTCSessionDescription) {
        if !is_renegotiation && self.rtp_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let weak = Arc::downgrade(self);
        let dtls_transport = Arc::clone(&self.dtls_transport);
        let mut closed_rx = self.closed_tx.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                result = dtls_transport.wait_srtp_ready() => {
                    if let Err(err) = result {
                        log::debug!("SRTP never became ready: {err}");
                        return;
                    }
                }
                _ = closed_rx.wait_for(|closed| *closed) => return,
            }

            let Some(pc) = weak.upgrade() else {
                return;
            };
            let pc2 = Arc::clone(&pc);
            let result = pc
                .ops
                .run("start_rtp", async move {
                    pc2.start_rtp(is_renegotiation, remote).await
                })
                .await;
            if let Err(err) = result {
                log::warn!("failed to start RTP: {err}");
            }
        });
    }

    async fn start_rtp(
        self: &Arc<Self>,
        is_renegotiation: bool,
        remote: RTCSessionDescription,
    ) -> Result<()> {
        let mut track_details = remote
            .parsed
            .as_ref()
            .map(|parsed| track_details_from_sdp(parsed, false))
            .unwrap_or_default();

        let transceivers = self.rtp_transceivers.lock().await.clone();

        if is_renegotiation {
            for t in &transceivers {
                let receiver = t.receiver();
                let tracks = receiver.tracks().await;
                if tracks.is_empty() {
                    continue;
                }

                let mid = t.mid().unwrap_or_default();
                let mut receiver_needs_stopped = false;
                for track in tracks {
                    let details = if !track.rid().is_empty() {
                        track_details_for_rid(&track_details, &mid, track.rid())
                    } else if track.ssrc() != 0 {
                        track_details_for_ssrc(&track_details, track.ssrc())
                    } else {
                        None
                    };

                    match details {
                        Some(details) => {
                            track.set_id(details.id.clone());
                            track.set_stream_id(details.stream_id.clone());
                        }
                        None => receiver_needs_stopped = true,
                    }
                }

                if !receiver_needs_stopped {
                    continue;
                }

                log::info!("stopping receiver of transceiver {mid}");
                if let Err(err) = receiver.stop().await {
                    log::warn!("failed to stop receiver: {err}");
                    continue;
                }
                t.set_receiver(Arc::new(self.new_receiver(t.kind())));
            }
        } else {
            // declared tracks a receiver already serves are not started twice
            for t in &transceivers {
                for track in t.receiver().tracks().await {
                    if track.ssrc() != 0 {
                        filter_track_with_ssrc(&mut track_details, track.ssrc());
                    }
                }
            }
        }

        self.start_rtp_receivers(&track_details, &transceivers, is_renegotiation)
            .await;

        if !is_renegotiation {
            self.undeclared_media_processor();
        }
        Ok(())
    }

    /// start_rtp_senders starts every negotiated sender that has a track.
    pub(super) async fn start_rtp_senders(&self) -> Result<()> {
        let transceivers = self.rtp_transceivers.lock().await.clone();
        for t in transceivers {
            let sender = t.sender();
            if sender.track().await.is_some() && sender.is_negotiated().await && !sender.has_sent()
            {
                sender.send(&sender.get_parameters().await).await?;
            }
        }
        Ok(())
    }

    async fn start_rtp_receivers(
        self: &Arc<Self>,
        incoming_tracks: &[TrackDetails],
        local_transceivers: &[Arc<RTCRtpTransceiver>],
        is_renegotiation: bool,
    ) {
        for incoming_track in incoming_tracks {
            let mut handled = false;
            for t in local_transceivers {
                if t.mid().as_deref() != Some(incoming_track.mid.as_str()) {
                    continue;
                }
                if incoming_track.kind != t.kind()
                    || (t.direction() != RTCRtpTransceiverDirection::Recvonly
                        && t.direction() != RTCRtpTransceiverDirection::Sendrecv)
                {
                    continue;
                }

                let receiver = t.receiver();
                if receiver.have_received().await {
                    if is_renegotiation {
                        handled = true;
                        break;
                    }
                    continue;
                }

                self.start_receiver(incoming_track, receiver, Arc::clone(t))
                    .await;
                handled = true;
            }

            if !handled {
                log::debug!(
                    "incoming track {} of mid {} has no receiver",
                    incoming_track.id,
                    incoming_track.mid
                );
            }
        }
    }

    /// start_receiver starts a receiver for the declared track and fires
    /// on_track once the first packet tells its payload type.
    async fn start_receiver(
        self: &Arc<Self>,
        incoming: &TrackDetails,
        receiver: Arc<RTCRtpReceiver>,
        transceiver: Arc<RTCRtpTransceiver>,
    ) {
        let mut encodings = vec![];
        for (i, ssrc) in incoming.ssrcs.iter().enumerate() {
            encodings.push(RTCRtpCodingParameters {
                ssrc: *ssrc,
                rtx: RTCRtpRtxParameters {
                    ssrc: if i == 0 { incoming.repair_ssrc } else { 0 },
                },
                ..Default::default()
            });
        }
        for rid in &incoming.rids {
            encodings.push(RTCRtpCodingParameters {
                rid: rid.clone(),
                ..Default::default()
            });
        }

        if let Err(err) = receiver.receive(&RTCRtpReceiveParameters { encodings }).await {
            log::warn!("RTPReceiver Receive failed {err}");
            return;
        }

        let tracks = receiver.tracks().await;
        for track in &tracks {
            track.set_id(incoming.id.clone());
            track.set_stream_id(incoming.stream_id.clone());
        }

        let receive_mtu = self.setting_engine.get_receive_mtu();
        for track in tracks {
            // rid tracks are announced by the undeclared SSRC probe
            if track.ssrc() == 0 {
                continue;
            }

            let weak = Arc::downgrade(self);
            let receiver = Arc::clone(&receiver);
            let transceiver = Arc::clone(&transceiver);
            tokio::spawn(async move {
                let mut b = vec![0u8; receive_mtu];
                let pkt = match track.peek(&mut b).await {
                    Ok((pkt, _)) => pkt,
                    Err(err) => {
                        log::warn!(
                            "could not determine PayloadType for SSRC {} ({})",
                            track.ssrc(),
                            err
                        );
                        return;
                    }
                };

                if let Err(err) = track.check_and_update_track(&pkt) {
                    log::warn!(
                        "failed to set codec settings for track SSRC {} ({})",
                        track.ssrc(),
                        err
                    );
                    return;
                }

                if let Some(pc) = weak.upgrade() {
                    pc.events
                        .emit(RTCPeerConnectionEvent::OnTrack(track, receiver, transceiver));
                }
            });
        }
    }

    /// undeclared_media_processor accepts the SRTP streams no receiver opened
    /// and probes them for MID and RID header extensions.
    fn undeclared_media_processor(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let dtls_transport = Arc::clone(&self.dtls_transport);
        tokio::spawn(async move {
            let Some(srtp_session) = dtls_transport.get_srtp_session().await else {
                log::warn!("undeclared media processor started without an SRTP session");
                return;
            };

            let probe_routines = Arc::new(AtomicUsize::new(0));
            loop {
                let (stream, header) = match srtp_session.accept().await {
                    Ok((stream, Some(header))) => (stream, header),
                    Ok((stream, None)) => {
                        log::warn!("accepted SRTP stream {} without a header", stream.get_ssrc());
                        continue;
                    }
                    Err(err) => {
                        log::debug!("undeclared SRTP stream accept stopped: {err}");
                        return;
                    }
                };

                let Some(pc) = weak.upgrade() else {
                    return;
                };
                if pc.is_closed() {
                    let _ = stream.close().await;
                    continue;
                }

                if probe_routines.fetch_add(1, Ordering::SeqCst) >= SIMULCAST_MAX_PROBE_ROUTINES {
                    probe_routines.fetch_sub(1, Ordering::SeqCst);
                    log::warn!("{}", Error::ErrSimulcastProbeOverflow);
                    continue;
                }

                let probe_routines = Arc::clone(&probe_routines);
                tokio::spawn(async move {
                    let ssrc = stream.get_ssrc();
                    if let Err(err) = pc
                        .handle_incoming_ssrc(stream, header.payload_type)
                        .await
                    {
                        log::warn!(
                            "incoming unhandled RTP ssrc({ssrc}), on_track will not be fired. {err}"
                        );
                    }
                    probe_routines.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        let dtls_transport = Arc::clone(&self.dtls_transport);
        tokio::spawn(async move {
            let Some(srtcp_session) = dtls_transport.get_srtcp_session().await else {
                return;
            };
            while let Ok((stream, _)) = srtcp_session.accept().await {
                log::warn!(
                    "incoming unhandled RTCP ssrc({}), on_track will not be fired",
                    stream.get_ssrc()
                );
            }
        });
    }

    /// handle_undeclared_ssrc serves a remote description with a single
    /// media section, where the SSRC need not be declared.
    async fn handle_undeclared_ssrc(
        self: &Arc<Self>,
        ssrc: SSRC,
        remote_description: &SessionDescription,
    ) -> Result<bool> {
        if remote_description.media_descriptions.len() != 1 {
            return Ok(false);
        }

        let only_media_section = &remote_description.media_descriptions[0];
        let mut stream_id = "";
        let mut id = "";
        let mut has_rid_attribute = false;
        let mut has_ssrc_attribute = false;

        for a in &only_media_section.attributes {
            match a.key.as_str() {
                ATTR_KEY_MSID => {
                    if let Some(value) = &a.value {
                        let split: Vec<&str> = value.split(' ').collect();
                        if split.len() == 2 {
                            stream_id = split[0];
                            id = split[1];
                        }
                    }
                }
                ATTR_KEY_SSRC => has_ssrc_attribute = true,
                SDP_ATTRIBUTE_RID => has_rid_attribute = true,
                _ => {}
            }
        }

        if has_rid_attribute {
            return Ok(false);
        } else if has_ssrc_attribute {
            return Err(Error::ErrPeerConnSingleMediaSectionHasExplicitSSRC);
        }

        let kind = RtpCodecKind::from(only_media_section.media_name.media.as_str());
        let incoming = TrackDetails {
            mid: get_mid_value(only_media_section).cloned().unwrap_or_default(),
            kind,
            stream_id: stream_id.to_owned(),
            id: id.to_owned(),
            ssrcs: vec![ssrc],
            ..Default::default()
        };

        let transceivers = self.rtp_transceivers.lock().await.clone();
        let existing = transceivers
            .iter()
            .find(|t| t.mid().as_deref() == Some(incoming.mid.as_str()) && t.kind() == kind)
            .cloned();
        let transceiver = match existing {
            Some(t) => t,
            None => {
                let t = self
                    .new_transceiver(kind, RTCRtpTransceiverDirection::Sendrecv, None)
                    .await;
                self.add_rtp_transceiver(Arc::clone(&t)).await;
                t
            }
        };

        if transceiver.receiver().have_received().await {
            return Err(Error::ErrPeerConnRemoteSSRCAddTransceiver);
        }
        self.start_receiver(&incoming, transceiver.receiver(), transceiver)
            .await;
        Ok(true)
    }

    async fn handle_incoming_ssrc(
        self: &Arc<Self>,
        stream: Arc<Stream>,
        payload_type: u8,
    ) -> Result<()> {
        let ssrc = stream.get_ssrc();
        let Some(remote_description) = self.remote_description().await else {
            return Err(Error::ErrPeerConnRemoteDescriptionNil);
        };
        let Some(parsed) = remote_description.parsed.as_ref() else {
            return Err(Error::ErrPeerConnRemoteDescriptionNil);
        };

        // a receiver opens declared SSRCs itself
        if track_details_for_ssrc(&track_details_from_sdp(parsed, false), ssrc).is_some() {
            return Ok(());
        }

        if self.handle_undeclared_ssrc(ssrc, parsed).await? {
            return Ok(());
        }

        let (mid_extension_id, audio_supported, video_supported) = self
            .media_engine
            .get_header_extension_id(RTCRtpHeaderExtensionCapability {
                uri: SDES_MID_URI.to_owned(),
            });
        if !audio_supported && !video_supported {
            return Err(Error::ErrPeerConnSimulcastMidRTPExtensionRequired);
        }

        let (sid_extension_id, audio_supported, video_supported) = self
            .media_engine
            .get_header_extension_id(RTCRtpHeaderExtensionCapability {
                uri: SDES_RTP_STREAM_ID_URI.to_owned(),
            });
        if !audio_supported && !video_supported {
            return Err(Error::ErrPeerConnSimulcastStreamIDRTPExtensionRequired);
        }

        let (rsid_extension_id, _, _) =
            self.media_engine
                .get_header_extension_id(RTCRtpHeaderExtensionCapability {
                    uri: SDES_REPAIR_RTP_STREAM_ID_URI.to_owned(),
                });

        let params = self
            .media_engine
            .get_rtp_parameters_by_payload_type(payload_type)?;
        let Some(codec) = params.codecs.first() else {
            return Err(Error::ErrNoCodecsAvailable);
        };
        let stream_info = create_stream_info(
            String::new(),
            ssrc,
            payload_type,
            codec.rtp_codec.clone(),
            &params.header_extensions,
            None,
            None,
        );

        let probe = &self.setting_engine.simulcast_probe;
        let deadline = tokio::time::Instant::now() + probe.duration;
        let mut buffered: VecDeque<(rtp::packet::Packet, Attributes)> = VecDeque::new();
        let mut b = vec![0u8; self.setting_engine.get_receive_mtu()];
        let (mut mid, mut rid, mut rsid) = (String::new(), String::new(), String::new());
        let mut read_count = 0;

        while read_count < probe.count && (mid.is_empty() || (rid.is_empty() && rsid.is_empty())) {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            let n = match stream.read(&mut b, Some(remaining)).await {
                Ok(n) => n,
                Err(err) if err.kind() == RTCErrorKind::Timeout => break,
                Err(err) => return Err(err),
            };

            let unknown = handle_unknown_rtp_packet(
                &b[..n],
                mid_extension_id as u8,
                sid_extension_id as u8,
                rsid_extension_id as u8,
            )?;
            if unknown.is_keepalive {
                continue;
            }
            read_count += 1;

            if !unknown.mid.is_empty() {
                mid = unknown.mid;
            }
            if !unknown.rid.is_empty() {
                rid = unknown.rid;
            }
            if !unknown.rsid.is_empty() {
                rsid = unknown.rsid;
            }

            let mut reader = &b[..n];
            let pkt = rtp::packet::Packet::unmarshal(&mut reader)?;
            buffered.push_back((pkt, Attributes::new()));
        }

        if mid.is_empty() {
            return Err(Error::ErrPeerConnSimulcastIncomingSSRCFailed);
        }

        if !rid.is_empty() && description_is_plan_b(Some(&remote_description)) {
            return Err(Error::ErrPlanBSimulcastUnsupported);
        }

        let transceivers = self.rtp_transceivers.lock().await.clone();
        let Some(transceiver) = transceivers
            .into_iter()
            .find(|t| t.mid().as_deref() == Some(mid.as_str()))
        else {
            return Err(Error::ErrPeerConnSimulcastIncomingSSRCFailed);
        };
        let receiver = transceiver.receiver();

        if !rsid.is_empty() {
            let repair_stream = receiver.streams_for_ssrc(ssrc, stream_info).await?;
            return receiver.receive_for_rtx(0, &rsid, repair_stream).await;
        }

        let first = buffered.front().map(|(pkt, _)| pkt.clone());
        let track = if !rid.is_empty() {
            let track_stream = receiver.streams_for_ssrc(ssrc, stream_info).await?;
            receiver.receive_for_rid(&rid, params, track_stream).await?
        } else {
            // a MID without RID names a single undeclared stream
            if receiver.have_received().await {
                return Err(Error::ErrPeerConnSimulcastIncomingSSRCFailed);
            }
            receiver
                .receive(&RTCRtpReceiveParameters {
                    encodings: vec![RTCRtpCodingParameters {
                        ssrc,
                        ..Default::default()
                    }],
                })
                .await?;
            let Some(track) = receiver
                .tracks()
                .await
                .into_iter()
                .find(|t| t.ssrc() == ssrc)
            else {
                return Err(Error::ErrRTPReceiverForSSRCTrackStreamNotFound);
            };
            track
        };

        track.prepopulate_peeked_data(buffered).await;
        if let Some(pkt) = first {
            track.check_and_update_track(&pkt)?;
        }

        self.events.emit(RTCPeerConnectionEvent::OnTrack(
            track,
            receiver,
            transceiver,
        ));
        Ok(())
    }

    pub(super) fn new_receiver(&self, kind: RtpCodecKind) -> RTCRtpReceiver {
        RTCRtpReceiver::new(
            self.setting_engine.get_receive_mtu(),
            kind,
            Arc::clone(&self.dtls_transport),
            Arc::clone(&self.media_engine),
            Arc::clone(&self.interceptor),
        )
    }

    pub(super) async fn new_sender(
        &self,
        kind: RtpCodecKind,
        track: Option<Arc<dyn TrackLocal + Send + Sync>>,
    ) -> RTCRtpSender {
        RTCRtpSender::new(
            self.setting_engine.get_receive_mtu(),
            track,
            kind,
            Arc::clone(&self.dtls_transport),
            Arc::clone(&self.media_engine),
            Arc::clone(&self.interceptor),
            false,
        )
        .await
    }

    /// new_transceiver builds a transceiver wired to this connection. It is
    /// not added to the transceiver list.
    pub(super) async fn new_transceiver(
        self: &Arc<Self>,
        kind: RtpCodecKind,
        direction: RTCRtpTransceiverDirection,
        track: Option<Arc<dyn TrackLocal + Send + Sync>>,
    ) -> Arc<RTCRtpTransceiver> {
        let receiver = Arc::new(self.new_receiver(kind));
        let sender = Arc::new(self.new_sender(kind, track).await);
        RTCRtpTransceiver::new(
            receiver,
            sender,
            direction,
            kind,
            vec![],
            Arc::clone(&self.media_engine),
            self.negotiation_needed_trigger(),
        )
        .await
    }

    pub(super) async fn new_transceiver_from_track(
        self: &Arc<Self>,
        direction: RTCRtpTransceiverDirection,
        track: Arc<dyn TrackLocal + Send + Sync>,
    ) -> Result<Arc<RTCRtpTransceiver>> {
        if direction != RTCRtpTransceiverDirection::Sendrecv
            && direction != RTCRtpTransceiverDirection::Sendonly
        {
            return Err(Error::ErrPeerConnAddTransceiverFromTrackSupport);
        }

        let kind = track.kind();
        let t = self.new_transceiver(kind, direction, Some(Arc::clone(&track))).await;
        t.sender()
            .associate_media_stream_id(track.stream_id().to_owned());
        Ok(t)
    }

    pub(super) async fn new_transceiver_from_kind(
        self: &Arc<Self>,
        kind: RtpCodecKind,
        direction: RTCRtpTransceiverDirection,
    ) -> Result<Arc<RTCRtpTransceiver>> {
        match direction {
            RTCRtpTransceiverDirection::Sendonly | RTCRtpTransceiverDirection::Sendrecv => {
                let codecs = self.media_engine.get_codecs_by_kind(kind);
                let Some(codec) = codecs.first() else {
                    return Err(Error::ErrNoCodecsAvailable);
                };
                let id = shared::util::math_rand_alpha(16);
                let track: Arc<dyn TrackLocal + Send + Sync> = Arc::new(
                    TrackLocalStaticSample::new(codec.rtp_codec.clone(), id.clone(), id),
                );
                self.new_transceiver_from_track(direction, track).await
            }
            RTCRtpTransceiverDirection::Recvonly => {
                Ok(self.new_transceiver(kind, direction, None).await)
            }
            _ => Err(Error::ErrPeerConnAddTransceiverFromKindSupport),
        }
    }

    /// add_rtp_transceiver appends `t` and flags that negotiation is needed.
    pub(super) async fn add_rtp_transceiver(self: &Arc<Self>, t: Arc<RTCRtpTransceiver>) {
        self.rtp_transceivers.lock().await.push(t);
        self.trigger_negotiation_needed();
    }

    /// add_track reuses an unused transceiver of the track's kind before
    /// creating a new sendrecv one.
    pub(super) async fn add_track(
        self: &Arc<Self>,
        track: Arc<dyn TrackLocal + Send + Sync>,
    ) -> Result<Arc<RTCRtpSender>> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let transceivers = self.rtp_transceivers.lock().await.clone();
        for t in transceivers {
            if t.stopped() || t.kind() != track.kind() {
                continue;
            }
            let sender = t.sender();
            if sender.track().await.is_some() {
                continue;
            }

            t.set_sending_track(Some(Arc::clone(&track))).await?;
            sender.associate_media_stream_id(track.stream_id().to_owned());
            self.trigger_negotiation_needed();
            return Ok(sender);
        }

        let t = self
            .new_transceiver_from_track(RTCRtpTransceiverDirection::Sendrecv, track)
            .await?;
        let sender = t.sender();
        self.add_rtp_transceiver(t).await;
        Ok(sender)
    }

    pub(super) async fn remove_track(self: &Arc<Self>, sender: &Arc<RTCRtpSender>) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let transceivers = self.rtp_transceivers.lock().await.clone();
        let Some(t) = transceivers
            .into_iter()
            .find(|t| Arc::ptr_eq(&t.sender(), sender))
        else {
            return Err(Error::ErrSenderNotCreatedByConnection);
        };
        if sender.track().await.is_none() {
            return Ok(());
        }

        // offers generated from here on must not announce the track
        t.set_direction_internal(if t.direction().has_recv() {
            RTCRtpTransceiverDirection::Recvonly
        } else {
            RTCRtpTransceiverDirection::Inactive
        });

        let stop_result = sender.stop().await;
        let sending_track_result = t.set_sending_track(None).await;
        stop_result?;
        sending_track_result?;

        self.trigger_negotiation_needed();
        Ok(())
    }

    pub(super) async fn create_data_channel(
        self: &Arc<Self>,
        label: &str,
        params: crate::data_channel::parameters::DataChannelParameters,
    ) -> Result<Arc<RTCDataChannel>> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        if let Some(id) = params.negotiated {
            self.sctp_transport.reserve_data_channel_id(id).await?;
        }

        let dc = Arc::new(RTCDataChannel::new(params, Arc::clone(&self.setting_engine)));
        self.sctp_transport.add_data_channel(Arc::clone(&dc)).await;
        self.data_channels_requested.fetch_add(1, Ordering::SeqCst);

        // an established association opens the channel right away
        if self.sctp_transport.state() == RTCSctpTransportState::Connected {
            dc.open(&self.sctp_transport).await?;
        }

        log::debug!("created data channel {label}");
        self.trigger_negotiation_needed();
        Ok(dc)
    }

    pub(super) fn negotiation_needed_trigger(self: &Arc<Self>) -> TriggerNegotiationNeededFnOption {
        let weak = Arc::downgrade(self);
        Some(Box::new(move || {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(pc) = weak.upgrade() {
                    pc.trigger_negotiation_needed();
                }
            })
        }))
    }

    /// Helper to trigger a negotiation needed.
    pub(super) fn trigger_negotiation_needed(self: &Arc<Self>) {
        if !self.do_negotiation_needed() {
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let result = self.ops.enqueue(Operation::new(
            move || {
                let weak = weak.clone();
                Box::pin(async move {
                    match weak.upgrade() {
                        Some(pc) => pc.negotiation_needed_op().await,
                        None => false,
                    }
                })
            },
            "negotiation_needed_op",
        ));
        if let Err(err) = result {
            log::trace!("negotiation needed not queued: {err}");
            self.negotiation_needed_state
                .store(NegotiationNeededState::Empty as u8, Ordering::SeqCst);
        }
    }

    fn do_negotiation_needed(&self) -> bool {
        // https://w3c.github.io/webrtc-pc/#updating-the-negotiation-needed-flag
        // non-canon step 1
        let previous = self
            .negotiation_needed_state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |state| {
                match NegotiationNeededState::from(state) {
                    NegotiationNeededState::Empty => Some(NegotiationNeededState::Run as u8),
                    NegotiationNeededState::Run => Some(NegotiationNeededState::Queue as u8),
                    NegotiationNeededState::Queue => None,
                }
            });
        previous == Ok(NegotiationNeededState::Empty as u8)
    }

    /// negotiation_needed_op returns true to be queued again.
    async fn negotiation_needed_op(self: &Arc<Self>) -> bool {
        // https://www.w3.org/TR/webrtc/#updating-the-negotiation-needed-flag
        // Step 2.1
        if self.is_closed() {
            return false;
        }

        // non-canon step 2.2
        if !self.ops.is_empty() {
            return true;
        }

        // Step 2.3
        if self.signaling_state() != RTCSignalingState::Stable {
            self.after_negotiation_needed_op();
            return false;
        }

        // Step 2.4
        if !self.check_negotiation_needed().await {
            self.is_negotiation_ongoing.store(false, Ordering::SeqCst);
            self.after_negotiation_needed_op();
            return false;
        }

        // Step 2.5
        if self.is_negotiation_ongoing.load(Ordering::SeqCst) {
            self.after_negotiation_needed_op();
            return false;
        }

        // Step 2.6
        self.is_negotiation_ongoing.store(true, Ordering::SeqCst);

        // Step 2.7
        self.events
            .emit(RTCPeerConnectionEvent::OnNegotiationNeededEvent);

        self.after_negotiation_needed_op();
        false
    }

    fn after_negotiation_needed_op(self: &Arc<Self>) {
        let previous: NegotiationNeededState = self
            .negotiation_needed_state
            .swap(NegotiationNeededState::Empty as u8, Ordering::SeqCst)
            .into();
        if previous == NegotiationNeededState::Queue {
            self.trigger_negotiation_needed();
        }
    }

    async fn check_negotiation_needed(&self) -> bool {
        // To check if negotiation is needed for connection, perform the following checks:
        // Skip 1, 2 steps
        if self.ice_restart_requested.load(Ordering::SeqCst) {
            return true;
        }

        // Step 3
        let (local_desc, remote_desc) = {
            let descriptions = self.descriptions.lock().await;
            (
                descriptions.current_local.clone(),
                descriptions.current_remote.clone(),
            )
        };
        let Some(local_desc) = local_desc else {
            return true;
        };

        if self.data_channels_requested.load(Ordering::SeqCst) != 0
            && have_data_channel(&local_desc).is_none()
        {
            return true;
        }

        let transceivers = self.rtp_transceivers.lock().await.clone();
        for t in &transceivers {
            let mid = t.mid();
            let m = mid.as_deref().and_then(|mid| get_by_mid(mid, &local_desc));

            if !t.stopped() {
                // Step 5.2
                let Some(m) = m else {
                    return true;
                };

                // Step 5.3.1
                if t.direction().has_send() {
                    let Some(Some(dmsid)) = m.attribute(ATTR_KEY_MSID) else {
                        return true;
                    };

                    let stream_ids = t.sender().associated_media_stream_ids();
                    let Some(first) = stream_ids.first() else {
                        return true;
                    };
                    if dmsid.split_whitespace().next() != Some(first.as_str()) {
                        return true;
                    }
                }

                match local_desc.sdp_type {
                    RTCSdpType::Offer => {
                        // Step 5.3.2
                        if let Some(remote_desc) = &remote_desc {
                            let Some(rm) = mid.as_deref().and_then(|mid| get_by_mid(mid, remote_desc))
                            else {
                                return true;
                            };
                            if get_peer_direction(m) != t.direction()
                                && get_peer_direction(rm) != t.direction().reverse()
                            {
                                return true;
                            }
                        }
                    }
                    RTCSdpType::Answer => {
                        let Some(remote_desc) = &remote_desc else {
                            return true;
                        };
                        let offered_direction = match mid
                            .as_deref()
                            .and_then(|mid| get_by_mid(mid, remote_desc))
                            .map(get_peer_direction)
                        {
                            Some(RTCRtpTransceiverDirection::Unspecified) | None => {
                                RTCRtpTransceiverDirection::Inactive
                            }
                            Some(direction) => direction,
                        };

                        // Step 5.3.3
                        if get_peer_direction(m) != t.direction().intersect(offered_direction.reverse())
                        {
                            return true;
                        }
                    }
                    _ => {}
                }
            } else {
                // Step 5.4
                let Some(search_mid) = mid else {
                    continue;
                };
                if let Some(remote_desc) = &remote_desc {
                    if get_by_mid(&search_mid, &local_desc).is_some()
                        || get_by_mid(&search_mid, remote_desc).is_some()
                    {
                        return true;
                    }
                }
            }
        }

        // Step 6
        false
    }

    /// close tears the connection down in dependency order: media first,
    /// then data channels and the transport stack from the top.
    pub(super) async fn close(self: &Arc<Self>) -> Result<()> {
        // https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-close (step #1)
        // https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-close (step #2)
        if self.is_closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.closed_tx.send_replace(true);

        // https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-close (step #3)
        self.signaling_state
            .store(RTCSignalingState::Closed as u8, Ordering::SeqCst);
        self.do_signaling_state_change(RTCSignalingState::Closed);

        let mut close_errs: Vec<Error> = vec![];

        // https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-close (step #4)
        let transceivers = self.rtp_transceivers.lock().await.clone();
        for t in &transceivers {
            if let Err(err) = t.sender().stop().await {
                close_errs.push(err);
            }
        }
        for t in &transceivers {
            if let Err(err) = t.receiver().stop().await {
                close_errs.push(err);
            }
        }
        for t in &transceivers {
            if let Err(err) = t.stop().await {
                close_errs.push(err);
            }
        }

        // https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-close (step #5)
        let data_channels = self.sctp_transport.data_channels.lock().await.clone();
        for dc in data_channels {
            if let Err(err) = dc.close().await {
                close_errs.push(err);
            }
        }

        // https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-close (step #6)
        if let Err(err) = self.sctp_transport.stop().await {
            close_errs.push(err);
        }

        // https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-close (step #7)
        if let Err(err) = self.dtls_transport.stop().await {
            close_errs.push(err);
        }

        // https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-close (step #8, #9, #10)
        if let Err(err) = self.ice_transport.stop().await {
            close_errs.push(err);
        }
        self.do_ice_connection_state_change(RTCIceConnectionState::Closed);

        if let Err(err) = self.interceptor.close().await {
            close_errs.push(err);
        }

        // https://www.w3.org/TR/webrtc/#dom-rtcpeerconnection-close (step #11)
        self.update_connection_state(self.ice_connection_state(), self.dtls_transport.state());

        self.ops.close();

        flatten_errs(close_errs)
    }
}
