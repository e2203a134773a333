//! Session description types and the mapping between a PeerConnection's
//! transceiver graph and SDP.
//!
//! [`RTCSessionDescription`] and [`RTCSdpType`] are the public face of this
//! module. The crate-internal helpers build local descriptions
//! ([`populate_sdp`]) and read back what a remote description declares:
//! tracks, fingerprints, ICE credentials, simulcast layers and codecs.

#[cfg(test)]
mod sdp_test;

pub mod sdp_type;
pub mod session_description;

use std::collections::HashMap;
use std::fmt;
use std::io::BufReader;
use std::sync::Arc;

use sdp::description::common::{Address, Attribute, ConnectionInformation};
use sdp::description::media::{MediaDescription, MediaName, RangedPort};
use sdp::description::session::*;
use sdp::extmap::ExtMap;
use sdp::util::ConnectionRole;

pub use sdp_type::RTCSdpType;
pub use session_description::RTCSessionDescription;

use crate::peer_connection::configuration::media_engine::MediaEngine;
use crate::peer_connection::state::RTCIceGatheringState;
use crate::peer_connection::transport::{RTCDtlsFingerprint, RTCIceCandidate, RTCIceParameters};
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::rtp_codec::{
    RTCPFeedback, RTCRtpCodec, RTCRtpCodecParameters, RtpCodecKind,
};
use crate::rtp_transceiver::{PayloadType, RTCRtpTransceiver, SSRC};
use crate::constants::{SDP_ATTRIBUTE_RID, SDP_ATTRIBUTE_SIMULCAST};
use shared::error::{Error, Result};

pub(crate) const MEDIA_SECTION_APPLICATION: &str = "application";

const ATTR_KEY_FINGERPRINT: &str = "fingerprint";
const ATTR_KEY_ICE_UFRAG: &str = "ice-ufrag";
const ATTR_KEY_ICE_PWD: &str = "ice-pwd";
const ATTR_KEY_RTCP_FB: &str = "rtcp-fb";

/// TrackDetails represents any media source that can be represented in a SDP
/// This isn't keyed by SSRC because it also needs to support rid based sources
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) struct TrackDetails {
    pub(crate) mid: String,
    pub(crate) kind: RtpCodecKind,
    pub(crate) stream_id: String,
    pub(crate) id: String,
    pub(crate) ssrcs: Vec<SSRC>,
    pub(crate) repair_ssrc: SSRC,
    pub(crate) rids: Vec<String>,
}

pub(crate) fn track_details_for_ssrc(
    track_details: &[TrackDetails],
    ssrc: SSRC,
) -> Option<&TrackDetails> {
    track_details.iter().find(|x| x.ssrcs.contains(&ssrc))
}

pub(crate) fn track_details_for_rid<'a>(
    track_details: &'a [TrackDetails],
    mid: &str,
    rid: &str,
) -> Option<&'a TrackDetails> {
    track_details
        .iter()
        .find(|x| x.mid == mid && x.rids.iter().any(|r| r == rid))
}

pub(crate) fn filter_track_with_ssrc(incoming_tracks: &mut Vec<TrackDetails>, ssrc: SSRC) {
    incoming_tracks.retain(|x| !x.ssrcs.contains(&ssrc));
}

/// track_details_from_sdp extracts every track a remote description declares.
///
/// RTX repair flows announced with `a=ssrc-group:FID` are attached to their
/// primary instead of becoming tracks. A section announcing rids collapses
/// into a single simulcast track carrying them.
pub(crate) fn track_details_from_sdp(
    s: &SessionDescription,
    exclude_inactive: bool,
) -> Vec<TrackDetails> {
    let mut incoming_tracks = vec![];

    for media in &s.media_descriptions {
        let mut tracks_in_media_section: Vec<TrackDetails> = vec![];
        let mut rtx_repair_flows: HashMap<SSRC, SSRC> = HashMap::new();

        let mut stream_id = "";
        let mut track_id = "";

        if media.attribute(ATTR_KEY_RECV_ONLY).is_some()
            || (exclude_inactive && media.attribute(ATTR_KEY_INACTIVE).is_some())
        {
            continue;
        }

        let Some(mid_value) = get_mid_value(media) else {
            continue;
        };

        let kind = RtpCodecKind::from(media.media_name.media.as_str());
        if kind == RtpCodecKind::Unspecified {
            continue;
        }

        for attr in &media.attributes {
            let Some(value) = &attr.value else {
                continue;
            };
            match attr.key.as_str() {
                ATTR_KEY_SSRCGROUP => {
                    let split: Vec<&str> = value.split(' ').collect();
                    if split[0] == SEMANTIC_TOKEN_FLOW_IDENTIFICATION && split.len() == 3 {
                        let (Ok(base_ssrc), Ok(rtx_repair_flow)) =
                            (split[1].parse::<SSRC>(), split[2].parse::<SSRC>())
                        else {
                            log::warn!("failed to parse SSRC group {value}");
                            continue;
                        };
                        rtx_repair_flows.insert(rtx_repair_flow, base_ssrc);
                        // drop it if the repair flow was already added as a track
                        filter_track_with_ssrc(&mut tracks_in_media_section, rtx_repair_flow);
                    }
                }

                // `a=msid:<stream_id> <track_id>`
                ATTR_KEY_MSID => {
                    let mut split = value.split(' ');
                    if let (Some(sid), Some(tid), None) = (split.next(), split.next(), split.next())
                    {
                        stream_id = sid;
                        track_id = tid;
                    }
                }

                ATTR_KEY_SSRC => {
                    let split: Vec<&str> = value.split(' ').collect();
                    let ssrc = match split[0].parse::<SSRC>() {
                        Ok(ssrc) => ssrc,
                        Err(err) => {
                            log::warn!("failed to parse SSRC {}: {err}", split[0]);
                            continue;
                        }
                    };

                    if rtx_repair_flows.contains_key(&ssrc) {
                        continue;
                    }

                    if split.len() == 3 {
                        if let Some(sid) = split[1].strip_prefix("msid:") {
                            stream_id = sid;
                            track_id = split[2];
                        }
                    }

                    match tracks_in_media_section
                        .iter_mut()
                        .find(|t| t.ssrcs.contains(&ssrc))
                    {
                        Some(t) => {
                            t.stream_id = stream_id.to_owned();
                            t.id = track_id.to_owned();
                        }
                        None => tracks_in_media_section.push(TrackDetails {
                            mid: mid_value.to_owned(),
                            kind,
                            stream_id: stream_id.to_owned(),
                            id: track_id.to_owned(),
                            ssrcs: vec![ssrc],
                            ..Default::default()
                        }),
                    }
                }
                _ => {}
            }
        }

        for (repair, base) in &rtx_repair_flows {
            for track in &mut tracks_in_media_section {
                if track.ssrcs.contains(base) {
                    track.repair_ssrc = *repair;
                }
            }
        }

        let rids = get_rids(media);
        if !rids.is_empty() && !track_id.is_empty() && !stream_id.is_empty() {
            tracks_in_media_section = vec![TrackDetails {
                mid: mid_value.to_owned(),
                kind,
                stream_id: stream_id.to_owned(),
                id: track_id.to_owned(),
                rids: rids.into_iter().map(|r| r.id).collect(),
                ..Default::default()
            }];
        }

        incoming_tracks.extend(tracks_in_media_section);
    }

    incoming_tracks
}

/// SimulcastDirection is the `rid-dir` of an `a=rid` line (RFC 8851).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum SimulcastDirection {
    Send,
    Recv,
}

impl TryFrom<&str> for SimulcastDirection {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "send" => Ok(SimulcastDirection::Send),
            "recv" => Ok(SimulcastDirection::Recv),
            _ => Err(Error::SimulcastRidParseErrorUnknownDirection),
        }
    }
}

impl fmt::Display for SimulcastDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulcastDirection::Send => write!(f, "send"),
            SimulcastDirection::Recv => write!(f, "recv"),
        }
    }
}

/// SimulcastRid is one `a=rid` line of a media section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SimulcastRid {
    pub(crate) id: String,
    pub(crate) direction: SimulcastDirection,
    pub(crate) params: String,
    pub(crate) paused: bool,
}

impl TryFrom<&str> for SimulcastRid {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        let mut split = value.split_whitespace();
        let (Some(id), Some(direction)) = (split.next(), split.next()) else {
            return Err(Error::SimulcastRidParseErrorSyntaxIdDirSplit);
        };

        Ok(SimulcastRid {
            id: id.to_owned(),
            direction: SimulcastDirection::try_from(direction)?,
            params: split.collect::<Vec<_>>().join(" "),
            paused: false,
        })
    }
}

/// get_rids returns the rids of a media section in declaration order.
/// Layers listed with a `~` prefix in `a=simulcast` are marked paused;
/// malformed rid lines are skipped.
pub(crate) fn get_rids(media: &MediaDescription) -> Vec<SimulcastRid> {
    let mut rids: Vec<SimulcastRid> = vec![];
    let mut paused = vec![];

    for attr in &media.attributes {
        let Some(value) = &attr.value else {
            continue;
        };
        match attr.key.as_str() {
            SDP_ATTRIBUTE_RID => match SimulcastRid::try_from(value.as_str()) {
                Ok(rid) if !rids.iter().any(|r| r.id == rid.id) => rids.push(rid),
                Ok(_) => {}
                Err(err) => log::warn!("failed to parse rid {value}: {err}"),
            },
            SDP_ATTRIBUTE_SIMULCAST => {
                for layer in value.split([' ', ';', ',']) {
                    if let Some(id) = layer.strip_prefix('~') {
                        paused.push(id.to_owned());
                    }
                }
            }
            _ => {}
        }
    }

    for rid in &mut rids {
        rid.paused = paused.contains(&rid.id);
    }

    rids
}

pub(crate) fn add_candidates_to_media_descriptions(
    candidates: &[RTCIceCandidate],
    mut m: MediaDescription,
    ice_gathering_state: RTCIceGatheringState,
) -> MediaDescription {
    for c in candidates {
        let mut candidate = c.clone();
        candidate.component = 1;
        let marshaled = candidate.marshal();
        let is_new = !m
            .attributes
            .iter()
            .any(|a| a.is_ice_candidate() && a.value.as_deref() == Some(marshaled.as_str()));
        if is_new {
            m = m.with_value_attribute(ATTR_KEY_CANDIDATE.to_owned(), marshaled);
        }
    }

    if ice_gathering_state != RTCIceGatheringState::Complete
        || m.attributes.iter().any(|a| a.key == ATTR_KEY_END_OF_CANDIDATES)
    {
        return m;
    }

    m.with_property_attribute(ATTR_KEY_END_OF_CANDIDATES.to_owned())
}

pub(crate) struct AddDataMediaSectionParams {
    pub(crate) should_add_candidates: bool,
    pub(crate) mid_value: String,
    pub(crate) ice_params: RTCIceParameters,
    pub(crate) dtls_role: ConnectionRole,
    pub(crate) ice_gathering_state: RTCIceGatheringState,
}

pub(crate) fn add_data_media_section(
    d: SessionDescription,
    dtls_fingerprints: &[RTCDtlsFingerprint],
    candidates: &[RTCIceCandidate],
    params: AddDataMediaSectionParams,
) -> SessionDescription {
    let mut media = MediaDescription {
        media_name: MediaName {
            media: MEDIA_SECTION_APPLICATION.to_owned(),
            port: RangedPort {
                value: 9,
                range: None,
            },
            protos: vec!["UDP".to_owned(), "DTLS".to_owned(), "SCTP".to_owned()],
            formats: vec!["webrtc-datachannel".to_owned()],
        },
        media_title: None,
        connection_information: Some(unspecified_connection_information()),
        bandwidth: vec![],
        encryption_key: None,
        attributes: vec![],
    }
    .with_value_attribute(
        ATTR_KEY_CONNECTION_SETUP.to_owned(),
        params.dtls_role.to_string(),
    )
    .with_value_attribute(ATTR_KEY_MID.to_owned(), params.mid_value)
    .with_property_attribute(RTCRtpTransceiverDirection::Sendrecv.to_string())
    .with_property_attribute("sctp-port:5000".to_owned())
    .with_ice_credentials(
        params.ice_params.username_fragment,
        params.ice_params.password,
    );

    for f in dtls_fingerprints {
        media = media.with_fingerprint(f.algorithm.clone(), f.value.to_uppercase());
    }

    if params.should_add_candidates {
        media = add_candidates_to_media_descriptions(candidates, media, params.ice_gathering_state);
    }

    d.with_media(media)
}

fn unspecified_connection_information() -> ConnectionInformation {
    ConnectionInformation {
        network_type: "IN".to_owned(),
        address_type: "IP4".to_owned(),
        address: Some(Address {
            address: "0.0.0.0".to_owned(),
            ttl: None,
            range: None,
        }),
    }
}

/// populate_local_candidates adds the gathered candidates to the first media
/// section of `description` and marks it complete once gathering is done.
pub(crate) fn populate_local_candidates(
    description: Option<&RTCSessionDescription>,
    candidates: &[RTCIceCandidate],
    ice_gathering_state: RTCIceGatheringState,
) -> Option<RTCSessionDescription> {
    let description = description?;
    let Some(mut parsed) = description.parsed.clone() else {
        return Some(description.clone());
    };

    if let Some(m) = parsed.media_descriptions.first_mut() {
        *m = add_candidates_to_media_descriptions(candidates, m.clone(), ice_gathering_state);
    }

    Some(RTCSessionDescription {
        sdp_type: description.sdp_type,
        sdp: parsed.marshal(),
        parsed: Some(parsed),
    })
}

pub(crate) struct AddTransceiverSdpParams {
    pub(crate) should_add_candidates: bool,
    pub(crate) mid_value: String,
    pub(crate) dtls_role: ConnectionRole,
    pub(crate) ice_gathering_state: RTCIceGatheringState,
    pub(crate) offered_direction: Option<RTCRtpTransceiverDirection>,
}

/// add_transceiver_sdp appends the media section of `media_section` to `d`.
/// The returned flag is false when the section was rejected (port 0) and
/// must stay out of the BUNDLE group.
pub(crate) async fn add_transceiver_sdp(
    mut d: SessionDescription,
    dtls_fingerprints: &[RTCDtlsFingerprint],
    media_engine: &Arc<MediaEngine>,
    ice_params: &RTCIceParameters,
    candidates: &[RTCIceCandidate],
    media_section: &MediaSection,
    is_plan_b: bool,
    params: AddTransceiverSdpParams,
) -> Result<(SessionDescription, bool)> {
    let transceivers = &media_section.transceivers;
    let Some(t) = transceivers.first() else {
        return Err(Error::ErrSDPZeroTransceivers);
    };

    let mut media = MediaDescription::new_jsep_media_description(t.kind().to_string(), vec![])
        .with_value_attribute(
            ATTR_KEY_CONNECTION_SETUP.to_owned(),
            params.dtls_role.to_string(),
        )
        .with_value_attribute(ATTR_KEY_MID.to_owned(), params.mid_value.clone())
        .with_ice_credentials(
            ice_params.username_fragment.clone(),
            ice_params.password.clone(),
        )
        .with_property_attribute(ATTR_KEY_RTCPMUX.to_owned())
        .with_property_attribute(ATTR_KEY_RTCPRSIZE.to_owned());

    let codecs = t.get_codecs().await;
    for codec in &codecs {
        let name = codec
            .rtp_codec
            .mime_type
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(codec.rtp_codec.mime_type.as_str())
            .to_owned();
        media = media.with_codec(
            codec.payload_type,
            name,
            codec.rtp_codec.clock_rate,
            codec.rtp_codec.channels,
            codec.rtp_codec.sdp_fmtp_line.clone(),
        );

        for feedback in &codec.rtp_codec.rtcp_feedback {
            let value = if feedback.parameter.is_empty() {
                format!("{} {}", codec.payload_type, feedback.typ)
            } else {
                format!(
                    "{} {} {}",
                    codec.payload_type, feedback.typ, feedback.parameter
                )
            };
            media = media.with_value_attribute(ATTR_KEY_RTCP_FB.to_owned(), value);
        }
    }

    if codecs.is_empty() {
        if t.sender().track().await.is_some() {
            return Err(Error::ErrSenderWithNoCodecs);
        }

        // no shared codec: reject the section
        d = d.with_media(MediaDescription {
            media_name: MediaName {
                media: t.kind().to_string(),
                port: RangedPort {
                    value: 0,
                    range: None,
                },
                protos: vec![
                    "UDP".to_owned(),
                    "TLS".to_owned(),
                    "RTP".to_owned(),
                    "SAVPF".to_owned(),
                ],
                formats: vec!["0".to_owned()],
            },
            media_title: None,
            connection_information: Some(unspecified_connection_information()),
            bandwidth: vec![],
            encryption_key: None,
            attributes: vec![],
        });
        return Ok((d, false));
    }

    let parameters = media_engine.get_rtp_parameters_by_kind(t.kind(), t.direction());
    for extension in &parameters.header_extensions {
        media = media.with_value_attribute(
            ATTR_KEY_EXT_MAP.to_owned(),
            format!("{} {}", extension.id, extension.uri),
        );
    }

    if !media_section.rid_map.is_empty() {
        let mut recv_rids = Vec::with_capacity(media_section.rid_map.len());
        for rid in &media_section.rid_map {
            media = media.with_value_attribute(
                SDP_ATTRIBUTE_RID.to_owned(),
                format!("{} {}", rid.id, SimulcastDirection::Recv),
            );
            recv_rids.push(rid.id.as_str());
        }
        media = media.with_value_attribute(
            SDP_ATTRIBUTE_SIMULCAST.to_owned(),
            format!("{} {}", SimulcastDirection::Recv, recv_rids.join(";")),
        );
    }

    for mt in transceivers {
        let sender = mt.sender();
        if let Some(track) = sender.track().await {
            let send_parameters = sender.get_parameters().await;
            for encoding in &send_parameters.encodings {
                media = media.with_media_source(
                    encoding.ssrc,
                    track.stream_id().to_owned(), /* cname */
                    track.stream_id().to_owned(), /* streamLabel */
                    track.id().to_owned(),
                );
                if encoding.rtx.ssrc != 0 {
                    media = media
                        .with_media_source(
                            encoding.rtx.ssrc,
                            track.stream_id().to_owned(),
                            track.stream_id().to_owned(),
                            track.id().to_owned(),
                        )
                        .with_value_attribute(
                            ATTR_KEY_SSRCGROUP.to_owned(),
                            format!(
                                "{SEMANTIC_TOKEN_FLOW_IDENTIFICATION} {} {}",
                                encoding.ssrc, encoding.rtx.ssrc
                            ),
                        );
                }
            }

            if send_parameters.encodings.len() > 1 {
                let mut send_rids = Vec::with_capacity(send_parameters.encodings.len());
                for encoding in &send_parameters.encodings {
                    media = media.with_value_attribute(
                        SDP_ATTRIBUTE_RID.to_owned(),
                        format!("{} {}", encoding.rid, SimulcastDirection::Send),
                    );
                    send_rids.push(encoding.rid.clone());
                }
                media = media.with_value_attribute(
                    SDP_ATTRIBUTE_SIMULCAST.to_owned(),
                    format!("{} {}", SimulcastDirection::Send, send_rids.join(";")),
                );
            }

            if !is_plan_b && sender.initial_track_id().is_none() {
                sender.set_initial_track_id(track.id().to_owned())?;
            }
        }

        if !is_plan_b {
            // the msid stays stable across renegotiations even if the track changes
            if let Some(track_id) = sender.initial_track_id() {
                for stream_id in sender.associated_media_stream_ids() {
                    media = media.with_value_attribute(
                        ATTR_KEY_MSID.to_owned(),
                        format!("{stream_id} {track_id}"),
                    );
                }
                break;
            }
        }
    }

    let direction = match params.offered_direction {
        Some(offered_direction) => t.direction().answer_to(offered_direction),
        // offers reflect the transceiver direction directly, even for re-offers
        None => t.direction(),
    };
    media = media.with_property_attribute(direction.to_string());

    for fingerprint in dtls_fingerprints {
        media = media.with_fingerprint(
            fingerprint.algorithm.clone(),
            fingerprint.value.to_uppercase(),
        );
    }

    if params.should_add_candidates {
        media = add_candidates_to_media_descriptions(candidates, media, params.ice_gathering_state);
    }

    Ok((d.with_media(media), true))
}

/// MediaSection is one `m=` line to generate: the transceivers feeding it
/// (several only under Plan-B), or the DataChannel section.
#[derive(Default, Debug, Clone)]
pub(crate) struct MediaSection {
    pub(crate) id: String,
    pub(crate) transceivers: Vec<Arc<RTCRtpTransceiver>>,
    pub(crate) data: bool,
    pub(crate) rid_map: Vec<SimulcastRid>,
    pub(crate) offered_direction: Option<RTCRtpTransceiverDirection>,
}

pub(crate) struct PopulateSdpParams {
    pub(crate) is_plan_b: bool,
    pub(crate) media_description_fingerprint: bool,
    pub(crate) is_ice_lite: bool,
    pub(crate) connection_role: ConnectionRole,
    pub(crate) ice_gathering_state: RTCIceGatheringState,
    /// When answering, the BUNDLE group of the offer; only mids it contains
    /// are bundled. `None` bundles every accepted section.
    pub(crate) match_bundle_group: Option<String>,
}

/// populate_sdp serializes a PeerConnections state into an SDP
pub(crate) async fn populate_sdp(
    mut d: SessionDescription,
    dtls_fingerprints: &[RTCDtlsFingerprint],
    media_engine: &Arc<MediaEngine>,
    candidates: &[RTCIceCandidate],
    ice_params: &RTCIceParameters,
    media_sections: &[MediaSection],
    params: PopulateSdpParams,
) -> Result<SessionDescription> {
    let media_dtls_fingerprints = if params.media_description_fingerprint {
        dtls_fingerprints.to_vec()
    } else {
        vec![]
    };

    let mut bundle_value = "BUNDLE".to_owned();
    let mut bundle_count = 0;
    let bundle_mids: Option<Vec<&str>> = params
        .match_bundle_group
        .as_deref()
        .map(|group| group.split_whitespace().skip(1).collect());
    let mut append_bundle = |mid_value: &str| {
        let in_group = bundle_mids
            .as_ref()
            .map(|mids| mids.contains(&mid_value))
            .unwrap_or(true);
        if in_group {
            bundle_value = bundle_value.clone() + " " + mid_value;
            bundle_count += 1;
        }
    };

    for (i, m) in media_sections.iter().enumerate() {
        if m.data && !m.transceivers.is_empty() {
            return Err(Error::ErrSDPMediaSectionMediaDataChanInvalid);
        } else if !params.is_plan_b && m.transceivers.len() > 1 {
            return Err(Error::ErrSDPMediaSectionMultipleTrackInvalid);
        }

        let should_add_candidates = i == 0;

        let should_add_id = if m.data {
            d = add_data_media_section(
                d,
                &media_dtls_fingerprints,
                candidates,
                AddDataMediaSectionParams {
                    should_add_candidates,
                    mid_value: m.id.clone(),
                    ice_params: ice_params.clone(),
                    dtls_role: params.connection_role,
                    ice_gathering_state: params.ice_gathering_state,
                },
            );
            true
        } else {
            let (d1, should_add_id) = add_transceiver_sdp(
                d,
                &media_dtls_fingerprints,
                media_engine,
                ice_params,
                candidates,
                m,
                params.is_plan_b,
                AddTransceiverSdpParams {
                    should_add_candidates,
                    mid_value: m.id.clone(),
                    dtls_role: params.connection_role,
                    ice_gathering_state: params.ice_gathering_state,
                    offered_direction: m.offered_direction,
                },
            )
            .await?;
            d = d1;
            should_add_id
        };

        if should_add_id {
            append_bundle(&m.id);
        }
    }

    if !params.media_description_fingerprint {
        for fingerprint in dtls_fingerprints {
            d = d.with_fingerprint(
                fingerprint.algorithm.clone(),
                fingerprint.value.to_uppercase(),
            );
        }
    }

    if params.is_ice_lite {
        // RFC 5245 S15.3
        d = d.with_value_attribute(ATTR_KEY_ICELITE.to_owned(), ATTR_KEY_ICELITE.to_owned());
    }

    if bundle_count > 0 {
        d = d.with_value_attribute(ATTR_KEY_GROUP.to_owned(), bundle_value);
    }

    Ok(d)
}

pub(crate) fn get_mid_value(media: &MediaDescription) -> Option<&String> {
    media
        .attributes
        .iter()
        .find(|attr| attr.key == ATTR_KEY_MID)
        .and_then(|attr| attr.value.as_ref())
}

pub(crate) fn get_peer_direction(media: &MediaDescription) -> RTCRtpTransceiverDirection {
    for a in &media.attributes {
        let direction = RTCRtpTransceiverDirection::from(a.key.as_str());
        if direction != RTCRtpTransceiverDirection::Unspecified {
            return direction;
        }
    }
    RTCRtpTransceiverDirection::Unspecified
}

/// values_of yields the value of every attribute named `key`, in order.
fn values_of<'a>(attributes: &'a [Attribute], key: &'a str) -> impl Iterator<Item = &'a str> {
    attributes
        .iter()
        .filter(move |a| a.key == key)
        .filter_map(|a| a.value.as_deref())
}

/// values_at_every_level collects `key` from the session and from each media
/// section. Repeated attributes at one level are all kept.
fn values_at_every_level<'a>(desc: &'a SessionDescription, key: &'a str) -> Vec<&'a str> {
    values_of(&desc.attributes, key)
        .chain(
            desc.media_descriptions
                .iter()
                .flat_map(move |m| values_of(&m.attributes, key)),
        )
        .collect()
}

/// extract_fingerprint returns the fingerprint every level of `desc` agrees
/// on.
pub(crate) fn extract_fingerprint(desc: &SessionDescription) -> Result<RTCDtlsFingerprint> {
    let fingerprints = values_at_every_level(desc, ATTR_KEY_FINGERPRINT);

    let Some(first) = fingerprints.first() else {
        return Err(Error::ErrSessionDescriptionNoFingerprint);
    };

    if fingerprints
        .iter()
        .any(|f| !f.eq_ignore_ascii_case(first))
    {
        return Err(Error::ErrSessionDescriptionConflictingFingerprints);
    }

    RTCDtlsFingerprint::parse(first)
}

/// extract_ice_details returns the ICE ufrag and pwd every level of `desc`
/// agrees on, together with the candidates embedded in its media sections.
pub(crate) fn extract_ice_details(
    desc: &SessionDescription,
) -> Result<(String, String, Vec<RTCIceCandidate>)> {
    let remote_ufrags = values_at_every_level(desc, ATTR_KEY_ICE_UFRAG);
    let remote_pwds = values_at_every_level(desc, ATTR_KEY_ICE_PWD);

    let mut candidates = vec![];
    for m in &desc.media_descriptions {
        for a in &m.attributes {
            if a.is_ice_candidate() {
                if let Some(value) = &a.value {
                    candidates.push(RTCIceCandidate::unmarshal(value)?);
                }
            }
        }
    }

    let Some(ufrag) = remote_ufrags.first() else {
        return Err(Error::ErrSessionDescriptionMissingIceUfrag);
    };
    let Some(pwd) = remote_pwds.first() else {
        return Err(Error::ErrSessionDescriptionMissingIcePwd);
    };

    if remote_ufrags.iter().any(|u| u != ufrag) {
        return Err(Error::ErrSessionDescriptionConflictingIceUfrag);
    }
    if remote_pwds.iter().any(|p| p != pwd) {
        return Err(Error::ErrSessionDescriptionConflictingIcePwd);
    }

    Ok(((*ufrag).to_owned(), (*pwd).to_owned(), candidates))
}

pub(crate) fn have_application_media_section(desc: &SessionDescription) -> bool {
    desc.media_descriptions
        .iter()
        .any(|m| m.media_name.media == MEDIA_SECTION_APPLICATION)
}

pub(crate) fn get_by_mid<'a>(
    search_mid: &str,
    desc: &'a RTCSessionDescription,
) -> Option<&'a MediaDescription> {
    desc.parsed.as_ref()?.media_descriptions.iter().find(|m| {
        matches!(m.attribute(ATTR_KEY_MID), Some(Some(mid)) if mid == search_mid)
    })
}

/// have_data_channel return MediaDescription with MediaName equal application
pub(crate) fn have_data_channel(desc: &RTCSessionDescription) -> Option<&MediaDescription> {
    desc.parsed
        .as_ref()?
        .media_descriptions
        .iter()
        .find(|d| d.media_name.media == MEDIA_SECTION_APPLICATION)
}

/// is_lite_set reports whether the session announces `a=ice-lite`.
pub(crate) fn is_lite_set(desc: &SessionDescription) -> bool {
    desc.attributes.iter().any(|a| a.key.trim() == ATTR_KEY_ICELITE)
}

/// description_is_plan_b detects a Plan-B description: a media section
/// named after its kind (`mid:audio`, `mid:video`, `mid:data`) or one that
/// carries the ssrcs of several tracks.
pub(crate) fn description_is_plan_b(desc: Option<&RTCSessionDescription>) -> bool {
    let Some(parsed) = desc.and_then(|d| d.parsed.as_ref()) else {
        return false;
    };

    parsed.media_descriptions.iter().any(|media| {
        let named_after_kind = get_mid_value(media)
            .map(|mid| {
                ["audio", "video", "data"]
                    .iter()
                    .any(|kind| mid.eq_ignore_ascii_case(kind))
            })
            .unwrap_or(false);
        named_after_kind || declared_track_ids(media).len() > 1
    })
}

fn declared_track_ids(media: &MediaDescription) -> Vec<&str> {
    let mut ids = vec![];
    for attr in &media.attributes {
        if attr.key != ATTR_KEY_SSRC {
            continue;
        }
        let Some(value) = &attr.value else {
            continue;
        };
        let split: Vec<&str> = value.split(' ').collect();
        if split.len() == 3 && split[1].starts_with("msid:") && !ids.contains(&split[2]) {
            ids.push(split[2]);
        }
    }
    ids
}

pub(crate) fn codecs_from_media_description(
    m: &MediaDescription,
) -> Result<Vec<RTCRtpCodecParameters>> {
    let s = SessionDescription {
        media_descriptions: vec![m.clone()],
        ..Default::default()
    };

    let mut out = vec![];
    for payload_str in &m.media_name.formats {
        let payload_type: PayloadType = payload_str.parse::<u8>()?;
        let codec = match s.get_codec_for_payload_type(payload_type) {
            Ok(codec) => codec,
            Err(err) => {
                // static payload type 0 may be listed without an rtpmap
                if payload_type == 0 {
                    continue;
                }
                return Err(err.into());
            }
        };

        let channels = codec.encoding_parameters.parse::<u16>().unwrap_or(0);

        let rtcp_feedback = codec
            .rtcp_feedback
            .iter()
            .map(|raw| {
                let mut split = raw.splitn(2, ' ');
                RTCPFeedback {
                    typ: split.next().unwrap_or_default().to_owned(),
                    parameter: split.next().unwrap_or_default().to_owned(),
                }
            })
            .collect();

        out.push(RTCRtpCodecParameters {
            rtp_codec: RTCRtpCodec {
                mime_type: m.media_name.media.clone() + "/" + codec.name.as_str(),
                clock_rate: codec.clock_rate,
                channels,
                sdp_fmtp_line: codec.fmtp.clone(),
                rtcp_feedback,
            },
            payload_type,
            stats_id: String::new(),
        });
    }

    Ok(out)
}

/// rtp_extensions_from_media_description returns the `(uri, id)` pairs of
/// the `a=extmap` lines of a media section.
pub(crate) fn rtp_extensions_from_media_description(
    m: &MediaDescription,
) -> Result<Vec<(String, u16)>> {
    let mut out = vec![];
    for a in &m.attributes {
        if a.key == ATTR_KEY_EXT_MAP {
            let a_str = a.to_string();
            let mut reader = BufReader::new(a_str.as_bytes());
            let e = ExtMap::unmarshal(&mut reader)?;

            if let Some(uri) = e.uri {
                out.push((uri.to_string(), e.value as u16));
            }
        }
    }

    Ok(out)
}

/// update_sdp_origin keeps the session id stable across the descriptions a
/// PeerConnection generates and bumps the session version for each new one.
pub(crate) fn update_sdp_origin(origin: &mut Origin, d: &mut SessionDescription) {
    if origin.session_version == 0 {
        origin.session_version = d.origin.session_version;
        origin.session_id = d.origin.session_id;
    } else {
        origin.session_version += 1;
        d.origin.session_id = origin.session_id;
        d.origin.session_version = origin.session_version;
    }
}
