//! Media engine configuration for codecs and RTP extensions.
//!
//! The media engine manages codec registration, RTP header extensions, and media
//! capabilities negotiation for peer connections. It defines what codecs and features
//! are available for encoding/decoding media streams.
//!
//! # Overview
//!
//! - **Codec Registration** - Define supported audio/video codecs
//! - **Header Extensions** - Configure RTP header extensions
//! - **Feedback Mechanisms** - Register RTCP feedback types
//! - **Negotiation** - Codec and extension negotiation with remote peers
//! - **Payloaders** - Pick the RTP payloader used by sample tracks
//!
//! # Examples
//!
//! ```
//! use rtc_peer::peer_connection::configuration::media_engine::{MediaEngine, MIME_TYPE_OPUS};
//! use rtc_peer::rtp_transceiver::rtp_codec::{RTCRtpCodec, RTCRtpCodecParameters, RtpCodecKind};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut media_engine = MediaEngine::default();
//! media_engine.register_default_codecs()?;
//!
//! media_engine.register_codec(
//!     RTCRtpCodecParameters {
//!         rtp_codec: RTCRtpCodec {
//!             mime_type: MIME_TYPE_OPUS.to_owned(),
//!             clock_rate: 48000,
//!             channels: 2,
//!             sdp_fmtp_line: "minptime=10;useinbandfec=1;stereo=1".to_owned(),
//!             rtcp_feedback: vec![],
//!         },
//!         payload_type: 112,
//!         ..Default::default()
//!     },
//!     RtpCodecKind::Audio,
//! )?;
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sdp::description::media::MediaDescription;
use sdp::description::session::SessionDescription;
use unicase::UniCase;
use util::sync::Mutex;

use crate::constants::SDES_REPAIR_RTP_STREAM_ID_URI;
use crate::peer_connection::sdp::{
    codecs_from_media_description, rtp_extensions_from_media_description,
};
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::fmtp;
use crate::rtp_transceiver::rtp_codec::*;
use crate::rtp_transceiver::PayloadType;
use shared::error::{Error, Result};

/// H.264 video codec MIME type.
pub const MIME_TYPE_H264: &str = "video/H264";

/// H.265/HEVC video codec MIME type.
pub const MIME_TYPE_HEVC: &str = "video/H265";

/// Opus audio codec MIME type.
pub const MIME_TYPE_OPUS: &str = "audio/opus";

/// VP8 video codec MIME type.
pub const MIME_TYPE_VP8: &str = "video/VP8";

/// VP9 video codec MIME type.
pub const MIME_TYPE_VP9: &str = "video/VP9";

/// AV1 video codec MIME type.
pub const MIME_TYPE_AV1: &str = "video/AV1";

/// G.722 audio codec MIME type.
pub const MIME_TYPE_G722: &str = "audio/G722";

/// PCMU (G.711 μ-law) audio codec MIME type.
pub const MIME_TYPE_PCMU: &str = "audio/PCMU";

/// PCMA (G.711 A-law) audio codec MIME type.
pub const MIME_TYPE_PCMA: &str = "audio/PCMA";

/// RTX (retransmission, RFC 4588) MIME type.
pub const MIME_TYPE_RTX: &str = "video/rtx";

/// FlexFEC forward error correction MIME type.
pub const MIME_TYPE_FLEX_FEC: &str = "video/flexfec";

/// FlexFEC-03 forward error correction MIME type.
pub const MIME_TYPE_FLEX_FEC03: &str = "video/flexfec-03";

/// ULP FEC MIME type.
pub const MIME_TYPE_ULP_FEC: &str = "video/ulpfec";

/// Telephone-event MIME type for DTMF tones.
pub const MIME_TYPE_TELEPHONE_EVENT: &str = "audio/telephone-event";

/// One-byte header extension ids (RFC 8285).
const VALID_EXT_IDS: Range<u16> = 1..15;

/// PayloaderFactory builds a fresh payloader for every sample track binding.
pub type PayloaderFactory =
    Arc<dyn Fn() -> Box<dyn rtp::packetizer::Payloader + Send + Sync> + Send + Sync>;

#[derive(Default, Debug, Clone)]
pub(crate) struct MediaEngineHeaderExtension {
    pub(crate) uri: String,
    pub(crate) is_audio: bool,
    pub(crate) is_video: bool,
    pub(crate) allowed_direction: Option<RTCRtpTransceiverDirection>,
}

impl MediaEngineHeaderExtension {
    pub(crate) fn is_matching_direction(&self, dir: RTCRtpTransceiverDirection) -> bool {
        if let Some(allowed_direction) = self.allowed_direction {
            use RTCRtpTransceiverDirection::*;
            allowed_direction == Inactive && dir == Inactive
                || allowed_direction.has_send() && dir.has_send()
                || allowed_direction.has_recv() && dir.has_recv()
        } else {
            // None matches every direction
            true
        }
    }

    fn is_kind(&self, typ: RtpCodecKind) -> bool {
        self.is_audio && typ == RtpCodecKind::Audio || self.is_video && typ == RtpCodecKind::Video
    }
}

/// MediaEngine defines the codecs supported by a PeerConnection, and the
/// configuration of those codecs.
///
/// Registration (`register_*`) happens before the engine is handed to an
/// [`APIBuilder`](crate::api::APIBuilder). Afterwards the engine is shared
/// behind an `Arc` and only the negotiated state changes, which is why that
/// state sits behind interior mutability.
#[derive(Default)]
pub struct MediaEngine {
    // If we have attempted to negotiate a codec type yet.
    negotiated_video: AtomicBool,
    negotiated_audio: AtomicBool,

    pub(crate) video_codecs: Vec<RTCRtpCodecParameters>,
    pub(crate) audio_codecs: Vec<RTCRtpCodecParameters>,
    negotiated_video_codecs: Mutex<Vec<RTCRtpCodecParameters>>,
    negotiated_audio_codecs: Mutex<Vec<RTCRtpCodecParameters>>,

    header_extensions: Vec<MediaEngineHeaderExtension>,
    negotiated_header_extensions: Mutex<HashMap<u16, MediaEngineHeaderExtension>>,

    payloaders: HashMap<String, PayloaderFactory>,
}

impl MediaEngine {
    /// register_default_codecs registers the default codecs supported by this
    /// crate: Opus, G722, PCMU and PCMA for audio; VP8, VP9, H264, AV1 and
    /// H265 (each with an RTX companion) plus ULPFEC for video.
    pub fn register_default_codecs(&mut self) -> Result<()> {
        // Default Audio Codecs
        for (mime_type, clock_rate, channels, fmtp, payload_type) in [
            (MIME_TYPE_OPUS, 48000, 2, "minptime=10;useinbandfec=1", 111),
            (MIME_TYPE_G722, 8000, 0, "", 9),
            (MIME_TYPE_PCMU, 8000, 0, "", 0),
            (MIME_TYPE_PCMA, 8000, 0, "", 8),
        ] {
            self.register_codec(
                RTCRtpCodecParameters {
                    rtp_codec: RTCRtpCodec {
                        mime_type: mime_type.to_owned(),
                        clock_rate,
                        channels,
                        sdp_fmtp_line: fmtp.to_owned(),
                        rtcp_feedback: vec![],
                    },
                    payload_type,
                    ..Default::default()
                },
                RtpCodecKind::Audio,
            )?;
        }

        let video_rtcp_feedback = vec![
            RTCPFeedback {
                typ: TYPE_RTCP_FB_GOOG_REMB.to_owned(),
                parameter: "".to_owned(),
            },
            RTCPFeedback {
                typ: TYPE_RTCP_FB_CCM.to_owned(),
                parameter: "fir".to_owned(),
            },
            RTCPFeedback {
                typ: TYPE_RTCP_FB_NACK.to_owned(),
                parameter: "".to_owned(),
            },
            RTCPFeedback {
                typ: TYPE_RTCP_FB_NACK.to_owned(),
                parameter: "pli".to_owned(),
            },
        ];

        // (mime, fmtp, payload type, rtx payload type)
        let video_codecs = [
            (MIME_TYPE_VP8, "", 96, 97),
            (MIME_TYPE_VP9, "profile-id=0", 98, 99),
            (MIME_TYPE_VP9, "profile-id=1", 100, 101),
            (
                MIME_TYPE_H264,
                "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42001f",
                102,
                103,
            ),
            (
                MIME_TYPE_H264,
                "level-asymmetry-allowed=1;packetization-mode=0;profile-level-id=42001f",
                127,
                120,
            ),
            (
                MIME_TYPE_H264,
                "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f",
                125,
                107,
            ),
            (
                MIME_TYPE_H264,
                "level-asymmetry-allowed=1;packetization-mode=0;profile-level-id=42e01f",
                108,
                109,
            ),
            (
                MIME_TYPE_H264,
                "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=640032",
                123,
                119,
            ),
            (MIME_TYPE_AV1, "profile-id=0", 41, 42),
            (MIME_TYPE_HEVC, "", 126, 104),
        ];

        for (mime_type, fmtp, payload_type, rtx_payload_type) in video_codecs {
            self.register_codec(
                RTCRtpCodecParameters {
                    rtp_codec: RTCRtpCodec {
                        mime_type: mime_type.to_owned(),
                        clock_rate: 90000,
                        channels: 0,
                        sdp_fmtp_line: fmtp.to_owned(),
                        rtcp_feedback: video_rtcp_feedback.clone(),
                    },
                    payload_type,
                    ..Default::default()
                },
                RtpCodecKind::Video,
            )?;
            self.register_codec(
                RTCRtpCodecParameters {
                    rtp_codec: RTCRtpCodec {
                        mime_type: MIME_TYPE_RTX.to_owned(),
                        clock_rate: 90000,
                        channels: 0,
                        sdp_fmtp_line: format!("apt={payload_type}"),
                        rtcp_feedback: vec![],
                    },
                    payload_type: rtx_payload_type,
                    ..Default::default()
                },
                RtpCodecKind::Video,
            )?;
        }

        self.register_codec(
            RTCRtpCodecParameters {
                rtp_codec: RTCRtpCodec {
                    mime_type: MIME_TYPE_ULP_FEC.to_owned(),
                    clock_rate: 90000,
                    ..Default::default()
                },
                payload_type: 116,
                ..Default::default()
            },
            RtpCodecKind::Video,
        )
    }

    /// register_default_header_extensions registers the MID extension for
    /// audio and video, and the RID/repaired-RID extensions video simulcast
    /// needs for demultiplexing.
    pub fn register_default_header_extensions(&mut self) -> Result<()> {
        for (uri, kind) in [
            (sdp::extmap::SDES_MID_URI, RtpCodecKind::Audio),
            (sdp::extmap::SDES_MID_URI, RtpCodecKind::Video),
            (sdp::extmap::SDES_RTP_STREAM_ID_URI, RtpCodecKind::Video),
            (SDES_REPAIR_RTP_STREAM_ID_URI, RtpCodecKind::Video),
        ] {
            self.register_header_extension(
                RTCRtpHeaderExtensionCapability {
                    uri: uri.to_owned(),
                },
                kind,
                None,
            )?;
        }
        Ok(())
    }

    /// add_codec will append codec if it not exists
    fn add_codec(codecs: &mut Vec<RTCRtpCodecParameters>, codec: RTCRtpCodecParameters) {
        if !codecs.iter().any(|c| {
            c.rtp_codec.mime_type == codec.rtp_codec.mime_type
                && c.payload_type == codec.payload_type
        }) {
            codecs.push(codec);
        }
    }

    /// register_codec adds codec to the MediaEngine
    /// These are the list of codecs supported by this PeerConnection.
    pub fn register_codec(&mut self, codec: RTCRtpCodecParameters, typ: RtpCodecKind) -> Result<()> {
        match typ {
            RtpCodecKind::Audio => MediaEngine::add_codec(&mut self.audio_codecs, codec),
            RtpCodecKind::Video => MediaEngine::add_codec(&mut self.video_codecs, codec),
            _ => return Err(Error::ErrUnknownType),
        }
        Ok(())
    }

    /// Adds a header extension to the MediaEngine
    /// To determine the negotiated value use [`MediaEngine::get_header_extension_id`] after signaling is complete.
    ///
    /// The `allowed_direction` controls for which transceiver directions the extension matches. If
    /// set to `None` it matches all directions. The `SendRecv` direction would match all transceiver
    /// directions apart from `Inactive`. Inactive only matches inactive.
    pub fn register_header_extension(
        &mut self,
        extension: RTCRtpHeaderExtensionCapability,
        typ: RtpCodecKind,
        allowed_direction: Option<RTCRtpTransceiverDirection>,
    ) -> Result<()> {
        if let Some(direction) = allowed_direction {
            if direction == RTCRtpTransceiverDirection::Unspecified
                || direction == RTCRtpTransceiverDirection::Inactive
            {
                return Err(Error::ErrRegisterHeaderExtensionInvalidDirection);
            }
        }

        let index = match self
            .header_extensions
            .iter()
            .position(|ext| ext.uri == extension.uri)
        {
            Some(index) => index,
            None => {
                if self.header_extensions.len() >= VALID_EXT_IDS.len() {
                    return Err(Error::ErrRegisterHeaderExtensionNoFreeID);
                }
                self.header_extensions
                    .push(MediaEngineHeaderExtension::default());
                self.header_extensions.len() - 1
            }
        };

        let ext = &mut self.header_extensions[index];
        if typ == RtpCodecKind::Audio {
            ext.is_audio = true;
        } else if typ == RtpCodecKind::Video {
            ext.is_video = true;
        }
        ext.uri = extension.uri;
        ext.allowed_direction = allowed_direction;

        Ok(())
    }

    /// register_feedback adds feedback mechanism to already registered codecs.
    pub fn register_feedback(&mut self, feedback: RTCPFeedback, typ: RtpCodecKind) {
        let codecs = match typ {
            RtpCodecKind::Video => &mut self.video_codecs,
            RtpCodecKind::Audio => &mut self.audio_codecs,
            _ => return,
        };
        for c in codecs {
            c.rtp_codec.rtcp_feedback.push(feedback.clone());
        }
    }

    /// register_payloader plugs in a payloader for a MIME type without a
    /// built-in one (or overrides the built-in). Matching is case-insensitive.
    pub fn register_payloader(&mut self, mime_type: &str, factory: PayloaderFactory) {
        self.payloaders.insert(mime_type.to_lowercase(), factory);
    }

    /// payloader returns the payloader for `codec`: a registered one first,
    /// then the built-in ones of the rtp crate.
    pub(crate) fn payloader(
        &self,
        codec: &RTCRtpCodec,
    ) -> Result<Box<dyn rtp::packetizer::Payloader + Send + Sync>> {
        if let Some(factory) = self.payloaders.get(&codec.mime_type.to_lowercase()) {
            return Ok(factory());
        }
        codec.payloader()
    }

    /// get_header_extension_id returns the negotiated ID for a header extension,
    /// and whether it was negotiated for audio and for video.
    pub fn get_header_extension_id(
        &self,
        extension: RTCRtpHeaderExtensionCapability,
    ) -> (u16, bool, bool) {
        let negotiated_header_extensions = self.negotiated_header_extensions.lock();
        for (id, h) in negotiated_header_extensions.iter() {
            if extension.uri == h.uri {
                return (*id, h.is_audio, h.is_video);
            }
        }

        (0, false, false)
    }

    /// clone_to copies any user modifiable state of the MediaEngine
    /// all internal state is reset
    pub(crate) fn clone_to(&self) -> Self {
        MediaEngine {
            video_codecs: self.video_codecs.clone(),
            audio_codecs: self.audio_codecs.clone(),
            header_extensions: self.header_extensions.clone(),
            payloaders: self.payloaders.clone(),
            ..Default::default()
        }
    }

    pub(crate) fn get_codec_by_payload(
        &self,
        payload_type: PayloadType,
    ) -> Result<(RTCRtpCodecParameters, RtpCodecKind)> {
        for typ in [RtpCodecKind::Video, RtpCodecKind::Audio] {
            if let Some(codec) = self
                .get_codecs_by_kind(typ)
                .into_iter()
                .find(|c| c.payload_type == payload_type)
            {
                return Ok((codec, typ));
            }
        }

        Err(Error::ErrCodecNotFound)
    }

    /// Look up a codec and enable if it exists
    pub(crate) fn match_remote_codec(
        &self,
        remote_codec: &RTCRtpCodecParameters,
        typ: RtpCodecKind,
        exact_matches: &[RTCRtpCodecParameters],
        partial_matches: &[RTCRtpCodecParameters],
    ) -> Result<(RTCRtpCodecParameters, CodecMatch)> {
        let codecs = if typ == RtpCodecKind::Audio {
            &self.audio_codecs
        } else {
            &self.video_codecs
        };

        let remote_fmtp = fmtp::parse(
            &remote_codec.rtp_codec.mime_type,
            remote_codec.rtp_codec.sdp_fmtp_line.as_str(),
        );
        if let Some(apt) = remote_fmtp.parameter("apt") {
            let payload_type = apt.parse::<u8>()?;

            let (apt_codec, apt_match) =
                if let Some(c) = exact_matches.iter().find(|c| c.payload_type == payload_type) {
                    (c, CodecMatch::Exact)
                } else if let Some(c) = partial_matches
                    .iter()
                    .find(|c| c.payload_type == payload_type)
                {
                    (c, CodecMatch::Partial)
                } else {
                    // the primary is not supported, ignore its RTX
                    return Ok((RTCRtpCodecParameters::default(), CodecMatch::None));
                };

            // rewrite apt to our numbering of the primary before matching
            let mut to_match_codec = remote_codec.clone();
            let (apt_matched, mt) = codec_parameters_fuzzy_search(&apt_codec.rtp_codec, codecs);
            if mt == apt_match {
                to_match_codec.rtp_codec.sdp_fmtp_line =
                    to_match_codec.rtp_codec.sdp_fmtp_line.replacen(
                        &format!("apt={payload_type}"),
                        &format!("apt={}", apt_matched.payload_type),
                        1,
                    );
            }

            // if apt's media codec is partial match, then apt codec must be partial match too
            let (local_codec, mut match_type) =
                codec_parameters_fuzzy_search(&to_match_codec.rtp_codec, codecs);
            if match_type == CodecMatch::Exact && apt_match == CodecMatch::Partial {
                match_type = CodecMatch::Partial;
            }
            return Ok((local_codec, match_type));
        }

        Ok(codec_parameters_fuzzy_search(&remote_codec.rtp_codec, codecs))
    }

    /// Update header extensions from a remote media section.
    fn update_header_extension_from_media_section(&self, media: &MediaDescription) -> Result<()> {
        let typ = RtpCodecKind::from(media.media_name.media.to_lowercase().as_str());
        if typ == RtpCodecKind::Unspecified {
            return Ok(());
        }

        for (extension, id) in rtp_extensions_from_media_description(media)? {
            self.update_header_extension(id, extension.as_str(), typ);
        }

        Ok(())
    }

    /// Look up a header extension and enable if it exists
    pub(crate) fn update_header_extension(&self, id: u16, extension: &str, typ: RtpCodecKind) {
        let mut negotiated_header_extensions = self.negotiated_header_extensions.lock();

        for local_extension in &self.header_extensions {
            if local_extension.uri != extension {
                continue;
            }

            // a remote re-offer may move an extension to another id
            if let Some(stale_id) = negotiated_header_extensions
                .iter()
                .find(|(other_id, e)| e.uri == extension && **other_id != id)
                .map(|(other_id, _)| *other_id)
            {
                negotiated_header_extensions.remove(&stale_id);
            }

            let entry = negotiated_header_extensions
                .entry(id)
                .or_insert_with(|| MediaEngineHeaderExtension {
                    uri: extension.to_owned(),
                    allowed_direction: local_extension.allowed_direction,
                    ..Default::default()
                });
            if entry.uri != extension {
                // the id was reused for another extension
                *entry = MediaEngineHeaderExtension {
                    uri: extension.to_owned(),
                    allowed_direction: local_extension.allowed_direction,
                    ..Default::default()
                };
            }
            if local_extension.is_audio && typ == RtpCodecKind::Audio {
                entry.is_audio = true;
            }
            if local_extension.is_video && typ == RtpCodecKind::Video {
                entry.is_video = true;
            }
        }
    }

    fn negotiated_codecs(&self, typ: RtpCodecKind) -> Option<&Mutex<Vec<RTCRtpCodecParameters>>> {
        match typ {
            RtpCodecKind::Audio => Some(&self.negotiated_audio_codecs),
            RtpCodecKind::Video => Some(&self.negotiated_video_codecs),
            _ => None,
        }
    }

    fn negotiated_flag(&self, typ: RtpCodecKind) -> Option<&AtomicBool> {
        match typ {
            RtpCodecKind::Audio => Some(&self.negotiated_audio),
            RtpCodecKind::Video => Some(&self.negotiated_video),
            _ => None,
        }
    }

    pub(crate) fn is_negotiated(&self, typ: RtpCodecKind) -> bool {
        self.negotiated_flag(typ)
            .map(|f| f.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Update the MediaEngine from a remote description.
    ///
    /// The first media section of a kind in `desc` replaces the codecs
    /// negotiated for that kind, so a re-offer that renumbers payload types
    /// takes effect; later sections of the same kind only add codecs.
    pub(crate) fn update_from_remote_description(&self, desc: &SessionDescription) -> Result<()> {
        let mut replaced = HashSet::new();

        for media in &desc.media_descriptions {
            let typ = RtpCodecKind::from(media.media_name.media.to_lowercase().as_str());
            let (Some(negotiated_codecs), Some(negotiated_flag)) =
                (self.negotiated_codecs(typ), self.negotiated_flag(typ))
            else {
                continue;
            };

            let mut codecs = codecs_from_media_description(media)?;

            let add_if_new =
                |existing_codecs: &mut Vec<RTCRtpCodecParameters>, codec: &RTCRtpCodecParameters| {
                    if !existing_codecs
                        .iter()
                        .any(|c| c.payload_type == codec.payload_type)
                    {
                        existing_codecs.push(codec.clone());
                    }
                };

            let mut exact_matches = vec![];
            let mut partial_matches = vec![];

            // the second pass picks up RTX codecs listed before their primary
            for _ in 0..2 {
                for remote_codec in &mut codecs {
                    let (local_codec, match_type) = self.match_remote_codec(
                        remote_codec,
                        typ,
                        &exact_matches,
                        &partial_matches,
                    )?;

                    remote_codec.rtp_codec.rtcp_feedback = rtcp_feedback_intersection(
                        &local_codec.rtp_codec.rtcp_feedback,
                        &remote_codec.rtp_codec.rtcp_feedback,
                    );

                    if match_type == CodecMatch::Exact {
                        add_if_new(&mut exact_matches, remote_codec);
                    } else if match_type == CodecMatch::Partial {
                        add_if_new(&mut partial_matches, remote_codec);
                    }
                }
            }

            // use exact matches when they exist, otherwise fall back to partial
            let matches = if !exact_matches.is_empty() {
                exact_matches
            } else if !partial_matches.is_empty() {
                partial_matches
            } else {
                log::debug!("no codec of {typ} media section matched the media engine");
                continue;
            };

            {
                let mut negotiated = negotiated_codecs.lock();
                if replaced.insert(typ) {
                    negotiated.clear();
                }
                for codec in matches {
                    MediaEngine::add_codec(&mut negotiated, codec);
                }
            }
            negotiated_flag.store(true, Ordering::SeqCst);

            self.update_header_extension_from_media_section(media)?;
        }

        Ok(())
    }

    pub(crate) fn get_codecs_by_kind(&self, typ: RtpCodecKind) -> Vec<RTCRtpCodecParameters> {
        match typ {
            RtpCodecKind::Video if self.is_negotiated(typ) => {
                self.negotiated_video_codecs.lock().clone()
            }
            RtpCodecKind::Video => self.video_codecs.clone(),
            RtpCodecKind::Audio if self.is_negotiated(typ) => {
                self.negotiated_audio_codecs.lock().clone()
            }
            RtpCodecKind::Audio => self.audio_codecs.clone(),
            _ => vec![],
        }
    }

    pub(crate) fn get_rtp_parameters_by_kind(
        &self,
        typ: RtpCodecKind,
        direction: RTCRtpTransceiverDirection,
    ) -> RTCRtpParameters {
        let mut header_extensions = vec![];
        let negotiated_header_extensions = self.negotiated_header_extensions.lock();

        if self.is_negotiated(typ) {
            for (id, e) in negotiated_header_extensions.iter() {
                if e.is_matching_direction(direction) && e.is_kind(typ) {
                    header_extensions.push(RTCRtpHeaderExtensionParameters {
                        id: *id,
                        uri: e.uri.clone(),
                    });
                }
            }
        } else {
            let mut media_header_extensions = HashMap::new();

            for ext in &self.header_extensions {
                // keep ids negotiated for the other kind stable
                if let Some((id, _)) = negotiated_header_extensions
                    .iter()
                    .find(|(_, negotiated)| negotiated.uri == ext.uri)
                {
                    media_header_extensions.insert(*id, ext);
                    continue;
                }

                if let Some(id) = VALID_EXT_IDS.clone().find(|id| {
                    !media_header_extensions.contains_key(id)
                        && !negotiated_header_extensions.contains_key(id)
                }) {
                    media_header_extensions.insert(id, ext);
                }
            }

            for (id, e) in media_header_extensions {
                if e.is_matching_direction(direction) && e.is_kind(typ) {
                    header_extensions.push(RTCRtpHeaderExtensionParameters {
                        id,
                        uri: e.uri.clone(),
                    })
                }
            }
        }
        header_extensions.sort_by_key(|e| e.id);

        RTCRtpParameters {
            header_extensions,
            codecs: self.get_codecs_by_kind(typ),
        }
    }

    pub(crate) fn get_rtp_parameters_by_payload_type(
        &self,
        payload_type: PayloadType,
    ) -> Result<RTCRtpParameters> {
        let (codec, typ) = self.get_codec_by_payload(payload_type)?;

        let mut header_extensions: Vec<RTCRtpHeaderExtensionParameters> = self
            .negotiated_header_extensions
            .lock()
            .iter()
            .filter(|(_, e)| e.is_kind(typ))
            .map(|(id, e)| RTCRtpHeaderExtensionParameters {
                uri: e.uri.clone(),
                id: *id,
            })
            .collect();
        header_extensions.sort_by_key(|e| e.id);

        Ok(RTCRtpParameters {
            header_extensions,
            codecs: vec![codec],
        })
    }

    pub(crate) fn is_rtx_enabled(
        &self,
        kind: RtpCodecKind,
        direction: RTCRtpTransceiverDirection,
    ) -> bool {
        self.get_rtp_parameters_by_kind(kind, direction)
            .codecs
            .iter()
            .any(|c| UniCase::new(c.rtp_codec.mime_type.as_str()) == UniCase::new(MIME_TYPE_RTX))
    }

    pub(crate) fn is_fec_enabled(
        &self,
        kind: RtpCodecKind,
        direction: RTCRtpTransceiverDirection,
    ) -> bool {
        find_fec_payload_type(&self.get_rtp_parameters_by_kind(kind, direction).codecs).is_some()
    }
}
