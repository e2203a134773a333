//! Codec capabilities, negotiated codec parameters and the fuzzy matching
//! used to pair local and remote codecs.

use std::fmt;

use unicase::UniCase;

use crate::peer_connection::configuration::media_engine::*;
use crate::peer_connection::configuration::UNSPECIFIED_STR;
use crate::rtp_transceiver::{fmtp, PayloadType};
use shared::error::{Error, Result};

/// RtpCodecKind determines the type of a codec
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RtpCodecKind {
    #[default]
    Unspecified = 0,

    /// Audio indicates this is an audio codec
    Audio = 1,

    /// Video indicates this is a video codec
    Video = 2,
}

impl From<&str> for RtpCodecKind {
    fn from(raw: &str) -> Self {
        match raw {
            "audio" => RtpCodecKind::Audio,
            "video" => RtpCodecKind::Video,
            _ => RtpCodecKind::Unspecified,
        }
    }
}

impl From<u8> for RtpCodecKind {
    fn from(v: u8) -> Self {
        match v {
            1 => RtpCodecKind::Audio,
            2 => RtpCodecKind::Video,
            _ => RtpCodecKind::Unspecified,
        }
    }
}

impl fmt::Display for RtpCodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RtpCodecKind::Audio => "audio",
            RtpCodecKind::Video => "video",
            RtpCodecKind::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

/// TYPE_RTCP_FB_TRANSPORT_CC ..
pub const TYPE_RTCP_FB_TRANSPORT_CC: &str = "transport-cc";

/// TYPE_RTCP_FB_GOOG_REMB ..
pub const TYPE_RTCP_FB_GOOG_REMB: &str = "goog-remb";

/// TYPE_RTCP_FB_ACK ..
pub const TYPE_RTCP_FB_ACK: &str = "ack";

/// TYPE_RTCP_FB_CCM ..
pub const TYPE_RTCP_FB_CCM: &str = "ccm";

/// TYPE_RTCP_FB_NACK ..
pub const TYPE_RTCP_FB_NACK: &str = "nack";

/// RTCPFeedback signals the connection to use additional RTCP packet types.
/// <https://draft.ortc.org/#dom-rtcrtcpfeedback>
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCPFeedback {
    /// Type is the type of feedback.
    /// valid: ack, ccm, nack, goog-remb, transport-cc
    pub typ: String,

    /// The parameter value depends on the type.
    /// For example, type="nack" parameter="pli" will send Picture Loss Indicator packets.
    pub parameter: String,
}

/// RTCRtpCodec provides information about codec capabilities.
/// <https://w3c.github.io/webrtc-pc/#dictionary-rtcrtpcodeccapability-members>
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCRtpCodec {
    pub mime_type: String,
    pub clock_rate: u32,
    pub channels: u16,
    pub sdp_fmtp_line: String,
    pub rtcp_feedback: Vec<RTCPFeedback>,
}

impl RTCRtpCodec {
    /// payloader returns the built-in RTP payloader for this codec, if any.
    /// Codecs without one can be served through
    /// [`MediaEngine::register_payloader`].
    pub fn payloader(&self) -> Result<Box<dyn rtp::packetizer::Payloader + Send + Sync>> {
        let mime_type = UniCase::new(self.mime_type.as_str());
        if mime_type == UniCase::new(MIME_TYPE_H264) {
            Ok(Box::<rtp::codecs::h264::H264Payloader>::default())
        } else if mime_type == UniCase::new(MIME_TYPE_VP8) {
            let mut vp8_payloader = rtp::codecs::vp8::Vp8Payloader::default();
            vp8_payloader.enable_picture_id = true;
            Ok(Box::new(vp8_payloader))
        } else if mime_type == UniCase::new(MIME_TYPE_VP9) {
            Ok(Box::<rtp::codecs::vp9::Vp9Payloader>::default())
        } else if mime_type == UniCase::new(MIME_TYPE_OPUS) {
            Ok(Box::<rtp::codecs::opus::OpusPayloader>::default())
        } else if mime_type == UniCase::new(MIME_TYPE_G722)
            || mime_type == UniCase::new(MIME_TYPE_PCMU)
            || mime_type == UniCase::new(MIME_TYPE_PCMA)
            || mime_type == UniCase::new(MIME_TYPE_TELEPHONE_EVENT)
        {
            Ok(Box::<rtp::codecs::g7xx::G7xxPayloader>::default())
        } else {
            Err(Error::ErrNoPayloaderForCodec)
        }
    }
}

/// RTCRtpCodecParameters is a sequence containing the media codecs that an RtpSender
/// will choose from, as well as entries for RTX, RED and FEC mechanisms. This also
/// includes the PayloadType that has been negotiated
/// <https://w3c.github.io/webrtc-pc/#rtcrtpcodecparameters>
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCRtpCodecParameters {
    pub rtp_codec: RTCRtpCodec,
    pub payload_type: PayloadType,

    pub stats_id: String,
}

/// RTCRtpHeaderExtensionCapability is used to define a RFC5285 RTP header extension supported by the codec.
/// <https://w3c.github.io/webrtc-pc/#dom-rtcrtpcapabilities-headerextensions>
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCRtpHeaderExtensionCapability {
    pub uri: String,
}

/// RTCRtpHeaderExtensionParameters represents a negotiated RFC5285 RTP header extension.
/// <https://w3c.github.io/webrtc-pc/#dictionary-rtcrtpheaderextensionparameters-members>
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCRtpHeaderExtensionParameters {
    pub uri: String,
    pub id: u16,
}

/// RTCRtpParameters is a list of negotiated codecs and header extensions
/// <https://w3c.github.io/webrtc-pc/#dictionary-rtcrtpparameters-members>
#[derive(Default, Debug, Clone)]
pub struct RTCRtpParameters {
    pub header_extensions: Vec<RTCRtpHeaderExtensionParameters>,
    pub codecs: Vec<RTCRtpCodecParameters>,
}

/// RTCRtpCapabilities represents the capabilities of a transceiver
/// <https://w3c.github.io/webrtc-pc/#rtcrtpcapabilities>
#[derive(Default, Debug, Clone)]
pub struct RTCRtpCapabilities {
    pub codecs: Vec<RTCRtpCodec>,
    pub header_extensions: Vec<RTCRtpHeaderExtensionCapability>,
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum CodecMatch {
    #[default]
    None = 0,
    Partial = 1,
    Exact = 2,
}

/// Do a fuzzy find for a codec in the list of codecs
/// Used for lookup up a codec in an existing list to find a match
/// Returns CodecMatchExact, CodecMatchPartial, or CodecMatchNone
pub(crate) fn codec_parameters_fuzzy_search(
    needle: &RTCRtpCodec,
    haystack: &[RTCRtpCodecParameters],
) -> (RTCRtpCodecParameters, CodecMatch) {
    let needle_fmtp = fmtp::parse(&needle.mime_type, &needle.sdp_fmtp_line);

    // First attempt to match on mime_type + sdp_fmtp_line
    for c in haystack {
        let cfmtp = fmtp::parse(&c.rtp_codec.mime_type, &c.rtp_codec.sdp_fmtp_line);
        if needle_fmtp.match_fmtp(&*cfmtp) {
            return (c.clone(), CodecMatch::Exact);
        }
    }

    // Fallback to just mime_type
    for c in haystack {
        if UniCase::new(c.rtp_codec.mime_type.as_str()) == UniCase::new(needle.mime_type.as_str())
        {
            return (c.clone(), CodecMatch::Partial);
        }
    }

    (RTCRtpCodecParameters::default(), CodecMatch::None)
}

/// find_rtx_payload_type returns the payload type of the RTX codec whose
/// `apt=` points at `needle`.
pub(crate) fn find_rtx_payload_type(
    needle: PayloadType,
    haystack: &[RTCRtpCodecParameters],
) -> Option<PayloadType> {
    let apt_str = format!("apt={needle}");
    haystack
        .iter()
        .find(|c| {
            UniCase::new(c.rtp_codec.mime_type.as_str()) == UniCase::new(MIME_TYPE_RTX)
                && c.rtp_codec.sdp_fmtp_line == apt_str
        })
        .map(|c| c.payload_type)
}

/// find_fec_payload_type returns the first FlexFEC payload type, if any.
pub(crate) fn find_fec_payload_type(haystack: &[RTCRtpCodecParameters]) -> Option<PayloadType> {
    haystack
        .iter()
        .find(|c| {
            c.rtp_codec
                .mime_type
                .to_lowercase()
                .contains(MIME_TYPE_FLEX_FEC)
        })
        .map(|c| c.payload_type)
}

pub(crate) fn rtcp_feedback_intersection(
    a: &[RTCPFeedback],
    b: &[RTCPFeedback],
) -> Vec<RTCPFeedback> {
    a.iter()
        .filter(|fa| b.iter().any(|fb| fa.typ == fb.typ && fa.parameter == fb.parameter))
        .cloned()
        .collect()
}
