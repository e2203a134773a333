use crate::Attributes;

/// RTPHeaderExtension represents a negotiated RFC5285 RTP header extension.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTPHeaderExtension {
    pub uri: String,
    pub id: u16,
}

/// AssociatedStreamInfo describes a repair stream (RTX or FEC) tied to a primary SSRC.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociatedStreamInfo {
    pub ssrc: u32,
    pub payload_type: u8,
}

/// RTCPFeedback signals the connection to use additional RTCP packet types.
/// <https://draft.ortc.org/#dom-rtcrtcpfeedback>
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCPFeedback {
    /// Type is the type of feedback.
    /// see: <https://draft.ortc.org/#dom-rtcrtcpfeedback>
    /// valid: ack, ccm, nack, goog-remb, transport-cc
    pub typ: String,

    /// The parameter value depends on the type.
    /// For example, type="nack" parameter="pli" will send Picture Loss Indicator packets.
    pub parameter: String,
}

/// StreamInfo is the Context passed when a StreamLocal or StreamRemote has been Binded or Unbinded
#[derive(Default, Debug, Clone)]
pub struct StreamInfo {
    pub id: String,
    pub attributes: Attributes,
    pub ssrc: u32,
    pub payload_type: u8,
    pub rtp_header_extensions: Vec<RTPHeaderExtension>,
    pub mime_type: String,
    pub clock_rate: u32,
    pub channels: u16,
    pub sdp_fmtp_line: String,
    pub rtcp_feedback: Vec<RTCPFeedback>,
    pub rtx: Option<AssociatedStreamInfo>,
    pub fec: Option<AssociatedStreamInfo>,
}

impl StreamInfo {
    /// header_extension_id returns the negotiated id for an extension uri, if any.
    pub fn header_extension_id(&self, uri: &str) -> Option<u16> {
        self.rtp_header_extensions
            .iter()
            .find(|ext| ext.uri == uri)
            .map(|ext| ext.id)
    }

    /// has_feedback reports whether the stream negotiated the given RTCP feedback.
    pub fn has_feedback(&self, typ: &str, parameter: &str) -> bool {
        self.rtcp_feedback
            .iter()
            .any(|fb| fb.typ == typ && fb.parameter == parameter)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stream_info_lookups() {
        let info = StreamInfo {
            ssrc: 1234,
            rtp_header_extensions: vec![
                RTPHeaderExtension {
                    uri: "urn:ietf:params:rtp-hdrext:sdes:mid".to_owned(),
                    id: 1,
                },
                RTPHeaderExtension {
                    uri: "urn:ietf:params:rtp-hdrext:sdes:rtp-stream-id".to_owned(),
                    id: 2,
                },
            ],
            rtcp_feedback: vec![RTCPFeedback {
                typ: "nack".to_owned(),
                parameter: "pli".to_owned(),
            }],
            ..Default::default()
        };

        let tests = vec![
            ("urn:ietf:params:rtp-hdrext:sdes:mid", Some(1)),
            ("urn:ietf:params:rtp-hdrext:sdes:rtp-stream-id", Some(2)),
            ("urn:3gpp:video-orientation", None),
        ];
        for (uri, expected) in tests {
            assert_eq!(info.header_extension_id(uri), expected, "{uri}");
        }

        assert!(info.has_feedback("nack", "pli"));
        assert!(!info.has_feedback("nack", ""));
    }
}
