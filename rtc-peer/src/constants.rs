pub(crate) const SDP_ATTRIBUTE_RID: &str = "rid";
pub(crate) const SDP_ATTRIBUTE_SIMULCAST: &str = "simulcast";
pub(crate) const SDES_REPAIR_RTP_STREAM_ID_URI: &str =
    "urn:ietf:params:rtp-hdrext:sdes:repaired-rtp-stream-id";

/// Outbound packets are payloaded to fit under this size.
pub(crate) const RTP_OUTBOUND_MTU: usize = 1200;

/// Largest single RTP or RTCP packet read from a stream.
pub(crate) const RTP_READ_BUFFER_SIZE: usize = 1500;
