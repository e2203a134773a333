//! WebRTC Statistics types.
//!
//! <https://www.w3.org/TR/webrtc-stats/>

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::data_channel::state::RTCDataChannelState;
use crate::peer_connection::transport::{
    RTCDtlsRole, RTCDtlsTransportState, RTCIceRole, RTCIceTransportState,
};
use crate::rtp_transceiver::SSRC;

/// The type of statistics object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RTCStatsType {
    #[serde(rename = "inbound-rtp")]
    InboundRTP,
    #[serde(rename = "outbound-rtp")]
    OutboundRTP,
    #[serde(rename = "peer-connection")]
    PeerConnection,
    #[serde(rename = "data-channel")]
    DataChannel,
    #[serde(rename = "transport")]
    Transport,
}

/// The unique identifier for a statistics object.
pub type RTCStatsId = String;

/// Base statistics object containing common fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RTCStats {
    pub timestamp: SystemTime,
    #[serde(rename = "type")]
    pub typ: RTCStatsType,
    pub id: RTCStatsId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCPeerConnectionStats {
    #[serde(flatten)]
    pub stats: RTCStats,

    /// Channels that reached the open state.
    pub data_channels_opened: u32,
    /// Channels that left the open state.
    pub data_channels_closed: u32,
}

/// The bundled ICE/DTLS transport every section of the connection uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCTransportStats {
    #[serde(flatten)]
    pub stats: RTCStats,

    pub ice_role: RTCIceRole,
    pub ice_local_username_fragment: String,
    pub ice_state: RTCIceTransportState,
    pub dtls_state: RTCDtlsTransportState,
    pub dtls_role: RTCDtlsRole,
    /// Empty until ICE selected a pair.
    pub selected_candidate_pair: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCDataChannelStats {
    #[serde(flatten)]
    pub stats: RTCStats,

    pub label: String,
    pub protocol: String,
    pub data_channel_identifier: u16,
    pub state: RTCDataChannelState,
    pub messages_sent: u32,
    pub bytes_sent: u64,
    pub messages_received: u32,
    pub bytes_received: u64,
}

/// Fields shared by inbound and outbound RTP stream statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpStreamStats {
    #[serde(flatten)]
    pub stats: RTCStats,

    pub ssrc: SSRC,
    /// "audio" or "video".
    pub kind: String,
    pub transport_id: RTCStatsId,
    pub mid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCInboundRtpStreamStats {
    #[serde(flatten)]
    pub rtp_stream_stats: RTCRtpStreamStats,

    pub track_identifier: String,
    pub packets_received: u64,
    /// Payload bytes, RTP headers excluded.
    pub bytes_received: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCOutboundRtpStreamStats {
    #[serde(flatten)]
    pub rtp_stream_stats: RTCRtpStreamStats,

    pub packets_sent: u64,
    /// Payload bytes, RTP headers excluded.
    pub bytes_sent: u64,
}
