//! The `RTCStatsReport` returned by `get_stats`.

use std::collections::HashMap;

use serde::Serialize;

use super::stats::{
    RTCDataChannelStats, RTCInboundRtpStreamStats, RTCOutboundRtpStreamStats,
    RTCPeerConnectionStats, RTCStatsType, RTCTransportStats,
};

/// Id of the single peer connection entry.
pub const PEER_CONNECTION_STATS_ID: &str = "RTCPeerConnection";
/// Id of the bundled transport entry.
pub const TRANSPORT_STATS_ID: &str = "RTCTransport";

/// An entry in the stats report representing a single statistics object.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RTCStatsReportEntry {
    PeerConnection(RTCPeerConnectionStats),
    Transport(RTCTransportStats),
    DataChannel(RTCDataChannelStats),
    InboundRtp(RTCInboundRtpStreamStats),
    OutboundRtp(RTCOutboundRtpStreamStats),
}

impl RTCStatsReportEntry {
    pub fn stats_type(&self) -> RTCStatsType {
        match self {
            RTCStatsReportEntry::PeerConnection(_) => RTCStatsType::PeerConnection,
            RTCStatsReportEntry::Transport(_) => RTCStatsType::Transport,
            RTCStatsReportEntry::DataChannel(_) => RTCStatsType::DataChannel,
            RTCStatsReportEntry::InboundRtp(_) => RTCStatsType::InboundRTP,
            RTCStatsReportEntry::OutboundRtp(_) => RTCStatsType::OutboundRTP,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            RTCStatsReportEntry::PeerConnection(s) => &s.stats.id,
            RTCStatsReportEntry::Transport(s) => &s.stats.id,
            RTCStatsReportEntry::DataChannel(s) => &s.stats.id,
            RTCStatsReportEntry::InboundRtp(s) => &s.rtp_stream_stats.stats.id,
            RTCStatsReportEntry::OutboundRtp(s) => &s.rtp_stream_stats.stats.id,
        }
    }
}

/// A collection of statistics objects keyed by their unique ids, iterated
/// in the order they were collected.
#[derive(Debug, Default, Clone)]
pub struct RTCStatsReport {
    entries: HashMap<String, RTCStatsReportEntry>,
    order: Vec<String>,
}

impl RTCStatsReport {
    pub(crate) fn new(entries: Vec<RTCStatsReportEntry>) -> Self {
        let mut map = HashMap::new();
        let mut order = Vec::with_capacity(entries.len());

        for entry in entries {
            let id = entry.id().to_owned();
            if map.insert(id.clone(), entry).is_none() {
                order.push(id);
            }
        }

        Self {
            entries: map,
            order,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&RTCStatsReportEntry> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RTCStatsReportEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn iter_by_type(&self, typ: RTCStatsType) -> impl Iterator<Item = &RTCStatsReportEntry> {
        self.iter().filter(move |e| e.stats_type() == typ)
    }

    pub fn peer_connection(&self) -> Option<&RTCPeerConnectionStats> {
        match self.get(PEER_CONNECTION_STATS_ID) {
            Some(RTCStatsReportEntry::PeerConnection(s)) => Some(s),
            _ => None,
        }
    }

    pub fn transport(&self) -> Option<&RTCTransportStats> {
        match self.get(TRANSPORT_STATS_ID) {
            Some(RTCStatsReportEntry::Transport(s)) => Some(s),
            _ => None,
        }
    }

    pub fn data_channels(&self) -> impl Iterator<Item = &RTCDataChannelStats> {
        self.iter().filter_map(|e| match e {
            RTCStatsReportEntry::DataChannel(s) => Some(s),
            _ => None,
        })
    }

    pub fn inbound_rtp_streams(&self) -> impl Iterator<Item = &RTCInboundRtpStreamStats> {
        self.iter().filter_map(|e| match e {
            RTCStatsReportEntry::InboundRtp(s) => Some(s),
            _ => None,
        })
    }

    pub fn outbound_rtp_streams(&self) -> impl Iterator<Item = &RTCOutboundRtpStreamStats> {
        self.iter().filter_map(|e| match e {
            RTCStatsReportEntry::OutboundRtp(s) => Some(s),
            _ => None,
        })
    }

    /// to_json renders the report as the JSON object browsers return from
    /// `getStats()`, keyed by id.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let map: serde_json::Map<String, serde_json::Value> = self
            .iter()
            .map(|e| Ok((e.id().to_owned(), serde_json::to_value(e)?)))
            .collect::<serde_json::Result<_>>()?;
        serde_json::to_string(&map)
    }
}
