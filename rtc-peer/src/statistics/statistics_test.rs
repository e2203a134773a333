use std::time::SystemTime;

use serde_json::Value;

use super::accumulator::{DataChannelStatsAccumulator, DataChannelTally, RtpStreamCounters};
use super::report::{RTCStatsReport, RTCStatsReportEntry, PEER_CONNECTION_STATS_ID};
use super::stats::*;
use crate::data_channel::state::RTCDataChannelState;

fn peer_connection_entry(opened: u32, closed: u32) -> RTCStatsReportEntry {
    RTCStatsReportEntry::PeerConnection(RTCPeerConnectionStats {
        stats: RTCStats {
            timestamp: SystemTime::now(),
            typ: RTCStatsType::PeerConnection,
            id: PEER_CONNECTION_STATS_ID.to_owned(),
        },
        data_channels_opened: opened,
        data_channels_closed: closed,
    })
}

fn outbound_entry(ssrc: u32, rid: Option<&str>) -> RTCStatsReportEntry {
    RTCStatsReportEntry::OutboundRtp(RTCOutboundRtpStreamStats {
        rtp_stream_stats: RTCRtpStreamStats {
            stats: RTCStats {
                timestamp: SystemTime::now(),
                typ: RTCStatsType::OutboundRTP,
                id: format!("RTCOutboundRTPvideoStream_{ssrc}"),
            },
            ssrc,
            kind: "video".to_owned(),
            transport_id: "RTCTransport".to_owned(),
            mid: "0".to_owned(),
            rid: rid.map(str::to_owned),
        },
        packets_sent: 10,
        bytes_sent: 1200,
    })
}

#[test]
fn test_rtp_stream_counters() {
    let counters = RtpStreamCounters::default();
    counters.on_packet(100);
    counters.on_packet(0);
    counters.on_packet(20);
    assert_eq!(counters.packets(), 3);
    assert_eq!(counters.bytes(), 120);
}

#[test]
fn test_data_channel_accumulator_snapshot() {
    let acc = DataChannelStatsAccumulator::default();
    acc.on_message_sent(5);
    acc.on_message_sent(0);
    acc.on_message_received(7);
    assert!(!acc.was_opened());
    acc.on_state_changed(RTCDataChannelState::Connecting);
    assert!(!acc.was_opened());
    acc.on_state_changed(RTCDataChannelState::Open);
    assert!(acc.was_opened());

    let now = SystemTime::now();
    let s = acc.snapshot(
        now,
        "DataChannel-1".to_owned(),
        "chat",
        "json",
        4,
        RTCDataChannelState::Open,
    );
    assert_eq!(s.stats.typ, RTCStatsType::DataChannel);
    assert_eq!(s.stats.timestamp, now);
    assert_eq!((s.label.as_str(), s.protocol.as_str()), ("chat", "json"));
    assert_eq!(s.data_channel_identifier, 4);
    assert_eq!((s.messages_sent, s.bytes_sent), (2, 5));
    assert_eq!((s.messages_received, s.bytes_received), (1, 7));
}

#[test]
fn test_data_channel_tally() {
    let mut tally = DataChannelTally::default();
    // never opened channels count for neither side
    tally.add(false, RTCDataChannelState::Closed);
    tally.add(true, RTCDataChannelState::Open);
    tally.add(true, RTCDataChannelState::Closing);
    tally.add(true, RTCDataChannelState::Closed);
    assert_eq!(
        tally,
        DataChannelTally {
            opened: 3,
            closed: 2
        }
    );
}

#[test]
fn test_report_lookup_and_order() {
    let report = RTCStatsReport::new(vec![
        peer_connection_entry(1, 0),
        outbound_entry(2, Some("h")),
        outbound_entry(1, None),
        // a repeated id keeps its first position and the latest value
        peer_connection_entry(2, 1),
    ]);

    assert_eq!(report.len(), 3);
    let ids: Vec<&str> = report.iter().map(|e| e.id()).collect();
    assert_eq!(
        ids,
        vec![
            "RTCPeerConnection",
            "RTCOutboundRTPvideoStream_2",
            "RTCOutboundRTPvideoStream_1"
        ]
    );
    assert_eq!(
        report.peer_connection().map(|s| (s.data_channels_opened, s.data_channels_closed)),
        Some((2, 1))
    );
    assert!(report.transport().is_none());
    assert_eq!(report.iter_by_type(RTCStatsType::OutboundRTP).count(), 2);
    assert_eq!(report.outbound_rtp_streams().map(|s| s.packets_sent).sum::<u64>(), 20);
    assert_eq!(report.inbound_rtp_streams().count(), 0);
}

#[test]
fn test_report_json() -> serde_json::Result<()> {
    let report = RTCStatsReport::new(vec![
        peer_connection_entry(1, 0),
        outbound_entry(7, Some("q")),
        outbound_entry(8, None),
    ]);
    let json: Value = serde_json::from_str(&report.to_json()?)?;

    let pc = &json["RTCPeerConnection"];
    assert_eq!(pc["type"], "peer-connection");
    assert_eq!(pc["id"], "RTCPeerConnection");
    assert_eq!(pc["dataChannelsOpened"], 1);
    assert!(pc.get("timestamp").is_some());

    let layer = &json["RTCOutboundRTPvideoStream_7"];
    assert_eq!(layer["type"], "outbound-rtp");
    assert_eq!(layer["ssrc"], 7);
    assert_eq!(layer["rid"], "q");
    assert_eq!(layer["transportId"], "RTCTransport");
    assert_eq!(layer["bytesSent"], 1200);
    // absent rids are left out
    assert!(json["RTCOutboundRTPvideoStream_8"].get("rid").is_none());
    Ok(())
}

#[test]
fn test_state_serialization() -> serde_json::Result<()> {
    assert_eq!(serde_json::to_string(&RTCDataChannelState::Closing)?, "\"closing\"");
    assert_eq!(
        serde_json::to_string(&crate::peer_connection::transport::RTCIceRole::Controlled)?,
        "\"controlled\""
    );
    Ok(())
}
