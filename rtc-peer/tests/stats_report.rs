//! get_stats over a connected pair: transport state, data channel
//! counters and the opened/closed tally.
mod common;

use anyhow::Result;
use tokio::sync::mpsc;

use rtc_peer::data_channel::init::RTCDataChannelInit;
use rtc_peer::data_channel::state::RTCDataChannelState;
use rtc_peer::peer_connection::transport::RTCDtlsTransportState;
use rtc_peer::statistics::stats::RTCStatsType;

use common::*;

fn negotiated_init() -> Option<RTCDataChannelInit> {
    Some(RTCDataChannelInit {
        negotiated: Some(3),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_stats_count_data_channel_traffic() -> Result<()> {
    init_logger();

    let (offer_pc, answer_pc) = new_pair().await?;
    let offer_dc = offer_pc.create_data_channel("stats", negotiated_init()).await?;
    let answer_dc = answer_pc.create_data_channel("stats", negotiated_init()).await?;

    let (open_tx, mut open_rx) = mpsc::channel::<()>(1);
    offer_dc.on_open(Box::new(move || {
        Box::pin(async move {
            let _ = open_tx.send(()).await;
        })
    }));
    let (message_tx, mut message_rx) = mpsc::channel::<usize>(2);
    answer_dc.on_message(Box::new(move |msg| {
        let message_tx = message_tx.clone();
        Box::pin(async move {
            let _ = message_tx.send(msg.data.len()).await;
        })
    }));

    let before = offer_pc.get_stats().await;
    let pc_stats = before
        .peer_connection()
        .ok_or_else(|| anyhow::anyhow!("missing peer connection entry"))?;
    assert_eq!(pc_stats.data_channels_opened, 0);
    assert_eq!(before.data_channels().count(), 1);

    negotiate(&offer_pc, &answer_pc).await?;
    until_connected(&[&offer_pc, &answer_pc]).await?;
    tokio::time::timeout(DEFAULT_TIMEOUT, open_rx.recv()).await?;

    offer_dc.send_text("hello").await?;
    offer_dc.send(&bytes::Bytes::from_static(&[1, 2, 3])).await?;
    let mut received = vec![];
    for _ in 0..2 {
        let n = tokio::time::timeout(DEFAULT_TIMEOUT, message_rx.recv())
            .await?
            .ok_or_else(|| anyhow::anyhow!("message channel dropped"))?;
        received.push(n);
    }
    assert_eq!(received, vec![5, 3]);

    let sent = offer_pc.get_stats().await;
    let transport = sent
        .transport()
        .ok_or_else(|| anyhow::anyhow!("missing transport entry"))?;
    assert_eq!(transport.dtls_state, RTCDtlsTransportState::Connected);
    assert!(!transport.ice_local_username_fragment.is_empty());

    let dc_stats = sent
        .data_channels()
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing data channel entry"))?;
    assert_eq!(dc_stats.label, "stats");
    assert_eq!(dc_stats.data_channel_identifier, 3);
    assert_eq!(dc_stats.state, RTCDataChannelState::Open);
    assert_eq!((dc_stats.messages_sent, dc_stats.bytes_sent), (2, 8));
    assert_eq!(sent.peer_connection().map(|s| s.data_channels_opened), Some(1));

    let got = answer_pc.get_stats().await;
    let dc_stats = got
        .data_channels()
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing data channel entry"))?;
    assert_eq!((dc_stats.messages_received, dc_stats.bytes_received), (2, 8));
    assert_eq!(dc_stats.messages_sent, 0);

    // no media was negotiated
    assert_eq!(got.iter_by_type(RTCStatsType::InboundRTP).count(), 0);

    let json: serde_json::Value = serde_json::from_str(&got.to_json()?)?;
    assert_eq!(json["RTCTransport"]["type"], "transport");
    assert_eq!(json[dc_stats.stats.id.as_str()]["bytesReceived"], 8);

    offer_dc.close().await?;
    let closed = offer_pc.get_stats().await;
    let pc_stats = closed
        .peer_connection()
        .ok_or_else(|| anyhow::anyhow!("missing peer connection entry"))?;
    assert_eq!((pc_stats.data_channels_opened, pc_stats.data_channels_closed), (1, 1));

    close_pair(&offer_pc, &answer_pc).await;
    Ok(())
}
