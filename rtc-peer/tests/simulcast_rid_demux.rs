//! One sender with three RID layers; the receiving side must demultiplex them
//! by the MID and RID header extensions into three remote tracks.
mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use tokio::sync::Mutex;

use rtc_peer::media_stream::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use rtc_peer::media_stream::track_local::TrackLocalWriter;
use rtc_peer::media_stream::track_remote::TrackRemote;
use rtc_peer::peer_connection::configuration::media_engine::MIME_TYPE_VP8;
use rtc_peer::rtp_transceiver::rtp_codec::RTCRtpCodec;

use common::*;

const RIDS: [&str; 3] = ["q", "h", "f"];

fn layer_packet(rid: &str, sequence_number: u16) -> rtp::packet::Packet {
    rtp::packet::Packet {
        header: rtp::header::Header {
            version: 2,
            sequence_number,
            timestamp: u32::from(sequence_number) * 3000,
            ..Default::default()
        },
        payload: Bytes::from(rid.as_bytes().to_vec()),
    }
}

#[tokio::test]
async fn test_simulcast_rid_demux() -> Result<()> {
    init_logger();

    let (offer_pc, answer_pc) = new_pair().await?;

    let codec = RTCRtpCodec {
        mime_type: MIME_TYPE_VP8.to_owned(),
        clock_rate: 90000,
        ..Default::default()
    };
    let layers: Vec<Arc<TrackLocalStaticRTP>> = RIDS
        .iter()
        .map(|rid| {
            Arc::new(TrackLocalStaticRTP::new_with_rid(
                codec.clone(),
                "video".to_owned(),
                (*rid).to_owned(),
                "webrtc-rs".to_owned(),
            ))
        })
        .collect();

    let sender = offer_pc.add_track(Arc::clone(&layers[0]) as _).await?;
    for layer in &layers[1..] {
        sender.add_encoding(Arc::clone(layer) as _).await?;
    }

    let remote_tracks: Arc<Mutex<HashMap<String, Arc<TrackRemote>>>> =
        Arc::new(Mutex::new(HashMap::new()));
    let on_track_count = Arc::new(Mutex::new(0usize));
    let (r, c) = (Arc::clone(&remote_tracks), Arc::clone(&on_track_count));
    answer_pc.on_track(Box::new(move |track, _receiver, _transceiver| {
        let (r, c) = (Arc::clone(&r), Arc::clone(&c));
        Box::pin(async move {
            log::info!("answerer got simulcast layer {:?}", track.rid());
            *c.lock().await += 1;
            r.lock().await.insert(track.rid().to_owned(), track);
        })
    }));

    let offer = offer_pc.create_offer(None).await?;
    let offer_media = offer.unmarshal()?;
    let offered_rids: Vec<&str> = offer_media.media_descriptions[0]
        .attributes
        .iter()
        .filter(|a| a.key == "rid")
        .filter_map(|a| a.value.as_deref())
        .collect();
    assert_eq!(offered_rids, vec!["q send", "h send", "f send"]);

    offer_pc.set_local_description(offer.clone()).await?;
    answer_pc.set_remote_description(offer).await?;
    let answer = answer_pc.create_answer(None).await?;
    answer_pc.set_local_description(answer.clone()).await?;
    offer_pc.set_remote_description(answer.clone()).await?;

    let answer_media = answer.unmarshal()?;
    let video = &answer_media.media_descriptions[0];
    let answered_rids: Vec<&str> = video
        .attributes
        .iter()
        .filter(|a| a.key == "rid")
        .filter_map(|a| a.value.as_deref())
        .collect();
    assert_eq!(answered_rids, vec!["q recv", "h recv", "f recv"]);
    assert_eq!(video.attribute("simulcast").flatten(), Some("recv q;h;f"));

    until_connected(&[&offer_pc, &answer_pc]).await?;

    tokio::time::timeout(DEFAULT_TIMEOUT, async {
        let mut sequence_number = 0u16;
        while remote_tracks.lock().await.len() < RIDS.len() {
            sequence_number = sequence_number.wrapping_add(1);
            for (layer, rid) in layers.iter().zip(RIDS) {
                let _ = layer.write_rtp(&layer_packet(rid, sequence_number)).await;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await?;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*on_track_count.lock().await, RIDS.len());

    let remote_tracks = remote_tracks.lock().await;
    for rid in RIDS {
        let track = remote_tracks
            .get(rid)
            .ok_or_else(|| anyhow::anyhow!("no remote track for rid {rid}"))?;
        assert_eq!(track.rid(), rid);

        for _ in 0..3 {
            let (packet, _) = tokio::time::timeout(DEFAULT_TIMEOUT, track.read_rtp()).await??;
            assert_eq!(packet.header.ssrc, track.ssrc());
            assert_eq!(&packet.payload[..], rid.as_bytes(), "layer {rid} got a foreign packet");
        }
    }

    close_pair(&offer_pc, &answer_pc).await;
    Ok(())
}
