//! Adding a track to a connected session asks for renegotiation, grows the
//! offer by one media section and raises exactly one new remote track.
mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};

use rtc_peer::media_stream::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use rtc_peer::media_stream::track_local::TrackLocalWriter;
use rtc_peer::peer_connection::configuration::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use rtc_peer::peer_connection::state::RTCSignalingState;
use rtc_peer::rtp_transceiver::rtp_codec::{RTCRtpCodec, RtpCodecKind};

use common::*;

fn packet(sequence_number: u16) -> rtp::packet::Packet {
    rtp::packet::Packet {
        header: rtp::header::Header {
            version: 2,
            sequence_number,
            ..Default::default()
        },
        payload: Bytes::from_static(&[0x01, 0x02, 0x03]),
    }
}

async fn write_until(
    track: &TrackLocalStaticRTP,
    tracks: &Mutex<Vec<(RtpCodecKind, u32)>>,
    want: usize,
) -> Result<()> {
    tokio::time::timeout(DEFAULT_TIMEOUT, async {
        let mut sequence_number = 0u16;
        while tracks.lock().await.len() < want {
            sequence_number = sequence_number.wrapping_add(1);
            let _ = track.write_rtp(&packet(sequence_number)).await;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await?;
    Ok(())
}

fn mids(desc: &rtc_peer::peer_connection::sdp::RTCSessionDescription) -> Result<Vec<String>> {
    Ok(desc
        .unmarshal()?
        .media_descriptions
        .iter()
        .filter_map(|m| m.attribute("mid").flatten().map(str::to_owned))
        .collect())
}

#[tokio::test]
async fn test_renegotiation_add_track() -> Result<()> {
    init_logger();

    let (offer_pc, answer_pc) = new_pair().await?;

    let audio = Arc::new(TrackLocalStaticRTP::new(
        RTCRtpCodec {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            ..Default::default()
        },
        "audio".to_owned(),
        "webrtc-rs".to_owned(),
    ));
    offer_pc.add_track(Arc::clone(&audio) as _).await?;

    let remote_tracks = Arc::new(Mutex::new(vec![]));
    let r = Arc::clone(&remote_tracks);
    answer_pc.on_track(Box::new(move |track, _receiver, _transceiver| {
        let r = Arc::clone(&r);
        Box::pin(async move {
            log::info!("answerer got track {} ssrc {}", track.kind(), track.ssrc());
            r.lock().await.push((track.kind(), track.ssrc()));
        })
    }));

    negotiate(&offer_pc, &answer_pc).await?;
    until_connected(&[&offer_pc, &answer_pc]).await?;
    write_until(&audio, &remote_tracks, 1).await?;

    let first_offer = offer_pc
        .current_local_description()
        .await
        .ok_or_else(|| anyhow::anyhow!("offerer has no current local description"))?;
    assert_eq!(mids(&first_offer)?, vec!["0".to_owned()]);

    let (needed_tx, mut needed_rx) = mpsc::channel::<()>(4);
    offer_pc.on_negotiation_needed(Box::new(move || {
        let needed_tx = needed_tx.clone();
        Box::pin(async move {
            let _ = needed_tx.try_send(());
        })
    }));

    let video = Arc::new(TrackLocalStaticRTP::new(
        RTCRtpCodec {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    ));
    offer_pc.add_track(Arc::clone(&video) as _).await?;

    tokio::time::timeout(DEFAULT_TIMEOUT, needed_rx.recv())
        .await?
        .ok_or_else(|| anyhow::anyhow!("negotiation needed channel dropped"))?;

    let reoffer = offer_pc.create_offer(None).await?;
    assert_eq!(mids(&reoffer)?, vec!["0".to_owned(), "1".to_owned()]);

    offer_pc.set_local_description(reoffer.clone()).await?;
    answer_pc.set_remote_description(reoffer).await?;
    let answer = answer_pc.create_answer(None).await?;
    answer_pc.set_local_description(answer.clone()).await?;
    offer_pc.set_remote_description(answer.clone()).await?;
    assert_eq!(mids(&answer)?, vec!["0".to_owned(), "1".to_owned()]);
    assert_eq!(offer_pc.signaling_state(), RTCSignalingState::Stable);
    assert_eq!(answer_pc.signaling_state(), RTCSignalingState::Stable);

    write_until(&video, &remote_tracks, 2).await?;

    // keep both SSRCs busy; no further tracks may appear
    for sequence_number in 500..510u16 {
        audio.write_rtp(&packet(sequence_number)).await?;
        video.write_rtp(&packet(sequence_number)).await?;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    let remote_tracks = remote_tracks.lock().await;
    assert_eq!(remote_tracks.len(), 2, "{remote_tracks:?}");
    assert_eq!(remote_tracks[0].0, RtpCodecKind::Audio);
    assert_eq!(remote_tracks[1].0, RtpCodecKind::Video);
    assert_ne!(remote_tracks[0].1, remote_tracks[1].1);

    close_pair(&offer_pc, &answer_pc).await;
    Ok(())
}
