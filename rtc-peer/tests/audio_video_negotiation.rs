//! Offerer sends audio and video, the answerer has no tracks of its own.
mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use tokio::sync::Mutex;

use rtc_peer::media_stream::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use rtc_peer::media_stream::track_local::TrackLocalWriter;
use rtc_peer::peer_connection::configuration::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use rtc_peer::rtp_transceiver::rtp_codec::{RTCRtpCodec, RtpCodecKind};

use common::*;

fn rtp_packet(sequence_number: u16) -> rtp::packet::Packet {
    rtp::packet::Packet {
        header: rtp::header::Header {
            version: 2,
            sequence_number,
            timestamp: u32::from(sequence_number) * 960,
            ..Default::default()
        },
        payload: Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
    }
}

#[tokio::test]
async fn test_audio_video_recvonly_answer() -> Result<()> {
    init_logger();

    let (offer_pc, answer_pc) = new_pair().await?;

    let audio = Arc::new(TrackLocalStaticRTP::new(
        RTCRtpCodec {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            ..Default::default()
        },
        "audio1".to_owned(),
        "webrtc-rs".to_owned(),
    ));
    let video = Arc::new(TrackLocalStaticRTP::new(
        RTCRtpCodec {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
        "video1".to_owned(),
        "webrtc-rs".to_owned(),
    ));
    offer_pc.add_track(Arc::clone(&audio) as _).await?;
    offer_pc.add_track(Arc::clone(&video) as _).await?;

    let remote_tracks = Arc::new(Mutex::new(vec![]));
    let r = Arc::clone(&remote_tracks);
    answer_pc.on_track(Box::new(move |track, _receiver, _transceiver| {
        let r = Arc::clone(&r);
        Box::pin(async move {
            log::info!("answerer got track {} ({})", track.id(), track.kind());
            r.lock().await.push((track.kind(), track.ssrc()));
        })
    }));

    negotiate(&offer_pc, &answer_pc).await?;

    let answer = answer_pc
        .local_description()
        .await
        .ok_or_else(|| anyhow::anyhow!("answerer has no local description"))?;
    let parsed = answer.unmarshal()?;

    assert_eq!(parsed.media_descriptions.len(), 2);
    let sections: Vec<(String, Option<String>)> = parsed
        .media_descriptions
        .iter()
        .map(|m| {
            (
                m.media_name.media.clone(),
                m.attribute("mid").flatten().map(str::to_owned),
            )
        })
        .collect();
    assert_eq!(
        sections,
        vec![
            ("audio".to_owned(), Some("0".to_owned())),
            ("video".to_owned(), Some("1".to_owned())),
        ]
    );
    for media in &parsed.media_descriptions {
        assert!(
            media.attribute("recvonly").is_some(),
            "{} section is not recvonly",
            media.media_name.media
        );
    }
    assert_eq!(
        parsed.attribute("group").map(String::as_str),
        Some("BUNDLE 0 1")
    );

    let ufrags: HashSet<&str> = parsed
        .media_descriptions
        .iter()
        .filter_map(|m| m.attribute("ice-ufrag").flatten())
        .collect();
    let pwds: HashSet<&str> = parsed
        .media_descriptions
        .iter()
        .filter_map(|m| m.attribute("ice-pwd").flatten())
        .collect();
    let mut fingerprints: HashSet<&str> = parsed
        .media_descriptions
        .iter()
        .filter_map(|m| m.attribute("fingerprint").flatten())
        .collect();
    if let Some(fingerprint) = parsed.attribute("fingerprint") {
        fingerprints.insert(fingerprint.as_str());
    }
    assert_eq!(ufrags.len(), 1);
    assert_eq!(pwds.len(), 1);
    assert_eq!(fingerprints.len(), 1);

    until_connected(&[&offer_pc, &answer_pc]).await?;

    // packets written before the senders are bound are not sent
    tokio::time::timeout(DEFAULT_TIMEOUT, async {
        let mut sequence_number = 0u16;
        while remote_tracks.lock().await.len() < 2 {
            sequence_number = sequence_number.wrapping_add(1);
            let _ = audio.write_rtp(&rtp_packet(sequence_number)).await;
            let _ = video.write_rtp(&rtp_packet(sequence_number)).await;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await?;

    // more packets on the same SSRCs must not raise more tracks
    for sequence_number in 1000..1010u16 {
        audio.write_rtp(&rtp_packet(sequence_number)).await?;
        video.write_rtp(&rtp_packet(sequence_number)).await?;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    let remote_tracks = remote_tracks.lock().await;
    assert_eq!(remote_tracks.len(), 2, "{remote_tracks:?}");
    let kinds: HashSet<RtpCodecKind> = remote_tracks.iter().map(|(kind, _)| *kind).collect();
    assert!(kinds.contains(&RtpCodecKind::Audio));
    assert!(kinds.contains(&RtpCodecKind::Video));
    assert_ne!(remote_tracks[0].1, remote_tracks[1].1);

    close_pair(&offer_pc, &answer_pc).await;
    Ok(())
}
