use std::time::Duration;

use super::*;
use crate::media_stream::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use crate::peer_connection::configuration::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use crate::test_util::new_pc;

fn vp8() -> RTCRtpCodec {
    RTCRtpCodec {
        mime_type: MIME_TYPE_VP8.to_owned(),
        clock_rate: 90000,
        ..Default::default()
    }
}

fn opus() -> RTCRtpCodec {
    RTCRtpCodec {
        mime_type: MIME_TYPE_OPUS.to_owned(),
        clock_rate: 48000,
        channels: 2,
        ..Default::default()
    }
}

fn layer(rid: &str) -> Arc<dyn TrackLocal + Send + Sync> {
    Arc::new(TrackLocalStaticRTP::new_with_rid(
        vp8(),
        "video".to_owned(),
        rid.to_owned(),
        "webrtc-rs".to_owned(),
    ))
}

#[tokio::test]
async fn test_add_encoding() -> Result<()> {
    let pc = new_pc().await?;
    let sender = pc.add_track(layer("q")).await?;

    let no_rid = Arc::new(TrackLocalStaticRTP::new(
        vp8(),
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    ));
    assert_eq!(
        sender.add_encoding(no_rid).await,
        Err(Error::ErrRTPSenderRidNil)
    );

    let other_stream = Arc::new(TrackLocalStaticRTP::new_with_rid(
        vp8(),
        "video".to_owned(),
        "h".to_owned(),
        "other".to_owned(),
    ));
    assert_eq!(
        sender.add_encoding(other_stream).await,
        Err(Error::ErrRTPSenderBaseEncodingMismatch)
    );

    assert_eq!(
        sender.add_encoding(layer("q")).await,
        Err(Error::ErrRTPSenderRIDCollision)
    );

    sender.add_encoding(layer("h")).await?;
    sender.add_encoding(layer("f")).await?;
    assert_eq!(sender.rids().await, vec!["q", "h", "f"]);

    let parameters = sender.get_parameters().await;
    let rids: Vec<&str> = parameters.encodings.iter().map(|e| e.rid.as_str()).collect();
    assert_eq!(rids, vec!["q", "h", "f"]);
    let mut ssrcs: Vec<SSRC> = parameters.encodings.iter().map(|e| e.ssrc).collect();
    ssrcs.sort_unstable();
    ssrcs.dedup();
    assert_eq!(ssrcs.len(), 3, "encodings must not share an SSRC");

    pc.close().await
}

#[tokio::test]
async fn test_add_encoding_requires_rid_on_base_track() -> Result<()> {
    let pc = new_pc().await?;
    let base = Arc::new(TrackLocalStaticRTP::new(
        vp8(),
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    ));
    let sender = pc.add_track(base).await?;

    assert_eq!(
        sender.add_encoding(layer("h")).await,
        Err(Error::ErrRTPSenderNoBaseEncoding)
    );

    pc.close().await
}

#[tokio::test]
async fn test_replace_track() -> Result<()> {
    let pc = new_pc().await?;
    let sender = pc.add_track(layer("q")).await?;

    let audio = Arc::new(TrackLocalStaticRTP::new(
        opus(),
        "audio".to_owned(),
        "webrtc-rs".to_owned(),
    ));
    assert_eq!(
        sender.replace_track(Some(audio)).await,
        Err(Error::ErrRTPSenderNewTrackHasIncorrectKind)
    );

    // before negotiation the new track simply takes the slot
    let replacement = Arc::new(TrackLocalStaticRTP::new(
        vp8(),
        "camera".to_owned(),
        "webrtc-rs".to_owned(),
    ));
    sender.replace_track(Some(replacement)).await?;
    let track = sender
        .track()
        .await
        .ok_or(Error::ErrRTPSenderTrackNil)?;
    assert_eq!(track.id(), "camera");

    sender.replace_track(None).await?;
    assert!(sender.track().await.is_none());

    pc.close().await
}

#[tokio::test]
async fn test_replace_track_keeps_simulcast_envelope() -> Result<()> {
    let pc = new_pc().await?;
    let sender = pc.add_track(layer("q")).await?;
    sender.add_encoding(layer("h")).await?;

    assert_eq!(
        sender.replace_track(Some(layer("f"))).await,
        Err(Error::ErrRTPSenderNewTrackHasIncorrectEnvelope)
    );

    pc.close().await
}

#[tokio::test]
async fn test_stop() -> Result<()> {
    let pc = new_pc().await?;
    let sender = pc.add_track(layer("q")).await?;
    assert!(!sender.has_stopped());

    let reader = {
        let sender = Arc::clone(&sender);
        tokio::spawn(async move { sender.read_rtcp().await.map(|_| ()) })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    sender.stop().await?;
    assert!(sender.has_stopped());
    assert!(!sender.has_sent());
    assert!(sender.track().await.is_none());

    let read = tokio::time::timeout(Duration::from_secs(1), reader)
        .await
        .map_err(|_| Error::Other("blocked RTCP read was not released".to_owned()))?
        .map_err(|e| Error::Other(e.to_string()))?;
    assert_eq!(read, Err(Error::ErrConnectionClosed));

    assert_eq!(
        sender.add_encoding(layer("h")).await,
        Err(Error::ErrRTPSenderStopped)
    );
    assert_eq!(
        sender.send(&sender.get_parameters().await).await,
        Err(Error::ErrRTPSenderStopped)
    );

    // stopping twice is a no-op
    sender.stop().await?;
    pc.close().await
}

#[tokio::test]
async fn test_initial_track_id_is_set_once() -> Result<()> {
    let pc = new_pc().await?;
    let sender = pc.add_track(layer("q")).await?;
    assert_eq!(sender.initial_track_id(), None);

    // the first offer pins the msid track id
    pc.create_offer(None).await?;
    assert_eq!(sender.initial_track_id(), Some("video".to_owned()));
    assert_eq!(
        sender.set_initial_track_id("again".to_owned()),
        Err(Error::ErrSenderInitialTrackIdAlreadySet)
    );
    assert_eq!(sender.associated_media_stream_ids(), vec!["webrtc-rs"]);
    assert!(!sender.associate_media_stream_id("webrtc-rs".to_owned()));

    pc.close().await
}
