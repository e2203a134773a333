use std::time::Duration;

use super::*;
use crate::media_stream::Sample;
use crate::peer_connection::configuration::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};

#[derive(Debug, Default)]
struct RecordingWriter {
    packets: std::sync::Mutex<Vec<rtp::packet::Packet>>,
}

impl RecordingWriter {
    fn packets(&self) -> Vec<rtp::packet::Packet> {
        self.packets.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TrackLocalWriter for RecordingWriter {
    async fn write_rtp(&self, p: &rtp::packet::Packet) -> Result<usize> {
        if let Ok(mut packets) = self.packets.lock() {
            packets.push(p.clone());
        }
        Ok(p.payload.len())
    }
}

fn context(
    id: &str,
    ssrc: SSRC,
    codecs: Vec<RTCRtpCodecParameters>,
    writer: Arc<RecordingWriter>,
) -> TrackLocalContext {
    TrackLocalContext {
        id: id.to_owned(),
        params: RTCRtpParameters {
            header_extensions: vec![RTCRtpHeaderExtensionParameters {
                uri: sdp::extmap::SDES_MID_URI.to_owned(),
                id: 3,
            }],
            codecs,
        },
        ssrc,
        write_stream: writer,
        paused: Arc::new(AtomicBool::new(false)),
        mid: Some("0".to_owned()),
        media_engine: Arc::new(MediaEngine::default()),
    }
}

fn vp8(payload_type: PayloadType) -> RTCRtpCodecParameters {
    RTCRtpCodecParameters {
        rtp_codec: RTCRtpCodec {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
        payload_type,
        ..Default::default()
    }
}

fn opus(payload_type: PayloadType) -> RTCRtpCodecParameters {
    RTCRtpCodecParameters {
        rtp_codec: RTCRtpCodec {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            ..Default::default()
        },
        payload_type,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_track_local_static_no_codec_intersection() {
    let track = TrackLocalStaticRTP::new(
        opus(0).rtp_codec,
        "audio".to_owned(),
        "webrtc-rs".to_owned(),
    );
    let writer = Arc::new(RecordingWriter::default());

    let result = track
        .bind(&context("sender-1", 1, vec![vp8(96)], writer))
        .await;
    assert_eq!(result, Err(Error::ErrUnsupportedCodec));
}

#[tokio::test]
async fn test_track_local_static_closed() -> Result<()> {
    let track = TrackLocalStaticRTP::new(vp8(0).rtp_codec, "video".to_owned(), "webrtc-rs".to_owned());
    let writer = Arc::new(RecordingWriter::default());
    let ctx = context("sender-1", 1, vec![vp8(96)], writer);

    assert_eq!(track.unbind(&ctx).await, Err(Error::ErrUnbindFailed));

    track.bind(&ctx).await?;
    assert_eq!(track.bindings.lock().await.len(), 1);

    track.unbind(&ctx).await?;
    assert!(track.bindings.lock().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_track_local_static_rewrites_ssrc_and_payload_type() -> Result<()> {
    let track = TrackLocalStaticRTP::new(vp8(0).rtp_codec, "video".to_owned(), "webrtc-rs".to_owned());
    let first = Arc::new(RecordingWriter::default());
    let second = Arc::new(RecordingWriter::default());

    let codec = track
        .bind(&context("sender-1", 1111, vec![vp8(96)], Arc::clone(&first)))
        .await?;
    assert_eq!(codec.payload_type, 96);
    track
        .bind(&context("sender-2", 2222, vec![vp8(100)], Arc::clone(&second)))
        .await?;

    let pkt = rtp::packet::Packet {
        header: rtp::header::Header {
            version: 2,
            ssrc: 1,
            payload_type: 1,
            sequence_number: 7,
            ..Default::default()
        },
        payload: Bytes::from_static(&[0xde, 0xad]),
    };
    assert_eq!(track.write_rtp(&pkt).await?, 4);

    let a = first.packets();
    assert_eq!(a.len(), 1);
    assert_eq!(a[0].header.ssrc, 1111);
    assert_eq!(a[0].header.payload_type, 96);
    assert_eq!(a[0].header.sequence_number, 7);
    assert_eq!(
        a[0].header.get_extension(3),
        Some(Bytes::from_static(b"0"))
    );

    let b = second.packets();
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].header.ssrc, 2222);
    assert_eq!(b[0].header.payload_type, 100);
    Ok(())
}

#[tokio::test]
async fn test_track_local_static_paused_binding_is_skipped() -> Result<()> {
    let track = TrackLocalStaticRTP::new(vp8(0).rtp_codec, "video".to_owned(), "webrtc-rs".to_owned());
    let writer = Arc::new(RecordingWriter::default());
    let ctx = context("sender-1", 1, vec![vp8(96)], Arc::clone(&writer));
    track.bind(&ctx).await?;

    ctx.paused.store(true, Ordering::SeqCst);
    assert!(track.all_binding_paused().await);
    track.write_rtp(&rtp::packet::Packet::default()).await?;
    assert!(writer.packets().is_empty());

    ctx.paused.store(false, Ordering::SeqCst);
    track.write_rtp(&rtp::packet::Packet::default()).await?;
    assert_eq!(writer.packets().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_track_local_static_sample_packetizes() -> Result<()> {
    let track = TrackLocalStaticSample::new(
        opus(0).rtp_codec,
        "audio".to_owned(),
        "webrtc-rs".to_owned(),
    );
    assert_eq!(track.kind(), RtpCodecKind::Audio);

    // Unbound tracks swallow samples.
    track
        .write_sample(&Sample {
            data: Bytes::from_static(&[1, 2, 3]),
            duration: Duration::from_millis(20),
            ..Default::default()
        })
        .await?;

    let writer = Arc::new(RecordingWriter::default());
    track
        .bind(&context("sender-1", 5000, vec![opus(111)], Arc::clone(&writer)))
        .await?;

    for _ in 0..2 {
        track
            .write_sample(&Sample {
                data: Bytes::from_static(&[1, 2, 3]),
                duration: Duration::from_millis(20),
                ..Default::default()
            })
            .await?;
    }

    let packets = writer.packets();
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0].header.ssrc, 5000);
    assert_eq!(packets[0].header.payload_type, 111);
    assert_eq!(packets[0].payload, Bytes::from_static(&[1, 2, 3]));
    assert_eq!(
        packets[1].header.timestamp.wrapping_sub(packets[0].header.timestamp),
        960
    );
    assert_eq!(
        packets[1]
            .header
            .sequence_number
            .wrapping_sub(packets[0].header.sequence_number),
        1
    );
    Ok(())
}

#[tokio::test]
async fn test_track_local_static_sample_without_payloader() {
    let track = TrackLocalStaticSample::new(
        RTCRtpCodec {
            mime_type: "video/AV1".to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
        "video".to_owned(),
        "webrtc-rs".to_owned(),
    );
    let writer = Arc::new(RecordingWriter::default());
    let codec = RTCRtpCodecParameters {
        rtp_codec: track.codec(),
        payload_type: 45,
        ..Default::default()
    };

    let result = track.bind(&context("sender-1", 1, vec![codec], writer)).await;
    assert_eq!(result.err(), Some(Error::ErrNoPayloaderForCodec));
}
