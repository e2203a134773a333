use std::time::Duration;

use super::*;
use crate::peer_connection::configuration::media_engine::{MIME_TYPE_RTX, MIME_TYPE_VP8};

#[test]
fn test_receiver_state_transitions() {
    let tests = vec![
        (State::Unstarted, State::Started, true),
        (State::Unstarted, State::UnstartedPaused, true),
        (State::Unstarted, State::Paused, false),
        (State::UnstartedPaused, State::Paused, true),
        (State::UnstartedPaused, State::Started, false),
        (State::Started, State::Paused, true),
        (State::Started, State::Unstarted, false),
        (State::Paused, State::Started, true),
        (State::Paused, State::Stopped, true),
        (State::Stopped, State::Started, false),
        (State::Stopped, State::Stopped, true),
    ];

    for (from, to, ok) in tests {
        let (tx, _) = watch::channel(from);
        assert_eq!(
            State::transition(to, &tx).is_ok(),
            ok,
            "{from} -> {to}"
        );
        if ok {
            assert_eq!(*tx.borrow(), to);
        } else {
            assert_eq!(*tx.borrow(), from);
        }
    }
}

#[tokio::test]
async fn test_receiver_state_wait_for_unblocks_on_stop() {
    let (tx, mut rx) = watch::channel(State::Unstarted);

    let waiter = tokio::spawn(async move { State::wait_for(&mut rx, &[State::Started]).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(State::transition(State::Stopped, &tx).is_ok());

    let result = waiter.await.map_err(|e| Error::Other(e.to_string()));
    assert_eq!(result, Ok(Err(Error::ErrConnectionClosed)));
}

#[tokio::test]
async fn test_receiver_state_wait_for_started() -> Result<()> {
    let (tx, mut rx) = watch::channel(State::Unstarted);
    State::transition(State::Started, &tx)?;
    State::wait_for(&mut rx, &[State::Started, State::Paused]).await
}

#[test]
fn test_get_codecs_filters_unknown_and_fills_payload_type() -> Result<()> {
    let mut m = MediaEngine::default();
    m.register_default_codecs()?;
    let m = Arc::new(m);

    assert_eq!(
        RTCRtpReceiver::get_codecs(&mut [], RtpCodecKind::Audio, &m).len(),
        4
    );

    let mut preferred = vec![
        RTCRtpCodecParameters {
            rtp_codec: RTCRtpCodec {
                mime_type: "audio/OPUS".to_owned(),
                clock_rate: 48000,
                channels: 2,
                sdp_fmtp_line: "minptime=10;useinbandfec=1".to_owned(),
                ..Default::default()
            },
            ..Default::default()
        },
        RTCRtpCodecParameters {
            rtp_codec: RTCRtpCodec {
                mime_type: "audio/iLBC".to_owned(),
                clock_rate: 8000,
                ..Default::default()
            },
            payload_type: 102,
            ..Default::default()
        },
    ];
    let codecs = RTCRtpReceiver::get_codecs(&mut preferred, RtpCodecKind::Audio, &m);
    assert_eq!(codecs.len(), 1);
    assert_eq!(codecs[0].payload_type, 111);
    assert_eq!(codecs[0].rtp_codec.mime_type, "audio/OPUS");
    assert_eq!(preferred[0].payload_type, 111);
    Ok(())
}

#[test]
fn test_rtx_info() {
    let vp8 = RTCRtpCodec {
        mime_type: MIME_TYPE_VP8.to_owned(),
        clock_rate: 90000,
        ..Default::default()
    };
    let codecs = vec![
        RTCRtpCodecParameters {
            rtp_codec: vp8.clone(),
            payload_type: 96,
            ..Default::default()
        },
        RTCRtpCodecParameters {
            rtp_codec: RTCRtpCodec {
                mime_type: MIME_TYPE_RTX.to_owned(),
                clock_rate: 90000,
                sdp_fmtp_line: "apt=96".to_owned(),
                ..Default::default()
            },
            payload_type: 97,
            ..Default::default()
        },
    ];

    assert_eq!(
        rtx_info(4000, &vp8, &codecs),
        Some(AssociatedStreamInfo {
            ssrc: 4000,
            payload_type: 97
        })
    );
    assert_eq!(rtx_info(0, &vp8, &codecs), None);
    assert_eq!(rtx_info(4000, &vp8, &codecs[..1]), None);
}
