//! A remote description whose session and media level fingerprints disagree
//! is rejected without touching the signaling state.
mod common;

use anyhow::Result;

use rtc_peer::peer_connection::sdp::RTCSessionDescription;
use rtc_peer::peer_connection::state::RTCSignalingState;
use rtc_peer::rtp_transceiver::rtp_codec::RtpCodecKind;
use shared::error::{Error, RTCErrorKind};

use common::*;

fn forged_fingerprint() -> String {
    let octets: Vec<String> = (0u8..32).map(|b| format!("{b:02X}")).collect();
    format!("a=fingerprint:sha-256 {}", octets.join(":"))
}

/// with_session_fingerprint adds a session level fingerprint in front of the
/// first media section, leaving the media level ones as they are.
fn with_session_fingerprint(sdp: &str, fingerprint: &str) -> String {
    let mut out = String::with_capacity(sdp.len() + fingerprint.len() + 2);
    let mut inserted = false;
    for line in sdp.split_terminator("\r\n") {
        if !inserted && line.starts_with("m=") {
            out.push_str(fingerprint);
            out.push_str("\r\n");
            inserted = true;
        }
        out.push_str(line);
        out.push_str("\r\n");
    }
    out
}

#[tokio::test]
async fn test_conflicting_fingerprints_rejected() -> Result<()> {
    init_logger();

    let (offer_pc, answer_pc) = new_pair().await?;
    offer_pc
        .add_transceiver_from_kind(RtpCodecKind::Audio, None)
        .await?;

    let offer = offer_pc.create_offer(None).await?;
    assert!(offer.sdp.contains("a=fingerprint:"));

    let forged = with_session_fingerprint(&offer.sdp, &forged_fingerprint());
    let err = answer_pc
        .set_remote_description(RTCSessionDescription::offer(forged)?)
        .await
        .expect_err("conflicting fingerprints must be rejected");

    assert_eq!(err, Error::ErrSessionDescriptionConflictingFingerprints);
    assert_eq!(err.kind(), RTCErrorKind::ParseError);
    assert_eq!(answer_pc.signaling_state(), RTCSignalingState::Stable);
    assert!(answer_pc.remote_description().await.is_none());
    assert!(answer_pc.get_transceivers().await.is_empty());

    // the untouched offer still applies afterwards
    answer_pc.set_remote_description(offer).await?;
    assert_eq!(answer_pc.signaling_state(), RTCSignalingState::HaveRemoteOffer);

    close_pair(&offer_pc, &answer_pc).await;
    Ok(())
}

#[tokio::test]
async fn test_matching_session_fingerprint_accepted() -> Result<()> {
    init_logger();

    let (offer_pc, answer_pc) = new_pair().await?;
    offer_pc
        .add_transceiver_from_kind(RtpCodecKind::Audio, None)
        .await?;

    let offer = offer_pc.create_offer(None).await?;
    let media_fingerprint = offer
        .sdp
        .split_terminator("\r\n")
        .find(|line| line.starts_with("a=fingerprint:"))
        .ok_or_else(|| anyhow::anyhow!("offer carries no fingerprint"))?
        .to_owned();

    // fingerprints compare case-insensitively
    let lowered = media_fingerprint.to_lowercase();
    let sdp = with_session_fingerprint(&offer.sdp, &lowered);
    answer_pc
        .set_remote_description(RTCSessionDescription::offer(sdp)?)
        .await?;
    assert_eq!(answer_pc.signaling_state(), RTCSignalingState::HaveRemoteOffer);

    close_pair(&offer_pc, &answer_pc).await;
    Ok(())
}
