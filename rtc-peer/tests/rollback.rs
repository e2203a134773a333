//! Rolling back a local offer returns to stable and restores the previous
//! local description.
mod common;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;

use rtc_peer::peer_connection::sdp::RTCSessionDescription;
use rtc_peer::peer_connection::state::RTCSignalingState;
use rtc_peer::rtp_transceiver::rtp_codec::RtpCodecKind;
use shared::error::RTCErrorKind;

use common::*;

#[tokio::test]
async fn test_rollback_local_offer() -> Result<()> {
    init_logger();

    let (offer_pc, answer_pc) = new_pair().await?;

    let observed = Arc::new(Mutex::new(vec![offer_pc.signaling_state()]));
    let o = Arc::clone(&observed);
    offer_pc.on_signaling_state_change(Box::new(move |state: RTCSignalingState| {
        let o = Arc::clone(&o);
        Box::pin(async move {
            o.lock().await.push(state);
        })
    }));

    let transceiver = offer_pc
        .add_transceiver_from_kind(RtpCodecKind::Video, None)
        .await?;

    let offer = offer_pc.create_offer(None).await?;
    offer_pc.set_local_description(offer).await?;
    assert_eq!(offer_pc.signaling_state(), RTCSignalingState::HaveLocalOffer);
    assert!(offer_pc.pending_local_description().await.is_some());

    offer_pc
        .set_local_description(RTCSessionDescription::rollback())
        .await?;
    assert_eq!(offer_pc.signaling_state(), RTCSignalingState::Stable);
    assert!(offer_pc.local_description().await.is_none());
    assert!(offer_pc.pending_local_description().await.is_none());

    // a second rollback has nothing to undo
    let err = offer_pc
        .set_local_description(RTCSessionDescription::rollback())
        .await
        .expect_err("rollback in stable must fail");
    assert_eq!(err.kind(), RTCErrorKind::InvalidModification);
    assert_eq!(offer_pc.signaling_state(), RTCSignalingState::Stable);

    // handlers run on their own task; wait for them before comparing
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(
        *observed.lock().await,
        vec![
            RTCSignalingState::Stable,
            RTCSignalingState::HaveLocalOffer,
            RTCSignalingState::Stable,
        ]
    );

    // the MID handed out by the rolled back offer survives the next round
    negotiate(&offer_pc, &answer_pc).await?;
    assert_eq!(transceiver.mid().as_deref(), Some("0"));
    let answer_mids: Vec<String> = answer_pc
        .get_transceivers()
        .await
        .iter()
        .filter_map(|t| t.mid())
        .collect();
    assert_eq!(answer_mids, vec!["0".to_owned()]);

    close_pair(&offer_pc, &answer_pc).await;
    Ok(())
}

#[tokio::test]
async fn test_rollback_remote_offer_keeps_previous_description() -> Result<()> {
    init_logger();

    let (offer_pc, answer_pc) = new_pair().await?;
    offer_pc
        .add_transceiver_from_kind(RtpCodecKind::Audio, None)
        .await?;
    negotiate(&offer_pc, &answer_pc).await?;

    let current_remote = answer_pc.current_remote_description().await;
    assert!(current_remote.is_some());

    offer_pc
        .add_transceiver_from_kind(RtpCodecKind::Video, None)
        .await?;
    let reoffer = offer_pc.create_offer(None).await?;
    answer_pc.set_remote_description(reoffer).await?;
    assert_eq!(answer_pc.signaling_state(), RTCSignalingState::HaveRemoteOffer);

    answer_pc
        .set_remote_description(RTCSessionDescription::rollback())
        .await?;
    assert_eq!(answer_pc.signaling_state(), RTCSignalingState::Stable);
    assert!(answer_pc.pending_remote_description().await.is_none());
    assert_eq!(answer_pc.remote_description().await, current_remote);

    close_pair(&offer_pc, &answer_pc).await;
    Ok(())
}

#[tokio::test]
async fn test_rollback_clears_both_pending_descriptions() -> Result<()> {
    init_logger();

    let (offer_pc, answer_pc) = new_pair().await?;
    offer_pc
        .add_transceiver_from_kind(RtpCodecKind::Audio, None)
        .await?;

    // local offer undone from the remote side
    let offer = offer_pc.create_offer(None).await?;
    offer_pc.set_local_description(offer).await?;
    offer_pc
        .set_remote_description(RTCSessionDescription::rollback())
        .await?;
    assert_eq!(offer_pc.signaling_state(), RTCSignalingState::Stable);
    assert!(offer_pc.pending_local_description().await.is_none());
    assert!(offer_pc.pending_remote_description().await.is_none());

    // remote offer undone from the local side
    let offer = offer_pc.create_offer(None).await?;
    answer_pc.set_remote_description(offer).await?;
    answer_pc
        .set_local_description(RTCSessionDescription::rollback())
        .await?;
    assert_eq!(answer_pc.signaling_state(), RTCSignalingState::Stable);
    assert!(answer_pc.pending_local_description().await.is_none());
    assert!(answer_pc.pending_remote_description().await.is_none());
    assert!(answer_pc.remote_description().await.is_none());

    close_pair(&offer_pc, &answer_pc).await;
    Ok(())
}
