use std::fmt;

use crate::peer_connection::configuration::UNSPECIFIED_STR;
use crate::peer_connection::sdp::sdp_type::RTCSdpType;
use shared::error::{Error, Result};

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum StateChangeOp {
    #[default]
    SetLocal,
    SetRemote,
}

impl fmt::Display for StateChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            StateChangeOp::SetLocal => write!(f, "SetLocal"),
            StateChangeOp::SetRemote => write!(f, "SetRemote"),
        }
    }
}

/// Indicates the state of the SDP offer/answer negotiation process.
///
/// ```text
/// offerer:  stable -> SetLocal(offer)  -> have-local-offer  -> SetRemote(answer) -> stable
/// answerer: stable -> SetRemote(offer) -> have-remote-offer -> SetLocal(answer)  -> stable
/// ```
///
/// Provisional answers park the connection in `have-local-pranswer` or
/// `have-remote-pranswer`; a rollback from any of the non-stable states
/// returns to `stable`.
///
/// ```
/// use rtc_peer::peer_connection::state::RTCSignalingState;
///
/// let parsed: RTCSignalingState = "have-remote-offer".into();
/// assert_eq!(parsed, RTCSignalingState::HaveRemoteOffer);
/// assert_eq!(RTCSignalingState::HaveLocalOffer.to_string(), "have-local-offer");
/// ```
///
/// See [W3C RTCPeerConnection.signalingState](https://w3c.github.io/webrtc-pc/#dom-peerconnection-signaling-state).
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCSignalingState {
    Unspecified = 0,

    /// No offer/answer exchange is in progress. Initial state.
    #[default]
    Stable,

    /// A local offer has been applied; waiting for the remote answer.
    HaveLocalOffer,

    /// A remote offer has been applied; a local answer is due.
    HaveRemoteOffer,

    /// A remote offer and a local provisional answer have been applied.
    HaveLocalPranswer,

    /// A local offer and a remote provisional answer have been applied.
    HaveRemotePranswer,

    /// The PeerConnection has been closed.
    Closed,
}

const SIGNALING_STATE_STABLE_STR: &str = "stable";
const SIGNALING_STATE_HAVE_LOCAL_OFFER_STR: &str = "have-local-offer";
const SIGNALING_STATE_HAVE_REMOTE_OFFER_STR: &str = "have-remote-offer";
const SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR: &str = "have-local-pranswer";
const SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR: &str = "have-remote-pranswer";
const SIGNALING_STATE_CLOSED_STR: &str = "closed";

impl From<&str> for RTCSignalingState {
    fn from(raw: &str) -> Self {
        match raw {
            SIGNALING_STATE_STABLE_STR => RTCSignalingState::Stable,
            SIGNALING_STATE_HAVE_LOCAL_OFFER_STR => RTCSignalingState::HaveLocalOffer,
            SIGNALING_STATE_HAVE_REMOTE_OFFER_STR => RTCSignalingState::HaveRemoteOffer,
            SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR => RTCSignalingState::HaveLocalPranswer,
            SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR => RTCSignalingState::HaveRemotePranswer,
            SIGNALING_STATE_CLOSED_STR => RTCSignalingState::Closed,
            _ => RTCSignalingState::Unspecified,
        }
    }
}

impl fmt::Display for RTCSignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCSignalingState::Stable => SIGNALING_STATE_STABLE_STR,
            RTCSignalingState::HaveLocalOffer => SIGNALING_STATE_HAVE_LOCAL_OFFER_STR,
            RTCSignalingState::HaveRemoteOffer => SIGNALING_STATE_HAVE_REMOTE_OFFER_STR,
            RTCSignalingState::HaveLocalPranswer => SIGNALING_STATE_HAVE_LOCAL_PRANSWER_STR,
            RTCSignalingState::HaveRemotePranswer => SIGNALING_STATE_HAVE_REMOTE_PRANSWER_STR,
            RTCSignalingState::Closed => SIGNALING_STATE_CLOSED_STR,
            RTCSignalingState::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

impl From<u8> for RTCSignalingState {
    fn from(v: u8) -> Self {
        match v {
            1 => RTCSignalingState::Stable,
            2 => RTCSignalingState::HaveLocalOffer,
            3 => RTCSignalingState::HaveRemoteOffer,
            4 => RTCSignalingState::HaveLocalPranswer,
            5 => RTCSignalingState::HaveRemotePranswer,
            6 => RTCSignalingState::Closed,
            _ => RTCSignalingState::Unspecified,
        }
    }
}

/// next_signaling_state returns the state that applying a description of
/// `sdp_type` through `op` leads to from `cur`, or the rejection.
pub(crate) fn next_signaling_state(
    cur: RTCSignalingState,
    op: StateChangeOp,
    sdp_type: RTCSdpType,
) -> Result<RTCSignalingState> {
    use RTCSdpType::*;
    use RTCSignalingState::*;
    use StateChangeOp::*;

    if sdp_type == Rollback {
        return match cur {
            Stable => Err(Error::ErrSignalingStateCannotRollback),
            HaveLocalOffer | HaveRemoteOffer | HaveLocalPranswer | HaveRemotePranswer => {
                Ok(Stable)
            }
            _ => Err(invalid_transition(cur, op, sdp_type)),
        };
    }

    let next = match (cur, op, sdp_type) {
        (Stable, SetLocal, Offer) => HaveLocalOffer,
        (Stable, SetRemote, Offer) => HaveRemoteOffer,

        (HaveLocalOffer, SetLocal, Offer) => HaveLocalOffer,
        (HaveLocalOffer, SetRemote, Pranswer) => HaveRemotePranswer,
        (HaveLocalOffer, SetRemote, Answer) => Stable,

        (HaveRemoteOffer, SetLocal, Pranswer) => HaveLocalPranswer,
        (HaveRemoteOffer, SetLocal, Answer) => Stable,
        (HaveRemoteOffer, SetRemote, Offer) => HaveRemoteOffer,

        (HaveLocalPranswer, SetLocal, Pranswer) => HaveLocalPranswer,
        (HaveLocalPranswer, SetLocal, Answer) => Stable,

        (HaveRemotePranswer, SetRemote, Pranswer) => HaveRemotePranswer,
        (HaveRemotePranswer, SetRemote, Answer) => Stable,

        _ => return Err(invalid_transition(cur, op, sdp_type)),
    };

    Ok(next)
}

/// check_next_signaling_state validates a proposed `cur -> next` transition.
pub(crate) fn check_next_signaling_state(
    cur: RTCSignalingState,
    next: RTCSignalingState,
    op: StateChangeOp,
    sdp_type: RTCSdpType,
) -> Result<RTCSignalingState> {
    let allowed = next_signaling_state(cur, op, sdp_type)?;
    if allowed != next {
        return Err(invalid_transition(cur, op, sdp_type));
    }
    Ok(next)
}

fn invalid_transition(cur: RTCSignalingState, op: StateChangeOp, sdp_type: RTCSdpType) -> Error {
    Error::ErrSignalingStateProposedTransitionInvalid(format!(
        "from {cur} applying {op} {sdp_type}"
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_signaling_state() {
        let tests = vec![
            (UNSPECIFIED_STR, RTCSignalingState::Unspecified),
            ("stable", RTCSignalingState::Stable),
            ("have-local-offer", RTCSignalingState::HaveLocalOffer),
            ("have-remote-offer", RTCSignalingState::HaveRemoteOffer),
            ("have-local-pranswer", RTCSignalingState::HaveLocalPranswer),
            ("have-remote-pranswer", RTCSignalingState::HaveRemotePranswer),
            ("closed", RTCSignalingState::Closed),
        ];

        for (state_string, expected_state) in tests {
            assert_eq!(
                RTCSignalingState::from(state_string),
                expected_state,
                "testCase: {expected_state}",
            );
            if expected_state != RTCSignalingState::Unspecified {
                assert_eq!(
                    RTCSignalingState::from(expected_state.to_string().as_str()),
                    expected_state
                );
            }
        }
    }

    #[test]
    fn test_signaling_state_transitions() {
        use RTCSdpType::*;
        use RTCSignalingState::*;
        use StateChangeOp::*;

        let tests = vec![
            (Stable, SetLocal, Offer, Ok(HaveLocalOffer)),
            (Stable, SetRemote, Offer, Ok(HaveRemoteOffer)),
            (HaveLocalOffer, SetLocal, Offer, Ok(HaveLocalOffer)),
            (HaveLocalOffer, SetRemote, Pranswer, Ok(HaveRemotePranswer)),
            (HaveLocalOffer, SetRemote, Answer, Ok(Stable)),
            (HaveLocalOffer, SetLocal, Rollback, Ok(Stable)),
            (HaveRemoteOffer, SetLocal, Pranswer, Ok(HaveLocalPranswer)),
            (HaveRemoteOffer, SetLocal, Answer, Ok(Stable)),
            (HaveRemoteOffer, SetRemote, Offer, Ok(HaveRemoteOffer)),
            (HaveRemoteOffer, SetRemote, Rollback, Ok(Stable)),
            (HaveLocalPranswer, SetLocal, Pranswer, Ok(HaveLocalPranswer)),
            (HaveLocalPranswer, SetLocal, Answer, Ok(Stable)),
            (HaveLocalPranswer, SetLocal, Rollback, Ok(Stable)),
            (HaveRemotePranswer, SetRemote, Pranswer, Ok(HaveRemotePranswer)),
            (HaveRemotePranswer, SetRemote, Answer, Ok(Stable)),
            (HaveRemotePranswer, SetRemote, Rollback, Ok(Stable)),
            (
                Stable,
                SetRemote,
                Rollback,
                Err(Error::ErrSignalingStateCannotRollback),
            ),
            (
                Stable,
                SetLocal,
                Rollback,
                Err(Error::ErrSignalingStateCannotRollback),
            ),
            (
                Stable,
                SetRemote,
                Pranswer,
                Err(invalid_transition(Stable, SetRemote, Pranswer)),
            ),
            (
                Stable,
                SetLocal,
                Answer,
                Err(invalid_transition(Stable, SetLocal, Answer)),
            ),
            (
                HaveLocalOffer,
                SetRemote,
                Offer,
                Err(invalid_transition(HaveLocalOffer, SetRemote, Offer)),
            ),
            (
                HaveRemoteOffer,
                SetRemote,
                Answer,
                Err(invalid_transition(HaveRemoteOffer, SetRemote, Answer)),
            ),
            (
                HaveLocalPranswer,
                SetRemote,
                Offer,
                Err(invalid_transition(HaveLocalPranswer, SetRemote, Offer)),
            ),
            (
                HaveRemotePranswer,
                SetLocal,
                Answer,
                Err(invalid_transition(HaveRemotePranswer, SetLocal, Answer)),
            ),
            (
                Closed,
                SetLocal,
                Rollback,
                Err(invalid_transition(Closed, SetLocal, Rollback)),
            ),
        ];

        for (cur, op, sdp_type, expected) in tests {
            assert_eq!(
                next_signaling_state(cur, op, sdp_type),
                expected,
                "{cur} {op} {sdp_type}"
            );
        }
    }

    #[test]
    fn test_check_next_signaling_state_rejects_wrong_target() {
        let result = check_next_signaling_state(
            RTCSignalingState::HaveLocalOffer,
            RTCSignalingState::HaveLocalPranswer,
            StateChangeOp::SetRemote,
            RTCSdpType::Answer,
        );
        assert!(matches!(
            result,
            Err(Error::ErrSignalingStateProposedTransitionInvalid(_))
        ));
    }
}
