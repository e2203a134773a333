use crate::peer_connection::configuration::UNSPECIFIED_STR;
use crate::peer_connection::state::RTCIceConnectionState;
use crate::peer_connection::transport::dtls::state::RTCDtlsTransportState;
use std::fmt;

/// PeerConnectionState indicates the state of the PeerConnection, derived
/// from the states of its ICE and DTLS transports.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCPeerConnectionState {
    #[default]
    Unspecified,

    /// Every transport is new, or there are none yet.
    New,

    /// A transport is checking (ICE) or handshaking (DTLS), and none failed.
    Connecting,

    /// ICE is connected or completed and DTLS is connected.
    Connected,

    /// ICE reported a loss of connectivity.
    Disconnected,

    /// ICE or DTLS failed.
    Failed,

    /// The PeerConnection was closed.
    Closed,
}

const PEER_CONNECTION_STATE_NEW_STR: &str = "new";
const PEER_CONNECTION_STATE_CONNECTING_STR: &str = "connecting";
const PEER_CONNECTION_STATE_CONNECTED_STR: &str = "connected";
const PEER_CONNECTION_STATE_DISCONNECTED_STR: &str = "disconnected";
const PEER_CONNECTION_STATE_FAILED_STR: &str = "failed";
const PEER_CONNECTION_STATE_CLOSED_STR: &str = "closed";

impl From<&str> for RTCPeerConnectionState {
    fn from(raw: &str) -> Self {
        match raw {
            PEER_CONNECTION_STATE_NEW_STR => RTCPeerConnectionState::New,
            PEER_CONNECTION_STATE_CONNECTING_STR => RTCPeerConnectionState::Connecting,
            PEER_CONNECTION_STATE_CONNECTED_STR => RTCPeerConnectionState::Connected,
            PEER_CONNECTION_STATE_DISCONNECTED_STR => RTCPeerConnectionState::Disconnected,
            PEER_CONNECTION_STATE_FAILED_STR => RTCPeerConnectionState::Failed,
            PEER_CONNECTION_STATE_CLOSED_STR => RTCPeerConnectionState::Closed,
            _ => RTCPeerConnectionState::Unspecified,
        }
    }
}

impl From<u8> for RTCPeerConnectionState {
    fn from(v: u8) -> Self {
        match v {
            1 => RTCPeerConnectionState::New,
            2 => RTCPeerConnectionState::Connecting,
            3 => RTCPeerConnectionState::Connected,
            4 => RTCPeerConnectionState::Disconnected,
            5 => RTCPeerConnectionState::Failed,
            6 => RTCPeerConnectionState::Closed,
            _ => RTCPeerConnectionState::Unspecified,
        }
    }
}

impl fmt::Display for RTCPeerConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCPeerConnectionState::New => PEER_CONNECTION_STATE_NEW_STR,
            RTCPeerConnectionState::Connecting => PEER_CONNECTION_STATE_CONNECTING_STR,
            RTCPeerConnectionState::Connected => PEER_CONNECTION_STATE_CONNECTED_STR,
            RTCPeerConnectionState::Disconnected => PEER_CONNECTION_STATE_DISCONNECTED_STR,
            RTCPeerConnectionState::Failed => PEER_CONNECTION_STATE_FAILED_STR,
            RTCPeerConnectionState::Closed => PEER_CONNECTION_STATE_CLOSED_STR,
            RTCPeerConnectionState::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

impl RTCPeerConnectionState {
    /// derive computes the aggregate state from the transport states.
    pub(crate) fn derive(
        is_closed: bool,
        ice: RTCIceConnectionState,
        dtls: RTCDtlsTransportState,
    ) -> Self {
        use RTCIceConnectionState as Ice;

        if is_closed {
            return RTCPeerConnectionState::Closed;
        }
        if ice == Ice::Failed || dtls == RTCDtlsTransportState::Failed {
            return RTCPeerConnectionState::Failed;
        }
        if ice == Ice::Disconnected {
            return RTCPeerConnectionState::Disconnected;
        }
        if matches!(ice, Ice::Connected | Ice::Completed) {
            return if dtls == RTCDtlsTransportState::Connected {
                RTCPeerConnectionState::Connected
            } else {
                RTCPeerConnectionState::Connecting
            };
        }
        if ice == Ice::Checking || dtls == RTCDtlsTransportState::Connecting {
            return RTCPeerConnectionState::Connecting;
        }
        RTCPeerConnectionState::New
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum NegotiationNeededState {
    /// NegotiationNeededStateEmpty not running and queue is empty
    #[default]
    Empty,
    /// NegotiationNeededStateRun not running and queue is empty
    Run,
    /// NegotiationNeededStateQueue not running and queue is empty
    Queue,
}

impl From<u8> for NegotiationNeededState {
    fn from(v: u8) -> Self {
        match v {
            1 => NegotiationNeededState::Run,
            2 => NegotiationNeededState::Queue,
            _ => NegotiationNeededState::Empty,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_peer_connection_state() {
        let tests = vec![
            (UNSPECIFIED_STR, RTCPeerConnectionState::Unspecified),
            ("new", RTCPeerConnectionState::New),
            ("connecting", RTCPeerConnectionState::Connecting),
            ("connected", RTCPeerConnectionState::Connected),
            ("disconnected", RTCPeerConnectionState::Disconnected),
            ("failed", RTCPeerConnectionState::Failed),
            ("closed", RTCPeerConnectionState::Closed),
        ];

        for (state_string, expected_state) in tests {
            assert_eq!(
                RTCPeerConnectionState::from(state_string),
                expected_state,
                "testCase: {expected_state}",
            );
            assert_eq!(expected_state.to_string(), state_string);
        }
    }

    #[test]
    fn test_derive_peer_connection_state() {
        use RTCDtlsTransportState as Dtls;
        use RTCIceConnectionState as Ice;

        let tests = vec![
            (false, Ice::New, Dtls::New, RTCPeerConnectionState::New),
            (false, Ice::Checking, Dtls::New, RTCPeerConnectionState::Connecting),
            (false, Ice::Connected, Dtls::New, RTCPeerConnectionState::Connecting),
            (false, Ice::Connected, Dtls::Connecting, RTCPeerConnectionState::Connecting),
            (false, Ice::Connected, Dtls::Connected, RTCPeerConnectionState::Connected),
            (false, Ice::Completed, Dtls::Connected, RTCPeerConnectionState::Connected),
            (false, Ice::Disconnected, Dtls::Connected, RTCPeerConnectionState::Disconnected),
            (false, Ice::Connected, Dtls::Failed, RTCPeerConnectionState::Failed),
            (false, Ice::Failed, Dtls::Connected, RTCPeerConnectionState::Failed),
            (true, Ice::Connected, Dtls::Connected, RTCPeerConnectionState::Closed),
        ];

        for (is_closed, ice, dtls, expected) in tests {
            assert_eq!(
                RTCPeerConnectionState::derive(is_closed, ice, dtls),
                expected,
                "{is_closed} {ice} {dtls}"
            );
        }
    }
}
