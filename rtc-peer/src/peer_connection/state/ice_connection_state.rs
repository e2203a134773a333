use crate::peer_connection::configuration::UNSPECIFIED_STR;
use crate::peer_connection::transport::ice::state::RTCIceTransportState;
use std::fmt;

/// RTCIceConnectionState indicates the state of the ICE connection.
///
/// See [W3C RTCIceConnectionState](https://w3c.github.io/webrtc-pc/#dom-rtciceconnectionstate).
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCIceConnectionState {
    #[default]
    Unspecified,

    /// The ICE agent is gathering addresses or is waiting to be given
    /// remote candidates.
    New,

    /// The ICE agent has been given remote candidates and is checking pairs.
    Checking,

    /// A usable connection has been found; checking may continue.
    Connected,

    /// The ICE agent has finished checking and found a connection.
    Completed,

    /// Connectivity was lost; may recover on its own.
    Disconnected,

    /// All candidate pairs failed.
    Failed,

    /// The ICE agent has shut down.
    Closed,
}

const ICE_CONNECTION_STATE_NEW_STR: &str = "new";
const ICE_CONNECTION_STATE_CHECKING_STR: &str = "checking";
const ICE_CONNECTION_STATE_CONNECTED_STR: &str = "connected";
const ICE_CONNECTION_STATE_COMPLETED_STR: &str = "completed";
const ICE_CONNECTION_STATE_DISCONNECTED_STR: &str = "disconnected";
const ICE_CONNECTION_STATE_FAILED_STR: &str = "failed";
const ICE_CONNECTION_STATE_CLOSED_STR: &str = "closed";

impl From<&str> for RTCIceConnectionState {
    fn from(raw: &str) -> Self {
        match raw {
            ICE_CONNECTION_STATE_NEW_STR => RTCIceConnectionState::New,
            ICE_CONNECTION_STATE_CHECKING_STR => RTCIceConnectionState::Checking,
            ICE_CONNECTION_STATE_CONNECTED_STR => RTCIceConnectionState::Connected,
            ICE_CONNECTION_STATE_COMPLETED_STR => RTCIceConnectionState::Completed,
            ICE_CONNECTION_STATE_DISCONNECTED_STR => RTCIceConnectionState::Disconnected,
            ICE_CONNECTION_STATE_FAILED_STR => RTCIceConnectionState::Failed,
            ICE_CONNECTION_STATE_CLOSED_STR => RTCIceConnectionState::Closed,
            _ => RTCIceConnectionState::Unspecified,
        }
    }
}

impl From<u8> for RTCIceConnectionState {
    fn from(v: u8) -> Self {
        match v {
            1 => RTCIceConnectionState::New,
            2 => RTCIceConnectionState::Checking,
            3 => RTCIceConnectionState::Connected,
            4 => RTCIceConnectionState::Completed,
            5 => RTCIceConnectionState::Disconnected,
            6 => RTCIceConnectionState::Failed,
            7 => RTCIceConnectionState::Closed,
            _ => RTCIceConnectionState::Unspecified,
        }
    }
}

impl From<RTCIceTransportState> for RTCIceConnectionState {
    fn from(state: RTCIceTransportState) -> Self {
        match state {
            RTCIceTransportState::New => RTCIceConnectionState::New,
            RTCIceTransportState::Checking => RTCIceConnectionState::Checking,
            RTCIceTransportState::Connected => RTCIceConnectionState::Connected,
            RTCIceTransportState::Completed => RTCIceConnectionState::Completed,
            RTCIceTransportState::Failed => RTCIceConnectionState::Failed,
            RTCIceTransportState::Disconnected => RTCIceConnectionState::Disconnected,
            RTCIceTransportState::Closed => RTCIceConnectionState::Closed,
            RTCIceTransportState::Unspecified => RTCIceConnectionState::Unspecified,
        }
    }
}

impl fmt::Display for RTCIceConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceConnectionState::New => ICE_CONNECTION_STATE_NEW_STR,
            RTCIceConnectionState::Checking => ICE_CONNECTION_STATE_CHECKING_STR,
            RTCIceConnectionState::Connected => ICE_CONNECTION_STATE_CONNECTED_STR,
            RTCIceConnectionState::Completed => ICE_CONNECTION_STATE_COMPLETED_STR,
            RTCIceConnectionState::Disconnected => ICE_CONNECTION_STATE_DISCONNECTED_STR,
            RTCIceConnectionState::Failed => ICE_CONNECTION_STATE_FAILED_STR,
            RTCIceConnectionState::Closed => ICE_CONNECTION_STATE_CLOSED_STR,
            RTCIceConnectionState::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_ice_connection_state() {
        let tests = vec![
            (UNSPECIFIED_STR, RTCIceConnectionState::Unspecified),
            ("new", RTCIceConnectionState::New),
            ("checking", RTCIceConnectionState::Checking),
            ("connected", RTCIceConnectionState::Connected),
            ("completed", RTCIceConnectionState::Completed),
            ("disconnected", RTCIceConnectionState::Disconnected),
            ("failed", RTCIceConnectionState::Failed),
            ("closed", RTCIceConnectionState::Closed),
        ];

        for (state_string, expected_state) in tests {
            assert_eq!(
                RTCIceConnectionState::from(state_string),
                expected_state,
                "testCase: {expected_state}",
            );
            assert_eq!(expected_state.to_string(), state_string);
        }
    }

    #[test]
    fn test_ice_connection_state_from_transport_state() {
        let tests = vec![
            (RTCIceTransportState::New, RTCIceConnectionState::New),
            (RTCIceTransportState::Checking, RTCIceConnectionState::Checking),
            (RTCIceTransportState::Connected, RTCIceConnectionState::Connected),
            (RTCIceTransportState::Disconnected, RTCIceConnectionState::Disconnected),
            (RTCIceTransportState::Failed, RTCIceConnectionState::Failed),
        ];

        for (transport_state, expected) in tests {
            assert_eq!(RTCIceConnectionState::from(transport_state), expected);
        }
    }
}
