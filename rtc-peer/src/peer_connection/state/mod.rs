//! Connection state types.
//!
//! A PeerConnection tracks four independent state machines:
//!
//! - [`RTCSignalingState`]: SDP offer/answer progress
//! - [`RTCIceConnectionState`]: ICE connectivity
//! - [`RTCIceGatheringState`]: local candidate gathering
//! - [`RTCPeerConnectionState`]: aggregate of ICE and DTLS
//!
//! Changes are reported through the `on_*_change` handlers registered on
//! [`RTCPeerConnection`](crate::peer_connection::RTCPeerConnection).

pub(crate) mod ice_connection_state;
pub(crate) mod ice_gathering_state;
pub(crate) mod peer_connection_state;
pub(crate) mod signaling_state;

pub use ice_connection_state::RTCIceConnectionState;
pub use ice_gathering_state::RTCIceGatheringState;
pub use peer_connection_state::RTCPeerConnectionState;
pub use signaling_state::RTCSignalingState;
