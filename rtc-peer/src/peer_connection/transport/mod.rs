//! WebRTC transport layer: ICE, DTLS, SRTP and SCTP.
//!
//! The protocol agents themselves (ICE agent, DTLS handshake, SRTP ciphers,
//! SCTP association) are plugged in through the traits in [`ice::agent`],
//! [`dtls::handshaker`], [`srtp`] and [`sctp::association`]. This module
//! orchestrates them for the three transport layers used in WebRTC:
//!
//! - **ICE (Interactive Connectivity Establishment)** - Establishes peer-to-peer network connections
//! - **DTLS (Datagram Transport Layer Security)** - Provides encryption over UDP
//! - **SCTP (Stream Control Transmission Protocol)** - Multiplexes data channels over DTLS
//!
//! # Transport Stack
//!
//! WebRTC uses a layered transport architecture:
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │      Media/Data Channels            │  Application Layer
//! ├─────────────────────────────────────┤
//! │  RTP/RTCP    │      SCTP            │  Protocol Layer
//! ├──────────────┴──────────────────────┤
//! │           DTLS (encryption)         │  Security Layer
//! ├─────────────────────────────────────┤
//! │      ICE (NAT traversal)            │  Connectivity Layer
//! ├─────────────────────────────────────┤
//! │         UDP/TCP                     │  Network Layer
//! └─────────────────────────────────────┘
//! ```
//!
//! # ICE Transport
//!
//! ICE establishes connectivity through NATs and firewalls by:
//!
//! 1. Gathering local network addresses ([`RTCIceCandidate`])
//! 2. Exchanging candidates with the remote peer
//! 3. Testing candidate pairs for connectivity
//! 4. Selecting the best working path
//!
//! Key ICE types:
//!
//! - [`RTCIceCandidate`] - A potential network address for communication
//! - [`RTCIceCandidateType`] - Type of candidate (host, srflx, prflx, relay)
//! - [`RTCIceTransportState`] - Current state of ICE connectivity
//! - [`RTCIceProtocol`] - Transport protocol (UDP or TCP)
//! - [`RTCIceRole`] - Whether controlling or controlled
//! - [`RTCIceServer`] - STUN/TURN server configuration
//!
//! # DTLS Transport
//!
//! DTLS provides end-to-end encryption over UDP:
//!
//! - [`RTCDtlsFingerprint`] - Certificate fingerprint for authentication
//! - [`RTCDtlsRole`] - Whether client or server in handshake
//! - [`RTCDtlsTransportState`] - Current state of DTLS connection
//!
//! # SCTP Transport
//!
//! SCTP multiplexes data channels over DTLS:
//!
//! - [`RTCSctpTransportState`] - Current state of SCTP association
//!
//! # Demultiplexing
//!
//! The ICE connection is shared by DTLS, SRTP and SRTCP. Every inbound
//! datagram is routed by its first byte (RFC 7983) to an endpoint of the
//! packet mux; SCTP rides inside the DTLS connection.

pub mod dtls;
pub mod ice;
pub(crate) mod mux;
pub mod sctp;
pub mod srtp;

pub use dtls::fingerprint::RTCDtlsFingerprint;
pub use dtls::parameters::DTLSParameters;
pub use dtls::role::RTCDtlsRole;
pub use dtls::state::RTCDtlsTransportState;
pub use dtls::RTCDtlsTransport;
pub use ice::candidate::{RTCIceCandidate, RTCIceCandidateInit};
pub use ice::candidate_pair::RTCIceCandidatePair;
pub use ice::candidate_type::RTCIceCandidateType;
pub use ice::credential_type::RTCIceCredentialType;
pub use ice::gatherer::RTCIceGatherer;
pub use ice::gatherer_state::RTCIceGathererState;
pub use ice::parameters::RTCIceParameters;
pub use ice::protocol::RTCIceProtocol;
pub use ice::role::RTCIceRole;
pub use ice::server::RTCIceServer;
pub use ice::state::RTCIceTransportState;
pub use ice::RTCIceTransport;
pub use sctp::state::RTCSctpTransportState;
pub use sctp::RTCSctpTransport;
