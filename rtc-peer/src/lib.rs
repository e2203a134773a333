//! # rtc-peer - WebRTC PeerConnection in Rust
//!
//! An implementation of the [WebRTC](https://www.w3.org/TR/webrtc/)
//! `RTCPeerConnection`: JSEP offer/answer negotiation, the signaling state
//! machine, transceiver and track management, and the RTP media pipeline
//! that demultiplexes incoming media onto tracks, including simulcast
//! layers identified by MID/RID header extensions.
//!
//! The wire protocols underneath are collaborators plugged into the
//! [`api::APIBuilder`]: an ICE agent, a DTLS handshake, SRTP transforms and
//! an SCTP association. This crate composes them, starts them in the
//! right order and routes their state into the PeerConnection.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rtc_peer::api::APIBuilder;
//! use rtc_peer::peer_connection::configuration::media_engine::MediaEngine;
//! use rtc_peer::peer_connection::configuration::RTCConfigurationBuilder;
//! use rtc_peer::peer_connection::sdp::RTCSessionDescription;
//! use rtc_peer::peer_connection::state::RTCPeerConnectionState;
//! use rtc_peer::rtp_transceiver::rtp_codec::RtpCodecKind;
//! # use rtc_peer::peer_connection::transport::dtls::handshaker::DtlsHandshaker;
//! # use rtc_peer::peer_connection::transport::ice::agent::IceAgentFactory;
//! # use rtc_peer::peer_connection::transport::sctp::association::SctpFactory;
//! # use rtc_peer::peer_connection::transport::srtp::SrtpContextFactory;
//!
//! # async fn example(
//! #     ice: Arc<dyn IceAgentFactory + Send + Sync>,
//! #     dtls: Arc<dyn DtlsHandshaker + Send + Sync>,
//! #     srtp: Arc<dyn SrtpContextFactory + Send + Sync>,
//! #     sctp: Arc<dyn SctpFactory + Send + Sync>,
//! #     answer_sdp: String,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let mut media_engine = MediaEngine::default();
//! media_engine.register_default_codecs()?;
//!
//! let api = APIBuilder::new()
//!     .with_media_engine(media_engine)
//!     .with_ice_agent_factory(ice)
//!     .with_dtls_handshaker(dtls)
//!     .with_srtp_factory(srtp)
//!     .with_sctp_factory(sctp)
//!     .build();
//!
//! let pc = api
//!     .new_peer_connection(RTCConfigurationBuilder::new().build())
//!     .await?;
//!
//! pc.on_peer_connection_state_change(Box::new(|state: RTCPeerConnectionState| {
//!     println!("peer connection state: {state}");
//!     Box::pin(async {})
//! }));
//! pc.on_track(Box::new(|track, _receiver, _transceiver| {
//!     println!("remote track {} ({})", track.id(), track.kind());
//!     Box::pin(async {})
//! }));
//!
//! pc.add_transceiver_from_kind(RtpCodecKind::Video, None).await?;
//!
//! let offer = pc.create_offer(None).await?;
//! pc.set_local_description(offer).await?;
//! // send pc.local_description() to the remote peer, then apply its answer
//! pc.set_remote_description(RTCSessionDescription::answer(answer_sdp)?)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Mutating calls on a PeerConnection are executed one at a time, in the
//! order they were made, on its operations queue. Event handlers run on a
//! separate task so they may call back into the PeerConnection. Call
//! [`peer_connection::RTCPeerConnection::graceful_close`] to let queued
//! work and pending handlers finish before the transports are torn down.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod api;
pub(crate) mod constants;
pub mod data_channel;
pub mod media_stream;
pub mod peer_connection;
pub mod rtp_transceiver;
pub mod statistics;

#[cfg(test)]
pub(crate) mod test_util;
