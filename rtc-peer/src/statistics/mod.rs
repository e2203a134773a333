//! Statistics for a PeerConnection, reported by
//! [`RTCPeerConnection::get_stats`](crate::peer_connection::RTCPeerConnection::get_stats).
//!
//! - `stats` - the W3C WebRTC Statistics dictionaries this crate fills in
//! - `accumulator` - counters updated on the packet and message paths
//! - `report` - the `RTCStatsReport` returned by `get_stats`

pub mod accumulator;
pub mod report;
pub mod stats;

#[cfg(test)]
mod statistics_test;
