//! Local and remote media tracks.
//!
//! A [`track_local::TrackLocal`] is what the application feeds media into; it
//! gets bound to one [`RTCRtpSender`](crate::rtp_transceiver::rtp_sender::RTCRtpSender)
//! per PeerConnection it is added to. A [`track_remote::TrackRemote`] is
//! handed out by `on_track` for every inbound RTP stream.

use std::time::{Duration, SystemTime};

use bytes::Bytes;

pub mod track_local;
pub mod track_remote;

/// MediaStreamId is the `msid` stream identifier a track is grouped under.
pub type MediaStreamId = String;

/// A Sample contains encoded media and timing information
#[derive(Debug, Clone)]
pub struct Sample {
    /// The assembled data in the sample, as a bitstream.
    pub data: Bytes,

    /// Wallclock time when this sample was generated.
    pub timestamp: SystemTime,

    /// The duration of this sample
    pub duration: Duration,

    /// The RTP packet timestamp of this sample.
    ///
    /// For all RTP packets that contributed to a single sample the timestamp is the same.
    pub packet_timestamp: u32,

    /// The number of packets that were dropped prior to building this sample.
    ///
    /// Packets being dropped doesn't necessarily indicate something is wrong, e.g., packets are sometimes dropped because they aren't relevant for sample building.
    pub prev_dropped_packets: u16,
}

impl Default for Sample {
    fn default() -> Self {
        Sample {
            data: Bytes::new(),
            timestamp: SystemTime::now(),
            duration: Duration::from_secs(0),
            packet_timestamp: 0,
            prev_dropped_packets: 0,
        }
    }
}
