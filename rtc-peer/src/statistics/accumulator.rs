//! Counters updated on the packet and message paths and snapshotted by
//! `get_stats`. Every counter is atomic so the hot paths never take a lock.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::SystemTime;

use super::stats::{RTCDataChannelStats, RTCStats, RTCStatsType};
use crate::data_channel::state::RTCDataChannelState;

/// Packet and payload byte counts of one RTP stream.
#[derive(Debug, Default)]
pub struct RtpStreamCounters {
    packets: AtomicU64,
    bytes: AtomicU64,
}

impl RtpStreamCounters {
    /// Called for every packet handed to or taken from the SRTP session.
    pub fn on_packet(&self, payload_len: usize) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(payload_len as u64, Ordering::Relaxed);
    }

    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Message and byte counts of one data channel.
#[derive(Debug, Default)]
pub struct DataChannelStatsAccumulator {
    messages_sent: AtomicU32,
    bytes_sent: AtomicU64,
    messages_received: AtomicU32,
    bytes_received: AtomicU64,
    opened: AtomicBool,
}

impl DataChannelStatsAccumulator {
    /// Called when a message is sent through the data channel.
    pub fn on_message_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Called when a message is received through the data channel.
    pub fn on_message_received(&self, bytes: usize) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn on_state_changed(&self, state: RTCDataChannelState) {
        if state == RTCDataChannelState::Open {
            self.opened.store(true, Ordering::Relaxed);
        }
    }

    /// Whether the channel ever reached the open state.
    pub fn was_opened(&self) -> bool {
        self.opened.load(Ordering::Relaxed)
    }

    /// Creates a snapshot of the accumulated stats at the given timestamp.
    pub fn snapshot(
        &self,
        now: SystemTime,
        id: String,
        label: &str,
        protocol: &str,
        data_channel_identifier: u16,
        state: RTCDataChannelState,
    ) -> RTCDataChannelStats {
        RTCDataChannelStats {
            stats: RTCStats {
                timestamp: now,
                typ: RTCStatsType::DataChannel,
                id,
            },
            label: label.to_owned(),
            protocol: protocol.to_owned(),
            data_channel_identifier,
            state,
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}

/// Counts opened and closed channels for the peer connection entry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DataChannelTally {
    pub opened: u32,
    pub closed: u32,
}

impl DataChannelTally {
    /// A channel counts as closed once it left the open state.
    pub fn add(&mut self, was_opened: bool, state: RTCDataChannelState) {
        if !was_opened {
            return;
        }
        self.opened += 1;
        if matches!(
            state,
            RTCDataChannelState::Closing | RTCDataChannelState::Closed
        ) {
            self.closed += 1;
        }
    }
}
