//! RTC Interceptor - async interceptor pipeline for RTP/RTCP processing.
//!
//! An interceptor wraps the readers and writers a PeerConnection uses for its
//! media streams. Each interceptor receives the next reader/writer in the
//! chain and returns a new one that may observe, rewrite, drop or inject
//! packets before delegating.
//!
//! # Binding
//!
//! | Operation | Called | Wraps |
//! |-----------|--------|-------|
//! | [`Interceptor::bind_rtcp_reader`] | once per sender/receiver | incoming RTCP |
//! | [`Interceptor::bind_rtcp_writer`] | once per PeerConnection | outgoing RTCP |
//! | [`Interceptor::bind_local_stream`] | once per outgoing SSRC | outgoing RTP |
//! | [`Interceptor::bind_remote_stream`] | once per incoming SSRC | incoming RTP |
//!
//! `unbind_local_stream` and `unbind_remote_stream` are called when a stream
//! goes away (sender/receiver stop, PeerConnection close), and `close` when
//! the PeerConnection is torn down.
//!
//! # Ordering
//!
//! A [`Chain`] binds its children in registration order, so the interceptor
//! registered last is the outermost wrapper:
//!
//! ```text
//! write: application -> C -> B -> A -> SRTP
//! read:  application <- C <- B <- A <- SRTP
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use rtc_interceptor::{Registry, StreamInfo};
//!
//! let registry = Registry::new()
//!     .with(Box::new(MyStatsBuilder::default()))
//!     .with(Box::new(MyNackBuilder::default()));
//!
//! let chain = registry.build_chain("pc-1")?;
//! let writer = chain.bind_local_stream(&stream_info, srtp_writer).await;
//! ```

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

use async_trait::async_trait;
use shared::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub mod chain;
pub mod noop;
pub mod registry;
pub mod stream_info;

pub use chain::Chain;
pub use noop::NoOp;
pub use registry::Registry;
pub use stream_info::{AssociatedStreamInfo, RTCPFeedback, RTPHeaderExtension, StreamInfo};

/// Attributes are a generic key/value store used by interceptors
pub type Attributes = HashMap<usize, usize>;

/// Boxed RTCP packet, as produced by [`rtcp::packet::unmarshal`].
pub type RTCPPacket = Box<dyn rtcp::packet::Packet + Send + Sync>;

/// InterceptorBuilder provides an interface for constructing interceptors
pub trait InterceptorBuilder {
    fn build(&self, id: &str) -> Result<Arc<dyn Interceptor + Send + Sync>>;
}

/// Interceptor can be used to add functionality to PeerConnections by modifying any incoming/outgoing rtp/rtcp
/// packets, or sending your own packets as needed.
///
/// Implementations must tolerate repeated binds of the same SSRC.
#[async_trait]
pub trait Interceptor {
    /// bind_rtcp_reader lets you modify any incoming RTCP packets. It is called once per sender/receiver.
    /// The returned reader will be called once per packet batch.
    async fn bind_rtcp_reader(
        &self,
        reader: Arc<dyn RTCPReader + Send + Sync>,
    ) -> Arc<dyn RTCPReader + Send + Sync>;

    /// bind_rtcp_writer lets you modify any outgoing RTCP packets. It is called once per PeerConnection.
    /// The returned writer will be called once per packet batch.
    async fn bind_rtcp_writer(
        &self,
        writer: Arc<dyn RTCPWriter + Send + Sync>,
    ) -> Arc<dyn RTCPWriter + Send + Sync>;

    /// bind_local_stream lets you modify any outgoing RTP packets. It is called once per LocalStream.
    /// The returned writer will be called once per rtp packet.
    async fn bind_local_stream(
        &self,
        info: &StreamInfo,
        writer: Arc<dyn RTPWriter + Send + Sync>,
    ) -> Arc<dyn RTPWriter + Send + Sync>;

    /// unbind_local_stream is called when the Stream is removed. It can be used to clean up any data related to that track.
    async fn unbind_local_stream(&self, info: &StreamInfo);

    /// bind_remote_stream lets you modify any incoming RTP packets. It is called once per RemoteStream.
    /// The returned reader will be called once per rtp packet.
    async fn bind_remote_stream(
        &self,
        info: &StreamInfo,
        reader: Arc<dyn RTPReader + Send + Sync>,
    ) -> Arc<dyn RTPReader + Send + Sync>;

    /// unbind_remote_stream is called when the Stream is removed. It can be used to clean up any data related to that track.
    async fn unbind_remote_stream(&self, info: &StreamInfo);

    /// close closes the Interceptor, cleaning up any data if necessary.
    async fn close(&self) -> Result<()>;
}

/// RTPWriter is used by Interceptor.bind_local_stream.
#[async_trait]
pub trait RTPWriter {
    /// write a rtp packet
    async fn write(&self, pkt: &rtp::packet::Packet, attributes: &Attributes) -> Result<usize>;
}

pub type RTPWriterBoxFn = Box<
    dyn (Fn(
            &rtp::packet::Packet,
            &Attributes,
        ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + Sync>>)
        + Send
        + Sync,
>;

pub struct RTPWriterFn(pub RTPWriterBoxFn);

#[async_trait]
impl RTPWriter for RTPWriterFn {
    async fn write(&self, pkt: &rtp::packet::Packet, attributes: &Attributes) -> Result<usize> {
        self.0(pkt, attributes).await
    }
}

/// RTPReader is used by Interceptor.bind_remote_stream.
///
/// `buf` is scratch space for the raw packet; the parsed packet is returned.
#[async_trait]
pub trait RTPReader {
    /// read a rtp packet
    async fn read(
        &self,
        buf: &mut [u8],
        attributes: &Attributes,
    ) -> Result<(rtp::packet::Packet, Attributes)>;
}

/// RTCPWriter is used by Interceptor.bind_rtcp_writer.
#[async_trait]
pub trait RTCPWriter {
    /// write a batch of rtcp packets
    async fn write(&self, pkts: &[RTCPPacket], attributes: &Attributes) -> Result<usize>;
}

pub type RTCPWriterBoxFn = Box<
    dyn (Fn(
            &[RTCPPacket],
            &Attributes,
        ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send>>)
        + Send
        + Sync,
>;

pub struct RTCPWriterFn(pub RTCPWriterBoxFn);

#[async_trait]
impl RTCPWriter for RTCPWriterFn {
    async fn write(&self, pkts: &[RTCPPacket], attributes: &Attributes) -> Result<usize> {
        self.0(pkts, attributes).await
    }
}

/// RTCPReader is used by Interceptor.bind_rtcp_reader.
#[async_trait]
pub trait RTCPReader {
    /// read a batch of rtcp packets
    async fn read(
        &self,
        buf: &mut [u8],
        attributes: &Attributes,
    ) -> Result<(Vec<RTCPPacket>, Attributes)>;
}
