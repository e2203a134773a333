#[cfg(test)]
mod track_local_static_test;

pub mod track_local_static_rtp;
pub mod track_local_static_sample;

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use interceptor::{Attributes, RTPWriter};
use tokio::sync::Mutex;
use util::marshal::Unmarshal;

use crate::peer_connection::configuration::media_engine::MediaEngine;
use crate::rtp_transceiver::rtp_codec::*;
use crate::rtp_transceiver::*;
use shared::error::{Error, Result};

pub use track_local_static_rtp::TrackLocalStaticRTP;
pub use track_local_static_sample::TrackLocalStaticSample;

/// TrackLocalWriter is the Writer for outbound RTP Packets
#[async_trait]
pub trait TrackLocalWriter: fmt::Debug {
    /// write_rtp encrypts a RTP packet and writes to the connection
    async fn write_rtp(&self, p: &rtp::packet::Packet) -> Result<usize>;

    /// write encrypts and writes a full RTP packet
    async fn write(&self, mut b: &[u8]) -> Result<usize> {
        let pkt = rtp::packet::Packet::unmarshal(&mut b)?;
        self.write_rtp(&pkt).await
    }
}

/// TrackLocalContext is the Context passed when a TrackLocal has been Binded/Unbinded from a PeerConnection, and used
/// in Interceptors.
#[derive(Clone)]
pub struct TrackLocalContext {
    pub(crate) id: String,
    pub(crate) params: RTCRtpParameters,
    pub(crate) ssrc: SSRC,
    pub(crate) write_stream: Arc<dyn TrackLocalWriter + Send + Sync>,
    pub(crate) paused: Arc<AtomicBool>,
    pub(crate) mid: Option<String>,
    pub(crate) media_engine: Arc<MediaEngine>,
}

impl fmt::Debug for TrackLocalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackLocalContext")
            .field("id", &self.id)
            .field("params", &self.params)
            .field("ssrc", &self.ssrc)
            .field("mid", &self.mid)
            .finish()
    }
}

impl TrackLocalContext {
    /// codec_parameters returns the negotiated RTPCodecParameters. These are the codecs supported by both
    /// PeerConnections and the SSRC/PayloadTypes
    pub fn codec_parameters(&self) -> &[RTCRtpCodecParameters] {
        &self.params.codecs
    }

    /// header_extensions returns the negotiated RTPHeaderExtensionParameters. These are the header extensions supported by
    /// both PeerConnections and the SSRC/PayloadTypes
    pub fn header_extensions(&self) -> &[RTCRtpHeaderExtensionParameters] {
        &self.params.header_extensions
    }

    /// ssrc requires the negotiated SSRC of this track
    pub fn ssrc(&self) -> SSRC {
        self.ssrc
    }

    /// write_stream returns the WriteStream for this TrackLocal. The implementer writes the outbound
    /// media packets to it
    pub fn write_stream(&self) -> Arc<dyn TrackLocalWriter + Send + Sync> {
        Arc::clone(&self.write_stream)
    }

    /// id is a unique identifier that is used for both bind/unbind
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// mid returns the id of media associated with the RTP stream
    pub fn mid(&self) -> Option<&str> {
        self.mid.as_deref()
    }

    /// payloader returns a fresh payloader for `codec`, honouring payloaders
    /// registered on the MediaEngine.
    pub fn payloader(
        &self,
        codec: &RTCRtpCodec,
    ) -> Result<Box<dyn rtp::packetizer::Payloader + Send + Sync>> {
        self.media_engine.payloader(codec)
    }
}

/// TrackLocal is an interface that controls how the user can send media
/// The user can provide their own TrackLocal implementations, or use
/// [`TrackLocalStaticRTP`] and [`TrackLocalStaticSample`].
#[async_trait]
pub trait TrackLocal {
    /// bind should implement the way how the media data flows from the Track to the PeerConnection
    /// This will be called internally after signaling is complete and the list of available
    /// codecs has been determined
    async fn bind(&self, t: &TrackLocalContext) -> Result<RTCRtpCodecParameters>;

    /// unbind should implement the teardown logic when the track is no longer needed. This happens
    /// because a track has been stopped.
    async fn unbind(&self, t: &TrackLocalContext) -> Result<()>;

    /// id is the unique identifier for this Track. This should be unique for the
    /// stream, but doesn't have to globally unique. A common example would be 'audio' or 'video'
    /// and stream_id would be 'desktop' or 'webcam'
    fn id(&self) -> &str;

    /// rid is the RTP stream identifier used when the track is one layer of
    /// a simulcast encoding.
    fn rid(&self) -> Option<&str>;

    /// stream_id is the group this track belongs too. This must be unique
    fn stream_id(&self) -> &str;

    /// kind controls if this TrackLocal is audio or video
    fn kind(&self) -> RtpCodecKind;

    fn as_any(&self) -> &dyn Any;
}

/// TrackBinding is a single bind for a Track
/// Bind can be called multiple times, this stores the
/// result for a single bind call so that it can be used when writing
#[derive(Debug, Clone)]
pub(crate) struct TrackBinding {
    id: String,
    ssrc: SSRC,
    payload_type: PayloadType,
    params: RTCRtpParameters,
    write_stream: Arc<dyn TrackLocalWriter + Send + Sync>,
    sender_paused: Arc<AtomicBool>,
    hdr_ext_ids: Vec<(u8, Bytes)>,
}

impl TrackBinding {
    pub(crate) fn is_sender_paused(&self) -> bool {
        self.sender_paused.load(Ordering::SeqCst)
    }
}

/// InterceptorToTrackLocalWriter hands packets written by a track to the
/// interceptor chain bound to its sender.
pub(crate) struct InterceptorToTrackLocalWriter {
    pub(crate) interceptor_rtp_writer: Mutex<Option<Arc<dyn RTPWriter + Send + Sync>>>,
    sender_paused: Arc<AtomicBool>,
}

impl InterceptorToTrackLocalWriter {
    pub(crate) fn new(paused: Arc<AtomicBool>) -> Self {
        InterceptorToTrackLocalWriter {
            interceptor_rtp_writer: Mutex::new(None),
            sender_paused: paused,
        }
    }

    fn is_sender_paused(&self) -> bool {
        self.sender_paused.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for InterceptorToTrackLocalWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorToTrackLocalWriter")
            .field("paused", &self.is_sender_paused())
            .finish()
    }
}

#[async_trait]
impl TrackLocalWriter for InterceptorToTrackLocalWriter {
    async fn write_rtp(&self, pkt: &rtp::packet::Packet) -> Result<usize> {
        if self.is_sender_paused() {
            return Ok(0);
        }

        let interceptor_rtp_writer = self.interceptor_rtp_writer.lock().await;
        if let Some(writer) = &*interceptor_rtp_writer {
            writer.write(pkt, &Attributes::new()).await
        } else {
            Err(Error::ErrInterceptorNotBind)
        }
    }
}

/// kind_from_mime_type classifies a MIME type by its `audio/` or `video/`
/// prefix.
pub(crate) fn kind_from_mime_type(mime_type: &str) -> RtpCodecKind {
    let lower = mime_type.to_lowercase();
    if lower.starts_with("audio/") {
        RtpCodecKind::Audio
    } else if lower.starts_with("video/") {
        RtpCodecKind::Video
    } else {
        RtpCodecKind::Unspecified
    }
}
