#[cfg(test)]
mod rtp_sender_test;

mod srtp_writer_future;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use interceptor::stream_info::{AssociatedStreamInfo, StreamInfo};
use interceptor::{Attributes, Interceptor, RTCPPacket, RTCPReader, RTPWriter};
use log::trace;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

use crate::media_stream::track_local::{
    InterceptorToTrackLocalWriter, TrackLocal, TrackLocalContext,
};
use crate::peer_connection::configuration::media_engine::MediaEngine;
use crate::peer_connection::transport::RTCDtlsTransport;
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::statistics::report::TRANSPORT_STATS_ID;
use crate::statistics::stats::{
    RTCOutboundRtpStreamStats, RTCRtpStreamStats, RTCStats, RTCStatsType,
};
use crate::rtp_transceiver::rtp_codec::*;
use crate::rtp_transceiver::{
    create_stream_info, PayloadType, RTCRtpEncodingParameters, RTCRtpRtxParameters,
    RTCRtpSendParameters, RTCRtpTransceiver, SSRC,
};
use shared::error::{flatten_errs, Error, Result};
use shared::util::math_rand_alpha;
use srtp_writer_future::SrtpWriterFuture;

/// RtxEncoding is the repair stream paired with one encoding.
pub(crate) struct RtxEncoding {
    pub(crate) ssrc: SSRC,
    pub(crate) srtp_stream: Arc<SrtpWriterFuture>,
    pub(crate) rtcp_interceptor: Arc<dyn RTCPReader + Send + Sync>,
    pub(crate) stream_info: Option<StreamInfo>,
}

/// TrackEncoding is one simulcast layer of a sender: the track feeding it,
/// its SSRC and the SRTP stream it is written to.
pub(crate) struct TrackEncoding {
    pub(crate) track: Option<Arc<dyn TrackLocal + Send + Sync>>,
    pub(crate) ssrc: SSRC,
    pub(crate) srtp_stream: Arc<SrtpWriterFuture>,
    pub(crate) rtcp_interceptor: Arc<dyn RTCPReader + Send + Sync>,
    pub(crate) stream_info: Option<StreamInfo>,
    pub(crate) context: Option<TrackLocalContext>,
    pub(crate) rtx: Option<RtxEncoding>,
}

/// RTPSender allows an application to control how a given Track is encoded and transmitted to a remote peer
pub struct RTCRtpSender {
    pub(crate) track_encodings: Mutex<Vec<TrackEncoding>>,

    pub(crate) transport: Arc<RTCDtlsTransport>,

    pub(crate) payload_type: AtomicU8,
    pub(crate) kind: RtpCodecKind,
    receive_mtu: usize,
    enable_rtx: bool,

    /// a transceiver sender since we can just check the
    /// transceiver negotiation status
    pub(crate) negotiated: AtomicBool,

    pub(crate) media_engine: Arc<MediaEngine>,
    pub(crate) interceptor: Arc<dyn Interceptor + Send + Sync>,

    pub(crate) id: String,

    /// The id of the initial track, even if we later change to a different
    /// track id should be use when negotiating.
    pub(crate) initial_track_id: util::sync::Mutex<Option<String>>,
    /// AssociatedMediaStreamIds from the WebRTC specifications
    pub(crate) associated_media_stream_ids: util::sync::Mutex<Vec<String>>,

    rtp_transceiver: util::sync::Mutex<Option<Weak<RTCRtpTransceiver>>>,

    send_called: watch::Sender<bool>,
    stop_called: Arc<watch::Sender<bool>>,

    paused: Arc<AtomicBool>,
    rtcp_read_deadline: util::sync::Mutex<Option<Instant>>,
}

impl fmt::Debug for RTCRtpSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCRtpSender")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("has_sent", &self.has_sent())
            .field("has_stopped", &self.has_stopped())
            .finish()
    }
}

impl RTCRtpSender {
    pub async fn new(
        receive_mtu: usize,
        track: Option<Arc<dyn TrackLocal + Send + Sync>>,
        kind: RtpCodecKind,
        transport: Arc<RTCDtlsTransport>,
        media_engine: Arc<MediaEngine>,
        interceptor: Arc<dyn Interceptor + Send + Sync>,
        start_paused: bool,
    ) -> Self {
        let id = math_rand_alpha(32);
        let (send_called, _) = watch::channel(false);
        let (stop_called, _) = watch::channel(false);
        let enable_rtx =
            media_engine.is_rtx_enabled(kind, RTCRtpTransceiverDirection::Sendonly);

        let ret = Self {
            track_encodings: Mutex::new(vec![]),

            transport,

            payload_type: AtomicU8::new(0),
            kind,
            receive_mtu,
            enable_rtx,

            negotiated: AtomicBool::new(false),

            media_engine,
            interceptor,

            id,
            initial_track_id: util::sync::Mutex::new(None),
            associated_media_stream_ids: util::sync::Mutex::new(vec![]),

            rtp_transceiver: util::sync::Mutex::new(None),

            send_called,
            stop_called: Arc::new(stop_called),
            paused: Arc::new(AtomicBool::new(start_paused)),
            rtcp_read_deadline: util::sync::Mutex::new(None),
        };

        if let Some(track) = track {
            let mut track_encodings = ret.track_encodings.lock().await;
            ret.add_encoding_internal(&mut track_encodings, track).await;
        }

        ret
    }

    /// add_encoding adds an encoding to RTPSender. Used by simulcast senders.
    pub async fn add_encoding(&self, track: Arc<dyn TrackLocal + Send + Sync>) -> Result<()> {
        let mut track_encodings = self.track_encodings.lock().await;

        if track.rid().unwrap_or_default().is_empty() {
            return Err(Error::ErrRTPSenderRidNil);
        }

        if self.has_stopped() {
            return Err(Error::ErrRTPSenderStopped);
        }

        if self.has_sent() {
            return Err(Error::ErrRTPSenderSendAlreadyCalled);
        }

        let base_track = track_encodings
            .first()
            .and_then(|e| e.track.clone())
            .ok_or(Error::ErrRTPSenderNoBaseEncoding)?;
        if base_track.rid().unwrap_or_default().is_empty() {
            return Err(Error::ErrRTPSenderNoBaseEncoding);
        }

        if base_track.id() != track.id()
            || base_track.stream_id() != track.stream_id()
            || base_track.kind() != track.kind()
        {
            return Err(Error::ErrRTPSenderBaseEncodingMismatch);
        }

        if track_encodings.iter().any(|e| {
            e.track
                .as_ref()
                .is_some_and(|t| t.rid() == track.rid())
        }) {
            return Err(Error::ErrRTPSenderRIDCollision);
        }

        self.add_encoding_internal(&mut track_encodings, track).await;

        Ok(())
    }

    async fn add_encoding_internal(
        &self,
        track_encodings: &mut Vec<TrackEncoding>,
        track: Arc<dyn TrackLocal + Send + Sync>,
    ) {
        let ssrc = rand::random::<u32>();
        let srtp_stream = Arc::new(SrtpWriterFuture::new(
            ssrc,
            Arc::clone(&self.stop_called),
            Arc::clone(&self.transport),
        ));
        let srtcp_reader = Arc::clone(&srtp_stream) as Arc<dyn RTCPReader + Send + Sync>;
        let rtcp_interceptor = self.interceptor.bind_rtcp_reader(srtcp_reader).await;

        let rtx = if self.enable_rtx {
            let rtx_ssrc = rand::random::<u32>();
            let rtx_srtp_stream = Arc::new(SrtpWriterFuture::new(
                rtx_ssrc,
                Arc::clone(&self.stop_called),
                Arc::clone(&self.transport),
            ));
            let rtx_srtcp_reader =
                Arc::clone(&rtx_srtp_stream) as Arc<dyn RTCPReader + Send + Sync>;
            let rtx_rtcp_interceptor = self.interceptor.bind_rtcp_reader(rtx_srtcp_reader).await;

            Some(RtxEncoding {
                ssrc: rtx_ssrc,
                srtp_stream: rtx_srtp_stream,
                rtcp_interceptor: rtx_rtcp_interceptor,
                stream_info: None,
            })
        } else {
            None
        };

        track_encodings.push(TrackEncoding {
            track: Some(track),
            ssrc,
            srtp_stream,
            rtcp_interceptor,
            stream_info: None,
            context: None,
            rtx,
        });
    }

    pub(crate) async fn is_negotiated(&self) -> bool {
        self.negotiated.load(Ordering::SeqCst)
    }

    pub(crate) async fn set_negotiated(&self) {
        self.negotiated.store(true, Ordering::SeqCst);
    }

    pub(crate) async fn set_rtp_transceiver(&self, rtp_transceiver: Option<Weak<RTCRtpTransceiver>>) {
        if let Some(t) = rtp_transceiver.as_ref().and_then(|t| t.upgrade()) {
            self.set_paused(!t.direction().has_send());
        }
        let mut tr = self.rtp_transceiver.lock();
        *tr = rtp_transceiver;
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn mid(&self) -> Option<String> {
        let tr = self.rtp_transceiver.lock();
        tr.as_ref().and_then(|t| t.upgrade()).and_then(|t| t.mid())
    }

    fn transceiver(&self) -> Option<Arc<RTCRtpTransceiver>> {
        let tr = self.rtp_transceiver.lock();
        tr.as_ref().and_then(|t| t.upgrade())
    }

    /// transport returns the currently-configured DTLSTransport
    /// if one has not yet been configured
    pub fn transport(&self) -> Arc<RTCDtlsTransport> {
        Arc::clone(&self.transport)
    }

    /// get_parameters describes the current configuration for the encoding and
    /// transmission of media on the sender's track.
    pub async fn get_parameters(&self) -> RTCRtpSendParameters {
        let encodings = {
            let track_encodings = self.track_encodings.lock().await;
            track_encodings
                .iter()
                .map(|e| RTCRtpEncodingParameters {
                    rid: e
                        .track
                        .as_ref()
                        .and_then(|t| t.rid())
                        .unwrap_or_default()
                        .to_owned(),
                    ssrc: e.ssrc,
                    payload_type: self.payload_type.load(Ordering::SeqCst),
                    rtx: RTCRtpRtxParameters {
                        ssrc: e.rtx.as_ref().map(|r| r.ssrc).unwrap_or(0),
                    },
                })
                .collect()
        };

        let mut rtp_parameters = self
            .media_engine
            .get_rtp_parameters_by_kind(self.kind, RTCRtpTransceiverDirection::Sendonly);
        rtp_parameters.codecs = match self.transceiver() {
            Some(t) => t.get_codecs().await,
            None => self.media_engine.get_codecs_by_kind(self.kind),
        };

        RTCRtpSendParameters {
            rtp_parameters,
            encodings,
        }
    }

    /// track returns the RTCRtpTransceiver track, or nil
    pub async fn track(&self) -> Option<Arc<dyn TrackLocal + Send + Sync>> {
        let track_encodings = self.track_encodings.lock().await;
        track_encodings.first().and_then(|e| e.track.clone())
    }

    /// replace_track replaces the track currently being used as the sender's source with a new TrackLocal.
    /// The new track must be of the same media kind (audio, video, etc) and switching the track should not
    /// require negotiation.
    pub async fn replace_track(
        &self,
        track: Option<Arc<dyn TrackLocal + Send + Sync>>,
    ) -> Result<()> {
        let mut track_encodings = self.track_encodings.lock().await;

        if let Some(t) = &track {
            if self.kind != t.kind() {
                return Err(Error::ErrRTPSenderNewTrackHasIncorrectKind);
            }

            // cannot replace simulcast envelope
            if track_encodings.len() > 1 {
                return Err(Error::ErrRTPSenderNewTrackHasIncorrectEnvelope);
            }
        }

        let has_sent = self.has_sent();
        let mut replaced_track = None;
        let mut context = None;
        for e in track_encodings.iter_mut() {
            replaced_track = e.track.clone();
            context = e.context.clone();

            if has_sent {
                if let (Some(replaced), Some(ctx)) = (&replaced_track, &context) {
                    replaced.unbind(ctx).await?;
                }
            }

            if !has_sent || track.is_none() {
                e.track = track.clone();
            }
        }

        let track = match track {
            Some(track) if has_sent => track,
            _ => return Ok(()),
        };

        // If we reach this point in the routine, there is only 1 track encoding
        let mut context = match context {
            Some(context) => context,
            None => return Err(Error::ErrRTPSenderTrackNil),
        };
        context.mid = self.mid();

        let codec = match track.bind(&context).await {
            Ok(codec) => codec,
            Err(err) => {
                // Re-bind the original track
                if let Some(replaced) = &replaced_track {
                    replaced.bind(&context).await?;
                }
                return Err(err);
            }
        };

        // Codec has changed
        if self.payload_type.load(Ordering::SeqCst) != codec.payload_type {
            context.params.codecs = vec![codec];
        }

        if let Some(e) = track_encodings.first_mut() {
            e.track = Some(track);
            e.context = Some(context);
        }

        Ok(())
    }

    /// send Attempts to set the parameters controlling the sending of media.
    pub async fn send(&self, parameters: &RTCRtpSendParameters) -> Result<()> {
        if self.has_sent() {
            return Err(Error::ErrRTPSenderSendAlreadyCalled);
        }
        if self.has_stopped() {
            return Err(Error::ErrRTPSenderStopped);
        }

        let mid = self.mid();
        let mut track_encodings = self.track_encodings.lock().await;
        for (idx, e) in track_encodings.iter_mut().enumerate() {
            let track = e.track.clone().ok_or(Error::ErrRTPSenderTrackNil)?;
            let ssrc = parameters.encodings.get(idx).map(|p| p.ssrc).unwrap_or(e.ssrc);

            let write_stream = Arc::new(InterceptorToTrackLocalWriter::new(Arc::clone(
                &self.paused,
            )));
            let mut context = TrackLocalContext {
                id: self.id.clone(),
                params: self
                    .media_engine
                    .get_rtp_parameters_by_kind(self.kind, RTCRtpTransceiverDirection::Sendonly),
                ssrc,
                write_stream: Arc::clone(&write_stream) as _,
                paused: Arc::clone(&self.paused),
                mid: mid.clone(),
                media_engine: Arc::clone(&self.media_engine),
            };

            let codec = track.bind(&context).await?;
            let rtx_payload_type = find_rtx_payload_type(codec.payload_type, &context.params.codecs);
            let fec_payload_type = find_fec_payload_type(&context.params.codecs);
            context.params.codecs = vec![codec.clone()];

            let rtx_info = match (&e.rtx, rtx_payload_type) {
                (Some(rtx), Some(payload_type)) => Some(AssociatedStreamInfo {
                    ssrc: rtx.ssrc,
                    payload_type,
                }),
                _ => None,
            };
            let fec_info = fec_payload_type.map(|payload_type| AssociatedStreamInfo {
                ssrc: 0,
                payload_type,
            });

            let stream_info = create_stream_info(
                self.id.clone(),
                ssrc,
                codec.payload_type,
                codec.rtp_codec.clone(),
                &parameters.rtp_parameters.header_extensions,
                rtx_info,
                fec_info,
            );

            let srtp_writer = Arc::clone(&e.srtp_stream) as Arc<dyn RTPWriter + Send + Sync>;
            let rtp_interceptor = self
                .interceptor
                .bind_local_stream(&stream_info, srtp_writer)
                .await;
            {
                let mut interceptor_rtp_writer = write_stream.interceptor_rtp_writer.lock().await;
                *interceptor_rtp_writer = Some(rtp_interceptor);
            }

            if let (Some(rtx), Some(info)) = (e.rtx.as_mut(), rtx_info) {
                let rtx_codec = RTCRtpCodec {
                    mime_type: crate::peer_connection::configuration::media_engine::MIME_TYPE_RTX
                        .to_owned(),
                    clock_rate: codec.rtp_codec.clock_rate,
                    sdp_fmtp_line: format!("apt={}", codec.payload_type),
                    ..Default::default()
                };
                let rtx_stream_info = create_stream_info(
                    self.id.clone(),
                    info.ssrc,
                    info.payload_type,
                    rtx_codec,
                    &parameters.rtp_parameters.header_extensions,
                    None,
                    None,
                );
                let rtx_writer = Arc::clone(&rtx.srtp_stream) as Arc<dyn RTPWriter + Send + Sync>;
                self.interceptor
                    .bind_local_stream(&rtx_stream_info, rtx_writer)
                    .await;
                rtx.stream_info = Some(rtx_stream_info);
            }

            self.payload_type.store(codec.payload_type, Ordering::SeqCst);
            e.context = Some(context);
            e.stream_info = Some(stream_info);
            trace!("sender {} bound ssrc {} with pt {}", self.id, ssrc, codec.payload_type);
        }

        self.send_called.send_replace(true);
        Ok(())
    }

    /// stop irreversibly stops the RTPSender
    pub async fn stop(&self) -> Result<()> {
        if self.has_stopped() {
            return Ok(());
        }
        self.stop_called.send_replace(true);

        let mut errs = vec![];
        if let Err(err) = self.replace_track(None).await {
            errs.push(err);
        }

        if !self.has_sent() {
            return flatten_errs(errs);
        }

        let track_encodings = self.track_encodings.lock().await;
        for e in &*track_encodings {
            if let Some(stream_info) = &e.stream_info {
                self.interceptor.unbind_local_stream(stream_info).await;
            }
            if let Err(err) = e.srtp_stream.close().await {
                errs.push(err);
            }
            if let Some(rtx) = &e.rtx {
                if let Some(stream_info) = &rtx.stream_info {
                    self.interceptor.unbind_local_stream(stream_info).await;
                }
                if let Err(err) = rtx.srtp_stream.close().await {
                    errs.push(err);
                }
            }
        }

        flatten_errs(errs)
    }

    async fn wait_for_send(&self) -> Result<()> {
        let mut send_called_rx = self.send_called.subscribe();
        let mut stop_called_rx = self.stop_called.subscribe();
        tokio::select! {
            _ = send_called_rx.wait_for(|sent| *sent) => {
                if self.has_stopped() {
                    return Err(Error::ErrConnectionClosed);
                }
                Ok(())
            }
            _ = stop_called_rx.wait_for(|stopped| *stopped) => Err(Error::ErrConnectionClosed),
        }
    }

    async fn read_from(
        &self,
        b: &mut [u8],
        rtcp_interceptor: Arc<dyn RTCPReader + Send + Sync>,
    ) -> Result<(Vec<RTCPPacket>, Attributes)> {
        let deadline = *self.rtcp_read_deadline.lock();
        let mut stop_called_rx = self.stop_called.subscribe();
        let a = Attributes::new();
        let read = async {
            tokio::select! {
                _ = stop_called_rx.wait_for(|stopped| *stopped) => Err(Error::ErrConnectionClosed),
                result = rtcp_interceptor.read(b, &a) => result,
            }
        };
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, read)
                .await
                .map_err(|_| Error::Util(util::Error::ErrTimeout))?,
            None => read.await,
        }
    }

    /// read reads incoming RTCP for this RTPReceiver
    pub async fn read(&self, b: &mut [u8]) -> Result<(Vec<RTCPPacket>, Attributes)> {
        self.wait_for_send().await?;

        let rtcp_interceptor = {
            let track_encodings = self.track_encodings.lock().await;
            track_encodings
                .first()
                .map(|e| Arc::clone(&e.rtcp_interceptor))
        };
        let rtcp_interceptor = rtcp_interceptor.ok_or(Error::ErrInterceptorNotBind)?;
        self.read_from(b, rtcp_interceptor).await
    }

    /// read_simulcast reads incoming RTCP for this RTPSender for given rid
    pub async fn read_simulcast(
        &self,
        b: &mut [u8],
        rid: &str,
    ) -> Result<(Vec<RTCPPacket>, Attributes)> {
        self.wait_for_send().await?;

        let rtcp_interceptor = {
            let track_encodings = self.track_encodings.lock().await;
            track_encodings
                .iter()
                .find(|e| e.track.as_ref().and_then(|t| t.rid()) == Some(rid))
                .map(|e| Arc::clone(&e.rtcp_interceptor))
        };
        let rtcp_interceptor =
            rtcp_interceptor.ok_or(Error::ErrRTPReceiverForRIDTrackStreamNotFound)?;
        self.read_from(b, rtcp_interceptor).await
    }

    /// read_rtcp is a convenience method that wraps Read and unmarshals for you.
    pub async fn read_rtcp(&self) -> Result<(Vec<RTCPPacket>, Attributes)> {
        let mut b = vec![0u8; self.receive_mtu];
        self.read(&mut b).await
    }

    /// read_simulcast_rtcp is a convenience method that wraps ReadSimulcast and unmarshal for you
    pub async fn read_simulcast_rtcp(&self, rid: &str) -> Result<(Vec<RTCPPacket>, Attributes)> {
        let mut b = vec![0u8; self.receive_mtu];
        self.read_simulcast(&mut b, rid).await
    }

    /// set_rtcp_read_deadline bounds every following RTCP read of this
    /// sender; `None` clears it.
    pub fn set_rtcp_read_deadline(&self, deadline: Option<Instant>) {
        let mut d = self.rtcp_read_deadline.lock();
        *d = deadline;
    }

    /// has_sent tells if data has been ever sent for this instance
    pub(crate) fn has_sent(&self) -> bool {
        *self.send_called.borrow()
    }

    /// has_stopped tells if stop has been called
    pub(crate) fn has_stopped(&self) -> bool {
        *self.stop_called.borrow()
    }

    /// ssrcs returns the primary and RTX SSRC of every encoding.
    pub(crate) async fn ssrcs(&self) -> Vec<(SSRC, Option<SSRC>)> {
        let track_encodings = self.track_encodings.lock().await;
        track_encodings
            .iter()
            .map(|e| (e.ssrc, e.rtx.as_ref().map(|r| r.ssrc)))
            .collect()
    }

    /// rids returns the RID of every simulcast encoding, in order.
    pub(crate) async fn rids(&self) -> Vec<String> {
        let track_encodings = self.track_encodings.lock().await;
        track_encodings
            .iter()
            .filter_map(|e| e.track.as_ref().and_then(|t| t.rid()).map(str::to_owned))
            .collect()
    }

    pub(crate) fn initial_track_id(&self) -> Option<String> {
        let mut_id = self.initial_track_id.lock();
        mut_id.clone()
    }

    pub(crate) fn set_initial_track_id(&self, id: String) -> Result<()> {
        let mut mut_id = self.initial_track_id.lock();
        if mut_id.is_some() {
            return Err(Error::ErrSenderInitialTrackIdAlreadySet);
        }
        *mut_id = Some(id);
        Ok(())
    }

    pub(crate) fn associate_media_stream_id(&self, id: String) -> bool {
        let mut mut_ids = self.associated_media_stream_ids.lock();
        if mut_ids.contains(&id) {
            return false;
        }
        mut_ids.push(id);
        true
    }

    pub(crate) fn associated_media_stream_ids(&self) -> Vec<String> {
        let ids = self.associated_media_stream_ids.lock();
        ids.clone()
    }

    pub(crate) fn payload_type(&self) -> PayloadType {
        self.payload_type.load(Ordering::SeqCst)
    }

    /// collect_stats reports one outbound stream per encoding.
    pub(crate) async fn collect_stats(
        &self,
        now: SystemTime,
        mid: &str,
    ) -> Vec<RTCOutboundRtpStreamStats> {
        let track_encodings = self.track_encodings.lock().await;
        track_encodings
            .iter()
            .map(|encoding| RTCOutboundRtpStreamStats {
                rtp_stream_stats: RTCRtpStreamStats {
                    stats: RTCStats {
                        timestamp: now,
                        typ: RTCStatsType::OutboundRTP,
                        id: format!("RTCOutboundRTP{}Stream_{}", self.kind, encoding.ssrc),
                    },
                    ssrc: encoding.ssrc,
                    kind: self.kind.to_string(),
                    transport_id: TRANSPORT_STATS_ID.to_owned(),
                    mid: mid.to_owned(),
                    rid: encoding
                        .track
                        .as_ref()
                        .and_then(|t| t.rid())
                        .map(str::to_owned),
                },
                packets_sent: encoding.srtp_stream.sent.packets(),
                bytes_sent: encoding.srtp_stream.sent.bytes(),
            })
            .collect()
    }
}
