#[cfg(test)]
mod rtp_receiver_test;

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use arc_swap::ArcSwapOption;
use interceptor::stream_info::{AssociatedStreamInfo, StreamInfo};
use interceptor::{Attributes, Interceptor, RTCPPacket, RTCPReader, RTPReader};
use log::trace;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::Instant;

use crate::media_stream::track_remote::TrackRemote;
use crate::peer_connection::configuration::media_engine::MediaEngine;
use crate::peer_connection::transport::srtp::Stream;
use crate::peer_connection::transport::RTCDtlsTransport;
use crate::rtp_transceiver::direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::rtp_codec::*;
use crate::rtp_transceiver::{create_stream_info, RTCRtpReceiveParameters, SSRC};
use crate::statistics::report::TRANSPORT_STATS_ID;
use crate::statistics::stats::{
    RTCInboundRtpStreamStats, RTCRtpStreamStats, RTCStats, RTCStatsType,
};
use shared::error::{flatten_errs, Error, Result};

/// State represents the state of the receiver
///
/// Possible transitions:
///
/// Unstarted -> Started -> Paused -> Stopped
/// Unstarted -> UnstartedPaused -> Paused -> Started -> Stopped
/// Any state -> Stopped
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum State {
    /// We haven't started yet.
    Unstarted = 0,
    /// We haven't started yet and additionally we've been paused.
    UnstartedPaused = 1,

    /// We have started and are running.
    Started = 2,

    /// We have been paused after starting.
    Paused = 3,

    /// We have been stopped.
    Stopped = 4,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Unstarted => write!(f, "Unstarted"),
            State::UnstartedPaused => write!(f, "UnstartedPaused"),
            State::Started => write!(f, "Running"),
            State::Paused => write!(f, "Paused"),
            State::Stopped => write!(f, "Closed"),
        }
    }
}

impl State {
    fn transition(to: Self, tx: &watch::Sender<State>) -> Result<()> {
        let current = *tx.borrow();
        if current == to {
            // Already in this state
            return Ok(());
        }

        match current {
            State::Unstarted
                if matches!(to, State::Started | State::Stopped | State::UnstartedPaused) => {}
            State::UnstartedPaused
                if matches!(to, State::Unstarted | State::Stopped | State::Paused) => {}
            State::Started if matches!(to, State::Paused | State::Stopped) => {}
            State::Paused if matches!(to, State::Started | State::Stopped) => {}
            _ => {
                return Err(Error::Other(format!(
                    "invalid state transition from {current} to {to}"
                )));
            }
        }

        tx.send_replace(to);
        Ok(())
    }

    /// wait_for resolves once the receiver is in one of `states`, and fails
    /// once it is stopped.
    async fn wait_for(rx: &mut watch::Receiver<State>, states: &[State]) -> Result<()> {
        loop {
            let state = *rx.borrow_and_update();

            if states.contains(&state) {
                return Ok(());
            }
            if state == State::Stopped {
                return Err(Error::ErrConnectionClosed);
            }

            if rx.changed().await.is_err() {
                return Err(Error::ErrConnectionClosed);
            }
        }
    }

    /// error_on_close resolves with an error as soon as the receiver stops.
    async fn error_on_close(rx: &mut watch::Receiver<State>) -> Result<()> {
        loop {
            if *rx.borrow_and_update() == State::Stopped {
                return Err(Error::ErrConnectionClosed);
            }
            if rx.changed().await.is_err() {
                return Err(Error::ErrConnectionClosed);
            }
        }
    }
}

/// TrackStream is one bound SSRC: its SRTP/SRTCP read streams and the
/// interceptor readers layered over them.
#[derive(Default, Clone)]
pub(crate) struct TrackStream {
    pub(crate) stream_info: Option<StreamInfo>,
    pub(crate) rtp_read_stream: Option<Arc<Stream>>,
    pub(crate) rtp_interceptor: Option<Arc<dyn RTPReader + Send + Sync>>,
    pub(crate) rtcp_read_stream: Option<Arc<Stream>>,
    pub(crate) rtcp_interceptor: Option<Arc<dyn RTCPReader + Send + Sync>>,
}

impl fmt::Debug for TrackStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackStream")
            .field("stream_info", &self.stream_info)
            .field("rtp_read_stream", &self.rtp_read_stream)
            .field("rtcp_read_stream", &self.rtcp_read_stream)
            .finish()
    }
}

impl TrackStream {
    async fn close(&self, interceptor: &Arc<dyn Interceptor + Send + Sync>) -> Vec<Error> {
        let mut errs = vec![];
        if let Some(rtcp_read_stream) = &self.rtcp_read_stream {
            if let Err(err) = rtcp_read_stream.close().await {
                errs.push(err);
            }
        }
        if let Some(rtp_read_stream) = &self.rtp_read_stream {
            if let Err(err) = rtp_read_stream.close().await {
                errs.push(err);
            }
        }
        if let Some(stream_info) = &self.stream_info {
            interceptor.unbind_remote_stream(stream_info).await;
        }
        errs
    }
}

/// TrackStreams maintains a mapping of RTP/RTCP streams to a specific track
/// a RTPReceiver may contain multiple streams if we are dealing with Simulcast
#[derive(Debug, Clone)]
pub(crate) struct TrackStreams {
    pub(crate) track: Arc<TrackRemote>,
    pub(crate) stream: TrackStream,
    pub(crate) repair_stream: TrackStream,
}

/// RTPReceiverInternal is the state a [`TrackRemote`] reads through.
pub struct RTPReceiverInternal {
    pub(crate) kind: RtpCodecKind,
    tracks: RwLock<Vec<TrackStreams>>,
    state_tx: watch::Sender<State>,

    transceiver_codecs: ArcSwapOption<Mutex<Vec<RTCRtpCodecParameters>>>,

    transport: Arc<RTCDtlsTransport>,
    media_engine: Arc<MediaEngine>,
    interceptor: Arc<dyn Interceptor + Send + Sync>,

    rtcp_read_deadline: util::sync::Mutex<Option<Instant>>,
}

impl RTPReceiverInternal {
    fn rtcp_deadline(&self) -> Option<Instant> {
        *self.rtcp_read_deadline.lock()
    }

    /// read reads incoming RTCP for this RTPReceiver
    async fn read(&self, b: &mut [u8]) -> Result<(Vec<RTCPPacket>, Attributes)> {
        let mut state_watch_rx = self.state_tx.subscribe();

        // Ensure we are running or paused. When paused we still receive RTCP even if RTP traffic
        // isn't flowing.
        State::wait_for(&mut state_watch_rx, &[State::Started, State::Paused]).await?;

        let rtcp_interceptor = {
            let tracks = self.tracks.read().await;
            tracks
                .first()
                .and_then(|t| t.stream.rtcp_interceptor.clone())
        };
        let rtcp_interceptor = rtcp_interceptor.ok_or(Error::ErrInterceptorNotBind)?;

        let a = Attributes::new();
        with_deadline(self.rtcp_deadline(), async {
            tokio::select! {
                res = State::error_on_close(&mut state_watch_rx) => {
                    res?;
                    Err(Error::ErrConnectionClosed)
                }
                result = rtcp_interceptor.read(b, &a) => result,
            }
        })
        .await
    }

    /// read_simulcast reads incoming RTCP for this RTPReceiver for given rid
    async fn read_simulcast(
        &self,
        b: &mut [u8],
        rid: &str,
    ) -> Result<(Vec<RTCPPacket>, Attributes)> {
        let mut state_watch_rx = self.state_tx.subscribe();

        State::wait_for(&mut state_watch_rx, &[State::Started, State::Paused]).await?;

        let rtcp_interceptor = {
            let tracks = self.tracks.read().await;
            tracks
                .iter()
                .find(|t| t.track.rid() == rid)
                .and_then(|t| t.stream.rtcp_interceptor.clone())
        };
        let rtcp_interceptor =
            rtcp_interceptor.ok_or(Error::ErrRTPReceiverForRIDTrackStreamNotFound)?;

        let a = Attributes::new();
        with_deadline(self.rtcp_deadline(), async {
            tokio::select! {
                res = State::error_on_close(&mut state_watch_rx) => {
                    res?;
                    Err(Error::ErrConnectionClosed)
                }
                result = rtcp_interceptor.read(b, &a) => result,
            }
        })
        .await
    }

    /// read_rtp should only be called by a track, this only exists so we can keep state in one place
    pub(crate) async fn read_rtp(
        &self,
        b: &mut [u8],
        tid: usize,
    ) -> Result<(rtp::packet::Packet, Attributes)> {
        let mut state_watch_rx = self.state_tx.subscribe();

        // Ensure we are running.
        State::wait_for(&mut state_watch_rx, &[State::Started]).await?;

        let rtp_interceptor = {
            let tracks = self.tracks.read().await;
            tracks
                .iter()
                .find(|t| t.track.tid() == tid)
                .and_then(|t| t.stream.rtp_interceptor.clone())
        };
        let rtp_interceptor =
            rtp_interceptor.ok_or(Error::ErrRTPReceiverWithSSRCTrackStreamNotFound)?;

        let a = Attributes::new();
        loop {
            tokio::select! {
                _ = state_watch_rx.changed() => {
                    let new_state = *state_watch_rx.borrow();

                    if new_state == State::Stopped {
                        return Err(Error::ErrConnectionClosed);
                    }
                }
                result = rtp_interceptor.read(b, &a) => {
                    let result = result?;

                    if *state_watch_rx.borrow() == State::Paused {
                        trace!("Dropping {} read bytes received while RTPReceiver was paused", b.len());
                        continue;
                    }
                    return Ok(result);
                }
            }
        }
    }

    fn transition(&self, to: State) -> Result<()> {
        State::transition(to, &self.state_tx)
    }
}

async fn with_deadline<T>(
    deadline: Option<Instant>,
    f: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, f)
            .await
            .map_err(|_| Error::Util(util::Error::ErrTimeout))?,
        None => f.await,
    }
}

/// RTPReceiver allows an application to inspect the receipt of a TrackRemote
pub struct RTCRtpReceiver {
    receive_mtu: usize,
    kind: RtpCodecKind,
    transport: Arc<RTCDtlsTransport>,

    pub internal: Arc<RTPReceiverInternal>,
}

impl fmt::Debug for RTCRtpReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCRtpReceiver")
            .field("kind", &self.kind)
            .field("state", &*self.internal.state_tx.borrow())
            .finish()
    }
}

impl RTCRtpReceiver {
    pub fn new(
        receive_mtu: usize,
        kind: RtpCodecKind,
        transport: Arc<RTCDtlsTransport>,
        media_engine: Arc<MediaEngine>,
        interceptor: Arc<dyn Interceptor + Send + Sync>,
    ) -> Self {
        let (state_tx, _) = watch::channel(State::Unstarted);

        RTCRtpReceiver {
            receive_mtu,
            kind,
            transport: Arc::clone(&transport),

            internal: Arc::new(RTPReceiverInternal {
                kind,

                tracks: RwLock::new(vec![]),
                transport,
                media_engine,
                interceptor,

                state_tx,

                transceiver_codecs: ArcSwapOption::new(None),
                rtcp_read_deadline: util::sync::Mutex::new(None),
            }),
        }
    }

    pub fn kind(&self) -> RtpCodecKind {
        self.kind
    }

    pub(crate) fn set_transceiver_codecs(
        &self,
        codecs: Option<Arc<Mutex<Vec<RTCRtpCodecParameters>>>>,
    ) {
        self.internal.transceiver_codecs.store(codecs);
    }

    /// transport returns the currently-configured DTLSTransport
    /// or nil if one has not yet been configured
    pub fn transport(&self) -> Arc<RTCDtlsTransport> {
        Arc::clone(&self.transport)
    }

    /// get_codecs filters `codecs` down to those the MediaEngine knows,
    /// filling in missing payload types. An empty list means every codec of
    /// `kind`.
    pub(crate) fn get_codecs(
        codecs: &mut [RTCRtpCodecParameters],
        kind: RtpCodecKind,
        media_engine: &Arc<MediaEngine>,
    ) -> Vec<RTCRtpCodecParameters> {
        let media_engine_codecs = media_engine.get_codecs_by_kind(kind);
        if codecs.is_empty() {
            return media_engine_codecs;
        }
        let mut filtered_codecs = vec![];
        for codec in codecs {
            let (c, match_type) = codec_parameters_fuzzy_search(&codec.rtp_codec, &media_engine_codecs);
            if match_type != CodecMatch::None {
                if codec.payload_type == 0 {
                    codec.payload_type = c.payload_type;
                }
                filtered_codecs.push(codec.clone());
            }
        }

        filtered_codecs
    }

    /// get_parameters describes the current configuration for the encoding and
    /// transmission of media on the receiver's track.
    pub async fn get_parameters(&self) -> RTCRtpParameters {
        let mut parameters = self
            .internal
            .media_engine
            .get_rtp_parameters_by_kind(self.kind, RTCRtpTransceiverDirection::Recvonly);

        let transceiver_codecs = self.internal.transceiver_codecs.load();
        if let Some(codecs) = &*transceiver_codecs {
            let mut c = codecs.lock().await;
            parameters.codecs =
                RTCRtpReceiver::get_codecs(&mut c, self.kind, &self.internal.media_engine);
        }

        parameters
    }

    /// track returns the RtpTransceiver TrackRemote
    pub async fn track(&self) -> Option<Arc<TrackRemote>> {
        let tracks = self.internal.tracks.read().await;
        if tracks.len() != 1 {
            None
        } else {
            tracks.first().map(|t| Arc::clone(&t.track))
        }
    }

    /// tracks returns the RtpTransceiver tracks
    /// A RTPReceiver to support Simulcast may now have multiple tracks
    pub async fn tracks(&self) -> Vec<Arc<TrackRemote>> {
        let tracks = self.internal.tracks.read().await;
        tracks.iter().map(|t| Arc::clone(&t.track)).collect()
    }

    /// track_by_rid returns the simulcast layer announced with `rid`.
    pub async fn track_by_rid(&self, rid: &str) -> Option<Arc<TrackRemote>> {
        let tracks = self.internal.tracks.read().await;
        tracks
            .iter()
            .find(|t| t.track.rid() == rid)
            .map(|t| Arc::clone(&t.track))
    }

    /// receive initialize the track and starts all the transports
    pub async fn receive(&self, parameters: &RTCRtpReceiveParameters) -> Result<()> {
        let receiver = Arc::downgrade(&self.internal);

        let current_state = *self.internal.state_tx.borrow();
        match current_state {
            State::Unstarted => self.internal.transition(State::Started)?,
            State::UnstartedPaused => self.internal.transition(State::Paused)?,
            _ => return Err(Error::ErrRTPReceiverReceiveAlreadyCalled),
        }

        let global_params = self.get_parameters().await;
        let codec = global_params
            .codecs
            .first()
            .map(|c| c.rtp_codec.clone())
            .unwrap_or_default();

        for encoding in &parameters.encodings {
            let stream = if encoding.ssrc != 0 {
                let stream_info = create_stream_info(
                    "".to_owned(),
                    encoding.ssrc,
                    0,
                    codec.clone(),
                    &global_params.header_extensions,
                    rtx_info(encoding.rtx.ssrc, &codec, &global_params.codecs),
                    None,
                );
                self.streams_for_ssrc(encoding.ssrc, stream_info).await?
            } else {
                TrackStream::default()
            };

            let t = TrackStreams {
                track: Arc::new(TrackRemote::new(
                    self.receive_mtu,
                    self.kind,
                    encoding.ssrc,
                    encoding.rid.clone(),
                    receiver.clone(),
                    Arc::clone(&self.internal.media_engine),
                )),
                stream,
                repair_stream: TrackStream::default(),
            };
            t.track.set_params(global_params.clone());
            if let Some(c) = global_params.codecs.first() {
                t.track.set_codec(c.clone());
            }

            {
                let mut tracks = self.internal.tracks.write().await;
                tracks.push(t);
            };

            let rtx_ssrc = encoding.rtx.ssrc;
            if rtx_ssrc != 0 {
                let stream_info = create_stream_info(
                    "".to_owned(),
                    rtx_ssrc,
                    0,
                    codec.clone(),
                    &global_params.header_extensions,
                    None,
                    None,
                );
                let repair_stream = self.streams_for_ssrc(rtx_ssrc, stream_info).await?;
                self.receive_for_rtx(rtx_ssrc, "", repair_stream).await?;
            }
        }

        Ok(())
    }

    /// read reads incoming RTCP for this RTPReceiver
    pub async fn read(&self, b: &mut [u8]) -> Result<(Vec<RTCPPacket>, Attributes)> {
        self.internal.read(b).await
    }

    /// read_simulcast reads incoming RTCP for this RTPReceiver for given rid
    pub async fn read_simulcast(
        &self,
        b: &mut [u8],
        rid: &str,
    ) -> Result<(Vec<RTCPPacket>, Attributes)> {
        self.internal.read_simulcast(b, rid).await
    }

    /// read_rtcp is a convenience method that wraps Read and unmarshal for you.
    /// It also runs any configured interceptors.
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
    /// receiver; `None` clears it.
    pub fn set_rtcp_read_deadline(&self, deadline: Option<Instant>) {
        let mut d = self.internal.rtcp_read_deadline.lock();
        *d = deadline;
    }

    /// collect_stats reports one inbound stream per bound track.
    pub(crate) async fn collect_stats(
        &self,
        now: SystemTime,
        mid: &str,
    ) -> Vec<RTCInboundRtpStreamStats> {
        let tracks = self.internal.tracks.read().await;
        tracks
            .iter()
            .filter_map(|t| {
                let stream = t.stream.rtp_read_stream.as_ref()?;
                let ssrc = stream.get_ssrc();
                let rid = t.track.rid();
                Some(RTCInboundRtpStreamStats {
                    rtp_stream_stats: RTCRtpStreamStats {
                        stats: RTCStats {
                            timestamp: now,
                            typ: RTCStatsType::InboundRTP,
                            id: format!("RTCInboundRTP{}Stream_{ssrc}", self.kind),
                        },
                        ssrc,
                        kind: self.kind.to_string(),
                        transport_id: TRANSPORT_STATS_ID.to_owned(),
                        mid: mid.to_owned(),
                        rid: (!rid.is_empty()).then(|| rid.to_owned()),
                    },
                    track_identifier: t.track.id(),
                    packets_received: stream.received.packets(),
                    bytes_received: stream.received.bytes(),
                })
            })
            .collect()
    }

    pub(crate) async fn have_received(&self) -> bool {
        matches!(
            *self.internal.state_tx.borrow(),
            State::Started | State::Paused | State::Stopped
        )
    }

    /// stop irreversibly stops the RTPReceiver
    pub async fn stop(&self) -> Result<()> {
        let previous_state = *self.internal.state_tx.borrow();
        let _ = self.internal.transition(State::Stopped);

        let mut errs = vec![];
        let was_ever_started = previous_state == State::Started || previous_state == State::Paused;
        if was_ever_started {
            let tracks = self.internal.tracks.write().await;
            for t in &*tracks {
                errs.extend(t.stream.close(&self.internal.interceptor).await);
                errs.extend(t.repair_stream.close(&self.internal.interceptor).await);
            }
        }

        flatten_errs(errs)
    }

    /// receive_for_rid is the sibling of Receive expect for RIDs instead of SSRCs
    /// It populates all the internal state for the given RID
    pub(crate) async fn receive_for_rid(
        &self,
        rid: &str,
        params: RTCRtpParameters,
        stream: TrackStream,
    ) -> Result<Arc<TrackRemote>> {
        let mut tracks = self.internal.tracks.write().await;
        for t in &mut *tracks {
            if t.track.rid() == rid {
                t.track.set_kind(self.kind);
                if let Some(codec) = params.codecs.first() {
                    t.track.set_codec(codec.clone());
                }
                t.track.set_params(params.clone());
                if let Some(stream_info) = &stream.stream_info {
                    t.track.set_ssrc(stream_info.ssrc);
                }
                t.stream = stream;
                return Ok(Arc::clone(&t.track));
            }
        }

        Err(Error::ErrRTPReceiverForRIDTrackStreamNotFound)
    }

    /// receive_for_rtx starts a routine that processes the repair stream
    /// These packets aren't exposed to the user yet, but we need to process them for
    /// TWCC
    pub(crate) async fn receive_for_rtx(
        &self,
        ssrc: SSRC,
        rsid: &str,
        repair_stream: TrackStream,
    ) -> Result<()> {
        let mut tracks = self.internal.tracks.write().await;
        let l = tracks.len();
        for t in &mut *tracks {
            if (ssrc != 0 && l == 1) || t.track.rid() == rsid {
                t.repair_stream = repair_stream;

                let receive_mtu = self.receive_mtu;
                let repair_rtp_interceptor = t.repair_stream.rtp_interceptor.clone();
                tokio::spawn(async move {
                    let a = Attributes::new();
                    let mut b = vec![0u8; receive_mtu];
                    if let Some(repair_rtp_interceptor) = repair_rtp_interceptor {
                        while repair_rtp_interceptor.read(&mut b, &a).await.is_ok() {}
                    }
                });

                return Ok(());
            }
        }

        Err(Error::ErrRTPReceiverForRIDTrackStreamNotFound)
    }

    /// set_rtp_parameters applies provided RTPParameters the RTPReceiver's tracks.
    pub(crate) async fn set_rtp_parameters(&self, params: RTCRtpParameters) {
        let tracks = self.internal.tracks.read().await;
        for t in &*tracks {
            t.track.set_params(params.clone());
            if let Some(codec) = params.codecs.first() {
                t.track.set_codec(codec.clone());
            }
        }
    }

    /// streams_for_ssrc opens the SRTP/SRTCP read streams of `ssrc` and binds
    /// them through the interceptor chain.
    pub(crate) async fn streams_for_ssrc(
        &self,
        ssrc: SSRC,
        stream_info: StreamInfo,
    ) -> Result<TrackStream> {
        let srtp_session = self
            .transport
            .get_srtp_session()
            .await
            .ok_or(Error::ErrDtlsTransportNotStarted)?;
        let rtp_read_stream = srtp_session.open(ssrc).await;
        let rtp_stream_reader = Arc::clone(&rtp_read_stream) as Arc<dyn RTPReader + Send + Sync>;
        let rtp_interceptor = self
            .internal
            .interceptor
            .bind_remote_stream(&stream_info, rtp_stream_reader)
            .await;

        let srtcp_session = self
            .transport
            .get_srtcp_session()
            .await
            .ok_or(Error::ErrDtlsTransportNotStarted)?;
        let rtcp_read_stream = srtcp_session.open(ssrc).await;
        let rtcp_stream_reader =
            Arc::clone(&rtcp_read_stream) as Arc<dyn RTCPReader + Send + Sync>;
        let rtcp_interceptor = self
            .internal
            .interceptor
            .bind_rtcp_reader(rtcp_stream_reader)
            .await;

        Ok(TrackStream {
            stream_info: Some(stream_info),
            rtp_read_stream: Some(rtp_read_stream),
            rtp_interceptor: Some(rtp_interceptor),
            rtcp_read_stream: Some(rtcp_read_stream),
            rtcp_interceptor: Some(rtcp_interceptor),
        })
    }

    pub(crate) async fn pause(&self) -> Result<()> {
        let current = *self.internal.state_tx.borrow();

        match current {
            State::Unstarted => self.internal.transition(State::UnstartedPaused),
            State::Started => self.internal.transition(State::Paused),
            // Already paused
            _ => Ok(()),
        }
    }

    pub(crate) async fn resume(&self) -> Result<()> {
        let current = *self.internal.state_tx.borrow();

        match current {
            State::UnstartedPaused => self.internal.transition(State::Unstarted),
            State::Paused => self.internal.transition(State::Started),
            // Already running
            _ => Ok(()),
        }
    }
}

/// rtx_info describes the repair stream paired with a primary SSRC, if the
/// negotiated codecs carry an RTX payload type for `codec`.
fn rtx_info(
    rtx_ssrc: SSRC,
    codec: &RTCRtpCodec,
    codecs: &[RTCRtpCodecParameters],
) -> Option<AssociatedStreamInfo> {
    if rtx_ssrc == 0 {
        return None;
    }
    let primary = codecs.iter().find(|c| c.rtp_codec == *codec)?;
    find_rtx_payload_type(primary.payload_type, codecs).map(|payload_type| AssociatedStreamInfo {
        ssrc: rtx_ssrc,
        payload_type,
    })
}
