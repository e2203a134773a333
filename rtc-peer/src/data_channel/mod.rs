//! WebRTC data channels carried on SCTP streams.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use tokio::sync::{mpsc, Mutex, Notify};

use crate::peer_connection::configuration::setting_engine::SettingEngine;
use crate::peer_connection::transport::sctp::association::{
    OnBufferedAmountLowFn, PayloadProtocolIdentifier, SctpStream,
};
use crate::peer_connection::transport::sctp::RTCSctpTransport;
use crate::statistics::accumulator::DataChannelStatsAccumulator;
use crate::statistics::stats::RTCDataChannelStats;
use dcep::{ChannelType, DataChannelOpen, Message, CHANNEL_PRIORITY_NORMAL};
use message::DataChannelMessage;
use parameters::DataChannelParameters;
use shared::error::{Error, Result};
use state::RTCDataChannelState;

pub(crate) mod dcep;
pub mod init;
pub mod message;
pub mod parameters;
pub mod state;

/// Identifier for a data channel within a particular peer connection
pub type RTCDataChannelId = u16;

pub type OnMessageHdlrFn = Box<
    dyn (FnMut(DataChannelMessage) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnOpenHdlrFn =
    Box<dyn (FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

pub type OnCloseHdlrFn =
    Box<dyn (FnMut() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

pub type OnErrorHdlrFn =
    Box<dyn (FnMut(Error) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

/// What the read loop hands to the channel's dispatch task, in wire order.
enum Inbound {
    Message(DataChannelMessage),
    Error(Error),
    Closed,
}

/// DataChannel represents a WebRTC DataChannel
/// The DataChannel interface represents a network channel
/// which can be used for bidirectional peer-to-peer transfers of arbitrary data
///
/// ## Specifications
///
/// * [MDN]
/// * [W3C]
///
/// [MDN]: https://developer.mozilla.org/en-US/docs/Web/API/RTCDataChannel
/// [W3C]: https://w3c.github.io/webrtc-pc/#dom-rtcdatachannel
pub struct RTCDataChannel {
    pub(crate) stats_id: String,
    pub(crate) label: String,
    pub(crate) ordered: bool,
    pub(crate) max_packet_lifetime: Option<u16>,
    pub(crate) max_retransmits: Option<u16>,
    pub(crate) protocol: String,
    pub(crate) negotiated: bool,
    pub(crate) id: AtomicU16,
    pub(crate) ready_state: AtomicU8, // DataChannelState
    pub(crate) buffered_amount_low_threshold: AtomicUsize,
    pub(crate) detach_called: AtomicBool,

    pub(crate) on_message_handler: ArcSwapOption<Mutex<OnMessageHdlrFn>>,
    pub(crate) on_open_handler: std::sync::Mutex<Option<OnOpenHdlrFn>>,
    pub(crate) on_close_handler: ArcSwapOption<Mutex<OnCloseHdlrFn>>,
    pub(crate) on_error_handler: ArcSwapOption<Mutex<OnErrorHdlrFn>>,
    pub(crate) on_buffered_amount_low: Mutex<Option<OnBufferedAmountLowFn>>,

    pub(crate) sctp_transport: Mutex<Option<Weak<RTCSctpTransport>>>,
    pub(crate) stream: Mutex<Option<Arc<dyn SctpStream + Send + Sync>>>,

    pub(crate) setting_engine: Arc<SettingEngine>,
    pub(crate) stats: DataChannelStatsAccumulator,
    notify: Notify,
}

impl RTCDataChannel {
    /// create the DataChannel object before the networking is set up.
    pub(crate) fn new(params: DataChannelParameters, setting_engine: Arc<SettingEngine>) -> Self {
        // the id is either negotiated or assigned once SCTP is up
        let id = params.negotiated.unwrap_or(0);
        RTCDataChannel {
            stats_id: format!(
                "DataChannel-{}",
                SystemTime::now()
                    .duration_since(SystemTime::UNIX_EPOCH)
                    .map(|d| d.as_nanos())
                    .unwrap_or_default()
            ),
            label: params.label,
            protocol: params.protocol,
            negotiated: params.negotiated.is_some(),
            id: AtomicU16::new(id),
            ordered: params.ordered,
            max_packet_lifetime: params.max_packet_life_time,
            max_retransmits: params.max_retransmits,
            ready_state: AtomicU8::new(RTCDataChannelState::Connecting as u8),
            buffered_amount_low_threshold: AtomicUsize::new(0),
            detach_called: AtomicBool::new(false),
            on_message_handler: ArcSwapOption::empty(),
            on_open_handler: std::sync::Mutex::new(None),
            on_close_handler: ArcSwapOption::empty(),
            on_error_handler: ArcSwapOption::empty(),
            on_buffered_amount_low: Mutex::new(None),
            sctp_transport: Mutex::new(None),
            stream: Mutex::new(None),
            setting_engine,
            stats: DataChannelStatsAccumulator::default(),
            notify: Notify::new(),
        }
    }

    /// open opens the datachannel over the sctp transport
    pub(crate) async fn open(self: &Arc<Self>, sctp_transport: &Arc<RTCSctpTransport>) -> Result<()> {
        let association = sctp_transport
            .association()
            .await
            .ok_or(Error::ErrSCTPNotEstablished)?;

        {
            let mut st = self.sctp_transport.lock().await;
            if st.is_some() {
                return Ok(());
            }
            *st = Some(Arc::downgrade(sctp_transport));
        }

        if !self.negotiated {
            let role = sctp_transport.dtls_transport().role().await;
            let id = sctp_transport.generate_and_set_data_channel_id(role).await?;
            self.id.store(id, Ordering::SeqCst);
        }

        let (channel_type, reliability_parameter) = ChannelType::from_parameters(
            self.ordered,
            self.max_retransmits,
            self.max_packet_lifetime,
        );

        let stream = association
            .open_stream(self.id(), PayloadProtocolIdentifier::Binary)
            .await?;
        let (unordered, reliability_type) = channel_type.reliability_params();
        stream.set_reliability_params(unordered, reliability_type, reliability_parameter);

        if !self.negotiated {
            let open = Message::DataChannelOpen(DataChannelOpen {
                channel_type,
                priority: CHANNEL_PRIORITY_NORMAL,
                reliability_parameter,
                label: self.label.clone(),
                protocol: self.protocol.clone(),
            })
            .marshal()?;
            stream
                .write_sctp(&open, PayloadProtocolIdentifier::Dcep)
                .await?;
        }

        self.handle_open(stream, false).await;

        Ok(())
    }

    /// handle_open binds the SCTP stream. Accepted and negotiated channels
    /// open right away; locally announced ones open on DATA_CHANNEL_ACK.
    pub(crate) async fn handle_open(
        self: &Arc<Self>,
        stream: Arc<dyn SctpStream + Send + Sync>,
        remote_initiated: bool,
    ) {
        stream.set_buffered_amount_low_threshold(
            self.buffered_amount_low_threshold.load(Ordering::SeqCst),
        );
        if let Some(f) = self.on_buffered_amount_low.lock().await.take() {
            stream.on_buffered_amount_low(f);
        }
        {
            let mut s = self.stream.lock().await;
            *s = Some(Arc::clone(&stream));
        }

        let open_now = remote_initiated || self.negotiated;
        if open_now {
            self.set_ready_state(RTCDataChannelState::Open);
            self.do_open();
        }

        let dc = Arc::clone(self);
        if self.setting_engine.detach.data_channels {
            if !open_now {
                tokio::spawn(async move {
                    dc.wait_ack(stream).await;
                });
            }
        } else {
            // handlers run on their own task so a slow on_message never stalls the stream
            let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
            let dispatcher = Arc::clone(self);
            tokio::spawn(async move {
                while let Some(inbound) = inbound_rx.recv().await {
                    dispatcher.dispatch(inbound).await;
                }
            });
            tokio::spawn(async move {
                dc.read_loop(stream, inbound_tx).await;
            });
        }
    }

    async fn dispatch(&self, inbound: Inbound) {
        match inbound {
            Inbound::Message(msg) => {
                if let Some(handler) = &*self.on_message_handler.load() {
                    let mut f = handler.lock().await;
                    f(msg).await;
                }
            }
            Inbound::Error(err) => self.fire_error(err).await,
            Inbound::Closed => self.closed().await,
        }
    }

    /// on_open sets an event handler which is invoked when
    /// the underlying data transport has been established (or re-established).
    pub fn on_open(&self, f: OnOpenHdlrFn) {
        if let Ok(mut handler) = self.on_open_handler.lock() {
            *handler = Some(f);
        }

        if self.ready_state() == RTCDataChannelState::Open {
            self.do_open();
        }
    }

    fn do_open(&self) {
        let handler = self
            .on_open_handler
            .lock()
            .ok()
            .and_then(|mut handler| handler.take());
        if let Some(f) = handler {
            tokio::spawn(async move {
                f().await;
            });
        }
    }

    /// on_close sets an event handler which is invoked when
    /// the underlying data transport has been closed.
    pub fn on_close(&self, f: OnCloseHdlrFn) {
        self.on_close_handler.store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_message sets an event handler which is invoked on a binary
    /// message arrival over the sctp transport from a remote peer.
    /// OnMessage can currently receive messages up to 16384 bytes
    /// in size. Check out the detach API if you want to use larger
    /// message sizes. Note that browser support for larger messages
    /// is also limited.
    pub fn on_message(&self, f: OnMessageHdlrFn) {
        self.on_message_handler.store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_error sets an event handler which is invoked when
    /// the underlying data transport cannot be read.
    pub fn on_error(&self, f: OnErrorHdlrFn) {
        self.on_error_handler.store(Some(Arc::new(Mutex::new(f))));
    }

    pub(crate) async fn fire_error(&self, err: Error) {
        if let Some(handler) = &*self.on_error_handler.load() {
            let mut f = handler.lock().await;
            f(err).await;
        }
    }

    /// closed moves the channel to closed and fires on_close once.
    pub(crate) async fn closed(&self) {
        let previous = self
            .ready_state
            .swap(RTCDataChannelState::Closed as u8, Ordering::SeqCst);
        if previous == RTCDataChannelState::Closed as u8 {
            return;
        }
        log::debug!("data channel {} ({}) closed", self.label, self.id());

        if let Some(handler) = &*self.on_close_handler.load() {
            let mut f = handler.lock().await;
            f().await;
        }
    }

    async fn handle_dcep(&self, stream: &Arc<dyn SctpStream + Send + Sync>, raw: &[u8]) {
        match Message::unmarshal(raw) {
            Ok(Message::DataChannelAck) => {
                log::debug!("received DATA_CHANNEL_ACK on {}", self.label);
                if self.ready_state() == RTCDataChannelState::Connecting {
                    self.set_ready_state(RTCDataChannelState::Open);
                    self.do_open();
                }
            }
            Ok(Message::DataChannelOpen(_)) => {
                log::debug!("received DATA_CHANNEL_OPEN on open stream {}", self.id());
                if let Ok(ack) = Message::DataChannelAck.marshal() {
                    if let Err(err) = stream.write_sctp(&ack, PayloadProtocolIdentifier::Dcep).await {
                        log::warn!("failed to send DATA_CHANNEL_ACK: {err}");
                    }
                }
            }
            Err(err) => log::warn!("failed to parse DCEP message: {err}"),
        }
    }

    async fn wait_ack(&self, stream: Arc<dyn SctpStream + Send + Sync>) {
        let mut buf = vec![0u8; self.read_buffer_size()];
        match stream.read_sctp(&mut buf).await {
            Ok((n, PayloadProtocolIdentifier::Dcep)) => self.handle_dcep(&stream, &buf[..n]).await,
            Ok((_, ppi)) => log::warn!("expected DATA_CHANNEL_ACK, got {ppi}"),
            Err(err) => {
                self.fire_error(err).await;
                self.closed().await;
            }
        }
    }

    async fn read_loop(
        &self,
        stream: Arc<dyn SctpStream + Send + Sync>,
        inbound: mpsc::UnboundedSender<Inbound>,
    ) {
        let mut buf = vec![0u8; self.read_buffer_size()];
        loop {
            if matches!(
                self.ready_state(),
                RTCDataChannelState::Closing | RTCDataChannelState::Closed
            ) {
                break;
            }

            let (n, ppi) = tokio::select! {
                _ = self.notify.notified() => break,
                result = stream.read_sctp(&mut buf) => match result {
                    Ok(v) => v,
                    Err(err) => {
                        if err != Error::ErrEof {
                            log::warn!("data channel {} read failed: {err}", self.label);
                            let _ = inbound.send(Inbound::Error(err));
                        }
                        let _ = inbound.send(Inbound::Closed);
                        break;
                    }
                },
            };

            let msg = match ppi {
                PayloadProtocolIdentifier::Dcep => {
                    self.handle_dcep(&stream, &buf[..n]).await;
                    continue;
                }
                PayloadProtocolIdentifier::String => DataChannelMessage {
                    is_string: true,
                    data: Bytes::from(buf[..n].to_vec()),
                },
                PayloadProtocolIdentifier::StringEmpty => DataChannelMessage {
                    is_string: true,
                    data: Bytes::new(),
                },
                PayloadProtocolIdentifier::Binary => DataChannelMessage {
                    is_string: false,
                    data: Bytes::from(buf[..n].to_vec()),
                },
                PayloadProtocolIdentifier::BinaryEmpty => DataChannelMessage {
                    is_string: false,
                    data: Bytes::new(),
                },
                PayloadProtocolIdentifier::Unknown => {
                    log::warn!("dropping message with unknown payload protocol identifier");
                    continue;
                }
            };

            self.stats.on_message_received(msg.data.len());
            if inbound.send(Inbound::Message(msg)).is_err() {
                break;
            }
        }
    }

    fn read_buffer_size(&self) -> usize {
        self.setting_engine.sctp_max_message_size.as_u32() as usize
    }

    /// send sends the binary message to the DataChannel peer
    pub async fn send(&self, data: &Bytes) -> Result<usize> {
        self.write(data, false).await
    }

    /// send_text sends the text message to the DataChannel peer
    pub async fn send_text(&self, s: impl Into<String>) -> Result<usize> {
        self.write(&Bytes::from(s.into()), true).await
    }

    async fn write(&self, data: &Bytes, is_string: bool) -> Result<usize> {
        if self.ready_state() != RTCDataChannelState::Open {
            return Err(Error::ErrClosedPipe);
        }

        let stream = {
            let stream = self.stream.lock().await;
            stream.clone().ok_or(Error::ErrClosedPipe)?
        };

        if let Some(sctp_transport) = self.sctp_transport().await {
            let max = sctp_transport.max_message_size() as usize;
            if max != 0 && data.len() > max {
                return Err(Error::ErrOutboundPacketTooLarge);
            }
        }

        let ppi = match (is_string, data.is_empty()) {
            (false, false) => PayloadProtocolIdentifier::Binary,
            (false, true) => PayloadProtocolIdentifier::BinaryEmpty,
            (true, false) => PayloadProtocolIdentifier::String,
            (true, true) => PayloadProtocolIdentifier::StringEmpty,
        };

        let n = if data.is_empty() {
            // empty messages carry a single zero byte on the wire
            stream.write_sctp(&Bytes::from_static(&[0]), ppi).await?;
            0
        } else {
            stream.write_sctp(data, ppi).await?
        };
        self.stats.on_message_sent(n);
        Ok(n)
    }

    /// detach hands out the underlying SCTP stream for direct reads and
    /// writes. on_message is never fired for a detached channel. Requires
    /// [`SettingEngine::detach_data_channels`]; mixing detached and
    /// callback driven channels on one connection is not supported.
    pub async fn detach(&self) -> Result<Arc<dyn SctpStream + Send + Sync>> {
        if !self.setting_engine.detach.data_channels {
            return Err(Error::ErrDetachNotEnabled);
        }

        let stream = self.stream.lock().await;
        if let Some(stream) = &*stream {
            self.detach_called.store(true, Ordering::SeqCst);
            Ok(Arc::clone(stream))
        } else {
            Err(Error::ErrDetachBeforeOpened)
        }
    }

    /// close Closes the DataChannel. It may be called regardless of whether
    /// the DataChannel object was created by this peer or the remote peer.
    pub async fn close(&self) -> Result<()> {
        if self.ready_state() == RTCDataChannelState::Closed {
            return Ok(());
        }

        self.set_ready_state(RTCDataChannelState::Closing);
        self.notify.notify_waiters();

        let stream = self.stream.lock().await.clone();
        let result = if let Some(stream) = stream {
            stream.shutdown().await
        } else {
            Ok(())
        };

        self.closed().await;
        result
    }

    /// label represents a label that can be used to distinguish this
    /// DataChannel object from other DataChannel objects. Scripts are
    /// allowed to create multiple DataChannel objects with the same label.
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Ordered returns true if the DataChannel is ordered, and false if
    /// out-of-order delivery is allowed.
    pub fn ordered(&self) -> bool {
        self.ordered
    }

    /// max_packet_lifetime represents the length of the time window (msec) during
    /// which transmissions and retransmissions may occur in unreliable mode.
    pub fn max_packet_lifetime(&self) -> Option<u16> {
        self.max_packet_lifetime
    }

    /// max_retransmits represents the maximum number of retransmissions that are
    /// attempted in unreliable mode.
    pub fn max_retransmits(&self) -> Option<u16> {
        self.max_retransmits
    }

    /// protocol represents the name of the sub-protocol used with this
    /// DataChannel.
    pub fn protocol(&self) -> &str {
        self.protocol.as_str()
    }

    /// negotiated represents whether this DataChannel was negotiated by the
    /// application (true), or not (false).
    pub fn negotiated(&self) -> bool {
        self.negotiated
    }

    /// ID represents the ID for this DataChannel. The value is initially
    /// null, which is what will be returned if the ID was not provided at
    /// channel creation time, and the DTLS role of the SCTP transport has not
    /// yet been negotiated. Otherwise, it will return the ID that was either
    /// selected by the script or generated. After the ID is set to a non-null
    /// value, it will not change.
    pub fn id(&self) -> u16 {
        self.id.load(Ordering::SeqCst)
    }

    pub fn stats_id(&self) -> &str {
        self.stats_id.as_str()
    }

    /// ready_state represents the state of the DataChannel object.
    pub fn ready_state(&self) -> RTCDataChannelState {
        self.ready_state.load(Ordering::SeqCst).into()
    }

    pub(crate) fn set_ready_state(&self, r: RTCDataChannelState) {
        self.ready_state.store(r as u8, Ordering::SeqCst);
        self.stats.on_state_changed(r);
    }

    pub(crate) fn collect_stats(&self, now: SystemTime) -> RTCDataChannelStats {
        self.stats.snapshot(
            now,
            self.stats_id.clone(),
            &self.label,
            &self.protocol,
            self.id(),
            self.ready_state(),
        )
    }

    /// buffered_amount represents the number of bytes of application data
    /// (UTF-8 text and binary data) that have been queued using send(). The
    /// value does not include framing overhead incurred by the protocol, or
    /// buffering done by the operating system or network hardware.
    pub async fn buffered_amount(&self) -> usize {
        let stream = self.stream.lock().await;
        if let Some(stream) = &*stream {
            stream.buffered_amount()
        } else {
            0
        }
    }

    /// buffered_amount_low_threshold represents the threshold at which the
    /// bufferedAmount is considered to be low. When the bufferedAmount decreases
    /// from above this threshold to equal or below it, the bufferedamountlow
    /// event fires. buffered_amount_low_threshold is initially zero on each new
    /// DataChannel, but the application may change its value at any time.
    pub async fn buffered_amount_low_threshold(&self) -> usize {
        let stream = self.stream.lock().await;
        if let Some(stream) = &*stream {
            stream.buffered_amount_low_threshold()
        } else {
            self.buffered_amount_low_threshold.load(Ordering::SeqCst)
        }
    }

    /// set_buffered_amount_low_threshold is used to update the threshold.
    /// See buffered_amount_low_threshold().
    pub async fn set_buffered_amount_low_threshold(&self, th: usize) {
        self.buffered_amount_low_threshold
            .store(th, Ordering::SeqCst);
        let stream = self.stream.lock().await;
        if let Some(stream) = &*stream {
            stream.set_buffered_amount_low_threshold(th);
        }
    }

    /// on_buffered_amount_low sets an event handler which is invoked when
    /// the number of bytes of outgoing data becomes lower than the
    /// buffered_amount_low_threshold.
    pub async fn on_buffered_amount_low(&self, f: OnBufferedAmountLowFn) {
        let stream = self.stream.lock().await;
        if let Some(stream) = &*stream {
            stream.on_buffered_amount_low(f);
        } else {
            let mut on_buffered_amount_low = self.on_buffered_amount_low.lock().await;
            *on_buffered_amount_low = Some(f);
        }
    }

    async fn sctp_transport(&self) -> Option<Arc<RTCSctpTransport>> {
        let sctp_transport = self.sctp_transport.lock().await;
        sctp_transport.as_ref().and_then(|t| t.upgrade())
    }
}
