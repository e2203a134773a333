//! In-memory collaborators used by the end-to-end tests.
//!
//! Two PeerConnections built from the same [`LoopbackNetwork`] find each other
//! by ICE ufrag and talk over a `conn_pipe`. On top of it runs a toy DTLS
//! handshake that only swaps certificates, an XOR "cipher" for SRTP and a
//! framed SCTP stand-in, so the PeerConnection's own plumbing (mux, key
//! split, demux, data channels) is exercised without real crypto.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use sha2::{Digest, Sha256};
use tokio::sync::{mpsc, oneshot, Mutex};
use util::conn::conn_pipe::pipe;
use util::marshal::{MarshalSize, Unmarshal};
use util::Conn;

use rtc_peer::api::{APIBuilder, API};
use rtc_peer::peer_connection::configuration::media_engine::MediaEngine;
use rtc_peer::peer_connection::configuration::setting_engine::SettingEngine;
use rtc_peer::peer_connection::configuration::RTCConfigurationBuilder;
use rtc_peer::peer_connection::state::RTCPeerConnectionState;
use rtc_peer::peer_connection::transport::dtls::handshaker::{
    DtlsConn, DtlsHandshakeConfig, DtlsHandshakeRole, DtlsHandshaker,
};
use rtc_peer::peer_connection::transport::ice::agent::{
    IceAgent, IceAgentConfig, IceAgentFactory, OnAgentCandidateHdlrFn,
    OnAgentConnectionStateChangeHdlrFn, OnAgentSelectedCandidatePairChangeHdlrFn,
};
use rtc_peer::peer_connection::transport::sctp::association::{
    OnBufferedAmountLowFn, PayloadProtocolIdentifier, ReliabilityType, SctpAssociation,
    SctpConfig, SctpFactory, SctpStream,
};
use rtc_peer::peer_connection::transport::srtp::{
    SrtpContext, SrtpContextFactory, SrtpProtectionProfile,
};
use rtc_peer::peer_connection::transport::{
    RTCIceCandidate, RTCIceCandidatePair, RTCIceCandidateType, RTCIceProtocol,
    RTCIceTransportState,
};
use rtc_peer::peer_connection::RTCPeerConnection;
use shared::error::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const DIAL_RETRY_INTERVAL: Duration = Duration::from_millis(10);
const HELLO_RETRY_INTERVAL: Duration = Duration::from_millis(20);
const MAX_HELLO_ATTEMPTS: usize = 250;

const CONTENT_TYPE_HANDSHAKE: u8 = 22;
const CONTENT_TYPE_APPLICATION_DATA: u8 = 23;

const RTCP_HEADER_LENGTH: usize = 8;
const FRAME_HEADER_LENGTH: usize = 7;
const FRAME_FLAG_RESET: u8 = 1;
const MAX_FRAME_SIZE: usize = 256 * 1024;

pub fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

type IncomingConn = Arc<dyn Conn + Send + Sync>;

/// LoopbackNetwork routes dials to the agent that owns the remote ufrag.
pub struct LoopbackNetwork {
    agents: util::sync::Mutex<HashMap<String, mpsc::UnboundedSender<IncomingConn>>>,
    next_port: AtomicU16,
}

impl LoopbackNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(LoopbackNetwork {
            agents: util::sync::Mutex::new(HashMap::new()),
            next_port: AtomicU16::new(50000),
        })
    }

    fn register(&self, ufrag: &str, tx: mpsc::UnboundedSender<IncomingConn>) {
        self.agents.lock().insert(ufrag.to_owned(), tx);
    }

    fn unregister(&self, ufrag: &str) {
        self.agents.lock().remove(ufrag);
    }

    fn lookup(&self, ufrag: &str) -> Option<mpsc::UnboundedSender<IncomingConn>> {
        self.agents.lock().get(ufrag).cloned()
    }
}

/// LoopbackIceFactory creates agents attached to one [`LoopbackNetwork`].
pub struct LoopbackIceFactory(pub Arc<LoopbackNetwork>);

impl IceAgentFactory for LoopbackIceFactory {
    fn new_agent(
        &self,
        config: IceAgentConfig,
    ) -> shared::error::Result<Arc<dyn IceAgent + Send + Sync>> {
        let network = &self.0;
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        network.register(&config.local_ufrag, incoming_tx.clone());

        let port = network.next_port.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(LoopbackAgent {
            network: Arc::clone(network),
            credentials: util::sync::Mutex::new((config.local_ufrag, config.local_pwd)),
            incoming_tx,
            incoming_rx: Mutex::new(incoming_rx),
            host: RTCIceCandidate {
                foundation: "1".to_owned(),
                priority: 2130706431,
                address: "192.0.2.1".to_owned(),
                protocol: RTCIceProtocol::Udp,
                port,
                typ: RTCIceCandidateType::Host,
                component: 1,
                ..Default::default()
            },
            gathered: AtomicBool::new(false),
            restarts: AtomicUsize::new(0),
            remote_candidates: util::sync::Mutex::new(vec![]),
            on_candidate: util::sync::Mutex::new(None),
            on_connection_state_change: util::sync::Mutex::new(None),
        }))
    }
}

struct LoopbackAgent {
    network: Arc<LoopbackNetwork>,
    credentials: util::sync::Mutex<(String, String)>,
    incoming_tx: mpsc::UnboundedSender<IncomingConn>,
    incoming_rx: Mutex<mpsc::UnboundedReceiver<IncomingConn>>,
    host: RTCIceCandidate,
    gathered: AtomicBool,
    restarts: AtomicUsize,
    remote_candidates: util::sync::Mutex<Vec<RTCIceCandidate>>,
    on_candidate: util::sync::Mutex<Option<OnAgentCandidateHdlrFn>>,
    on_connection_state_change: util::sync::Mutex<Option<OnAgentConnectionStateChangeHdlrFn>>,
}

impl LoopbackAgent {
    async fn set_state(&self, state: RTCIceTransportState) {
        let fut = self
            .on_connection_state_change
            .lock()
            .as_mut()
            .map(|f| f(state));
        if let Some(fut) = fut {
            fut.await;
        }
    }
}

#[async_trait]
impl IceAgent for LoopbackAgent {
    fn on_candidate(&self, f: OnAgentCandidateHdlrFn) {
        *self.on_candidate.lock() = Some(f);
    }

    fn on_connection_state_change(&self, f: OnAgentConnectionStateChangeHdlrFn) {
        *self.on_connection_state_change.lock() = Some(f);
    }

    fn on_selected_candidate_pair_change(&self, _f: OnAgentSelectedCandidatePairChangeHdlrFn) {}

    async fn gather_candidates(&self) -> shared::error::Result<()> {
        self.gathered.store(true, Ordering::SeqCst);

        // delivered asynchronously like a real agent would
        let futures = {
            let mut handler = self.on_candidate.lock();
            handler
                .as_mut()
                .map(|f| (f(Some(self.host.clone())), f(None)))
        };
        if let Some((candidate, done)) = futures {
            tokio::spawn(async move {
                candidate.await;
                done.await;
            });
        }
        Ok(())
    }

    async fn local_candidates(&self) -> shared::error::Result<Vec<RTCIceCandidate>> {
        if self.gathered.load(Ordering::SeqCst) {
            Ok(vec![self.host.clone()])
        } else {
            Ok(vec![])
        }
    }

    async fn local_credentials(&self) -> (String, String) {
        self.credentials.lock().clone()
    }

    async fn set_remote_credentials(
        &self,
        _remote_ufrag: String,
        _remote_pwd: String,
    ) -> shared::error::Result<()> {
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: &RTCIceCandidate) -> shared::error::Result<()> {
        self.remote_candidates.lock().push(candidate.clone());
        Ok(())
    }

    async fn dial(
        &self,
        remote_ufrag: String,
        _remote_pwd: String,
    ) -> shared::error::Result<Arc<dyn Conn + Send + Sync>> {
        self.set_state(RTCIceTransportState::Checking).await;

        let deadline = tokio::time::Instant::now() + DEFAULT_TIMEOUT;
        let remote = loop {
            if let Some(remote) = self.network.lookup(&remote_ufrag) {
                break remote;
            }
            if tokio::time::Instant::now() > deadline {
                return Err(Error::ErrICEConnectionFailed(format!(
                    "no agent with ufrag {remote_ufrag}"
                )));
            }
            tokio::time::sleep(DIAL_RETRY_INTERVAL).await;
        };

        let (local_end, remote_end) = pipe();
        remote
            .send(Arc::new(remote_end))
            .map_err(|_| Error::ErrICEConnectionFailed("remote agent closed".to_owned()))?;

        self.set_state(RTCIceTransportState::Connected).await;
        Ok(Arc::new(local_end))
    }

    async fn accept(
        &self,
        _remote_ufrag: String,
        _remote_pwd: String,
    ) -> shared::error::Result<Arc<dyn Conn + Send + Sync>> {
        self.set_state(RTCIceTransportState::Checking).await;

        let conn = {
            let mut incoming_rx = self.incoming_rx.lock().await;
            incoming_rx
                .recv()
                .await
                .ok_or_else(|| Error::ErrICEConnectionFailed("agent closed".to_owned()))?
        };

        self.set_state(RTCIceTransportState::Connected).await;
        Ok(conn)
    }

    async fn selected_candidate_pair(&self) -> Option<RTCIceCandidatePair> {
        None
    }

    async fn restart(&self, ufrag: String, pwd: String) -> shared::error::Result<()> {
        let n = self.restarts.fetch_add(1, Ordering::SeqCst) + 1;
        let (ufrag, pwd) = {
            let mut credentials = self.credentials.lock();
            let ufrag = if ufrag.is_empty() {
                format!("{}r{n}", credentials.0)
            } else {
                ufrag
            };
            let pwd = if pwd.is_empty() {
                format!("{}r{n}", credentials.1)
            } else {
                pwd
            };
            *credentials = (ufrag.clone(), pwd.clone());
            (ufrag, pwd)
        };
        log::debug!("loopback agent restarted with ufrag {ufrag} ({} bytes pwd)", pwd.len());

        self.gathered.store(false, Ordering::SeqCst);
        self.network.register(&ufrag, self.incoming_tx.clone());
        Ok(())
    }

    async fn close(&self) -> shared::error::Result<()> {
        let (ufrag, _) = self.credentials.lock().clone();
        self.network.unregister(&ufrag);
        Ok(())
    }
}

/// ToyDtlsHandshaker swaps certificates in handshake-range records and
/// frames application data as DTLS application_data records.
pub struct ToyDtlsHandshaker;

#[async_trait]
impl DtlsHandshaker for ToyDtlsHandshaker {
    async fn handshake(
        &self,
        conn: Arc<dyn Conn + Send + Sync>,
        config: DtlsHandshakeConfig,
    ) -> shared::error::Result<Arc<dyn DtlsConn + Send + Sync>> {
        let local_certificate = config
            .certificate
            .certificate
            .first()
            .cloned()
            .ok_or_else(|| Error::ErrDtlsHandshakeFailed("no local certificate".to_owned()))?;

        let mut hello = vec![CONTENT_TYPE_HANDSHAKE];
        hello.extend_from_slice(&local_certificate);

        let mut buf = vec![0u8; MAX_FRAME_SIZE];
        let mut remote_certificate = None;
        let mut early_records = VecDeque::new();
        for _ in 0..MAX_HELLO_ATTEMPTS {
            conn.send(&hello).await?;
            match tokio::time::timeout(HELLO_RETRY_INTERVAL, conn.recv(&mut buf)).await {
                Ok(Ok(n)) if n > 1 && buf[0] == CONTENT_TYPE_HANDSHAKE => {
                    remote_certificate = Some(buf[1..n].to_vec());
                    break;
                }
                // the remote finished first and already sends data
                Ok(Ok(n)) if n > 0 && buf[0] == CONTENT_TYPE_APPLICATION_DATA => {
                    early_records.push_back(buf[1..n].to_vec());
                }
                Ok(Ok(_)) | Err(_) => {}
                Ok(Err(err)) => return Err(err.into()),
            }
        }
        let remote_certificate = remote_certificate
            .ok_or_else(|| Error::ErrDtlsHandshakeFailed("no hello from remote".to_owned()))?;

        // the remote may have missed every earlier copy
        conn.send(&hello).await?;

        let (client_certificate, server_certificate) = match config.role {
            DtlsHandshakeRole::Client => (&local_certificate, &remote_certificate),
            DtlsHandshakeRole::Server => (&remote_certificate, &local_certificate),
        };
        let mut hasher = Sha256::new();
        hasher.update(client_certificate);
        hasher.update(server_certificate);
        let secret = hasher.finalize().to_vec();

        Ok(Arc::new(ToyDtlsConn {
            conn,
            remote_certificate,
            profile: config.srtp_protection_profiles.first().copied(),
            secret,
            early_records: util::sync::Mutex::new(early_records),
        }))
    }
}

struct ToyDtlsConn {
    conn: Arc<dyn Conn + Send + Sync>,
    remote_certificate: Vec<u8>,
    profile: Option<SrtpProtectionProfile>,
    secret: Vec<u8>,
    early_records: util::sync::Mutex<VecDeque<Vec<u8>>>,
}

#[async_trait]
impl Conn for ToyDtlsConn {
    async fn connect(&self, addr: SocketAddr) -> util::Result<()> {
        self.conn.connect(addr).await
    }

    async fn recv(&self, buf: &mut [u8]) -> util::Result<usize> {
        if let Some(payload) = self.early_records.lock().pop_front() {
            let n = payload.len().min(buf.len());
            buf[..n].copy_from_slice(&payload[..n]);
            return Ok(n);
        }

        let mut record = vec![0u8; buf.len() + 1];
        loop {
            let n = self.conn.recv(&mut record).await?;
            // late handshake retransmissions
            if n == 0 || record[0] != CONTENT_TYPE_APPLICATION_DATA {
                continue;
            }
            let payload = &record[1..n];
            buf[..payload.len()].copy_from_slice(payload);
            return Ok(payload.len());
        }
    }

    async fn recv_from(&self, buf: &mut [u8]) -> util::Result<(usize, SocketAddr)> {
        let n = self.recv(buf).await?;
        Ok((n, SocketAddr::from(([0, 0, 0, 0], 0))))
    }

    async fn send(&self, buf: &[u8]) -> util::Result<usize> {
        let mut record = Vec::with_capacity(buf.len() + 1);
        record.push(CONTENT_TYPE_APPLICATION_DATA);
        record.extend_from_slice(buf);
        self.conn.send(&record).await?;
        Ok(buf.len())
    }

    async fn send_to(&self, buf: &[u8], _target: SocketAddr) -> util::Result<usize> {
        self.send(buf).await
    }

    fn local_addr(&self) -> util::Result<SocketAddr> {
        self.conn.local_addr()
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.conn.remote_addr()
    }

    async fn close(&self) -> util::Result<()> {
        self.conn.close().await
    }
}

#[async_trait]
impl DtlsConn for ToyDtlsConn {
    fn remote_certificates(&self) -> Vec<Vec<u8>> {
        vec![self.remote_certificate.clone()]
    }

    fn selected_srtp_protection_profile(&self) -> Option<SrtpProtectionProfile> {
        self.profile
    }

    async fn srtp_keying_material(&self, len: usize) -> shared::error::Result<Vec<u8>> {
        Ok(self.secret.iter().copied().cycle().take(len).collect())
    }

    fn into_conn(self: Arc<Self>) -> Arc<dyn Conn + Send + Sync> {
        self
    }
}

/// XorSrtpFactory "encrypts" payloads by XOR with key and salt, leaving
/// RTP and RTCP headers readable.
pub struct XorSrtpFactory;

impl SrtpContextFactory for XorSrtpFactory {
    fn new_context(
        &self,
        _profile: SrtpProtectionProfile,
        master_key: &[u8],
        master_salt: &[u8],
    ) -> shared::error::Result<Box<dyn SrtpContext + Send + Sync>> {
        let key: Vec<u8> = master_key.iter().chain(master_salt).copied().collect();
        if key.is_empty() {
            return Err(Error::OtherSrtpErr("empty master key".to_owned()));
        }
        Ok(Box::new(XorContext { key }))
    }
}

struct XorContext {
    key: Vec<u8>,
}

impl XorContext {
    fn apply(&self, packet: &[u8], offset: usize) -> Bytes {
        let mut out = packet.to_vec();
        for (i, b) in out.iter_mut().skip(offset).enumerate() {
            *b ^= self.key[i % self.key.len()];
        }
        Bytes::from(out)
    }

    fn rtp_header_len(packet: &[u8]) -> shared::error::Result<usize> {
        let mut buf = packet;
        let header = rtp::header::Header::unmarshal(&mut buf)?;
        Ok(header.marshal_size())
    }
}

impl SrtpContext for XorContext {
    fn encrypt_rtp(&mut self, plaintext: &[u8]) -> shared::error::Result<Bytes> {
        let offset = XorContext::rtp_header_len(plaintext)?;
        Ok(self.apply(plaintext, offset))
    }

    fn decrypt_rtp(&mut self, encrypted: &[u8]) -> shared::error::Result<Bytes> {
        // XOR leaves the header untouched, so it parses before decryption
        let offset = XorContext::rtp_header_len(encrypted)?;
        Ok(self.apply(encrypted, offset))
    }

    fn encrypt_rtcp(&mut self, plaintext: &[u8]) -> shared::error::Result<Bytes> {
        Ok(self.apply(plaintext, RTCP_HEADER_LENGTH))
    }

    fn decrypt_rtcp(&mut self, encrypted: &[u8]) -> shared::error::Result<Bytes> {
        Ok(self.apply(encrypted, RTCP_HEADER_LENGTH))
    }
}

/// FramedSctpFactory carries `[stream id][ppi][flags][payload]` frames over
/// the DTLS connection. Streams announced with DCEP are handed to
/// `accept_stream`; anything else waits for a local `open_stream`.
pub struct FramedSctpFactory;

#[async_trait]
impl SctpFactory for FramedSctpFactory {
    async fn client(
        &self,
        conn: Arc<dyn Conn + Send + Sync>,
        config: SctpConfig,
    ) -> shared::error::Result<Arc<dyn SctpAssociation + Send + Sync>> {
        Ok(FramedAssociation::start(conn, config))
    }

    async fn server(
        &self,
        conn: Arc<dyn Conn + Send + Sync>,
        config: SctpConfig,
    ) -> shared::error::Result<Arc<dyn SctpAssociation + Send + Sync>> {
        Ok(FramedAssociation::start(conn, config))
    }
}

type StreamMap = Arc<Mutex<HashMap<u16, Arc<FramedStream>>>>;

struct FramedAssociation {
    conn: Arc<dyn Conn + Send + Sync>,
    streams: StreamMap,
    accept_rx: Mutex<mpsc::UnboundedReceiver<Arc<FramedStream>>>,
    close_tx: util::sync::Mutex<Option<oneshot::Sender<()>>>,
    max_message_size: u32,
}

impl FramedAssociation {
    fn start(conn: Arc<dyn Conn + Send + Sync>, config: SctpConfig) -> Arc<Self> {
        let streams: StreamMap = Arc::new(Mutex::new(HashMap::new()));
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = oneshot::channel();

        tokio::spawn(FramedAssociation::read_loop(
            Arc::clone(&conn),
            Arc::clone(&streams),
            accept_tx,
            close_rx,
        ));

        Arc::new(FramedAssociation {
            conn,
            streams,
            accept_rx: Mutex::new(accept_rx),
            close_tx: util::sync::Mutex::new(Some(close_tx)),
            max_message_size: config.max_message_size,
        })
    }

    async fn get_or_create(
        conn: &Arc<dyn Conn + Send + Sync>,
        streams: &StreamMap,
        id: u16,
    ) -> (Arc<FramedStream>, bool) {
        let mut streams = streams.lock().await;
        if let Some(stream) = streams.get(&id) {
            return (Arc::clone(stream), false);
        }
        let stream = Arc::new(FramedStream::new(id, Arc::clone(conn)));
        streams.insert(id, Arc::clone(&stream));
        (stream, true)
    }

    async fn read_loop(
        conn: Arc<dyn Conn + Send + Sync>,
        streams: StreamMap,
        accept_tx: mpsc::UnboundedSender<Arc<FramedStream>>,
        mut close_rx: oneshot::Receiver<()>,
    ) {
        let mut buf = vec![0u8; MAX_FRAME_SIZE];
        loop {
            let n = tokio::select! {
                _ = &mut close_rx => break,
                result = conn.recv(&mut buf) => match result {
                    Ok(n) => n,
                    Err(err) => {
                        log::debug!("framed sctp: read loop ended: {err}");
                        break;
                    }
                },
            };
            if n < FRAME_HEADER_LENGTH {
                continue;
            }

            let id = u16::from_be_bytes([buf[0], buf[1]]);
            let ppi = PayloadProtocolIdentifier::from(u32::from_be_bytes([
                buf[2], buf[3], buf[4], buf[5],
            ]));
            let flags = buf[6];
            let payload = Bytes::copy_from_slice(&buf[FRAME_HEADER_LENGTH..n]);

            let (stream, created) = FramedAssociation::get_or_create(&conn, &streams, id).await;
            if flags & FRAME_FLAG_RESET != 0 {
                stream.deliver(Inbound::Reset);
                continue;
            }
            stream.deliver(Inbound::Message(payload, ppi));
            if created && ppi == PayloadProtocolIdentifier::Dcep {
                let _ = accept_tx.send(stream);
            }
        }
    }
}

#[async_trait]
impl SctpAssociation for FramedAssociation {
    async fn open_stream(
        &self,
        stream_identifier: u16,
        _default_payload_type: PayloadProtocolIdentifier,
    ) -> shared::error::Result<Arc<dyn SctpStream + Send + Sync>> {
        let (stream, _) =
            FramedAssociation::get_or_create(&self.conn, &self.streams, stream_identifier).await;
        Ok(stream)
    }

    async fn accept_stream(&self) -> Option<Arc<dyn SctpStream + Send + Sync>> {
        let mut accept_rx = self.accept_rx.lock().await;
        let stream = accept_rx.recv().await?;
        Some(stream)
    }

    fn max_message_size(&self) -> u32 {
        self.max_message_size
    }

    async fn close(&self) -> shared::error::Result<()> {
        if let Some(close_tx) = self.close_tx.lock().take() {
            let _ = close_tx.send(());
        }
        Ok(())
    }
}

enum Inbound {
    Message(Bytes, PayloadProtocolIdentifier),
    Reset,
}

struct FramedStream {
    id: u16,
    conn: Arc<dyn Conn + Send + Sync>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: Mutex<mpsc::UnboundedReceiver<Inbound>>,
    reset: AtomicBool,
    buffered_amount_low_threshold: AtomicUsize,
    on_buffered_amount_low: util::sync::Mutex<Option<OnBufferedAmountLowFn>>,
}

impl FramedStream {
    fn new(id: u16, conn: Arc<dyn Conn + Send + Sync>) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        FramedStream {
            id,
            conn,
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
            reset: AtomicBool::new(false),
            buffered_amount_low_threshold: AtomicUsize::new(0),
            on_buffered_amount_low: util::sync::Mutex::new(None),
        }
    }

    fn deliver(&self, inbound: Inbound) {
        let _ = self.inbound_tx.send(inbound);
    }

    async fn write_frame(
        &self,
        data: &[u8],
        ppi: u32,
        flags: u8,
    ) -> shared::error::Result<usize> {
        let mut frame = BytesMut::with_capacity(FRAME_HEADER_LENGTH + data.len());
        frame.put_u16(self.id);
        frame.put_u32(ppi);
        frame.put_u8(flags);
        frame.put_slice(data);
        self.conn.send(&frame).await?;
        Ok(data.len())
    }
}

#[async_trait]
impl SctpStream for FramedStream {
    fn stream_identifier(&self) -> u16 {
        self.id
    }

    async fn write_sctp(
        &self,
        data: &Bytes,
        ppi: PayloadProtocolIdentifier,
    ) -> shared::error::Result<usize> {
        if self.reset.load(Ordering::SeqCst) {
            return Err(Error::ErrEof);
        }
        self.write_frame(data, ppi.to_u32()?, 0).await
    }

    async fn read_sctp(
        &self,
        buf: &mut [u8],
    ) -> shared::error::Result<(usize, PayloadProtocolIdentifier)> {
        if self.reset.load(Ordering::SeqCst) {
            return Err(Error::ErrEof);
        }
        let mut inbound_rx = self.inbound_rx.lock().await;
        match inbound_rx.recv().await {
            Some(Inbound::Message(data, ppi)) => {
                if data.len() > buf.len() {
                    return Err(Error::ErrBufferShort);
                }
                buf[..data.len()].copy_from_slice(&data);
                Ok((data.len(), ppi))
            }
            Some(Inbound::Reset) | None => {
                self.reset.store(true, Ordering::SeqCst);
                Err(Error::ErrEof)
            }
        }
    }

    fn set_reliability_params(&self, _unordered: bool, _rel_type: ReliabilityType, _rel_val: u32) {}

    fn buffered_amount(&self) -> usize {
        0
    }

    fn buffered_amount_low_threshold(&self) -> usize {
        self.buffered_amount_low_threshold.load(Ordering::SeqCst)
    }

    fn set_buffered_amount_low_threshold(&self, th: usize) {
        self.buffered_amount_low_threshold.store(th, Ordering::SeqCst);
    }

    fn on_buffered_amount_low(&self, f: OnBufferedAmountLowFn) {
        *self.on_buffered_amount_low.lock() = Some(f);
    }

    async fn shutdown(&self) -> shared::error::Result<()> {
        if self.reset.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.write_frame(&[0], PayloadProtocolIdentifier::Dcep.to_u32()?, FRAME_FLAG_RESET)
            .await?;
        Ok(())
    }
}

/// new_media_engine registers the default codecs and the MID/RID header
/// extensions.
pub fn new_media_engine() -> Result<MediaEngine> {
    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs()?;
    media_engine.register_default_header_extensions()?;
    Ok(media_engine)
}

/// new_api builds an API whose collaborators all run on `network`.
pub fn new_api(
    network: &Arc<LoopbackNetwork>,
    media_engine: MediaEngine,
    setting_engine: SettingEngine,
) -> API {
    APIBuilder::new()
        .with_media_engine(media_engine)
        .with_setting_engine(setting_engine)
        .with_ice_agent_factory(Arc::new(LoopbackIceFactory(Arc::clone(network))))
        .with_dtls_handshaker(Arc::new(ToyDtlsHandshaker))
        .with_srtp_factory(Arc::new(XorSrtpFactory))
        .with_sctp_factory(Arc::new(FramedSctpFactory))
        .build()
}

/// new_pair creates two PeerConnections with default codecs on one network.
pub async fn new_pair() -> Result<(RTCPeerConnection, RTCPeerConnection)> {
    let network = LoopbackNetwork::new();
    let offer_api = new_api(&network, new_media_engine()?, SettingEngine::default());
    let answer_api = new_api(&network, new_media_engine()?, SettingEngine::default());

    let offer_pc = offer_api
        .new_peer_connection(RTCConfigurationBuilder::new().build())
        .await?;
    let answer_pc = answer_api
        .new_peer_connection(RTCConfigurationBuilder::new().build())
        .await?;
    Ok((offer_pc, answer_pc))
}

/// negotiate runs one complete offer/answer exchange.
pub async fn negotiate(offer_pc: &RTCPeerConnection, answer_pc: &RTCPeerConnection) -> Result<()> {
    let offer = offer_pc.create_offer(None).await?;
    offer_pc.set_local_description(offer.clone()).await?;
    answer_pc.set_remote_description(offer).await?;

    let answer = answer_pc.create_answer(None).await?;
    answer_pc.set_local_description(answer.clone()).await?;
    offer_pc.set_remote_description(answer).await?;
    Ok(())
}

/// until_connected waits for both PeerConnections to report `connected`.
pub async fn until_connected(pcs: &[&RTCPeerConnection]) -> Result<()> {
    tokio::time::timeout(DEFAULT_TIMEOUT, async {
        while pcs
            .iter()
            .any(|pc| pc.connection_state() != RTCPeerConnectionState::Connected)
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    Ok(())
}

/// close_pair closes both connections, logging instead of failing.
pub async fn close_pair(offer_pc: &RTCPeerConnection, answer_pc: &RTCPeerConnection) {
    for pc in [offer_pc, answer_pc] {
        if let Err(err) = pc.close().await {
            log::warn!("close failed: {err}");
        }
    }
}
