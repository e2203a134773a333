//! SCTP transport: association lifecycle, inbound data channel acceptance
//! and data channel id allocation.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;

use crate::data_channel::dcep::Message;
use crate::data_channel::parameters::DataChannelParameters;
use crate::data_channel::RTCDataChannel;
use crate::peer_connection::configuration::setting_engine::SettingEngine;
use crate::peer_connection::transport::dtls::role::RTCDtlsRole;
use crate::peer_connection::transport::dtls::RTCDtlsTransport;
use association::{
    PayloadProtocolIdentifier, ReliabilityType, SctpAssociation, SctpConfig, SctpFactory,
    SctpStream,
};
use capabilities::SCTPTransportCapabilities;
use shared::error::{Error, Result};
use state::RTCSctpTransportState;

pub mod association;
pub mod capabilities;
pub mod state;

const SCTP_MAX_CHANNELS: u16 = u16::MAX;

pub type OnDataChannelHdlrFn = Box<
    dyn (FnMut(Arc<RTCDataChannel>) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnSctpErrorHdlrFn =
    Box<dyn (FnMut(Error) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

/// SCTPTransport provides details about the SCTP transport.
pub struct RTCSctpTransport {
    pub(crate) dtls_transport: Arc<RTCDtlsTransport>,

    // State represents the current state of the SCTP transport.
    state: AtomicU8, // RTCSctpTransportState

    is_started: AtomicBool,

    // max_message_size represents the maximum size of data that can be passed to
    // DataChannel's send() method.
    max_message_size: AtomicU32,

    // max_channels represents the maximum amount of DataChannel's that can
    // be used simultaneously.
    max_channels: u16,

    association: Mutex<Option<Arc<dyn SctpAssociation + Send + Sync>>>,

    on_error_handler: ArcSwapOption<Mutex<OnSctpErrorHdlrFn>>,
    on_data_channel_handler: ArcSwapOption<Mutex<OnDataChannelHdlrFn>>,

    pub(crate) data_channels: Mutex<Vec<Arc<RTCDataChannel>>>,
    data_channel_ids: Mutex<HashSet<u16>>,

    setting_engine: Arc<SettingEngine>,
    factory: Arc<dyn SctpFactory + Send + Sync>,
}

impl RTCSctpTransport {
    pub(crate) fn new(
        dtls_transport: Arc<RTCDtlsTransport>,
        setting_engine: Arc<SettingEngine>,
        factory: Arc<dyn SctpFactory + Send + Sync>,
    ) -> Self {
        RTCSctpTransport {
            dtls_transport,
            state: AtomicU8::new(RTCSctpTransportState::Connecting as u8),
            is_started: AtomicBool::new(false),
            max_message_size: AtomicU32::new(0),
            max_channels: SCTP_MAX_CHANNELS,
            association: Mutex::new(None),
            on_error_handler: ArcSwapOption::empty(),
            on_data_channel_handler: ArcSwapOption::empty(),
            data_channels: Mutex::new(vec![]),
            data_channel_ids: Mutex::new(HashSet::new()),
            setting_engine,
            factory,
        }
    }

    /// transport returns the DTLSTransport instance the SCTPTransport is sending over.
    pub fn dtls_transport(&self) -> Arc<RTCDtlsTransport> {
        Arc::clone(&self.dtls_transport)
    }

    /// get_capabilities returns the SCTPCapabilities of the SCTPTransport.
    pub fn get_capabilities(&self) -> SCTPTransportCapabilities {
        SCTPTransportCapabilities {
            max_message_size: self.setting_engine.sctp_max_message_size.as_u32(),
        }
    }

    /// Start the SCTPTransport. Since both local and remote parties must mutually
    /// create an SCTPTransport, SCTP SO (Simultaneous Open) is used to establish
    /// a connection over SCTP.
    pub async fn start(self: &Arc<Self>, remote_caps: SCTPTransportCapabilities) -> Result<()> {
        if self.is_started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let dtls_conn = match self.dtls_transport.conn().await {
            Some(conn) => conn,
            None => {
                self.is_started.store(false, Ordering::SeqCst);
                return Err(Error::ErrSCTPTransportDTLS);
            }
        };

        let config = SctpConfig {
            max_receive_buffer_size: 0,
            max_message_size: self.setting_engine.sctp_max_message_size.as_u32(),
        };
        let conn = dtls_conn.into_conn();
        let association = if self.dtls_transport.role().await == RTCDtlsRole::Client {
            self.factory.client(conn, config).await
        } else {
            self.factory.server(conn, config).await
        };
        let association = match association {
            Ok(association) => association,
            Err(err) => {
                self.is_started.store(false, Ordering::SeqCst);
                return Err(err);
            }
        };

        self.max_message_size.store(
            calc_message_size(remote_caps.max_message_size, association.max_message_size()),
            Ordering::SeqCst,
        );

        {
            let mut a = self.association.lock().await;
            *a = Some(Arc::clone(&association));
        }
        self.state
            .store(RTCSctpTransportState::Connected as u8, Ordering::SeqCst);
        log::debug!("sctp association established");

        let sctp_transport = Arc::clone(self);
        tokio::spawn(async move {
            sctp_transport.accept_data_channels(association).await;
        });

        Ok(())
    }

    /// Stop stops the SCTPTransport
    pub async fn stop(&self) -> Result<()> {
        let association = self.association.lock().await.take();
        self.state
            .store(RTCSctpTransportState::Closed as u8, Ordering::SeqCst);
        if let Some(association) = association {
            association.close().await?;
        }
        Ok(())
    }

    async fn accept_data_channels(self: Arc<Self>, association: Arc<dyn SctpAssociation + Send + Sync>) {
        while let Some(stream) = association.accept_stream().await {
            if let Err(err) = self.accept_data_channel(stream).await {
                log::warn!("failed to accept data channel: {err}");
                if let Some(handler) = &*self.on_error_handler.load() {
                    let mut f = handler.lock().await;
                    f(err).await;
                }
            }
        }
        log::debug!("sctp accept loop finished");
    }

    async fn accept_data_channel(
        self: &Arc<Self>,
        stream: Arc<dyn SctpStream + Send + Sync>,
    ) -> Result<()> {
        let mut buf = vec![0u8; self.setting_engine.sctp_max_message_size.as_u32() as usize];
        let (n, ppi) = stream.read_sctp(&mut buf).await?;
        if ppi != PayloadProtocolIdentifier::Dcep {
            return Err(Error::InvalidPayloadProtocolIdentifier(ppi.to_u32().unwrap_or(0)));
        }

        let open = match Message::unmarshal(&buf[..n])? {
            Message::DataChannelOpen(open) => open,
            Message::DataChannelAck => return Err(Error::InvalidMessageType(0x02)),
        };

        let (unordered, reliability_type) = open.channel_type.reliability_params();
        let val = open.reliability_parameter;
        let (max_retransmits, max_packet_life_time) = match reliability_type {
            ReliabilityType::Reliable => (None, None),
            ReliabilityType::Rexmit => (Some(val.min(u16::MAX as u32) as u16), None),
            ReliabilityType::Timed => (None, Some(val.min(u16::MAX as u32) as u16)),
        };

        let id = stream.stream_identifier();
        let dc = Arc::new(RTCDataChannel::new(
            DataChannelParameters {
                label: open.label,
                protocol: open.protocol,
                ordered: !unordered,
                max_packet_life_time,
                max_retransmits,
                negotiated: None,
            },
            Arc::clone(&self.setting_engine),
        ));
        dc.id.store(id, Ordering::SeqCst);
        {
            let mut st = dc.sctp_transport.lock().await;
            *st = Some(Arc::downgrade(self));
        }
        stream.set_reliability_params(unordered, reliability_type, val);

        let ack = Message::DataChannelAck.marshal()?;
        stream.write_sctp(&ack, PayloadProtocolIdentifier::Dcep).await?;

        self.data_channel_ids.lock().await.insert(id);
        self.data_channels.lock().await.push(Arc::clone(&dc));
        log::debug!("accepted data channel {} ({id})", dc.label());

        // the application sees the channel before any of its events fire
        if let Some(handler) = &*self.on_data_channel_handler.load() {
            let mut f = handler.lock().await;
            f(Arc::clone(&dc)).await;
        }

        dc.handle_open(stream, true).await;

        Ok(())
    }

    /// on_error sets an event handler which is invoked when
    /// the SCTP connection error occurs.
    pub fn on_error(&self, f: OnSctpErrorHdlrFn) {
        self.on_error_handler.store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_data_channel sets an event handler which is invoked when a data
    /// channel message arrives from a remote peer.
    pub fn on_data_channel(&self, f: OnDataChannelHdlrFn) {
        self.on_data_channel_handler
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// max_channels is the maximum number of RTCDataChannels that can be open simultaneously.
    pub fn max_channels(&self) -> u16 {
        self.max_channels
    }

    /// max_message_size is the largest message data channels may send; 0 before start.
    pub fn max_message_size(&self) -> u32 {
        self.max_message_size.load(Ordering::SeqCst)
    }

    /// state returns the current state of the SCTPTransport
    pub fn state(&self) -> RTCSctpTransportState {
        self.state.load(Ordering::SeqCst).into()
    }

    pub(crate) async fn association(&self) -> Option<Arc<dyn SctpAssociation + Send + Sync>> {
        let association = self.association.lock().await;
        association.clone()
    }

    pub(crate) async fn add_data_channel(&self, dc: Arc<RTCDataChannel>) {
        let mut data_channels = self.data_channels.lock().await;
        data_channels.push(dc);
    }

    /// reserve_data_channel_id claims an application chosen id.
    pub(crate) async fn reserve_data_channel_id(&self, id: u16) -> Result<()> {
        if id >= self.max_channels {
            return Err(Error::ErrMaxDataChannelID);
        }
        let mut ids = self.data_channel_ids.lock().await;
        if !ids.insert(id) {
            return Err(Error::ErrDataChannelIdInUse);
        }
        Ok(())
    }

    pub(crate) async fn generate_and_set_data_channel_id(&self, dtls_role: RTCDtlsRole) -> Result<u16> {
        let mut ids = self.data_channel_ids.lock().await;
        allocate_data_channel_id(&mut ids, dtls_role, self.max_channels)
    }
}

/// allocate_data_channel_id picks the lowest free id of the parity owned by
/// the local DTLS role: even for the client, odd for the server.
fn allocate_data_channel_id(
    ids: &mut HashSet<u16>,
    dtls_role: RTCDtlsRole,
    max_channels: u16,
) -> Result<u16> {
    let mut id = if dtls_role == RTCDtlsRole::Client {
        0u16
    } else {
        1u16
    };

    while id < max_channels {
        if ids.insert(id) {
            return Ok(id);
        }
        id = match id.checked_add(2) {
            Some(next) => next,
            None => break,
        };
    }

    Err(Error::ErrMaxDataChannelID)
}

/// calc_message_size picks the smaller of what the remote accepts and what
/// the association can send; 0 means "unknown" on either side.
fn calc_message_size(remote_max_message_size: u32, can_send_size: u32) -> u32 {
    if remote_max_message_size == 0 && can_send_size == 0 {
        u32::MAX
    } else if remote_max_message_size == 0 {
        can_send_size
    } else if can_send_size == 0 || can_send_size > remote_max_message_size {
        remote_max_message_size
    } else {
        can_send_size
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_calc_message_size() {
        let tests = vec![
            ((0, 0), u32::MAX),
            ((0, 1024), 1024),
            ((65536, 0), 65536),
            ((65536, 262144), 65536),
            ((262144, 65536), 65536),
        ];

        for ((remote, can_send), expected) in tests {
            assert_eq!(calc_message_size(remote, can_send), expected);
        }
    }

    #[test]
    fn test_allocate_data_channel_id() {
        let tests = vec![
            (RTCDtlsRole::Client, vec![], Ok(0)),
            (RTCDtlsRole::Client, vec![0, 1, 2], Ok(4)),
            (RTCDtlsRole::Server, vec![], Ok(1)),
            (RTCDtlsRole::Server, vec![1, 3], Ok(5)),
            (RTCDtlsRole::Server, vec![1, 3, 5], Err(Error::ErrMaxDataChannelID)),
        ];

        for (role, used, expected) in tests {
            let mut ids: HashSet<u16> = used.into_iter().collect();
            let max = if expected.is_err() { 6 } else { SCTP_MAX_CHANNELS };
            let result = allocate_data_channel_id(&mut ids, role, max);
            assert_eq!(result, expected);
            if let Ok(id) = result {
                assert!(ids.contains(&id));
            }
        }
    }
}
