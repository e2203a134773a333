use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use interceptor::{Attributes, RTCPPacket, RTCPReader, RTPWriter};
use tokio::sync::{watch, Mutex};

use crate::peer_connection::transport::srtp::{Session, Stream};
use crate::peer_connection::transport::RTCDtlsTransport;
use crate::rtp_transceiver::SSRC;
use crate::statistics::accumulator::RtpStreamCounters;
use shared::error::{Error, Result};

/// SrtpWriterFuture blocks Read/Write calls until
/// the SRTP Session is available
pub(crate) struct SrtpWriterFuture {
    pub(crate) closed: AtomicBool,
    pub(crate) ssrc: SSRC,
    pub(crate) stop_called: Arc<watch::Sender<bool>>,
    pub(crate) transport: Arc<RTCDtlsTransport>,
    pub(crate) rtcp_read_stream: Mutex<Option<Arc<Stream>>>,
    pub(crate) rtp_write_session: Mutex<Option<Arc<Session>>>,
    pub(crate) sent: RtpStreamCounters,
}

impl SrtpWriterFuture {
    pub(crate) fn new(
        ssrc: SSRC,
        stop_called: Arc<watch::Sender<bool>>,
        transport: Arc<RTCDtlsTransport>,
    ) -> Self {
        SrtpWriterFuture {
            closed: AtomicBool::new(false),
            ssrc,
            stop_called,
            transport,
            rtcp_read_stream: Mutex::new(None),
            rtp_write_session: Mutex::new(None),
            sent: RtpStreamCounters::default(),
        }
    }

    async fn init(&self, return_when_no_srtp: bool) -> Result<()> {
        if return_when_no_srtp {
            if !self.transport.is_srtp_ready() {
                return Ok(());
            }
        } else {
            let mut stop_called_rx = self.stop_called.subscribe();
            tokio::select! {
                _ = stop_called_rx.wait_for(|stopped| *stopped) => {
                    return Err(Error::ErrConnectionClosed);
                }
                result = self.transport.wait_srtp_ready() => {
                    result?;
                }
            }
        }

        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ErrClosedPipe);
        }

        if let Some(srtcp_session) = self.transport.get_srtcp_session().await {
            let rtcp_read_stream = srtcp_session.open(self.ssrc).await;
            let mut stream = self.rtcp_read_stream.lock().await;
            *stream = Some(rtcp_read_stream);
        }

        {
            let srtp_session = self.transport.get_srtp_session().await;
            let mut session = self.rtp_write_session.lock().await;
            *session = srtp_session;
        }

        Ok(())
    }

    pub(crate) async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let stream = {
            let mut stream = self.rtcp_read_stream.lock().await;
            stream.take()
        };
        if let Some(rtcp_read_stream) = stream {
            rtcp_read_stream.close().await
        } else {
            Ok(())
        }
    }

    pub(crate) async fn read(&self, b: &mut [u8]) -> Result<Vec<RTCPPacket>> {
        let stream = {
            let stream = self.rtcp_read_stream.lock().await;
            stream.clone()
        };
        let stream = match stream {
            Some(stream) => stream,
            None => {
                self.init(false).await?;

                let stream = self.rtcp_read_stream.lock().await;
                stream.clone().ok_or(Error::ErrDtlsTransportNotStarted)?
            }
        };

        let (_, pkts) = stream.read_rtcp(b, None).await?;
        Ok(pkts)
    }

    pub(crate) async fn write_rtp(&self, pkt: &rtp::packet::Packet) -> Result<usize> {
        let mut session = {
            let session = self.rtp_write_session.lock().await;
            session.clone()
        };
        if session.is_none() {
            self.init(true).await?;
            session = self.rtp_write_session.lock().await.clone();
        }

        let Some(session) = session else {
            // SRTP is not up yet; the packet is dropped.
            return Ok(0);
        };
        let n = session.write_rtp(pkt).await?;
        self.sent.on_packet(pkt.payload.len());
        Ok(n)
    }
}

#[async_trait]
impl RTCPReader for SrtpWriterFuture {
    async fn read(
        &self,
        buf: &mut [u8],
        a: &Attributes,
    ) -> Result<(Vec<RTCPPacket>, Attributes)> {
        let pkts = SrtpWriterFuture::read(self, buf).await?;

        Ok((pkts, a.clone()))
    }
}

#[async_trait]
impl RTPWriter for SrtpWriterFuture {
    async fn write(&self, pkt: &rtp::packet::Packet, _a: &Attributes) -> Result<usize> {
        self.write_rtp(pkt).await
    }
}
