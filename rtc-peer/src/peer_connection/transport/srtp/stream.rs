use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use interceptor::{Attributes, RTCPPacket, RTCPReader, RTPReader};
use tokio::sync::mpsc;
use util::marshal::Unmarshal;
use util::Buffer;

use crate::statistics::accumulator::RtpStreamCounters;
use shared::error::{Error, Result};

/// Limit the buffer size to 1MB
pub(crate) const SRTP_BUFFER_SIZE: usize = 1000 * 1000;

/// Limit the buffer size to 100KB
pub(crate) const SRTCP_BUFFER_SIZE: usize = 100 * 1000;

/// Stream handles decryption for a single RTP/RTCP SSRC
#[derive(Debug)]
pub struct Stream {
    ssrc: u32,
    tx: mpsc::Sender<u32>,
    pub(crate) buffer: Buffer,
    /// Packets and payload bytes the session delivered to this stream.
    pub(crate) received: RtpStreamCounters,
    is_rtp: bool,
}

impl Stream {
    pub(crate) fn new(ssrc: u32, tx: mpsc::Sender<u32>, is_rtp: bool) -> Self {
        Stream {
            ssrc,
            tx,
            buffer: Buffer::new(
                0,
                if is_rtp {
                    SRTP_BUFFER_SIZE
                } else {
                    SRTCP_BUFFER_SIZE
                },
            ),
            received: RtpStreamCounters::default(),
            is_rtp,
        }
    }

    /// GetSSRC returns the SSRC we are demuxing for
    pub fn get_ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn is_rtp_stream(&self) -> bool {
        self.is_rtp
    }

    /// read reads one decrypted packet into `buf`. A `timeout` that fires
    /// returns a timeout error and leaves the stream readable.
    pub async fn read(&self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize> {
        Ok(self.buffer.read(buf, timeout).await?)
    }

    /// read_rtp reads and decrypts full RTP packet and its header from the nextConn
    pub async fn read_rtp(
        &self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<(usize, rtp::header::Header)> {
        if !self.is_rtp {
            return Err(Error::Other("stream is not an RTP stream".to_owned()));
        }

        let n = self.read(buf, timeout).await?;
        let mut b = &buf[..n];
        let header = rtp::header::Header::unmarshal(&mut b)?;

        Ok((n, header))
    }

    /// read_rtcp reads and decrypts full RTCP packet from the nextConn
    pub async fn read_rtcp(
        &self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<(usize, Vec<Box<dyn rtcp::packet::Packet + Send + Sync>>)> {
        if self.is_rtp {
            return Err(Error::Other("stream is not an RTCP stream".to_owned()));
        }

        let n = self.read(buf, timeout).await?;
        let mut b = Bytes::copy_from_slice(&buf[..n]);
        let pkts = rtcp::packet::unmarshal(&mut b)?;

        Ok((n, pkts))
    }

    /// Close removes the ReadStream from the session and cleans up any associated state
    pub async fn close(&self) -> Result<()> {
        self.buffer.close().await;
        let _ = self.tx.send(self.ssrc).await;
        Ok(())
    }
}

#[async_trait]
impl RTPReader for Stream {
    async fn read(
        &self,
        buf: &mut [u8],
        attributes: &Attributes,
    ) -> Result<(rtp::packet::Packet, Attributes)> {
        let (n, _) = self.read_rtp(buf, None).await?;
        let mut b = &buf[..n];
        let pkt = rtp::packet::Packet::unmarshal(&mut b)?;

        Ok((pkt, attributes.clone()))
    }
}

#[async_trait]
impl RTCPReader for Stream {
    async fn read(
        &self,
        buf: &mut [u8],
        attributes: &Attributes,
    ) -> Result<(Vec<RTCPPacket>, Attributes)> {
        let (_, pkts) = self.read_rtcp(buf, None).await?;

        Ok((pkts, attributes.clone()))
    }
}
