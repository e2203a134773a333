use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};
use util::marshal::{Marshal, Unmarshal};
use util::Conn;

use super::stream::Stream;
use super::SrtpContext;
use shared::error::{Error, Result};

/// Session implements SRTP or SRTCP over an already muxed connection.
///
/// Decrypted packets are routed to a [`Stream`] per SSRC. A packet for an
/// SSRC nobody has opened yet creates a stream and hands it to
/// [`Session::accept`].
pub struct Session {
    local_context: Mutex<Box<dyn SrtpContext + Send + Sync>>,
    streams_map: Arc<Mutex<HashMap<u32, Arc<Stream>>>>,
    #[allow(clippy::type_complexity)]
    new_stream_rx: Arc<Mutex<mpsc::Receiver<(Arc<Stream>, Option<rtp::header::Header>)>>>,
    close_stream_tx: mpsc::Sender<u32>,
    close_session_tx: Mutex<Option<mpsc::Sender<()>>>,
    pub(crate) udp_tx: Arc<dyn Conn + Send + Sync>,
    is_rtp: bool,
}

impl Session {
    pub(crate) fn new(
        conn: Arc<dyn Conn + Send + Sync>,
        local_context: Box<dyn SrtpContext + Send + Sync>,
        mut remote_context: Box<dyn SrtpContext + Send + Sync>,
        is_rtp: bool,
    ) -> Self {
        let streams_map = Arc::new(Mutex::new(HashMap::new()));
        let (mut new_stream_tx, new_stream_rx) = mpsc::channel(8);
        let (close_stream_tx, mut close_stream_rx) = mpsc::channel(8);
        let (close_session_tx, mut close_session_rx) = mpsc::channel(8);
        let udp_tx = Arc::clone(&conn);
        let udp_rx = Arc::clone(&conn);
        let cloned_streams_map = Arc::clone(&streams_map);
        let cloned_close_stream_tx = close_stream_tx.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 8192];

            loop {
                let incoming_stream = Session::incoming(
                    &udp_rx,
                    &mut buf,
                    &cloned_streams_map,
                    &cloned_close_stream_tx,
                    &mut new_stream_tx,
                    &mut remote_context,
                    is_rtp,
                );
                let close_stream = close_stream_rx.recv();
                let close_session = close_session_rx.recv();

                tokio::select! {
                    result = incoming_stream => match result {
                        Ok(()) => {},
                        Err(err) => {
                            log::info!("srtp session ended: {err}");
                            break;
                        }
                    },
                    opt = close_stream => if let Some(ssrc) = opt {
                        Session::close_stream(&cloned_streams_map, ssrc).await
                    },
                    _ = close_session => break
                }
            }

            let streams = cloned_streams_map.lock().await;
            for stream in streams.values() {
                stream.buffer.close().await;
            }
        });

        Session {
            local_context: Mutex::new(local_context),
            streams_map,
            new_stream_rx: Arc::new(Mutex::new(new_stream_rx)),
            close_stream_tx,
            close_session_tx: Mutex::new(Some(close_session_tx)),
            udp_tx,
            is_rtp,
        }
    }

    async fn close_stream(streams_map: &Arc<Mutex<HashMap<u32, Arc<Stream>>>>, ssrc: u32) {
        let mut streams = streams_map.lock().await;
        streams.remove(&ssrc);
    }

    async fn incoming(
        udp_rx: &Arc<dyn Conn + Send + Sync>,
        buf: &mut [u8],
        streams_map: &Arc<Mutex<HashMap<u32, Arc<Stream>>>>,
        close_stream_tx: &mpsc::Sender<u32>,
        new_stream_tx: &mut mpsc::Sender<(Arc<Stream>, Option<rtp::header::Header>)>,
        remote_context: &mut Box<dyn SrtpContext + Send + Sync>,
        is_rtp: bool,
    ) -> Result<()> {
        let n = udp_rx.recv(buf).await?;
        if n == 0 {
            return Err(Error::SessionSrtpAlreadyClosed);
        }

        let decrypted = if is_rtp {
            remote_context.decrypt_rtp(&buf[..n])
        } else {
            remote_context.decrypt_rtcp(&buf[..n])
        };
        let decrypted = match decrypted {
            Ok(decrypted) => decrypted,
            Err(err) => {
                // a single undecryptable packet must not end the session
                log::debug!("srtp: dropping packet that failed to decrypt: {err}");
                return Ok(());
            }
        };

        let mut targets = vec![];
        let mut payload_len = 0;
        if is_rtp {
            let mut b = &decrypted[..];
            let header = match rtp::header::Header::unmarshal(&mut b) {
                Ok(header) => header,
                Err(err) => {
                    log::debug!("srtp: dropping malformed rtp packet: {err}");
                    return Ok(());
                }
            };
            payload_len = b.len();
            targets.push((header.ssrc, Some(header)));
        } else {
            let mut b = decrypted.clone();
            let pkts = match rtcp::packet::unmarshal(&mut b) {
                Ok(pkts) => pkts,
                Err(err) => {
                    log::debug!("srtcp: dropping malformed rtcp packet: {err}");
                    return Ok(());
                }
            };
            for pkt in &pkts {
                for ssrc in pkt.destination_ssrc() {
                    if !targets.iter().any(|(s, _)| *s == ssrc) {
                        targets.push((ssrc, None));
                    }
                }
            }
        }

        for (ssrc, header) in targets {
            let (stream, is_new) =
                Session::get_or_create_stream(streams_map, close_stream_tx.clone(), is_rtp, ssrc)
                    .await;
            if is_new {
                log::trace!(
                    "srtp session got new {} stream {}",
                    if is_rtp { "rtp" } else { "rtcp" },
                    ssrc
                );
                new_stream_tx.send((Arc::clone(&stream), header)).await?;
            }

            match stream.buffer.write(&decrypted).await {
                Ok(_) => {
                    if is_rtp {
                        stream.received.on_packet(payload_len);
                    }
                }
                Err(util::Error::ErrBufferFull) => {
                    // Silently drop data when the buffer is full.
                }
                Err(err) => {
                    // a stream closed by its reader only loses its own packets
                    log::debug!("srtp: dropping packet for ssrc {ssrc}: {err}");
                }
            }
        }

        Ok(())
    }

    async fn get_or_create_stream(
        streams_map: &Arc<Mutex<HashMap<u32, Arc<Stream>>>>,
        close_stream_tx: mpsc::Sender<u32>,
        is_rtp: bool,
        ssrc: u32,
    ) -> (Arc<Stream>, bool) {
        let mut streams = streams_map.lock().await;

        if let Some(stream) = streams.get(&ssrc) {
            (Arc::clone(stream), false)
        } else {
            let stream = Arc::new(Stream::new(ssrc, close_stream_tx, is_rtp));
            streams.insert(ssrc, Arc::clone(&stream));
            (stream, true)
        }
    }

    /// open on the given SSRC to create a stream, it can be used
    /// if you want a certain SSRC, but don't want to wait for Accept
    pub async fn open(&self, ssrc: u32) -> Arc<Stream> {
        let (stream, _) = Session::get_or_create_stream(
            &self.streams_map,
            self.close_stream_tx.clone(),
            self.is_rtp,
            ssrc,
        )
        .await;

        stream
    }

    /// accept returns a stream to handle RTCP for a single SSRC
    pub async fn accept(&self) -> Result<(Arc<Stream>, Option<rtp::header::Header>)> {
        let mut new_stream_rx = self.new_stream_rx.lock().await;
        new_stream_rx
            .recv()
            .await
            .ok_or(Error::SessionSrtpAlreadyClosed)
    }

    pub async fn close(&self) -> Result<()> {
        let mut close_session_tx = self.close_session_tx.lock().await;
        close_session_tx.take();

        Ok(())
    }

    /// write encrypts `buf` as one RTP or RTCP packet and sends it.
    pub async fn write(&self, buf: &Bytes, is_rtp: bool) -> Result<usize> {
        if self.is_rtp != is_rtp {
            return Err(Error::Other(
                "Session RTP/RTCP type must be same as input buffer".to_owned(),
            ));
        }

        let encrypted = {
            let mut local_context = self.local_context.lock().await;
            if is_rtp {
                local_context.encrypt_rtp(buf)?
            } else {
                local_context.encrypt_rtcp(buf)?
            }
        };

        Ok(self.udp_tx.send(&encrypted).await?)
    }

    pub async fn write_rtp(&self, pkt: &rtp::packet::Packet) -> Result<usize> {
        let raw = pkt.marshal()?;
        self.write(&raw, true).await
    }

    pub async fn write_rtcp(
        &self,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
    ) -> Result<usize> {
        let raw = rtcp::packet::marshal(pkts)?;
        self.write(&raw, false).await
    }
}
