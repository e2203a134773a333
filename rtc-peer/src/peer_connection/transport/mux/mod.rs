//! Demultiplexes the single ICE connection into DTLS, SRTP and SRTCP
//! endpoints by the first byte of each datagram (RFC 7983).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use util::{Buffer, Conn};

use shared::error::Result;
use shared::util::MatchFunc;

pub(crate) mod endpoint;

use endpoint::Endpoint;

/// mux multiplexes packets on a single socket (RFC7983)
const MAX_BUFFER_SIZE: usize = 1000 * 1000; // 1MB

/// Config collects the arguments to mux.Mux construction into
/// a single structure
pub(crate) struct Config {
    pub(crate) conn: Arc<dyn Conn + Send + Sync>,
    pub(crate) buffer_size: usize,
}

/// Mux allows multiplexing
#[derive(Clone)]
pub(crate) struct Mux {
    id: Arc<AtomicUsize>,
    next_conn: Arc<dyn Conn + Send + Sync>,
    endpoints: Arc<Mutex<HashMap<usize, Arc<Endpoint>>>>,
    buffer_size: usize,
    closed_ch_tx: Arc<Mutex<Option<mpsc::Sender<()>>>>,
}

impl Mux {
    pub(crate) fn new(config: Config) -> Self {
        let (closed_ch_tx, closed_ch_rx) = mpsc::channel(1);
        let m = Mux {
            id: Arc::new(AtomicUsize::new(0)),
            next_conn: Arc::clone(&config.conn),
            endpoints: Arc::new(Mutex::new(HashMap::new())),
            buffer_size: config.buffer_size,
            closed_ch_tx: Arc::new(Mutex::new(Some(closed_ch_tx))),
        };

        let buffer_size = m.buffer_size;
        let next_conn = Arc::clone(&m.next_conn);
        let endpoints = Arc::clone(&m.endpoints);
        tokio::spawn(async move {
            Mux::read_loop(buffer_size, next_conn, closed_ch_rx, endpoints).await;
        });

        m
    }

    /// creates a new Endpoint
    pub(crate) async fn new_endpoint(&self, match_fn: MatchFunc) -> Arc<Endpoint> {
        let id = self.id.fetch_add(1, Ordering::SeqCst);
        let endpoint = Arc::new(Endpoint {
            id,
            buffer: Buffer::new(0, MAX_BUFFER_SIZE),
            match_fn,
            next_conn: Arc::clone(&self.next_conn),
            endpoints: Arc::clone(&self.endpoints),
        });

        let mut endpoints = self.endpoints.lock().await;
        endpoints.insert(id, Arc::clone(&endpoint));

        endpoint
    }

    /// remove_endpoint removes an endpoint from the Mux
    pub(crate) async fn remove_endpoint(&self, e: &Endpoint) {
        let mut endpoints = self.endpoints.lock().await;
        endpoints.remove(&e.id);
    }

    /// Close closes the Mux and all associated Endpoints.
    pub(crate) async fn close(&self) {
        {
            let mut closed_ch_tx = self.closed_ch_tx.lock().await;
            closed_ch_tx.take();
        }

        let mut endpoints = self.endpoints.lock().await;
        for (_, e) in endpoints.drain() {
            e.buffer.close().await;
        }
    }

    async fn read_loop(
        buffer_size: usize,
        next_conn: Arc<dyn Conn + Send + Sync>,
        mut closed_ch_rx: mpsc::Receiver<()>,
        endpoints: Arc<Mutex<HashMap<usize, Arc<Endpoint>>>>,
    ) {
        let mut buf = vec![0u8; buffer_size];
        let mut n = 0usize;
        loop {
            tokio::select! {
                _ = closed_ch_rx.recv() => break,
                result = next_conn.recv(&mut buf) => match result {
                    Ok(m) => n = m,
                    Err(err) => {
                        log::debug!("mux: ending read loop: {err}");
                        break;
                    }
                }
            }

            if let Err(err) = Mux::dispatch(&buf[..n], &endpoints).await {
                log::error!("mux: ending read loop: {err}");
                break;
            }
        }

        // unblock everyone still reading from an endpoint
        let endpoints = endpoints.lock().await;
        for e in endpoints.values() {
            e.buffer.close().await;
        }
    }

    async fn dispatch(
        buf: &[u8],
        endpoints: &Arc<Mutex<HashMap<usize, Arc<Endpoint>>>>,
    ) -> Result<()> {
        let mut endpoint = None;

        {
            let eps = endpoints.lock().await;
            for ep in eps.values() {
                if (ep.match_fn)(buf) {
                    endpoint = Some(Arc::clone(ep));
                    break;
                }
            }
        }

        if let Some(ep) = endpoint {
            match ep.buffer.write(buf).await {
                // Expected when bytes are received faster than the endpoint can process them
                Err(util::Error::ErrBufferFull) => {
                    log::info!("mux: endpoint buffer is full, dropping packet")
                }
                Ok(_) => (),
                Err(e) => return Err(e.into()),
            }
        } else if !buf.is_empty() {
            log::warn!(
                "Warning: mux: no endpoint for packet starting with {}",
                buf[0]
            );
        } else {
            log::warn!("Warning: mux: no endpoint for zero length packet");
        }

        Ok(())
    }
}
