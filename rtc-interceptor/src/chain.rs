use crate::*;
use shared::error::flatten_errs;
use util::sync::Mutex;

/// Chain is an interceptor that runs all child interceptors in order.
///
/// A second bind of an SSRC that is already bound returns the writer or reader
/// produced by the first bind, so children only ever see one bind per stream.
#[derive(Default)]
pub struct Chain {
    interceptors: Vec<Arc<dyn Interceptor + Send + Sync>>,
    local_streams: Mutex<HashMap<u32, Arc<dyn RTPWriter + Send + Sync>>>,
    remote_streams: Mutex<HashMap<u32, Arc<dyn RTPReader + Send + Sync>>>,
}

impl Chain {
    /// new returns a new Chain interceptor.
    pub fn new(interceptors: Vec<Arc<dyn Interceptor + Send + Sync>>) -> Self {
        Chain {
            interceptors,
            ..Default::default()
        }
    }

    pub fn add(&mut self, icpr: Arc<dyn Interceptor + Send + Sync>) {
        self.interceptors.push(icpr);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

#[async_trait]
impl Interceptor for Chain {
    async fn bind_rtcp_reader(
        &self,
        mut reader: Arc<dyn RTCPReader + Send + Sync>,
    ) -> Arc<dyn RTCPReader + Send + Sync> {
        for icpr in &self.interceptors {
            reader = icpr.bind_rtcp_reader(reader).await;
        }
        reader
    }

    async fn bind_rtcp_writer(
        &self,
        mut writer: Arc<dyn RTCPWriter + Send + Sync>,
    ) -> Arc<dyn RTCPWriter + Send + Sync> {
        for icpr in &self.interceptors {
            writer = icpr.bind_rtcp_writer(writer).await;
        }
        writer
    }

    async fn bind_local_stream(
        &self,
        info: &StreamInfo,
        mut writer: Arc<dyn RTPWriter + Send + Sync>,
    ) -> Arc<dyn RTPWriter + Send + Sync> {
        if let Some(bound) = self.local_streams.lock().get(&info.ssrc) {
            log::debug!("ssrc {} already bound as local stream", info.ssrc);
            return Arc::clone(bound);
        }

        for icpr in &self.interceptors {
            writer = icpr.bind_local_stream(info, writer).await;
        }

        let mut local_streams = self.local_streams.lock();
        Arc::clone(local_streams.entry(info.ssrc).or_insert(writer))
    }

    async fn unbind_local_stream(&self, info: &StreamInfo) {
        if self.local_streams.lock().remove(&info.ssrc).is_none() {
            return;
        }
        for icpr in &self.interceptors {
            icpr.unbind_local_stream(info).await;
        }
    }

    async fn bind_remote_stream(
        &self,
        info: &StreamInfo,
        mut reader: Arc<dyn RTPReader + Send + Sync>,
    ) -> Arc<dyn RTPReader + Send + Sync> {
        if let Some(bound) = self.remote_streams.lock().get(&info.ssrc) {
            log::debug!("ssrc {} already bound as remote stream", info.ssrc);
            return Arc::clone(bound);
        }

        for icpr in &self.interceptors {
            reader = icpr.bind_remote_stream(info, reader).await;
        }

        let mut remote_streams = self.remote_streams.lock();
        Arc::clone(remote_streams.entry(info.ssrc).or_insert(reader))
    }

    async fn unbind_remote_stream(&self, info: &StreamInfo) {
        if self.remote_streams.lock().remove(&info.ssrc).is_none() {
            return;
        }
        for icpr in &self.interceptors {
            icpr.unbind_remote_stream(info).await;
        }
    }

    async fn close(&self) -> Result<()> {
        self.local_streams.lock().clear();
        self.remote_streams.lock().clear();

        let mut errs = vec![];
        for icpr in &self.interceptors {
            if let Err(err) = icpr.close().await {
                errs.push(err);
            }
        }
        flatten_errs(errs)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingInterceptor {
        local_binds: AtomicUsize,
        local_unbinds: AtomicUsize,
        remote_binds: AtomicUsize,
        writes: Arc<AtomicUsize>,
    }

    struct CountingWriter {
        next: Arc<dyn RTPWriter + Send + Sync>,
        writes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RTPWriter for CountingWriter {
        async fn write(&self, pkt: &rtp::packet::Packet, a: &Attributes) -> Result<usize> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.next.write(pkt, a).await
        }
    }

    #[async_trait]
    impl Interceptor for CountingInterceptor {
        async fn bind_rtcp_reader(
            &self,
            reader: Arc<dyn RTCPReader + Send + Sync>,
        ) -> Arc<dyn RTCPReader + Send + Sync> {
            reader
        }

        async fn bind_rtcp_writer(
            &self,
            writer: Arc<dyn RTCPWriter + Send + Sync>,
        ) -> Arc<dyn RTCPWriter + Send + Sync> {
            writer
        }

        async fn bind_local_stream(
            &self,
            _info: &StreamInfo,
            writer: Arc<dyn RTPWriter + Send + Sync>,
        ) -> Arc<dyn RTPWriter + Send + Sync> {
            self.local_binds.fetch_add(1, Ordering::SeqCst);
            Arc::new(CountingWriter {
                next: writer,
                writes: Arc::clone(&self.writes),
            })
        }

        async fn unbind_local_stream(&self, _info: &StreamInfo) {
            self.local_unbinds.fetch_add(1, Ordering::SeqCst);
        }

        async fn bind_remote_stream(
            &self,
            _info: &StreamInfo,
            reader: Arc<dyn RTPReader + Send + Sync>,
        ) -> Arc<dyn RTPReader + Send + Sync> {
            self.remote_binds.fetch_add(1, Ordering::SeqCst);
            reader
        }

        async fn unbind_remote_stream(&self, _info: &StreamInfo) {}

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    struct Sink;

    #[async_trait]
    impl RTPWriter for Sink {
        async fn write(&self, pkt: &rtp::packet::Packet, _a: &Attributes) -> Result<usize> {
            Ok(pkt.payload.len())
        }
    }

    fn sink() -> Arc<dyn RTPWriter + Send + Sync> {
        Arc::new(Sink)
    }

    #[tokio::test]
    async fn test_chain_runs_children_in_order() -> Result<()> {
        let first = Arc::new(CountingInterceptor::default());
        let second = Arc::new(CountingInterceptor::default());
        let chain = Chain::new(vec![first.clone(), second.clone()]);
        assert_eq!(chain.len(), 2);

        let info = StreamInfo {
            ssrc: 5000,
            ..Default::default()
        };
        let writer = chain.bind_local_stream(&info, sink()).await;
        let pkt = rtp::packet::Packet {
            payload: bytes::Bytes::from_static(&[1, 2, 3]),
            ..Default::default()
        };
        assert_eq!(writer.write(&pkt, &Attributes::new()).await?, 3);

        assert_eq!(first.writes.load(Ordering::SeqCst), 1);
        assert_eq!(second.writes.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_chain_bind_is_idempotent_per_ssrc() {
        let counter = Arc::new(CountingInterceptor::default());
        let chain = Chain::new(vec![counter.clone()]);

        let info = StreamInfo {
            ssrc: 1,
            ..Default::default()
        };
        let a = chain.bind_local_stream(&info, sink()).await;
        let b = chain.bind_local_stream(&info, sink()).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(counter.local_binds.load(Ordering::SeqCst), 1);

        chain.unbind_local_stream(&info).await;
        chain.unbind_local_stream(&info).await;
        assert_eq!(counter.local_unbinds.load(Ordering::SeqCst), 1);

        let other = StreamInfo {
            ssrc: 2,
            ..Default::default()
        };
        let _ = chain.bind_local_stream(&other, sink()).await;
        assert_eq!(counter.local_binds.load(Ordering::SeqCst), 2);
    }
}
