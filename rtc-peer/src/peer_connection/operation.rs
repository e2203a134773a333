use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Notify};

use shared::error::{Error, Result};

/// Operation is a function executed by the operations queue. Returning true
/// puts it back at the end of the queue.
pub(crate) struct Operation(
    pub(crate) Box<dyn (FnMut() -> Pin<Box<dyn Future<Output = bool> + Send + 'static>>) + Send + Sync>,
    pub(crate) &'static str,
);

impl Operation {
    pub(crate) fn new(
        op: impl FnMut() -> Pin<Box<dyn Future<Output = bool> + Send + 'static>> + Send + Sync + 'static,
        description: &'static str,
    ) -> Self {
        Self(Box::new(op), description)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Operation").field(&self.1).finish()
    }
}

/// Operations is a task queue which executes one operation at a time, in
/// the order they were enqueued.
pub(crate) struct Operations {
    length: Arc<AtomicUsize>,
    ops_tx: Arc<mpsc::UnboundedSender<Operation>>,
    closed: Arc<AtomicBool>,
    close_notify: Arc<Notify>,
}

impl Operations {
    /// new spawns the consumer on the current tokio runtime.
    pub(crate) fn new() -> Self {
        let length = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicBool::new(false));
        let close_notify = Arc::new(Notify::new());
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        let ops_tx = Arc::new(ops_tx);

        tokio::spawn(Operations::start(
            Arc::clone(&length),
            Arc::downgrade(&ops_tx),
            ops_rx,
            Arc::clone(&close_notify),
        ));

        Operations {
            length,
            ops_tx,
            closed,
            close_notify,
        }
    }

    /// enqueue adds a new action to be executed. Fails once the queue is closed.
    pub(crate) fn enqueue(&self, op: Operation) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ErrOperationsClosed);
        }
        Operations::enqueue_inner(op, &self.ops_tx, &self.length)
    }

    fn enqueue_inner(
        op: Operation,
        ops_tx: &mpsc::UnboundedSender<Operation>,
        length: &AtomicUsize,
    ) -> Result<()> {
        length.fetch_add(1, Ordering::SeqCst);
        ops_tx.send(op).map_err(|_| {
            length.fetch_sub(1, Ordering::SeqCst);
            Error::ErrOperationsClosed
        })
    }

    /// run enqueues `f` and waits for its result. Must not be called from
    /// inside an operation.
    pub(crate) async fn run<T, F>(&self, description: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let job = util::sync::Mutex::new(Some((f, result_tx)));
        self.enqueue(Operation::new(
            move || {
                let job = job.lock().take();
                Box::pin(async move {
                    if let Some((f, result_tx)) = job {
                        let _ = result_tx.send(f.await);
                    }
                    false
                })
            },
            description,
        ))?;

        result_rx.await.map_err(|_| Error::ErrOperationsClosed)?
    }

    /// is_empty checks if there are tasks in the queue
    pub(crate) fn is_empty(&self) -> bool {
        self.length.load(Ordering::SeqCst) == 0
    }

    pub(crate) fn len(&self) -> usize {
        self.length.load(Ordering::SeqCst)
    }

    /// done blocks until all currently enqueued operations are finished executing.
    pub(crate) async fn done(&self) {
        let (tx, rx) = oneshot::channel::<()>();
        let tx = util::sync::Mutex::new(Some(tx));
        let result = self.enqueue(Operation::new(
            move || {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(());
                }
                Box::pin(async { false })
            },
            "Operations::done",
        ));
        if result.is_err() {
            return;
        }
        let _ = rx.await;
    }

    async fn start(
        length: Arc<AtomicUsize>,
        ops_tx: std::sync::Weak<mpsc::UnboundedSender<Operation>>,
        mut ops_rx: mpsc::UnboundedReceiver<Operation>,
        close_notify: Arc<Notify>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = close_notify.notified() => break,
                result = ops_rx.recv() => {
                    let Some(mut op) = result else {
                        break;
                    };
                    length.fetch_sub(1, Ordering::SeqCst);
                    log::trace!("running operation {}", op.1);
                    if op.0().await {
                        let Some(ops_tx) = ops_tx.upgrade() else {
                            break;
                        };
                        let _ = Operations::enqueue_inner(op, &ops_tx, &length);
                    }
                }
            }
        }

        // dropped operations release whoever waits on their result
        ops_rx.close();
        while ops_rx.try_recv().is_ok() {
            length.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// close stops the consumer. Queued operations are dropped and further
    /// enqueues fail.
    pub(crate) fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.close_notify.notify_one();
        }
    }

    /// graceful_close refuses new operations, waits for the queued ones to
    /// finish and then stops the consumer.
    pub(crate) async fn graceful_close(&self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let (tx, rx) = oneshot::channel::<()>();
        let tx = util::sync::Mutex::new(Some(tx));
        let result = Operations::enqueue_inner(
            Operation::new(
                move || {
                    if let Some(tx) = tx.lock().take() {
                        let _ = tx.send(());
                    }
                    Box::pin(async { false })
                },
                "Operations::graceful_close",
            ),
            &self.ops_tx,
            &self.length,
        );
        self.closed.store(true, Ordering::SeqCst);
        if result.is_ok() {
            let _ = rx.await;
        }
        self.close_notify.notify_one();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for Operations {
    fn drop(&mut self) {
        self.close_notify.notify_one();
    }
}
