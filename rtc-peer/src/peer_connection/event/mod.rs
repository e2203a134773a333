//! Event fan-out of a PeerConnection.
//!
//! Transports, the operations queue and the RTP demultiplexer never call
//! application handlers themselves. They post an [`RTCPeerConnectionEvent`]
//! to the [`EventDispatcher`], whose single task runs the matching handler.
//! State, candidate and negotiation handlers therefore observe events in the
//! order they were raised and may call back into the PeerConnection without
//! deadlocking it. OnTrack and OnDataChannel handlers commonly loop over the
//! new track or channel, so the dispatcher invokes them in order but runs
//! each returned future on its own task.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinSet;

use crate::data_channel::RTCDataChannel;
use crate::media_stream::track_remote::TrackRemote;
use crate::peer_connection::state::{
    RTCIceConnectionState, RTCIceGatheringState, RTCPeerConnectionState, RTCSignalingState,
};
use crate::peer_connection::transport::RTCIceCandidate;
use crate::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use crate::rtp_transceiver::RTCRtpTransceiver;

pub type OnSignalingStateChangeHdlrFn = Box<
    dyn (FnMut(RTCSignalingState) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnICEConnectionStateChangeHdlrFn = Box<
    dyn (FnMut(RTCIceConnectionState) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnICEGatheringStateChangeHdlrFn = Box<
    dyn (FnMut(RTCIceGatheringState) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnPeerConnectionStateChangeHdlrFn = Box<
    dyn (FnMut(RTCPeerConnectionState) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnICECandidateHdlrFn = Box<
    dyn (FnMut(Option<RTCIceCandidate>) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnDataChannelHdlrFn = Box<
    dyn (FnMut(Arc<RTCDataChannel>) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnTrackHdlrFn = Box<
    dyn (FnMut(
            Arc<TrackRemote>,
            Arc<RTCRtpReceiver>,
            Arc<RTCRtpTransceiver>,
        ) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnNegotiationNeededHdlrFn =
    Box<dyn (FnMut() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

#[allow(clippy::enum_variant_names)]
pub(crate) enum RTCPeerConnectionEvent {
    OnNegotiationNeededEvent,
    OnIceCandidateEvent(Option<RTCIceCandidate>),
    OnSignalingStateChangeEvent(RTCSignalingState),
    OnIceConnectionStateChangeEvent(RTCIceConnectionState),
    OnIceGatheringStateChangeEvent(RTCIceGatheringState),
    OnConnectionStateChangeEvent(RTCPeerConnectionState),
    OnDataChannel(Arc<RTCDataChannel>),
    OnTrack(Arc<TrackRemote>, Arc<RTCRtpReceiver>, Arc<RTCRtpTransceiver>),
    /// Runs no handler; acknowledges that every earlier event was handled.
    Flush,
}

#[derive(Default)]
pub(crate) struct EventHandlers {
    pub(crate) on_signaling_state_change: ArcSwapOption<Mutex<OnSignalingStateChangeHdlrFn>>,
    pub(crate) on_ice_connection_state_change:
        ArcSwapOption<Mutex<OnICEConnectionStateChangeHdlrFn>>,
    pub(crate) on_ice_gathering_state_change:
        ArcSwapOption<Mutex<OnICEGatheringStateChangeHdlrFn>>,
    pub(crate) on_peer_connection_state_change:
        ArcSwapOption<Mutex<OnPeerConnectionStateChangeHdlrFn>>,
    pub(crate) on_ice_candidate: ArcSwapOption<Mutex<OnICECandidateHdlrFn>>,
    pub(crate) on_data_channel: ArcSwapOption<Mutex<OnDataChannelHdlrFn>>,
    pub(crate) on_track: ArcSwapOption<Mutex<OnTrackHdlrFn>>,
    pub(crate) on_negotiation_needed: ArcSwapOption<Mutex<OnNegotiationNeededHdlrFn>>,
}

type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

impl EventHandlers {
    /// handle runs the handler for `event`. OnTrack and OnDataChannel
    /// futures are returned instead of awaited.
    async fn handle(&self, event: RTCPeerConnectionEvent) -> Option<HandlerFuture> {
        match event {
            RTCPeerConnectionEvent::OnNegotiationNeededEvent => {
                if let Some(handler) = &*self.on_negotiation_needed.load() {
                    let mut f = handler.lock().await;
                    f().await;
                }
            }
            RTCPeerConnectionEvent::OnIceCandidateEvent(candidate) => {
                if let Some(handler) = &*self.on_ice_candidate.load() {
                    let mut f = handler.lock().await;
                    f(candidate).await;
                }
            }
            RTCPeerConnectionEvent::OnSignalingStateChangeEvent(state) => {
                if let Some(handler) = &*self.on_signaling_state_change.load() {
                    let mut f = handler.lock().await;
                    f(state).await;
                }
            }
            RTCPeerConnectionEvent::OnIceConnectionStateChangeEvent(state) => {
                if let Some(handler) = &*self.on_ice_connection_state_change.load() {
                    let mut f = handler.lock().await;
                    f(state).await;
                }
            }
            RTCPeerConnectionEvent::OnIceGatheringStateChangeEvent(state) => {
                if let Some(handler) = &*self.on_ice_gathering_state_change.load() {
                    let mut f = handler.lock().await;
                    f(state).await;
                }
            }
            RTCPeerConnectionEvent::OnConnectionStateChangeEvent(state) => {
                if let Some(handler) = &*self.on_peer_connection_state_change.load() {
                    let mut f = handler.lock().await;
                    f(state).await;
                }
            }
            RTCPeerConnectionEvent::OnDataChannel(dc) => {
                if let Some(handler) = &*self.on_data_channel.load() {
                    let mut f = handler.lock().await;
                    return Some(f(dc));
                }
            }
            RTCPeerConnectionEvent::OnTrack(track, receiver, transceiver) => {
                if let Some(handler) = &*self.on_track.load() {
                    let mut f = handler.lock().await;
                    return Some(f(track, receiver, transceiver));
                } else {
                    log::warn!("on_track unset, unable to handle incoming media streams");
                }
            }
            RTCPeerConnectionEvent::Flush => {}
        }
        None
    }
}

type QueuedEvent = (RTCPeerConnectionEvent, Option<oneshot::Sender<()>>);

/// EventDispatcher owns the task that invokes the application handlers.
pub(crate) struct EventDispatcher {
    pub(crate) handlers: Arc<EventHandlers>,
    events_tx: mpsc::UnboundedSender<QueuedEvent>,
    spawned: Arc<std::sync::Mutex<JoinSet<()>>>,
}

impl EventDispatcher {
    /// new spawns the dispatch task on the current tokio runtime.
    pub(crate) fn new() -> Self {
        let handlers = Arc::new(EventHandlers::default());
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<QueuedEvent>();

        let spawned = Arc::new(std::sync::Mutex::new(JoinSet::new()));

        let h = Arc::clone(&handlers);
        let tasks = Arc::clone(&spawned);
        tokio::spawn(async move {
            while let Some((event, done)) = events_rx.recv().await {
                match h.handle(event).await {
                    Some(fut) => {
                        // emit_and_wait callers are released once the spawned handler returns
                        let task = async move {
                            fut.await;
                            if let Some(done) = done {
                                let _ = done.send(());
                            }
                        };
                        match tasks.lock() {
                            Ok(mut tasks) => {
                                while tasks.try_join_next().is_some() {}
                                tasks.spawn(task);
                            }
                            Err(_) => {
                                tokio::spawn(task);
                            }
                        }
                    }
                    None => {
                        if let Some(done) = done {
                            let _ = done.send(());
                        }
                    }
                }
            }
        });

        EventDispatcher {
            handlers,
            events_tx,
            spawned,
        }
    }

    /// emit queues `event` and returns immediately.
    pub(crate) fn emit(&self, event: RTCPeerConnectionEvent) {
        if self.events_tx.send((event, None)).is_err() {
            log::debug!("event dispatcher stopped, dropping event");
        }
    }

    /// emit_and_wait queues `event` and waits until its handler returned.
    /// Must not be called from inside a handler.
    pub(crate) async fn emit_and_wait(&self, event: RTCPeerConnectionEvent) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.events_tx.send((event, Some(done_tx))).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// flush waits until every event emitted so far was handled. Spawned
    /// OnTrack and OnDataChannel handlers are not waited for.
    pub(crate) async fn flush(&self) {
        self.emit_and_wait(RTCPeerConnectionEvent::Flush).await
    }

    /// join_spawned waits until every spawned OnTrack and OnDataChannel
    /// handler returned.
    pub(crate) async fn join_spawned(&self) {
        let mut tasks = match self.spawned.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(_) => return,
        };
        while let Some(result) = tasks.join_next().await {
            if let Err(err) = result {
                log::warn!("event handler task failed: {err}");
            }
        }
    }
}
