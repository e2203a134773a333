//! ICE transport: candidate gathering, connectivity and the packet mux that
//! sits on the selected candidate pair.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::{mpsc, Mutex};
use util::Conn;

use crate::peer_connection::transport::mux::endpoint::Endpoint;
use crate::peer_connection::transport::mux::{Config, Mux};
use candidate::RTCIceCandidate;
use candidate_pair::RTCIceCandidatePair;
use gatherer::RTCIceGatherer;
use parameters::RTCIceParameters;
use role::RTCIceRole;
use shared::error::{Error, Result};
use shared::util::MatchFunc;
use state::RTCIceTransportState;

pub mod agent;
pub mod candidate;
pub mod candidate_pair;
pub mod candidate_type;
pub mod credential_type;
pub mod gatherer;
pub mod gatherer_state;
pub mod parameters;
pub mod protocol;
pub mod role;
pub mod server;
pub mod state;
pub mod url;

pub type OnConnectionStateChangeHdlrFn = Box<
    dyn (FnMut(RTCIceTransportState) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnSelectedCandidatePairChangeHdlrFn = Box<
    dyn (FnMut(RTCIceCandidatePair) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

#[derive(Default)]
struct ICETransportInternal {
    role: RTCIceRole,
    conn: Option<Arc<dyn Conn + Send + Sync>>,
    mux: Option<Mux>,
    cancel_tx: Option<mpsc::Sender<()>>,
}

/// ICETransport allows an application access to information about the ICE
/// transport over which packets are sent and received.
pub struct RTCIceTransport {
    gatherer: Arc<RTCIceGatherer>,
    on_connection_state_change_handler: Arc<ArcSwapOption<Mutex<OnConnectionStateChangeHdlrFn>>>,
    on_selected_candidate_pair_change_handler:
        Arc<ArcSwapOption<Mutex<OnSelectedCandidatePairChangeHdlrFn>>>,
    state: Arc<AtomicU8>, // RTCIceTransportState
    internal: Mutex<ICETransportInternal>,
}

impl RTCIceTransport {
    /// creates a new new_ice_transport.
    pub(crate) fn new(gatherer: Arc<RTCIceGatherer>) -> Self {
        RTCIceTransport {
            gatherer,
            on_connection_state_change_handler: Arc::new(ArcSwapOption::empty()),
            on_selected_candidate_pair_change_handler: Arc::new(ArcSwapOption::empty()),
            state: Arc::new(AtomicU8::new(RTCIceTransportState::New as u8)),
            internal: Mutex::new(ICETransportInternal::default()),
        }
    }

    /// get_selected_candidate_pair returns the selected candidate pair on which packets are sent
    /// if there is no selected pair nil is returned
    pub async fn get_selected_candidate_pair(&self) -> Option<RTCIceCandidatePair> {
        if let Some(agent) = self.gatherer.get_agent().await {
            agent.selected_candidate_pair().await
        } else {
            None
        }
    }

    /// Start incoming connectivity checks based on its configured role.
    pub async fn start(&self, params: &RTCIceParameters, role: Option<RTCIceRole>) -> Result<()> {
        if self.state() != RTCIceTransportState::New {
            return Err(Error::ErrICETransportNotInNew);
        }

        self.ensure_gatherer().await?;

        let agent = self
            .gatherer
            .get_agent()
            .await
            .ok_or(Error::ErrICEAgentNotExist)?;

        let state = Arc::clone(&self.state);
        let on_connection_state_change_handler =
            Arc::clone(&self.on_connection_state_change_handler);
        agent.on_connection_state_change(Box::new(move |s: RTCIceTransportState| {
            let on_connection_state_change_handler_clone =
                Arc::clone(&on_connection_state_change_handler);
            state.store(s as u8, Ordering::SeqCst);
            Box::pin(async move {
                if let Some(handler) = &*on_connection_state_change_handler_clone.load() {
                    let mut f = handler.lock().await;
                    f(s).await;
                }
            })
        }));

        let on_selected_candidate_pair_change_handler =
            Arc::clone(&self.on_selected_candidate_pair_change_handler);
        agent.on_selected_candidate_pair_change(Box::new(move |pair: RTCIceCandidatePair| {
            let on_selected_candidate_pair_change_handler_clone =
                Arc::clone(&on_selected_candidate_pair_change_handler);
            Box::pin(async move {
                if let Some(handler) = &*on_selected_candidate_pair_change_handler_clone.load() {
                    let mut f = handler.lock().await;
                    f(pair).await;
                }
            })
        }));

        let role = role.unwrap_or(RTCIceRole::Controlled);

        let (cancel_tx, mut cancel_rx) = mpsc::channel(1);
        {
            let mut internal = self.internal.lock().await;
            internal.role = role;
            internal.cancel_tx = Some(cancel_tx);
        }

        let ufrag = params.username_fragment.clone();
        let pwd = params.password.clone();
        let connect = async {
            match role {
                RTCIceRole::Controlling => agent.dial(ufrag, pwd).await,
                RTCIceRole::Controlled => agent.accept(ufrag, pwd).await,
                _ => Err(Error::ErrICERoleUnknown),
            }
        };
        let conn: Arc<dyn Conn + Send + Sync> = tokio::select! {
            result = connect => result?,
            _ = cancel_rx.recv() => return Err(Error::ErrICEConnectionFailed("ICE start cancelled".to_owned())),
        };

        let config = Config {
            conn: Arc::clone(&conn),
            buffer_size: self.gatherer.setting_engine.get_receive_mtu(),
        };

        {
            let mut internal = self.internal.lock().await;
            internal.conn = Some(conn);
            internal.mux = Some(Mux::new(config));
        }

        Ok(())
    }

    /// restart is not exposed currently because ORTC has users create a whole new ICETransport
    /// so for now lets keep it private so we don't cause ORTC users to depend on non-standard APIs
    pub(crate) async fn restart(&self) -> Result<()> {
        self.gatherer.restart().await
    }

    /// Stop irreversibly stops the ICETransport.
    pub async fn stop(&self) -> Result<()> {
        self.set_state(RTCIceTransportState::Closed);

        let mut errs: Vec<Error> = vec![];
        {
            let mut internal = self.internal.lock().await;
            internal.cancel_tx.take();
            if let Some(mux) = internal.mux.take() {
                mux.close().await;
            }
            if let Some(conn) = internal.conn.take() {
                if let Err(err) = conn.close().await {
                    errs.push(err.into());
                }
            }
        }

        if let Err(err) = self.gatherer.close().await {
            errs.push(err);
        }

        shared::error::flatten_errs(errs)
    }

    /// on_selected_candidate_pair_change sets a handler that is invoked when a new
    /// ICE candidate pair is selected
    pub fn on_selected_candidate_pair_change(&self, f: OnSelectedCandidatePairChangeHdlrFn) {
        self.on_selected_candidate_pair_change_handler
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_connection_state_change sets a handler that is fired when the ICE
    /// connection state changes.
    pub fn on_connection_state_change(&self, f: OnConnectionStateChangeHdlrFn) {
        self.on_connection_state_change_handler
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// Role indicates the current role of the ICE transport.
    pub async fn role(&self) -> RTCIceRole {
        let internal = self.internal.lock().await;
        internal.role
    }

    pub(crate) async fn set_role(&self, role: RTCIceRole) {
        let mut internal = self.internal.lock().await;
        internal.role = role;
    }

    /// set_remote_candidates sets the sequence of candidates associated with the remote ICETransport.
    pub async fn set_remote_candidates(&self, remote_candidates: &[RTCIceCandidate]) -> Result<()> {
        self.ensure_gatherer().await?;

        let agent = self
            .gatherer
            .get_agent()
            .await
            .ok_or(Error::ErrICEAgentNotExist)?;
        for rc in remote_candidates {
            agent.add_remote_candidate(rc).await?;
        }
        Ok(())
    }

    /// adds a candidate associated with the remote ICETransport.
    pub async fn add_remote_candidate(
        &self,
        remote_candidate: Option<RTCIceCandidate>,
    ) -> Result<()> {
        self.ensure_gatherer().await?;

        let agent = self
            .gatherer
            .get_agent()
            .await
            .ok_or(Error::ErrICEAgentNotExist)?;
        if let Some(r) = remote_candidate {
            agent.add_remote_candidate(&r).await?;
        }

        Ok(())
    }

    /// State returns the current ice transport state.
    pub fn state(&self) -> RTCIceTransportState {
        RTCIceTransportState::from(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set_state(&self, s: RTCIceTransportState) {
        self.state.store(s as u8, Ordering::SeqCst)
    }

    pub(crate) fn gatherer(&self) -> &Arc<RTCIceGatherer> {
        &self.gatherer
    }

    pub(crate) async fn new_endpoint(&self, f: MatchFunc) -> Option<Arc<Endpoint>> {
        let internal = self.internal.lock().await;
        if let Some(mux) = &internal.mux {
            Some(mux.new_endpoint(f).await)
        } else {
            None
        }
    }

    pub(crate) async fn ensure_gatherer(&self) -> Result<()> {
        if self.gatherer.get_agent().await.is_none() {
            self.gatherer.create_agent().await
        } else {
            Ok(())
        }
    }

    pub(crate) async fn set_remote_credentials(
        &self,
        new_ufrag: String,
        new_pwd: String,
    ) -> Result<()> {
        if new_ufrag.is_empty() {
            return Err(Error::ErrRemoteUfragEmpty);
        } else if new_pwd.is_empty() {
            return Err(Error::ErrRemotePwdEmpty);
        }

        let agent = self
            .gatherer
            .get_agent()
            .await
            .ok_or(Error::ErrICEAgentNotExist)?;
        agent.set_remote_credentials(new_ufrag, new_pwd).await
    }
}
