use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;

use super::agent::{IceAgent, IceAgentConfig, IceAgentFactory};
use super::candidate::RTCIceCandidate;
use super::gatherer_state::RTCIceGathererState;
use super::parameters::RTCIceParameters;
use super::url::IceUrl;
use crate::peer_connection::configuration::ice_transport_policy::RTCIceTransportPolicy;
use crate::peer_connection::configuration::setting_engine::SettingEngine;
use shared::error::{Error, Result};
use shared::util::rand_ice_char;

const LOCAL_UFRAG_LEN: usize = 16;
const LOCAL_PWD_LEN: usize = 32;

pub type OnLocalCandidateHdlrFn = Box<
    dyn (FnMut(Option<RTCIceCandidate>) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnICEGathererStateChangeHdlrFn = Box<
    dyn (FnMut(RTCIceGathererState) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnGatheringCompleteHdlrFn =
    Box<dyn (FnMut() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

/// ICEGatherOptions provides options relating to the gathering of ICE candidates.
#[derive(Default, Debug, Clone)]
pub struct RTCIceGatherOptions {
    pub ice_servers: Vec<IceUrl>,
    pub ice_gather_policy: RTCIceTransportPolicy,
}

/// ICEGatherer gathers local host, server reflexive and relay
/// candidates, as well as enabling the retrieval of local Interactive
/// Connectivity Establishment (ICE) parameters which can be
/// exchanged in signaling.
pub struct RTCIceGatherer {
    pub(crate) validated_servers: Vec<IceUrl>,
    pub(crate) gather_policy: RTCIceTransportPolicy,
    pub(crate) setting_engine: Arc<SettingEngine>,
    agent_factory: Arc<dyn IceAgentFactory + Send + Sync>,

    pub(crate) state: Arc<AtomicU8>, //ICEGathererState,
    pub(crate) agent: Mutex<Option<Arc<dyn IceAgent + Send + Sync>>>,

    pub(crate) on_local_candidate_handler: Arc<ArcSwapOption<Mutex<OnLocalCandidateHdlrFn>>>,
    pub(crate) on_state_change_handler: Arc<ArcSwapOption<Mutex<OnICEGathererStateChangeHdlrFn>>>,

    // Used for gathering_complete_promise
    pub(crate) on_gathering_complete_handler: Arc<ArcSwapOption<Mutex<OnGatheringCompleteHdlrFn>>>,
}

impl RTCIceGatherer {
    pub(crate) fn new(
        validated_servers: Vec<IceUrl>,
        gather_policy: RTCIceTransportPolicy,
        setting_engine: Arc<SettingEngine>,
        agent_factory: Arc<dyn IceAgentFactory + Send + Sync>,
    ) -> Self {
        RTCIceGatherer {
            gather_policy,
            validated_servers,
            setting_engine,
            agent_factory,
            state: Arc::new(AtomicU8::new(RTCIceGathererState::New as u8)),
            agent: Mutex::new(None),
            on_local_candidate_handler: Arc::new(ArcSwapOption::empty()),
            on_state_change_handler: Arc::new(ArcSwapOption::empty()),
            on_gathering_complete_handler: Arc::new(ArcSwapOption::empty()),
        }
    }

    pub(crate) async fn create_agent(&self) -> Result<()> {
        let mut agent = self.agent.lock().await;
        if agent.is_some() || self.state() != RTCIceGathererState::New {
            return Ok(());
        }

        let candidates = &self.setting_engine.candidates;
        let local_ufrag = if candidates.username_fragment.is_empty() {
            rand_ice_char(LOCAL_UFRAG_LEN)
        } else {
            candidates.username_fragment.clone()
        };
        let local_pwd = if candidates.password.is_empty() {
            rand_ice_char(LOCAL_PWD_LEN)
        } else {
            candidates.password.clone()
        };

        let config = IceAgentConfig {
            local_ufrag,
            local_pwd,
            lite: candidates.ice_lite,
            urls: self.validated_servers.clone(),
            transport_policy: self.gather_policy,
            nat_1to1_ips: candidates.nat_1to1_ips.clone(),
            disconnected_timeout: self.setting_engine.timeout.ice_disconnected_timeout,
            failed_timeout: self.setting_engine.timeout.ice_failed_timeout,
            keepalive_interval: self.setting_engine.timeout.ice_keepalive_interval,
        };

        *agent = Some(self.agent_factory.new_agent(config)?);

        Ok(())
    }

    /// Gather ICE candidates.
    pub async fn gather(&self) -> Result<()> {
        self.create_agent().await?;
        self.set_state(RTCIceGathererState::Gathering).await;

        if let Some(agent) = self.get_agent().await {
            let state = Arc::clone(&self.state);
            let on_local_candidate_handler = Arc::clone(&self.on_local_candidate_handler);
            let on_state_change_handler = Arc::clone(&self.on_state_change_handler);
            let on_gathering_complete_handler = Arc::clone(&self.on_gathering_complete_handler);

            agent.on_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
                let state_clone = Arc::clone(&state);
                let on_local_candidate_handler_clone = Arc::clone(&on_local_candidate_handler);
                let on_state_change_handler_clone = Arc::clone(&on_state_change_handler);
                let on_gathering_complete_handler_clone =
                    Arc::clone(&on_gathering_complete_handler);

                Box::pin(async move {
                    if let Some(cand) = candidate {
                        if let Some(handler) = &*on_local_candidate_handler_clone.load() {
                            let mut f = handler.lock().await;
                            f(Some(cand)).await;
                        }
                    } else {
                        state_clone.store(RTCIceGathererState::Complete as u8, Ordering::SeqCst);

                        if let Some(handler) = &*on_state_change_handler_clone.load() {
                            let mut f = handler.lock().await;
                            f(RTCIceGathererState::Complete).await;
                        }

                        if let Some(handler) = &*on_gathering_complete_handler_clone.load() {
                            let mut f = handler.lock().await;
                            f().await;
                        }

                        if let Some(handler) = &*on_local_candidate_handler_clone.load() {
                            let mut f = handler.lock().await;
                            f(None).await;
                        }
                    }
                })
            }));

            agent.gather_candidates().await?;
        }
        Ok(())
    }

    /// Close prunes all local candidates, and closes the ports.
    pub async fn close(&self) -> Result<()> {
        self.set_state(RTCIceGathererState::Closed).await;

        let agent = {
            let mut agent_opt = self.agent.lock().await;
            agent_opt.take()
        };

        if let Some(agent) = agent {
            agent.close().await?;
        }

        Ok(())
    }

    /// get_local_parameters returns the ICE parameters of the ICEGatherer.
    pub async fn get_local_parameters(&self) -> Result<RTCIceParameters> {
        self.create_agent().await?;

        let (username_fragment, password) = if let Some(agent) = self.get_agent().await {
            agent.local_credentials().await
        } else {
            return Err(Error::ErrICEAgentNotExist);
        };

        Ok(RTCIceParameters {
            username_fragment,
            password,
            ice_lite: self.setting_engine.candidates.ice_lite,
        })
    }

    /// get_local_candidates returns the sequence of valid local candidates associated with the ICEGatherer.
    pub async fn get_local_candidates(&self) -> Result<Vec<RTCIceCandidate>> {
        self.create_agent().await?;

        if let Some(agent) = self.get_agent().await {
            agent.local_candidates().await
        } else {
            Err(Error::ErrICEAgentNotExist)
        }
    }

    /// on_local_candidate sets an event handler which fires when a new local ICE candidate is available
    /// Take note that the handler is gonna be called with a nil pointer when gathering is finished.
    pub fn on_local_candidate(&self, f: OnLocalCandidateHdlrFn) {
        self.on_local_candidate_handler.store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_state_change sets an event handler which fires any time the ICEGatherer changes
    pub fn on_state_change(&self, f: OnICEGathererStateChangeHdlrFn) {
        self.on_state_change_handler.store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_gathering_complete sets an event handler which fires any time the ICEGatherer changes
    pub fn on_gathering_complete(&self, f: OnGatheringCompleteHdlrFn) {
        self.on_gathering_complete_handler
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// State indicates the current state of the ICE gatherer.
    pub fn state(&self) -> RTCIceGathererState {
        self.state.load(Ordering::SeqCst).into()
    }

    pub async fn set_state(&self, s: RTCIceGathererState) {
        self.state.store(s as u8, Ordering::SeqCst);

        if let Some(handler) = &*self.on_state_change_handler.load() {
            let mut f = handler.lock().await;
            f(s).await;
        }
    }

    pub(crate) async fn get_agent(&self) -> Option<Arc<dyn IceAgent + Send + Sync>> {
        let agent = self.agent.lock().await;
        agent.clone()
    }

    /// restart swaps in new local credentials and gathers again.
    pub(crate) async fn restart(&self) -> Result<()> {
        let agent = self.get_agent().await.ok_or(Error::ErrICEAgentNotExist)?;
        let candidates = &self.setting_engine.candidates;
        agent
            .restart(
                candidates.username_fragment.clone(),
                candidates.password.clone(),
            )
            .await?;
        self.state
            .store(RTCIceGathererState::New as u8, Ordering::SeqCst);
        self.gather().await
    }
}
