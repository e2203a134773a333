use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use util::Conn;

use super::candidate::RTCIceCandidate;
use super::candidate_pair::RTCIceCandidatePair;
use super::state::RTCIceTransportState;
use super::url::IceUrl;
use crate::peer_connection::configuration::ice_transport_policy::RTCIceTransportPolicy;
use shared::error::Result;

pub type OnAgentCandidateHdlrFn = Box<
    dyn (FnMut(Option<RTCIceCandidate>) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnAgentConnectionStateChangeHdlrFn = Box<
    dyn (FnMut(RTCIceTransportState) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnAgentSelectedCandidatePairChangeHdlrFn = Box<
    dyn (FnMut(RTCIceCandidatePair) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

/// IceAgentConfig collects the options an ICE agent is created with.
#[derive(Default, Debug, Clone)]
pub struct IceAgentConfig {
    pub local_ufrag: String,
    pub local_pwd: String,
    pub lite: bool,
    pub urls: Vec<IceUrl>,
    pub transport_policy: RTCIceTransportPolicy,
    pub nat_1to1_ips: Vec<String>,
    pub disconnected_timeout: Option<Duration>,
    pub failed_timeout: Option<Duration>,
    pub keepalive_interval: Option<Duration>,
}

/// IceAgent is the connectivity engine behind an [`RTCIceTransport`](super::RTCIceTransport).
///
/// It gathers candidates, runs connectivity checks and, once a pair is
/// selected, exposes it as a [`Conn`] carrying everything that is not STUN.
#[async_trait]
pub trait IceAgent {
    /// on_candidate sets a handler that is fired when new candidates are
    /// gathered. When gathering is finished the handler is called with `None`.
    fn on_candidate(&self, f: OnAgentCandidateHdlrFn);

    fn on_connection_state_change(&self, f: OnAgentConnectionStateChangeHdlrFn);

    fn on_selected_candidate_pair_change(&self, f: OnAgentSelectedCandidatePairChangeHdlrFn);

    async fn gather_candidates(&self) -> Result<()>;

    async fn local_candidates(&self) -> Result<Vec<RTCIceCandidate>>;

    /// Current local ufrag and pwd. They change on restart.
    async fn local_credentials(&self) -> (String, String);

    async fn set_remote_credentials(&self, remote_ufrag: String, remote_pwd: String) -> Result<()>;

    async fn add_remote_candidate(&self, candidate: &RTCIceCandidate) -> Result<()>;

    /// dial connects as the controlling agent.
    async fn dial(&self, remote_ufrag: String, remote_pwd: String)
        -> Result<Arc<dyn Conn + Send + Sync>>;

    /// accept connects as the controlled agent.
    async fn accept(
        &self,
        remote_ufrag: String,
        remote_pwd: String,
    ) -> Result<Arc<dyn Conn + Send + Sync>>;

    async fn selected_candidate_pair(&self) -> Option<RTCIceCandidatePair>;

    /// restart replaces the local credentials and drops the gathered candidates.
    /// Empty strings ask the agent to generate fresh credentials.
    async fn restart(&self, ufrag: String, pwd: String) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// IceAgentFactory creates one agent per ICE gatherer.
pub trait IceAgentFactory {
    fn new_agent(&self, config: IceAgentConfig) -> Result<Arc<dyn IceAgent + Send + Sync>>;
}
