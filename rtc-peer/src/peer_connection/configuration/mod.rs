//! Standard WebRTC configuration: ICE servers, policies and certificates.

pub mod bundle_policy;
pub mod ice_transport_policy;
pub mod media_engine;
pub mod offer_answer_options;
pub mod rtcp_mux_policy;
pub mod sdp_semantics;
pub mod setting_engine;

use crate::peer_connection::certificate::RTCCertificate;
use crate::peer_connection::transport::ice::server::RTCIceServer;
use crate::peer_connection::transport::ice::url::IceUrl;
use bundle_policy::RTCBundlePolicy;
use ice_transport_policy::RTCIceTransportPolicy;
use rtcp_mux_policy::RTCRtcpMuxPolicy;
use sdp_semantics::RTCSdpSemantics;
use shared::error::Result;

/// Canonical rendering of every enum's unknown variant.
pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";

/// RTCConfiguration is the dictionary handed to `new_peer_connection` and
/// `set_configuration`. Unset policies stay `Unspecified`, which the
/// connection reads as "keep the default".
///
/// An empty certificate list makes the connection generate its own ECDSA
/// certificate; after construction `get_configuration` reports it.
///
/// <https://w3c.github.io/webrtc-pc/#rtcconfiguration-dictionary>
#[derive(Default, Clone)]
pub struct RTCConfiguration {
    pub(crate) ice_servers: Vec<RTCIceServer>,
    pub(crate) ice_transport_policy: RTCIceTransportPolicy,
    pub(crate) bundle_policy: RTCBundlePolicy,
    pub(crate) rtcp_mux_policy: RTCRtcpMuxPolicy,
    /// Fixed for the lifetime of the connection once non-empty.
    pub(crate) peer_identity: String,
    pub(crate) certificates: Vec<RTCCertificate>,
    pub(crate) ice_candidate_pool_size: u8,
    pub(crate) sdp_semantics: RTCSdpSemantics,
}

impl RTCConfiguration {
    pub fn ice_servers(&self) -> &[RTCIceServer] {
        &self.ice_servers
    }

    pub fn ice_transport_policy(&self) -> RTCIceTransportPolicy {
        self.ice_transport_policy
    }

    pub fn bundle_policy(&self) -> RTCBundlePolicy {
        self.bundle_policy
    }

    pub fn rtcp_mux_policy(&self) -> RTCRtcpMuxPolicy {
        self.rtcp_mux_policy
    }

    pub fn peer_identity(&self) -> &str {
        &self.peer_identity
    }

    pub fn certificates(&self) -> &[RTCCertificate] {
        &self.certificates
    }

    pub fn ice_candidate_pool_size(&self) -> u8 {
        self.ice_candidate_pool_size
    }

    pub fn sdp_semantics(&self) -> RTCSdpSemantics {
        self.sdp_semantics
    }

    /// validated_ice_urls parses the URLs of every configured server and
    /// fails on the first malformed URL or credential-less TURN server.
    pub(crate) fn validated_ice_urls(&self) -> Result<Vec<IceUrl>> {
        let mut urls = vec![];
        for server in self.get_ice_servers() {
            urls.extend(server.urls()?);
        }
        Ok(urls)
    }

    /// get_ice_servers returns the servers with any query stripped from
    /// `stun:`/`stuns:` URLs. RFC 7064 forbids one there, but deployed
    /// configurations carry `?transport=udp` anyway.
    pub(crate) fn get_ice_servers(&self) -> Vec<RTCIceServer> {
        self.ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server
                    .urls
                    .iter()
                    .map(|url| match url.split_once('?') {
                        Some((bare, _)) if url.starts_with("stun") => bare.to_owned(),
                        _ => url.clone(),
                    })
                    .collect(),
                ..server.clone()
            })
            .collect()
    }
}

/// RTCConfigurationBuilder assembles an [`RTCConfiguration`] field by field.
#[derive(Default)]
pub struct RTCConfigurationBuilder {
    configuration: RTCConfiguration,
}

impl RTCConfigurationBuilder {
    pub fn new() -> Self {
        RTCConfigurationBuilder::default()
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<RTCIceServer>) -> Self {
        self.configuration.ice_servers = ice_servers;
        self
    }

    pub fn with_ice_transport_policy(
        mut self,
        ice_transport_policy: RTCIceTransportPolicy,
    ) -> Self {
        self.configuration.ice_transport_policy = ice_transport_policy;
        self
    }

    pub fn with_bundle_policy(mut self, bundle_policy: RTCBundlePolicy) -> Self {
        self.configuration.bundle_policy = bundle_policy;
        self
    }

    pub fn with_rtcp_mux_policy(mut self, rtcp_mux_policy: RTCRtcpMuxPolicy) -> Self {
        self.configuration.rtcp_mux_policy = rtcp_mux_policy;
        self
    }

    pub fn with_peer_identity(mut self, peer_identity: String) -> Self {
        self.configuration.peer_identity = peer_identity;
        self
    }

    pub fn with_certificates(mut self, certificates: Vec<RTCCertificate>) -> Self {
        self.configuration.certificates = certificates;
        self
    }

    pub fn with_ice_candidate_pool_size(mut self, ice_candidate_pool_size: u8) -> Self {
        self.configuration.ice_candidate_pool_size = ice_candidate_pool_size;
        self
    }

    pub fn with_sdp_semantics(mut self, sdp_semantics: RTCSdpSemantics) -> Self {
        self.configuration.sdp_semantics = sdp_semantics;
        self
    }

    pub fn build(self) -> RTCConfiguration {
        self.configuration
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::peer_connection::transport::ice::credential_type::RTCIceCredentialType;
    use shared::error::Error;

    fn with_server(server: RTCIceServer) -> RTCConfiguration {
        RTCConfigurationBuilder::new()
            .with_ice_servers(vec![server])
            .build()
    }

    #[test]
    fn test_get_ice_servers_strips_stun_query() {
        let tests = [
            ("stun:stun.example.org:3478", "stun:stun.example.org:3478"),
            (
                "stun:stun.example.org:3478?transport=udp",
                "stun:stun.example.org:3478",
            ),
            (
                "turn:turn.example.org?transport=tcp",
                "turn:turn.example.org?transport=tcp",
            ),
        ];

        for (raw, want) in tests {
            let cfg = with_server(RTCIceServer {
                urls: vec![raw.to_owned()],
                ..Default::default()
            });
            assert_eq!(cfg.get_ice_servers()[0].urls[0], want, "{raw}");
            // the stored configuration is untouched
            assert_eq!(cfg.ice_servers()[0].urls[0], raw);
        }
    }

    #[test]
    fn test_validated_ice_urls() {
        let turn = RTCIceServer {
            urls: vec!["turn:turn.example.org".to_owned()],
            username: "alice".to_owned(),
            credential: "secret".to_owned(),
            credential_type: RTCIceCredentialType::Password,
        };
        let urls = with_server(turn.clone()).validated_ice_urls();
        assert_eq!(urls.map(|u| u.len()), Ok(1));

        let no_credential = RTCIceServer {
            credential: String::new(),
            ..turn
        };
        assert_eq!(
            with_server(no_credential).validated_ice_urls().err(),
            Some(Error::ErrNoTurnCredentials)
        );
    }

    #[test]
    fn test_configuration_defaults() {
        let cfg = RTCConfigurationBuilder::new().build();
        assert_eq!(cfg.sdp_semantics(), RTCSdpSemantics::UnifiedPlan);
        assert_eq!(cfg.bundle_policy(), RTCBundlePolicy::Unspecified);
        assert_eq!(cfg.ice_candidate_pool_size(), 0);
        assert!(cfg.certificates().is_empty());
        assert_eq!(cfg.validated_ice_urls().map(|u| u.len()), Ok(0));
    }
}
