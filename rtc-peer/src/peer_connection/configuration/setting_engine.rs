//! Advanced configuration engine for WebRTC peer connections.
//!
//! The `SettingEngine` provides low-level control over transport behavior
//! that is not part of the W3C API: ICE timeouts and credentials, DTLS role
//! and verification, receive MTU, SCTP message size, MID generation and the
//! simulcast probe window.
//!
//! # Examples
//!
//! ## Configuring ICE timeouts for unstable networks
//!
//! ```
//! use rtc_peer::peer_connection::configuration::setting_engine::SettingEngine;
//! use std::time::Duration;
//!
//! let mut setting_engine = SettingEngine::default();
//!
//! // Increase timeouts for mobile or unstable networks
//! setting_engine.set_ice_timeouts(
//!     Some(Duration::from_secs(10)), // disconnected_timeout
//!     Some(Duration::from_secs(30)), // failed_timeout
//!     Some(Duration::from_secs(3)),  // keep_alive_interval
//! );
//! ```
//!
//! ## Enabling detached data channels
//!
//! ```
//! use rtc_peer::peer_connection::configuration::setting_engine::SettingEngine;
//!
//! let mut setting_engine = SettingEngine::default();
//! setting_engine.detach_data_channels();
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::peer_connection::transport::dtls::role::RTCDtlsRole;
use crate::peer_connection::transport::ice::candidate_type::RTCIceCandidateType;
use crate::peer_connection::transport::srtp::SrtpProtectionProfile;
use shared::error::{Error, Result};

/// Equal to UDP MTU
pub(crate) const RECEIVE_MTU: usize = 1460;

/// Number of packets buffered for an SSRC that is not bound to a track yet.
pub(crate) const SIMULCAST_PROBE_COUNT: usize = 50;

/// How long packets of an undeclared SSRC are probed before being dropped.
pub(crate) const SIMULCAST_PROBE_DURATION: Duration = Duration::from_secs(1);

#[derive(Default, Clone)]
pub struct Detach {
    pub data_channels: bool,
}

/// ICE liveness timers, forwarded to the agent. `None` keeps the agent's default.
#[derive(Default, Clone)]
pub struct Timeout {
    pub ice_disconnected_timeout: Option<Duration>,
    pub ice_failed_timeout: Option<Duration>,
    pub ice_keepalive_interval: Option<Duration>,
}

/// ICE candidate and credential configuration handed to the ICE agent.
#[derive(Default, Clone)]
pub struct Candidates {
    pub ice_lite: bool,
    /// Public addresses of a 1:1 NAT in front of this host.
    pub nat_1to1_ips: Vec<String>,
    pub nat_1to1_ip_candidate_type: RTCIceCandidateType,
    /// Fixed ICE credentials; empty means the agent generates them.
    pub username_fragment: String,
    pub password: String,
    pub discard_local_candidates_during_ice_restart: bool,
}

/// Bounds on how long packets of an unknown SSRC are held while its
/// simulcast layer is being identified.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SimulcastProbe {
    pub count: usize,
    pub duration: Duration,
}

impl Default for SimulcastProbe {
    fn default() -> Self {
        SimulcastProbe {
            count: SIMULCAST_PROBE_COUNT,
            duration: SIMULCAST_PROBE_DURATION,
        }
    }
}

/// Maximum message size for SCTP data channels.
///
/// Per [RFC 8841](https://datatracker.ietf.org/doc/html/rfc8841), the default is 64KB.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SctpMaxMessageSize {
    /// Fixed maximum message size in bytes.
    Bounded(u32),

    /// No practical limit (uses MAX_MESSAGE_SIZE internally).
    Unbounded,
}

impl SctpMaxMessageSize {
    /// Default message size per RFC 8841 (64KB).
    pub const DEFAULT_MESSAGE_SIZE: u32 = 65536;

    /// Maximum message size (256KB).
    pub const MAX_MESSAGE_SIZE: u32 = 262144;

    pub fn as_u32(&self) -> u32 {
        match self {
            Self::Bounded(result) => *result,
            Self::Unbounded => Self::MAX_MESSAGE_SIZE,
        }
    }
}

impl Default for SctpMaxMessageSize {
    fn default() -> Self {
        // https://datatracker.ietf.org/doc/html/rfc8841#section-6.1-4
        // > If the SDP "max-message-size" attribute is not present, the default value is 64K.
        Self::Bounded(Self::DEFAULT_MESSAGE_SIZE)
    }
}

/// SettingEngine holds the knobs the W3C API has no place for. It is handed
/// to [`APIBuilder`](crate::api::APIBuilder) and copied into every
/// PeerConnection the resulting API creates.
///
/// ```
/// use rtc_peer::api::APIBuilder;
/// use rtc_peer::peer_connection::configuration::setting_engine::SettingEngine;
///
/// let mut setting_engine = SettingEngine::default();
/// setting_engine.set_lite(true);
///
/// let api = APIBuilder::new().with_setting_engine(setting_engine);
/// ```
#[derive(Default, Clone)]
pub struct SettingEngine {
    pub(crate) detach: Detach,
    pub(crate) timeout: Timeout,
    pub(crate) candidates: Candidates,
    pub(crate) sdp_media_level_fingerprints: bool,
    pub(crate) answering_dtls_role: RTCDtlsRole,
    pub(crate) disable_certificate_fingerprint_verification: bool,
    pub(crate) disable_media_engine_copy: bool,
    pub(crate) srtp_protection_profiles: Vec<SrtpProtectionProfile>,
    pub(crate) receive_mtu: usize,
    pub(crate) mid_generator: Option<Arc<dyn Fn(isize) -> String + Send + Sync>>,
    /// Determines the max size of any message that may be sent through an SCTP transport.
    pub(crate) sctp_max_message_size: SctpMaxMessageSize,
    pub(crate) simulcast_probe: SimulcastProbe,
}

impl SettingEngine {
    /// Returns the configured receive MTU, or the default if not set.
    pub(crate) fn get_receive_mtu(&self) -> usize {
        if self.receive_mtu != 0 {
            self.receive_mtu
        } else {
            RECEIVE_MTU
        }
    }

    /// detach_data_channels switches data channels to raw stream access:
    /// `on_message` stops firing and the application calls `detach` once
    /// the channel is open.
    pub fn detach_data_channels(&mut self) {
        self.detach.data_channels = true;
    }

    /// set_srtp_protection_profiles replaces the profiles offered in the DTLS
    /// handshake, in preference order.
    pub fn set_srtp_protection_profiles(&mut self, profiles: Vec<SrtpProtectionProfile>) {
        self.srtp_protection_profiles = profiles
    }

    /// set_ice_timeouts sets how long the agent waits without traffic before
    /// going Disconnected, then Failed, and how often it sends keepalives.
    pub fn set_ice_timeouts(
        &mut self,
        disconnected_timeout: Option<Duration>,
        failed_timeout: Option<Duration>,
        keep_alive_interval: Option<Duration>,
    ) {
        self.timeout.ice_disconnected_timeout = disconnected_timeout;
        self.timeout.ice_failed_timeout = failed_timeout;
        self.timeout.ice_keepalive_interval = keep_alive_interval;
    }

    /// set_lite makes the agent answer connectivity checks without sending any.
    pub fn set_lite(&mut self, lite: bool) {
        self.candidates.ice_lite = lite;
    }

    /// set_nat_1to1_ips sets a list of external IP addresses of 1:1 (D)NAT
    /// and a candidate type for which the external IP address is used.
    /// The addresses are passed through to the ICE agent unchanged.
    pub fn set_nat_1to1_ips(&mut self, ips: Vec<String>, candidate_type: RTCIceCandidateType) {
        self.candidates.nat_1to1_ips = ips;
        self.candidates.nat_1to1_ip_candidate_type = candidate_type;
    }

    /// set_answering_dtls_role fixes the `a=setup` role written into answers.
    /// Only `Client` (active) and `Server` (passive) are accepted.
    pub fn set_answering_dtls_role(&mut self, role: RTCDtlsRole) -> Result<()> {
        if role != RTCDtlsRole::Client && role != RTCDtlsRole::Server {
            return Err(Error::ErrSettingEngineSetAnsweringDTLSRole);
        }

        self.answering_dtls_role = role;
        Ok(())
    }

    /// set_ice_credentials pins the local ufrag and pwd instead of letting the
    /// agent pick random ones.
    pub fn set_ice_credentials(&mut self, username_fragment: String, password: String) {
        self.candidates.username_fragment = username_fragment;
        self.candidates.password = password;
    }

    /// set_discard_local_candidates_during_ice_restart drops the local
    /// candidates gathered before an ICE restart.
    pub fn set_discard_local_candidates_during_ice_restart(&mut self, discard: bool) {
        self.candidates.discard_local_candidates_during_ice_restart = discard;
    }

    /// disable_certificate_fingerprint_verification skips matching the remote
    /// DTLS certificate against the `a=fingerprint` of the remote description.
    pub fn disable_certificate_fingerprint_verification(&mut self, is_disabled: bool) {
        self.disable_certificate_fingerprint_verification = is_disabled;
    }

    /// set_sdp_media_level_fingerprints writes `a=fingerprint` into every media
    /// section instead of once at session level.
    pub fn set_sdp_media_level_fingerprints(&mut self, sdp_media_level_fingerprints: bool) {
        self.sdp_media_level_fingerprints = sdp_media_level_fingerprints;
    }

    /// disable_media_engine_copy makes every PeerConnection share the API's
    /// MediaEngine, so negotiated codec state leaks between them.
    pub fn disable_media_engine_copy(&mut self, is_disabled: bool) {
        self.disable_media_engine_copy = is_disabled;
    }

    /// set_receive_mtu sizes the buffer incoming packets are read into. Zero
    /// restores the default.
    pub fn set_receive_mtu(&mut self, receive_mtu: usize) {
        self.receive_mtu = receive_mtu;
    }

    /// set_mid_generator sets a custom MID generator. The argument is the
    /// greatest numeric MID seen so far.
    ///
    /// MIDs should be 3 bytes or less for efficient RTP header extension encoding.
    pub fn set_mid_generator(&mut self, f: impl Fn(isize) -> String + Send + Sync + 'static) {
        self.mid_generator = Some(Arc::new(f));
    }

    /// set_sctp_max_message_size sets the largest message that may be sent
    /// through a data channel.
    pub fn set_sctp_max_message_size(&mut self, max_message_size: SctpMaxMessageSize) {
        self.sctp_max_message_size = max_message_size;
    }

    /// set_simulcast_probe bounds how many packets, and for how long, an
    /// unknown SSRC is buffered while it is matched to a simulcast layer.
    pub fn set_simulcast_probe(&mut self, count: usize, duration: Duration) {
        self.simulcast_probe = SimulcastProbe { count, duration };
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_set_answering_dtls_role() {
        let tests = vec![
            (RTCDtlsRole::Auto, false),
            (RTCDtlsRole::Unspecified, false),
            (RTCDtlsRole::Client, true),
            (RTCDtlsRole::Server, true),
        ];

        for (role, ok) in tests {
            let mut s = SettingEngine::default();
            let result = s.set_answering_dtls_role(role);
            assert_eq!(result.is_ok(), ok, "{role}");
            if ok {
                assert_eq!(s.answering_dtls_role, role);
            } else {
                assert_eq!(result, Err(Error::ErrSettingEngineSetAnsweringDTLSRole));
                assert_eq!(s.answering_dtls_role, RTCDtlsRole::Unspecified);
            }
        }
    }

    #[test]
    fn test_set_ice_timeouts() {
        let mut s = SettingEngine::default();
        s.set_ice_timeouts(
            Some(Duration::from_secs(1)),
            Some(Duration::from_secs(2)),
            Some(Duration::from_secs(3)),
        );

        assert_eq!(
            s.timeout.ice_disconnected_timeout,
            Some(Duration::from_secs(1))
        );
        assert_eq!(s.timeout.ice_failed_timeout, Some(Duration::from_secs(2)));
        assert_eq!(
            s.timeout.ice_keepalive_interval,
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn test_receive_mtu_default() {
        let mut s = SettingEngine::default();
        assert_eq!(s.get_receive_mtu(), RECEIVE_MTU);
        s.set_receive_mtu(9000);
        assert_eq!(s.get_receive_mtu(), 9000);
    }

    #[test]
    fn test_sctp_max_message_size() {
        let tests = vec![
            (SctpMaxMessageSize::default(), 65536),
            (SctpMaxMessageSize::Bounded(1024), 1024),
            (SctpMaxMessageSize::Unbounded, SctpMaxMessageSize::MAX_MESSAGE_SIZE),
        ];
        for (size, expected) in tests {
            assert_eq!(size.as_u32(), expected);
        }
    }

    #[test]
    fn test_simulcast_probe_default() {
        let s = SettingEngine::default();
        assert_eq!(s.simulcast_probe.count, 50);
        assert_eq!(s.simulcast_probe.duration, Duration::from_secs(1));
    }
}
