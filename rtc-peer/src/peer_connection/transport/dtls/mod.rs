//! DTLS transport: role resolution, handshake orchestration, fingerprint
//! validation and derivation of the SRTP/SRTCP sessions.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use tokio::sync::{watch, Mutex};
use util::Conn;

use crate::peer_connection::certificate::RTCCertificate;
use crate::peer_connection::configuration::setting_engine::SettingEngine;
use crate::peer_connection::transport::ice::role::RTCIceRole;
use crate::peer_connection::transport::ice::RTCIceTransport;
use crate::peer_connection::transport::mux::endpoint::Endpoint;
use crate::peer_connection::transport::srtp::{
    default_srtp_protection_profiles, Session, SessionKeys, SrtpContextFactory,
    SrtpProtectionProfile,
};
use fingerprint::RTCDtlsFingerprint;
use handshaker::{DtlsConn, DtlsHandshakeConfig, DtlsHandshakeRole, DtlsHandshaker};
use parameters::DTLSParameters;
use role::{RTCDtlsRole, DEFAULT_DTLS_ROLE_ANSWER};
use shared::error::{flatten_errs, Error, Result};
use shared::util::{match_dtls, match_srtcp, match_srtp};
use state::RTCDtlsTransportState;

pub mod fingerprint;
pub mod handshaker;
pub mod parameters;
pub mod role;
pub mod state;

pub type OnDTLSTransportStateChangeHdlrFn = Box<
    dyn (FnMut(RTCDtlsTransportState) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

/// DTLSTransport allows an application access to information about the DTLS
/// transport over which RTP and RTCP packets are sent and received by
/// RTPSender and RTPReceiver, as well other data such as SCTP packets sent
/// and received by data channels.
pub struct RTCDtlsTransport {
    pub(crate) ice_transport: Arc<RTCIceTransport>,
    pub(crate) certificates: Vec<RTCCertificate>,
    pub(crate) setting_engine: Arc<SettingEngine>,
    handshaker: Arc<dyn DtlsHandshaker + Send + Sync>,
    srtp_factory: Arc<dyn SrtpContextFactory + Send + Sync>,

    pub(crate) remote_parameters: Mutex<DTLSParameters>,
    pub(crate) remote_certificate: Mutex<Bytes>,
    pub(crate) state: AtomicU8, //DTLSTransportState
    pub(crate) srtp_protection_profile: Mutex<SrtpProtectionProfile>,
    pub(crate) on_state_change_handler: ArcSwapOption<Mutex<OnDTLSTransportStateChangeHdlrFn>>,
    pub(crate) conn: Mutex<Option<Arc<dyn DtlsConn + Send + Sync>>>,

    pub(crate) srtp_session: Mutex<Option<Arc<Session>>>,
    pub(crate) srtcp_session: Mutex<Option<Arc<Session>>>,
    pub(crate) srtp_endpoint: Mutex<Option<Arc<Endpoint>>>,
    pub(crate) srtcp_endpoint: Mutex<Option<Arc<Endpoint>>>,

    srtp_ready_tx: watch::Sender<bool>,
}

impl RTCDtlsTransport {
    pub(crate) fn new(
        ice_transport: Arc<RTCIceTransport>,
        certificates: Vec<RTCCertificate>,
        setting_engine: Arc<SettingEngine>,
        handshaker: Arc<dyn DtlsHandshaker + Send + Sync>,
        srtp_factory: Arc<dyn SrtpContextFactory + Send + Sync>,
    ) -> Self {
        let (srtp_ready_tx, _) = watch::channel(false);
        RTCDtlsTransport {
            ice_transport,
            certificates,
            setting_engine,
            handshaker,
            srtp_factory,
            remote_parameters: Mutex::new(DTLSParameters::default()),
            remote_certificate: Mutex::new(Bytes::new()),
            state: AtomicU8::new(RTCDtlsTransportState::New as u8),
            srtp_protection_profile: Mutex::new(SrtpProtectionProfile::default()),
            on_state_change_handler: ArcSwapOption::empty(),
            conn: Mutex::new(None),
            srtp_session: Mutex::new(None),
            srtcp_session: Mutex::new(None),
            srtp_endpoint: Mutex::new(None),
            srtcp_endpoint: Mutex::new(None),
            srtp_ready_tx,
        }
    }

    /// returns the currently-configured ICETransport or None
    /// if one has not been configured
    pub fn ice_transport(&self) -> &RTCIceTransport {
        &self.ice_transport
    }

    /// state_change requires the caller holds the lock
    async fn state_change(&self, state: RTCDtlsTransportState) {
        self.state.store(state as u8, Ordering::SeqCst);
        log::debug!("dtls transport state changed to {state}");
        if let Some(handler) = &*self.on_state_change_handler.load() {
            let mut f = handler.lock().await;
            f(state).await;
        }
    }

    /// on_state_change sets a handler that is fired when the DTLS
    /// connection state changes.
    pub fn on_state_change(&self, f: OnDTLSTransportStateChangeHdlrFn) {
        self.on_state_change_handler
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// state returns the current dtls_transport transport state.
    pub fn state(&self) -> RTCDtlsTransportState {
        self.state.load(Ordering::SeqCst).into()
    }

    /// write_rtcp sends a user provided RTCP packet to the connected peer. If no peer is connected the
    /// packet is discarded.
    pub async fn write_rtcp(
        &self,
        pkts: &[Box<dyn rtcp::packet::Packet + Send + Sync>],
    ) -> Result<usize> {
        let srtcp_session = self.srtcp_session.lock().await;
        if let Some(srtcp_session) = &*srtcp_session {
            srtcp_session.write_rtcp(pkts).await
        } else {
            Ok(0)
        }
    }

    /// get_local_parameters returns the DTLS parameters of the local DTLSTransport upon construction.
    pub fn get_local_parameters(&self) -> Result<DTLSParameters> {
        let mut fingerprints = vec![];

        for c in &self.certificates {
            fingerprints.extend(c.get_fingerprints());
        }

        Ok(DTLSParameters {
            role: RTCDtlsRole::Auto, // always returns the default role
            fingerprints,
        })
    }

    /// get_remote_certificate returns the certificate chain in use by the remote side
    /// returns an empty list prior to selection of the remote certificate
    pub async fn get_remote_certificate(&self) -> Bytes {
        let remote_certificate = self.remote_certificate.lock().await;
        remote_certificate.clone()
    }

    pub(crate) async fn start_srtp(&self) -> Result<()> {
        let profile = {
            let srtp_protection_profile = self.srtp_protection_profile.lock().await;
            *srtp_protection_profile
        };

        let conn = self.conn().await.ok_or(Error::ErrDtlsTransportNotStarted)?;
        let material = conn
            .srtp_keying_material(profile.keying_material_len())
            .await
            .map_err(|_| Error::ErrDtlsKeyExtractionFailed)?;
        let is_client = self.role().await == RTCDtlsRole::Client;
        let keys = SessionKeys::from_keying_material(profile, &material, is_client)?;

        let new_session = |endpoint: &Option<Arc<Endpoint>>, is_rtp: bool| -> Result<Option<Arc<Session>>> {
            let Some(endpoint) = endpoint else {
                return Ok(None);
            };
            let local = self.srtp_factory.new_context(
                profile,
                &keys.local_master_key,
                &keys.local_master_salt,
            )?;
            let remote = self.srtp_factory.new_context(
                profile,
                &keys.remote_master_key,
                &keys.remote_master_salt,
            )?;
            Ok(Some(Arc::new(Session::new(
                Arc::clone(endpoint) as Arc<dyn Conn + Send + Sync>,
                local,
                remote,
                is_rtp,
            ))))
        };

        {
            let endpoint = self.srtp_endpoint.lock().await;
            let session = new_session(&endpoint, true).map_err(|err| {
                log::warn!("failed to start srtp session: {err}");
                Error::ErrFailedToStartSRTP
            })?;
            *self.srtp_session.lock().await = session;
        }
        {
            let endpoint = self.srtcp_endpoint.lock().await;
            let session = new_session(&endpoint, false).map_err(|err| {
                log::warn!("failed to start srtcp session: {err}");
                Error::ErrFailedToStartSRTP
            })?;
            *self.srtcp_session.lock().await = session;
        }

        self.srtp_ready_tx.send_replace(true);

        Ok(())
    }

    /// wait_srtp_ready resolves once the SRTP sessions exist.
    pub(crate) async fn wait_srtp_ready(&self) -> Result<()> {
        let mut rx = self.srtp_ready_tx.subscribe();
        rx.wait_for(|ready| *ready)
            .await
            .map_err(|_| Error::ErrDtlsTransportNotStarted)?;
        Ok(())
    }

    pub(crate) fn is_srtp_ready(&self) -> bool {
        *self.srtp_ready_tx.borrow()
    }

    pub(crate) async fn get_srtp_session(&self) -> Option<Arc<Session>> {
        let srtp_session = self.srtp_session.lock().await;
        srtp_session.clone()
    }

    pub(crate) async fn get_srtcp_session(&self) -> Option<Arc<Session>> {
        let srtcp_session = self.srtcp_session.lock().await;
        srtcp_session.clone()
    }

    /// conn returns the established DTLS connection, if the handshake finished.
    pub(crate) async fn conn(&self) -> Option<Arc<dyn DtlsConn + Send + Sync>> {
        let conn = self.conn.lock().await;
        conn.clone()
    }

    pub(crate) async fn role(&self) -> RTCDtlsRole {
        // If remote has an explicit role use the inverse
        {
            let remote_parameters = self.remote_parameters.lock().await;
            match remote_parameters.role {
                RTCDtlsRole::Client | RTCDtlsRole::Server => {
                    return remote_parameters.role.invert()
                }
                _ => {}
            };
        }

        // If SettingEngine has an explicit role
        match self.setting_engine.answering_dtls_role {
            RTCDtlsRole::Server => return RTCDtlsRole::Server,
            RTCDtlsRole::Client => return RTCDtlsRole::Client,
            _ => {}
        };

        // Remote was auto and no explicit role was configured via SettingEngine
        if self.ice_transport.role().await == RTCIceRole::Controlling {
            return RTCDtlsRole::Server;
        }

        DEFAULT_DTLS_ROLE_ANSWER
    }

    async fn prepare_transport(
        &self,
        remote_parameters: DTLSParameters,
    ) -> Result<DtlsHandshakeConfig> {
        if self.state() != RTCDtlsTransportState::New {
            return Err(Error::ErrInvalidDTLSStart);
        }

        let certificate = if let Some(cert) = self.certificates.first() {
            if cert.is_expired() {
                return Err(Error::ErrCertificateExpired);
            }
            cert.dtls_certificate().clone()
        } else {
            return Err(Error::ErrNonCertificate);
        };

        {
            let mut srtp_endpoint = self.srtp_endpoint.lock().await;
            *srtp_endpoint = self.ice_transport.new_endpoint(match_srtp).await;
        }
        {
            let mut srtcp_endpoint = self.srtcp_endpoint.lock().await;
            *srtcp_endpoint = self
                .ice_transport
                .new_endpoint(match_srtcp)
                .await;
        }
        {
            let mut rp = self.remote_parameters.lock().await;
            *rp = remote_parameters;
        }

        self.state_change(RTCDtlsTransportState::Connecting).await;

        let role = if self.role().await == RTCDtlsRole::Client {
            DtlsHandshakeRole::Client
        } else {
            DtlsHandshakeRole::Server
        };

        Ok(DtlsHandshakeConfig {
            role,
            certificate,
            srtp_protection_profiles: if !self.setting_engine.srtp_protection_profiles.is_empty()
            {
                self.setting_engine.srtp_protection_profiles.clone()
            } else {
                default_srtp_protection_profiles()
            },
        })
    }

    /// start DTLS transport negotiation with the parameters of the remote DTLS transport
    pub async fn start(&self, remote_parameters: DTLSParameters) -> Result<()> {
        let dtls_endpoint = self
            .ice_transport
            .new_endpoint(match_dtls)
            .await
            .ok_or(Error::ErrICEConnectionNotStarted)?;
        let config = self.prepare_transport(remote_parameters).await?;
        log::debug!("starting dtls handshake as {:?}", config.role);

        // the handshake blocks; no transport lock may be held here
        let dtls_conn = match self
            .handshaker
            .handshake(dtls_endpoint as Arc<dyn Conn + Send + Sync>, config)
            .await
        {
            Ok(dtls_conn) => dtls_conn,
            Err(err) => {
                self.state_change(RTCDtlsTransportState::Failed).await;
                return Err(err);
            }
        };

        match dtls_conn.selected_srtp_protection_profile() {
            Some(profile) => {
                let mut srtp_protection_profile = self.srtp_protection_profile.lock().await;
                *srtp_protection_profile = profile;
            }
            None => {
                if let Err(err) = dtls_conn.close().await {
                    log::error!("{err}");
                }

                self.state_change(RTCDtlsTransportState::Failed).await;
                return Err(Error::ErrNoSRTPProtectionProfile);
            }
        }

        // Check the fingerprint if a certificate was exchanged
        let remote_certs = dtls_conn.remote_certificates();
        if remote_certs.is_empty() {
            if let Err(err) = dtls_conn.close().await {
                log::error!("{err}");
            }

            self.state_change(RTCDtlsTransportState::Failed).await;
            return Err(Error::ErrNoRemoteCertificate);
        }

        {
            let mut remote_certificate = self.remote_certificate.lock().await;
            *remote_certificate = Bytes::from(remote_certs[0].clone());
        }

        if !self
            .setting_engine
            .disable_certificate_fingerprint_verification
        {
            if let Err(err) = self.validate_fingerprint(&remote_certs[0]).await {
                if let Err(close_err) = dtls_conn.close().await {
                    log::error!("{close_err}");
                }

                self.state_change(RTCDtlsTransportState::Failed).await;
                return Err(err);
            }
        }

        {
            let mut conn = self.conn.lock().await;
            *conn = Some(dtls_conn);
        }
        self.state_change(RTCDtlsTransportState::Connected).await;

        self.start_srtp().await
    }

    /// stops and closes the DTLSTransport object.
    pub async fn stop(&self) -> Result<()> {
        // Try closing everything and collect the errors
        let mut close_errs: Vec<Error> = vec![];

        if let Some(srtp_session) = self.srtp_session.lock().await.take() {
            if let Err(err) = srtp_session.close().await {
                close_errs.push(err);
            }
        }

        if let Some(srtcp_session) = self.srtcp_session.lock().await.take() {
            if let Err(err) = srtcp_session.close().await {
                close_errs.push(err);
            }
        }

        if let Some(conn) = self.conn.lock().await.take() {
            // dtls_transport connection may be closed on sctp close.
            match conn.close().await {
                Ok(_) => {}
                Err(err) => {
                    if err.to_string() != util::Error::ErrAlreadyClosed.to_string() {
                        close_errs.push(err.into());
                    }
                }
            }
        }

        self.state_change(RTCDtlsTransportState::Closed).await;

        flatten_errs(close_errs)
    }

    pub(crate) async fn validate_fingerprint(&self, remote_cert: &[u8]) -> Result<()> {
        let remote_parameters = self.remote_parameters.lock().await;
        validate_fingerprints(&remote_parameters.fingerprints, remote_cert)
    }
}

/// validate_fingerprints succeeds when any advertised fingerprint matches the certificate.
pub(crate) fn validate_fingerprints(
    fingerprints: &[RTCDtlsFingerprint],
    remote_cert: &[u8],
) -> Result<()> {
    for fp in fingerprints {
        match fp.matches(remote_cert) {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(err) => log::debug!("skipping fingerprint {}: {err}", fp.algorithm),
        }
    }

    Err(Error::ErrNoMatchingCertificateFingerprint)
}
