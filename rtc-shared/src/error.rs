#![allow(dead_code)]

use std::fmt;
use std::io;
use std::net;
use std::num::ParseIntError;
use std::string::FromUtf8Error;
use std::time::SystemTimeError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// RTCErrorKind is the closed set of error classes surfaced by the WebRTC API.
///
/// ## Specifications
///
/// * [W3C](https://www.w3.org/TR/webrtc/#rtcerror-interface)
/// * [WebIDL](https://webidl.spec.whatwg.org/#idl-DOMException-error-names)
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RTCErrorKind {
    #[default]
    Unknown,
    /// The object is in a state that forbids the operation.
    InvalidState,
    /// The operation tried to change a read-only or monotonic value.
    InvalidModification,
    /// The arguments are malformed or insufficient.
    InvalidAccess,
    /// The operation or argument is not supported.
    NotSupported,
    /// A session description could not be parsed or is inconsistent.
    ParseError,
    /// An ICE, DTLS, SRTP or SCTP transport failed.
    Transport,
    /// A read deadline expired. Retryable.
    Timeout,
    /// The connection, channel or transceiver is closed.
    Closed,
}

impl fmt::Display for RTCErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCErrorKind::Unknown => "UnknownError",
            RTCErrorKind::InvalidState => "InvalidStateError",
            RTCErrorKind::InvalidModification => "InvalidModificationError",
            RTCErrorKind::InvalidAccess => "InvalidAccessError",
            RTCErrorKind::NotSupported => "NotSupportedError",
            RTCErrorKind::ParseError => "SyntaxError",
            RTCErrorKind::Transport => "OperationError",
            RTCErrorKind::Timeout => "TimeoutError",
            RTCErrorKind::Closed => "ClosedError",
        };
        write!(f, "{s}")
    }
}

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("buffer: full")]
    ErrBufferFull,
    #[error("buffer: short")]
    ErrBufferShort,
    #[error("i/o timeout")]
    ErrTimeout,
    #[error("Io EOF")]
    ErrEof,

    /// ErrConnectionClosed indicates an operation executed after connection
    /// has already been closed.
    #[error("connection closed")]
    ErrConnectionClosed,

    /// ErrClosedPipe indicates a write on a data channel that is not open.
    #[error("io: read/write on closed pipe")]
    ErrClosedPipe,

    /// ErrCertificateExpired indicates that an x509 certificate has expired.
    #[error("x509Cert expired")]
    ErrCertificateExpired,

    /// ErrNoTurnCredentials indicates that a TURN server URL was provided
    /// without required credentials.
    #[error("turn server credentials required")]
    ErrNoTurnCredentials,

    /// ErrPrivateKeyType indicates that a particular private key encryption
    /// chosen to generate a certificate is not supported.
    #[error("private key type not supported")]
    ErrPrivateKeyType,

    #[error("peerIdentity cannot be modified")]
    ErrModifyingPeerIdentity,
    #[error("certificates cannot be modified")]
    ErrModifyingCertificates,
    #[error("no certificate")]
    ErrNonCertificate,
    #[error("bundle policy cannot be modified")]
    ErrModifyingBundlePolicy,
    #[error("rtcp mux policy cannot be modified")]
    ErrModifyingRTCPMuxPolicy,
    #[error("ice candidate pool size cannot be modified")]
    ErrModifyingICECandidatePoolSize,

    /// ErrStringSizeLimit indicates that the character size limit of string is
    /// exceeded. The limit is hardcoded to 65535 according to specifications.
    #[error("data channel label exceeds size limit")]
    ErrStringSizeLimit,

    /// ErrRetransmitsOrPacketLifeTime indicates that an attempt to create a data
    /// channel was made with both options max_packet_life_time and max_retransmits
    /// set together.
    #[error("both max_packet_life_time and max_retransmits was set")]
    ErrRetransmitsOrPacketLifeTime,

    #[error("data channel id is already in use")]
    ErrDataChannelIdInUse,
    #[error("Max Data Channel ID")]
    ErrMaxDataChannelID,
    #[error("Unknown MessageType {0}")]
    InvalidMessageType(u8),
    #[error("Unknown ChannelType {0}")]
    InvalidChannelType(u8),
    #[error("Unknown PayloadProtocolIdentifier {0}")]
    InvalidPayloadProtocolIdentifier(u32),
    #[error("enable detaching by calling SettingEngine::detach_data_channels()")]
    ErrDetachNotEnabled,
    #[error("datachannel not opened yet, try calling Detach from OnOpen")]
    ErrDetachBeforeOpened,
    #[error("outbound packet larger than maximum message size")]
    ErrOutboundPacketTooLarge,

    /// ErrCodecNotFound is returned when a codec search to the Media Engine fails
    #[error("codec not found")]
    ErrCodecNotFound,
    /// ErrNoRemoteDescription indicates that an operation was rejected because
    /// the remote description is not set
    #[error("remote description is not set")]
    ErrNoRemoteDescription,
    #[error("offer SDP semantics does not match configuration")]
    ErrIncorrectSDPSemantics,
    #[error("operation can not be run in current signaling state")]
    ErrIncorrectSignalingState,
    #[error("protocol is larger then 65535 bytes")]
    ErrProtocolTooLarge,
    #[error("RtpSender not created by this PeerConnection")]
    ErrSenderNotCreatedByConnection,
    #[error("set_remote_description called with no fingerprint")]
    ErrSessionDescriptionNoFingerprint,
    #[error("set_remote_description called with an invalid fingerprint")]
    ErrSessionDescriptionInvalidFingerprint,
    #[error("set_remote_description called with multiple conflicting fingerprint")]
    ErrSessionDescriptionConflictingFingerprints,
    #[error("set_remote_description called with no ice-ufrag")]
    ErrSessionDescriptionMissingIceUfrag,
    #[error("set_remote_description called with no ice-pwd")]
    ErrSessionDescriptionMissingIcePwd,
    #[error("set_remote_description called with multiple conflicting ice-ufrag values")]
    ErrSessionDescriptionConflictingIceUfrag,
    #[error("set_remote_description called with multiple conflicting ice-pwd values")]
    ErrSessionDescriptionConflictingIcePwd,
    #[error("DTLS Handshake completed and no SRTP Protection Profile was chosen")]
    ErrNoSRTPProtectionProfile,
    #[error("operation failed no codecs are available")]
    ErrNoCodecsAvailable,
    #[error("unable to start track, codec is not supported by remote")]
    ErrUnsupportedCodec,
    #[error("unable to populate media section, RTPSender created with no codecs")]
    ErrSenderWithNoCodecs,
    #[error("new track must be of the same kind as previous")]
    ErrRTPSenderNewTrackHasIncorrectKind,
    #[error("failed to unbind TrackLocal from PeerConnection")]
    ErrUnbindFailed,
    #[error("the requested codec does not have a payloader")]
    ErrNoPayloaderForCodec,
    #[error("header extension direction must be sendonly or recvonly")]
    ErrRegisterHeaderExtensionInvalidDirection,
    #[error("too many simulcast probe streams in flight")]
    ErrSimulcastProbeOverflow,

    #[error("the DTLS transport has not started yet")]
    ErrDtlsTransportNotStarted,
    #[error("failed extracting keys from DTLS for SRTP")]
    ErrDtlsKeyExtractionFailed,
    #[error("failed to start SRTP")]
    ErrFailedToStartSRTP,
    #[error("attempted to start DTLSTransport that is not in new state")]
    ErrInvalidDTLSStart,
    #[error("peer didn't provide certificate via DTLS")]
    ErrNoRemoteCertificate,
    #[error("no matching fingerprint")]
    ErrNoMatchingCertificateFingerprint,
    #[error("unsupported fingerprint algorithm")]
    ErrUnsupportedFingerprintAlgorithm,
    #[error("DTLS handshake failed: {0}")]
    ErrDtlsHandshakeFailed(String),
    #[error("ICE connection not started")]
    ErrICEConnectionNotStarted,
    #[error("unknown candidate type")]
    ErrICECandidateTypeUnknown,
    #[error("ICEAgent does not exist")]
    ErrICEAgentNotExist,
    #[error("unknown ICE Role")]
    ErrICERoleUnknown,
    #[error("unknown protocol")]
    ErrICEProtocolUnknown,
    #[error("unknown ICE credential type")]
    ErrICECredentialTypeUnknown,
    #[error("ICE connection failed: {0}")]
    ErrICEConnectionFailed(String),
    #[error("ICETransport can only be called in ICETransportStateNew")]
    ErrICETransportNotInNew,
    #[error("invalid ICE url: {0}")]
    ErrICEInvalidUrl(String),
    #[error("attribute not long enough to be ICE candidate")]
    ErrAttributeTooShortIceCandidate,
    #[error("could not parse component")]
    ErrParseComponent,
    #[error("could not parse priority")]
    ErrParsePriority,
    #[error("could not parse port")]
    ErrParsePort,
    #[error("could not parse related addresses")]
    ErrParseRelatedAddr,
    #[error("could not parse type")]
    ErrParseType,
    #[error("no transport factory configured for {0}")]
    ErrNoTransportFactory(&'static str),

    #[error("SDP does not match previous offer")]
    ErrSDPDoesNotMatchOffer,
    #[error("SDP does not match previous answer")]
    ErrSDPDoesNotMatchAnswer,
    #[error("provided value is not a valid enum value of type SDPType")]
    ErrPeerConnSDPTypeInvalidValue,
    #[error("invalid state change op")]
    ErrPeerConnStateChangeInvalid,
    #[error("invalid SDP type supplied to SetLocalDescription()")]
    ErrPeerConnSDPTypeInvalidValueSetLocalDescription,
    #[error("remoteDescription contained media section without mid value")]
    ErrPeerConnRemoteDescriptionWithoutMidValue,
    #[error("remoteDescription has not been set yet")]
    ErrPeerConnRemoteDescriptionNil,
    #[error("single media section has an explicit SSRC")]
    ErrPeerConnSingleMediaSectionHasExplicitSSRC,
    #[error("could not add transceiver for remote SSRC")]
    ErrPeerConnRemoteSSRCAddTransceiver,
    #[error("mid RTP Extensions required for Simulcast")]
    ErrPeerConnSimulcastMidRTPExtensionRequired,
    #[error("stream id RTP Extensions required for Simulcast")]
    ErrPeerConnSimulcastStreamIDRTPExtensionRequired,
    #[error("incoming SSRC failed Simulcast probing")]
    ErrPeerConnSimulcastIncomingSSRCFailed,
    #[error("add_transceiver_from_kind currently only supports recvonly")]
    ErrPeerConnAddTransceiverFromKindSupport,
    #[error("add_transceiver_from_track only accepts sendonly and sendrecv")]
    ErrPeerConnAddTransceiverFromTrackSupport,
    #[error("set_identity_provider is not supported")]
    ErrPeerConnSetIdentityProviderNotImplemented,
    #[error("cannot find transceiver with mid")]
    ErrPeerConnTransceiverMidNil,
    #[error("plan-b descriptions carrying rid simulcast are not supported")]
    ErrPlanBSimulcastUnsupported,
    #[error("excessive retries in CreateOffer")]
    ErrExcessiveRetries,
    #[error("operations queue is closed")]
    ErrOperationsClosed,
    #[error("add_transceiver_sdp called with 0 transceivers")]
    ErrSDPZeroTransceivers,
    #[error("media section has both tracks and datachannels")]
    ErrSDPMediaSectionMediaDataChanInvalid,
    #[error("media section has multiple tracks, Unified Plan only allows one")]
    ErrSDPMediaSectionMultipleTrackInvalid,

    #[error("Track must not be nil")]
    ErrRTPSenderTrackNil,
    #[error("Send has already been called")]
    ErrRTPSenderSendAlreadyCalled,
    #[error("RTPSender has been stopped")]
    ErrRTPSenderStopped,
    #[error("Sender cannot add encoding as rid is empty")]
    ErrRTPSenderRidNil,
    #[error("Sender cannot add encoding as there is no base track")]
    ErrRTPSenderNoBaseEncoding,
    #[error("Sender cannot add encoding as provided track does not match base track")]
    ErrRTPSenderBaseEncodingMismatch,
    #[error("Sender cannot encoding due to RID collision")]
    ErrRTPSenderRIDCollision,
    #[error("new track must have the same number of encodings")]
    ErrRTPSenderNewTrackHasIncorrectEnvelope,
    #[error("the initial track id of a sender is already set")]
    ErrSenderInitialTrackIdAlreadySet,
    #[error("RTPReceiver must not be nil")]
    ErrRTPReceiverNil,
    #[error("Receive has already been called")]
    ErrRTPReceiverReceiveAlreadyCalled,
    #[error("unable to find stream for Track with SSRC")]
    ErrRTPReceiverWithSSRCTrackStreamNotFound,
    #[error("no trackStreams found for SSRC")]
    ErrRTPReceiverForSSRCTrackStreamNotFound,
    #[error("no trackStreams found for RID")]
    ErrRTPReceiverForRIDTrackStreamNotFound,
    #[error("mid can't be changed once it has been set")]
    ErrRTPTransceiverCannotChangeMid,
    #[error("unsupported codec type by this transceiver")]
    ErrRTPTransceiverCodecUnsupported,
    #[error("DTLS not established")]
    ErrSCTPTransportDTLS,
    #[error("SCTP is not established")]
    ErrSCTPNotEstablished,
    #[error("set_answering_dtlsrole must DTLSRoleClient or DTLSRoleServer")]
    ErrSettingEngineSetAnsweringDTLSRole,
    #[error("can't rollback from stable state")]
    ErrSignalingStateCannotRollback,
    #[error("invalid proposed signaling state transition: {0}")]
    ErrSignalingStateProposedTransitionInvalid(String),
    #[error("bad Certificate PEM format")]
    ErrCertificatePEMFormatError,
    #[error("Interceptor is not bind")]
    ErrInterceptorNotBind,
    #[error("SessionSRTP has been closed")]
    SessionSrtpAlreadyClosed,
    #[error("unknown type")]
    ErrUnknownType,
    #[error("no free header extension id left")]
    ErrRegisterHeaderExtensionNoFreeID,
    #[error("remote ICE ufrag is empty")]
    ErrRemoteUfragEmpty,
    #[error("remote ICE pwd is empty")]
    ErrRemotePwdEmpty,

    /// SyntaxIdDirSplit indicates rid-syntax could not be parsed.
    #[error("RFC8851 mandates rid-syntax        = %s\"a=rid:\" rid-id SP rid-dir")]
    SimulcastRidParseErrorSyntaxIdDirSplit,
    /// UnknownDirection indicates rid-dir was not parsed. Should be "send" or "recv".
    #[error("RFC8851 mandates rid-dir           = %s\"send\" / %s\"recv\"")]
    SimulcastRidParseErrorUnknownDirection,

    //Third Party Error
    #[error("util: {0}")]
    Util(#[from] util::Error),
    #[error("sdp: {0}")]
    Sdp(#[from] sdp::Error),
    #[error("rtp: {0}")]
    Rtp(#[from] rtp::Error),
    #[error("rtcp: {0}")]
    Rtcp(#[from] rtcp::Error),
    #[error("{0}")]
    RcGen(#[from] rcgen::Error),
    #[error("parse ip: {0}")]
    ParseIp(#[from] net::AddrParseError),
    #[error("parse int: {0}")]
    ParseInt(#[from] ParseIntError),
    #[error("{0}")]
    Io(#[source] IoError),
    #[error("url parse: {0}")]
    Url(#[from] url::ParseError),
    #[error("utf8: {0}")]
    Utf8(#[from] FromUtf8Error),
    #[error("{0}")]
    Std(#[source] StdError),

    //Other Errors
    #[error("Other ICE Err: {0}")]
    OtherIceErr(String),
    #[error("Other DTLS Err: {0}")]
    OtherDtlsErr(String),
    #[error("Other SRTP Err: {0}")]
    OtherSrtpErr(String),
    #[error("Other SCTP Err: {0}")]
    OtherSctpErr(String),
    #[error("Other Interceptor Err: {0}")]
    OtherInterceptorErr(String),
    #[error("Other PeerConnection Err: {0}")]
    OtherPeerConnectionErr(String),
    #[error("mpsc send: {0}")]
    MpscSend(String),
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn from_std<T>(error: T) -> Self
    where
        T: std::error::Error + Send + Sync + 'static,
    {
        Error::Std(StdError(Box::new(error)))
    }

    pub fn downcast_ref<T: std::error::Error + 'static>(&self) -> Option<&T> {
        if let Error::Std(s) = self {
            return s.0.downcast_ref();
        }

        None
    }

    /// kind classifies the error into the WebRTC error taxonomy.
    pub fn kind(&self) -> RTCErrorKind {
        use Error::*;
        match self {
            ErrTimeout => RTCErrorKind::Timeout,
            Util(util::Error::ErrTimeout) => RTCErrorKind::Timeout,

            ErrConnectionClosed
            | ErrEof
            | ErrOperationsClosed
            | ErrRTPSenderStopped
            | ErrRTPReceiverNil
            | SessionSrtpAlreadyClosed
            | MpscSend(_)
            | Util(util::Error::ErrBufferClosed)
            | Util(util::Error::ErrUseClosedNetworkConn)
            | Util(util::Error::ErrAlreadyClosed) => RTCErrorKind::Closed,

            ErrSignalingStateCannotRollback
            | ErrSignalingStateProposedTransitionInvalid(_)
            | ErrPeerConnStateChangeInvalid
            | ErrModifyingPeerIdentity
            | ErrModifyingCertificates
            | ErrModifyingBundlePolicy
            | ErrModifyingRTCPMuxPolicy
            | ErrModifyingICECandidatePoolSize
            | ErrRTPTransceiverCannotChangeMid
            | ErrSDPDoesNotMatchOffer
            | ErrSDPDoesNotMatchAnswer => RTCErrorKind::InvalidModification,

            ErrIncorrectSignalingState
            | ErrNoRemoteDescription
            | ErrPeerConnRemoteDescriptionNil
            | ErrDtlsTransportNotStarted
            | ErrInvalidDTLSStart
            | ErrICEConnectionNotStarted
            | ErrICETransportNotInNew
            | ErrICEAgentNotExist
            | ErrSCTPNotEstablished
            | ErrSCTPTransportDTLS
            | ErrRTPSenderSendAlreadyCalled
            | ErrSenderInitialTrackIdAlreadySet
            | ErrRTPReceiverReceiveAlreadyCalled
            | ErrDetachBeforeOpened
            | ErrClosedPipe
            | ErrInterceptorNotBind
            | ErrSDPZeroTransceivers
            | ErrSDPMediaSectionMediaDataChanInvalid
            | ErrSDPMediaSectionMultipleTrackInvalid
            | ErrExcessiveRetries => RTCErrorKind::InvalidState,

            ErrNoTurnCredentials
            | ErrICEInvalidUrl(_)
            | ErrStringSizeLimit
            | ErrRetransmitsOrPacketLifeTime
            | ErrDataChannelIdInUse
            | ErrMaxDataChannelID
            | ErrProtocolTooLarge
            | ErrSenderNotCreatedByConnection
            | ErrRTPSenderNewTrackHasIncorrectKind
            | ErrRTPSenderTrackNil
            | ErrRTPSenderRidNil
            | ErrRTPSenderNoBaseEncoding
            | ErrRTPSenderBaseEncodingMismatch
            | ErrRTPSenderRIDCollision
            | ErrRTPSenderNewTrackHasIncorrectEnvelope
            | ErrRTPTransceiverCodecUnsupported
            | ErrOutboundPacketTooLarge
            | ErrSettingEngineSetAnsweringDTLSRole
            | ErrDetachNotEnabled
            | ErrRemoteUfragEmpty
            | ErrRemotePwdEmpty
            | ErrNonCertificate => RTCErrorKind::InvalidAccess,

            ErrCodecNotFound
            | ErrNoCodecsAvailable
            | ErrUnsupportedCodec
            | ErrSenderWithNoCodecs
            | ErrNoPayloaderForCodec
            | ErrRegisterHeaderExtensionNoFreeID
            | ErrICECredentialTypeUnknown
            | ErrPrivateKeyType
            | ErrUnsupportedFingerprintAlgorithm
            | ErrPlanBSimulcastUnsupported
            | ErrIncorrectSDPSemantics
            | ErrPeerConnAddTransceiverFromKindSupport
            | ErrPeerConnAddTransceiverFromTrackSupport
            | ErrPeerConnSetIdentityProviderNotImplemented => RTCErrorKind::NotSupported,

            ErrSessionDescriptionNoFingerprint
            | ErrSessionDescriptionInvalidFingerprint
            | ErrSessionDescriptionConflictingFingerprints
            | ErrSessionDescriptionMissingIceUfrag
            | ErrSessionDescriptionMissingIcePwd
            | ErrSessionDescriptionConflictingIceUfrag
            | ErrSessionDescriptionConflictingIcePwd
            | ErrPeerConnSDPTypeInvalidValue
            | ErrPeerConnSDPTypeInvalidValueSetLocalDescription
            | ErrPeerConnRemoteDescriptionWithoutMidValue
            | ErrPeerConnSingleMediaSectionHasExplicitSSRC
            | ErrAttributeTooShortIceCandidate
            | ErrParseComponent
            | ErrParsePriority
            | ErrParsePort
            | ErrParseRelatedAddr
            | ErrParseType
            | ErrUnknownType
            | ErrICECandidateTypeUnknown
            | ErrICEProtocolUnknown
            | ErrICERoleUnknown
            | SimulcastRidParseErrorSyntaxIdDirSplit
            | SimulcastRidParseErrorUnknownDirection
            | InvalidMessageType(_)
            | InvalidChannelType(_)
            | InvalidPayloadProtocolIdentifier(_)
            | Sdp(_)
            | ParseInt(_)
            | ParseIp(_)
            | Url(_)
            | Utf8(_) => RTCErrorKind::ParseError,

            ErrCertificateExpired
            | ErrNoSRTPProtectionProfile
            | ErrDtlsKeyExtractionFailed
            | ErrFailedToStartSRTP
            | ErrNoRemoteCertificate
            | ErrNoMatchingCertificateFingerprint
            | ErrDtlsHandshakeFailed(_)
            | ErrICEConnectionFailed(_)
            | ErrNoTransportFactory(_)
            | OtherIceErr(_)
            | OtherDtlsErr(_)
            | OtherSrtpErr(_)
            | OtherSctpErr(_)
            | Io(_) => RTCErrorKind::Transport,

            _ => RTCErrorKind::Unknown,
        }
    }

    /// is_timeout reports whether a retry after the deadline may succeed.
    pub fn is_timeout(&self) -> bool {
        self.kind() == RTCErrorKind::Timeout
    }
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}

/// An escape hatch to preserve stack traces when we don't know the error.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StdError(pub Box<dyn std::error::Error + Send + Sync>);

impl PartialEq for StdError {
    fn eq(&self, _: &Self) -> bool {
        false
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(e: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::MpscSend(e.to_string())
    }
}

impl From<SystemTimeError> for Error {
    fn from(e: SystemTimeError) -> Self {
        Error::Other(e.to_string())
    }
}

/// flatten_errs flattens multiple errors into one
pub fn flatten_errs(errs: Vec<impl Into<Error>>) -> Result<()> {
    if errs.is_empty() {
        Ok(())
    } else {
        let errs_strs: Vec<String> = errs.into_iter().map(|e| e.into().to_string()).collect();
        Err(Error::Other(errs_strs.join("\n")))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_kind() {
        let tests = vec![
            (Error::ErrConnectionClosed, RTCErrorKind::Closed),
            (
                Error::ErrSignalingStateCannotRollback,
                RTCErrorKind::InvalidModification,
            ),
            (
                Error::ErrSessionDescriptionConflictingFingerprints,
                RTCErrorKind::ParseError,
            ),
            (Error::ErrTimeout, RTCErrorKind::Timeout),
            (Error::Util(util::Error::ErrTimeout), RTCErrorKind::Timeout),
            (
                Error::Util(util::Error::ErrBufferClosed),
                RTCErrorKind::Closed,
            ),
            (Error::ErrNoTurnCredentials, RTCErrorKind::InvalidAccess),
            (Error::ErrCodecNotFound, RTCErrorKind::NotSupported),
            (
                Error::ErrNoMatchingCertificateFingerprint,
                RTCErrorKind::Transport,
            ),
            (Error::ErrIncorrectSignalingState, RTCErrorKind::InvalidState),
            (Error::Other("x".to_owned()), RTCErrorKind::Unknown),
        ];

        for (err, expected_kind) in tests {
            assert_eq!(err.kind(), expected_kind, "{err}");
        }
    }

    #[test]
    fn test_flatten_errs() {
        assert_eq!(flatten_errs(Vec::<Error>::new()), Ok(()));

        let result = flatten_errs(vec![Error::ErrConnectionClosed, Error::ErrTimeout]);
        assert_eq!(
            result,
            Err(Error::Other("connection closed\ni/o timeout".to_owned()))
        );
    }
}
