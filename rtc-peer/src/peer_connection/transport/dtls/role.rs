use std::fmt;

use sdp::description::session::SessionDescription;
use sdp::util::ConnectionRole;
use serde::{Deserialize, Serialize};

/// DTLSRole indicates the role of the DTLS transport.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RTCDtlsRole {
    #[default]
    Unspecified = 0,

    /// The role is resolved from the ICE role: the ICE controlled side acts
    /// as DTLS client and the controlling side as DTLS server.
    #[serde(rename = "auto")]
    Auto = 1,

    #[serde(rename = "client")]
    Client = 2,

    #[serde(rename = "server")]
    Server = 3,
}

/// RFC 5763: the answerer uses setup:active so the answer and the DTLS
/// handshake can proceed in parallel.
pub(crate) const DEFAULT_DTLS_ROLE_ANSWER: RTCDtlsRole = RTCDtlsRole::Client;

/// The offerer uses setup:actpass and must accept a client_hello before
/// the answer arrives.
pub(crate) const DEFAULT_DTLS_ROLE_OFFER: RTCDtlsRole = RTCDtlsRole::Auto;

impl fmt::Display for RTCDtlsRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RTCDtlsRole::Auto => write!(f, "auto"),
            RTCDtlsRole::Client => write!(f, "client"),
            RTCDtlsRole::Server => write!(f, "server"),
            _ => write!(
                f,
                "{}",
                crate::peer_connection::configuration::UNSPECIFIED_STR
            ),
        }
    }
}

impl From<&str> for RTCDtlsRole {
    fn from(raw: &str) -> Self {
        match raw {
            "auto" => RTCDtlsRole::Auto,
            "client" => RTCDtlsRole::Client,
            "server" => RTCDtlsRole::Server,
            _ => RTCDtlsRole::Unspecified,
        }
    }
}

impl From<u8> for RTCDtlsRole {
    fn from(v: u8) -> Self {
        match v {
            1 => RTCDtlsRole::Auto,
            2 => RTCDtlsRole::Client,
            3 => RTCDtlsRole::Server,
            _ => RTCDtlsRole::Unspecified,
        }
    }
}

/// The first `a=setup` attribute of a remote description decides the role
/// it asks for; a description without one is treated as actpass.
impl From<&SessionDescription> for RTCDtlsRole {
    fn from(session_description: &SessionDescription) -> Self {
        for media_section in &session_description.media_descriptions {
            for attribute in &media_section.attributes {
                if attribute.key == "setup" {
                    return match attribute.value.as_deref() {
                        Some("active") => RTCDtlsRole::Client,
                        Some("passive") => RTCDtlsRole::Server,
                        _ => RTCDtlsRole::Auto,
                    };
                }
            }
        }

        RTCDtlsRole::Auto
    }
}

impl RTCDtlsRole {
    pub(crate) fn to_connection_role(self) -> ConnectionRole {
        match self {
            RTCDtlsRole::Client => ConnectionRole::Active,
            RTCDtlsRole::Server => ConnectionRole::Passive,
            RTCDtlsRole::Auto => ConnectionRole::Actpass,
            _ => ConnectionRole::Unspecified,
        }
    }

    /// invert returns the role the remote side takes when we take `self`.
    pub(crate) fn invert(self) -> Self {
        match self {
            RTCDtlsRole::Client => RTCDtlsRole::Server,
            RTCDtlsRole::Server => RTCDtlsRole::Client,
            other => other,
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;
    use shared::error::Result;

    #[test]
    fn test_dtls_role_string() {
        let tests = vec![
            (RTCDtlsRole::Unspecified, "Unspecified"),
            (RTCDtlsRole::Auto, "auto"),
            (RTCDtlsRole::Client, "client"),
            (RTCDtlsRole::Server, "server"),
        ];

        for (role, expected_string) in tests {
            assert_eq!(role.to_string(), expected_string);
            assert_eq!(RTCDtlsRole::from(expected_string), role);
            assert_eq!(RTCDtlsRole::from(role as u8), role);
        }
    }

    #[test]
    fn test_dtls_role_invert() {
        assert_eq!(RTCDtlsRole::Client.invert(), RTCDtlsRole::Server);
        assert_eq!(RTCDtlsRole::Server.invert(), RTCDtlsRole::Client);
        assert_eq!(RTCDtlsRole::Auto.invert(), RTCDtlsRole::Auto);
    }

    #[test]
    fn test_dtls_role_from_remote_sdp() -> Result<()> {
        const HEADER: &str = "v=0\r\no=- 4596489990601351948 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";
        const MEDIA: &str = "m=application 47299 DTLS/SCTP 5000\r\nc=IN IP4 192.168.20.129\r\n";

        let tests = vec![
            ("no media", HEADER.to_owned(), RTCDtlsRole::Auto),
            ("no setup", format!("{HEADER}{MEDIA}"), RTCDtlsRole::Auto),
            (
                "actpass",
                format!("{HEADER}{MEDIA}a=setup:actpass\r\n"),
                RTCDtlsRole::Auto,
            ),
            (
                "passive",
                format!("{HEADER}{MEDIA}a=setup:passive\r\n"),
                RTCDtlsRole::Server,
            ),
            (
                "active",
                format!("{HEADER}{MEDIA}a=setup:active\r\n"),
                RTCDtlsRole::Client,
            ),
        ];

        for (name, sdp, expected_role) in tests {
            let mut reader = Cursor::new(sdp.as_bytes());
            let session_description = SessionDescription::unmarshal(&mut reader)?;
            assert_eq!(
                RTCDtlsRole::from(&session_description),
                expected_role,
                "{name} failed"
            );
        }

        Ok(())
    }
}
