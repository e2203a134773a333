use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shared::error::Error;

use crate::peer_connection::configuration::UNSPECIFIED_STR;

/// ICECredentialType indicates the type of credentials used to connect to
/// an ICE server.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RTCIceCredentialType {
    #[default]
    Unspecified,

    /// Password describes username and password based
    /// credentials as described in <https://tools.ietf.org/html/rfc5389>.
    #[serde(rename = "password")]
    Password,

    /// Oauth describes token based credential as described
    /// in <https://tools.ietf.org/html/rfc7635>.
    #[serde(rename = "oauth")]
    Oauth,
}

const ICE_CREDENTIAL_TYPE_PASSWORD_STR: &str = "password";
const ICE_CREDENTIAL_TYPE_OAUTH_STR: &str = "oauth";

impl From<&str> for RTCIceCredentialType {
    fn from(raw: &str) -> Self {
        match raw {
            ICE_CREDENTIAL_TYPE_PASSWORD_STR => RTCIceCredentialType::Password,
            ICE_CREDENTIAL_TYPE_OAUTH_STR => RTCIceCredentialType::Oauth,
            _ => RTCIceCredentialType::Unspecified,
        }
    }
}

/// Strict parsing: anything but `password` or `oauth` is rejected.
impl FromStr for RTCIceCredentialType {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match RTCIceCredentialType::from(raw) {
            RTCIceCredentialType::Unspecified => Err(Error::ErrICECredentialTypeUnknown),
            ct => Ok(ct),
        }
    }
}

impl fmt::Display for RTCIceCredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RTCIceCredentialType::Password => write!(f, "{ICE_CREDENTIAL_TYPE_PASSWORD_STR}"),
            RTCIceCredentialType::Oauth => write!(f, "{ICE_CREDENTIAL_TYPE_OAUTH_STR}"),
            _ => write!(f, "{UNSPECIFIED_STR}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_ice_credential_type() {
        let tests = vec![
            (UNSPECIFIED_STR, RTCIceCredentialType::Unspecified),
            ("password", RTCIceCredentialType::Password),
            ("oauth", RTCIceCredentialType::Oauth),
        ];

        for (ct_str, expected_ct) in tests {
            assert_eq!(RTCIceCredentialType::from(ct_str), expected_ct);
            assert_eq!(expected_ct.to_string(), ct_str);
        }
    }

    #[test]
    fn test_parse_ice_credential_type() {
        assert_eq!("oauth".parse(), Ok(RTCIceCredentialType::Oauth));
        let err = "token".parse::<RTCIceCredentialType>().unwrap_err();
        assert_eq!(err, Error::ErrICECredentialTypeUnknown);
        assert_eq!(err.kind(), shared::error::RTCErrorKind::NotSupported);
    }

    #[test]
    fn test_ice_credential_type_serde() {
        let tests = vec![
            (RTCIceCredentialType::Password, r#""password""#),
            (RTCIceCredentialType::Oauth, r#""oauth""#),
        ];

        for (ct, expected) in tests {
            let json = serde_json::to_string(&ct).unwrap();
            assert_eq!(json, expected);
            let back: RTCIceCredentialType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, ct);
        }
    }
}
