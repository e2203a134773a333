use serde::{Deserialize, Serialize};

use super::credential_type::RTCIceCredentialType;
use super::url::IceUrl;
use shared::error::{Error, Result};

/// ICEServer describes a single STUN and TURN server that can be used by
/// the ICEAgent to establish a connection with a peer.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RTCIceServer {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
    pub credential_type: RTCIceCredentialType,
}

impl RTCIceServer {
    pub(crate) fn parse_url(&self, url_str: &str) -> Result<IceUrl> {
        IceUrl::parse(url_str)
    }

    /// urls parses every url and attaches the credentials TURN servers need.
    pub(crate) fn urls(&self) -> Result<Vec<IceUrl>> {
        let mut urls = vec![];

        for url_str in &self.urls {
            let mut url = self.parse_url(url_str)?;
            if url.is_turn() {
                // https://www.w3.org/TR/webrtc/#set-the-configuration (step #11.3.2)
                if self.username.is_empty() || self.credential.is_empty() {
                    return Err(Error::ErrNoTurnCredentials);
                }
                url.username.clone_from(&self.username);

                match self.credential_type {
                    // an unset credential type means password
                    RTCIceCredentialType::Unspecified | RTCIceCredentialType::Password => {
                        // https://www.w3.org/TR/webrtc/#set-the-configuration (step #11.3.3)
                        url.password.clone_from(&self.credential);
                    }
                    RTCIceCredentialType::Oauth => {
                        // https://www.w3.org/TR/webrtc/#set-the-configuration (step #11.3.4)
                        // the access token travels as the credential
                        url.password.clone_from(&self.credential);
                    }
                };
            }

            urls.push(url);
        }

        Ok(urls)
    }
}
