use serde::{Deserialize, Serialize};
use std::fmt;

use super::candidate_type::RTCIceCandidateType;
use super::protocol::RTCIceProtocol;
use shared::error::{Error, Result};

#[derive(Default, PartialEq, Eq, Debug, Copy, Clone, Serialize, Deserialize)]
pub enum RTCIceTcpCandidateType {
    #[default]
    Unspecified,

    #[serde(rename = "active")]
    Active,

    #[serde(rename = "passive")]
    Passive,

    #[serde(rename = "so")]
    SimultaneousOpen,
}

impl From<&str> for RTCIceTcpCandidateType {
    fn from(raw: &str) -> Self {
        match raw {
            "active" => RTCIceTcpCandidateType::Active,
            "passive" => RTCIceTcpCandidateType::Passive,
            "so" => RTCIceTcpCandidateType::SimultaneousOpen,
            _ => RTCIceTcpCandidateType::Unspecified,
        }
    }
}

impl fmt::Display for RTCIceTcpCandidateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceTcpCandidateType::Active => "active",
            RTCIceTcpCandidateType::Passive => "passive",
            RTCIceTcpCandidateType::SimultaneousOpen => "so",
            RTCIceTcpCandidateType::Unspecified => "",
        };
        write!(f, "{s}")
    }
}

/// ICECandidate represents a ice candidate
///
/// ## Specifications
///
/// * [MDN]
/// * [W3C]
///
/// [MDN]: https://developer.mozilla.org/en-US/docs/Web/API/RTCIceCandidate
/// [W3C]: https://w3c.github.io/webrtc-pc/#rtcicecandidate-interface
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCIceCandidate {
    pub stats_id: String,
    pub foundation: String,
    pub priority: u32,
    pub address: String,
    pub protocol: RTCIceProtocol,
    pub port: u16,
    pub typ: RTCIceCandidateType,
    pub component: u16,
    pub related_address: String,
    pub related_port: u16,
    pub tcp_type: RTCIceTcpCandidateType,
}

impl RTCIceCandidate {
    /// unmarshal parses the value of an `a=candidate` attribute, with or
    /// without its `candidate:` prefix.
    pub fn unmarshal(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let raw = raw.strip_prefix("candidate:").unwrap_or(raw);
        let split: Vec<&str> = raw.split_whitespace().collect();
        if split.len() < 8 {
            return Err(Error::ErrAttributeTooShortIceCandidate);
        }

        let foundation = split[0].to_owned();
        let component: u16 = split[1].parse().map_err(|_| Error::ErrParseComponent)?;
        let protocol = RTCIceProtocol::from(split[2]);
        if protocol == RTCIceProtocol::Unspecified {
            return Err(Error::ErrICEProtocolUnknown);
        }
        let priority: u32 = split[3].parse().map_err(|_| Error::ErrParsePriority)?;
        let address = split[4].to_owned();
        let port: u16 = split[5].parse().map_err(|_| Error::ErrParsePort)?;
        if split[6] != "typ" {
            return Err(Error::ErrParseType);
        }
        let typ = RTCIceCandidateType::from(split[7]);
        if typ == RTCIceCandidateType::Unspecified {
            return Err(Error::ErrICECandidateTypeUnknown);
        }

        let mut candidate = RTCIceCandidate {
            stats_id: String::new(),
            foundation,
            priority,
            address,
            protocol,
            port,
            typ,
            component,
            ..Default::default()
        };

        // optional key/value extensions
        let mut rest = split[8..].iter();
        while let Some(key) = rest.next() {
            let value = rest.next().ok_or(Error::ErrAttributeTooShortIceCandidate)?;
            match *key {
                "raddr" => candidate.related_address = (*value).to_owned(),
                "rport" => {
                    candidate.related_port =
                        value.parse().map_err(|_| Error::ErrParseRelatedAddr)?
                }
                "tcptype" => candidate.tcp_type = RTCIceTcpCandidateType::from(*value),
                _ => {}
            }
        }

        candidate.stats_id = format!(
            "candidate:{}:{}:{}:{}",
            candidate.foundation, candidate.address, candidate.port, candidate.typ
        );

        Ok(candidate)
    }

    /// marshal renders the candidate without the `candidate:` prefix.
    pub fn marshal(&self) -> String {
        let mut val = format!(
            "{} {} {} {} {} {} typ {}",
            self.foundation,
            self.component,
            self.protocol,
            self.priority,
            self.address,
            self.port,
            self.typ
        );

        if self.tcp_type != RTCIceTcpCandidateType::Unspecified {
            val += &format!(" tcptype {}", self.tcp_type);
        }

        if !self.related_address.is_empty() {
            val += &format!(
                " raddr {} rport {}",
                self.related_address, self.related_port
            );
        }

        val
    }

    /// to_json returns an ICECandidateInit
    /// as indicated by the spec <https://w3c.github.io/webrtc-pc/#dom-rtcicecandidate-tojson>
    pub fn to_json(&self) -> RTCIceCandidateInit {
        RTCIceCandidateInit {
            candidate: format!("candidate:{}", self.marshal()),
            sdp_mid: Some("".to_owned()),
            sdp_mline_index: Some(0u16),
            username_fragment: None,
        }
    }
}

impl fmt::Display for RTCIceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}:{}{}",
            self.protocol, self.typ, self.address, self.port, self.related_address,
        )
    }
}

/// ICECandidateInit is used to serialize ice candidates
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCIceCandidateInit {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
    pub username_fragment: Option<String>,
}
