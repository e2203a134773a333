use std::fmt;

use crate::peer_connection::configuration::UNSPECIFIED_STR;

/// RTCRtpTransceiverDirection is the `a=sendrecv`-family attribute of a
/// media section, seen from the local side.
///
/// <https://www.w3.org/TR/webrtc/#dom-rtcrtptransceiverdirection>
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCRtpTransceiverDirection {
    #[default]
    Unspecified = 0,
    Sendrecv = 1,
    Sendonly = 2,
    Recvonly = 3,
    Inactive = 4,
}

impl RTCRtpTransceiverDirection {
    const NAMES: [(RTCRtpTransceiverDirection, &'static str); 4] = [
        (RTCRtpTransceiverDirection::Sendrecv, "sendrecv"),
        (RTCRtpTransceiverDirection::Sendonly, "sendonly"),
        (RTCRtpTransceiverDirection::Recvonly, "recvonly"),
        (RTCRtpTransceiverDirection::Inactive, "inactive"),
    ];

    /// from_send_recv builds the direction that sends and receives as asked.
    pub fn from_send_recv(send: bool, recv: bool) -> RTCRtpTransceiverDirection {
        match (send, recv) {
            (true, true) => RTCRtpTransceiverDirection::Sendrecv,
            (true, false) => RTCRtpTransceiverDirection::Sendonly,
            (false, true) => RTCRtpTransceiverDirection::Recvonly,
            (false, false) => RTCRtpTransceiverDirection::Inactive,
        }
    }

    pub fn has_send(&self) -> bool {
        matches!(
            self,
            RTCRtpTransceiverDirection::Sendrecv | RTCRtpTransceiverDirection::Sendonly
        )
    }

    pub fn has_recv(&self) -> bool {
        matches!(
            self,
            RTCRtpTransceiverDirection::Sendrecv | RTCRtpTransceiverDirection::Recvonly
        )
    }

    /// reverse is the direction as the remote peer sees it.
    pub fn reverse(&self) -> RTCRtpTransceiverDirection {
        match self {
            RTCRtpTransceiverDirection::Sendonly => RTCRtpTransceiverDirection::Recvonly,
            RTCRtpTransceiverDirection::Recvonly => RTCRtpTransceiverDirection::Sendonly,
            other => *other,
        }
    }

    /// intersect keeps sending and receiving only where both sides allow it.
    pub fn intersect(&self, other: RTCRtpTransceiverDirection) -> RTCRtpTransceiverDirection {
        Self::from_send_recv(
            self.has_send() && other.has_send(),
            self.has_recv() && other.has_recv(),
        )
    }

    /// answer_to is the direction a transceiver wanting `self` puts in the
    /// answer to a section offered as `offered` (RFC 8829 5.3.1).
    pub fn answer_to(&self, offered: RTCRtpTransceiverDirection) -> RTCRtpTransceiverDirection {
        match offered {
            RTCRtpTransceiverDirection::Sendonly | RTCRtpTransceiverDirection::Recvonly => {
                offered.reverse().intersect(*self)
            }
            RTCRtpTransceiverDirection::Inactive => RTCRtpTransceiverDirection::Inactive,
            RTCRtpTransceiverDirection::Sendrecv | RTCRtpTransceiverDirection::Unspecified => {
                *self
            }
        }
    }
}

impl From<&str> for RTCRtpTransceiverDirection {
    fn from(raw: &str) -> Self {
        Self::NAMES
            .iter()
            .find(|(_, name)| *name == raw)
            .map(|(direction, _)| *direction)
            .unwrap_or(RTCRtpTransceiverDirection::Unspecified)
    }
}

impl From<u8> for RTCRtpTransceiverDirection {
    fn from(v: u8) -> Self {
        Self::NAMES
            .iter()
            .find(|(direction, _)| *direction as u8 == v)
            .map(|(direction, _)| *direction)
            .unwrap_or(RTCRtpTransceiverDirection::Unspecified)
    }
}

impl fmt::Display for RTCRtpTransceiverDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Self::NAMES
            .iter()
            .find(|(direction, _)| direction == self)
            .map_or(UNSPECIFIED_STR, |(_, name)| name);
        f.write_str(name)
    }
}

#[cfg(test)]
mod test {
    use super::RTCRtpTransceiverDirection::*;
    use super::*;

    #[test]
    fn test_direction_names() {
        for (direction, name) in [
            (Sendrecv, "sendrecv"),
            (Sendonly, "sendonly"),
            (Recvonly, "recvonly"),
            (Inactive, "inactive"),
        ] {
            assert_eq!(RTCRtpTransceiverDirection::from(name), direction);
            assert_eq!(direction.to_string(), name);
            assert_eq!(RTCRtpTransceiverDirection::from(direction as u8), direction);
        }

        assert_eq!(RTCRtpTransceiverDirection::from("sendRecv"), Unspecified);
        assert_eq!(RTCRtpTransceiverDirection::from(9u8), Unspecified);
        assert_eq!(Unspecified.to_string(), UNSPECIFIED_STR);
    }

    #[test]
    fn test_direction_send_recv_bits() {
        for send in [false, true] {
            for recv in [false, true] {
                let d = RTCRtpTransceiverDirection::from_send_recv(send, recv);
                assert_eq!((d.has_send(), d.has_recv()), (send, recv), "{d}");
            }
        }
        assert!(!Unspecified.has_send());
        assert!(!Unspecified.has_recv());
    }

    #[test]
    fn test_direction_intersect() {
        let tests = [
            (Sendrecv, Recvonly, Recvonly),
            (Sendrecv, Sendonly, Sendonly),
            (Sendrecv, Inactive, Inactive),
            (Sendonly, Recvonly, Inactive),
            (Recvonly, Recvonly, Recvonly),
            (Sendonly, Sendrecv, Sendonly),
        ];
        for (a, b, want) in tests {
            assert_eq!(a.intersect(b), want, "{a} & {b}");
        }
    }

    #[test]
    fn test_direction_answer_to() {
        let tests = [
            // (local preference, offered, answered)
            (Sendrecv, Sendonly, Recvonly),
            (Sendrecv, Recvonly, Sendonly),
            (Sendonly, Sendonly, Inactive),
            (Recvonly, Recvonly, Inactive),
            (Recvonly, Sendrecv, Recvonly),
            (Sendrecv, Inactive, Inactive),
            (Sendonly, Unspecified, Sendonly),
        ];
        for (local, offered, want) in tests {
            assert_eq!(local.answer_to(offered), want, "{local} answering {offered}");
        }
    }
}
