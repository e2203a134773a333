//! Data Channel Establishment Protocol, RFC 8832.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::peer_connection::transport::sctp::association::ReliabilityType;
use shared::error::{Error, Result};

const MESSAGE_TYPE_ACK: u8 = 0x02;
const MESSAGE_TYPE_OPEN: u8 = 0x03;

const CHANNEL_OPEN_HEADER_LEN: usize = 11;

const CHANNEL_TYPE_RELIABLE: u8 = 0x00;
const CHANNEL_TYPE_RELIABLE_UNORDERED: u8 = 0x80;
const CHANNEL_TYPE_PARTIAL_RELIABLE_REXMIT: u8 = 0x01;
const CHANNEL_TYPE_PARTIAL_RELIABLE_REXMIT_UNORDERED: u8 = 0x81;
const CHANNEL_TYPE_PARTIAL_RELIABLE_TIMED: u8 = 0x02;
const CHANNEL_TYPE_PARTIAL_RELIABLE_TIMED_UNORDERED: u8 = 0x82;

/// CHANNEL_PRIORITY_NORMAL is the priority used for every locally opened channel.
pub(crate) const CHANNEL_PRIORITY_NORMAL: u16 = 256;

/// ChannelType determines the reliability of the WebRTC DataChannel
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ChannelType {
    /// The Data Channel provides a reliable in-order bi-directional communication.
    #[default]
    Reliable,
    /// The Data Channel provides a reliable unordered bi-directional communication.
    ReliableUnordered,
    /// The Data Channel provides a partially-reliable in-order bi-directional communication.
    /// User messages will not be retransmitted more times than specified in the Reliability Parameter.
    PartialReliableRexmit,
    /// The Data Channel provides a partial reliable unordered bi-directional communication.
    /// User messages will not be retransmitted more times than specified in the Reliability Parameter.
    PartialReliableRexmitUnordered,
    /// The Data Channel provides a partial reliable in-order bi-directional communication.
    /// User messages might not be transmitted or retransmitted after
    /// a specified life-time given in milli- seconds in the Reliability Parameter.
    PartialReliableTimed,
    /// The Data Channel provides a partial reliable unordered bi-directional
    /// communication.  User messages might not be transmitted or retransmitted
    /// after a specified life-time given in milli- seconds in the Reliability Parameter.
    PartialReliableTimedUnordered,
}

impl ChannelType {
    fn to_u8(self) -> u8 {
        match self {
            ChannelType::Reliable => CHANNEL_TYPE_RELIABLE,
            ChannelType::ReliableUnordered => CHANNEL_TYPE_RELIABLE_UNORDERED,
            ChannelType::PartialReliableRexmit => CHANNEL_TYPE_PARTIAL_RELIABLE_REXMIT,
            ChannelType::PartialReliableRexmitUnordered => {
                CHANNEL_TYPE_PARTIAL_RELIABLE_REXMIT_UNORDERED
            }
            ChannelType::PartialReliableTimed => CHANNEL_TYPE_PARTIAL_RELIABLE_TIMED,
            ChannelType::PartialReliableTimedUnordered => {
                CHANNEL_TYPE_PARTIAL_RELIABLE_TIMED_UNORDERED
            }
        }
    }

    fn from_u8(b: u8) -> Result<Self> {
        match b {
            CHANNEL_TYPE_RELIABLE => Ok(ChannelType::Reliable),
            CHANNEL_TYPE_RELIABLE_UNORDERED => Ok(ChannelType::ReliableUnordered),
            CHANNEL_TYPE_PARTIAL_RELIABLE_REXMIT => Ok(ChannelType::PartialReliableRexmit),
            CHANNEL_TYPE_PARTIAL_RELIABLE_REXMIT_UNORDERED => {
                Ok(ChannelType::PartialReliableRexmitUnordered)
            }
            CHANNEL_TYPE_PARTIAL_RELIABLE_TIMED => Ok(ChannelType::PartialReliableTimed),
            CHANNEL_TYPE_PARTIAL_RELIABLE_TIMED_UNORDERED => {
                Ok(ChannelType::PartialReliableTimedUnordered)
            }
            _ => Err(Error::InvalidChannelType(b)),
        }
    }

    /// reliability_params returns (unordered, reliability type) for the SCTP stream.
    pub(crate) fn reliability_params(self) -> (bool, ReliabilityType) {
        match self {
            ChannelType::Reliable => (false, ReliabilityType::Reliable),
            ChannelType::ReliableUnordered => (true, ReliabilityType::Reliable),
            ChannelType::PartialReliableRexmit => (false, ReliabilityType::Rexmit),
            ChannelType::PartialReliableRexmitUnordered => (true, ReliabilityType::Rexmit),
            ChannelType::PartialReliableTimed => (false, ReliabilityType::Timed),
            ChannelType::PartialReliableTimedUnordered => (true, ReliabilityType::Timed),
        }
    }

    /// from_parameters picks the channel type and reliability parameter for
    /// a channel's ordering and retransmission limits.
    pub(crate) fn from_parameters(
        ordered: bool,
        max_retransmits: Option<u16>,
        max_packet_life_time: Option<u16>,
    ) -> (ChannelType, u32) {
        match (max_retransmits, max_packet_life_time) {
            (None, None) => {
                if ordered {
                    (ChannelType::Reliable, 0)
                } else {
                    (ChannelType::ReliableUnordered, 0)
                }
            }
            (Some(max_retransmits), _) => {
                if ordered {
                    (ChannelType::PartialReliableRexmit, max_retransmits as u32)
                } else {
                    (
                        ChannelType::PartialReliableRexmitUnordered,
                        max_retransmits as u32,
                    )
                }
            }
            (None, Some(max_packet_life_time)) => {
                if ordered {
                    (ChannelType::PartialReliableTimed, max_packet_life_time as u32)
                } else {
                    (
                        ChannelType::PartialReliableTimedUnordered,
                        max_packet_life_time as u32,
                    )
                }
            }
        }
    }
}

/// DATA_CHANNEL_OPEN
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Message Type |  Channel Type |            Priority           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                    Reliability Parameter                      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |         Label Length          |       Protocol Length         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             Label                             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            Protocol                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) struct DataChannelOpen {
    pub(crate) channel_type: ChannelType,
    pub(crate) priority: u16,
    pub(crate) reliability_parameter: u32,
    pub(crate) label: String,
    pub(crate) protocol: String,
}

/// A parsed DCEP message
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Message {
    DataChannelAck,
    DataChannelOpen(DataChannelOpen),
}

impl Message {
    pub(crate) fn marshal(&self) -> Result<Bytes> {
        match self {
            Message::DataChannelAck => Ok(Bytes::from_static(&[MESSAGE_TYPE_ACK])),
            Message::DataChannelOpen(open) => {
                let label_len =
                    u16::try_from(open.label.len()).map_err(|_| Error::ErrStringSizeLimit)?;
                let protocol_len =
                    u16::try_from(open.protocol.len()).map_err(|_| Error::ErrProtocolTooLarge)?;

                let mut buf = BytesMut::with_capacity(
                    CHANNEL_OPEN_HEADER_LEN + open.label.len() + open.protocol.len() + 1,
                );
                buf.put_u8(MESSAGE_TYPE_OPEN);
                buf.put_u8(open.channel_type.to_u8());
                buf.put_u16(open.priority);
                buf.put_u32(open.reliability_parameter);
                buf.put_u16(label_len);
                buf.put_u16(protocol_len);
                buf.put_slice(open.label.as_bytes());
                buf.put_slice(open.protocol.as_bytes());
                Ok(buf.freeze())
            }
        }
    }

    pub(crate) fn unmarshal(mut buf: &[u8]) -> Result<Self> {
        if buf.remaining() < 1 {
            return Err(Error::ErrBufferShort);
        }

        match buf.get_u8() {
            MESSAGE_TYPE_ACK => Ok(Message::DataChannelAck),
            MESSAGE_TYPE_OPEN => {
                if buf.remaining() < CHANNEL_OPEN_HEADER_LEN - 1 {
                    return Err(Error::ErrBufferShort);
                }

                let channel_type = ChannelType::from_u8(buf.get_u8())?;
                let priority = buf.get_u16();
                let reliability_parameter = buf.get_u32();
                let label_len = buf.get_u16() as usize;
                let protocol_len = buf.get_u16() as usize;

                if buf.remaining() < label_len + protocol_len {
                    return Err(Error::ErrBufferShort);
                }

                let label = String::from_utf8(buf[..label_len].to_vec())?;
                buf.advance(label_len);
                let protocol = String::from_utf8(buf[..protocol_len].to_vec())?;

                Ok(Message::DataChannelOpen(DataChannelOpen {
                    channel_type,
                    priority,
                    reliability_parameter,
                    label,
                    protocol,
                }))
            }
            typ => Err(Error::InvalidMessageType(typ)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_channel_open_marshal() -> Result<()> {
        let msg = Message::DataChannelOpen(DataChannelOpen {
            channel_type: ChannelType::PartialReliableRexmitUnordered,
            priority: CHANNEL_PRIORITY_NORMAL,
            reliability_parameter: 3,
            label: "foo".to_owned(),
            protocol: "bar".to_owned(),
        });

        let raw = msg.marshal()?;
        assert_eq!(
            &raw[..],
            &[
                0x03, 0x81, 0x01, 0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x03, 0x00, 0x03, 0x66,
                0x6f, 0x6f, 0x62, 0x61, 0x72,
            ]
        );
        assert_eq!(Message::unmarshal(&raw)?, msg);
        Ok(())
    }

    #[test]
    fn test_channel_ack() -> Result<()> {
        let raw = Message::DataChannelAck.marshal()?;
        assert_eq!(&raw[..], &[0x02]);
        assert_eq!(Message::unmarshal(&raw)?, Message::DataChannelAck);
        Ok(())
    }

    #[test]
    fn test_unmarshal_errors() {
        let tests: Vec<(&[u8], Error)> = vec![
            (&[], Error::ErrBufferShort),
            (&[0x01], Error::InvalidMessageType(0x01)),
            (&[0x03, 0x00, 0x00], Error::ErrBufferShort),
            (
                &[0x03, 0x7f, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
                Error::InvalidChannelType(0x7f),
            ),
            (
                &[0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00],
                Error::ErrBufferShort,
            ),
        ];

        for (raw, expected) in tests {
            assert_eq!(Message::unmarshal(raw), Err(expected));
        }
    }

    #[test]
    fn test_channel_type_from_parameters() {
        let tests = vec![
            ((true, None, None), (ChannelType::Reliable, 0)),
            ((false, None, None), (ChannelType::ReliableUnordered, 0)),
            ((true, Some(5), None), (ChannelType::PartialReliableRexmit, 5)),
            (
                (false, Some(5), None),
                (ChannelType::PartialReliableRexmitUnordered, 5),
            ),
            ((true, None, Some(100)), (ChannelType::PartialReliableTimed, 100)),
            (
                (false, None, Some(100)),
                (ChannelType::PartialReliableTimedUnordered, 100),
            ),
        ];

        for ((ordered, rexmit, lifetime), expected) in tests {
            assert_eq!(
                ChannelType::from_parameters(ordered, rexmit, lifetime),
                expected
            );
        }
    }
}
