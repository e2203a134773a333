//! The SCTP association seam. Data channels only need reliable/partially
//! reliable user messages tagged with a payload protocol identifier; the
//! association itself is provided by an [`SctpFactory`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use util::Conn;

use shared::error::{Error, Result};

/// PayloadProtocolIdentifier is an enum for DataChannel payload types
/// <https://www.iana.org/assignments/sctp-parameters/sctp-parameters.xhtml#sctp-parameters-25>
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(C)]
pub enum PayloadProtocolIdentifier {
    Dcep = 50,
    String = 51,
    Binary = 53,
    StringEmpty = 56,
    BinaryEmpty = 57,
    #[default]
    Unknown,
}

impl fmt::Display for PayloadProtocolIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            PayloadProtocolIdentifier::Dcep => "WebRTC DCEP",
            PayloadProtocolIdentifier::String => "WebRTC String",
            PayloadProtocolIdentifier::Binary => "WebRTC Binary",
            PayloadProtocolIdentifier::StringEmpty => "WebRTC String (Empty)",
            PayloadProtocolIdentifier::BinaryEmpty => "WebRTC Binary (Empty)",
            _ => "Unknown Payload Protocol Identifier",
        };
        write!(f, "{s}")
    }
}

impl From<u32> for PayloadProtocolIdentifier {
    fn from(v: u32) -> PayloadProtocolIdentifier {
        match v {
            50 => PayloadProtocolIdentifier::Dcep,
            51 => PayloadProtocolIdentifier::String,
            53 => PayloadProtocolIdentifier::Binary,
            56 => PayloadProtocolIdentifier::StringEmpty,
            57 => PayloadProtocolIdentifier::BinaryEmpty,
            _ => PayloadProtocolIdentifier::Unknown,
        }
    }
}

impl PayloadProtocolIdentifier {
    /// to_u32 returns the wire value; Unknown has none.
    pub fn to_u32(self) -> Result<u32> {
        match self {
            PayloadProtocolIdentifier::Unknown => {
                Err(Error::InvalidPayloadProtocolIdentifier(0))
            }
            ppi => Ok(ppi as u32),
        }
    }
}

/// ReliabilityType selects how a stream retransmits.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReliabilityType {
    /// Reliable is used for reliable transmission
    #[default]
    Reliable,
    /// Rexmit is used for partial reliability by retransmission count
    Rexmit,
    /// Timed is used for partial reliability by retransmission duration
    Timed,
}

/// SctpConfig is passed to the association factory.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SctpConfig {
    pub max_receive_buffer_size: u32,
    pub max_message_size: u32,
}

pub type OnBufferedAmountLowFn =
    Box<dyn (FnMut() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

/// SctpStream is one bidirectional SCTP stream.
#[async_trait]
pub trait SctpStream {
    fn stream_identifier(&self) -> u16;

    /// write_sctp sends one user message.
    async fn write_sctp(&self, data: &Bytes, ppi: PayloadProtocolIdentifier) -> Result<usize>;

    /// read_sctp reads one user message. `Error::ErrEof` is returned once the
    /// remote has reset the stream.
    async fn read_sctp(&self, buf: &mut [u8]) -> Result<(usize, PayloadProtocolIdentifier)>;

    fn set_reliability_params(&self, unordered: bool, rel_type: ReliabilityType, rel_val: u32);

    /// buffered_amount returns the number of bytes of data currently queued to be sent over this stream.
    fn buffered_amount(&self) -> usize;

    fn buffered_amount_low_threshold(&self) -> usize;

    fn set_buffered_amount_low_threshold(&self, th: usize);

    /// on_buffered_amount_low fires once each time the buffered amount drops
    /// from above the threshold to at or below it.
    fn on_buffered_amount_low(&self, f: OnBufferedAmountLowFn);

    /// shutdown resets the outgoing stream; the remote reader observes EOF.
    async fn shutdown(&self) -> Result<()>;
}

/// SctpAssociation multiplexes streams over one DTLS connection.
#[async_trait]
pub trait SctpAssociation {
    async fn open_stream(
        &self,
        stream_identifier: u16,
        default_payload_type: PayloadProtocolIdentifier,
    ) -> Result<Arc<dyn SctpStream + Send + Sync>>;

    /// accept_stream waits for a stream opened by the remote; None once the
    /// association is closed.
    async fn accept_stream(&self) -> Option<Arc<dyn SctpStream + Send + Sync>>;

    /// max_message_size is the largest message this side can send; 0 means unknown.
    fn max_message_size(&self) -> u32;

    async fn close(&self) -> Result<()>;
}

/// SctpFactory establishes associations over a DTLS connection.
#[async_trait]
pub trait SctpFactory {
    async fn client(
        &self,
        conn: Arc<dyn Conn + Send + Sync>,
        config: SctpConfig,
    ) -> Result<Arc<dyn SctpAssociation + Send + Sync>>;

    async fn server(
        &self,
        conn: Arc<dyn Conn + Send + Sync>,
        config: SctpConfig,
    ) -> Result<Arc<dyn SctpAssociation + Send + Sync>>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_payload_protocol_identifier() {
        let tests = vec![
            (50, PayloadProtocolIdentifier::Dcep),
            (51, PayloadProtocolIdentifier::String),
            (53, PayloadProtocolIdentifier::Binary),
            (56, PayloadProtocolIdentifier::StringEmpty),
            (57, PayloadProtocolIdentifier::BinaryEmpty),
            (52, PayloadProtocolIdentifier::Unknown),
        ];

        for (value, expected) in tests {
            let ppi: PayloadProtocolIdentifier = value.into();
            assert_eq!(ppi, expected);
            if ppi != PayloadProtocolIdentifier::Unknown {
                assert_eq!(ppi.to_u32(), Ok(value));
            }
        }
        assert!(PayloadProtocolIdentifier::Unknown.to_u32().is_err());
    }
}
