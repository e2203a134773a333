/// Parameters describing the configuration of a DataChannel.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct DataChannelParameters {
    /// The label that can be used to distinguish this DataChannel from others.
    pub label: String,

    /// The name of the sub-protocol in use.
    pub protocol: String,

    /// Whether the data channel guarantees in-order delivery of messages.
    pub ordered: bool,

    /// The maximum time in milliseconds during which transmissions and
    /// retransmissions may occur in unreliable mode.
    pub max_packet_life_time: Option<u16>,

    /// The maximum number of retransmission attempts in unreliable mode.
    pub max_retransmits: Option<u16>,

    /// The data channel ID if this channel was negotiated by the application.
    /// None if the channel was not pre-negotiated.
    pub negotiated: Option<u16>,
}
