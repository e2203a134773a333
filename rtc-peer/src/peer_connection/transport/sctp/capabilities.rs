use serde::{Deserialize, Serialize};

/// SCTPTransportCapabilities indicates the capabilities of the SCTPTransport.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub struct SCTPTransportCapabilities {
    /// max_message_size announced by the remote; 0 means unknown.
    pub max_message_size: u32,
}
