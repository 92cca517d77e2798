//! Protocol revisions and version-dependent wire details

pub mod v5;

use crate::constants::protocol_name;
use crate::error::{MqttError, Result};
use std::fmt;

/// MQTT protocol revision, identified by the protocol level byte in CONNECT
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ProtocolVersion {
    /// MQTT 3.1, protocol name "MQIsdp"
    V31 = 3,
    /// MQTT 3.1.1
    V311 = 4,
    /// MQTT 5.0
    #[default]
    V5 = 5,
}

impl ProtocolVersion {
    /// Protocol name carried in the CONNECT variable header
    #[must_use]
    pub fn protocol_name(self) -> &'static str {
        match self {
            Self::V31 => protocol_name::MQISDP,
            Self::V311 | Self::V5 => protocol_name::MQTT,
        }
    }

    /// Returns true if packets of this revision carry property blocks
    #[must_use]
    pub fn has_properties(self) -> bool {
        self == Self::V5
    }

    #[must_use]
    pub fn level(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = MqttError;

    fn try_from(level: u8) -> Result<Self> {
        match level {
            3 => Ok(Self::V31),
            4 => Ok(Self::V311),
            5 => Ok(Self::V5),
            other => Err(MqttError::UnsupportedProtocolVersion(other)),
        }
    }
}

impl From<ProtocolVersion> for u8 {
    fn from(version: ProtocolVersion) -> Self {
        version as u8
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V31 => f.write_str("3.1"),
            Self::V311 => f.write_str("3.1.1"),
            Self::V5 => f.write_str("5.0"),
        }
    }
}
