//! MQTT packet flag definitions using `BeBytes` flag decomposition

use crate::error::{MqttError, Result};
use crate::QoS;
use bebytes::BeBytes;

/// Flags for MQTT CONNECT packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, BeBytes)]
#[bebytes(flags)]
pub enum ConnectFlags {
    /// Reserved bit - must be 0
    Reserved = 0x01,
    /// Clean Start flag
    CleanStart = 0x02,
    /// Will Flag
    WillFlag = 0x04,
    /// Will `QoS` bit 0
    WillQoS0 = 0x08,
    /// Will `QoS` bit 1
    WillQoS1 = 0x10,
    /// Will Retain flag
    WillRetain = 0x20,
    /// Password flag
    PasswordFlag = 0x40,
    /// Username flag
    UsernameFlag = 0x80,
}

impl ConnectFlags {
    /// Extract Will `QoS` value from flags
    #[must_use]
    pub fn extract_will_qos(flags: u8) -> u8 {
        (flags >> crate::constants::connect_flags::WILL_QOS_SHIFT)
            & crate::constants::connect_flags::WILL_QOS_MASK
    }

    #[must_use]
    /// Create flags byte with Will `QoS` value
    pub fn with_will_qos(mut flags: u8, qos: u8) -> u8 {
        flags &= crate::constants::connect_flags::WILL_QOS_CLEAR_MASK;
        flags |= (qos & crate::constants::connect_flags::WILL_QOS_MASK)
            << crate::constants::connect_flags::WILL_QOS_SHIFT;
        flags
    }

    fn is_set(self, flags: u8) -> bool {
        flags & (self as u8) != 0
    }
}

/// The CONNECT flags byte unpacked into its fields
///
/// Bit layout: username (7), password (6), will retain (5), will `QoS` (4-3),
/// will flag (2), clean start (1), reserved (0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectFlagSet {
    pub username: bool,
    pub password: bool,
    pub will_retain: bool,
    pub will_qos: QoS,
    pub will: bool,
    pub clean_start: bool,
}

impl Default for ConnectFlagSet {
    fn default() -> Self {
        Self {
            username: false,
            password: false,
            will_retain: false,
            will_qos: QoS::AtMostOnce,
            will: false,
            clean_start: false,
        }
    }
}

impl ConnectFlagSet {
    /// Packs the fields into the wire byte
    #[must_use]
    pub fn pack(&self) -> u8 {
        let mut flags = 0u8;
        if self.username {
            flags |= ConnectFlags::UsernameFlag as u8;
        }
        if self.password {
            flags |= ConnectFlags::PasswordFlag as u8;
        }
        if self.will_retain {
            flags |= ConnectFlags::WillRetain as u8;
        }
        if self.will {
            flags |= ConnectFlags::WillFlag as u8;
        }
        if self.clean_start {
            flags |= ConnectFlags::CleanStart as u8;
        }
        ConnectFlags::with_will_qos(flags, u8::from(self.will_qos))
    }

    /// Unpacks the wire byte
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the reserved bit is set, the will `QoS` is 3,
    /// or will `QoS`/retain are set without the will flag
    pub fn unpack(flags: u8) -> Result<Self> {
        if ConnectFlags::Reserved.is_set(flags) {
            return Err(MqttError::ProtocolError(
                "CONNECT reserved flag must be 0".to_string(),
            ));
        }

        let will_qos = QoS::try_from(ConnectFlags::extract_will_qos(flags))?;
        let set = Self {
            username: ConnectFlags::UsernameFlag.is_set(flags),
            password: ConnectFlags::PasswordFlag.is_set(flags),
            will_retain: ConnectFlags::WillRetain.is_set(flags),
            will_qos,
            will: ConnectFlags::WillFlag.is_set(flags),
            clean_start: ConnectFlags::CleanStart.is_set(flags),
        };

        if !set.will && (set.will_retain || set.will_qos != QoS::AtMostOnce) {
            return Err(MqttError::ProtocolError(
                "Will QoS and Will Retain must be 0 when the Will Flag is 0".to_string(),
            ));
        }

        Ok(set)
    }
}

/// Flags for MQTT PUBLISH packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, BeBytes)]
#[bebytes(flags)]
pub enum PublishFlags {
    /// Retain flag
    Retain = 0x01,
    /// `QoS` bit 0
    QoS0 = 0x02,
    /// `QoS` bit 1
    QoS1 = 0x04,
    /// Duplicate delivery flag
    Dup = 0x08,
}

impl PublishFlags {
    /// Extract `QoS` value from flags
    #[must_use]
    pub fn extract_qos(flags: u8) -> u8 {
        (flags >> crate::constants::publish_flags::QOS_SHIFT)
            & crate::constants::publish_flags::QOS_MASK
    }

    #[must_use]
    /// Create flags byte with `QoS` value
    pub fn with_qos(mut flags: u8, qos: u8) -> u8 {
        flags &= crate::constants::publish_flags::QOS_CLEAR_MASK;
        flags |= (qos & crate::constants::publish_flags::QOS_MASK)
            << crate::constants::publish_flags::QOS_SHIFT;
        flags
    }

    /// Builds the PUBLISH fixed header nibble
    #[must_use]
    pub fn pack(dup: bool, qos: QoS, retain: bool) -> u8 {
        let mut flags = 0u8;
        if dup {
            flags |= Self::Dup as u8;
        }
        if retain {
            flags |= Self::Retain as u8;
        }
        Self::with_qos(flags, u8::from(qos))
    }

    /// Returns true if DUP is set in the nibble
    #[must_use]
    pub fn is_dup(flags: u8) -> bool {
        flags & (Self::Dup as u8) != 0
    }

    /// Returns true if RETAIN is set in the nibble
    #[must_use]
    pub fn is_retain(flags: u8) -> bool {
        flags & (Self::Retain as u8) != 0
    }
}

/// Flags for MQTT CONNACK packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, BeBytes)]
#[bebytes(flags)]
pub enum ConnAckFlags {
    /// Session Present flag
    SessionPresent = 0x01,
}
