//! MQTT Protocol Constants
//!
//! Masks, fixed header bytes and protocol limits shared by the packet codecs.

use crate::packet::PacketType;

/// Fixed header byte 1 values (packet type << 4 | flags)
pub mod fixed_header {
    /// CONNECT packet fixed header (0x10)
    pub const CONNECT: u8 = (super::PacketType::Connect as u8) << 4;

    /// CONNACK packet fixed header (0x20)
    pub const CONNACK: u8 = (super::PacketType::ConnAck as u8) << 4;

    /// PUBLISH packet fixed header base (0x30) - flags vary
    pub const PUBLISH_BASE: u8 = (super::PacketType::Publish as u8) << 4;

    /// PUBACK packet fixed header (0x40)
    pub const PUBACK: u8 = (super::PacketType::PubAck as u8) << 4;

    /// PUBREL packet fixed header (0x62)
    pub const PUBREL: u8 = (super::PacketType::PubRel as u8) << 4 | super::flags::PUBREL;

    /// SUBSCRIBE packet fixed header (0x82)
    pub const SUBSCRIBE: u8 = (super::PacketType::Subscribe as u8) << 4 | super::flags::SUBSCRIBE;

    /// UNSUBSCRIBE packet fixed header (0xA2)
    pub const UNSUBSCRIBE: u8 =
        (super::PacketType::Unsubscribe as u8) << 4 | super::flags::UNSUBSCRIBE;

    /// PINGREQ packet fixed header (0xC0)
    pub const PINGREQ: u8 = (super::PacketType::PingReq as u8) << 4;

    /// PINGRESP packet fixed header (0xD0)
    pub const PINGRESP: u8 = (super::PacketType::PingResp as u8) << 4;

    /// AUTH packet fixed header (0xF1)
    pub const AUTH: u8 = (super::PacketType::Auth as u8) << 4 | super::flags::AUTH;
}

/// Protocol-fixed fixed header flag nibbles
pub mod flags {
    pub const PUBREL: u8 = 0x02;
    pub const SUBSCRIBE: u8 = 0x02;
    pub const UNSUBSCRIBE: u8 = 0x02;
    pub const AUTH: u8 = 0x01;
}

/// Masks for extracting fields from fixed header
pub mod masks {
    /// Mask for extracting flags from fixed header byte 1 (0x0F)
    pub const FLAGS: u8 = 0x0F;

    /// Mask for checking continuation bit in variable byte integer (0x80)
    pub const CONTINUATION_BIT: u8 = 0x80;

    /// Mask for extracting value from variable byte integer (0x7F)
    pub const VARIABLE_BYTE_VALUE: u8 = 0x7F;
}

/// Subscription option masks
pub mod subscription {
    /// Mask for `QoS` bits (bits 0-1)
    pub const QOS_MASK: u8 = 0x03;

    /// Mask for No Local flag (bit 2)
    pub const NO_LOCAL_MASK: u8 = 0x04;

    /// Mask for Retain As Published flag (bit 3)
    pub const RETAIN_AS_PUBLISHED_MASK: u8 = 0x08;

    /// Mask for Retain Handling (bits 4-5)
    pub const RETAIN_HANDLING_MASK: u8 = 0x30;

    /// Shift for Retain Handling
    pub const RETAIN_HANDLING_SHIFT: u8 = 4;

    /// Mask for reserved bits (bits 6-7)
    pub const RESERVED_BITS_MASK: u8 = 0xC0;

    /// Bits that must be clear in MQTT 3.1.1 and earlier (bits 2-7)
    pub const V3_RESERVED_BITS_MASK: u8 = 0xFC;
}

/// CONNECT flags masks
pub mod connect_flags {
    /// Mask for clearing Will `QoS` bits (bits 3-4)
    pub const WILL_QOS_CLEAR_MASK: u8 = !0x18;
    /// Mask for extracting Will `QoS` (bits 3-4 shifted)
    pub const WILL_QOS_MASK: u8 = 0x03;
    /// Shift for Will `QoS`
    pub const WILL_QOS_SHIFT: u8 = 3;
}

/// PUBLISH flags masks
pub mod publish_flags {
    /// Mask for clearing `QoS` bits (bits 1-2)
    pub const QOS_CLEAR_MASK: u8 = !0x06;
    /// Mask for extracting `QoS` (bits 1-2 shifted)
    pub const QOS_MASK: u8 = 0x03;
    /// Shift for `QoS`
    pub const QOS_SHIFT: u8 = 1;
}

/// String, integer and packet size limits
pub mod limits {
    /// Maximum string length in MQTT (65535)
    pub const MAX_STRING_LENGTH: u16 = u16::MAX;

    /// Maximum binary data length (65535)
    pub const MAX_BINARY_LENGTH: u16 = u16::MAX;

    /// Maximum value of a variable byte integer (268,435,455)
    pub const MAX_VARIABLE_INT: u32 = 268_435_455;

    /// Maximum remaining length of a control packet
    pub const MAX_REMAINING_LENGTH: u32 = MAX_VARIABLE_INT;

    /// Maximum number of bytes in an encoded variable byte integer
    pub const MAX_VARIABLE_INT_BYTES: usize = 4;

    /// Remaining length above which a received packet is logged at debug level
    pub const LARGE_PACKET_THRESHOLD: u32 = 10_000;
}

/// Protocol name strings carried in CONNECT
pub mod protocol_name {
    /// Protocol name for MQTT 3.1
    pub const MQISDP: &str = "MQIsdp";

    /// Protocol name for MQTT 3.1.1 and 5.0
    pub const MQTT: &str = "MQTT";
}
