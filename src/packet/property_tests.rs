use crate::config::CodecConfig;
use crate::control::ControlPacket;
use crate::packet::auth::AuthPacket;
use crate::packet::connack::ConnAckPacket;
use crate::packet::connect::{ConnectPacket, WillMessage};
use crate::packet::disconnect::DisconnectPacket;
use crate::packet::pingreq::PingReqPacket;
use crate::packet::pingresp::PingRespPacket;
use crate::packet::puback::PubAckPacket;
use crate::packet::pubcomp::PubCompPacket;
use crate::packet::publish::PublishPacket;
use crate::packet::pubrec::PubRecPacket;
use crate::packet::pubrel::PubRelPacket;
use crate::packet::suback::{SubAckPacket, SubAckReasonCode};
use crate::packet::subscribe::{RetainHandling, SubscribePacket, Subscription, SubscriptionOptions};
use crate::packet::unsuback::{UnsubAckPacket, UnsubAckReasonCode};
use crate::packet::unsubscribe::UnsubscribePacket;
use crate::packet::Packet;
use crate::protocol::v5::properties::Properties;
use crate::protocol::v5::reason_codes::{ConnectReturnCode, ReasonCode};
use crate::protocol::ProtocolVersion;
use crate::QoS;
use bytes::Bytes;
use proptest::prelude::*;

fn version_strategy() -> impl Strategy<Value = ProtocolVersion> {
    prop_oneof![
        Just(ProtocolVersion::V31),
        Just(ProtocolVersion::V311),
        Just(ProtocolVersion::V5),
    ]
}

fn qos_strategy() -> impl Strategy<Value = QoS> {
    prop_oneof![
        Just(QoS::AtMostOnce),
        Just(QoS::AtLeastOnce),
        Just(QoS::ExactlyOnce),
    ]
}

/// Strings without U+0000, including multi-byte characters
fn mqtt_string_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9/_. é中-]{0,40}").unwrap()
}

/// Topic names: non-empty, no wildcards
fn topic_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9_]{1,10}(/[a-z0-9_]{1,10}){0,3}").unwrap()
}

fn topic_filter_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        topic_name_strategy(),
        topic_name_strategy().prop_map(|t| format!("{t}/#")),
        topic_name_strategy().prop_map(|t| format!("+/{t}")),
    ]
}

fn payload_strategy() -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..512).prop_map(Bytes::from)
}

/// Reason string plus user properties, valid wherever both are allowed
fn reason_properties_strategy() -> impl Strategy<Value = Properties> {
    (
        prop::option::of(mqtt_string_strategy()),
        prop::collection::vec((mqtt_string_strategy(), mqtt_string_strategy()), 0..3),
    )
        .prop_map(|(reason, user)| {
            let mut properties = Properties::new();
            if let Some(reason) = reason {
                properties.set_reason_string(reason);
            }
            for (key, value) in user {
                properties.add_user_property(key, value);
            }
            properties
        })
}

/// Attaches `properties` if the packet is laid out for 5.0
fn with_bag(bag: &mut Option<Properties>, properties: Properties) {
    if bag.is_some() {
        *bag = Some(properties);
    }
}

/// Encodes, decodes and re-encodes, checking struct and byte equality
fn assert_round_trip(packet: ControlPacket, version: ProtocolVersion) -> Result<(), TestCaseError> {
    let mut wire = Vec::new();
    let written = packet.write_to(&mut wire);
    prop_assert!(written.is_ok(), "encoding failed: {:?}", written);
    prop_assert_eq!(written.unwrap(), wire.len());

    let mut buf = Bytes::from(wire.clone());
    let decoded = ControlPacket::decode(&mut buf, &CodecConfig::new(version));
    prop_assert!(decoded.is_ok(), "decoding failed: {:?}", decoded);
    prop_assert!(buf.is_empty());

    let decoded = decoded.unwrap();
    prop_assert_eq!(&decoded.content, &packet.content);
    prop_assert_eq!(decoded.to_bytes().unwrap(), Bytes::from(wire));
    Ok(())
}

proptest! {
    #[test]
    fn test_connect_round_trip(
        version in version_strategy(),
        client_id in mqtt_string_strategy(),
        keep_alive in any::<u16>(),
        clean_start in any::<bool>(),
        will in prop::option::of((topic_name_strategy(), payload_strategy(), qos_strategy(), any::<bool>(), any::<u32>())),
        username in prop::option::of(mqtt_string_strategy()),
        password in prop::option::of(payload_strategy()),
        session_expiry in prop::option::of(any::<u32>()),
    ) {
        let mut connect = ConnectPacket::new(client_id)
            .with_version(version)
            .with_keep_alive(keep_alive)
            .with_clean_start(clean_start)
            .with_credentials(username, password);

        if let (Some(properties), Some(interval)) = (connect.properties.as_mut(), session_expiry) {
            properties.set_session_expiry_interval(interval);
        }

        if let Some((topic, payload, qos, retain, delay)) = will {
            connect = connect.with_will(WillMessage::new(topic, payload).with_qos(qos).with_retain(retain));
            if let Some(properties) = connect.will.as_mut().and_then(|w| w.properties.as_mut()) {
                properties.set_will_delay_interval(delay);
            }
        }

        assert_round_trip(connect.into(), version)?;
    }

    #[test]
    fn test_connack_round_trip(
        version in version_strategy(),
        session_present in any::<bool>(),
        refused in any::<bool>(),
        properties in reason_properties_strategy(),
    ) {
        let mut connack = if version.has_properties() {
            let code = if refused { ReasonCode::NotAuthorized } else { ReasonCode::Success };
            ConnAckPacket::new(session_present, code)
        } else {
            let code = if refused { ConnectReturnCode::NotAuthorized } else { ConnectReturnCode::Accepted };
            ConnAckPacket::new_v3(session_present, code)
        };
        with_bag(&mut connack.properties, properties);

        assert_round_trip(connack.into(), version)?;
    }

    #[test]
    fn test_publish_round_trip(
        version in version_strategy(),
        topic in topic_name_strategy(),
        payload in payload_strategy(),
        qos in qos_strategy(),
        packet_id in 1u16..=u16::MAX,
        retain in any::<bool>(),
        dup in any::<bool>(),
        expiry in prop::option::of(any::<u32>()),
        subscription_ids in prop::collection::vec(1u32..=268_435_455, 0..3),
    ) {
        let mut publish = PublishPacket::new(topic, payload, qos)
            .with_version(version)
            .with_packet_id(packet_id)
            .with_retain(retain)
            .with_dup(dup);

        if let Some(properties) = publish.properties.as_mut() {
            if let Some(expiry) = expiry {
                properties.set_message_expiry_interval(expiry);
            }
            for id in subscription_ids {
                properties.add_subscription_identifier(id);
            }
        }

        assert_round_trip(publish.into(), version)?;
    }

    #[test]
    fn test_ack_round_trip(
        version in version_strategy(),
        packet_id in any::<u16>(),
        kind in 0u8..4,
        failed in any::<bool>(),
        properties in reason_properties_strategy(),
    ) {
        let packet: ControlPacket = match kind {
            0 => {
                let code = if failed { ReasonCode::QuotaExceeded } else { ReasonCode::Success };
                let mut p = PubAckPacket::new_with_reason(packet_id, code).with_version(version);
                with_bag(&mut p.properties, properties);
                if p.properties.is_none() { p.reason_code = ReasonCode::Success; }
                p.into()
            }
            1 => {
                let code = if failed { ReasonCode::NoMatchingSubscribers } else { ReasonCode::Success };
                let mut p = PubRecPacket::new_with_reason(packet_id, code).with_version(version);
                with_bag(&mut p.properties, properties);
                if p.properties.is_none() { p.reason_code = ReasonCode::Success; }
                p.into()
            }
            2 => {
                let code = if failed { ReasonCode::PacketIdentifierNotFound } else { ReasonCode::Success };
                let mut p = PubRelPacket::new_with_reason(packet_id, code).with_version(version);
                with_bag(&mut p.properties, properties);
                if p.properties.is_none() { p.reason_code = ReasonCode::Success; }
                p.into()
            }
            _ => {
                let code = if failed { ReasonCode::PacketIdentifierNotFound } else { ReasonCode::Success };
                let mut p = PubCompPacket::new_with_reason(packet_id, code).with_version(version);
                with_bag(&mut p.properties, properties);
                if p.properties.is_none() { p.reason_code = ReasonCode::Success; }
                p.into()
            }
        };

        assert_round_trip(packet, version)?;
    }

    #[test]
    fn test_subscribe_round_trip(
        version in version_strategy(),
        packet_id in any::<u16>(),
        entries in prop::collection::vec(
            (topic_filter_strategy(), qos_strategy(), any::<bool>(), any::<bool>(), 0u8..3),
            1..5,
        ),
        subscription_id in prop::option::of(1u32..=268_435_455),
    ) {
        let mut subscribe = SubscribePacket::new(packet_id).with_version(version);
        for (filter, qos, no_local, rap, rh) in entries {
            let mut options = SubscriptionOptions::new(qos);
            if version.has_properties() {
                options = options
                    .with_no_local(no_local)
                    .with_retain_as_published(rap)
                    .with_retain_handling(RetainHandling::try_from(rh).unwrap());
            }
            subscribe = subscribe.add_subscription(Subscription::with_options(filter, options));
        }
        if let (true, Some(id)) = (version.has_properties(), subscription_id) {
            subscribe = subscribe.with_subscription_identifier(id);
        }

        assert_round_trip(subscribe.into(), version)?;
    }

    #[test]
    fn test_suback_round_trip(
        version in version_strategy(),
        packet_id in any::<u16>(),
        codes in prop::collection::vec(prop_oneof![
            Just(SubAckReasonCode::GrantedQoS0),
            Just(SubAckReasonCode::GrantedQoS1),
            Just(SubAckReasonCode::GrantedQoS2),
            Just(SubAckReasonCode::UnspecifiedError),
            Just(SubAckReasonCode::NotAuthorized),
            Just(SubAckReasonCode::QuotaExceeded),
        ], 0..6),
        properties in reason_properties_strategy(),
    ) {
        let mut suback = SubAckPacket::new(packet_id).with_version(version);
        for code in codes {
            if version.has_properties() || code.is_v3() {
                suback = suback.add_reason_code(code);
            }
        }
        with_bag(&mut suback.properties, properties);

        assert_round_trip(suback.into(), version)?;
    }

    #[test]
    fn test_unsubscribe_round_trip(
        version in version_strategy(),
        packet_id in any::<u16>(),
        filters in prop::collection::vec(topic_filter_strategy(), 1..5),
    ) {
        let mut unsubscribe = UnsubscribePacket::new(packet_id).with_version(version);
        for filter in filters {
            unsubscribe = unsubscribe.add_filter(filter);
        }

        assert_round_trip(unsubscribe.into(), version)?;
    }

    #[test]
    fn test_unsuback_round_trip(
        version in version_strategy(),
        packet_id in any::<u16>(),
        codes in prop::collection::vec(prop_oneof![
            Just(UnsubAckReasonCode::Success),
            Just(UnsubAckReasonCode::NoSubscriptionExisted),
            Just(UnsubAckReasonCode::TopicFilterInvalid),
        ], 0..4),
        properties in reason_properties_strategy(),
    ) {
        let mut unsuback = UnsubAckPacket::new(packet_id);
        for code in codes {
            unsuback = unsuback.add_reason_code(code);
        }
        unsuback = unsuback.with_version(version);
        with_bag(&mut unsuback.properties, properties);

        assert_round_trip(unsuback.into(), version)?;
    }

    #[test]
    fn test_disconnect_and_auth_round_trip(
        version in version_strategy(),
        reason in prop_oneof![
            Just(ReasonCode::Success),
            Just(ReasonCode::ServerShuttingDown),
            Just(ReasonCode::KeepAliveTimeout),
        ],
        auth_reason in prop_oneof![
            Just(ReasonCode::Success),
            Just(ReasonCode::ContinueAuthentication),
            Just(ReasonCode::ReAuthenticate),
        ],
        properties in reason_properties_strategy(),
        method in prop::option::of(mqtt_string_strategy()),
    ) {
        let mut disconnect = DisconnectPacket::new(reason).with_version(version);
        if disconnect.properties.is_none() {
            disconnect.reason_code = ReasonCode::Success;
        }
        with_bag(&mut disconnect.properties, properties.clone());
        assert_round_trip(disconnect.into(), version)?;

        if version.has_properties() {
            let mut auth = AuthPacket::new(auth_reason);
            with_bag(&mut auth.properties, properties);
            if let Some(method) = method {
                auth = auth.with_method(method, None);
            }
            assert_round_trip(auth.into(), version)?;
        }
    }

    #[test]
    fn test_ping_round_trip(version in version_strategy()) {
        assert_round_trip(PingReqPacket.into(), version)?;
        assert_round_trip(PingRespPacket.into(), version)?;
    }

    /// Every zero-valued packet that can be encoded decodes back unchanged
    #[test]
    fn test_zero_valued_packets(version in version_strategy(), tag in 1u8..=15) {
        let packet = ControlPacket::new(crate::packet::PacketType::from_u8(tag).unwrap(), version);
        let encodable = !matches!(
            &packet.content,
            Packet::Subscribe(_) | Packet::Unsubscribe(_)
        ) && !(matches!(&packet.content, Packet::Auth(_)) && !version.has_properties());

        if encodable {
            assert_round_trip(packet, version)?;
        } else {
            prop_assert!(packet.to_bytes().is_err());
        }
    }

    /// Arbitrary bytes never panic the decoder
    #[test]
    fn test_decode_arbitrary_bytes(
        version in version_strategy(),
        bytes in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let mut buf = Bytes::from(bytes);
        let _ = ControlPacket::decode(&mut buf, &CodecConfig::new(version));
    }
}
