use bytes::{Bytes, BytesMut};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mqtt_packets::encoding::{decode_variable_int, encode_variable_int};
use mqtt_packets::packet::connect::ConnectPacket;
use mqtt_packets::packet::puback::PubAckPacket;
use mqtt_packets::packet::subscribe::{SubscribePacket, Subscription, SubscriptionOptions};
use mqtt_packets::*;
use std::hint::black_box;
use std::io::Cursor;

fn benchmark_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding");

    group.bench_function("connect", |b| {
        let packet = ControlPacket::from(
            ConnectPacket::new("bench-client-12345")
                .with_keep_alive(60)
                .with_credentials(Some("user".to_string()), Some(Bytes::from_static(b"pass"))),
        );
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(128);
            packet.encode(&mut buf).unwrap();
            black_box(&buf);
        });
    });

    for size in [64, 1024, 16384, 65536] {
        let packet = ControlPacket::from(
            PublishPacket::new("bench/topic/data", vec![0u8; size], QoS::AtLeastOnce)
                .with_packet_id(12345),
        );
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("publish_contiguous", size), &size, |b, &size| {
            b.iter(|| {
                let mut buf = BytesMut::with_capacity(size + 64);
                packet.encode(&mut buf).unwrap();
                black_box(&buf);
            });
        });

        group.bench_with_input(BenchmarkId::new("publish_vectored", size), &size, |b, &size| {
            let mut sink = Vec::with_capacity(size + 64);
            b.iter(|| {
                sink.clear();
                packet.write_to(&mut sink).unwrap();
                black_box(&sink);
            });
        });
    }

    group.bench_function("subscribe", |b| {
        let packet = ControlPacket::from(
            SubscribePacket::new(42)
                .add_filter("sensors/+/temperature", QoS::AtLeastOnce)
                .add_subscription(Subscription::with_options(
                    "alerts/#",
                    SubscriptionOptions::new(QoS::ExactlyOnce).with_no_local(true),
                )),
        );
        b.iter(|| black_box(packet.to_bytes().unwrap()));
    });

    group.finish();
}

fn benchmark_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoding");
    let config = CodecConfig::default();

    for size in [64, 1024, 16384, 65536] {
        let wire = ControlPacket::from(
            PublishPacket::new("bench/topic/data", vec![0u8; size], QoS::AtLeastOnce)
                .with_packet_id(12345),
        )
        .to_bytes()
        .unwrap();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("publish_in_memory", size), &wire, |b, wire| {
            b.iter(|| {
                let mut buf = wire.clone();
                black_box(ControlPacket::decode(&mut buf, &config).unwrap());
            });
        });

        group.bench_with_input(BenchmarkId::new("publish_reader", size), &wire, |b, wire| {
            b.iter(|| {
                let mut reader = Cursor::new(&wire[..]);
                black_box(read_packet_with_config(&mut reader, &config).unwrap());
            });
        });
    }

    group.bench_function("puback_short_form", |b| {
        let wire = ControlPacket::from(PubAckPacket::new(7)).to_bytes().unwrap();
        b.iter(|| {
            let mut buf = wire.clone();
            black_box(ControlPacket::decode(&mut buf, &config).unwrap());
        });
    });

    group.finish();
}

fn benchmark_variable_int(c: &mut Criterion) {
    let mut group = c.benchmark_group("variable_int");

    for value in [0u32, 127, 16_383, 2_097_151, 268_435_455] {
        group.bench_with_input(BenchmarkId::new("encode", value), &value, |b, &value| {
            let mut buf = BytesMut::with_capacity(4);
            b.iter(|| {
                buf.clear();
                encode_variable_int(&mut buf, black_box(value)).unwrap();
            });
        });

        let mut encoded = BytesMut::new();
        encode_variable_int(&mut encoded, value).unwrap();
        let encoded = encoded.freeze();
        group.bench_with_input(BenchmarkId::new("decode", value), &encoded, |b, encoded| {
            b.iter(|| {
                let mut buf = encoded.clone();
                black_box(decode_variable_int(&mut buf).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_encoding,
    benchmark_decoding,
    benchmark_variable_int
);
criterion_main!(benches);
