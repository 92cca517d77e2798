//! Async transport glue for tokio byte streams

pub mod packet_io;

pub use packet_io::{read_packet_async, PacketIo};
