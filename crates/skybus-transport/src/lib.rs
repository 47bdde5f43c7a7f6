//! skybus Transport - Chunked UDP socket
//!
//! One physical datagram carries one chunk; the socket layer reassembles
//! complete logical messages before handing them to the consumer.

pub mod udp;

pub use udp::*;
