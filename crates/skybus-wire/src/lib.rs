//! skybus Wire - Chunked datagram codec and message envelope
//!
//! A logical message travels as a train of UDP datagrams: byte 0 is a
//! wrapping chunk sequence number, the rest is payload. The terminal chunk is
//! the first one shorter than [`CHUNK_PAYLOAD_SIZE`]. Above the chunk layer,
//! a message is a JSON envelope optionally followed by `\0` + raw binary.

pub mod binary;
pub mod chunk;
pub mod envelope;
pub mod kind;

pub use binary::*;
pub use chunk::*;
pub use envelope::*;
pub use kind::*;
