//! Chunk fragmentation and per-source reassembly
//!
//! Fragmentation: the payload is cut into [`CHUNK_PAYLOAD_SIZE`] slices, each
//! prefixed with a 1-byte sequence number starting at 0. A message whose
//! length is an exact multiple of the chunk size gets an explicit zero-length
//! terminal chunk, so the receiver can always detect the end by "payload
//! shorter than chunk size". There is no retransmission and no ack.
//!
//! Reassembly is keyed by source address. The legacy implementation this
//! replaces kept one buffer for all senders, which let two concurrently
//! sending peers corrupt each other's messages; partitioning per source and
//! expiring stale partial buffers closes that hole.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use skybus_core::{BusError, BusResult};

/// Largest payload a single UDP datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Sequence prefix in front of every chunk payload.
pub const CHUNK_HEADER_SIZE: usize = 1;

/// Fixed chunk payload size. Kept well under [`MAX_DATAGRAM_SIZE`] so the
/// sequence byte and lower-layer overhead always fit.
pub const CHUNK_PAYLOAD_SIZE: usize = MAX_DATAGRAM_SIZE - 1_000;

/// Sequence numbers are a single wrapping byte, so a message may span at
/// most 256 chunks (terminal chunk included).
pub const MAX_MESSAGE_SIZE: usize = 256 * CHUNK_PAYLOAD_SIZE;

/// Split a message into sequence-prefixed chunk datagrams.
///
/// Always produces at least one chunk; the last chunk's payload is strictly
/// shorter than [`CHUNK_PAYLOAD_SIZE`] (possibly empty).
pub fn split_message(message: &[u8]) -> BusResult<Vec<Vec<u8>>> {
    if message.len() >= MAX_MESSAGE_SIZE {
        return Err(BusError::MessageTooLarge {
            size: message.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut chunks = Vec::with_capacity(message.len() / CHUNK_PAYLOAD_SIZE + 1);
    let mut seq: u8 = 0;

    for payload in message.chunks(CHUNK_PAYLOAD_SIZE) {
        let mut datagram = Vec::with_capacity(CHUNK_HEADER_SIZE + payload.len());
        datagram.push(seq);
        datagram.extend_from_slice(payload);
        chunks.push(datagram);
        seq = seq.wrapping_add(1);
    }

    // Exact multiples (and the empty message) need an explicit terminal chunk.
    if message.len() % CHUNK_PAYLOAD_SIZE == 0 {
        chunks.push(vec![seq]);
    }

    Ok(chunks)
}

#[derive(Debug)]
struct Partial {
    chunks: BTreeMap<u8, Vec<u8>>,
    last_update: Instant,
}

/// Per-source reassembly state.
///
/// `push` accumulates chunks until the terminal (undersized) chunk of that
/// source arrives, then yields the concatenation in sequence-number order.
/// Arrival order does not matter as long as all sequence numbers of one
/// message are distinct, which holds for any message under
/// [`MAX_MESSAGE_SIZE`].
#[derive(Debug)]
pub struct Reassembler {
    timeout: Duration,
    buffers: HashMap<SocketAddr, Partial>,
}

impl Reassembler {
    pub fn new(timeout: Duration) -> Self {
        Reassembler {
            timeout,
            buffers: HashMap::new(),
        }
    }

    /// Feed one received datagram. Returns the complete message when this
    /// chunk terminates it. Empty datagrams (no sequence byte) are dropped.
    pub fn push(&mut self, src: SocketAddr, datagram: &[u8]) -> Option<Vec<u8>> {
        let (&seq, payload) = datagram.split_first()?;

        let now = Instant::now();
        self.evict_stale(now);

        let terminal = payload.len() < CHUNK_PAYLOAD_SIZE;

        let partial = self.buffers.entry(src).or_insert_with(|| Partial {
            chunks: BTreeMap::new(),
            last_update: now,
        });
        partial.chunks.insert(seq, payload.to_vec());
        partial.last_update = now;

        if !terminal {
            return None;
        }

        let partial = self.buffers.remove(&src)?;
        let mut message =
            Vec::with_capacity(partial.chunks.values().map(Vec::len).sum());
        for chunk in partial.chunks.values() {
            message.extend_from_slice(chunk);
        }
        Some(message)
    }

    /// Number of sources with partial state, for diagnostics.
    pub fn pending_sources(&self) -> usize {
        self.buffers.len()
    }

    fn evict_stale(&mut self, now: Instant) {
        let timeout = self.timeout;
        self.buffers
            .retain(|_, partial| now.duration_since(partial.last_update) < timeout);
    }
}
