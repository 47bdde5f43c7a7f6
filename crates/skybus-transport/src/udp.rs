//! Chunked UDP transport implementation

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use skybus_core::{BusError, BusResult};
use skybus_wire::{split_message, Reassembler, MAX_DATAGRAM_SIZE};

/// Completed messages with their sender address.
pub type MessageReceiver = mpsc::Receiver<(Vec<u8>, SocketAddr)>;

/// Buffered messages between the receive loop and the consumer.
const RECEIVE_QUEUE_DEPTH: usize = 64;

/// UDP socket speaking the chunked message framing.
///
/// `send_to` fragments and transmits under a send lock so chunks of two
/// concurrently sent messages never interleave on the wire. `start` spawns
/// the single background receive loop which reassembles inbound chunks per
/// source and emits complete messages.
pub struct ChunkSocket {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    send_lock: tokio::sync::Mutex<()>,
    reassembly_timeout: Duration,
    started: AtomicBool,
    receive_task: Mutex<Option<JoinHandle<()>>>,
}

impl ChunkSocket {
    /// Bind to a local address. Bind failure is fatal for the broker, so
    /// callers propagate this error up to process exit.
    pub async fn bind(addr: SocketAddr, reassembly_timeout: Duration) -> BusResult<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| BusError::Transport(format!("bind {addr}: {e}")))?;

        let local_addr = socket
            .local_addr()
            .map_err(|e| BusError::Transport(e.to_string()))?;

        Ok(ChunkSocket {
            socket: Arc::new(socket),
            local_addr,
            send_lock: tokio::sync::Mutex::new(()),
            reassembly_timeout,
            started: AtomicBool::new(false),
            receive_task: Mutex::new(None),
        })
    }

    /// Get local address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Launch the background receive loop. Fails if called twice.
    pub fn start(&self) -> BusResult<MessageReceiver> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(BusError::AlreadyStarted);
        }

        let (tx, rx) = mpsc::channel(RECEIVE_QUEUE_DEPTH);
        let socket = Arc::clone(&self.socket);
        let mut reassembler = Reassembler::new(self.reassembly_timeout);

        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, addr)) => {
                        let Some(message) = reassembler.push(addr, &buf[..len]) else {
                            continue;
                        };
                        if tx.send((message, addr)).await.is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => {
                        tracing::warn!("UDP receive error: {}", e);
                    }
                }
            }
        });

        *self.receive_task.lock() = Some(task);
        Ok(rx)
    }

    /// Stop the receive loop. Idempotent; safe to call without `start`.
    pub fn stop(&self) {
        if let Some(task) = self.receive_task.lock().take() {
            task.abort();
        }
    }

    /// Send one logical message as a train of chunk datagrams. No
    /// retransmission, no acknowledgment.
    pub async fn send_to(&self, message: &[u8], dest: SocketAddr) -> BusResult<()> {
        let chunks = split_message(message)?;

        let _guard = self.send_lock.lock().await;
        for chunk in &chunks {
            self.socket
                .send_to(chunk, dest)
                .await
                .map_err(|e| BusError::Transport(format!("send to {dest}: {e}")))?;
        }
        Ok(())
    }
}

impl Drop for ChunkSocket {
    fn drop(&mut self) {
        self.stop();
    }
}
