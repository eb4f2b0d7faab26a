//! Multi-process group over a TCP mesh
//!
//! Every member is a separate process started with the same host list and
//! its own rank. Setup builds one connection per pair of members:
//!
//! - rank `r` listens on `hosts[r]`
//! - connects to every lower rank (retrying until the connect timeout) and
//!   introduces itself with a HELLO frame
//! - accepts one connection from every higher rank and identifies it by HELLO
//!
//! After setup the transport owns a tokio runtime. One reader task per peer
//! decodes frames into the member's crossbeam inbox; outbound frames are
//! written through a per-peer lock with `block_on`, so the group primitives
//! stay blocking calls.

use super::protocol::*;
use super::{GroupContext, Transport};
use crate::error::GroupError;
use anyhow::{Context, Result};
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout, Instant};

/// Pause between connection attempts to a member that is not listening yet
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// TCP mesh transport for one member
pub struct TcpTransport {
    rank: usize,
    runtime: Runtime,
    /// Write halves indexed by rank (own rank slot is None)
    writers: Vec<Option<Arc<Mutex<OwnedWriteHalf>>>>,
    /// Packets addressed to ourselves skip the network
    loopback: Sender<Packet>,
}

impl TcpTransport {
    /// Join the mesh described by `hosts` as member `rank`
    ///
    /// All members must call this with the same host list. Returns the
    /// transport and the inbox that receives every packet sent to `rank`.
    pub fn connect(rank: usize, hosts: &[SocketAddr], connect_timeout: Duration) -> Result<(Self, Receiver<Packet>)> {
        if rank >= hosts.len() {
            anyhow::bail!("rank {} is outside a host list of {} members", rank, hosts.len());
        }

        let runtime = Runtime::new().context("Failed to create tokio runtime")?;
        let streams = runtime.block_on(establish_mesh(rank, hosts, connect_timeout))?;

        let (inbox_tx, inbox_rx) = unbounded();
        let mut writers = Vec::with_capacity(hosts.len());
        for (peer, stream) in streams.into_iter().enumerate() {
            match stream {
                Some(stream) => {
                    let (read_half, write_half) = stream.into_split();
                    runtime.spawn(pump_inbound(peer, read_half, inbox_tx.clone()));
                    writers.push(Some(Arc::new(Mutex::new(write_half))));
                }
                None => writers.push(None),
            }
        }

        tracing::debug!(rank, members = hosts.len(), "tcp mesh established");

        Ok((
            Self {
                rank,
                runtime,
                writers,
                loopback: inbox_tx,
            },
            inbox_rx,
        ))
    }

    /// Join the mesh and wrap the transport in a [`GroupContext`]
    pub fn join(rank: usize, hosts: &[SocketAddr], connect_timeout: Duration) -> Result<GroupContext> {
        let (transport, inbox) = Self::connect(rank, hosts, connect_timeout)?;
        Ok(GroupContext::new(rank, hosts.len(), Box::new(transport), inbox))
    }

    fn writer(&self, dest: usize) -> Result<Arc<Mutex<OwnedWriteHalf>>, GroupError> {
        self.writers
            .get(dest)
            .and_then(|w| w.clone())
            .ok_or(GroupError::InvalidRank {
                rank: dest,
                size: self.writers.len(),
            })
    }
}

impl Transport for TcpTransport {
    fn deliver(&self, dest: usize, packet: Packet) -> Result<(), GroupError> {
        if dest == self.rank {
            return self
                .loopback
                .send(packet)
                .map_err(|_| GroupError::Disconnected { peer: dest });
        }

        let (header, payload) = match packet {
            Packet::Data { tag, payload, .. } => (
                FrameHeader::Data {
                    tag,
                    payload_len: payload.len() as u64,
                },
                payload,
            ),
            Packet::Abort { code, .. } => (FrameHeader::Abort { code }, Vec::new()),
            // Closing is signalled by the socket itself
            Packet::Closed { .. } => return Ok(()),
        };

        let writer = self.writer(dest)?;
        self.runtime
            .block_on(async move {
                let mut stream = writer.lock().await;
                write_frame(&mut *stream, &header, &payload).await
            })
            .map_err(|e| {
                tracing::debug!(peer = dest, error = %e, "send failed");
                GroupError::Disconnected { peer: dest }
            })
    }

    fn name(&self) -> &'static str {
        "tcp"
    }

    fn max_payload_len(&self) -> usize {
        MAX_PAYLOAD_LEN as usize
    }
}

async fn establish_mesh(rank: usize, hosts: &[SocketAddr], connect_timeout: Duration) -> Result<Vec<Option<TcpStream>>> {
    let listener = TcpListener::bind(hosts[rank])
        .await
        .with_context(|| format!("Failed to bind {}", hosts[rank]))?;
    tracing::debug!(rank, addr = %hosts[rank], "listening for higher-ranked members");

    let mut streams: Vec<Option<TcpStream>> = (0..hosts.len()).map(|_| None).collect();

    for (peer, addr) in hosts.iter().enumerate().take(rank) {
        let mut stream = connect_with_retry(*addr, connect_timeout).await?;
        stream.set_nodelay(true)?;
        let hello = FrameHeader::Hello {
            rank,
            protocol_version: PROTOCOL_VERSION,
        };
        write_frame(&mut stream, &hello, &[]).await?;
        tracing::debug!(peer, %addr, "connected");
        streams[peer] = Some(stream);
    }

    for _ in rank + 1..hosts.len() {
        let (mut stream, addr) = timeout(connect_timeout, listener.accept())
            .await
            .context("Timed out waiting for higher-ranked members to connect")?
            .context("Failed to accept connection")?;
        stream.set_nodelay(true)?;

        match read_frame(&mut stream).await? {
            Some((FrameHeader::Hello { rank: peer, protocol_version }, _)) => {
                if protocol_version != PROTOCOL_VERSION {
                    anyhow::bail!(
                        "Protocol version mismatch: member {}={}, local={}",
                        peer,
                        protocol_version,
                        PROTOCOL_VERSION
                    );
                }
                if peer <= rank || peer >= hosts.len() || streams[peer].is_some() {
                    anyhow::bail!("Unexpected HELLO from rank {} ({})", peer, addr);
                }
                tracing::debug!(peer, %addr, "accepted");
                streams[peer] = Some(stream);
            }
            other => anyhow::bail!("Expected HELLO from {}, got {:?}", addr, other.map(|(h, _)| h)),
        }
    }

    Ok(streams)
}

async fn connect_with_retry(addr: SocketAddr, connect_timeout: Duration) -> Result<TcpStream> {
    let deadline = Instant::now() + connect_timeout;
    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(_) if Instant::now() < deadline => sleep(CONNECT_RETRY_INTERVAL).await,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to connect to {} within {:?}", addr, connect_timeout));
            }
        }
    }
}

/// Forward frames from one peer into the member's inbox until the peer goes away
async fn pump_inbound(peer: usize, mut reader: OwnedReadHalf, inbox: Sender<Packet>) {
    loop {
        match read_frame(&mut reader).await {
            Ok(Some((header, payload))) => {
                if let Some(packet) = frame_to_packet(peer, header, payload) {
                    if inbox.send(packet).is_err() {
                        return;
                    }
                }
            }
            Ok(None) => {
                tracing::debug!(peer, "connection closed");
                break;
            }
            Err(e) => {
                tracing::warn!(peer, error = %e, "connection failed");
                break;
            }
        }
    }
    let _ = inbox.send(Packet::Closed { source: peer });
}
