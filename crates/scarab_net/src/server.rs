//! The Control Server (spec §4.5): a single WebSocket endpoint that
//! broadcasts every dispatched event and relays control commands back to
//! the simulation.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use scarab_core::Event;
use scarab_router::EventSink;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::NetError;
use crate::protocol::{parse_command, serialize, ControlCommand};

type PeerId = u64;

/// A single connection's write half, identified for removal on disconnect.
struct Peer {
    closer: tokio::sync::oneshot::Sender<()>,
}

/// Accepts WebSocket connections, fans out dispatched events, and forwards
/// client commands to the simulation over a bounded channel.
///
/// Implements [`EventSink`] so the router can hand it every dispatched
/// event without knowing anything about WebSockets (spec §4.4 bullet 4).
///
/// Cheap to clone: every clone shares the same broadcast channel, command
/// channel, and peer set, so the simulation can keep one handle for
/// lifecycle control (`close_all`) while handing another to the router as
/// a boxed [`EventSink`].
#[derive(Clone)]
pub struct ControlServer {
    broadcast_tx: broadcast::Sender<String>,
    command_tx: mpsc::Sender<ControlCommand>,
    peers: Arc<DashMap<PeerId, Peer>>,
    local_addr: SocketAddr,
}

impl ControlServer {
    /// Bind a listening socket at `addr` and start accepting connections in
    /// the background.
    ///
    /// Returns the server handle plus the `Receiver` half of the command
    /// channel, which the caller (the `Simulation` run loop) drains each
    /// step.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Bind`] if the socket cannot be bound.
    pub async fn bind(addr: SocketAddr) -> Result<(Self, mpsc::Receiver<ControlCommand>), NetError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| NetError::Bind(addr, e))?;
        let local_addr = listener.local_addr().map_err(|e| NetError::Bind(addr, e))?;
        let (broadcast_tx, _) = broadcast::channel(256);
        let (command_tx, command_rx) = mpsc::channel(32);
        let peers = Arc::new(DashMap::new());

        let server = Self {
            broadcast_tx,
            command_tx,
            peers: peers.clone(),
            local_addr,
        };

        info!(%local_addr, "control server listening");
        let accept_broadcast_tx = server.broadcast_tx.clone();
        let accept_command_tx = server.command_tx.clone();
        tokio::spawn(accept_loop(listener, accept_broadcast_tx, accept_command_tx, peers));

        Ok((server, command_rx))
    }

    /// Actively disconnect every open client (spec §5: "Each accepted
    /// client is owned by the server and released on disconnect or at
    /// shutdown").
    pub fn close_all(&self) {
        for entry in self.peers.iter() {
            let _ = entry.value().closer.send(());
        }
        self.peers.clear();
    }

    /// Number of currently connected observers.
    #[must_use]
    pub fn connected_peers(&self) -> usize {
        self.peers.len()
    }

    /// The address actually bound — useful when `bind` was called with
    /// port `0` for an ephemeral listener.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl EventSink for ControlServer {
    fn publish(&mut self, event: &Event) {
        let text = match serialize(event) {
            Ok(text) => text,
            Err(error) => {
                warn!(%error, event_name = %event.event_name, "failed to serialize event for broadcast");
                return;
            }
        };
        // No receivers is the common case between connections; broadcast
        // only errors when nobody is subscribed, which is not a fault.
        let _ = self.broadcast_tx.send(text);
    }
}

async fn accept_loop(
    listener: TcpListener,
    broadcast_tx: broadcast::Sender<String>,
    command_tx: mpsc::Sender<ControlCommand>,
    peers: Arc<DashMap<PeerId, Peer>>,
) {
    let mut next_id: PeerId = 0;
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                warn!(%error, "failed to accept connection");
                continue;
            }
        };
        let id = next_id;
        next_id += 1;
        let broadcast_rx = broadcast_tx.subscribe();
        let command_tx = command_tx.clone();
        let peers = peers.clone();
        tokio::spawn(async move {
            if let Err(error) =
                serve_connection(stream, peer_addr, id, broadcast_rx, command_tx, peers.clone()).await
            {
                debug!(%peer_addr, %error, "connection closed with error");
            }
            peers.remove(&id);
        });
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    id: PeerId,
    mut broadcast_rx: broadcast::Receiver<String>,
    command_tx: mpsc::Sender<ControlCommand>,
    peers: Arc<DashMap<PeerId, Peer>>,
) -> Result<(), NetError> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();
    let (closer_tx, mut closer_rx) = tokio::sync::oneshot::channel();
    peers.insert(id, Peer { closer: closer_tx });
    info!(%peer_addr, "observer connected");

    loop {
        tokio::select! {
            _ = &mut closer_rx => {
                let _ = write.close().await;
                break;
            }
            broadcast_result = broadcast_rx.recv() => {
                match broadcast_result {
                    Ok(text) => {
                        if write.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        warn!(%peer_addr, "observer fell behind broadcast stream, disconnecting");
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            message = read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        match parse_command(&text) {
                            Some(command) => {
                                if command_tx.send(command).await.is_err() {
                                    break;
                                }
                            }
                            None => debug!(%peer_addr, frame = %text, "ignoring unrecognized control frame"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        debug!(%peer_addr, %error, "observer read error");
                        break;
                    }
                }
            }
        }
    }

    info!(%peer_addr, "observer disconnected");
    Ok(())
}
