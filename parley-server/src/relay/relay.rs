use crate::room::{RoomPolicy, RoomRegistry};
use dashmap::DashMap;
use parley_core::{ClientEvent, ConnectionId, ServerEvent, SignalError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Forwards named signaling events between members of a room without
/// interpreting their payloads. The only thing it rewrites is the address
/// envelope: a client says `to`, the recipient sees `from`.
///
/// Delivery is fire-and-forget: one unbounded queue per connection keeps
/// per-(sender, recipient) order, and an event addressed to a connection
/// that is gone is lost by design, with `relay:error` reported back to the
/// sender.
pub struct RelayServer {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>,
    registry: RoomRegistry,
}

impl RelayServer {
    pub fn new(policy: RoomPolicy) -> Self {
        Self {
            connections: DashMap::new(),
            registry: RoomRegistry::new(policy),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Register a live connection and its outbound queue.
    pub fn connect(&self, id: ConnectionId, tx: mpsc::UnboundedSender<ServerEvent>) {
        info!(%id, "connection registered");
        self.connections.insert(id, tx);
    }

    /// Drop a connection: forget its queue, remove it from its room, and
    /// tell the remaining members it is gone.
    pub fn disconnect(&self, id: ConnectionId) {
        self.connections.remove(&id);

        if let Some((room, remaining)) = self.registry.leave(id) {
            debug!(%id, %room, "notifying remaining members of departure");
            for member in remaining {
                self.send(member.id, ServerEvent::UserLeft { id });
            }
        }

        info!(%id, "connection dropped");
    }

    /// Route one inbound client event.
    pub fn handle_event(&self, from: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::RoomJoin { email, room } => self.handle_join(from, email, room),

            ClientEvent::Call { to, offer } => {
                self.relay(from, to, ServerEvent::IncomingCall { from, offer });
            }

            ClientEvent::Accept { to, ans } => {
                self.relay(from, to, ServerEvent::CallAccepted { from, ans });
            }

            ClientEvent::NegoOffer { to, offer } => {
                self.relay(from, to, ServerEvent::NegoOffer { from, offer });
            }

            // The renegotiation answer comes back to the offerer under its
            // own name so it cannot be mistaken for an initial-call answer.
            ClientEvent::NegoAnswer { to, ans } => {
                self.relay(from, to, ServerEvent::NegoFinal { ans });
            }

            ClientEvent::EndCall { to } => {
                self.relay(from, to, ServerEvent::CallEnded { from });
            }
        }
    }

    fn handle_join(&self, from: ConnectionId, email: String, room: String) {
        let room_id = room.clone().into();
        match self.registry.join(&room_id, from, &email) {
            Ok(existing) => {
                for member in &existing {
                    self.send(
                        member.id,
                        ServerEvent::UserJoined {
                            email: email.clone(),
                            id: from,
                        },
                    );
                }
                self.send(from, ServerEvent::RoomJoined { email, room });
            }
            Err(SignalError::RoomFull(_)) => {
                warn!(%from, room, "join rejected, room full");
                self.send(from, ServerEvent::RoomFull { room });
            }
            Err(e) => {
                warn!(%from, room, error = %e, "join failed");
                self.send(from, ServerEvent::RelayError {
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Forward an event to `to`, or report `UnknownRecipient` to `from`.
    /// Either way the failure is non-fatal and touches no room state.
    fn relay(&self, from: ConnectionId, to: ConnectionId, event: ServerEvent) {
        if self.send(to, event) {
            return;
        }

        let err = SignalError::UnknownRecipient(to);
        warn!(%from, %to, "relay target not connected");
        self.send(from, ServerEvent::RelayError {
            reason: err.to_string(),
        });
    }

    /// Push an event onto a connection's outbound queue. Returns false if
    /// the connection is not live.
    fn send(&self, to: ConnectionId, event: ServerEvent) -> bool {
        let Some(tx) = self.connections.get(&to) else {
            return false;
        };
        if tx.send(event).is_err() {
            // Receiver dropped mid-shutdown; treat like a dead connection.
            debug!(%to, "outbound queue closed");
            return false;
        }
        true
    }
}
