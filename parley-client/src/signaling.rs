use async_trait::async_trait;
use parley_core::{ClientEvent, ConnectionId, SessionDescription, SignalError};
use std::sync::Arc;
use tracing::debug;

/// The outbound half of the relay transport, as seen by one client session.
/// The WebSocket plumbing (or a test double) lives behind this.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    async fn send(&self, event: ClientEvent) -> Result<(), SignalError>;
}

/// Typed sender for signaling events, scoped to one client session.
///
/// Constructed per session and passed to whoever needs it; its lifetime is
/// the session's, never a process-wide global. Inbound events arrive on the
/// mpsc receiver the session owner wires into the coordinator.
#[derive(Clone)]
pub struct SignalingChannel {
    transport: Arc<dyn SignalingTransport>,
}

impl SignalingChannel {
    pub fn new(transport: Arc<dyn SignalingTransport>) -> Self {
        Self { transport }
    }

    pub async fn join(&self, email: &str, room: &str) -> Result<(), SignalError> {
        debug!(email, room, "-> room:join");
        self.transport
            .send(ClientEvent::RoomJoin {
                email: email.to_string(),
                room: room.to_string(),
            })
            .await
    }

    pub async fn call(
        &self,
        to: ConnectionId,
        offer: SessionDescription,
    ) -> Result<(), SignalError> {
        debug!(%to, "-> user:call");
        self.transport.send(ClientEvent::Call { to, offer }).await
    }

    pub async fn accept(
        &self,
        to: ConnectionId,
        ans: SessionDescription,
    ) -> Result<(), SignalError> {
        debug!(%to, "-> call:accepted");
        self.transport.send(ClientEvent::Accept { to, ans }).await
    }

    pub async fn nego_offer(
        &self,
        to: ConnectionId,
        offer: SessionDescription,
    ) -> Result<(), SignalError> {
        debug!(%to, "-> peer:nego:needed");
        self.transport
            .send(ClientEvent::NegoOffer { to, offer })
            .await
    }

    pub async fn nego_answer(
        &self,
        to: ConnectionId,
        ans: SessionDescription,
    ) -> Result<(), SignalError> {
        debug!(%to, "-> peer:nego:done");
        self.transport
            .send(ClientEvent::NegoAnswer { to, ans })
            .await
    }

    pub async fn end_call(&self, to: ConnectionId) -> Result<(), SignalError> {
        debug!(%to, "-> call:end");
        self.transport.send(ClientEvent::EndCall { to }).await
    }
}
