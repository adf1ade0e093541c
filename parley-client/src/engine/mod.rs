pub mod webrtc;

use async_trait::async_trait;
use parley_core::{LocalTrack, NegotiationError, RemoteTrack, SessionDescription};
use tokio::sync::mpsc;

/// Notifications flowing out of the peer-connection engine. None of these
/// carry media; they only drive (or inform) negotiation.
#[derive(Debug)]
pub enum EngineEvent {
    /// The media configuration changed on an established connection and a
    /// fresh offer/answer round is required.
    NegotiationNeeded,
    /// Inbound media appeared. Observational only; no state transition.
    TrackReceived(RemoteTrack),
    /// The transport died or was closed. Used to infer remote termination
    /// when no explicit hangup arrived.
    Closed,
}

/// Lifecycle surface of one underlying peer connection. The negotiation core
/// drives the engine exclusively through these operations and never looks
/// inside the SDP it hands back.
#[async_trait]
pub trait PeerEngine: Send + Sync {
    /// Create an offer and install it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError>;

    /// Apply a remote offer, then create and install the local answer.
    async fn create_answer(
        &self,
        remote: SessionDescription,
    ) -> Result<SessionDescription, NegotiationError>;

    /// Install the remote answer that completes the current round.
    async fn apply_remote_answer(&self, answer: SessionDescription)
    -> Result<(), NegotiationError>;

    /// Discard the pending local offer, restoring the last stable
    /// description. Used when an offer round is abandoned to a colliding
    /// remote offer.
    async fn rollback(&self) -> Result<(), NegotiationError>;

    /// Attach a local media track. On an established connection the engine
    /// answers with a `NegotiationNeeded` event.
    async fn add_track(&self, track: LocalTrack) -> Result<(), NegotiationError>;

    async fn close(&self) -> Result<(), NegotiationError>;
}

/// Builds a fresh engine per call: one instance, one call, discarded at call
/// end and never reused.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn create(
        &self,
    ) -> Result<(Box<dyn PeerEngine>, mpsc::Receiver<EngineEvent>), NegotiationError>;
}
