use crate::model::{ConnectionId, RoomId};
use thiserror::Error;

/// Relay-side failures. Scoped to one connection; never corrupt shared
/// room state.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum SignalError {
    #[error("recipient {0} is not connected")]
    UnknownRecipient(ConnectionId),

    #[error("room {0} is full")]
    RoomFull(RoomId),
}

/// Client-side negotiation failures. All of these are absorbed locally and
/// never terminate the client.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// Malformed or unexpected offer/answer. Dropped and logged.
    #[error("invalid remote description: {0}")]
    InvalidRemoteDescription(String),

    /// An answer or offer for an already superseded round. Dropped silently.
    #[error("stale negotiation round")]
    StaleNegotiation,

    /// Device permission refused. The call is aborted locally; nothing goes
    /// over signaling.
    #[error("media acquisition denied")]
    MediaAcquisitionDenied,

    /// Failure inside the peer-connection engine itself.
    #[error("engine failure: {0}")]
    Engine(String),
}
