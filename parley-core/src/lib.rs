pub mod error;
pub mod model;

pub use error::{NegotiationError, SignalError};
pub use model::{
    ClientEvent, ConnectionId, LocalTrack, MediaConstraints, NegotiationState, Participant,
    RemoteTrack, RoomId, SdpKind, ServerEvent, SessionDescription, TrackKind,
};
