mod connection;
mod event;
mod media;
mod room;
mod session;

pub use connection::ConnectionId;
pub use event::{ClientEvent, ServerEvent};
pub use media::{LocalTrack, MediaConstraints, RemoteTrack, TrackKind};
pub use room::{Participant, RoomId};
pub use session::{NegotiationState, SdpKind, SessionDescription};
