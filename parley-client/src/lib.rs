mod call;
mod engine;
mod media;
mod signaling;

pub use call::{
    CallCommand, CallHandle, CoordinatorConfig, NegotiationCoordinator, PeerConnectionManager,
};
pub use engine::webrtc::{WebRtcEngine, WebRtcEngineConfig};
pub use engine::{EngineEvent, EngineFactory, PeerEngine};
pub use media::{MediaDevices, MediaStream, SyntheticDevices};
pub use signaling::{SignalingChannel, SignalingTransport};
