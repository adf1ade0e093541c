use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// A locally captured media track, as handed to the peer-connection engine.
/// The actual samples never pass through the signaling core.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LocalTrack {
    pub id: String,
    pub kind: TrackKind,
}

/// An inbound track reported by the engine. Purely observational.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: TrackKind,
}

/// What to ask the device layer for.
#[derive(Debug, Clone, Copy)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}
