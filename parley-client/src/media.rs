use async_trait::async_trait;
use parley_core::{LocalTrack, MediaConstraints, NegotiationError, TrackKind};
use tracing::debug;
use uuid::Uuid;

/// Device capture seam. Acquisition is the one long-latency step that can be
/// refused by the user; a refusal aborts the call locally and nothing goes
/// over signaling.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn acquire(&self, constraints: MediaConstraints)
    -> Result<MediaStream, NegotiationError>;
}

/// One local capture session: the tracks acquired together for a call.
/// Stopping is idempotent; the second stop touches nothing.
#[derive(Debug)]
pub struct MediaStream {
    tracks: Vec<LocalTrack>,
    stopped: bool,
}

impl MediaStream {
    pub fn new(tracks: Vec<LocalTrack>) -> Self {
        Self {
            tracks,
            stopped: false,
        }
    }

    pub fn tracks(&self) -> &[LocalTrack] {
        &self.tracks
    }

    /// Stop every track. Returns how many were stopped by *this* call, so a
    /// repeated stop reports zero.
    pub fn stop(&mut self) -> usize {
        if self.stopped {
            return 0;
        }
        self.stopped = true;
        debug!(tracks = self.tracks.len(), "local media stopped");
        self.tracks.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// Devices that mint placeholder tracks without touching real hardware.
/// Useful for headless peers and demos; real capture backends implement
/// `MediaDevices` the same way.
#[derive(Debug, Default, Clone)]
pub struct SyntheticDevices;

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn acquire(
        &self,
        constraints: MediaConstraints,
    ) -> Result<MediaStream, NegotiationError> {
        let mut tracks = Vec::new();
        if constraints.audio {
            tracks.push(LocalTrack {
                id: format!("audio-{}", Uuid::new_v4()),
                kind: TrackKind::Audio,
            });
        }
        if constraints.video {
            tracks.push(LocalTrack {
                id: format!("video-{}", Uuid::new_v4()),
                kind: TrackKind::Video,
            });
        }
        Ok(MediaStream::new(tracks))
    }
}
