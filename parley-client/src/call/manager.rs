use crate::engine::PeerEngine;
use parley_core::{LocalTrack, NegotiationError, NegotiationState, SdpKind, SessionDescription};
use tracing::{debug, warn};

/// Guards one peer-connection engine with the offer/answer legality rules.
///
/// One instance per call: constructed when a call starts, discarded when it
/// ends, never reused. The round counter makes duplicate or stale answers
/// detectable across the suspension points between offer creation, send, and
/// answer arrival.
pub struct PeerConnectionManager {
    engine: Box<dyn PeerEngine>,
    state: NegotiationState,
    round: u64,
    answered_round: u64,
    pending_tracks: Vec<LocalTrack>,
}

impl PeerConnectionManager {
    pub fn new(engine: Box<dyn PeerEngine>) -> Self {
        Self {
            engine,
            state: NegotiationState::Idle,
            round: 0,
            answered_round: 0,
            pending_tracks: Vec::new(),
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    /// Start an offer round. Legal from idle-ish states and from an
    /// established session (which makes this a renegotiation).
    pub async fn create_offer(&mut self) -> Result<SessionDescription, NegotiationError> {
        let renegotiating = match self.state {
            NegotiationState::Idle
            | NegotiationState::CallerReady
            | NegotiationState::CalleeReady => false,
            NegotiationState::Established | NegotiationState::Renegotiating => true,
            _ => {
                debug!(state = %self.state, "offer refused, round already in flight");
                return Err(NegotiationError::StaleNegotiation);
            }
        };

        let offer = self.engine.create_offer().await?;
        self.round += 1;
        self.state = if renegotiating {
            NegotiationState::Renegotiating
        } else {
            NegotiationState::Offering
        };
        debug!(round = self.round, renegotiating, "offer created");
        Ok(offer)
    }

    /// Record that the offer left over signaling; the initial round now waits
    /// for the answer. A renegotiation round stays `Renegotiating` end to end.
    pub fn offer_sent(&mut self) {
        if self.state == NegotiationState::Offering {
            self.state = NegotiationState::AwaitingAnswer;
        }
    }

    /// Answer a remote offer. Refused while our own unresolved round is in
    /// flight; glare resolution happens above this layer.
    pub async fn create_answer(
        &mut self,
        remote: SessionDescription,
    ) -> Result<SessionDescription, NegotiationError> {
        if remote.kind != SdpKind::Offer || remote.sdp.is_empty() {
            return Err(NegotiationError::InvalidRemoteDescription(
                "malformed offer".into(),
            ));
        }

        match self.state {
            NegotiationState::Idle
            | NegotiationState::CalleeReady
            | NegotiationState::CallerReady
            | NegotiationState::Established => {}
            _ => {
                return Err(NegotiationError::InvalidRemoteDescription(format!(
                    "offer arrived with an unresolved round in flight (state {})",
                    self.state
                )));
            }
        }

        let prev = self.state;
        self.state = NegotiationState::Answering;
        let answer = match self.engine.create_answer(remote).await {
            Ok(answer) => answer,
            Err(e) => {
                // The engine rejected the description; whatever stood before
                // (including an established session) stands again.
                self.state = prev;
                return Err(e);
            }
        };
        self.state = NegotiationState::Established;
        debug!("answered remote offer, session established");
        Ok(answer)
    }

    /// Complete the round we are waiting on. Anything else -- a duplicate
    /// answer, an answer after the round was superseded -- is stale and
    /// leaves state untouched.
    pub async fn apply_remote_answer(
        &mut self,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        match self.state {
            NegotiationState::AwaitingAnswer | NegotiationState::Renegotiating => {}
            _ => {
                debug!(state = %self.state, "dropping answer, no round awaiting one");
                return Err(NegotiationError::StaleNegotiation);
            }
        }
        if self.answered_round >= self.round {
            debug!(round = self.round, "dropping duplicate answer");
            return Err(NegotiationError::StaleNegotiation);
        }
        if answer.kind != SdpKind::Answer {
            return Err(NegotiationError::InvalidRemoteDescription(
                "expected an answer".into(),
            ));
        }

        self.engine.apply_remote_answer(answer).await?;
        self.answered_round = self.round;
        self.state = NegotiationState::Established;

        // Answer-then-attach: tracks that became ready during the round go
        // onto the now-stable connection. Each attachment surfaces through
        // the engine as a fresh negotiation-needed signal.
        let queued: Vec<_> = self.pending_tracks.drain(..).collect();
        for track in queued {
            if let Err(e) = self.engine.add_track(track).await {
                warn!("failed to attach queued track: {e}");
            }
        }

        debug!(round = self.round, "answer applied, session established");
        Ok(())
    }

    /// Abandon the renegotiation round in flight: roll the engine's local
    /// description back to the established one and mark the round answered
    /// so a late answer to the abandoned offer lands as stale.
    pub async fn abort_round(&mut self) -> Result<(), NegotiationError> {
        if self.state != NegotiationState::Renegotiating {
            return Err(NegotiationError::StaleNegotiation);
        }
        self.engine.rollback().await?;
        self.answered_round = self.round;
        self.state = NegotiationState::Established;
        debug!(round = self.round, "renegotiation round abandoned");
        Ok(())
    }

    /// Attach a local track. While a round is in flight the track is queued
    /// and attached once the round resolves; on an established connection
    /// the engine reacts with negotiation-needed rather than descriptions
    /// being mutated silently.
    pub async fn add_local_track(&mut self, track: LocalTrack) -> Result<(), NegotiationError> {
        match self.state {
            NegotiationState::Offering
            | NegotiationState::AwaitingAnswer
            | NegotiationState::Answering
            | NegotiationState::Renegotiating => {
                debug!(id = %track.id, "queueing track until the round resolves");
                self.pending_tracks.push(track);
                Ok(())
            }
            _ => self.engine.add_track(track).await,
        }
    }

    /// Tear the call down locally. Idempotent by construction: the caller
    /// drops the manager right after.
    pub async fn end(&mut self) -> Result<(), NegotiationError> {
        self.pending_tracks.clear();
        self.state = NegotiationState::Idle;
        self.engine.close().await
    }
}
