use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// An opaque negotiation blob produced by the peer-connection engine.
/// The signaling layer carries it end to end without interpreting the SDP.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Where a call currently stands, per client. The display layer renders off
/// this value alone; it carries no control logic.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NegotiationState {
    /// No call, no known peer.
    Idle,
    /// A peer is known; calling is up to an explicit user action.
    CallerReady,
    /// A peer is known; waiting passively for an incoming offer.
    CalleeReady,
    /// Local offer created, not yet sent.
    Offering,
    /// Offer sent, waiting for the remote answer.
    AwaitingAnswer,
    /// Building an answer for a remote offer.
    Answering,
    /// Offer/answer round complete; media flows outside signaling.
    Established,
    /// A post-establishment offer round is in flight.
    Renegotiating,
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::CallerReady => "caller-ready",
            Self::CalleeReady => "callee-ready",
            Self::Offering => "offering",
            Self::AwaitingAnswer => "awaiting-answer",
            Self::Answering => "answering",
            Self::Established => "established",
            Self::Renegotiating => "renegotiating",
        };
        write!(f, "{s}")
    }
}
