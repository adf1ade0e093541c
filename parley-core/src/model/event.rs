use crate::model::connection::ConnectionId;
use crate::model::session::SessionDescription;
use serde::{Deserialize, Serialize};

/// Events a client sends to the relay. Addressed events carry the recipient
/// in `to`; the relay rewrites the envelope so the recipient sees `from`.
///
/// The tag strings are the wire contract and must not change; that includes
/// the historical "incomming:call" spelling on the server side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "ev", content = "d")]
pub enum ClientEvent {
    #[serde(rename = "room:join")]
    RoomJoin { email: String, room: String },

    #[serde(rename = "user:call")]
    Call {
        to: ConnectionId,
        offer: SessionDescription,
    },

    #[serde(rename = "call:accepted")]
    Accept {
        to: ConnectionId,
        ans: SessionDescription,
    },

    /// Renegotiation offer. Tagged differently from `user:call` so an initial
    /// round and a renegotiation round in flight at once cannot be confused.
    #[serde(rename = "peer:nego:needed")]
    NegoOffer {
        to: ConnectionId,
        offer: SessionDescription,
    },

    /// Renegotiation answer; delivered to the offerer as `peer:nego:final`.
    #[serde(rename = "peer:nego:done")]
    NegoAnswer {
        to: ConnectionId,
        ans: SessionDescription,
    },

    #[serde(rename = "call:end")]
    EndCall { to: ConnectionId },
}

/// Events the relay delivers to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "ev", content = "d")]
pub enum ServerEvent {
    /// Join acknowledgement, echoing the lobby form.
    #[serde(rename = "room:join")]
    RoomJoined { email: String, room: String },

    /// Join rejected by the member-cap policy.
    #[serde(rename = "room:full")]
    RoomFull { room: String },

    /// Announced to members already present when someone joins.
    #[serde(rename = "user:joined")]
    UserJoined { email: String, id: ConnectionId },

    /// Announced to remaining members when someone disconnects.
    #[serde(rename = "user:left")]
    UserLeft { id: ConnectionId },

    #[serde(rename = "incomming:call")]
    IncomingCall {
        from: ConnectionId,
        offer: SessionDescription,
    },

    #[serde(rename = "call:accepted")]
    CallAccepted {
        from: ConnectionId,
        ans: SessionDescription,
    },

    #[serde(rename = "peer:nego:needed")]
    NegoOffer {
        from: ConnectionId,
        offer: SessionDescription,
    },

    #[serde(rename = "peer:nego:final")]
    NegoFinal { ans: SessionDescription },

    #[serde(rename = "call:ended")]
    CallEnded { from: ConnectionId },

    /// Relay-side failure reported back to the sender, e.g. addressing a
    /// connection that is no longer live.
    #[serde(rename = "relay:error")]
    RelayError { reason: String },
}
