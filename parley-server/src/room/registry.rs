use dashmap::DashMap;
use parley_core::{ConnectionId, Participant, RoomId, SignalError};
use tracing::{debug, info};

/// Membership policy for every room on this relay.
#[derive(Debug, Clone, Copy)]
pub struct RoomPolicy {
    /// Hard cap on members per room. Two for a point-to-point call relay.
    pub max_members: usize,
}

impl Default for RoomPolicy {
    fn default() -> Self {
        Self { max_members: 2 }
    }
}

/// Room id -> member set, plus a reverse index so a disconnect can find the
/// room its connection sat in. Rooms exist only while occupied: created on
/// first join, removed when the last member leaves.
///
/// All mutation of a room's member list happens under the DashMap entry
/// guard for that room, which serializes concurrent joins and leaves per
/// room without a global lock.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Vec<Participant>>,
    membership: DashMap<ConnectionId, RoomId>,
    policy: RoomPolicy,
}

impl RoomRegistry {
    pub fn new(policy: RoomPolicy) -> Self {
        Self {
            rooms: DashMap::new(),
            membership: DashMap::new(),
            policy,
        }
    }

    /// Add a connection to a room, creating the room on first join.
    ///
    /// Returns the members present *before* this join, so the caller can
    /// announce the newcomer to them. A join beyond the cap fails with
    /// `RoomFull` and leaves the room untouched.
    pub fn join(
        &self,
        room: &RoomId,
        id: ConnectionId,
        email: &str,
    ) -> Result<Vec<Participant>, SignalError> {
        // A connection lives in at most one room; a rejoin moves it.
        if self.membership.contains_key(&id) {
            self.leave(id);
        }

        let mut entry = self.rooms.entry(room.clone()).or_default();
        if entry.len() >= self.policy.max_members {
            debug!(%room, %id, "join rejected, room at capacity");
            return Err(SignalError::RoomFull(room.clone()));
        }

        let existing = entry.clone();
        entry.push(Participant {
            id,
            email: email.to_string(),
        });
        drop(entry);

        self.membership.insert(id, room.clone());
        info!(%room, %id, email, members = existing.len() + 1, "joined room");
        Ok(existing)
    }

    /// Remove a connection from its room, if any. Returns the room and the
    /// members remaining in it so they can be notified. An empty room is
    /// dropped.
    pub fn leave(&self, id: ConnectionId) -> Option<(RoomId, Vec<Participant>)> {
        let (_, room) = self.membership.remove(&id)?;

        let remaining = match self.rooms.get_mut(&room) {
            Some(mut members) => {
                members.retain(|p| p.id != id);
                members.clone()
            }
            None => Vec::new(),
        };

        if remaining.is_empty() {
            self.rooms.remove_if(&room, |_, members| members.is_empty());
            info!(%room, %id, "left room, room removed");
        } else {
            info!(%room, %id, remaining = remaining.len(), "left room");
        }

        Some((room, remaining))
    }

    /// Members currently in a room.
    pub fn members(&self, room: &RoomId) -> Vec<Participant> {
        self.rooms
            .get(room)
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn room_of(&self, id: ConnectionId) -> Option<RoomId> {
        self.membership.get(&id).map(|r| r.clone())
    }
}
