//! A room: a named group of clients addressed as one unit.

use wireroom_protocol::{ClientId, Codec, Envelope, ProtocolError, RoomId};
use wireroom_registry::Registry;
use wireroom_transport::Connection;

use crate::RoomError;

/// A group of clients that receive room-targeted broadcasts.
///
/// Rooms hold client IDs only, never connections — each send resolves
/// members through the [`Registry`] at delivery time, so a client that
/// disconnected between sends is simply skipped rather than delivered to
/// a dead socket.
pub struct Room {
    id: RoomId,
    /// Insertion-ordered; the first member doubles as the publish
    /// representative when the transport has native pub/sub.
    members: Vec<ClientId>,
}

impl Room {
    /// Creates a room over the given members.
    ///
    /// Duplicate IDs collapse to one membership.
    ///
    /// # Errors
    /// [`RoomError::NoMembers`] if `members` is empty — an unaddressable
    /// room is a caller bug, not a state worth representing.
    pub fn new(members: Vec<ClientId>) -> Result<Self, RoomError> {
        if members.is_empty() {
            return Err(RoomError::NoMembers);
        }
        let id = RoomId::random();
        let mut room = Self {
            id,
            members: Vec::with_capacity(members.len()),
        };
        for member in members {
            room.add_member(member);
        }
        tracing::debug!(room_id = %id, members = room.members.len(), "room created");
        Ok(room)
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    /// The topic name this room publishes under.
    pub fn topic(&self) -> String {
        self.id.to_string()
    }

    pub fn members(&self) -> &[ClientId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.members.contains(&id)
    }

    /// Adds a client to the room. Idempotent: a client is a member once
    /// no matter how many times it is added.
    pub fn add_member(&mut self, id: ClientId) {
        if !self.members.contains(&id) {
            self.members.push(id);
        }
    }

    /// Removes a client from the room.
    ///
    /// Returns `true` exactly when this removal left the room empty —
    /// the one moment the owner should tear the room down. Removing an
    /// absent member changes nothing and returns `false`.
    pub fn remove_member(&mut self, id: ClientId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| *m != id);
        before > self.members.len() && self.members.is_empty()
    }

    /// Delivers an envelope to every member, exactly once each.
    ///
    /// Members are resolved through the registry at call time; IDs that
    /// no longer resolve are skipped with a log line. When the transport
    /// offers native pub/sub the first resolvable member publishes to
    /// the room topic (which reaches everyone *but* itself) and then
    /// receives one direct copy; otherwise delivery falls back to one
    /// direct send per resolvable member.
    ///
    /// # Errors
    /// Only encode failures propagate. Transport-level delivery failures
    /// follow the usual send contract and are logged, not raised.
    pub async fn send<C: Connection, D: Clone>(
        &self,
        registry: &Registry<C, D>,
        codec: &dyn Codec,
        envelope: &Envelope,
    ) -> Result<(), ProtocolError> {
        let mut handles = Vec::with_capacity(self.members.len());
        for member in &self.members {
            match registry.lookup(*member) {
                Ok(handle) => handles.push(handle),
                Err(_) => tracing::debug!(
                    room_id = %self.id,
                    client_id = %member,
                    "skipping unresolvable room member"
                ),
            }
        }

        let Some(representative) = handles.first() else {
            tracing::warn!(room_id = %self.id, "room send had no resolvable members");
            return Ok(());
        };

        let frame = codec.encode(envelope)?;
        let topic = self.topic();
        let native = match representative
            .connection()
            .publish(&topic, frame.as_bytes())
            .await
        {
            Ok(native) => native,
            Err(e) => {
                tracing::debug!(room_id = %self.id, error = %e, "room publish failed");
                false
            }
        };

        if native {
            // Publish excluded the representative itself; close the gap.
            representative.send_envelope(codec, envelope).await?;
        } else {
            for handle in &handles {
                handle.send_envelope(codec, envelope).await?;
            }
        }
        Ok(())
    }
}
