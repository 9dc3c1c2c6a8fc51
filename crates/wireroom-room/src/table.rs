//! The room table: every live room, keyed by ID.

use std::collections::HashMap;

use wireroom_protocol::{ClientId, RoomId};

use crate::{Room, RoomError};

/// Owns all rooms on a server.
///
/// Like the registry, this is a plain map with no internal locking; the
/// server guards it with one async mutex and keeps lock scopes short.
pub struct RoomTable {
    rooms: HashMap<RoomId, Room>,
}

impl RoomTable {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
        }
    }

    /// Creates a room over `members` and registers it.
    ///
    /// # Errors
    /// [`RoomError::NoMembers`] if `members` is empty.
    pub fn create(
        &mut self,
        members: Vec<ClientId>,
    ) -> Result<RoomId, RoomError> {
        let room = Room::new(members)?;
        let id = room.id();
        self.rooms.insert(id, room);
        Ok(id)
    }

    /// # Errors
    /// [`RoomError::NotFound`] if no room with this ID exists.
    pub fn get(&self, id: RoomId) -> Result<&Room, RoomError> {
        self.rooms.get(&id).ok_or(RoomError::NotFound(id))
    }

    /// # Errors
    /// [`RoomError::NotFound`] if no room with this ID exists.
    pub fn get_mut(&mut self, id: RoomId) -> Result<&mut Room, RoomError> {
        self.rooms.get_mut(&id).ok_or(RoomError::NotFound(id))
    }

    /// Deletes a room outright.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if no room with this ID exists.
    pub fn delete(&mut self, id: RoomId) -> Result<Room, RoomError> {
        let room = self.rooms.remove(&id).ok_or(RoomError::NotFound(id))?;
        tracing::debug!(room_id = %id, "room deleted");
        Ok(room)
    }

    /// Drops `client` from every room it belongs to, deleting rooms
    /// this empties. Returns the IDs of deleted rooms.
    pub fn evict_client(&mut self, client: ClientId) -> Vec<RoomId> {
        let mut emptied = Vec::new();
        for (id, room) in self.rooms.iter_mut() {
            if room.remove_member(client) {
                emptied.push(*id);
            }
        }
        for id in &emptied {
            self.rooms.remove(id);
            tracing::debug!(room_id = %id, "room emptied and deleted");
        }
        emptied
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl Default for RoomTable {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
