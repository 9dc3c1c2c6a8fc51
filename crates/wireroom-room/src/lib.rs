//! Room layer for Wireroom.
//!
//! Rooms group clients so the server can address many peers with one
//! call. Membership lives here; delivery resolves through the client
//! registry, and transports with native publish/subscribe turn a room
//! send into a single publish instead of N direct sends.

mod error;
mod room;
mod table;

pub use error::RoomError;
pub use room::Room;
pub use table::RoomTable;

#[cfg(test)]
mod tests {
    use super::*;

    use wireroom_protocol::ClientId;

    #[test]
    fn test_room_new_empty_members_fails() {
        assert!(matches!(Room::new(vec![]), Err(RoomError::NoMembers)));
    }

    #[test]
    fn test_room_add_member_is_idempotent() {
        let a = ClientId::random();
        let mut room = Room::new(vec![a]).unwrap();

        room.add_member(a);
        room.add_member(a);

        assert_eq!(room.len(), 1);
    }

    #[test]
    fn test_room_preserves_insertion_order() {
        let a = ClientId::random();
        let b = ClientId::random();
        let c = ClientId::random();
        let mut room = Room::new(vec![a, b]).unwrap();

        room.add_member(c);

        assert_eq!(room.members(), [a, b, c]);
    }

    #[test]
    fn test_remove_member_signals_emptiness_exactly_once() {
        let a = ClientId::random();
        let b = ClientId::random();
        let mut room = Room::new(vec![a, b]).unwrap();

        assert!(!room.remove_member(a), "room still has a member");
        assert!(room.remove_member(b), "this removal emptied the room");
        assert!(
            !room.remove_member(b),
            "removing an absent member never signals"
        );
    }

    #[test]
    fn test_remove_absent_member_from_populated_room_is_false() {
        let a = ClientId::random();
        let mut room = Room::new(vec![a]).unwrap();

        assert!(!room.remove_member(ClientId::random()));
        assert_eq!(room.len(), 1);
    }

    #[test]
    fn test_room_topic_matches_id() {
        let room = Room::new(vec![ClientId::random()]).unwrap();
        assert_eq!(room.topic(), room.id().to_string());
    }
}
