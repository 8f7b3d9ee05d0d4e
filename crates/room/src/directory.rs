//! Room directory - the set of live rooms keyed by id
//!
//! Rooms are shared as `Arc<Mutex<Room>>` so that a tick and an intent for the
//! same room are serialised by that room's lock while other rooms proceed
//! independently. Lock order is always directory first, room second.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::info;

use crate::config::RoomTimings;
use crate::room::{Room, RoomId};

pub type RoomHandle = Arc<Mutex<Room>>;

pub const DEFAULT_ROOM_NAME: &str = "Tetris Room";

#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<RoomId, RoomHandle>,
    timings: RoomTimings,
}

impl RoomDirectory {
    pub fn new(timings: RoomTimings) -> Self {
        Self {
            rooms: HashMap::new(),
            timings,
        }
    }

    pub fn timings(&self) -> &RoomTimings {
        &self.timings
    }

    /// Create an empty room; a blank name falls back to [`DEFAULT_ROOM_NAME`]
    pub fn create(&mut self, name: Option<&str>, now: Instant) -> (RoomId, RoomHandle) {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_ROOM_NAME);
        let room = Room::new(name, self.timings, now);
        let id = room.id();
        info!(room = %id, name, "room created");
        (id, self.insert(room))
    }

    /// Register an already built room
    pub fn insert(&mut self, room: Room) -> RoomHandle {
        let id = room.id();
        let handle = Arc::new(Mutex::new(room));
        self.rooms.insert(id, Arc::clone(&handle));
        handle
    }

    pub fn get(&self, id: &RoomId) -> Option<RoomHandle> {
        self.rooms.get(id).cloned()
    }

    pub fn all(&self) -> Vec<RoomHandle> {
        self.rooms.values().cloned().collect()
    }

    /// Rooms with at least one seated player
    pub fn active(&self) -> Vec<RoomHandle> {
        self.rooms
            .values()
            .filter(|room| room.lock().player_count() > 0)
            .cloned()
            .collect()
    }

    /// Active rooms that would seat a newcomer
    pub fn joinable(&self) -> Vec<RoomHandle> {
        self.rooms
            .values()
            .filter(|room| {
                let room = room.lock();
                room.player_count() > 0 && room.can_join()
            })
            .cloned()
            .collect()
    }

    pub fn remove(&mut self, id: &RoomId) -> bool {
        self.rooms.remove(id).is_some()
    }

    /// Drop every room that has no seated players and has been idle too long
    pub fn cleanup_inactive(&mut self, now: Instant) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|_, room| {
            let room = room.lock();
            room.player_count() > 0 || !room.is_expired(now)
        });
        let removed = before - self.rooms.len();
        if removed > 0 {
            info!(removed, remaining = self.rooms.len(), "reclaimed idle rooms");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_create_and_lookup() {
        let t0 = Instant::now();
        let mut directory = RoomDirectory::default();
        let (id, handle) = directory.create(Some("  "), t0);

        assert_eq!(handle.lock().name(), DEFAULT_ROOM_NAME);
        assert!(directory.get(&id).is_some());
        assert!(directory.active().is_empty());
        assert!(directory.remove(&id));
        assert!(directory.get(&id).is_none());
    }

    #[test]
    fn test_joinable_excludes_playing_rooms() {
        let t0 = Instant::now();
        let mut directory = RoomDirectory::default();
        let (_, waiting) = directory.create(Some("waiting"), t0);
        let (_, busy) = directory.create(Some("busy"), t0);

        waiting.lock().add_player("a", "alice", 1, t0);
        {
            let mut busy = busy.lock();
            busy.add_player("b", "bob", 2, t0);
            busy.add_player("c", "carol", 3, t0);
        }

        assert_eq!(directory.active().len(), 2);
        let joinable = directory.joinable();
        assert_eq!(joinable.len(), 1);
        assert_eq!(joinable[0].lock().name(), "waiting");
    }

    #[test]
    fn test_cleanup_keeps_occupied_and_recent_rooms() {
        let t0 = Instant::now();
        let mut directory = RoomDirectory::default();
        let (_, occupied) = directory.create(None, t0);
        occupied.lock().add_player("a", "alice", 1, t0);
        directory.create(None, t0);

        assert_eq!(directory.cleanup_inactive(t0 + Duration::from_secs(60)), 0);
        let later = t0 + Duration::from_secs(3 * 60 * 60);
        assert_eq!(directory.cleanup_inactive(later), 1);
        assert_eq!(directory.len(), 1);
    }
}
