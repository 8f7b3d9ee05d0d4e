//! Lobby - the boundary every intent passes through
//!
//! The lobby owns the room directory, the identity -> room membership map and the
//! tick scheduler. Callers hand in an already authenticated [`Identity`] and the
//! current instant; the lobby returns owned snapshots for the transport to send.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tetris_arena_core::types::GameAction;
use tetris_arena_core::{GameStateSnapshot, MiniBoardState, PlayerId};
use tracing::{debug, info};

use crate::config::RoomTimings;
use crate::directory::{RoomDirectory, RoomHandle};
use crate::error::RoomError;
use crate::room::{ConnectionId, GameOver, JoinOutcome, RoomId, RoomInfo};
use crate::scheduler::{RoomEvent, TickScheduler};

/// An authenticated player
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub id: PlayerId,
    pub username: String,
}

impl Identity {
    pub fn new(id: impl Into<PlayerId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// Result of creating or joining a room
#[derive(Debug, Clone, PartialEq)]
pub struct JoinResult {
    pub room_id: RoomId,
    pub outcome: JoinOutcome,
    /// Room this identity left to make the move, if any
    pub left: Option<LeaveResult>,
    pub info: RoomInfo,
    pub game: GameStateSnapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaveResult {
    pub room_id: RoomId,
    /// Room info after the departure, if the room still exists
    pub info: RoomInfo,
}

/// Result of a game intent that reached a room
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    pub room_id: RoomId,
    pub changed: bool,
    /// Fresh game state when the intent changed something
    pub game: Option<GameStateSnapshot>,
    pub game_over: Option<GameOver>,
}

#[derive(Debug)]
pub struct Lobby {
    directory: RwLock<RoomDirectory>,
    memberships: Mutex<HashMap<PlayerId, RoomId>>,
    scheduler: Mutex<TickScheduler>,
    timings: RoomTimings,
}

impl Lobby {
    pub fn new(timings: RoomTimings) -> Self {
        Self {
            directory: RwLock::new(RoomDirectory::new(timings)),
            memberships: Mutex::new(HashMap::new()),
            scheduler: Mutex::new(TickScheduler::new(&timings, Instant::now())),
            timings,
        }
    }

    pub fn timings(&self) -> &RoomTimings {
        &self.timings
    }

    fn room(&self, id: &RoomId) -> Result<RoomHandle, RoomError> {
        self.directory
            .read()
            .get(id)
            .ok_or(RoomError::RoomNotFound(*id))
    }

    pub fn room_handle(&self, id: &RoomId) -> Option<RoomHandle> {
        self.directory.read().get(id)
    }

    pub fn room_of(&self, player_id: &str) -> Option<RoomId> {
        self.memberships.lock().get(player_id).copied()
    }

    fn current_room(&self, player_id: &str) -> Result<(RoomId, RoomHandle), RoomError> {
        let room_id = self.room_of(player_id).ok_or(RoomError::NotInRoom)?;
        let handle = self.room(&room_id)?;
        Ok((room_id, handle))
    }

    /// Create a room and put its creator in it, leaving any current room first
    pub fn create_room(
        &self,
        identity: &Identity,
        connection: ConnectionId,
        name: Option<&str>,
        now: Instant,
    ) -> Result<JoinResult, RoomError> {
        let left = self.leave_current(&identity.id, now);
        let (room_id, handle) = self.directory.write().create(name, now);
        self.enter(identity, connection, room_id, &handle, left, now)
    }

    /// Join a room, switching rooms if the identity is already elsewhere
    ///
    /// A full or running room still accepts the join, as a spectator.
    pub fn join_room(
        &self,
        identity: &Identity,
        connection: ConnectionId,
        room_id: RoomId,
        now: Instant,
    ) -> Result<JoinResult, RoomError> {
        let handle = self.room(&room_id)?;

        let left = match self.room_of(&identity.id) {
            Some(current) if current != room_id => self.leave_current(&identity.id, now),
            _ => None,
        };

        self.enter(identity, connection, room_id, &handle, left, now)
    }

    fn enter(
        &self,
        identity: &Identity,
        connection: ConnectionId,
        room_id: RoomId,
        handle: &RoomHandle,
        left: Option<LeaveResult>,
        now: Instant,
    ) -> Result<JoinResult, RoomError> {
        let (outcome, info, game) = {
            let mut room = handle.lock();
            let outcome = room.add_player(&identity.id, &identity.username, connection, now);
            (outcome, room.info(now), room.game_state())
        };

        self.memberships.lock().insert(identity.id.clone(), room_id);
        info!(player = %identity.id, room = %room_id, ?outcome, "joined room");

        Ok(JoinResult {
            room_id,
            outcome,
            left,
            info,
            game,
        })
    }

    /// Leave the current room
    pub fn leave_room(&self, player_id: &str, now: Instant) -> Result<LeaveResult, RoomError> {
        let room_id = self
            .memberships
            .lock()
            .remove(player_id)
            .ok_or(RoomError::NotInRoom)?;
        let handle = self.room(&room_id)?;

        let mut room = handle.lock();
        if !room.remove_player(player_id, now) {
            return Err(RoomError::NotInThatRoom(room_id));
        }
        info!(player = player_id, room = %room_id, "left room");
        Ok(LeaveResult {
            room_id,
            info: room.info(now),
        })
    }

    /// Leave on behalf of a closing connection
    ///
    /// Does nothing when the seat has since been taken over by a newer connection
    /// of the same identity.
    pub fn disconnect(
        &self,
        player_id: &str,
        connection: ConnectionId,
        now: Instant,
    ) -> Option<LeaveResult> {
        let room_id = self.room_of(player_id)?;
        let handle = self.room(&room_id).ok()?;
        let mut room = handle.lock();

        if room
            .player(player_id)
            .is_some_and(|p| p.connection != connection)
        {
            debug!(player = player_id, connection, room = %room_id, "stale connection closed, seat kept");
            return None;
        }

        self.memberships.lock().remove(player_id);
        if !room.remove_player(player_id, now) {
            return None;
        }
        info!(player = player_id, room = %room_id, "left room on disconnect");
        Some(LeaveResult {
            room_id,
            info: room.info(now),
        })
    }

    fn leave_current(&self, player_id: &str, now: Instant) -> Option<LeaveResult> {
        self.leave_room(player_id, now).ok()
    }

    pub fn set_ready(
        &self,
        player_id: &str,
        ready: bool,
        now: Instant,
    ) -> Result<RoomInfo, RoomError> {
        let (_, handle) = self.current_room(player_id)?;
        let mut room = handle.lock();
        if !room.set_player_ready(player_id, ready, now) {
            return Err(RoomError::NotSeated);
        }
        Ok(room.info(now))
    }

    /// Apply a game intent in the player's current room
    ///
    /// Intents that are illegal right now are not errors; they come back with
    /// `changed == false`. An intent that decides the match finishes the room.
    pub fn game_action(
        &self,
        player_id: &str,
        action: GameAction,
        now: Instant,
    ) -> Result<ActionResult, RoomError> {
        let (room_id, handle) = self.current_room(player_id)?;
        let mut room = handle.lock();

        let changed = room.process_action(player_id, action, now);
        if !changed {
            debug!(player = player_id, action = action.as_str(), "intent had no effect");
            return Ok(ActionResult {
                room_id,
                changed,
                game: None,
                game_over: None,
            });
        }

        let game = room.game_state();
        let game_over = room.finish_if_won(now);
        Ok(ActionResult {
            room_id,
            changed,
            game: Some(game),
            game_over,
        })
    }

    /// Room info and game state of the player's current room
    pub fn sync(
        &self,
        player_id: &str,
        now: Instant,
    ) -> Result<(RoomInfo, GameStateSnapshot), RoomError> {
        let (_, handle) = self.current_room(player_id)?;
        let room = handle.lock();
        Ok((room.info(now), room.game_state()))
    }

    pub fn room_info(&self, room_id: &RoomId, now: Instant) -> Result<RoomInfo, RoomError> {
        Ok(self.room(room_id)?.lock().info(now))
    }

    pub fn mini_board(&self, player_id: &str) -> Option<MiniBoardState> {
        let (_, handle) = self.current_room(player_id).ok()?;
        let room = handle.lock();
        room.mini_board(player_id)
    }

    /// Room info of every room with a seated player
    pub fn list_rooms(&self, now: Instant) -> Vec<RoomInfo> {
        let rooms = self.directory.read().active();
        let mut infos: Vec<RoomInfo> = rooms.iter().map(|room| room.lock().info(now)).collect();
        infos.sort_by_key(|info| info.created_at);
        infos
    }

    pub fn room_count(&self) -> usize {
        self.directory.read().len()
    }

    /// Advance every room by one tick
    pub fn tick(&self, now: Instant) -> Vec<RoomEvent> {
        let rooms = self.directory.read().all();
        self.scheduler.lock().tick(&rooms, now)
    }

    /// Reclaim idle rooms when the cleanup cadence is due
    pub fn cleanup(&self, now: Instant) -> usize {
        let removed = {
            let mut directory = self.directory.write();
            self.scheduler.lock().run_cleanup(&mut directory, now)
        };
        if removed > 0 {
            self.prune_memberships();
        }
        removed
    }

    /// Reclaim idle rooms regardless of the cleanup cadence
    pub fn cleanup_now(&self, now: Instant) -> usize {
        let removed = self.directory.write().cleanup_inactive(now);
        if removed > 0 {
            self.prune_memberships();
        }
        removed
    }

    /// Forget memberships that point at reclaimed rooms
    fn prune_memberships(&self) {
        let directory = self.directory.read();
        self.memberships
            .lock()
            .retain(|_, room_id| directory.get(room_id).is_some());
    }
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new(RoomTimings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomPhase;
    use std::time::Duration;

    #[test]
    fn test_create_then_join() {
        let t0 = Instant::now();
        let lobby = Lobby::default();
        let alice = Identity::new("a", "alice");
        let bob = Identity::new("b", "bob");

        let created = lobby.create_room(&alice, 1, Some("arena"), t0).unwrap();
        assert_eq!(created.outcome, JoinOutcome::Seated);
        assert_eq!(created.info.name, "arena");

        let joined = lobby.join_room(&bob, 2, created.room_id, t0).unwrap();
        assert_eq!(joined.outcome, JoinOutcome::Seated);
        assert_eq!(joined.info.state, RoomPhase::Starting);
        assert_eq!(lobby.room_of("b"), Some(created.room_id));
        assert_eq!(lobby.list_rooms(t0).len(), 1);
    }

    #[test]
    fn test_join_unknown_room() {
        let lobby = Lobby::default();
        let missing = RoomId::new();
        let err = lobby
            .join_room(&Identity::new("a", "alice"), 1, missing, Instant::now())
            .unwrap_err();
        assert_eq!(err, RoomError::RoomNotFound(missing));
    }

    #[test]
    fn test_switching_rooms_leaves_the_old_one() {
        let t0 = Instant::now();
        let lobby = Lobby::default();
        let alice = Identity::new("a", "alice");

        let first = lobby.create_room(&alice, 1, None, t0).unwrap();
        let second = lobby.create_room(&alice, 1, None, t0).unwrap();

        let left = second.left.expect("left the first room");
        assert_eq!(left.room_id, first.room_id);
        assert_eq!(left.info.state, RoomPhase::Finished);
        assert_eq!(lobby.room_of("a"), Some(second.room_id));
    }

    #[test]
    fn test_stale_connection_does_not_evict_reconnected_player() {
        let t0 = Instant::now();
        let lobby = Lobby::default();
        let alice = Identity::new("a", "alice");

        let room = lobby.create_room(&alice, 1, None, t0).unwrap().room_id;
        let again = lobby.join_room(&alice, 2, room, t0).unwrap();
        assert_eq!(again.outcome, JoinOutcome::Reconnected);

        assert!(lobby.disconnect("a", 1, t0).is_none());
        assert_eq!(lobby.room_of("a"), Some(room));
        assert_eq!(lobby.room_info(&room, t0).unwrap().player_count, 1);

        let left = lobby.disconnect("a", 2, t0).expect("current connection leaves");
        assert_eq!(left.info.player_count, 0);
        assert_eq!(lobby.room_of("a"), None);
    }

    #[test]
    fn test_intents_require_membership() {
        let t0 = Instant::now();
        let lobby = Lobby::default();
        assert_eq!(lobby.leave_room("a", t0).unwrap_err(), RoomError::NotInRoom);
        assert_eq!(
            lobby.game_action("a", GameAction::HardDrop, t0).unwrap_err(),
            RoomError::NotInRoom
        );
        assert_eq!(lobby.set_ready("a", true, t0).unwrap_err(), RoomError::NotInRoom);
    }

    #[test]
    fn test_action_ignored_while_waiting() {
        let t0 = Instant::now();
        let lobby = Lobby::default();
        lobby
            .create_room(&Identity::new("a", "alice"), 1, None, t0)
            .unwrap();

        let result = lobby.game_action("a", GameAction::MoveLeft, t0).unwrap();
        assert!(!result.changed);
        assert!(result.game.is_none());
    }

    #[test]
    fn test_spectator_cannot_ready_up() {
        let t0 = Instant::now();
        let lobby = Lobby::default();
        let room = lobby
            .create_room(&Identity::new("a", "alice"), 1, None, t0)
            .unwrap()
            .room_id;
        lobby.join_room(&Identity::new("b", "bob"), 2, room, t0).unwrap();
        let late = lobby
            .join_room(&Identity::new("c", "carol"), 3, room, t0)
            .unwrap();

        assert_eq!(late.outcome, JoinOutcome::Spectating);
        assert_eq!(lobby.set_ready("c", true, t0).unwrap_err(), RoomError::NotSeated);
    }

    #[test]
    fn test_cleanup_forgets_reclaimed_rooms() {
        let t0 = Instant::now();
        let lobby = Lobby::default();
        let room = lobby
            .create_room(&Identity::new("a", "alice"), 1, None, t0)
            .unwrap()
            .room_id;
        lobby.leave_room("a", t0).unwrap();

        assert_eq!(lobby.cleanup_now(t0 + Duration::from_secs(60)), 0);
        assert_eq!(lobby.cleanup_now(t0 + Duration::from_secs(3 * 60 * 60)), 1);
        assert!(lobby.room_handle(&room).is_none());
    }
}
