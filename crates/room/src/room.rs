//! Room lifecycle
//!
//! A room owns its roster, its spectators, one game session and the per-player
//! gravity timers. States move one way:
//!
//! ```text
//! Waiting -> Starting -> Playing -> Finished
//!    ^          |
//!    +----------+  (roster dropped below two during the countdown)
//! ```
//!
//! An empty roster outside `Playing` also finishes the room, which marks it for
//! reclamation by the directory.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tetris_arena_core::types::GameAction;
use tetris_arena_core::{GameSession, GameStateSnapshot, MiniBoardState, PlayerId};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::RoomTimings;
use crate::timer::{Countdown, Interval};

/// Transport-level handle of the connection a player is reachable on
pub type ConnectionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(Uuid);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RoomId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomPlayer {
    pub id: PlayerId,
    pub username: String,
    pub connection: ConnectionId,
    pub is_ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Waiting,
    /// Counting down to the first piece; dropping the countdown cancels it
    Starting {
        countdown: Countdown,
    },
    Playing,
    Finished,
}

impl RoomState {
    pub fn phase(&self) -> RoomPhase {
        match self {
            RoomState::Waiting => RoomPhase::Waiting,
            RoomState::Starting { .. } => RoomPhase::Starting,
            RoomState::Playing => RoomPhase::Playing,
            RoomState::Finished => RoomPhase::Finished,
        }
    }
}

/// `RoomState` without its timer, as shown to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomPhase {
    Waiting,
    Starting,
    Playing,
    Finished,
}

/// How a player ended up in a room after joining it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Seated,
    /// Already on the roster; only the connection was updated
    Reconnected,
    Spectating,
}

impl JoinOutcome {
    pub fn is_player(&self) -> bool {
        !matches!(self, JoinOutcome::Spectating)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: PlayerId,
    pub username: String,
    pub is_ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub id: RoomId,
    pub name: String,
    pub state: RoomPhase,
    pub player_count: usize,
    pub spectator_count: usize,
    pub players: Vec<RosterEntry>,
    /// Unix milliseconds
    pub created_at: u64,
    pub first_join_elapsed_seconds: Option<u64>,
}

/// The winner of a finished match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOver {
    pub winner: PlayerId,
    pub username: String,
}

#[derive(Debug)]
pub struct Room {
    id: RoomId,
    name: String,
    state: RoomState,
    players: Vec<RoomPlayer>,
    spectators: Vec<PlayerId>,
    session: GameSession,
    auto_drop: HashMap<PlayerId, Interval>,
    timings: RoomTimings,
    created_at_ms: u64,
    first_join: Option<Instant>,
    last_activity: Instant,
}

impl Room {
    pub fn new(name: impl Into<String>, timings: RoomTimings, now: Instant) -> Self {
        Self::with_session(name, timings, GameSession::new(), now)
    }

    /// Room whose session draws every random choice from `seed`
    pub fn with_seed(name: impl Into<String>, timings: RoomTimings, seed: u64, now: Instant) -> Self {
        Self::with_session(name, timings, GameSession::with_seed(seed), now)
    }

    fn with_session(
        name: impl Into<String>,
        timings: RoomTimings,
        session: GameSession,
        now: Instant,
    ) -> Self {
        Self {
            id: RoomId::new(),
            name: name.into(),
            state: RoomState::Waiting,
            players: Vec::new(),
            spectators: Vec::new(),
            session,
            auto_drop: HashMap::new(),
            timings,
            created_at_ms: unix_millis(),
            first_join: None,
            last_activity: now,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &RoomState {
        &self.state
    }

    pub fn phase(&self) -> RoomPhase {
        self.state.phase()
    }

    pub fn players(&self) -> &[RoomPlayer] {
        &self.players
    }

    pub fn player(&self, id: &str) -> Option<&RoomPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn spectators(&self) -> &[PlayerId] {
        &self.spectators
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn spectator_count(&self) -> usize {
        self.spectators.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.player(id).is_some() || self.spectators.iter().any(|s| s == id)
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Direct access to the session, for tooling and scripted scenarios
    pub fn session_mut(&mut self) -> &mut GameSession {
        &mut self.session
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Whether a newcomer would be seated rather than made a spectator
    pub fn can_join(&self) -> bool {
        self.state == RoomState::Waiting && self.players.len() < self.timings.max_players
    }

    pub fn add_player(
        &mut self,
        id: &str,
        username: &str,
        connection: ConnectionId,
        now: Instant,
    ) -> JoinOutcome {
        if let Some(existing) = self.players.iter_mut().find(|p| p.id == id) {
            existing.connection = connection;
            self.touch(now);
            debug!(room = %self.id, player = id, "player reconnected");
            return JoinOutcome::Reconnected;
        }

        if !self.can_join() {
            if !self.spectators.iter().any(|s| s == id) {
                self.spectators.push(id.to_string());
            }
            self.touch(now);
            info!(room = %self.id, player = id, "joined as spectator");
            return JoinOutcome::Spectating;
        }

        self.spectators.retain(|s| s != id);
        self.players.push(RoomPlayer {
            id: id.to_string(),
            username: username.to_string(),
            connection,
            is_ready: false,
        });
        self.session.add_player(id, username);
        self.touch(now);
        info!(room = %self.id, player = id, roster = self.players.len(), "player seated");

        if self.players.len() == 1 && self.first_join.is_none() {
            self.first_join = Some(now);
        }
        if self.players.len() >= 2 {
            self.begin_countdown(now);
        }

        JoinOutcome::Seated
    }

    /// Remove a seated player or a spectator
    pub fn remove_player(&mut self, id: &str, now: Instant) -> bool {
        if let Some(index) = self.players.iter().position(|p| p.id == id) {
            self.players.remove(index);
            self.session.remove_player(id);
            self.auto_drop.remove(id);
            self.touch(now);
            info!(room = %self.id, player = id, roster = self.players.len(), "player left");

            if self.players.len() < 2 && matches!(self.state, RoomState::Starting { .. }) {
                self.state = RoomState::Waiting;
                info!(room = %self.id, "countdown cancelled");
            }

            if self.players.is_empty() && self.state != RoomState::Playing {
                self.state = RoomState::Finished;
                self.first_join = None;
                info!(room = %self.id, "room emptied");
            }
            return true;
        }

        let before = self.spectators.len();
        self.spectators.retain(|s| s != id);
        if self.spectators.len() == before {
            return false;
        }
        self.touch(now);
        true
    }

    pub fn set_player_ready(&mut self, id: &str, ready: bool, now: Instant) -> bool {
        let Some(player) = self.players.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        player.is_ready = ready;
        self.touch(now);

        if self.all_players_ready() && self.players.len() >= 2 {
            self.begin_countdown(now);
        }
        true
    }

    pub fn all_players_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.is_ready)
    }

    /// Waiting -> Starting; any other state is left alone
    pub fn begin_countdown(&mut self, now: Instant) -> bool {
        if self.state != RoomState::Waiting {
            return false;
        }
        self.state = RoomState::Starting {
            countdown: Countdown::new(now, self.timings.start_countdown),
        };
        self.touch(now);
        info!(room = %self.id, roster = self.players.len(), "countdown started");
        true
    }

    /// Whether a waiting room has sat long enough since its first join
    pub fn forced_start_due(&self, now: Instant) -> bool {
        self.state == RoomState::Waiting
            && !self.players.is_empty()
            && self.first_join.is_some_and(|first| {
                now.saturating_duration_since(first) >= self.timings.forced_start
            })
    }

    /// Start the countdown without the two-player minimum
    pub fn force_start(&mut self, now: Instant) -> bool {
        if !self.begin_countdown(now) {
            return false;
        }
        self.first_join = None;
        info!(room = %self.id, "forced start");
        true
    }

    /// Starting -> Playing once the countdown has run out
    pub fn advance_countdown(&mut self, now: Instant) -> bool {
        let RoomState::Starting { countdown } = self.state else {
            return false;
        };
        if !countdown.is_elapsed(now) {
            return false;
        }

        self.state = RoomState::Playing;
        self.session.start();
        self.first_join = None;
        self.auto_drop.clear();
        self.touch(now);
        info!(room = %self.id, players = self.session.active_players().len(), "game started");
        true
    }

    /// Apply a player's intent; only a playing room accepts intents
    pub fn process_action(&mut self, id: &str, action: GameAction, now: Instant) -> bool {
        if self.state != RoomState::Playing {
            return false;
        }
        let changed = self.session.process_action(id, action);
        if changed {
            self.touch(now);
        }
        changed
    }

    /// Move every active player's piece down once their gravity period has passed
    ///
    /// Each player has their own timer; a player without one is due at once.
    /// Returns how many players were dropped.
    pub fn apply_gravity(&mut self, now: Instant) -> usize {
        if self.state != RoomState::Playing {
            return 0;
        }

        let period = self.timings.auto_drop;
        let mut dropped = 0;
        for id in self.session.active_players().to_vec() {
            let timer = self
                .auto_drop
                .entry(id.clone())
                .or_insert_with(|| Interval::new(period));
            if timer.poll(now) {
                self.session.process_action(&id, GameAction::MoveDown);
                dropped += 1;
            }
        }
        if dropped > 0 {
            self.touch(now);
        }
        dropped
    }

    /// Playing -> Finished once the session has a winner
    pub fn finish_if_won(&mut self, now: Instant) -> Option<GameOver> {
        if self.state != RoomState::Playing {
            return None;
        }
        let winner = self.session.winner()?.clone();
        let username = self
            .session
            .player(&winner)
            .map(|p| p.username.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        self.end_game(now);
        info!(room = %self.id, winner = %winner, "room finished");
        Some(GameOver { winner, username })
    }

    /// Playing -> Finished
    pub fn end_game(&mut self, now: Instant) -> bool {
        if self.state != RoomState::Playing {
            return false;
        }
        self.state = RoomState::Finished;
        self.auto_drop.clear();
        self.touch(now);
        true
    }

    pub fn first_join_elapsed(&self, now: Instant) -> Option<u64> {
        self.first_join
            .map(|first| now.saturating_duration_since(first).as_secs())
    }

    pub fn info(&self, now: Instant) -> RoomInfo {
        RoomInfo {
            id: self.id,
            name: self.name.clone(),
            state: self.phase(),
            player_count: self.players.len(),
            spectator_count: self.spectators.len(),
            players: self
                .players
                .iter()
                .map(|p| RosterEntry {
                    id: p.id.clone(),
                    username: p.username.clone(),
                    is_ready: p.is_ready,
                })
                .collect(),
            created_at: self.created_at_ms,
            first_join_elapsed_seconds: self.first_join_elapsed(now),
        }
    }

    pub fn game_state(&self) -> GameStateSnapshot {
        self.session.snapshot()
    }

    pub fn mini_board(&self, id: &str) -> Option<MiniBoardState> {
        self.session.mini_board(id)
    }

    /// Idle for longer than the reclamation threshold
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_activity) > self.timings.idle_timeout
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn room(now: Instant) -> Room {
        Room::with_seed("test", RoomTimings::default(), 9, now)
    }

    #[test]
    fn test_second_player_starts_countdown() {
        let t0 = Instant::now();
        let mut room = room(t0);

        assert_eq!(room.add_player("a", "alice", 1, t0), JoinOutcome::Seated);
        assert_eq!(room.phase(), RoomPhase::Waiting);
        assert_eq!(room.add_player("b", "bob", 2, t0), JoinOutcome::Seated);
        assert_eq!(room.phase(), RoomPhase::Starting);
        assert!(!room.can_join());
    }

    #[test]
    fn test_countdown_cancelled_when_roster_drops() {
        let t0 = Instant::now();
        let mut room = room(t0);
        room.add_player("a", "alice", 1, t0);
        room.add_player("b", "bob", 2, t0);

        assert!(room.remove_player("b", t0 + Duration::from_secs(1)));
        assert_eq!(room.phase(), RoomPhase::Waiting);
        assert!(!room.advance_countdown(t0 + Duration::from_secs(10)));
    }

    #[test]
    fn test_countdown_elapses_into_playing() {
        let t0 = Instant::now();
        let mut room = room(t0);
        room.add_player("a", "alice", 1, t0);
        room.add_player("b", "bob", 2, t0);

        assert!(!room.advance_countdown(t0 + Duration::from_millis(4999)));
        assert!(room.advance_countdown(t0 + Duration::from_secs(5)));
        assert_eq!(room.phase(), RoomPhase::Playing);
        assert!(room.session().is_active());
        assert!(room.session().player("a").unwrap().current_piece.is_some());
        assert_eq!(room.first_join_elapsed(t0), None);
    }

    #[test]
    fn test_reconnect_updates_connection() {
        let t0 = Instant::now();
        let mut room = room(t0);
        room.add_player("a", "alice", 1, t0);
        assert_eq!(room.add_player("a", "alice", 7, t0), JoinOutcome::Reconnected);
        assert_eq!(room.player_count(), 1);
        assert_eq!(room.player("a").unwrap().connection, 7);
    }

    #[test]
    fn test_late_joiner_spectates() {
        let t0 = Instant::now();
        let mut room = room(t0);
        room.add_player("a", "alice", 1, t0);
        room.add_player("b", "bob", 2, t0);
        room.advance_countdown(t0 + Duration::from_secs(5));

        assert_eq!(room.add_player("c", "carol", 3, t0), JoinOutcome::Spectating);
        assert_eq!(room.spectator_count(), 1);
        assert!(room.session().player("c").is_none());
        assert!(room.remove_player("c", t0));
        assert!(!room.remove_player("c", t0));
    }

    #[test]
    fn test_all_ready_starts_countdown() {
        let t0 = Instant::now();
        let mut room = room(t0);
        room.add_player("a", "alice", 1, t0);
        assert!(room.set_player_ready("a", true, t0));
        // A single ready player is not enough.
        assert_eq!(room.phase(), RoomPhase::Waiting);
        assert!(!room.set_player_ready("ghost", true, t0));
    }

    #[test]
    fn test_forced_start_after_wait() {
        let t0 = Instant::now();
        let mut room = room(t0);
        room.add_player("a", "alice", 1, t0);

        assert!(!room.forced_start_due(t0 + Duration::from_secs(29)));
        assert_eq!(room.first_join_elapsed(t0 + Duration::from_secs(29)), Some(29));
        assert!(room.forced_start_due(t0 + Duration::from_secs(30)));
        assert!(room.force_start(t0 + Duration::from_secs(30)));
        assert_eq!(room.phase(), RoomPhase::Starting);
        assert!(!room.forced_start_due(t0 + Duration::from_secs(31)));
    }

    #[test]
    fn test_empty_room_finishes_and_expires() {
        let t0 = Instant::now();
        let mut room = room(t0);
        room.add_player("a", "alice", 1, t0);
        room.remove_player("a", t0);

        assert_eq!(room.phase(), RoomPhase::Finished);
        assert!(!room.is_expired(t0 + Duration::from_secs(2 * 60 * 60)));
        assert!(room.is_expired(t0 + Duration::from_secs(2 * 60 * 60 + 1)));
    }

    #[test]
    fn test_gravity_respects_per_player_period() {
        let t0 = Instant::now();
        let mut room = room(t0);
        room.add_player("a", "alice", 1, t0);
        room.add_player("b", "bob", 2, t0);
        let start = t0 + Duration::from_secs(5);
        room.advance_countdown(start);

        let y_of = |room: &Room| room.session().player("a").unwrap().current_piece.unwrap().y;
        let y0 = y_of(&room);

        assert_eq!(room.apply_gravity(start), 2);
        assert_eq!(y_of(&room), y0 + 1);
        assert_eq!(room.apply_gravity(start + Duration::from_millis(500)), 0);
        assert_eq!(room.apply_gravity(start + Duration::from_millis(1000)), 2);
        assert_eq!(y_of(&room), y0 + 2);
    }

    #[test]
    fn test_info_serialises_roster() {
        let t0 = Instant::now();
        let mut room = room(t0);
        room.add_player("a", "alice", 1, t0);
        room.set_player_ready("a", true, t0);

        let value = serde_json::to_value(room.info(t0)).unwrap();
        assert_eq!(value["state"], "waiting");
        assert_eq!(value["playerCount"], 1);
        assert_eq!(value["players"][0]["isReady"], true);
        assert_eq!(value["firstJoinElapsedSeconds"], 0);
        assert_eq!(value["id"], room.id().to_string());
    }
}
