//! Game session - one match between up to eight seated players
//!
//! The session owns every player's state and applies intents to it. Landing a piece
//! clears lines, scores, attacks an opponent when two or more lines went at once,
//! spawns the next piece and then checks for a top-out and for a winner.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::penalty::{generate_penalty_rows, select_target};
use crate::pieces::try_rotate;
use crate::player::{PlayerGameState, PlayerId, PlayerStatus};
use crate::scoring::calculate_score;
use crate::snapshot::{GameStateSnapshot, MiniBoardState, PlayerSnapshot};
use crate::types::{Cell, GameAction, BOARD_WIDTH, MAX_PENALTY_ROWS, MAX_SEATED_PLAYERS};

/// Result of adding a player to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    Seated,
    Spectating,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// Players are being seated; nothing falls yet
    #[default]
    Lobby,
    Active,
    Finished {
        winner: PlayerId,
    },
}

#[derive(Debug, Clone)]
pub struct GameSession {
    players: HashMap<PlayerId, PlayerGameState>,
    active_players: Vec<PlayerId>,
    spectators: Vec<PlayerId>,
    status: SessionStatus,
    started_at_ms: Option<u64>,
    /// Drives penalty targeting, hole placement and per-player queue seeds
    rng: StdRng,
}

impl GameSession {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Session whose every random choice follows from `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            players: HashMap::new(),
            active_players: Vec::new(),
            spectators: Vec::new(),
            status: SessionStatus::Lobby,
            started_at_ms: None,
            rng,
        }
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn winner(&self) -> Option<&PlayerId> {
        match &self.status {
            SessionStatus::Finished { winner } => Some(winner),
            _ => None,
        }
    }

    pub fn started_at_ms(&self) -> Option<u64> {
        self.started_at_ms
    }

    pub fn players(&self) -> &HashMap<PlayerId, PlayerGameState> {
        &self.players
    }

    pub fn player(&self, id: &str) -> Option<&PlayerGameState> {
        self.players.get(id)
    }

    /// Direct access to a player's state, for tooling and scripted scenarios
    pub fn player_mut(&mut self, id: &str) -> Option<&mut PlayerGameState> {
        self.players.get_mut(id)
    }

    pub fn active_players(&self) -> &[PlayerId] {
        &self.active_players
    }

    pub fn spectators(&self) -> &[PlayerId] {
        &self.spectators
    }

    fn is_seated(&self, id: &str) -> bool {
        self.active_players.iter().any(|p| p == id)
    }

    /// Seat a player, or make them a spectator when all seats are taken
    pub fn add_player(&mut self, id: &str, username: &str) -> Seat {
        if self.players.contains_key(id) {
            return Seat::Seated;
        }

        if self.active_players.len() >= MAX_SEATED_PLAYERS {
            if !self.spectators.iter().any(|s| s == id) {
                self.spectators.push(id.to_string());
            }
            debug!(player = id, "session full, added as spectator");
            return Seat::Spectating;
        }

        self.spectators.retain(|s| s != id);
        let seed = self.rng.random::<u64>();
        let player = PlayerGameState::new(id.to_string(), username.to_string(), seed);
        self.players.insert(id.to_string(), player);
        self.active_players.push(id.to_string());
        Seat::Seated
    }

    /// Remove a player or spectator; their state and piece queue are dropped
    ///
    /// While the session is running this can leave a single player standing, so
    /// the winner is re-evaluated.
    pub fn remove_player(&mut self, id: &str) -> bool {
        let before = self.active_players.len() + self.spectators.len();
        self.active_players.retain(|p| p != id);
        self.spectators.retain(|s| s != id);
        let had_state = self.players.remove(id).is_some();

        let removed = had_state || before != self.active_players.len() + self.spectators.len();
        if removed && self.is_active() {
            self.check_winner();
        }
        removed
    }

    /// Spawn every seated player's first piece and start the match
    ///
    /// Only a session that has not started yet and has at least one seated player
    /// can start.
    pub fn start(&mut self) -> bool {
        if self.status != SessionStatus::Lobby || self.active_players.is_empty() {
            return false;
        }

        for id in &self.active_players {
            if let Some(player) = self.players.get_mut(id) {
                player.spawn_next();
            }
        }

        self.status = SessionStatus::Active;
        self.started_at_ms = Some(unix_millis());
        info!(players = self.active_players.len(), "game session started");
        true
    }

    /// Apply one intent for a player
    ///
    /// Returns false without touching anything unless the session is running, the
    /// player is seated and still in the game. Otherwise returns whether the intent
    /// changed state; a blocked `MoveDown` lands the piece and counts as a change.
    pub fn process_action(&mut self, player_id: &str, action: GameAction) -> bool {
        if !self.is_active() || !self.is_seated(player_id) {
            debug!(player = player_id, action = action.as_str(), "action ignored");
            return false;
        }

        match self.players.get(player_id) {
            Some(player) if !player.is_game_over() && player.current_piece.is_some() => {}
            _ => return false,
        }

        match action {
            GameAction::MoveLeft => self.try_shift(player_id, -1),
            GameAction::MoveRight => self.try_shift(player_id, 1),
            GameAction::MoveDown => self.move_down(player_id),
            GameAction::Rotate { clockwise } => self.try_rotate(player_id, clockwise),
            GameAction::HardDrop => self.hard_drop(player_id),
        }
    }

    fn try_shift(&mut self, id: &str, dx: i8) -> bool {
        let Some(player) = self.players.get_mut(id) else {
            return false;
        };
        let Some(piece) = player.current_piece else {
            return false;
        };

        let moved = piece.moved(dx, 0);
        if player.board.collides(&moved.cells()) {
            return false;
        }
        player.current_piece = Some(moved);
        true
    }

    fn move_down(&mut self, id: &str) -> bool {
        let Some(player) = self.players.get_mut(id) else {
            return false;
        };
        let Some(piece) = player.current_piece else {
            return false;
        };

        let moved = piece.moved(0, 1);
        if !player.board.collides(&moved.cells()) {
            player.current_piece = Some(moved);
            return true;
        }

        self.land(id);
        true
    }

    fn try_rotate(&mut self, id: &str, clockwise: bool) -> bool {
        let Some(player) = self.players.get_mut(id) else {
            return false;
        };
        let Some(piece) = player.current_piece else {
            return false;
        };

        let board = &player.board;
        match try_rotate(&piece, clockwise, |cells| board.collides(cells)) {
            Some(rotated) => {
                player.current_piece = Some(rotated);
                true
            }
            None => false,
        }
    }

    fn hard_drop(&mut self, id: &str) -> bool {
        let Some(player) = self.players.get_mut(id) else {
            return false;
        };
        let Some(mut piece) = player.current_piece else {
            return false;
        };

        while !player.board.collides(&piece.moved(0, 1).cells()) {
            piece = piece.moved(0, 1);
        }
        player.current_piece = Some(piece);

        self.land(id);
        true
    }

    /// Write the current piece into the board and run the post-landing rules
    fn land(&mut self, id: &str) {
        let lines = {
            let Some(player) = self.players.get_mut(id) else {
                return;
            };
            let Some(piece) = player.current_piece.take() else {
                return;
            };

            player.board.land(&piece.cells(), Cell::Block(piece.kind));
            let lines = player.board.clear_lines();

            if lines > 0 {
                player.combo += 1;
                let result = calculate_score(lines, player.combo);
                player.score = player.score.saturating_add(result.total);
                player.lines_cleared += lines as u32;
            } else {
                player.combo = 0;
            }
            lines
        };

        if lines >= 2 {
            self.apply_penalty(id, (lines - 1).min(MAX_PENALTY_ROWS));
        }

        if let Some(player) = self.players.get_mut(id) {
            player.spawn_next();
        }

        self.check_game_over(id);
        self.check_winner();
    }

    /// Send `row_count` penalty rows from `source` to a weighted-random opponent
    fn apply_penalty(&mut self, source: &str, row_count: usize) -> bool {
        let Some(target) =
            select_target(source, &self.active_players, &self.players, &mut self.rng)
        else {
            return false;
        };

        let rows = generate_penalty_rows(row_count, BOARD_WIDTH as usize, &mut self.rng);

        if let Some(target_state) = self.players.get_mut(&target) {
            target_state.board.apply_penalty_rows(&rows);
            target_state.penalties_received += 1;
        }
        if let Some(source_state) = self.players.get_mut(source) {
            source_state.penalties_given += 1;
        }

        debug!(source, target = %target, rows = row_count, "penalty applied");
        true
    }

    /// Eliminate the player if their freshly spawned piece does not fit
    fn check_game_over(&mut self, id: &str) -> bool {
        let Some(player) = self.players.get_mut(id) else {
            return false;
        };
        if !player.current_piece_collides() {
            return false;
        }

        player.status = PlayerStatus::GameOver;
        self.active_players.retain(|p| p != id);
        if !self.spectators.iter().any(|s| s == id) {
            self.spectators.push(id.to_string());
        }
        info!(player = id, "player topped out");
        true
    }

    /// Finish the session when at most one seated player is left
    ///
    /// A lone survivor wins. With nobody left, the most recent spectator (the last
    /// player eliminated) wins.
    fn check_winner(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }

        let winner = match self.active_players.as_slice() {
            [only] => only.clone(),
            [] => match self.spectators.last() {
                Some(last) => last.clone(),
                None => return false,
            },
            _ => return false,
        };

        info!(winner = %winner, "game session finished");
        self.status = SessionStatus::Finished { winner };
        true
    }

    /// Owned copy of the whole session for broadcasting
    pub fn snapshot(&self) -> GameStateSnapshot {
        GameStateSnapshot {
            players: self
                .players
                .iter()
                .map(|(id, state)| (id.clone(), PlayerSnapshot::from(state)))
                .collect(),
            active_players: self.active_players.clone(),
            spectators: self.spectators.clone(),
            start_time: self.started_at_ms,
            is_active: self.is_active(),
            winner: self.winner().cloned(),
        }
    }

    pub fn mini_board(&self, id: &str) -> Option<MiniBoardState> {
        self.players.get(id).map(MiniBoardState::from)
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
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
    use crate::pieces::Tetromino;
    use crate::types::{PieceKind, Rotation};

    fn two_player_session() -> GameSession {
        let mut session = GameSession::with_seed(42);
        session.add_player("a", "alice");
        session.add_player("b", "bob");
        assert!(session.start());
        session
    }

    fn place(session: &mut GameSession, id: &str, piece: Tetromino) {
        session.player_mut(id).unwrap().current_piece = Some(piece);
    }

    #[test]
    fn test_actions_rejected_before_start() {
        let mut session = GameSession::with_seed(1);
        session.add_player("a", "alice");
        assert!(!session.process_action("a", GameAction::MoveLeft));
        assert!(session.player("a").unwrap().current_piece.is_none());
    }

    #[test]
    fn test_start_requires_a_player() {
        let mut session = GameSession::with_seed(1);
        assert!(!session.start());
        assert_eq!(session.status(), &SessionStatus::Lobby);
    }

    #[test]
    fn test_ninth_player_spectates() {
        let mut session = GameSession::with_seed(1);
        for i in 0..8 {
            assert_eq!(session.add_player(&format!("p{i}"), "x"), Seat::Seated);
        }
        assert_eq!(session.add_player("p8", "x"), Seat::Spectating);
        assert_eq!(session.active_players().len(), 8);
        assert_eq!(session.spectators(), &["p8".to_string()]);
        assert!(session.player("p8").is_none());
    }

    #[test]
    fn test_move_left_stops_at_wall() {
        let mut session = two_player_session();
        place(&mut session, "a", Tetromino::at(PieceKind::O, 0, 5, Rotation::North));
        assert!(!session.process_action("a", GameAction::MoveLeft));
        assert!(session.process_action("a", GameAction::MoveRight));
        assert_eq!(session.player("a").unwrap().current_piece.unwrap().x, 1);
    }

    #[test]
    fn test_blocked_move_down_lands_piece() {
        let mut session = two_player_session();
        place(&mut session, "a", Tetromino::at(PieceKind::O, 0, 18, Rotation::North));

        assert!(session.process_action("a", GameAction::MoveDown));
        let player = session.player("a").unwrap();
        assert_eq!(player.board.filled_count(), 4);
        assert_eq!(player.board.get(0, 19), Some(Cell::Block(PieceKind::O)));
        let next = player.current_piece.unwrap();
        assert_eq!((next.x, next.y), (4, 0));
    }

    #[test]
    fn test_hard_drop_lands_once() {
        let mut session = two_player_session();
        place(&mut session, "a", Tetromino::at(PieceKind::O, 4, 0, Rotation::North));
        assert!(session.process_action("a", GameAction::HardDrop));

        let board = &session.player("a").unwrap().board;
        assert_eq!(board.filled_count(), 4);
        assert!(board.is_occupied(4, 19));
        assert!(board.is_occupied(5, 18));
    }

    #[test]
    fn test_combo_bonus_on_consecutive_clears() {
        let mut session = two_player_session();
        for round in 0..2 {
            {
                let player = session.player_mut("a").unwrap();
                for x in 4..10 {
                    player.board.set(x, 19, Cell::Penalty);
                }
            }
            place(&mut session, "a", Tetromino::at(PieceKind::I, 2, 0, Rotation::East));
            // Horizontal I spans x-1..=x+2, so one step left fills the gap in row 19.
            assert!(session.process_action("a", GameAction::MoveLeft));
            assert!(session.process_action("a", GameAction::HardDrop));
            let player = session.player("a").unwrap();
            assert_eq!(player.combo, round + 1);
        }
        let player = session.player("a").unwrap();
        assert_eq!(player.lines_cleared, 2);
        assert_eq!(player.score, 100 + 100 + 50);
    }

    #[test]
    fn test_top_out_moves_player_to_spectators_and_declares_winner() {
        let mut session = two_player_session();
        {
            let player = session.player_mut("a").unwrap();
            for y in 0..20 {
                player.board.set(4, y, Cell::Penalty);
                player.board.set(5, y, Cell::Penalty);
            }
        }
        place(&mut session, "a", Tetromino::at(PieceKind::O, 0, 18, Rotation::North));
        assert!(session.process_action("a", GameAction::MoveDown));

        let a = session.player("a").unwrap();
        assert!(a.is_game_over());
        assert_eq!(session.active_players(), &["b".to_string()]);
        assert_eq!(session.spectators(), &["a".to_string()]);
        assert_eq!(session.winner().map(String::as_str), Some("b"));
        assert!(!session.is_active());
        assert!(!session.process_action("b", GameAction::MoveLeft));
    }

    #[test]
    fn test_leaving_player_hands_win_to_survivor() {
        let mut session = two_player_session();
        assert!(session.remove_player("b"));
        assert_eq!(session.winner().map(String::as_str), Some("a"));
        assert!(session.player("b").is_none());
        assert!(!session.remove_player("b"));
    }
}
