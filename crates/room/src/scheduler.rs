//! Tick scheduler - the single clock that drives every room
//!
//! One tick, per room with at least one seated player:
//!
//! 1. forced start of a room that has waited too long
//! 2. countdown expiry (Starting -> Playing)
//! 3. per-player gravity
//! 4. a game-state snapshot for every playing room, changed or not
//! 5. Playing -> Finished once the session has a winner
//!
//! Steps produce [`RoomEvent`]s for the transport to deliver. A slower cadence
//! reclaims idle rooms.

use std::time::Instant;

use tetris_arena_core::{GameStateSnapshot, PlayerId};

use crate::config::RoomTimings;
use crate::directory::{RoomDirectory, RoomHandle};
use crate::room::{Room, RoomId, RoomInfo, RoomPhase};
use crate::timer::Interval;

pub const FORCE_START_MESSAGE: &str = "forced start after 30 s";

#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    ForceStart {
        room_id: RoomId,
        message: String,
    },
    Started {
        room_id: RoomId,
    },
    Snapshot {
        room_id: RoomId,
        info: RoomInfo,
        game: GameStateSnapshot,
    },
    GameOver {
        room_id: RoomId,
        winner: PlayerId,
        username: String,
    },
}

impl RoomEvent {
    pub fn room_id(&self) -> RoomId {
        match self {
            RoomEvent::ForceStart { room_id, .. }
            | RoomEvent::Started { room_id }
            | RoomEvent::Snapshot { room_id, .. }
            | RoomEvent::GameOver { room_id, .. } => *room_id,
        }
    }
}

#[derive(Debug)]
pub struct TickScheduler {
    cleanup: Interval,
}

impl TickScheduler {
    pub fn new(timings: &RoomTimings, now: Instant) -> Self {
        Self {
            cleanup: Interval::starting_at(timings.cleanup_interval, now),
        }
    }

    /// Run one tick over every room with a seated player
    pub fn tick(&self, rooms: &[RoomHandle], now: Instant) -> Vec<RoomEvent> {
        let mut events = Vec::new();
        for handle in rooms {
            let mut room = handle.lock();
            if room.player_count() == 0 {
                continue;
            }
            tick_room(&mut room, now, &mut events);
        }
        events
    }

    /// Whether the slow cleanup cadence has come round; consumes the firing
    pub fn cleanup_due(&mut self, now: Instant) -> bool {
        self.cleanup.poll(now)
    }

    /// Reclaim idle rooms if the cleanup cadence is due
    pub fn run_cleanup(&mut self, directory: &mut RoomDirectory, now: Instant) -> usize {
        if !self.cleanup_due(now) {
            return 0;
        }
        directory.cleanup_inactive(now)
    }
}

/// One tick for one room, appending what happened to `events`
pub fn tick_room(room: &mut Room, now: Instant, events: &mut Vec<RoomEvent>) {
    let room_id = room.id();

    if room.forced_start_due(now) && room.force_start(now) {
        events.push(RoomEvent::ForceStart {
            room_id,
            message: FORCE_START_MESSAGE.to_string(),
        });
    }

    if room.advance_countdown(now) {
        events.push(RoomEvent::Started { room_id });
    }

    if room.phase() != RoomPhase::Playing {
        return;
    }

    room.apply_gravity(now);

    events.push(RoomEvent::Snapshot {
        room_id,
        info: room.info(now),
        game: room.game_state(),
    });

    if let Some(game_over) = room.finish_if_won(now) {
        events.push(RoomEvent::GameOver {
            room_id,
            winner: game_over.winner,
            username: game_over.username,
        });
    }
}
