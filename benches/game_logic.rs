use std::time::{Duration, Instant};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tetris_arena::core::types::{Cell, GameAction, PieceKind};
use tetris_arena::core::{Board, GameSession};
use tetris_arena::room::{tick_room, Room, RoomTimings};

fn bench_line_clear(c: &mut Criterion) {
    c.bench_function("clear_4_lines", |b| {
        b.iter(|| {
            let mut board = Board::new();
            // Fill bottom 4 rows
            for y in 16..20 {
                for x in 0..10 {
                    board.set(x, y, Cell::Block(PieceKind::I));
                }
            }
            black_box(board.clear_lines());
        })
    });
}

fn bench_hard_drop(c: &mut Criterion) {
    c.bench_function("hard_drop_until_top_out", |b| {
        b.iter(|| {
            let mut session = GameSession::with_seed(12345);
            session.add_player("a", "alice");
            session.add_player("b", "bob");
            session.start();
            while session.is_active() {
                session.process_action(black_box("a"), GameAction::HardDrop);
            }
        })
    });
}

fn bench_room_tick(c: &mut Criterion) {
    let t0 = Instant::now();
    let mut room = Room::with_seed("bench", RoomTimings::default(), 12345, t0);
    for i in 0..8 {
        room.add_player(&format!("p{i}"), "player", i, t0);
    }
    let mut now = t0 + Duration::from_secs(5);
    let mut events = Vec::new();

    c.bench_function("room_tick_8_players", |b| {
        b.iter(|| {
            now += Duration::from_millis(100);
            events.clear();
            tick_room(&mut room, black_box(now), &mut events);
        })
    });
}

criterion_group!(benches, bench_line_clear, bench_hard_drop, bench_room_tick);
criterion_main!(benches);
