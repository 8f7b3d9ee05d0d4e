//! Tetris arena (workspace facade crate).
//!
//! Re-exports the member crates under one name so that binaries, benches and
//! integration tests can write `tetris_arena::{core,room,adapter,types}`.

pub use tetris_arena_adapter as adapter;
pub use tetris_arena_core as core;
pub use tetris_arena_room as room;
pub use tetris_arena_types as types;
