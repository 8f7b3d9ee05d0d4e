//! Arena server (default binary).
//!
//! Binds the TCP adapter, drives the lobby tick and runs until Ctrl-C.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use tetris_arena::adapter::{init_tracing, run_server, ServerConfig};
use tetris_arena::room::{Lobby, RoomTimings};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let timings = RoomTimings::from_env();
    let config = ServerConfig::from_env();
    info!(?timings, host = %config.host, port = config.port, "starting arena server");

    let lobby = Arc::new(Lobby::new(timings));

    tokio::select! {
        result = run_server(config, lobby, None) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}
