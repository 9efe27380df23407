//! Flapper bot: connects to a server and steers through the gaps.

use anyhow::Context;
use client::{Autopilot, GameClient};
use protocol::packets::PlayerInput;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_SERVER: &str = "127.0.0.1:5001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SERVER.to_string());

    let mut client = GameClient::connect(&addr)
        .await
        .with_context(|| format!("connect to {addr}"))?;
    let player_id = client.player_id();
    info!("Connected to {} as player {}", addr, player_id);

    let pilot = Autopilot::default();
    let mut last_score = None;
    loop {
        let snapshot = client.next_snapshot().await?;
        let Some(me) = snapshot.player(player_id) else {
            continue;
        };

        let score = (me.current_score, me.max_score);
        if last_score != Some(score) {
            info!("Score {} (best {})", score.0, score.1);
            last_score = Some(score);
        }

        if pilot.should_jump(&snapshot, player_id) {
            client.send_input(PlayerInput::new(true)).await?;
        }
    }
}
