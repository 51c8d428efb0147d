mod commands;
mod config;
mod controller;
mod crc32;
mod error;
mod hid;
mod hider;
mod input;
mod lightbar;
mod link;
mod mapping;
mod output;
mod profile;
mod supervisor;
mod synthetic_input;
mod virtual_pad;
mod xbox;

use supervisor::Supervisor;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("padlink starting...");

    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, mut event_rx) = mpsc::channel(32);

    // The event stream has no consumer in this crate yet — a future UI
    // layer attaches here. Drain it so the supervisor's sends never block.
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            log::debug!("engine event: {event:?}");
        }
    });

    // No UI layer wired up yet — dropping the sender lets the command task
    // exit cleanly instead of blocking forever on an empty channel.
    drop(cmd_tx);

    let supervisor = Supervisor::new(cmd_rx, event_tx);
    supervisor.run().await;
}
