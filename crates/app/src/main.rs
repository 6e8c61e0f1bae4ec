use activity::ActivityBuilder;
use anyhow::Context;
use app::{host, Flow, PresenceSession};
use clap::Parser;
use presence_core::new_notice_channel;
use rpc::DiscordConnector;
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use workspace::{PresenceSettings, WatchEvent, WatchedFile, WorkspaceService};

/// Reports the active file, workspace and branch to the chat client's rich presence.
///
/// Speaks line-delimited JSON with the editor plugin over stdin/stdout.
#[derive(Debug, Parser)]
#[command(name = "editor-presence", version)]
struct Args {
    /// Settings file (defaults to the per-user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    rt.block_on(run(args))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let settings_path = match args.config {
        Some(path) => path,
        None => PresenceSettings::default_path()
            .context("no per-user config directory, pass --config")?,
    };
    tracing::info!(
        "editor-presence v{}, settings at {}",
        env!("CARGO_PKG_VERSION"),
        settings_path.display()
    );

    let mut workspace = WorkspaceService::open(settings_path);
    if let Err(e) = workspace.start_watching() {
        tracing::warn!("file watching unavailable: {e}");
    }
    let mut watch_rx = workspace.watch_events();

    let (notice_tx, notice_rx) = new_notice_channel(64);
    let writer = host::spawn_notice_writer(notice_rx);
    let mut host_rx = host::spawn_stdin_reader(64);

    // The session lives on the block_on thread, outside the worker pool, so
    // its blocking IPC calls never stall the spawned reader and writer.
    let mut session =
        PresenceSession::new(DiscordConnector, ActivityBuilder::new(), workspace, notice_tx);

    loop {
        let deadline = session.next_deadline();
        tokio::select! {
            message = host_rx.recv() => match message {
                Some(message) => {
                    if session.handle_message(message, Instant::now()) == Flow::Shutdown {
                        break;
                    }
                }
                None => {
                    session.deactivate();
                    break;
                }
            },
            event = next_watch_event(&mut watch_rx) => match event {
                Some(WatchEvent::Error(e)) => tracing::warn!("file watcher: {e}"),
                Some(event) => match session.workspace().classify(&event) {
                    Some(WatchedFile::Settings) => session.reload_settings(),
                    Some(WatchedFile::GitHead) => session.repository_changed(),
                    None => {}
                },
                None => watch_rx = None,
            },
            _ = sleep_until(deadline) => session.tick(Instant::now()),
            _ = tokio::signal::ctrl_c() => {
                session.deactivate();
                break;
            }
        }
    }

    // Dropping the session closes the notice channel so the writer drains and exits.
    drop(session);
    if let Err(e) = writer.await {
        tracing::debug!("notice writer ended abnormally: {e}");
    }
    Ok(())
}

async fn next_watch_event(
    rx: &mut Option<broadcast::Receiver<WatchEvent>>,
) -> Option<WatchEvent> {
    let Some(rx) = rx.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!("file watcher lagged by {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}
