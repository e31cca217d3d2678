use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

use draw_client::{DrawEngine, EngineHandle, EngineView, config::Config};
use draw_core::LifecycleEvent;
use draw_types::{Connectivity, Phase};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting draw viewer...");

    let config = Config::new();
    let (handle, engine_task) = DrawEngine::start(&config)?;

    if let Some(password) = &config.host_password {
        match handle.login(password).await {
            Ok(()) => info!("Host mode enabled"),
            Err(e) => error!("Host login failed, continuing as viewer: {}", e),
        }
    }

    tokio::spawn(log_views(handle.clone()));
    tokio::spawn(log_events(handle.clone()));

    info!("Commands: draw <participantId> | login <password> | dismiss | quit");

    tokio::select! {
        _ = read_commands(handle.clone()) => {
            info!("Input closed, shutting down...");
        }
        _ = shutdown_signal() => {}
    }

    handle.shutdown();
    engine_task.await?;
    info!("Draw viewer stopped.");
    Ok(())
}

async fn read_commands(handle: EngineHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("draw"), Some(id)) => match id.parse() {
                Ok(participant_id) => {
                    if let Err(e) = handle.request_draw(participant_id).await {
                        warn!("Draw not requested: {}", e);
                    }
                }
                Err(_) => warn!("Invalid participant id: {}", id),
            },
            (Some("login"), Some(password)) => {
                if let Err(e) = handle.login(password).await {
                    warn!("Login failed: {}", e);
                }
            }
            (Some("dismiss"), None) => handle.dismiss(),
            (Some("quit"), None) => return,
            (None, _) => {}
            _ => warn!("Unknown command: {}", line.trim()),
        }
    }
}

async fn log_views(handle: EngineHandle) {
    let mut views = handle.watch();
    let mut previous = handle.view();

    while views.changed().await.is_ok() {
        let view = views.borrow_and_update().clone();
        if view.connectivity != previous.connectivity {
            match view.connectivity {
                Connectivity::Lost => warn!("Realtime connection lost, reconnecting..."),
                Connectivity::Restored => info!("Realtime connection active"),
                Connectivity::Connecting => {}
            }
        }
        if view.snapshot != previous.snapshot {
            info!(
                "{} waiting, {} prizes available",
                view.snapshot.remaining_people(),
                view.snapshot.remaining_prizes()
            );
        }
        if view.phase != previous.phase {
            describe_phase(&view);
        }
        previous = view;
    }
}

fn describe_phase(view: &EngineView) {
    match view.phase {
        Phase::Idle => info!("Wheel ready ({} segments)", view.segments.len()),
        Phase::Armed => info!("Draw requested, waiting for the backend..."),
        Phase::Spinning => info!(
            "Spinning to {} for {} ({:.1} deg)",
            view.target_prize
                .as_ref()
                .map_or("?", |prize| prize.name.as_str()),
            view.target_person
                .as_ref()
                .map_or("?", |person| person.name.as_str()),
            view.rotation
        ),
        Phase::Resolved => {
            if let Some(winner) = &view.winner {
                info!("Winner: {} takes {}", winner.person.name, winner.prize.name);
            }
        }
        Phase::Aborted => warn!("Draw abandoned, no result arrived in time"),
    }
}

async fn log_events(handle: EngineHandle) {
    let mut events = handle.events();
    loop {
        match events.recv().await {
            Ok(LifecycleEvent::DrawFailed { error }) => warn!("{}", error),
            Ok(_) => {}
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Missed {} lifecycle events", skipped)
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    // Wait for SIGINT (Ctrl+C) or SIGTERM
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                let _ = signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received SIGINT, shutting down gracefully...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("Received Ctrl+C, shutting down gracefully...");
    }
}
