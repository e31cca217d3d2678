use draw_core::{DrawLifecycle, LifecycleEvent, LifecycleEventHandler, RequestTicket};
use draw_types::{
    Connectivity, DrawError, Person, PersonId, Phase, Prize, RequestRejection, StateSnapshot,
    Winner,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::config::Config;
use crate::push::{PushChannel, PushEvent};

/// Everything a renderer needs to draw the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineView {
    pub phase: Phase,
    pub connectivity: Connectivity,
    /// Wheel face; pinned to the session's segments while spinning.
    pub segments: Vec<Prize>,
    /// Absolute wheel rotation target in degrees.
    pub rotation: f64,
    pub target_prize: Option<Prize>,
    pub target_person: Option<Person>,
    pub winner: Option<Winner>,
    pub last_error: Option<DrawError>,
    pub snapshot: StateSnapshot,
    pub is_host: bool,
}

impl EngineView {
    fn capture(lifecycle: &DrawLifecycle, is_host: bool) -> Self {
        let target_prize = match lifecycle.phase() {
            Phase::Spinning => lifecycle.spin_target().map(|target| target.prize.clone()),
            Phase::Resolved => lifecycle.winner().map(|winner| winner.prize.clone()),
            _ => None,
        };

        Self {
            phase: lifecycle.phase(),
            connectivity: lifecycle.connectivity(),
            segments: lifecycle.visible_segments(),
            rotation: lifecycle.rotation(),
            target_prize,
            target_person: lifecycle.target_person().cloned(),
            winner: lifecycle.winner().cloned(),
            last_error: lifecycle.last_error().cloned(),
            snapshot: lifecycle.snapshot().clone(),
            is_host,
        }
    }

    /// Whether a "request draw" button should be enabled.
    pub fn can_request_draw(&self) -> bool {
        self.is_host && self.phase == Phase::Idle
    }
}

enum EngineCommand {
    RequestDraw {
        participant_id: PersonId,
        reply: oneshot::Sender<Result<(), DrawError>>,
    },
    Login {
        password: String,
        reply: oneshot::Sender<Result<(), DrawError>>,
    },
    Dismiss,
    Shutdown,
}

/// Results of HTTP calls made off the loop.
enum TaskResult {
    InitialState(Result<StateSnapshot, ApiError>),
    DrawRequest {
        ticket: RequestTicket,
        result: Result<(), ApiError>,
    },
    Login {
        result: Result<String, ApiError>,
        reply: oneshot::Sender<Result<(), DrawError>>,
    },
}

struct EventForwarder(broadcast::Sender<LifecycleEvent>);

impl LifecycleEventHandler for EventForwarder {
    fn handle_event(&mut self, event: LifecycleEvent) {
        // No subscribers is fine
        let _ = self.0.send(event);
    }
}

/// Cheap, cloneable handle to a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
    view: watch::Receiver<EngineView>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl EngineHandle {
    /// Ask the engine to arm a draw for `participant_id`. `Ok` means the request
    /// was sent; whether the backend accepted it shows up in the view.
    pub async fn request_draw(&self, participant_id: PersonId) -> Result<(), DrawError> {
        let (reply, response) = oneshot::channel();
        self.send(EngineCommand::RequestDraw {
            participant_id,
            reply,
        });
        response.await.unwrap_or_else(|_| Err(engine_stopped()))
    }

    pub async fn login(&self, password: &str) -> Result<(), DrawError> {
        let (reply, response) = oneshot::channel();
        self.send(EngineCommand::Login {
            password: password.to_string(),
            reply,
        });
        response.await.unwrap_or_else(|_| Err(engine_stopped()))
    }

    pub fn dismiss(&self) {
        self.send(EngineCommand::Dismiss);
    }

    pub fn shutdown(&self) {
        self.send(EngineCommand::Shutdown);
    }

    pub fn view(&self) -> EngineView {
        self.view.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<EngineView> {
        self.view.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Wait until the view satisfies `predicate`; `None` if the engine stopped.
    pub async fn wait_for(&self, predicate: impl FnMut(&EngineView) -> bool) -> Option<EngineView> {
        let mut view = self.view.clone();
        match view.wait_for(predicate).await {
            Ok(current) => Some(EngineView::clone(&current)),
            Err(_) => None,
        }
    }

    fn send(&self, command: EngineCommand) {
        if self.commands.send(command).is_err() {
            debug!("Engine already stopped");
        }
    }
}

fn engine_stopped() -> DrawError {
    DrawError::request(RequestRejection::Unreachable, "draw engine is not running")
}

/// The single event loop. Push events, HTTP results, user commands and timer
/// deadlines are all handled here one at a time, so the lifecycle needs no
/// locking.
pub struct DrawEngine {
    lifecycle: DrawLifecycle,
    api: ApiClient,
    push: PushChannel,
    token: Option<String>,
    seen_push_snapshot: bool,
    push_rx: mpsc::UnboundedReceiver<PushEvent>,
    command_rx: mpsc::UnboundedReceiver<EngineCommand>,
    task_tx: mpsc::UnboundedSender<TaskResult>,
    task_rx: mpsc::UnboundedReceiver<TaskResult>,
    view_tx: watch::Sender<EngineView>,
}

impl DrawEngine {
    /// Spawn the engine on the current runtime: fetch the initial state,
    /// subscribe to the push channel and start processing.
    pub fn start(config: &Config) -> Result<(EngineHandle, JoinHandle<()>), ApiError> {
        let api = ApiClient::new(&config.api_base, config.request_timeout())?;
        let mut push = PushChannel::new(&config.api_base, config.reconnect_delay());

        let (push_tx, push_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = broadcast::channel(64);

        let mut lifecycle = DrawLifecycle::new(config.lifecycle());
        lifecycle.add_handler(Box::new(EventForwarder(events_tx.clone())));
        let (view_tx, view_rx) = watch::channel(EngineView::capture(&lifecycle, false));

        push.subscribe(push_tx);

        let engine = Self {
            lifecycle,
            api,
            push,
            token: None,
            seen_push_snapshot: false,
            push_rx,
            command_rx,
            task_tx,
            task_rx,
            view_tx,
        };

        let handle = EngineHandle {
            commands: command_tx,
            view: view_rx,
            events: events_tx,
        };

        info!("Draw engine starting against {}", engine.api.base());
        Ok((handle, tokio::spawn(engine.run())))
    }

    async fn run(mut self) {
        self.spawn_initial_fetch();

        loop {
            let deadline = self.lifecycle.next_deadline();

            tokio::select! {
                Some(event) = self.push_rx.recv() => self.handle_push(event),
                command = self.command_rx.recv() => match command {
                    Some(EngineCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(result) = self.task_rx.recv() => self.handle_task(result),
                _ = sleep_until(deadline) => self.lifecycle.on_tick(now()),
            }

            self.publish_view();
        }

        self.push.close();
        info!("Draw engine stopped");
    }

    fn handle_push(&mut self, event: PushEvent) {
        match event {
            PushEvent::Snapshot(snapshot) => {
                self.seen_push_snapshot = true;
                self.lifecycle.apply_snapshot(snapshot);
            }
            PushEvent::DrawStart(start) => self.lifecycle.on_draw_start(start, now()),
            PushEvent::DrawComplete(complete) => self.lifecycle.on_draw_complete(complete, now()),
            PushEvent::Connectivity(connectivity) => self.lifecycle.set_connectivity(connectivity),
        }
    }

    fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::RequestDraw {
                participant_id,
                reply,
            } => {
                let _ = reply.send(self.request_draw(participant_id));
            }
            EngineCommand::Login { password, reply } => {
                let api = self.api.clone();
                let task_tx = self.task_tx.clone();
                tokio::spawn(async move {
                    let result = api.login(&password).await;
                    let _ = task_tx.send(TaskResult::Login { result, reply });
                });
            }
            EngineCommand::Dismiss => self.lifecycle.dismiss(),
            EngineCommand::Shutdown => {}
        }
    }

    fn request_draw(&mut self, participant_id: PersonId) -> Result<(), DrawError> {
        let Some(token) = self.token.clone() else {
            let error = DrawError::request(
                RequestRejection::NotAuthenticated,
                "only the host can start a draw",
            );
            self.lifecycle.reject_locally(error.clone());
            return Err(error);
        };

        let armed = self.lifecycle.request_draw(participant_id)?;
        info!("Requesting draw for participant {}", participant_id);

        let api = self.api.clone();
        let task_tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = api.request_draw(&token, &armed.request).await;
            let _ = task_tx.send(TaskResult::DrawRequest {
                ticket: armed.ticket,
                result,
            });
        });
        Ok(())
    }

    fn handle_task(&mut self, result: TaskResult) {
        match result {
            TaskResult::InitialState(Ok(snapshot)) => {
                if self.seen_push_snapshot {
                    debug!("Skipping initial state, push channel already delivered a newer one");
                } else {
                    self.lifecycle.apply_snapshot(snapshot);
                }
            }
            TaskResult::InitialState(Err(e)) => warn!("Could not load initial state: {}", e),
            TaskResult::DrawRequest { ticket, result } => match result {
                Ok(()) => self.lifecycle.request_acknowledged(ticket, now()),
                Err(e) => self.lifecycle.request_rejected(ticket, e.into_draw_error()),
            },
            TaskResult::Login { result, reply } => {
                let outcome = match result {
                    Ok(token) => {
                        info!("Logged in as host");
                        self.token = Some(token);
                        Ok(())
                    }
                    Err(e) => {
                        warn!("Host login failed: {}", e);
                        Err(e.into_draw_error())
                    }
                };
                let _ = reply.send(outcome);
            }
        }
    }

    fn spawn_initial_fetch(&self) {
        let api = self.api.clone();
        let task_tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = api.fetch_state().await;
            let _ = task_tx.send(TaskResult::InitialState(result));
        });
    }

    fn publish_view(&self) {
        let next = EngineView::capture(&self.lifecycle, self.token.is_some());
        self.view_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

async fn sleep_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draw_core::LifecycleConfig;

    #[test]
    fn test_view_of_fresh_lifecycle() {
        let lifecycle = DrawLifecycle::new(LifecycleConfig::default());
        let view = EngineView::capture(&lifecycle, false);

        assert_eq!(view.phase, Phase::Idle);
        assert_eq!(view.segments.len(), 4);
        assert_eq!(view.rotation, 0.0);
        assert!(view.target_prize.is_none());
        assert!(!view.can_request_draw());

        let host_view = EngineView::capture(&lifecycle, true);
        assert!(host_view.can_request_draw());
    }
}
