use draw_types::{Connectivity, DrawError, Person, Phase, SessionId, Winner};

use crate::SpinTarget;

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    SpinStarted {
        session_id: SessionId,
        target: SpinTarget,
        target_person: Option<Person>,
    },
    WinnerRevealed {
        winner: Winner,
    },
    DrawFailed {
        error: DrawError,
    },
    ConnectivityChanged {
        connectivity: Connectivity,
    },
}

impl LifecycleEvent {
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            LifecycleEvent::SpinStarted { session_id, .. } => Some(session_id),
            LifecycleEvent::WinnerRevealed { winner } => Some(&winner.session_id),
            LifecycleEvent::DrawFailed {
                error: DrawError::ProtocolTimeout { session_id },
            } => session_id.as_ref(),
            _ => None,
        }
    }
}

/// Event handler trait for observing the draw lifecycle
pub trait LifecycleEventHandler: Send {
    fn handle_event(&mut self, event: LifecycleEvent);
}

/// Simple event bus for distributing lifecycle events
pub struct LifecycleEventBus {
    handlers: Vec<Box<dyn LifecycleEventHandler>>,
}

impl LifecycleEventBus {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Box<dyn LifecycleEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn publish(&mut self, event: LifecycleEvent) {
        for handler in &mut self.handlers {
            handler.handle_event(event.clone());
        }
    }
}

impl Default for LifecycleEventBus {
    fn default() -> Self {
        Self::new()
    }
}
