#![allow(dead_code)]

use draw_core::{DrawLifecycle, LifecycleConfig, LifecycleEvent, LifecycleEventHandler};
use draw_types::{DrawComplete, DrawStart, Person, Prize, SessionId, StateSnapshot};
use std::sync::{Arc, Mutex};

pub fn ana() -> Person {
    Person::new(1, "Ana")
}

pub fn taza() -> Prize {
    Prize::new(10, "Taza")
}

/// Scenario snapshot: Ana waiting, Taza on the wheel
pub fn scenario_snapshot() -> StateSnapshot {
    StateSnapshot {
        waiting_people: vec![ana()],
        upcoming_prizes: vec![taza()],
        recent_winners: Vec::new(),
    }
}

pub fn snapshot_with_prizes(prizes: Vec<Prize>) -> StateSnapshot {
    StateSnapshot {
        waiting_people: vec![ana(), Person::new(2, "Luis")],
        upcoming_prizes: prizes,
        recent_winners: Vec::new(),
    }
}

pub fn draw_start(session_id: &str, segments: Vec<Prize>, target: Prize) -> DrawStart {
    DrawStart {
        session_id: SessionId::from(session_id),
        segments,
        target_prize: target,
        target_person: Some(ana()),
    }
}

pub fn draw_complete(session_id: &str, person: Person, prize: Prize) -> DrawComplete {
    DrawComplete {
        session_id: SessionId::from(session_id),
        person,
        prize,
    }
}

/// Creates a lifecycle with default timings and an attached collector
pub fn create_test_lifecycle() -> (DrawLifecycle, EventCollector) {
    create_lifecycle_with(LifecycleConfig::default())
}

pub fn create_lifecycle_with(config: LifecycleConfig) -> (DrawLifecycle, EventCollector) {
    let collector = EventCollector::new();
    let mut lifecycle = DrawLifecycle::new(config);
    lifecycle.add_handler(Box::new(collector.clone()));
    (lifecycle, collector)
}

/// Event collector for testing event emissions
#[derive(Clone)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn get_events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn count_matching(&self, check_fn: impl Fn(&LifecycleEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| check_fn(e)).count()
    }

    pub fn phase_trail(&self) -> Vec<draw_types::Phase> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                LifecycleEvent::PhaseChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }
}

impl LifecycleEventHandler for EventCollector {
    fn handle_event(&mut self, event: LifecycleEvent) {
        self.events.lock().unwrap().push(event);
    }
}
