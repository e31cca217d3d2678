use std::time::{Duration, Instant};

use draw_types::{
    Connectivity, DrawComplete, DrawError, DrawRequest, DrawStart, Person, PersonId, Phase, Prize,
    RequestRejection, StateSnapshot, Winner,
};
use tracing::{debug, info, warn};

use crate::{
    DrawSession, DrawSessionStore, LifecycleEvent, LifecycleEventBus, LifecycleEventHandler,
    SpinTarget, TargetResolver, TimeoutSupervisor, WHOLE_TURNS, wheel_segments,
};

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// How long a spinning session waits for draw-complete.
    pub draw_deadline: Duration,
    /// How long an acknowledged request waits for draw-start.
    pub armed_deadline: Duration,
    /// How long a winner (or an abort) stays on screen before returning to idle.
    pub display_window: Duration,
    pub whole_turns: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            draw_deadline: Duration::from_secs(15),
            armed_deadline: Duration::from_secs(15),
            display_window: Duration::from_secs(8),
            whole_turns: WHOLE_TURNS,
        }
    }
}

/// Identifies one host draw request so that its HTTP result can be matched
/// against the request that is armed when the result arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket(u64);

/// A request accepted by [`DrawLifecycle::request_draw`], to be sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmedRequest {
    pub ticket: RequestTicket,
    pub request: DrawRequest,
}

/// The draw lifecycle state machine.
///
/// Every input (snapshots, push events, request results, user actions and
/// timer ticks) goes through one of the methods below, in the order the event
/// loop receives it. `Phase` is the single source of truth for what the client
/// is doing; the session, resolver and supervisor are only touched from here.
pub struct DrawLifecycle {
    config: LifecycleConfig,
    phase: Phase,
    snapshot: StateSnapshot,
    sessions: DrawSessionStore,
    resolver: TargetResolver,
    supervisor: TimeoutSupervisor,
    spin: Option<SpinTarget>,
    winner: Option<Winner>,
    last_error: Option<DrawError>,
    connectivity: Connectivity,
    armed_ticket: Option<RequestTicket>,
    next_ticket: u64,
    armed_until: Option<Instant>,
    display_until: Option<Instant>,
    event_bus: LifecycleEventBus,
}

impl DrawLifecycle {
    pub fn new(config: LifecycleConfig) -> Self {
        let resolver = TargetResolver::new(config.whole_turns);
        Self {
            config,
            phase: Phase::Idle,
            snapshot: StateSnapshot::default(),
            sessions: DrawSessionStore::new(),
            resolver,
            supervisor: TimeoutSupervisor::new(),
            spin: None,
            winner: None,
            last_error: None,
            connectivity: Connectivity::Connecting,
            armed_ticket: None,
            next_ticket: 0,
            armed_until: None,
            display_until: None,
            event_bus: LifecycleEventBus::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Box<dyn LifecycleEventHandler>) {
        self.event_bus.add_handler(handler);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    pub fn current_session(&self) -> Option<&DrawSession> {
        self.sessions.current()
    }

    pub fn spin_target(&self) -> Option<&SpinTarget> {
        self.spin.as_ref()
    }

    pub fn rotation(&self) -> f64 {
        self.resolver.rotation()
    }

    pub fn winner(&self) -> Option<&Winner> {
        self.winner.as_ref()
    }

    pub fn last_error(&self) -> Option<&DrawError> {
        self.last_error.as_ref()
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn can_request_draw(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// The wheel face to draw right now. Pinned to the session's segments while
    /// spinning so that snapshots arriving mid-spin do not reshuffle the wheel.
    pub fn visible_segments(&self) -> Vec<Prize> {
        match (self.phase, self.sessions.current()) {
            (Phase::Spinning, Some(session)) => session.segments.clone(),
            _ => wheel_segments(&self.snapshot.upcoming_prizes),
        }
    }

    /// Earliest instant at which [`DrawLifecycle::on_tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let armed = self.armed_until.filter(|_| self.phase == Phase::Armed);
        let display = self.display_until.filter(|_| self.phase.is_terminal());
        [self.supervisor.deadline(), armed, display]
            .into_iter()
            .flatten()
            .min()
    }

    /// Replace the cached snapshot wholesale.
    pub fn apply_snapshot(&mut self, snapshot: StateSnapshot) {
        debug!(
            "Snapshot: {} waiting, {} prizes, {} recent winners",
            snapshot.remaining_people(),
            snapshot.remaining_prizes(),
            snapshot.recent_winners.len()
        );
        self.snapshot = snapshot;
    }

    pub fn set_connectivity(&mut self, connectivity: Connectivity) {
        if self.connectivity == connectivity {
            return;
        }
        info!("Push channel connectivity: {:?}", connectivity);
        self.connectivity = connectivity;
        self.event_bus
            .publish(LifecycleEvent::ConnectivityChanged { connectivity });
    }

    /// IDLE -> ARMED. On success the caller must send the returned request to
    /// the backend and report back through `request_acknowledged` or
    /// `request_rejected` with the same ticket.
    pub fn request_draw(&mut self, participant_id: PersonId) -> Result<ArmedRequest, DrawError> {
        let rejection = if self.phase != Phase::Idle {
            Some((
                RequestRejection::DrawInProgress,
                format!("a draw is already {}", self.phase),
            ))
        } else if self.snapshot.find_person(participant_id).is_none() {
            Some((
                RequestRejection::NoParticipant,
                format!("participant {} is not waiting for a prize", participant_id),
            ))
        } else if !self.snapshot.has_real_prize() {
            Some((
                RequestRejection::NoPrizes,
                "no prizes left to award".to_string(),
            ))
        } else {
            None
        };

        if let Some((kind, message)) = rejection {
            let error = DrawError::request(kind, message);
            self.surface_error(error.clone());
            return Err(error);
        }

        self.next_ticket += 1;
        let ticket = RequestTicket(self.next_ticket);
        self.armed_ticket = Some(ticket);
        self.last_error = None;
        self.armed_until = None;
        self.transition(Phase::Armed);
        Ok(ArmedRequest {
            ticket,
            request: DrawRequest { participant_id },
        })
    }

    /// Used by callers that reject a request before it reaches the state
    /// machine (e.g. no host token); nothing changes except the surfaced error.
    pub fn reject_locally(&mut self, error: DrawError) {
        self.surface_error(error);
    }

    /// The backend accepted the request; draw-start must follow within the
    /// armed deadline.
    pub fn request_acknowledged(&mut self, ticket: RequestTicket, now: Instant) {
        if self.is_armed_by(ticket) {
            self.armed_until = Some(now + self.config.armed_deadline);
        } else {
            debug!("Draw request {:?} acknowledged while {}", ticket, self.phase);
        }
    }

    /// ARMED -> IDLE, only for the request that is currently armed.
    pub fn request_rejected(&mut self, ticket: RequestTicket, error: DrawError) {
        if !self.is_armed_by(ticket) {
            // draw-start already moved us on, or this is an older request
            warn!(
                "Draw request {:?} failed while {}: {}",
                ticket, self.phase, error
            );
            return;
        }
        self.armed_ticket = None;
        self.armed_until = None;
        self.surface_error(error);
        self.transition(Phase::Idle);
    }

    pub fn on_draw_start(&mut self, start: DrawStart, now: Instant) {
        if !start.target_prize.is_real() {
            debug!(
                "Dropping draw-start {} aimed at placeholder prize {}",
                start.session_id, start.target_prize.id
            );
            return;
        }
        if self.phase == Phase::Spinning {
            if self.sessions.is_live(&start.session_id) {
                debug!("Ignoring repeated draw-start for {}", start.session_id);
                return;
            }
            if let Some(superseded) = self.sessions.end() {
                warn!(
                    "draw-start {} supersedes live session {}",
                    start.session_id, superseded.session_id
                );
            }
            self.supervisor.cancel();
        }

        let segments = if start.segments.is_empty() {
            wheel_segments(&self.snapshot.upcoming_prizes)
        } else {
            start.segments
        };
        let deadline = now + self.config.draw_deadline;

        if let Err(e) = self.sessions.begin(
            start.session_id.clone(),
            segments,
            start.target_prize.clone(),
            start.target_person.clone(),
            deadline,
        ) {
            warn!("Could not begin session {}: {}", start.session_id, e);
            return;
        }

        let segments = self
            .sessions
            .current()
            .map(|session| session.segments.as_slice())
            .unwrap_or_default();
        let target = self.resolver.resolve(segments, &start.target_prize);

        self.supervisor.arm(start.session_id.clone(), deadline);
        self.armed_ticket = None;
        self.armed_until = None;
        self.last_error = None;
        self.display_until = None;
        self.winner = None;
        self.spin = Some(target.clone());

        info!(
            "Session {} spinning to segment {}/{} ({}) at {:.1} deg",
            start.session_id,
            target.segment_index + 1,
            target.segment_count,
            target.prize.name,
            target.rotation
        );
        self.transition(Phase::Spinning);
        self.event_bus.publish(LifecycleEvent::SpinStarted {
            session_id: start.session_id,
            target,
            target_person: start.target_person,
        });
    }

    /// SPINNING -> RESOLVED, only for the live session's id.
    pub fn on_draw_complete(&mut self, complete: DrawComplete, now: Instant) {
        if self.phase != Phase::Spinning {
            debug!(
                "Discarding draw-complete {} while {}",
                complete.session_id, self.phase
            );
            return;
        }
        if !self.sessions.is_live(&complete.session_id) {
            debug!(
                "Discarding draw-complete {} for a superseded session",
                complete.session_id
            );
            return;
        }
        if !complete.prize.is_real() {
            debug!(
                "Discarding draw-complete {} awarding placeholder prize {}",
                complete.session_id, complete.prize.id
            );
            return;
        }

        self.supervisor.cancel();
        self.sessions.end();

        let winner = Winner::from(complete);
        info!(
            "Session {} resolved: {} wins {}",
            winner.session_id, winner.person.name, winner.prize.name
        );
        self.winner = Some(winner.clone());
        self.display_until = Some(now + self.config.display_window);
        self.transition(Phase::Resolved);
        self.event_bus
            .publish(LifecycleEvent::WinnerRevealed { winner });
    }

    /// Fire whatever deadlines have passed.
    pub fn on_tick(&mut self, now: Instant) {
        if let Some(session_id) = self.supervisor.fire(now) {
            if self.phase == Phase::Spinning && self.sessions.is_live(&session_id) {
                self.sessions.end();
                warn!("Session {} timed out waiting for draw-complete", session_id);
                self.display_until = Some(now + self.config.display_window);
                self.surface_error(DrawError::ProtocolTimeout {
                    session_id: Some(session_id),
                });
                self.transition(Phase::Aborted);
            } else {
                debug!("Ignoring stale deadline for session {}", session_id);
            }
        }

        if self.phase == Phase::Armed && self.armed_until.is_some_and(|until| now >= until) {
            self.armed_ticket = None;
            self.armed_until = None;
            warn!("No draw-start arrived for the acknowledged request");
            self.surface_error(DrawError::ProtocolTimeout { session_id: None });
            self.transition(Phase::Idle);
        }

        if self.phase.is_terminal() && self.display_until.is_some_and(|until| now >= until) {
            self.dismiss();
        }
    }

    /// RESOLVED / ABORTED -> IDLE.
    pub fn dismiss(&mut self) {
        if !self.phase.is_terminal() {
            return;
        }
        self.winner = None;
        self.last_error = None;
        self.display_until = None;
        self.transition(Phase::Idle);
    }

    pub fn target_person(&self) -> Option<&Person> {
        self.sessions
            .current()
            .and_then(|session| session.target_person.as_ref())
    }

    fn is_armed_by(&self, ticket: RequestTicket) -> bool {
        self.phase == Phase::Armed && self.armed_ticket == Some(ticket)
    }

    fn surface_error(&mut self, error: DrawError) {
        self.last_error = Some(error.clone());
        self.event_bus.publish(LifecycleEvent::DrawFailed { error });
    }

    fn transition(&mut self, to: Phase) {
        let from = self.phase;
        if from == to {
            return;
        }
        info!("Draw phase {} -> {}", from, to);
        self.phase = to;
        self.event_bus
            .publish(LifecycleEvent::PhaseChanged { from, to });
    }
}

impl Default for DrawLifecycle {
    fn default() -> Self {
        Self::new(LifecycleConfig::default())
    }
}
