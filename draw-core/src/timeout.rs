use std::time::Instant;

use draw_types::SessionId;

/// Single deadline guarding the live draw session.
#[derive(Debug, Default)]
pub struct TimeoutSupervisor {
    armed: Option<(SessionId, Instant)>,
}

impl TimeoutSupervisor {
    pub fn new() -> Self {
        Self { armed: None }
    }

    /// Replaces any deadline already armed.
    pub fn arm(&mut self, session_id: SessionId, deadline: Instant) {
        self.armed = Some((session_id, deadline));
    }

    pub fn cancel(&mut self) -> Option<SessionId> {
        self.armed.take().map(|(session_id, _)| session_id)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Disarms and returns the guarded session id once `now` reaches the deadline.
    pub fn fire(&mut self, now: Instant) -> Option<SessionId> {
        let expired = self
            .armed
            .as_ref()
            .is_some_and(|(_, deadline)| now >= *deadline);
        if expired { self.cancel() } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fires_once_at_deadline() {
        let start = Instant::now();
        let mut supervisor = TimeoutSupervisor::new();
        supervisor.arm(SessionId::from("T1"), start + Duration::from_secs(15));

        assert!(supervisor.fire(start + Duration::from_secs(14)).is_none());
        assert_eq!(
            supervisor.fire(start + Duration::from_secs(15)),
            Some(SessionId::from("T1"))
        );
        assert!(supervisor.fire(start + Duration::from_secs(30)).is_none());
        assert!(supervisor.deadline().is_none());
    }

    #[test]
    fn test_cancel_and_rearm() {
        let start = Instant::now();
        let mut supervisor = TimeoutSupervisor::new();
        supervisor.arm(SessionId::from("T1"), start + Duration::from_secs(1));
        supervisor.arm(SessionId::from("T2"), start + Duration::from_secs(5));
        assert_eq!(supervisor.deadline(), Some(start + Duration::from_secs(5)));

        assert_eq!(supervisor.cancel(), Some(SessionId::from("T2")));
        assert!(supervisor.fire(start + Duration::from_secs(60)).is_none());
    }
}
