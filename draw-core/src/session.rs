use std::time::Instant;

use draw_types::{DrawError, Person, Prize, SessionId};

/// One in-flight draw. `segments` is the wheel face captured at draw-start and
/// does not follow later snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawSession {
    pub session_id: SessionId,
    pub segments: Vec<Prize>,
    pub target_prize: Prize,
    pub target_person: Option<Person>,
    pub deadline_at: Instant,
}

/// Holds at most one live [`DrawSession`].
#[derive(Debug, Default)]
pub struct DrawSessionStore {
    current: Option<DrawSession>,
}

impl DrawSessionStore {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn begin(
        &mut self,
        session_id: SessionId,
        segments: Vec<Prize>,
        target_prize: Prize,
        target_person: Option<Person>,
        deadline_at: Instant,
    ) -> Result<&DrawSession, DrawError> {
        if let Some(live) = &self.current {
            return Err(DrawError::Conflict {
                session_id: live.session_id.clone(),
            });
        }

        Ok(&*self.current.insert(DrawSession {
            session_id,
            segments,
            target_prize,
            target_person,
            deadline_at,
        }))
    }

    pub fn end(&mut self) -> Option<DrawSession> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&DrawSession> {
        self.current.as_ref()
    }

    pub fn is_live(&self, session_id: &SessionId) -> bool {
        self.current
            .as_ref()
            .is_some_and(|session| &session.session_id == session_id)
    }
}
