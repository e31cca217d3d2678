use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::raffle::{Person, PersonId, Prize};

/// Opaque identifier the backend assigns to one in-flight draw.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Phase {
    Idle,     // Ready to accept a draw request
    Armed,    // Draw request sent, waiting for draw-start
    Spinning, // Session live, wheel turning
    Resolved, // Winner on display
    Aborted,  // Session gave up waiting for draw-complete
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Resolved | Phase::Aborted)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "IDLE",
            Phase::Armed => "ARMED",
            Phase::Spinning => "SPINNING",
            Phase::Resolved => "RESOLVED",
            Phase::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum Connectivity {
    Connecting,
    Restored,
    Lost,
}

/// `draw-start` push payload: the backend picked a target and the wheel should spin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DrawStart {
    pub session_id: SessionId,
    pub segments: Vec<Prize>,
    pub target_prize: Prize,
    pub target_person: Option<Person>,
}

/// `draw-complete` push payload: the backend recorded the award.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DrawComplete {
    pub session_id: SessionId,
    pub person: Person,
    pub prize: Prize,
}

/// What the audience sees once a session resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Winner {
    pub session_id: SessionId,
    pub person: Person,
    pub prize: Prize,
}

impl From<DrawComplete> for Winner {
    fn from(complete: DrawComplete) -> Self {
        Winner {
            session_id: complete.session_id,
            person: complete.person,
            prize: complete.prize,
        }
    }
}

/// Body of `POST /api/draw`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DrawRequest {
    #[ts(type = "number")]
    pub participant_id: PersonId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_wire_names() {
        assert_eq!(serde_json::to_string(&Phase::Spinning).unwrap(), "\"SPINNING\"");
        assert_eq!(Phase::Aborted.to_string(), "ABORTED");
        assert!(Phase::Resolved.is_terminal());
        assert!(!Phase::Armed.is_terminal());
    }

    #[test]
    fn test_session_id_is_transparent() {
        let id: SessionId = serde_json::from_str("\"T1\"").unwrap();
        assert_eq!(id, SessionId::from("T1"));
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"T1\"");
    }

    #[test]
    fn test_draw_request_body() {
        let body = serde_json::to_value(DrawRequest { participant_id: 4 }).unwrap();
        assert_eq!(body, serde_json::json!({ "participantId": 4 }));
    }
}
