use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::draw::SessionId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum RequestRejection {
    NotAuthenticated,
    Unauthorized,
    NoParticipant,
    NoPrizes,
    DrawInProgress,
    Unreachable,
    Backend { status: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, thiserror::Error)]
#[ts(export)]
pub enum DrawError {
    #[error("push channel lost: {reason}")]
    Transport { reason: String },
    #[error("draw request rejected ({kind:?}): {message}")]
    Request {
        kind: RequestRejection,
        message: String,
    },
    #[error("no draw-complete arrived for session {session_id:?} before the deadline")]
    ProtocolTimeout { session_id: Option<SessionId> },
    #[error("draw session {session_id} is already live")]
    Conflict { session_id: SessionId },
}

impl DrawError {
    pub fn request(kind: RequestRejection, message: impl Into<String>) -> Self {
        DrawError::Request {
            kind,
            message: message.into(),
        }
    }

    pub fn is_protocol_timeout(&self) -> bool {
        matches!(self, DrawError::ProtocolTimeout { .. })
    }
}
