use std::collections::HashSet;

use draw_types::{DrawComplete, DrawStart, Person, Prize, SessionId, StateSnapshot, WinnerRecord};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Turn any decoded payload into a complete snapshot.
///
/// A field that is not a JSON array becomes an empty list, list entries that
/// do not decode are dropped, and repeated ids keep their first occurrence.
/// Nothing here fails: a bad payload yields an empty (or partial) snapshot.
pub fn normalize_snapshot(payload: &Value) -> StateSnapshot {
    StateSnapshot {
        waiting_people: dedup_by_id(list_field::<Person>(payload, "waitingPeople"), |p| p.id),
        upcoming_prizes: dedup_by_id(list_field::<Prize>(payload, "upcomingPrizes"), |p| p.id),
        recent_winners: dedup_by_id(list_field::<WinnerRecord>(payload, "recentWinners"), |w| {
            w.id
        }),
    }
}

/// Same as [`normalize_snapshot`] but starting from raw text; invalid JSON
/// yields the empty snapshot.
pub fn normalize_snapshot_str(raw: &str) -> StateSnapshot {
    match serde_json::from_str::<Value>(raw) {
        Ok(payload) => normalize_snapshot(&payload),
        Err(e) => {
            debug!("Snapshot body is not JSON, using empty snapshot: {}", e);
            StateSnapshot::default()
        }
    }
}

/// Decode a `draw-start` payload. Returns `None` when there is no session id
/// or nothing to aim at (no target prize and no real prize among the segments).
pub fn normalize_draw_start(payload: &Value) -> Option<DrawStart> {
    let Some(session_id) = session_id_field(payload) else {
        debug!("Dropping draw-start without a session id");
        return None;
    };

    let segments = dedup_by_id(list_field::<Prize>(payload, "segments"), |p| p.id);
    let target_prize = match object_field::<Prize>(payload, "targetPrize") {
        Some(prize) => prize,
        None => match segments.iter().find(|segment| segment.is_real()) {
            Some(first) => first.clone(),
            None => {
                debug!("Dropping draw-start {} with no target and no real segment", session_id);
                return None;
            }
        },
    };

    Some(DrawStart {
        session_id,
        segments,
        target_prize,
        target_person: object_field::<Person>(payload, "targetPerson"),
    })
}

/// Decode a `draw-complete` payload. The session id, person and prize are all
/// required; without them the event cannot be matched or displayed.
pub fn normalize_draw_complete(payload: &Value) -> Option<DrawComplete> {
    let session_id = session_id_field(payload);
    let person = object_field::<Person>(payload, "person");
    let prize = object_field::<Prize>(payload, "prize");

    match (session_id, person, prize) {
        (Some(session_id), Some(person), Some(prize)) => Some(DrawComplete {
            session_id,
            person,
            prize,
        }),
        (session_id, _, _) => {
            debug!(
                "Dropping incomplete draw-complete payload (session {:?})",
                session_id
            );
            None
        }
    }
}

/// `sessionId`, or the older `startedAt` timestamp. Numbers are kept as their
/// decimal text so that the id stays opaque.
fn session_id_field(payload: &Value) -> Option<SessionId> {
    ["sessionId", "startedAt"]
        .iter()
        .find_map(|key| match payload.get(*key)? {
            Value::String(id) if !id.trim().is_empty() => Some(SessionId::new(id.trim())),
            Value::Number(id) => Some(SessionId::new(id.to_string())),
            _ => None,
        })
}

fn object_field<T: DeserializeOwned>(payload: &Value, key: &str) -> Option<T> {
    let value = payload.get(key)?;
    if value.is_null() {
        return None;
    }
    T::deserialize(value)
        .map_err(|e| debug!("Ignoring malformed {}: {}", key, e))
        .ok()
}

fn list_field<T: DeserializeOwned>(payload: &Value, key: &str) -> Vec<T> {
    let Some(Value::Array(items)) = payload.get(key) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            T::deserialize(item)
                .map_err(|e| debug!("Dropping malformed {} entry: {}", key, e))
                .ok()
        })
        .collect()
}

fn dedup_by_id<T>(items: Vec<T>, id: impl Fn(&T) -> i64) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(id(item))).collect()
}
