use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub type PersonId = i64;
pub type PrizeId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Person {
    #[ts(type = "number")]
    pub id: PersonId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub email: Option<String>,
}

impl Person {
    pub fn new(id: PersonId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Prize {
    #[ts(type = "number")]
    pub id: PrizeId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Prize {
    pub fn new(id: PrizeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
        }
    }

    /// Ids <= 0 are placeholders used to fill an empty wheel and are never awarded.
    pub fn is_real(&self) -> bool {
        self.id > 0
    }
}

/// A prize that has been awarded. Lists of these are ordered most-recent-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WinnerRecord {
    #[ts(type = "number")]
    pub id: i64,
    pub person: Person,
    pub prize: Prize,
    pub awarded_at: DateTime<Utc>,
}

/// The backend's view of the raffle at one point in time.
///
/// Every list is always present; see `draw_core::normalize_snapshot` for how
/// partial payloads are turned into one of these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StateSnapshot {
    pub waiting_people: Vec<Person>,
    pub upcoming_prizes: Vec<Prize>,
    pub recent_winners: Vec<WinnerRecord>,
}

impl StateSnapshot {
    pub fn remaining_people(&self) -> usize {
        self.waiting_people.len()
    }

    pub fn remaining_prizes(&self) -> usize {
        self.upcoming_prizes.len()
    }

    pub fn has_real_prize(&self) -> bool {
        self.upcoming_prizes.iter().any(Prize::is_real)
    }

    pub fn find_person(&self, id: PersonId) -> Option<&Person> {
        self.waiting_people.iter().find(|person| person.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_prizes_are_not_real() {
        assert!(Prize::new(3, "Taza").is_real());
        assert!(!Prize::new(0, "Fundasen").is_real());
        assert!(!Prize::new(-2, "En espera").is_real());
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = StateSnapshot {
            waiting_people: vec![Person::new(1, "Ana")],
            upcoming_prizes: vec![Prize::new(10, "Taza")],
            recent_winners: Vec::new(),
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["waitingPeople"][0]["name"], "Ana");
        assert_eq!(json["upcomingPrizes"][0]["id"], 10);
        assert!(json["recentWinners"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_helpers() {
        let snapshot = StateSnapshot {
            waiting_people: vec![Person::new(1, "Ana"), Person::new(2, "Luis")],
            upcoming_prizes: vec![Prize::new(-1, "Ruleta lista")],
            recent_winners: Vec::new(),
        };

        assert_eq!(snapshot.remaining_people(), 2);
        assert_eq!(snapshot.remaining_prizes(), 1);
        assert!(!snapshot.has_real_prize());
        assert_eq!(snapshot.find_person(2).map(|p| p.name.as_str()), Some("Luis"));
        assert!(snapshot.find_person(7).is_none());
    }
}
