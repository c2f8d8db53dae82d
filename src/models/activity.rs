use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

wire_enum! {
    pub enum ActivityStatus {
        Draft => "DRAFT",
        Active => "ACTIVE",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
}

impl ActivityStatus {
    /// Transitions the console offers. The backend enforces the real rule.
    pub fn next_allowed(&self) -> &'static [ActivityStatus] {
        match self {
            ActivityStatus::Draft => &[ActivityStatus::Active, ActivityStatus::Cancelled],
            ActivityStatus::Active => &[ActivityStatus::Completed, ActivityStatus::Cancelled],
            ActivityStatus::Completed | ActivityStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: ActivityStatus) -> bool {
        self.next_allowed().contains(&next)
    }
}

wire_enum! {
    pub enum ParticipantStatus {
        Registered => "REGISTERED",
        CheckedIn => "CHECKED_IN",
        Absent => "ABSENT",
        Completed => "COMPLETED",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default, alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub status: ActivityStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub points_reward: i64,
    #[serde(default = "default_late_threshold")]
    pub late_threshold_minutes: i64,
    #[serde(default)]
    pub max_participants: Option<u32>,
}

fn default_late_threshold() -> i64 {
    15
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(default, alias = "_id")]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub status: ParticipantStatus,
    #[serde(default)]
    pub check_in_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub absent_reason: Option<String>,
}

impl Participant {
    /// Completed participants have necessarily checked in.
    pub fn has_checked_in(&self) -> bool {
        matches!(
            self.status,
            ParticipantStatus::CheckedIn | ParticipantStatus::Completed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_only_moves_forward() {
        assert!(ActivityStatus::Draft.can_transition_to(ActivityStatus::Active));
        assert!(ActivityStatus::Active.can_transition_to(ActivityStatus::Completed));
        assert!(!ActivityStatus::Completed.can_transition_to(ActivityStatus::Active));
        assert!(!ActivityStatus::Draft.can_transition_to(ActivityStatus::Completed));
    }

    #[test]
    fn decodes_backend_payload() {
        let json = r#"{
            "_id": "act-1",
            "title": "Beach cleanup",
            "type": "VOLUNTEER",
            "status": "ACTIVE",
            "startTime": "2026-03-01T09:00:00Z",
            "pointsReward": 20
        }"#;
        let activity: Activity = serde_json::from_str(json).unwrap();
        assert_eq!(activity.id, "act-1");
        assert_eq!(activity.activity_type, "VOLUNTEER");
        assert_eq!(activity.late_threshold_minutes, 15);
        assert_eq!(activity.end_time, None);
    }
}
