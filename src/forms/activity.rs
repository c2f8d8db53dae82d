use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dialog::FormSchema;
use crate::error::ValidationErrors;
use crate::models::{Activity, Participant};
use crate::validation;

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityForm {
    pub title: String,
    pub activity_type: String,
    pub description: String,
    pub location: String,
    pub start_time: String,
    pub end_time: String,
    pub points_reward: String,
    pub late_threshold_minutes: String,
    pub max_participants: String,
}

impl Default for ActivityForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            activity_type: String::new(),
            description: String::new(),
            location: String::new(),
            start_time: String::new(),
            end_time: String::new(),
            points_reward: "0".to_string(),
            late_threshold_minutes: "15".to_string(),
            max_participants: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPayload {
    pub title: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub points_reward: i64,
    pub late_threshold_minutes: i64,
    pub max_participants: Option<u32>,
}

impl FormSchema for ActivityForm {
    type Entity = Activity;
    type Payload = ActivityPayload;

    fn from_entity(activity: &Activity) -> Self {
        Self {
            title: activity.title.clone(),
            activity_type: activity.activity_type.clone(),
            description: activity.description.clone().unwrap_or_default(),
            location: activity.location.clone().unwrap_or_default(),
            start_time: validation::format_datetime(&activity.start_time),
            end_time: activity
                .end_time
                .as_ref()
                .map(validation::format_datetime)
                .unwrap_or_default(),
            points_reward: activity.points_reward.to_string(),
            late_threshold_minutes: activity.late_threshold_minutes.to_string(),
            max_participants: activity
                .max_participants
                .map(|m| m.to_string())
                .unwrap_or_default(),
        }
    }

    fn validate(&self) -> Result<ActivityPayload, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = errors.check("title", validation::required(&self.title));
        if let Some(title) = &title {
            errors.check("title", validation::max_chars(title, 200));
        }
        let activity_type = errors.check(
            "type",
            validation::required(&self.activity_type).map(|t| t.to_uppercase()),
        );
        let start_time = errors.check("startTime", validation::datetime(&self.start_time));
        let end_time = match validation::optional(&self.end_time) {
            Some(raw) => errors.check("endTime", validation::datetime(&raw)),
            None => None,
        };
        if let (Some(start), Some(end)) = (start_time, end_time) {
            if end <= start {
                errors.add("endTime", "must be after the start time");
            }
        }
        let points_reward = errors.check(
            "pointsReward",
            validation::int_in_range(&self.points_reward, 0, 1000),
        );
        let late_threshold_minutes = errors.check(
            "lateThresholdMinutes",
            validation::int_in_range(&self.late_threshold_minutes, 0, 240),
        );
        let max_participants = match validation::optional(&self.max_participants) {
            Some(raw) => errors
                .check("maxParticipants", validation::int_in_range(&raw, 1, 10_000))
                .map(|m| m as u32),
            None => None,
        };

        match (title, activity_type, start_time, points_reward, late_threshold_minutes) {
            (Some(title), Some(activity_type), Some(start_time), Some(points_reward), Some(late))
                if errors.is_empty() =>
            {
                Ok(ActivityPayload {
                    title,
                    activity_type,
                    description: validation::optional(&self.description),
                    location: validation::optional(&self.location),
                    start_time,
                    end_time,
                    points_reward,
                    late_threshold_minutes: late,
                    max_participants,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Reason entered when marking a participant absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbsenceForm {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbsencePayload {
    pub reason: String,
}

impl FormSchema for AbsenceForm {
    type Entity = Participant;
    type Payload = AbsencePayload;

    fn from_entity(participant: &Participant) -> Self {
        Self {
            reason: participant.absent_reason.clone().unwrap_or_default(),
        }
    }

    fn validate(&self) -> Result<AbsencePayload, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let reason = errors.check("reason", validation::required(&self.reason));
        errors.into_result()?;
        Ok(AbsencePayload {
            reason: reason.unwrap_or_default(),
        })
    }
}
