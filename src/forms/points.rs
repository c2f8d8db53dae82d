use serde::Serialize;

use crate::dialog::FormSchema;
use crate::error::ValidationErrors;
use crate::models::Member;
use crate::validation;

/// Manual credit or debit of a member's points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointsAdjustmentForm {
    pub member_id: String,
    pub points: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsAdjustment {
    pub member_id: String,
    pub points: i64,
    pub reason: String,
}

impl FormSchema for PointsAdjustmentForm {
    type Entity = Member;
    type Payload = PointsAdjustment;

    fn from_entity(member: &Member) -> Self {
        Self {
            member_id: member.id.clone(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<PointsAdjustment, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let member_id = errors.check("memberId", validation::required(&self.member_id));
        let points = match errors.check("points", validation::int_in_range(&self.points, -1000, 1000)) {
            Some(0) => {
                errors.add("points", "must not be zero");
                None
            }
            other => other,
        };
        let reason = errors.check("reason", validation::required(&self.reason));

        match (member_id, points, reason) {
            (Some(member_id), Some(points), Some(reason)) if errors.is_empty() => {
                Ok(PointsAdjustment {
                    member_id,
                    points,
                    reason,
                })
            }
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefill_targets_the_member() {
        let member = Member {
            id: "m3".to_string(),
            full_name: "Tran Minh".to_string(),
            unit: Some("North".to_string()),
            points: 640,
        };
        let mut form = PointsAdjustmentForm::from_entity(&member);
        form.points = "-25".to_string();
        form.reason = "late return of equipment".to_string();

        let payload = form.validate().unwrap();
        assert_eq!(payload.member_id, "m3");
        assert_eq!(payload.points, -25);
        assert_eq!(
            serde_json::to_value(&payload).unwrap()["memberId"],
            "m3"
        );
    }

    #[test]
    fn zero_and_missing_reason_are_rejected() {
        let form = PointsAdjustmentForm {
            member_id: "m1".to_string(),
            points: "0".to_string(),
            reason: " ".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.has("points"));
        assert!(errors.has("reason"));
    }
}
