use chrono::NaiveDate;
use serde::Serialize;

use crate::dialog::FormSchema;
use crate::error::ValidationErrors;
use crate::models::{RatingCriterion, RatingLevel, RatingPeriod, SelfRating, SubmissionStatus};
use crate::validation;

/// Admin decision on one self-rating submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingReviewForm {
    pub decision: String,
    pub final_rating: String,
    pub admin_comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingReview {
    pub status: SubmissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_rating: Option<RatingLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_comment: Option<String>,
}

impl FormSchema for RatingReviewForm {
    type Entity = SelfRating;
    type Payload = RatingReview;

    fn from_entity(submission: &SelfRating) -> Self {
        let decision = match submission.status {
            SubmissionStatus::Submitted => String::new(),
            reviewed => reviewed.to_string(),
        };
        Self {
            decision,
            final_rating: submission
                .final_rating
                .unwrap_or(submission.suggested_rating)
                .to_string(),
            admin_comment: submission.admin_comment.clone().unwrap_or_default(),
        }
    }

    fn validate(&self) -> Result<RatingReview, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let status = match errors.check("status", self.decision.parse::<SubmissionStatus>()) {
            Some(SubmissionStatus::Submitted) => {
                errors.add("status", "choose approve, reject or needs revision");
                None
            }
            other => other,
        };
        let final_rating = match validation::optional(&self.final_rating) {
            Some(raw) => errors.check("finalRating", raw.parse::<RatingLevel>()),
            None => None,
        };
        let admin_comment = validation::optional(&self.admin_comment);

        match status {
            Some(SubmissionStatus::Approved) if final_rating.is_none() => {
                if !errors.has("finalRating") {
                    errors.add("finalRating", "is required to approve");
                }
            }
            Some(SubmissionStatus::Rejected | SubmissionStatus::NeedsRevision)
                if admin_comment.is_none() =>
            {
                errors.add("adminComment", "explain what needs to change");
            }
            _ => {}
        }

        match status {
            Some(status) if errors.is_empty() => Ok(RatingReview {
                status,
                final_rating: final_rating.filter(|_| status == SubmissionStatus::Approved),
                admin_comment,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingPeriodForm {
    pub name: String,
    pub start_date: String,
    pub end_date: String,
    /// One criterion per line, `name: description` or just `name`.
    pub criteria: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingPeriodPayload {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub criteria: Vec<RatingCriterion>,
}

fn parse_criteria(text: &str) -> Vec<RatingCriterion> {
    text.lines()
        .filter_map(|line| {
            let (name, description) = match line.split_once(':') {
                Some((name, description)) => (name, validation::optional(description)),
                None => (line, None),
            };
            validation::optional(name).map(|name| RatingCriterion { name, description })
        })
        .collect()
}

impl FormSchema for RatingPeriodForm {
    type Entity = RatingPeriod;
    type Payload = RatingPeriodPayload;

    fn from_entity(period: &RatingPeriod) -> Self {
        let criteria: Vec<String> = period
            .criteria
            .iter()
            .map(|c| match &c.description {
                Some(description) => format!("{}: {description}", c.name),
                None => c.name.clone(),
            })
            .collect();
        Self {
            name: period.name.clone(),
            start_date: period.start_date.to_string(),
            end_date: period.end_date.to_string(),
            criteria: criteria.join("\n"),
        }
    }

    fn validate(&self) -> Result<RatingPeriodPayload, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = errors.check("name", validation::required(&self.name));
        let start_date = errors.check("startDate", validation::date(&self.start_date));
        let end_date = errors.check("endDate", validation::date(&self.end_date));
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if end < start {
                errors.add("endDate", "must not be before the start date");
            }
        }
        let criteria = parse_criteria(&self.criteria);
        if criteria.is_empty() {
            errors.add("criteria", "add at least one criterion");
        }

        match (name, start_date, end_date) {
            (Some(name), Some(start_date), Some(end_date)) if errors.is_empty() => {
                Ok(RatingPeriodPayload {
                    name,
                    start_date,
                    end_date,
                    criteria,
                })
            }
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(decision: &str, rating: &str, comment: &str) -> RatingReviewForm {
        RatingReviewForm {
            decision: decision.to_string(),
            final_rating: rating.to_string(),
            admin_comment: comment.to_string(),
        }
    }

    #[test]
    fn approve_requires_final_rating() {
        let errors = review("approved", "", "").validate().unwrap_err();
        assert!(errors.has("finalRating"));

        let ok = review("approved", "good", "").validate().unwrap();
        assert_eq!(ok.status, SubmissionStatus::Approved);
        assert_eq!(ok.final_rating, Some(RatingLevel::Good));
    }

    #[test]
    fn reject_and_revision_require_comment() {
        for decision in ["rejected", "needs-revision"] {
            let errors = review(decision, "", "").validate().unwrap_err();
            assert!(errors.has("adminComment"), "{decision}");
        }
        let ok = review("needs_revision", "excellent", "add evidence").validate().unwrap();
        assert_eq!(ok.final_rating, None);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "NEEDS_REVISION");
        assert!(json.get("finalRating").is_none());
    }

    #[test]
    fn submitted_is_not_a_decision() {
        assert!(review("submitted", "good", "x").validate().unwrap_err().has("status"));
        assert!(review("maybe", "good", "x").validate().unwrap_err().has("status"));
    }

    #[test]
    fn prefill_suggests_the_self_rating() {
        let submission = SelfRating {
            id: "s1".to_string(),
            period_id: "p1".to_string(),
            user_id: "u1".to_string(),
            full_name: None,
            suggested_rating: RatingLevel::Excellent,
            final_rating: None,
            status: SubmissionStatus::Submitted,
            admin_comment: None,
            submitted_at: None,
        };
        let form = RatingReviewForm::from_entity(&submission);
        assert_eq!(form.final_rating, "EXCELLENT");
        assert!(form.decision.is_empty());
    }

    #[test]
    fn period_parses_criteria_lines() {
        let form = RatingPeriodForm {
            name: "2026 H1".to_string(),
            start_date: "2026-01-01".to_string(),
            end_date: "2026-06-30".to_string(),
            criteria: "Volunteering: hours logged\n\nLeadership\n".to_string(),
        };
        let payload = form.validate().unwrap();
        assert_eq!(payload.criteria.len(), 2);
        assert_eq!(payload.criteria[0].description.as_deref(), Some("hours logged"));
        assert_eq!(payload.criteria[1].name, "Leadership");
    }

    #[test]
    fn period_end_before_start_is_rejected() {
        let form = RatingPeriodForm {
            name: "Bad".to_string(),
            start_date: "2026-06-30".to_string(),
            end_date: "2026-01-01".to_string(),
            criteria: "Attendance".to_string(),
        };
        assert!(form.validate().unwrap_err().has("endDate"));
    }
}
