use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

wire_enum! {
    pub enum RatingLevel {
        Excellent => "EXCELLENT",
        Good => "GOOD",
        Average => "AVERAGE",
        Poor => "POOR",
    }
}

wire_enum! {
    pub enum SubmissionStatus {
        Submitted => "SUBMITTED",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        NeedsRevision => "NEEDS_REVISION",
    }
}

wire_enum! {
    pub enum PeriodStatus {
        Draft => "DRAFT",
        Active => "ACTIVE",
        Closed => "CLOSED",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingCriterion {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingPeriod {
    #[serde(default, alias = "_id")]
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PeriodStatus,
    #[serde(default)]
    pub criteria: Vec<RatingCriterion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfRating {
    #[serde(default, alias = "_id")]
    pub id: String,
    pub period_id: String,
    pub user_id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub suggested_rating: RatingLevel,
    #[serde(default)]
    pub final_rating: Option<RatingLevel>,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub admin_comment: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}
