use serde::{Deserialize, Serialize};

/// A leaderboard entry. The rank label is not stored; it is derived from
/// `points` and the configured thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(default, alias = "_id")]
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub points: i64,
}
