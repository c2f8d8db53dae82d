//! Table layout and list behaviour per entity: which columns a screen
//! shows, which fields the search box looks at, what the status filter
//! compares and how rows are ordered.

use std::time::Duration;

use crate::listing::ListConfig;
use crate::models::{
    Activity, Document, Exam, Member, Participant, RatingPeriod, SelfRating, Survey, User,
    UserActivity,
};
use crate::stats::{RankThresholds, UNRANKED};

pub struct Column<T> {
    pub header: &'static str,
    pub cell: fn(&T) -> String,
}

/// Entities that have a list screen.
pub trait Tabular: Sized {
    fn columns() -> Vec<Column<Self>>;

    fn list_config(page_size: usize, debounce: Duration) -> ListConfig<Self>;

    fn column(header: &'static str, cell: fn(&Self) -> String) -> Column<Self> {
        Column { header, cell }
    }
}

/// Cell text for every column of every item, in column order.
pub fn rows<T: Tabular>(columns: &[Column<T>], items: &[T]) -> Vec<Vec<String>> {
    items
        .iter()
        .map(|item| columns.iter().map(|c| (c.cell)(item)).collect())
        .collect()
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

fn datetime(value: &chrono::DateTime<chrono::Utc>) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

impl Tabular for Activity {
    fn columns() -> Vec<Column<Self>> {
        vec![
            Self::column("ID", |a| a.id.clone()),
            Self::column("TITLE", |a| a.title.clone()),
            Self::column("TYPE", |a| a.activity_type.clone()),
            Self::column("STATUS", |a| a.status.to_string()),
            Self::column("START", |a| datetime(&a.start_time)),
            Self::column("POINTS", |a| a.points_reward.to_string()),
        ]
    }

    fn list_config(page_size: usize, debounce: Duration) -> ListConfig<Self> {
        ListConfig::<Self>::new(page_size)
            .search(|a| Some(&a.title))
            .search(|a| a.location.as_deref())
            .search(|a| Some(&a.activity_type))
            .status(|a| a.status.as_str())
            .sort_by(|a, b| b.start_time.cmp(&a.start_time))
            .debounce(debounce)
    }
}

impl Tabular for Participant {
    fn columns() -> Vec<Column<Self>> {
        vec![
            Self::column("ID", |p| p.id.clone()),
            Self::column("NAME", |p| or_dash(p.full_name.as_deref())),
            Self::column("STATUS", |p| p.status.to_string()),
            Self::column("CHECK-IN", |p| {
                p.check_in_time.as_ref().map(datetime).unwrap_or_else(|| "-".to_string())
            }),
            Self::column("ABSENT REASON", |p| or_dash(p.absent_reason.as_deref())),
        ]
    }

    fn list_config(page_size: usize, debounce: Duration) -> ListConfig<Self> {
        ListConfig::<Self>::new(page_size)
            .search(|p| p.full_name.as_deref())
            .search(|p| Some(&p.user_id))
            .status(|p| p.status.as_str())
            .debounce(debounce)
    }
}

impl Tabular for Document {
    fn columns() -> Vec<Column<Self>> {
        vec![
            Self::column("ID", |d| d.id.clone()),
            Self::column("TITLE", |d| d.title.clone()),
            Self::column("TYPE", |d| d.document_type.clone()),
            Self::column("STATUS", |d| d.status.to_string()),
            Self::column("FILE", |d| or_dash(d.file_name.as_deref())),
            Self::column("VIEWS", |d| d.view_count.to_string()),
            Self::column("DOWNLOADS", |d| d.download_count.to_string()),
            Self::column("NOTIFIED", |d| yes_no(d.notification_sent)),
        ]
    }

    fn list_config(page_size: usize, debounce: Duration) -> ListConfig<Self> {
        ListConfig::<Self>::new(page_size)
            .search(|d| Some(&d.title))
            .search(|d| d.description.as_deref())
            .search(|d| d.file_name.as_deref())
            .status(|d| d.status.as_str())
            .debounce(debounce)
    }
}

impl Tabular for Exam {
    fn columns() -> Vec<Column<Self>> {
        vec![
            Self::column("ID", |e| e.id.clone()),
            Self::column("TITLE", |e| e.title.clone()),
            Self::column("MINUTES", |e| e.duration.to_string()),
            Self::column("PASS %", |e| e.passing_score.to_string()),
            Self::column("ATTEMPTS", |e| e.max_attempts.to_string()),
            Self::column("QUESTIONS", |e| e.questions.len().to_string()),
            Self::column("ACTIVE", |e| yes_no(e.is_active)),
        ]
    }

    fn list_config(page_size: usize, debounce: Duration) -> ListConfig<Self> {
        ListConfig::<Self>::new(page_size)
            .search(|e| Some(&e.title))
            .search(|e| e.description.as_deref())
            .status(|e| if e.is_active { "ACTIVE" } else { "INACTIVE" })
            .debounce(debounce)
    }
}

impl Tabular for Member {
    fn columns() -> Vec<Column<Self>> {
        vec![
            Self::column("ID", |m| m.id.clone()),
            Self::column("NAME", |m| m.full_name.clone()),
            Self::column("UNIT", |m| or_dash(m.unit.as_deref())),
            Self::column("POINTS", |m| m.points.to_string()),
        ]
    }

    /// Leaderboard order: points descending, ties keep backend order. The
    /// status filter selects a unit.
    fn list_config(page_size: usize, debounce: Duration) -> ListConfig<Self> {
        ListConfig::<Self>::new(page_size)
            .search(|m| Some(&m.full_name))
            .status(|m| m.unit.as_deref().unwrap_or(""))
            .sort_by(|a, b| b.points.cmp(&a.points))
            .debounce(debounce)
    }
}

/// Rank label for one member, `-` below the lowest tier.
pub fn rank_label(member: &Member, thresholds: &RankThresholds) -> String {
    thresholds
        .rank_for(member.points)
        .unwrap_or(UNRANKED)
        .to_string()
}

impl Tabular for RatingPeriod {
    fn columns() -> Vec<Column<Self>> {
        vec![
            Self::column("ID", |p| p.id.clone()),
            Self::column("NAME", |p| p.name.clone()),
            Self::column("FROM", |p| p.start_date.to_string()),
            Self::column("TO", |p| p.end_date.to_string()),
            Self::column("STATUS", |p| p.status.to_string()),
            Self::column("CRITERIA", |p| p.criteria.len().to_string()),
        ]
    }

    fn list_config(page_size: usize, debounce: Duration) -> ListConfig<Self> {
        ListConfig::<Self>::new(page_size)
            .search(|p| Some(&p.name))
            .status(|p| p.status.as_str())
            .sort_by(|a, b| b.start_date.cmp(&a.start_date))
            .debounce(debounce)
    }
}

impl Tabular for SelfRating {
    fn columns() -> Vec<Column<Self>> {
        vec![
            Self::column("ID", |s| s.id.clone()),
            Self::column("MEMBER", |s| {
                s.full_name.clone().unwrap_or_else(|| s.user_id.clone())
            }),
            Self::column("SUGGESTED", |s| s.suggested_rating.to_string()),
            Self::column("FINAL", |s| {
                s.final_rating.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
            }),
            Self::column("STATUS", |s| s.status.to_string()),
        ]
    }

    fn list_config(page_size: usize, debounce: Duration) -> ListConfig<Self> {
        ListConfig::<Self>::new(page_size)
            .search(|s| s.full_name.as_deref())
            .search(|s| Some(&s.user_id))
            .status(|s| s.status.as_str())
            .debounce(debounce)
    }
}

impl Tabular for Survey {
    fn columns() -> Vec<Column<Self>> {
        vec![
            Self::column("ID", |s| s.id.clone()),
            Self::column("TITLE", |s| s.title.clone()),
            Self::column("STATUS", |s| s.status.to_string()),
            Self::column("QUESTIONS", |s| s.questions.len().to_string()),
            Self::column("RESPONSES", |s| s.response_count.to_string()),
        ]
    }

    fn list_config(page_size: usize, debounce: Duration) -> ListConfig<Self> {
        ListConfig::<Self>::new(page_size)
            .search(|s| Some(&s.title))
            .search(|s| s.description.as_deref())
            .status(|s| s.status.as_str())
            .debounce(debounce)
    }
}

impl Tabular for User {
    fn columns() -> Vec<Column<Self>> {
        vec![
            Self::column("ID", |u| u.id.clone()),
            Self::column("USERNAME", |u| u.username.clone()),
            Self::column("NAME", |u| u.full_name.clone()),
            Self::column("UNIT", |u| or_dash(u.unit.as_deref())),
            Self::column("ROLE", |u| or_dash(u.role.as_deref())),
            Self::column("POINTS", |u| u.points.to_string()),
        ]
    }

    /// Searched on the backend; the user directory is too large to cache.
    fn list_config(page_size: usize, debounce: Duration) -> ListConfig<Self> {
        ListConfig::<Self>::new(page_size)
            .search(|u| Some(&u.full_name))
            .search(|u| Some(&u.username))
            .status(|u| if u.is_active { "ACTIVE" } else { "INACTIVE" })
            .server_search()
            .debounce(debounce)
    }
}

impl Tabular for UserActivity {
    fn columns() -> Vec<Column<Self>> {
        vec![
            Self::column("ACTIVITY", |a| a.title.clone()),
            Self::column("STATUS", |a| a.status.to_string()),
            Self::column("CHECK-IN", |a| {
                a.check_in_time.as_ref().map(datetime).unwrap_or_else(|| "-".to_string())
            }),
            Self::column("POINTS", |a| a.points_earned.to_string()),
        ]
    }

    fn list_config(page_size: usize, debounce: Duration) -> ListConfig<Self> {
        ListConfig::<Self>::new(page_size)
            .search(|a| Some(&a.title))
            .status(|a| a.status.as_str())
            .debounce(debounce)
    }
}
