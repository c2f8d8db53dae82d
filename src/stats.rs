//! Statistics panels derived from the cached collections. Everything here is
//! a pure function of its input; [`Memo`] avoids recomputing a panel until
//! the list it reads from is replaced.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

use crate::listing::ListViewModel;
use crate::models::{
    Activity, ActivityStatus, Document, DocumentStatus, Exam, Member, Participant,
    ParticipantStatus, RatingLevel, SelfRating, Survey, SurveyResponse,
};

/// `numerator / denominator`, or 0 when there is nothing to divide by.
pub fn rate(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// Late means strictly more than `threshold_minutes` after the start.
pub fn is_late(start: DateTime<Utc>, check_in: DateTime<Utc>, threshold_minutes: i64) -> bool {
    check_in > start + Duration::minutes(threshold_minutes)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceSummary {
    pub total: usize,
    pub checked_in: usize,
    pub on_time: usize,
    pub late: usize,
    pub absent: usize,
    pub attendance_rate: f64,
    pub on_time_rate: f64,
}

pub fn attendance(activity: &Activity, participants: &[Participant]) -> AttendanceSummary {
    let mut summary = AttendanceSummary {
        total: participants.len(),
        ..AttendanceSummary::default()
    };

    for participant in participants {
        if participant.status == ParticipantStatus::Absent {
            summary.absent += 1;
        }
        if !participant.has_checked_in() {
            continue;
        }
        summary.checked_in += 1;
        match participant.check_in_time {
            Some(at) if is_late(activity.start_time, at, activity.late_threshold_minutes) => {
                summary.late += 1
            }
            // no recorded time counts as on time
            _ => summary.on_time += 1,
        }
    }

    summary.attendance_rate = rate(summary.checked_in, summary.total);
    summary.on_time_rate = rate(summary.on_time, summary.checked_in);
    summary
}

/// Ordered `(minimum points, label)` tiers; the highest tier whose minimum
/// is at or below a member's points names the rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankThresholds {
    tiers: Vec<(i64, String)>,
}

impl Default for RankThresholds {
    fn default() -> Self {
        Self::new(vec![
            (800, "excellent".to_string()),
            (600, "good".to_string()),
            (400, "average".to_string()),
            (200, "poor".to_string()),
        ])
    }
}

impl RankThresholds {
    pub fn new(mut tiers: Vec<(i64, String)>) -> Self {
        tiers.sort_by(|a, b| b.0.cmp(&a.0));
        Self { tiers }
    }

    pub fn tiers(&self) -> &[(i64, String)] {
        &self.tiers
    }

    /// `None` below the lowest tier.
    pub fn rank_for(&self, points: i64) -> Option<&str> {
        self.tiers
            .iter()
            .find(|(minimum, _)| points >= *minimum)
            .map(|(_, label)| label.as_str())
    }
}

impl FromStr for RankThresholds {
    type Err = String;

    /// Parses `label=points` pairs separated by commas.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tiers = Vec::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (label, points) = pair
                .split_once('=')
                .ok_or_else(|| format!("`{pair}` should look like label=points"))?;
            let label = label.trim();
            if label.is_empty() {
                return Err(format!("`{pair}` has no label"));
            }
            let points: i64 = points
                .trim()
                .parse()
                .map_err(|_| format!("`{pair}` has a non-numeric threshold"))?;
            tiers.push((points, label.to_string()));
        }
        if tiers.is_empty() {
            return Err("at least one rank threshold is required".to_string());
        }
        Ok(Self::new(tiers))
    }
}

pub const UNRANKED: &str = "-";

/// Members per rank, in tier order, with the unranked bucket last.
pub fn rank_distribution(members: &[Member], thresholds: &RankThresholds) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = thresholds
        .tiers()
        .iter()
        .map(|(_, label)| (label.clone(), 0))
        .collect();
    let mut unranked = 0usize;

    for member in members {
        match thresholds.rank_for(member.points) {
            Some(label) => {
                if let Some(entry) = counts.iter_mut().find(|(l, _)| l == label) {
                    entry.1 += 1;
                }
            }
            None => unranked += 1,
        }
    }

    counts.push((UNRANKED.to_string(), unranked));
    counts
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointsSummary {
    pub members: usize,
    pub total_points: i64,
    pub average_points: f64,
    pub top_points: Option<i64>,
}

pub fn points_summary(members: &[Member]) -> PointsSummary {
    let total_points: i64 = members.iter().map(|m| m.points).sum();
    PointsSummary {
        members: members.len(),
        total_points,
        average_points: if members.is_empty() {
            0.0
        } else {
            total_points as f64 / members.len() as f64
        },
        top_points: members.iter().map(|m| m.points).max(),
    }
}

pub fn activity_status_counts(activities: &[Activity]) -> BTreeMap<ActivityStatus, usize> {
    let mut counts = BTreeMap::new();
    for activity in activities {
        *counts.entry(activity.status).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentTotals {
    pub documents: usize,
    pub published: usize,
    pub notified: usize,
    pub views: u64,
    pub downloads: u64,
}

pub fn document_totals(documents: &[Document]) -> DocumentTotals {
    documents.iter().fold(
        DocumentTotals {
            documents: documents.len(),
            ..DocumentTotals::default()
        },
        |mut totals, document| {
            if document.status == DocumentStatus::Published {
                totals.published += 1;
            }
            if document.notification_sent {
                totals.notified += 1;
            }
            totals.views += document.view_count;
            totals.downloads += document.download_count;
            totals
        },
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamTotals {
    pub exams: usize,
    pub active: usize,
    pub questions: usize,
    pub total_points: u32,
}

pub fn exam_totals(exams: &[Exam]) -> ExamTotals {
    ExamTotals {
        exams: exams.len(),
        active: exams.iter().filter(|e| e.is_active).count(),
        questions: exams.iter().map(|e| e.questions.len()).sum(),
        total_points: exams.iter().map(Exam::total_points).sum(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingCount {
    pub suggested: usize,
    pub finalized: usize,
}

/// Suggested vs final ratings per level.
pub fn rating_distribution(submissions: &[SelfRating]) -> BTreeMap<RatingLevel, RatingCount> {
    let mut counts: BTreeMap<RatingLevel, RatingCount> = RatingLevel::ALL
        .iter()
        .map(|level| (*level, RatingCount::default()))
        .collect();
    for submission in submissions {
        if let Some(count) = counts.get_mut(&submission.suggested_rating) {
            count.suggested += 1;
        }
        if let Some(count) = submission.final_rating.and_then(|level| counts.get_mut(&level)) {
            count.finalized += 1;
        }
    }
    counts
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionTally {
    pub content: String,
    pub answered: usize,
    /// Selections per option, in the question's option order.
    pub options: Vec<(String, usize)>,
    /// Mean of numeric answers (rating questions).
    pub average: Option<f64>,
}

pub fn survey_tallies(survey: &Survey, responses: &[SurveyResponse]) -> Vec<QuestionTally> {
    survey
        .questions
        .iter()
        .map(|question| {
            let mut options: Vec<(String, usize)> =
                question.options.iter().map(|o| (o.clone(), 0)).collect();
            let mut answered = 0usize;
            let mut scores = Vec::new();

            let answers = responses.iter().flat_map(|r| &r.answers).filter(|a| {
                question.id.as_deref() == Some(a.question_id.as_str())
            });
            for answer in answers {
                answered += 1;
                let picked: Vec<&str> = match &answer.value {
                    serde_json::Value::String(s) => vec![s.as_str()],
                    serde_json::Value::Array(values) => {
                        values.iter().filter_map(|v| v.as_str()).collect()
                    }
                    serde_json::Value::Number(n) => {
                        scores.extend(n.as_f64());
                        Vec::new()
                    }
                    _ => Vec::new(),
                };
                for choice in picked {
                    if let Some(entry) = options.iter_mut().find(|(o, _)| o == choice) {
                        entry.1 += 1;
                    }
                }
            }

            QuestionTally {
                content: question.content.clone(),
                answered,
                options,
                average: (!scores.is_empty())
                    .then(|| scores.iter().sum::<f64>() / scores.len() as f64),
            }
        })
        .collect()
}

/// Caches one derived value per collection version.
pub struct Memo<V> {
    cached: Mutex<Option<(u64, V)>>,
}

impl<V> Default for Memo<V> {
    fn default() -> Self {
        Self {
            cached: Mutex::new(None),
        }
    }
}

impl<V: Clone> Memo<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&self, version: u64, compute: impl FnOnce() -> V) -> V {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        match cached.as_ref() {
            Some((at, value)) if *at == version => value.clone(),
            _ => {
                let value = compute();
                *cached = Some((version, value.clone()));
                value
            }
        }
    }

    /// Derives `f` from the list's cache, recomputing only after the list
    /// stored a new collection.
    pub fn over<T>(&self, list: &ListViewModel<T>, f: impl FnOnce(&[T]) -> V) -> V
    where
        T: Clone + Send + Sync + 'static,
    {
        list.with_items(|version, items| self.get_or_compute(version, || f(items)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::error::AdminError;
    use crate::listing::{FnFetcher, ListConfig, ListQuery};
    use crate::models::survey::SurveyAnswer;
    use crate::models::{QuestionType, SubmissionStatus, SurveyQuestion, SurveyStatus};

    fn nine_am() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn activity() -> Activity {
        Activity {
            id: "a1".to_string(),
            title: "Morning cleanup".to_string(),
            description: None,
            activity_type: "VOLUNTEER".to_string(),
            status: ActivityStatus::Active,
            start_time: nine_am(),
            end_time: None,
            location: None,
            points_reward: 10,
            late_threshold_minutes: 15,
            max_participants: None,
        }
    }

    fn participant(status: ParticipantStatus, minutes: Option<i64>) -> Participant {
        Participant {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: "u".to_string(),
            full_name: None,
            status,
            check_in_time: minutes.map(|m| nine_am() + Duration::minutes(m)),
            absent_reason: None,
        }
    }

    fn member(points: i64) -> Member {
        Member {
            id: format!("m{points}"),
            full_name: format!("Member {points}"),
            unit: None,
            points,
        }
    }

    #[test]
    fn rates_guard_against_zero() {
        assert_eq!(rate(0, 0), 0.0);
        assert_eq!(rate(3, 0), 0.0);
        assert_eq!(rate(1, 4), 0.25);

        let empty = attendance(&activity(), &[]);
        assert_eq!(empty.attendance_rate, 0.0);
        assert_eq!(empty.on_time_rate, 0.0);
        assert!(empty.attendance_rate.is_finite());
    }

    #[test]
    fn lateness_boundary_is_exclusive() {
        let start = nine_am();
        assert!(!is_late(start, start + Duration::minutes(14), 15));
        assert!(!is_late(start, start + Duration::minutes(15), 15));
        assert!(is_late(start, start + Duration::minutes(16), 15));
        assert!(!is_late(start, start - Duration::minutes(5), 15));
    }

    #[test]
    fn attendance_counts_each_bucket() {
        let participants = vec![
            participant(ParticipantStatus::CheckedIn, Some(14)),
            participant(ParticipantStatus::CheckedIn, Some(16)),
            participant(ParticipantStatus::Completed, Some(0)),
            participant(ParticipantStatus::Absent, None),
            participant(ParticipantStatus::Registered, None),
        ];
        let summary = attendance(&activity(), &participants);

        assert_eq!(summary.total, 5);
        assert_eq!(summary.checked_in, 3);
        assert_eq!(summary.on_time, 2);
        assert_eq!(summary.late, 1);
        assert_eq!(summary.absent, 1);
        assert_eq!(summary.attendance_rate, 0.6);
        assert!((summary.on_time_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn ranks_are_inclusive_on_the_lower_bound() {
        let thresholds = RankThresholds::default();
        assert_eq!(thresholds.rank_for(800), Some("excellent"));
        assert_eq!(thresholds.rank_for(799), Some("good"));
        assert_eq!(thresholds.rank_for(600), Some("good"));
        assert_eq!(thresholds.rank_for(200), Some("poor"));
        assert_eq!(thresholds.rank_for(199), None);
    }

    #[test]
    fn thresholds_parse_in_any_order() {
        let parsed: RankThresholds = "bronze=100, gold=500,silver=300".parse().unwrap();
        assert_eq!(parsed.rank_for(450), Some("silver"));
        assert_eq!(parsed.tiers()[0].1, "gold");
        assert_eq!(
            "excellent=800,good=600,average=400,poor=200".parse::<RankThresholds>(),
            Ok(RankThresholds::default())
        );

        assert!("gold".parse::<RankThresholds>().is_err());
        assert!("gold=lots".parse::<RankThresholds>().is_err());
        assert!("".parse::<RankThresholds>().is_err());
    }

    #[test]
    fn rank_distribution_keeps_tier_order() {
        let members: Vec<Member> = [900, 810, 650, 420, 100, 0].into_iter().map(member).collect();
        let distribution = rank_distribution(&members, &RankThresholds::default());
        assert_eq!(
            distribution,
            vec![
                ("excellent".to_string(), 2),
                ("good".to_string(), 1),
                ("average".to_string(), 1),
                ("poor".to_string(), 0),
                (UNRANKED.to_string(), 2),
            ]
        );

        let summary = points_summary(&members);
        assert_eq!(summary.total_points, 2880);
        assert_eq!(summary.top_points, Some(900));
        assert_eq!(points_summary(&[]).average_points, 0.0);
    }

    #[test]
    fn rating_distribution_compares_suggested_and_final() {
        let submission = |suggested, final_rating| SelfRating {
            id: "s".to_string(),
            period_id: "p".to_string(),
            user_id: "u".to_string(),
            full_name: None,
            suggested_rating: suggested,
            final_rating,
            status: SubmissionStatus::Approved,
            admin_comment: None,
            submitted_at: None,
        };
        let submissions = vec![
            submission(RatingLevel::Excellent, Some(RatingLevel::Good)),
            submission(RatingLevel::Excellent, None),
            submission(RatingLevel::Good, Some(RatingLevel::Good)),
        ];
        let distribution = rating_distribution(&submissions);
        assert_eq!(distribution[&RatingLevel::Excellent].suggested, 2);
        assert_eq!(distribution[&RatingLevel::Excellent].finalized, 0);
        assert_eq!(distribution[&RatingLevel::Good].finalized, 2);
        assert_eq!(distribution[&RatingLevel::Poor], RatingCount::default());
    }

    #[test]
    fn survey_tallies_count_choices_and_average_scores() {
        let survey = Survey {
            id: "sv".to_string(),
            title: "Camp".to_string(),
            description: None,
            status: SurveyStatus::Closed,
            questions: vec![
                SurveyQuestion {
                    id: Some("q1".to_string()),
                    content: "Best part".to_string(),
                    question_type: QuestionType::MultipleChoice,
                    options: vec!["Food".to_string(), "Games".to_string()],
                    required: true,
                },
                SurveyQuestion {
                    id: Some("q2".to_string()),
                    content: "Score".to_string(),
                    question_type: QuestionType::Rating,
                    options: vec![],
                    required: false,
                },
            ],
            response_count: 2,
            end_date: None,
        };
        let response = |answers: Vec<(&str, serde_json::Value)>| SurveyResponse {
            id: "r".to_string(),
            survey_id: "sv".to_string(),
            user_id: None,
            submitted_at: None,
            answers: answers
                .into_iter()
                .map(|(q, value)| SurveyAnswer {
                    question_id: q.to_string(),
                    value,
                })
                .collect(),
        };
        let responses = vec![
            response(vec![("q1", json!(["Food", "Games"])), ("q2", json!(4))]),
            response(vec![("q1", json!("Games")), ("q2", json!(5))]),
        ];

        let tallies = survey_tallies(&survey, &responses);
        assert_eq!(
            tallies[0].options,
            vec![("Food".to_string(), 1), ("Games".to_string(), 2)]
        );
        assert_eq!(tallies[0].answered, 2);
        assert_eq!(tallies[1].average, Some(4.5));
    }

    #[tokio::test]
    async fn memo_recomputes_only_on_new_version() {
        let list = ListViewModel::configure(
            FnFetcher(|_q: ListQuery| async { Ok::<_, AdminError>(vec![member(900), member(100)]) }),
            ListConfig::new(10),
        )
        .unwrap();
        list.refresh().await.unwrap();

        let memo = Memo::new();
        let computed = AtomicUsize::new(0);
        let summarize = |members: &[Member]| {
            computed.fetch_add(1, Ordering::SeqCst);
            points_summary(members)
        };

        let first = memo.over(&list, summarize);
        let again = memo.over(&list, summarize);
        assert_eq!(first, again);
        assert_eq!(computed.load(Ordering::SeqCst), 1);

        // filters do not replace the collection
        list.set_status_filter(Some("NONE"));
        memo.over(&list, summarize);
        assert_eq!(computed.load(Ordering::SeqCst), 1);

        list.refresh().await.unwrap();
        memo.over(&list, summarize);
        assert_eq!(computed.load(Ordering::SeqCst), 2);
    }
}
