use std::collections::BTreeMap;
use std::fmt::Write;

use crate::error::AdminError;
use crate::listing::ListView;
use crate::models::{
    Activity, ActivityStatus, Document, Exam, Member, RatingLevel, Survey, User, UserActivity,
};
use crate::schema::{self, Column, Tabular};
use crate::stats::{
    AttendanceSummary, DocumentTotals, ExamTotals, PointsSummary, QuestionTally, RankThresholds,
    RatingCount,
};

const ANSWER_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

pub fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// Left-aligned text table, columns as wide as their widest cell.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}", width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let _ = writeln!(output, "{}", line(headers.to_vec()));
    let _ = writeln!(
        output,
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  ")
    );
    for row in rows {
        let _ = writeln!(output, "{}", line(row.iter().map(String::as_str).collect()));
    }
    output
}

fn page_footer<T>(output: &mut String, view: &ListView<T>) {
    let _ = writeln!(
        output,
        "Page {}/{} ({} shown, {} cached)",
        view.page,
        view.total_pages.max(1),
        view.total_visible,
        view.total_cached
    );
    if !view.search_term.is_empty() {
        let _ = writeln!(output, "Search: {}", view.search_term);
    }
    if let Some(status) = &view.status_filter {
        let _ = writeln!(output, "Filter: {status}");
    }
}

fn page_with<T>(title: &str, headers: &[&str], rows: &[Vec<String>], view: &ListView<T>) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# {title}");
    if let Some(err) = &view.error {
        let _ = writeln!(output, "! {}", notice(err));
    }
    if view.loading {
        let _ = writeln!(output, "Loading...");
    }
    if rows.is_empty() && !view.loading {
        let _ = writeln!(output, "No records found.");
    } else {
        output.push_str(&table(headers, rows));
    }
    output
}

/// One page of a list screen.
pub fn list_page<T: Tabular>(title: &str, view: &ListView<T>) -> String {
    let columns = T::columns();
    let headers: Vec<&str> = columns.iter().map(|c| c.header).collect();
    let rows = schema::rows(&columns, &view.items);

    let mut output = page_with(title, &headers, &rows, view);
    page_footer(&mut output, view);
    output
}

/// Leaderboard page: position, member columns and rank label.
pub fn leaderboard_page(view: &ListView<Member>, thresholds: &RankThresholds) -> String {
    let columns: Vec<Column<Member>> = Member::columns();
    let mut headers = vec!["#"];
    headers.extend(columns.iter().map(|c| c.header));
    headers.push("RANK");

    let offset = (view.page.max(1) - 1) * view.page_size;
    let rows: Vec<Vec<String>> = schema::rows(&columns, &view.items)
        .into_iter()
        .zip(&view.items)
        .enumerate()
        .map(|(index, (cells, member))| {
            let mut row = vec![(offset + index + 1).to_string()];
            row.extend(cells);
            row.push(schema::rank_label(member, thresholds));
            row
        })
        .collect();

    let mut output = page_with("Leaderboard", &headers, &rows, view);
    page_footer(&mut output, view);
    output
}

pub fn attendance_panel(summary: &AttendanceSummary) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## Attendance");
    let _ = writeln!(output, "- Participants: {}", summary.total);
    let _ = writeln!(
        output,
        "- Checked in: {} ({})",
        summary.checked_in,
        percent(summary.attendance_rate)
    );
    let _ = writeln!(
        output,
        "- On time: {} ({} of check-ins)",
        summary.on_time,
        percent(summary.on_time_rate)
    );
    let _ = writeln!(output, "- Late: {}", summary.late);
    let _ = writeln!(output, "- Absent: {}", summary.absent);
    output
}

pub fn activity_status_panel(counts: &BTreeMap<ActivityStatus, usize>) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## Activities by status");
    for status in ActivityStatus::ALL {
        let _ = writeln!(output, "- {}: {}", status, counts.get(status).copied().unwrap_or(0));
    }
    output
}

pub fn rank_panel(distribution: &[(String, usize)], summary: &PointsSummary) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## Ranks");
    for (label, count) in distribution {
        let _ = writeln!(output, "- {label}: {count}");
    }
    let _ = writeln!(
        output,
        "Members {} | total points {} | average {:.1} | top {}",
        summary.members,
        summary.total_points,
        summary.average_points,
        summary
            .top_points
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    output
}

pub fn document_panel(totals: &DocumentTotals) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## Documents");
    let _ = writeln!(
        output,
        "- {} documents, {} published, {} notified",
        totals.documents, totals.published, totals.notified
    );
    let _ = writeln!(
        output,
        "- {} views, {} downloads",
        totals.views, totals.downloads
    );
    output
}

pub fn exam_panel(totals: &ExamTotals) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## Exams");
    let _ = writeln!(
        output,
        "- {} exams ({} active), {} questions worth {} points",
        totals.exams, totals.active, totals.questions, totals.total_points
    );
    output
}

pub fn rating_panel(distribution: &BTreeMap<RatingLevel, RatingCount>) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## Ratings (suggested / final)");
    for (level, count) in distribution {
        let _ = writeln!(output, "- {level}: {} / {}", count.suggested, count.finalized);
    }
    output
}

pub fn survey_panel(survey: &Survey, tallies: &[QuestionTally]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## Responses to {} ({})", survey.title, survey.response_count);
    if tallies.is_empty() {
        let _ = writeln!(output, "No questions.");
    }
    for (index, tally) in tallies.iter().enumerate() {
        let _ = writeln!(
            output,
            "{}. {} ({} answered)",
            index + 1,
            tally.content,
            tally.answered
        );
        for (option, count) in &tally.options {
            let _ = writeln!(output, "   - {option}: {count}");
        }
        if let Some(average) = tally.average {
            let _ = writeln!(output, "   average {average:.2}");
        }
    }
    output
}

pub fn activity_detail(activity: &Activity) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# {}", activity.title);
    let _ = writeln!(output, "ID: {}", activity.id);
    let _ = writeln!(output, "Type: {}", activity.activity_type);
    let _ = writeln!(output, "Status: {}", activity.status);
    let _ = writeln!(output, "Starts: {}", activity.start_time.format("%Y-%m-%d %H:%M"));
    if let Some(end) = activity.end_time {
        let _ = writeln!(output, "Ends: {}", end.format("%Y-%m-%d %H:%M"));
    }
    if let Some(location) = &activity.location {
        let _ = writeln!(output, "Location: {location}");
    }
    let _ = writeln!(
        output,
        "Reward: {} points, late after {} minutes",
        activity.points_reward, activity.late_threshold_minutes
    );
    let next: Vec<&str> = activity.status.next_allowed().iter().map(|s| s.as_str()).collect();
    if !next.is_empty() {
        let _ = writeln!(output, "Can move to: {}", next.join(", "));
    }
    if let Some(description) = &activity.description {
        let _ = writeln!(output);
        let _ = writeln!(output, "{description}");
    }
    output
}

pub fn document_detail(document: &Document) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# {}", document.title);
    let _ = writeln!(output, "ID: {}", document.id);
    let _ = writeln!(output, "Type: {}", document.document_type);
    let _ = writeln!(output, "Status: {}", document.status);
    match (&document.file_name, &document.file_url) {
        (Some(name), Some(url)) => {
            let _ = writeln!(output, "File: {name} ({url})");
        }
        (None, Some(url)) => {
            let _ = writeln!(output, "File: {url}");
        }
        _ => {
            let _ = writeln!(output, "File: none attached");
        }
    }
    let _ = writeln!(
        output,
        "Views {} | downloads {} | notification {}",
        document.view_count,
        document.download_count,
        if document.notification_sent { "sent" } else { "not sent" }
    );
    output
}

pub fn exam_detail(exam: &Exam) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# {}", exam.title);
    let _ = writeln!(
        output,
        "{} minutes, pass at {}%, {} attempt(s), {}",
        exam.duration,
        exam.passing_score,
        exam.max_attempts,
        if exam.is_active { "active" } else { "inactive" }
    );
    let _ = writeln!(
        output,
        "{} questions, {} points",
        exam.questions.len(),
        exam.total_points()
    );
    for (index, question) in exam.questions.iter().enumerate() {
        let _ = writeln!(output);
        let _ = writeln!(output, "{}. {} [{} pt]", index + 1, question.content, question.points);
        for (option_index, option) in question.options.iter().enumerate() {
            let letter = ANSWER_LETTERS.get(option_index).copied().unwrap_or('?');
            let marker = if option_index == question.correct_answer { "*" } else { " " };
            let _ = writeln!(output, "  {marker}{letter}) {option}");
        }
    }
    output
}

pub fn survey_detail(survey: &Survey) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# {}", survey.title);
    let _ = writeln!(output, "Status: {} | responses {}", survey.status, survey.response_count);
    if let Some(end) = survey.end_date {
        let _ = writeln!(output, "Closes: {}", end.format("%Y-%m-%d %H:%M"));
    }
    for (index, question) in survey.questions.iter().enumerate() {
        let _ = writeln!(
            output,
            "{}. {}{} ({})",
            index + 1,
            question.content,
            if question.required { " *" } else { "" },
            question.question_type
        );
        for option in &question.options {
            let _ = writeln!(output, "   - {option}");
        }
    }
    output
}

/// Profile plus participation history.
pub fn user_profile(user: &User, history: &[UserActivity]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# {} (@{})", user.full_name, user.username);
    let _ = writeln!(output, "ID: {}", user.id);
    for (label, value) in [
        ("Email", &user.email),
        ("Phone", &user.phone),
        ("Role", &user.role),
        ("Unit", &user.unit),
    ] {
        if let Some(value) = value {
            let _ = writeln!(output, "{label}: {value}");
        }
    }
    let _ = writeln!(
        output,
        "Points: {} | {}",
        user.points,
        if user.is_active { "active" } else { "inactive" }
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Activity history");
    if history.is_empty() {
        let _ = writeln!(output, "No participation recorded.");
    } else {
        let columns = UserActivity::columns();
        let headers: Vec<&str> = columns.iter().map(|c| c.header).collect();
        output.push_str(&table(&headers, &schema::rows(&columns, history)));
        let earned: i64 = history.iter().map(|a| a.points_earned).sum();
        let _ = writeln!(output, "{} activities, {} points earned", history.len(), earned);
    }
    output
}

/// Operator-facing text for an error.
pub fn notice(err: &AdminError) -> String {
    match err {
        err if err.is_auth() => {
            "Your session is missing or expired. Run `youth-admin login` to sign in again."
                .to_string()
        }
        AdminError::Validation(errors) => {
            let mut output = String::from("Please fix the following:");
            for error in errors.iter() {
                let _ = write!(output, "\n  - {}: {}", error.field, error.message);
            }
            output
        }
        AdminError::Network(_) => format!("{err}. Showing the last loaded data; try again."),
        other => other.to_string(),
    }
}
