use clap::{Args, Subcommand};

use super::{cached, load, set, submit, Context, ListArgs};
use crate::api::resources::participants_path;
use crate::api::ResourceFetcher;
use crate::dialog::{mutate_and_refresh, MutationDialog};
use crate::error::{AdminError, ValidationErrors};
use crate::forms::{AbsenceForm, ActivityForm};
use crate::models::{Activity, ActivityStatus, Participant};
use crate::stats::{self, Memo};
use crate::{render, validation};

#[derive(Subcommand, Debug)]
pub enum ActivityCommand {
    /// List activities
    List {
        #[command(flatten)]
        list: ListArgs,
        /// Also print counts per status
        #[arg(long)]
        stats: bool,
    },
    Show {
        id: String,
    },
    Create(ActivityFields),
    /// Edit an activity, starting from its listed values
    Update {
        id: String,
        #[command(flatten)]
        fields: ActivityFields,
    },
    Delete {
        id: String,
    },
    /// Request a status transition
    Status {
        id: String,
        status: ActivityStatus,
    },
    /// Participants and attendance statistics
    Participants {
        id: String,
        #[command(flatten)]
        list: ListArgs,
    },
    CheckIn {
        id: String,
        participant: String,
        /// Check-in time, defaults to now on the server
        #[arg(long)]
        at: Option<String>,
    },
    Absent {
        id: String,
        participant: String,
        #[arg(long)]
        reason: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct ActivityFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long = "type")]
    activity_type: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    location: Option<String>,
    /// `YYYY-MM-DD HH:MM` (UTC) or RFC 3339
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    end: Option<String>,
    #[arg(long)]
    points: Option<String>,
    /// Minutes after the start before a check-in counts as late
    #[arg(long)]
    late_threshold: Option<String>,
    #[arg(long)]
    max_participants: Option<String>,
}

impl ActivityFields {
    fn apply(self, form: &mut ActivityForm) {
        set(&mut form.title, self.title);
        set(&mut form.activity_type, self.activity_type);
        set(&mut form.description, self.description);
        set(&mut form.location, self.location);
        set(&mut form.start_time, self.start);
        set(&mut form.end_time, self.end);
        set(&mut form.points_reward, self.points);
        set(&mut form.late_threshold_minutes, self.late_threshold);
        set(&mut form.max_participants, self.max_participants);
    }
}

fn check_transition(activity: &Activity, next: ActivityStatus) -> Result<(), AdminError> {
    if activity.status.can_transition_to(next) {
        return Ok(());
    }
    let allowed: Vec<&str> = activity
        .status
        .next_allowed()
        .iter()
        .map(|s| s.as_str())
        .collect();
    let message = if allowed.is_empty() {
        format!("{} is final, no further changes", activity.status)
    } else {
        format!(
            "cannot move from {} to {next}, allowed: {}",
            activity.status,
            allowed.join(", ")
        )
    };
    Err(AdminError::Validation(ValidationErrors::single("status", message)))
}

pub async fn run(ctx: &Context, command: ActivityCommand) -> Result<(), AdminError> {
    let client = &ctx.client;
    let list = ctx.list_model::<Activity>(ResourceFetcher::new(client.clone()))?;

    match command {
        ActivityCommand::List { list: args, stats } => {
            load(&list, &args).await?;
            println!("{}", render::list_page("Activities", &list.view()));
            if stats {
                let counts = Memo::new().over(&list, stats::activity_status_counts);
                println!("{}", render::activity_status_panel(&counts));
            }
        }
        ActivityCommand::Show { id } => {
            let activity = client.get::<Activity>(&id).await?;
            println!("{}", render::activity_detail(&activity));
        }
        ActivityCommand::Create(fields) => {
            let mut dialog = MutationDialog::<ActivityForm>::new();
            dialog.open_create();
            if let Some(form) = dialog.form_mut() {
                fields.apply(form);
            }
            let created = submit(client, &list, &mut dialog).await?;
            println!("Created activity {}", created.id);
            println!("{}", render::activity_detail(&created));
        }
        ActivityCommand::Update { id, fields } => {
            list.refresh().await?;
            let existing = cached(&list, &id)?;
            let mut dialog = MutationDialog::<ActivityForm>::new();
            dialog.open_edit(&id, &existing);
            if let Some(form) = dialog.form_mut() {
                fields.apply(form);
            }
            let updated = submit(client, &list, &mut dialog).await?;
            println!("{}", render::activity_detail(&updated));
        }
        ActivityCommand::Delete { id } => {
            list.refresh().await?;
            let existing = cached(&list, &id)?;
            mutate_and_refresh(&list, client.delete::<Activity>(&id)).await?;
            println!("Deleted activity {} ({})", existing.id, existing.title);
        }
        ActivityCommand::Status { id, status } => {
            list.refresh().await?;
            let existing = cached(&list, &id)?;
            check_transition(&existing, status)?;
            let updated =
                mutate_and_refresh(&list, client.change_activity_status(&id, status)).await?;
            println!("{} is now {}", updated.title, updated.status);
        }
        ActivityCommand::Participants { id, list: args } => {
            let activity = client.get::<Activity>(&id).await?;
            let participants = ctx.list_model::<Participant>(ResourceFetcher::at(
                client.clone(),
                participants_path(&id),
            ))?;
            load(&participants, &args).await?;

            let title = format!("Participants of {}", activity.title);
            println!("{}", render::list_page(&title, &participants.view()));
            let summary = Memo::new().over(&participants, |items| stats::attendance(&activity, items));
            println!("{}", render::attendance_panel(&summary));
        }
        ActivityCommand::CheckIn { id, participant, at } => {
            let (updated, verdict) = check_in(ctx, &id, &participant, at.as_deref()).await?;
            println!(
                "{} checked in ({verdict})",
                updated.full_name.as_deref().unwrap_or(&updated.user_id)
            );
        }
        ActivityCommand::Absent {
            id,
            participant,
            reason,
        } => {
            let participants = ctx.list_model::<Participant>(ResourceFetcher::at(
                client.clone(),
                participants_path(&id),
            ))?;
            participants.refresh().await?;
            let current = participants
                .find(|p| p.id == participant)
                .ok_or_else(|| unknown_participant(&participant))?;

            let mut dialog = MutationDialog::<AbsenceForm>::new();
            dialog.open_edit(&participant, &current);
            if let Some(form) = dialog.form_mut() {
                form.reason = reason;
            }
            let (activity_id, participant_id) = (&id, &participant);
            let updated = dialog
                .submit_and_refresh(&participants, |_, payload| async move {
                    client
                        .mark_absent(activity_id, participant_id, &payload.reason)
                        .await
                })
                .await?;
            println!(
                "{} marked absent",
                updated.full_name.as_deref().unwrap_or(&updated.user_id)
            );
        }
    }
    Ok(())
}

/// Checks a participant in and reports whether the recorded time was late.
async fn check_in(
    ctx: &Context,
    id: &str,
    participant: &str,
    at: Option<&str>,
) -> Result<(Participant, &'static str), AdminError> {
    let client = &ctx.client;
    let at = at
        .map(validation::datetime)
        .transpose()
        .map_err(|m| AdminError::Validation(ValidationErrors::single("at", m)))?;
    let activity = client.get::<Activity>(id).await?;
    let participants = ctx.list_model::<Participant>(ResourceFetcher::at(
        client.clone(),
        participants_path(id),
    ))?;
    participants.refresh().await?;
    let current = participants
        .find(|p| p.id == participant)
        .ok_or_else(|| unknown_participant(participant))?;
    if current.has_checked_in() {
        return Err(AdminError::Validation(ValidationErrors::single(
            "participant",
            "already checked in",
        )));
    }

    let updated = mutate_and_refresh(&participants, client.check_in(id, participant, at)).await?;
    let verdict = punctuality(&activity, &updated);
    Ok((updated, verdict))
}

fn punctuality(activity: &Activity, participant: &Participant) -> &'static str {
    match participant.check_in_time {
        Some(time) if stats::is_late(activity.start_time, time, activity.late_threshold_minutes) => {
            "late"
        }
        Some(_) => "on time",
        None => "checked in",
    }
}

fn unknown_participant(id: &str) -> AdminError {
    AdminError::Validation(ValidationErrors::single(
        "participant",
        format!("no participant with id {id} in this activity"),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::State;
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    use super::*;
    use crate::dialog::FormSchema;
    use crate::testing::{context, spawn_backend};

    #[derive(Default)]
    struct Calls {
        status: AtomicUsize,
        check_in: AtomicUsize,
    }

    fn activity_json(status: &str) -> Value {
        json!({
            "id": "a1",
            "title": "Tree planting",
            "type": "VOLUNTEER",
            "status": status,
            "startTime": "2026-04-01T09:00:00Z",
            "lateThresholdMinutes": 15
        })
    }

    /// `p1` is registered, `p2` already checked in. Check-in echoes the
    /// requested time back.
    async fn backend() -> (String, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let app = Router::new()
            .route(
                "/api/activities",
                get(|| async { Json(json!({"success": true, "data": [activity_json("DRAFT")]})) }),
            )
            .route(
                "/api/activities/:id",
                get(|| async { Json(json!({"success": true, "data": activity_json("DRAFT")})) }),
            )
            .route(
                "/api/activities/:id/status",
                put(|State(c): State<Arc<Calls>>, Json(body): Json<Value>| async move {
                    c.status.fetch_add(1, Ordering::SeqCst);
                    let status = body["status"].as_str().unwrap_or_default().to_string();
                    Json(json!({"success": true, "data": activity_json(&status)}))
                }),
            )
            .route(
                "/api/activities/:id/participants",
                get(|| async {
                    Json(json!({"success": true, "data": [
                        {"id": "p1", "userId": "u1", "fullName": "Lan", "status": "REGISTERED"},
                        {"id": "p2", "userId": "u2", "fullName": "Minh", "status": "CHECKED_IN",
                         "checkInTime": "2026-04-01T08:55:00Z"}
                    ]}))
                }),
            )
            .route(
                "/api/activities/:id/participants/:pid/check-in",
                post(|State(c): State<Arc<Calls>>, Json(body): Json<Value>| async move {
                    c.check_in.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"success": true, "data": {
                        "id": "p1",
                        "userId": "u1",
                        "fullName": "Lan",
                        "status": "CHECKED_IN",
                        "checkInTime": body["checkInTime"]
                    }}))
                }),
            )
            .with_state(calls.clone());
        (spawn_backend(app).await, calls)
    }

    fn activity(status: ActivityStatus) -> Activity {
        Activity {
            id: "a1".to_string(),
            title: "Tree planting".to_string(),
            description: None,
            activity_type: "VOLUNTEER".to_string(),
            status,
            start_time: Utc.with_ymd_and_hms(2026, 4, 1, 7, 0, 0).unwrap(),
            end_time: None,
            location: None,
            points_reward: 20,
            late_threshold_minutes: 15,
            max_participants: None,
        }
    }

    #[test]
    fn only_offered_transitions_pass() {
        assert!(check_transition(&activity(ActivityStatus::Draft), ActivityStatus::Active).is_ok());
        assert!(check_transition(&activity(ActivityStatus::Active), ActivityStatus::Cancelled).is_ok());

        let err = check_transition(&activity(ActivityStatus::Draft), ActivityStatus::Completed)
            .unwrap_err();
        assert!(err.to_string().contains("allowed: ACTIVE, CANCELLED"));

        let err = check_transition(&activity(ActivityStatus::Completed), ActivityStatus::Active)
            .unwrap_err();
        assert!(err.to_string().contains("is final"));
    }

    #[test]
    fn flags_override_only_what_was_given() {
        let mut form = ActivityForm::from_entity(&activity(ActivityStatus::Draft));
        ActivityFields {
            title: Some("Tree planting day".to_string()),
            points: Some("35".to_string()),
            ..ActivityFields::default()
        }
        .apply(&mut form);

        assert_eq!(form.title, "Tree planting day");
        assert_eq!(form.points_reward, "35");
        assert_eq!(form.activity_type, "VOLUNTEER");
        assert_eq!(form.late_threshold_minutes, "15");
    }

    #[tokio::test]
    async fn repeat_check_in_never_reaches_the_backend() {
        let (url, calls) = backend().await;
        let ctx = context(&url);

        let err = run(
            &ctx,
            ActivityCommand::CheckIn {
                id: "a1".to_string(),
                participant: "p2".to_string(),
                at: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AdminError::Validation(e) if e.has("participant")));
        assert_eq!(calls.check_in.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn illegal_transition_never_reaches_the_backend() {
        let (url, calls) = backend().await;
        let ctx = context(&url);
        let status = |status| ActivityCommand::Status {
            id: "a1".to_string(),
            status,
        };

        let err = run(&ctx, status(ActivityStatus::Completed)).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(e) if e.has("status")));
        assert_eq!(calls.status.load(Ordering::SeqCst), 0);

        run(&ctx, status(ActivityStatus::Active)).await.unwrap();
        assert_eq!(calls.status.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn check_in_at_the_threshold_is_on_time() {
        let (url, calls) = backend().await;
        let ctx = context(&url);

        let (updated, verdict) = check_in(&ctx, "a1", "p1", Some("2026-04-01 09:15"))
            .await
            .unwrap();
        assert_eq!(verdict, "on time");
        assert_eq!(
            updated.check_in_time,
            Some(Utc.with_ymd_and_hms(2026, 4, 1, 9, 15, 0).unwrap())
        );

        let (_, verdict) = check_in(&ctx, "a1", "p1", Some("2026-04-01 09:16"))
            .await
            .unwrap();
        assert_eq!(verdict, "late");
        assert_eq!(calls.check_in.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unparsable_check_in_time_is_refused_locally() {
        let (url, calls) = backend().await;
        let ctx = context(&url);

        let err = check_in(&ctx, "a1", "p1", Some("9am")).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(e) if e.has("at")));
        assert_eq!(calls.check_in.load(Ordering::SeqCst), 0);
    }
}
