//! Subcommands. Each one drives the same view-models a screen would: load
//! the list, apply filters, open a dialog, submit, refresh and render.

use clap::Args;

use crate::api::{ApiClient, Resource};
use crate::config::Settings;
use crate::dialog::{DialogMode, FormSchema, MutationDialog};
use crate::error::{AdminError, ValidationErrors};
use crate::listing::{Fetcher, ListViewModel, SearchMode};
use crate::schema::Tabular;

pub mod activities;
pub mod documents;
pub mod exams;
pub mod points;
pub mod ratings;
pub mod surveys;
pub mod users;

pub struct Context {
    pub client: ApiClient,
    pub settings: Settings,
}

/// Filters shared by every list command.
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Search text
    #[arg(long)]
    pub search: Option<String>,
    /// Status filter (`ALL` shows everything)
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub page: usize,
}

impl Context {
    pub fn list_model<T>(&self, fetcher: impl Fetcher<T> + 'static) -> Result<ListViewModel<T>, AdminError>
    where
        T: Tabular + Clone + Send + Sync + 'static,
    {
        ListViewModel::configure(
            fetcher,
            T::list_config(self.settings.page_size, self.settings.debounce()),
        )
    }
}

/// Fetches, applies the filters and moves to the requested page.
pub async fn load<T>(list: &ListViewModel<T>, args: &ListArgs) -> Result<(), AdminError>
where
    T: Clone + Send + Sync + 'static,
{
    let search = args.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    // a server-side search fetches by itself once the term settles
    if search.is_none() || list.search_mode() == SearchMode::Client {
        list.refresh().await?;
    }
    list.set_status_filter(args.status.as_deref());
    if let Some(term) = search {
        list.set_search_term(term);
        tokio::select! {
            _ = list.settled() => {}
            _ = tokio::signal::ctrl_c() => {
                list.close();
                return Err(AdminError::Interrupted);
            }
        }
        if let Some(err) = list.error() {
            return Err(err);
        }
    }

    if args.page != 1 && !list.go_to_page(args.page) {
        tracing::warn!(
            page = args.page,
            total_pages = list.view().total_pages,
            "page out of range, staying on page 1"
        );
    }
    Ok(())
}

/// Cached copy of one record; edits prefill from it rather than refetching.
pub fn cached<T>(list: &ListViewModel<T>, id: &str) -> Result<T, AdminError>
where
    T: Resource + Clone,
{
    list.find(|item| item.id() == id).ok_or_else(|| {
        AdminError::Validation(ValidationErrors::single(
            "id",
            format!("no {} with id {id} in the current list", T::LABEL),
        ))
    })
}

/// Submits a create/edit dialog against the resource's CRUD routes and
/// refreshes the owning list.
pub async fn submit<F, T>(
    client: &ApiClient,
    list: &ListViewModel<T>,
    dialog: &mut MutationDialog<F>,
) -> Result<T, AdminError>
where
    F: FormSchema,
    T: Resource + Clone,
{
    dialog
        .submit_and_refresh(list, |mode, payload| async move {
            match mode {
                DialogMode::Create => client.create::<T, _>(&payload).await,
                DialogMode::Edit(id) => client.update::<T, _>(&id, &payload).await,
            }
        })
        .await
}

/// Replaces `target` when a flag was given.
pub fn set(target: &mut String, value: Option<impl ToString>) {
    if let Some(value) = value {
        *target = value.to_string();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, Query, State};
    use axum::routing::{get, put};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::api::ResourceFetcher;
    use crate::forms::SurveyForm;
    use crate::models::{Survey, User};
    use crate::testing::{context, spawn_backend};

    #[derive(Default)]
    struct Backend {
        surveys: Mutex<Vec<Value>>,
        list_calls: AtomicUsize,
    }

    fn survey_json(id: &str, title: &str) -> Value {
        json!({"id": id, "title": title, "status": "DRAFT", "questions": [
            {"id": "q1", "content": "How was it?", "type": "RATING", "options": [], "required": true}
        ]})
    }

    async fn surveys_backend() -> (String, Arc<Backend>) {
        let state = Arc::new(Backend::default());
        state.surveys.lock().unwrap().push(survey_json("s1", "Camp feedback"));

        let app = Router::new()
            .route(
                "/api/surveys",
                get(|State(s): State<Arc<Backend>>| async move {
                    s.list_calls.fetch_add(1, Ordering::SeqCst);
                    let items = s.surveys.lock().unwrap().clone();
                    Json(json!({"success": true, "data": items}))
                })
                .post(|State(s): State<Arc<Backend>>, Json(body): Json<Value>| async move {
                    let mut created = body.clone();
                    created["id"] = json!("s2");
                    created["status"] = json!("DRAFT");
                    s.surveys.lock().unwrap().push(created.clone());
                    Json(json!({"success": true, "data": created}))
                }),
            )
            .route(
                "/api/surveys/:id",
                put(
                    |State(s): State<Arc<Backend>>, Path(id): Path<String>, Json(body): Json<Value>| async move {
                        let mut surveys = s.surveys.lock().unwrap();
                        let Some(row) = surveys.iter_mut().find(|r| r["id"] == json!(id)) else {
                            return Json(json!({"success": false, "error": "Survey not found"}));
                        };
                        row["title"] = body["title"].clone();
                        Json(json!({"success": true, "data": row.clone()}))
                    },
                ),
            )
            .with_state(state.clone());
        (spawn_backend(app).await, state)
    }

    #[tokio::test]
    async fn created_survey_shows_up_after_refresh() {
        let (url, backend) = surveys_backend().await;
        let ctx = context(&url);
        let list = ctx
            .list_model::<Survey>(ResourceFetcher::new(ctx.client.clone()))
            .unwrap();
        load(&list, &ListArgs::default()).await.unwrap();

        let mut dialog = MutationDialog::<SurveyForm>::new();
        dialog.open_create();
        {
            let form = dialog.form_mut().unwrap();
            form.title = "Volunteer day".to_string();
            form.add_question("*text|What did you learn?").unwrap();
        }
        let created = submit(&ctx.client, &list, &mut dialog).await.unwrap();

        assert_eq!(created.id, "s2");
        let shown = cached(&list, "s2").unwrap();
        assert_eq!(shown.title, "Volunteer day");
        assert_eq!(shown.questions[0].content, "What did you learn?");
        assert!(shown.questions[0].required);
        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn edit_prefills_from_cache_and_server_error_keeps_dialog_open() {
        let (url, _backend) = surveys_backend().await;
        let ctx = context(&url);
        let list = ctx
            .list_model::<Survey>(ResourceFetcher::new(ctx.client.clone()))
            .unwrap();
        load(&list, &ListArgs::default()).await.unwrap();

        let existing = cached(&list, "s1").unwrap();
        let mut dialog = MutationDialog::<SurveyForm>::new();
        dialog.open_edit(existing.id.clone(), &existing);
        assert_eq!(dialog.form().unwrap().title, "Camp feedback");

        dialog.form_mut().unwrap().title = "Camp feedback 2026".to_string();
        let updated = submit(&ctx.client, &list, &mut dialog).await.unwrap();
        assert_eq!(updated.title, "Camp feedback 2026");

        // an id the backend no longer knows
        let mut ghost = existing.clone();
        ghost.id = "gone".to_string();
        dialog.open_edit("gone", &ghost);
        let err = submit(&ctx.client, &list, &mut dialog).await.unwrap_err();
        assert_eq!(err.to_string(), "Survey not found");
        assert!(dialog.is_open());
    }

    #[tokio::test]
    async fn unknown_id_is_reported() {
        let (url, _backend) = surveys_backend().await;
        let ctx = context(&url);
        let list = ctx
            .list_model::<Survey>(ResourceFetcher::new(ctx.client.clone()))
            .unwrap();
        load(&list, &ListArgs::default()).await.unwrap();

        let err = cached(&list, "nope").unwrap_err();
        assert!(matches!(err, AdminError::Validation(e) if e.has("id")));
    }

    #[tokio::test]
    async fn server_search_fetches_once_with_the_term() {
        let seen = Arc::new(Mutex::new(Vec::<Option<String>>::new()));
        let app = Router::new()
            .route(
                "/api/users",
                get(
                    |State(seen): State<Arc<Mutex<Vec<Option<String>>>>>,
                     Query(q): Query<std::collections::HashMap<String, String>>| async move {
                        seen.lock().unwrap().push(q.get("search").cloned());
                        Json(json!({"success": true, "data": [
                            {"id": "u1", "username": "lan", "fullName": "Lan Pham", "isActive": true}
                        ]}))
                    },
                ),
            )
            .with_state(seen.clone());
        let url = spawn_backend(app).await;
        let ctx = context(&url);
        let list = ctx.list_model::<User>(ResourceFetcher::new(ctx.client.clone())).unwrap();

        let args = ListArgs {
            search: Some("lan".to_string()),
            ..ListArgs::default()
        };
        load(&list, &args).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![Some("lan".to_string())]);
        assert_eq!(list.view().items.len(), 1);
    }

    #[test]
    fn set_only_overrides_given_flags() {
        let mut value = "old".to_string();
        set(&mut value, None::<String>);
        assert_eq!(value, "old");
        set(&mut value, Some(42));
        assert_eq!(value, "42");
    }
}
