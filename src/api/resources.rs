use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ApiClient;
use crate::error::AdminError;
use crate::listing::{Fetcher, ListQuery};
use crate::models::{
    Activity, ActivityStatus, Document, DocumentStatus, Exam, Member, Participant, RatingPeriod,
    SelfRating, Survey, SurveyResponse, SurveyStatus, User, UserActivity,
};

/// A collection served under `/api/{PATH}` with the usual CRUD routes.
pub trait Resource: DeserializeOwned + Send + Sync + 'static {
    const PATH: &'static str;
    /// Singular name used in operator messages.
    const LABEL: &'static str;

    fn id(&self) -> &str;
}

impl Resource for Activity {
    const PATH: &'static str = "activities";
    const LABEL: &'static str = "activity";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Resource for Document {
    const PATH: &'static str = "documents";
    const LABEL: &'static str = "document";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Resource for Exam {
    const PATH: &'static str = "exams";
    const LABEL: &'static str = "exam";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Resource for Survey {
    const PATH: &'static str = "surveys";
    const LABEL: &'static str = "survey";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Resource for RatingPeriod {
    const PATH: &'static str = "ratings/periods";
    const LABEL: &'static str = "rating period";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Resource for User {
    const PATH: &'static str = "users";
    const LABEL: &'static str = "user";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Feeds a list view-model from a collection endpoint.
pub struct ResourceFetcher<T> {
    client: ApiClient,
    path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Resource> ResourceFetcher<T> {
    pub fn new(client: ApiClient) -> Self {
        Self::at(client, T::PATH)
    }
}

impl<T> ResourceFetcher<T> {
    /// For nested collections such as an activity's participants.
    pub fn at(client: ApiClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T> Fetcher<T> for ResourceFetcher<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(&self, query: &ListQuery) -> Result<Vec<T>, AdminError> {
        Ok(self.client.list_at::<T>(&self.path, query).await?.items)
    }
}

#[derive(Debug, Serialize)]
struct StatusChange<S> {
    status: S,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckIn {
    #[serde(skip_serializing_if = "Option::is_none")]
    check_in_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct Absence<'a> {
    reason: &'a str,
}

pub fn participants_path(activity_id: &str) -> String {
    format!("activities/{activity_id}/participants")
}

pub const LEADERBOARD_PATH: &str = "points/leaderboard";

pub fn submissions_path(period_id: &str) -> String {
    format!("ratings/periods/{period_id}/submissions")
}

impl ApiClient {
    #[tracing::instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn change_activity_status(
        &self,
        id: &str,
        status: ActivityStatus,
    ) -> Result<Activity, AdminError> {
        self.put_at(&format!("activities/{id}/status"), &StatusChange { status })
            .await
    }

    #[tracing::instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn check_in(
        &self,
        activity_id: &str,
        participant_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<Participant, AdminError> {
        self.post_at(
            &format!("{}/{participant_id}/check-in", participants_path(activity_id)),
            &CheckIn { check_in_time: at },
        )
        .await
    }

    #[tracing::instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn mark_absent(
        &self,
        activity_id: &str,
        participant_id: &str,
        reason: &str,
    ) -> Result<Participant, AdminError> {
        self.post_at(
            &format!("{}/{participant_id}/absent", participants_path(activity_id)),
            &Absence { reason },
        )
        .await
    }

    #[tracing::instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn change_document_status(
        &self,
        id: &str,
        status: DocumentStatus,
    ) -> Result<Document, AdminError> {
        self.put_at(&format!("documents/{id}/status"), &StatusChange { status })
            .await
    }

    #[tracing::instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn send_document_notification(&self, id: &str) -> Result<Document, AdminError> {
        self.post_at(&format!("documents/{id}/notify"), &serde_json::json!({}))
            .await
    }

    #[tracing::instrument(skip(self, body), fields(request_id = tracing::field::Empty))]
    pub async fn adjust_points<B: Serialize + Sync>(&self, body: &B) -> Result<Member, AdminError> {
        self.post_at("points/adjust", body).await
    }

    #[tracing::instrument(skip(self, body), fields(request_id = tracing::field::Empty))]
    pub async fn review_submission<B: Serialize + Sync>(
        &self,
        id: &str,
        body: &B,
    ) -> Result<SelfRating, AdminError> {
        self.put_at(&format!("ratings/submissions/{id}/review"), body)
            .await
    }

    #[tracing::instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn change_survey_status(
        &self,
        id: &str,
        status: SurveyStatus,
    ) -> Result<Survey, AdminError> {
        self.put_at(&format!("surveys/{id}/status"), &StatusChange { status })
            .await
    }

    #[tracing::instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn survey_responses(&self, id: &str) -> Result<Vec<SurveyResponse>, AdminError> {
        Ok(self
            .list_at(&format!("surveys/{id}/responses"), &ListQuery::default())
            .await?
            .items)
    }

    #[tracing::instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn user_activities(&self, id: &str) -> Result<Vec<UserActivity>, AdminError> {
        Ok(self
            .list_at(&format!("users/{id}/activities"), &ListQuery::default())
            .await?
            .items)
    }
}
