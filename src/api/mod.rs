use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AdminError;
use crate::listing::ListQuery;
use crate::session::Session;

pub mod envelope;
pub mod resources;
pub mod upload;

pub use envelope::Listing;
pub use resources::{Resource, ResourceFetcher};
pub use upload::{ProgressFn, UploadProgress};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Client for the backend REST API. Cheap to clone; every clone shares the
/// connection pool and the session.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Session) -> Result<Self, AdminError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("youth-admin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AdminError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Builds a request carrying the session's bearer token. Fails before
    /// anything is sent when there is no token.
    fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, AdminError> {
        let token = self.session.token()?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request_id = Uuid::new_v4();
        tracing::Span::current().record("request_id", tracing::field::display(request_id));
        tracing::debug!(%request_id, %method, path, "sending request");
        self.client
            .request(method, self.url(path))
            .header(REQUEST_ID_HEADER, request_id.to_string())
    }

    /// Sends a request built by [`Self::authorized`]. A 401 here means the
    /// token was rejected, so the session is invalidated.
    async fn send(&self, request: RequestBuilder) -> Result<(u16, String), AdminError> {
        let (status, body) = self.transmit(request).await?;
        if status == StatusCode::UNAUTHORIZED.as_u16() {
            tracing::info!("backend rejected the session token");
            self.session.invalidate();
            return Err(AdminError::Unauthenticated);
        }
        Ok((status, body))
    }

    async fn transmit(&self, request: RequestBuilder) -> Result<(u16, String), AdminError> {
        let response = request
            .send()
            .await
            .map_err(|e| AdminError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AdminError::Network(e.to_string()))?;
        Ok((status.as_u16(), body))
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AdminError> {
        let (status, body) = self.send(request).await?;
        envelope::decode(status, &body)
    }

    async fn execute_ack(&self, request: RequestBuilder) -> Result<(), AdminError> {
        let (status, body) = self.send(request).await?;
        envelope::decode_ack(status, &body)
    }

    #[tracing::instrument(skip(self), fields(request_id = tracing::field::Empty))]
    pub async fn list_at<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &ListQuery,
    ) -> Result<Listing<T>, AdminError> {
        let request = self
            .authorized(Method::GET, path)?
            .query(&query.params());
        let (status, body) = self.send(request).await?;
        envelope::decode_list(status, &body)
    }

    pub async fn get_at<T: DeserializeOwned>(&self, path: &str) -> Result<T, AdminError> {
        let request = self.authorized(Method::GET, path)?;
        self.execute(request).await
    }

    pub async fn post_at<T, B>(&self, path: &str, body: &B) -> Result<T, AdminError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.authorized(Method::POST, path)?.json(body);
        self.execute(request).await
    }

    pub async fn put_at<T, B>(&self, path: &str, body: &B) -> Result<T, AdminError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.authorized(Method::PUT, path)?.json(body);
        self.execute(request).await
    }

    pub async fn delete_at(&self, path: &str) -> Result<(), AdminError> {
        let request = self.authorized(Method::DELETE, path)?;
        self.execute_ack(request).await
    }

    #[tracing::instrument(skip(self), fields(resource = T::PATH, request_id = tracing::field::Empty))]
    pub async fn get<T: Resource>(&self, id: &str) -> Result<T, AdminError> {
        self.get_at(&format!("{}/{id}", T::PATH)).await
    }

    #[tracing::instrument(skip(self, body), fields(resource = T::PATH, request_id = tracing::field::Empty))]
    pub async fn create<T: Resource, B: Serialize + ?Sized>(&self, body: &B) -> Result<T, AdminError> {
        self.post_at(T::PATH, body).await
    }

    #[tracing::instrument(skip(self, body), fields(resource = T::PATH, request_id = tracing::field::Empty))]
    pub async fn update<T: Resource, B: Serialize + ?Sized>(
        &self,
        id: &str,
        body: &B,
    ) -> Result<T, AdminError> {
        self.put_at(&format!("{}/{id}", T::PATH), body).await
    }

    #[tracing::instrument(skip(self), fields(resource = T::PATH, request_id = tracing::field::Empty))]
    pub async fn delete<T: Resource>(&self, id: &str) -> Result<(), AdminError> {
        self.delete_at(&format!("{}/{id}", T::PATH)).await
    }

    /// Exchanges credentials for a token and stores it in the session.
    /// Rejected credentials are a server error carrying the backend's
    /// message; the stored token is left alone.
    #[tracing::instrument(skip(self, password), fields(request_id = tracing::field::Empty))]
    pub async fn login(&self, username: &str, password: &str) -> Result<(), AdminError> {
        #[derive(Serialize)]
        struct Credentials<'a> {
            username: &'a str,
            password: &'a str,
        }

        #[derive(Deserialize)]
        struct LoginData {
            token: String,
        }

        let request = self
            .request(Method::POST, "auth/login")
            .json(&Credentials { username, password });
        let (status, body) = self.transmit(request).await?;
        let data: LoginData = envelope::decode(status, &body)?;
        self.session.sign_in(data.token)
    }
}
