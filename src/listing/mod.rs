//! List-fetch-filter-paginate view-model shared by every admin screen.
//!
//! The cached collection is whatever the last successful fetch returned; it
//! is replaced wholesale, never merged. Each fetch is tagged with a
//! generation number and a response is only applied while its generation is
//! still the latest one issued, so a slow response for an older query can
//! never overwrite a newer one.

#[cfg(test)]
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{AdminError, ValidationErrors};

pub mod filter;

pub use filter::{SortKey, StatusField, TextField};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Parameters forwarded to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
}

impl ListQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        if let Some(status) = &self.status {
            params.push(("status", status.clone()));
        }
        params
    }
}

#[async_trait]
pub trait Fetcher<T>: Send + Sync {
    async fn fetch(&self, query: &ListQuery) -> Result<Vec<T>, AdminError>;
}

/// Adapts an async closure into a [`Fetcher`].
#[cfg(test)]
pub struct FnFetcher<F>(pub F);

#[cfg(test)]
#[async_trait]
impl<T, F, Fut> Fetcher<T> for FnFetcher<F>
where
    T: Send + 'static,
    F: Fn(ListQuery) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<T>, AdminError>> + Send,
{
    async fn fetch(&self, query: &ListQuery) -> Result<Vec<T>, AdminError> {
        (self.0)(query.clone()).await
    }
}

/// Where the search term is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Filter the cached collection locally.
    Client,
    /// Send the term to the backend and re-fetch.
    Server,
}

pub struct ListConfig<T> {
    pub search_fields: Vec<TextField<T>>,
    pub status_field: Option<StatusField<T>>,
    pub sort: Option<SortKey<T>>,
    pub page_size: usize,
    pub search_mode: SearchMode,
    pub debounce: Duration,
}

impl<T> ListConfig<T> {
    pub fn new(page_size: usize) -> Self {
        Self {
            search_fields: Vec::new(),
            status_field: None,
            sort: None,
            page_size,
            search_mode: SearchMode::Client,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn search(mut self, field: TextField<T>) -> Self {
        self.search_fields.push(field);
        self
    }

    pub fn status(mut self, field: StatusField<T>) -> Self {
        self.status_field = Some(field);
        self
    }

    pub fn sort_by(mut self, sort: SortKey<T>) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn server_search(mut self) -> Self {
        self.search_mode = SearchMode::Server;
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.page_size == 0 {
            errors.add("pageSize", "must be greater than 0");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer fetch was issued while this one was in flight.
    Stale,
    /// The view-model was closed.
    Cancelled,
}

/// What a screen renders: one page of the filtered collection plus state.
#[derive(Debug, Clone)]
pub struct ListView<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_visible: usize,
    pub total_cached: usize,
    pub search_term: String,
    pub status_filter: Option<String>,
    pub loading: bool,
    pub error: Option<AdminError>,
}

struct ListState<T> {
    items: Vec<T>,
    search_term: String,
    pending_term: Option<String>,
    status_filter: Option<String>,
    page: usize,
    loading: bool,
    error: Option<AdminError>,
    /// Generation of the most recently issued fetch.
    issued: u64,
    /// Bumped every time `items` is replaced.
    version: u64,
    debounce: Option<JoinHandle<()>>,
}

struct Inner<T> {
    config: ListConfig<T>,
    fetcher: Box<dyn Fetcher<T>>,
    state: Mutex<ListState<T>>,
    cancel: CancellationToken,
}

pub struct ListViewModel<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ListViewModel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> ListViewModel<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn configure(
        fetcher: impl Fetcher<T> + 'static,
        config: ListConfig<T>,
    ) -> Result<Self, AdminError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                fetcher: Box::new(fetcher),
                state: Mutex::new(ListState {
                    items: Vec::new(),
                    search_term: String::new(),
                    pending_term: None,
                    status_filter: None,
                    page: 1,
                    loading: false,
                    error: None,
                    issued: 0,
                    version: 0,
                    debounce: None,
                }),
                cancel: CancellationToken::new(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ListState<T>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn query_for(&self, state: &ListState<T>) -> ListQuery {
        let search = match self.inner.config.search_mode {
            SearchMode::Server => Some(state.search_term.trim().to_string()).filter(|s| !s.is_empty()),
            SearchMode::Client => None,
        };
        ListQuery {
            search,
            status: None,
        }
    }

    /// Filtered and sorted view of the cache. Under server-side search the
    /// backend already applied the term.
    fn visible_in<'a>(&self, state: &'a ListState<T>) -> Vec<&'a T> {
        let config = &self.inner.config;
        let term = match config.search_mode {
            SearchMode::Client => state.search_term.as_str(),
            SearchMode::Server => "",
        };
        filter::visible(
            &state.items,
            &config.search_fields,
            config.status_field,
            config.sort,
            term,
            state.status_filter.as_deref(),
        )
    }

    /// Re-invokes the fetcher with the current filters and replaces the
    /// cache on success. The page is reset to 1 only when it would now be
    /// out of range.
    pub async fn refresh(&self) -> Result<FetchOutcome, AdminError> {
        let query = {
            let state = self.lock();
            self.query_for(&state)
        };
        self.fetch(query).await
    }

    async fn fetch(&self, query: ListQuery) -> Result<FetchOutcome, AdminError> {
        if self.inner.cancel.is_cancelled() {
            return Ok(FetchOutcome::Cancelled);
        }

        let generation = {
            let mut state = self.lock();
            state.issued += 1;
            state.loading = true;
            state.issued
        };

        let result = tokio::select! {
            _ = self.inner.cancel.cancelled() => {
                self.lock().loading = false;
                return Ok(FetchOutcome::Cancelled);
            }
            result = self.inner.fetcher.fetch(&query) => result,
        };

        let mut state = self.lock();
        if generation != state.issued {
            tracing::debug!(generation, latest = state.issued, "discarding stale list response");
            return Ok(FetchOutcome::Stale);
        }
        state.loading = false;

        match result {
            Ok(items) => {
                state.items = items;
                state.version += 1;
                state.error = None;
                let pages = filter::total_pages(self.visible_in(&state).len(), self.inner.config.page_size);
                if state.page > pages.max(1) {
                    state.page = 1;
                }
                Ok(FetchOutcome::Applied)
            }
            Err(err) => {
                tracing::warn!(error = %err, "list fetch failed, keeping cached items");
                state.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Schedules the term to take effect after the debounce delay. A newer
    /// term cancels the pending one, including its in-flight request.
    pub fn set_search_term(&self, term: impl Into<String>) {
        let term = term.into();
        let this = self.clone();
        let delay = self.inner.config.debounce;

        let mut state = self.lock();
        if let Some(previous) = state.debounce.take() {
            previous.abort();
        }
        state.pending_term = Some(term.clone());
        state.debounce = Some(tokio::spawn(async move {
            tokio::select! {
                _ = this.inner.cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => this.apply_search_term(term).await,
            }
        }));
    }

    async fn apply_search_term(&self, term: String) {
        let query = {
            let mut state = self.lock();
            state.search_term = term;
            state.pending_term = None;
            state.page = 1;
            self.query_for(&state)
        };

        if self.inner.config.search_mode == SearchMode::Server {
            // the error is recorded in the state
            let _ = self.fetch(query).await;
        }
    }

    /// Waits until no debounced search is pending.
    pub async fn settled(&self) {
        loop {
            let handle = self.lock().debounce.take();
            match handle {
                Some(handle) => {
                    let _ = handle.await;
                }
                None => break,
            }
        }
    }

    pub fn set_status_filter(&self, status: Option<&str>) {
        let mut state = self.lock();
        state.status_filter = filter::normalize_status(status);
        state.page = 1;
    }

    /// Moves to page `n`; returns `false` and leaves the page unchanged when
    /// `n` is outside `1..=total_pages`.
    pub fn go_to_page(&self, n: usize) -> bool {
        let mut state = self.lock();
        let pages = filter::total_pages(self.visible_in(&state).len(), self.inner.config.page_size);
        if n == 0 || n > pages {
            return false;
        }
        state.page = n;
        true
    }

    pub fn view(&self) -> ListView<T> {
        let state = self.lock();
        let visible = self.visible_in(&state);
        let page_size = self.inner.config.page_size;
        let total_pages = filter::total_pages(visible.len(), page_size);
        let page = filter::clamp_page(state.page, total_pages);
        let items = filter::page_slice(&visible, page, page_size)
            .iter()
            .map(|item| (*item).clone())
            .collect();

        ListView {
            items,
            page,
            page_size,
            total_pages,
            total_visible: visible.len(),
            total_cached: state.items.len(),
            search_term: state.search_term.clone(),
            status_filter: state.status_filter.clone(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    /// Runs `f` over the full cached collection without cloning it, along
    /// with the version that collection was stored under.
    pub fn with_items<R>(&self, f: impl FnOnce(u64, &[T]) -> R) -> R {
        let state = self.lock();
        f(state.version, &state.items)
    }

    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.lock().items.iter().find(|item| predicate(*item)).cloned()
    }

    pub fn error(&self) -> Option<AdminError> {
        self.lock().error.clone()
    }

    pub fn search_mode(&self) -> SearchMode {
        self.inner.config.search_mode
    }

    /// Teardown: cancels the pending search and drops any response still
    /// in flight.
    pub fn close(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.lock().debounce.take() {
            handle.abort();
        }
    }
}
