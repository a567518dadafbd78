use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::{stream, Stream};
use std::sync::Arc;
use tracing::warn;

use flashlingo_core::{
    filter_by_text, filter_by_topic, topic_counts, CoreError, DashboardStats, EntryDraft, EntryId,
    Subscription, TopicFilter, UserId, VocabRepository,
};

use crate::api::dto::{entries_out, EntryOut, ErrorOut, ListQuery, TopicOut, TopicsOut};

pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn VocabRepository>,
    /// Used when a request carries no `x-user-id` header.
    pub default_user: UserId,
}

pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            CoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            CoreError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
            CoreError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
        };
        if status.is_server_error() {
            warn!(error = %self.0, "request failed");
        }
        let body = ErrorOut { error: kind.to_string(), detail: self.0.to_string() };
        (status, Json(body)).into_response()
    }
}

/// The collection owner for this request.
pub struct CurrentUser(pub UserId);

#[async_trait::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        st: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(USER_HEADER) else {
            return Ok(CurrentUser(st.default_user.clone()));
        };
        let raw = raw.to_str().map_err(|_| CoreError::Validation("user_id"))?;
        Ok(CurrentUser(UserId::new(raw)?))
    }
}

pub async fn list_entries(
    State(st): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<EntryOut>>, ApiError> {
    let mut v = st.repo.list(&user).await?;
    if let Some(t) = q.topic.as_deref() {
        v = filter_by_topic(&v, &TopicFilter::parse(t));
    }
    if let Some(text) = q.q.as_deref() {
        v = filter_by_text(&v, text);
    }
    Ok(Json(entries_out(&v)))
}

pub async fn create_entry(
    State(st): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(draft): Json<EntryDraft>,
) -> Result<(StatusCode, Json<EntryOut>), ApiError> {
    let e = st.repo.create(&user, &draft).await?;
    Ok((StatusCode::CREATED, Json(EntryOut::from(&e))))
}

pub async fn get_entry(
    State(st): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<EntryId>,
) -> Result<Json<EntryOut>, ApiError> {
    let e = st.repo.get(&user, id).await?;
    Ok(Json(EntryOut::from(&e)))
}

pub async fn update_entry(
    State(st): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<EntryId>,
    Json(draft): Json<EntryDraft>,
) -> Result<Json<EntryOut>, ApiError> {
    let e = st.repo.update(&user, id, &draft).await?;
    Ok(Json(EntryOut::from(&e)))
}

pub async fn delete_entry(
    State(st): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<EntryId>,
) -> Result<StatusCode, ApiError> {
    st.repo.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_topics(
    State(st): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<TopicsOut>, ApiError> {
    let v = st.repo.list(&user).await?;
    let topics = topic_counts(&v)
        .into_iter()
        .map(|(name, count)| TopicOut { name, count })
        .collect();
    Ok(Json(TopicsOut { all: v.len(), topics }))
}

pub async fn stats(
    State(st): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<DashboardStats>, ApiError> {
    let v = st.repo.list(&user).await?;
    Ok(Json(DashboardStats::from_entries(&v)))
}

/// Server-sent events: the current snapshot first, then one event per change.
/// Only the newest snapshot is sent when several writes land between polls.
pub async fn stream_entries(
    State(st): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let sub = st.repo.subscribe(&user).await?;
    let events = stream::unfold((sub, true), |(mut sub, first): (Subscription, bool)| async move {
        let snap = if first { sub.latest() } else { sub.changed().await? };
        let event = Event::default().event("snapshot").json_data(entries_out(&snap));
        Some((event, (sub, false)))
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
