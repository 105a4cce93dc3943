//! # 会话处理器

use axum::{Extension, extract::State, response::Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::response;
use crate::api::server::AppState;
use crate::session::{ResolvedSession, SessionId};

/// 会话概况，会话尚未写入任何凭证时 `active` 为 false
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView {
    id: SessionId,
    active: bool,
    created_at: Option<DateTime<Utc>>,
    last_seen_at: Option<DateTime<Utc>>,
    credentials: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionEnded {
    removed_credentials: usize,
}

/// `GET /session`
pub async fn get_session(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
) -> Response {
    let info = state.store.session_info(&session.id);
    response::success(SessionView {
        id: session.id,
        active: info.is_some(),
        created_at: info.map(|i| i.created_at),
        last_seen_at: info.map(|i| i.last_seen_at),
        credentials: info.map_or(0, |i| i.credentials),
    })
}

/// `DELETE /session`，清除会话内全部凭证
pub async fn end_session(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
) -> Response {
    let removed_credentials = state.gateway.end_session(&session.id);
    response::success_with_message(SessionEnded { removed_credentials }, "session ended")
}
