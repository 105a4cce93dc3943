//! # 能力查询处理器

use axum::{Extension, extract::State, response::Response};

use crate::api::response;
use crate::api::server::AppState;
use crate::session::ResolvedSession;

/// `GET /capabilities`
pub async fn get_capabilities(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
) -> Response {
    response::success(state.gateway.capabilities(&session.id))
}
