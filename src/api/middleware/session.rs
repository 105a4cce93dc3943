//! # 会话中间件
//!
//! 从请求头解析会话关联键（缺失或非法时生成新的），注入请求扩展，
//! 并在每个响应上回写最终使用的会话 ID。

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

use crate::api::server::AppState;
use crate::session::ResolvedSession;

/// 会话中间件
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = state.session_header().clone();
    let supplied = request
        .headers()
        .get(&header)
        .and_then(|value| value.to_str().ok());
    let resolved: ResolvedSession = state.sessions.resolve(supplied);

    if resolved.created {
        tracing::debug!(session = %resolved.id.short(), "session created for request");
    }
    let session_value = HeaderValue::from_str(resolved.id.as_str());
    request.extensions_mut().insert(resolved);

    let mut response = next.run(request).await;
    if let Ok(value) = session_value {
        response.headers_mut().insert(header, value);
    }
    response
}
