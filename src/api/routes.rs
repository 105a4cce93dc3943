//! # 路由配置

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};

use super::handlers::{capabilities, credentials, session, system};
use super::middleware::session_middleware;
use super::server::AppState;

/// 创建所有路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .merge(provider_routes())
        .route("/capabilities", get(capabilities::get_capabilities))
        .route(
            "/session",
            get(session::get_session).delete(session::end_session),
        )
        // 以上路由都需要会话，健康检查不需要
        .route_layer(from_fn_with_state(state.clone(), session_middleware))
        .route("/health", get(system::health_check))
        .with_state(state)
}

/// 单个服务商的凭证与调用路由
fn provider_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/providers/{provider}/credential",
            put(credentials::set_credential)
                .get(credentials::get_status)
                .delete(credentials::remove_credential),
        )
        .route(
            "/providers/{provider}/credential/test",
            post(credentials::test_credential),
        )
        .route("/providers/{provider}/invoke", post(credentials::invoke))
}
