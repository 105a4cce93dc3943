//! # 网关 HTTP 服务器
//!
//! Axum 服务器，挂载会话作用域的凭证与调用 API。

use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::middleware::{REQUEST_ID_HEADER, request_id_middleware};
use crate::app::AppContext;
use crate::config::ServerConfig;
use crate::error::{GatewayError, Result};

/// 服务器应用状态
#[derive(Clone)]
pub struct AppState {
    context: Arc<AppContext>,
    session_header: HeaderName,
}

impl AppState {
    /// 创建状态，会话头名称非法时返回配置错误
    pub fn new(context: Arc<AppContext>) -> Result<Self> {
        let raw = context.config.session.header_name.trim().to_ascii_lowercase();
        let session_header = HeaderName::from_bytes(raw.as_bytes()).map_err(|e| {
            GatewayError::config_with_source(format!("invalid session.header_name '{raw}'"), e)
        })?;
        Ok(Self {
            context,
            session_header,
        })
    }

    /// 携带会话关联键的请求头
    #[must_use]
    pub const fn session_header(&self) -> &HeaderName {
        &self.session_header
    }
}

impl Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

/// 构建完整路由（测试中直接使用）
pub fn build_router(context: Arc<AppContext>) -> Result<Router> {
    let state = AppState::new(context)?;
    let config = state.config.server.clone();
    let session_header = state.session_header().clone();

    let api_routes = super::routes::create_routes(state);

    let mut app = Router::new()
        .nest(&config.api_prefix, api_routes)
        .route("/ping", get(super::handlers::system::ping_handler));

    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_seconds,
        )));

    if config.enable_cors {
        let cors_layer = cors_layer(&config, session_header);
        app = app.layer(service_builder.layer(cors_layer));
    } else {
        app = app.layer(service_builder);
    }

    Ok(app
        .layer(DefaultBodyLimit::max(config.max_request_size))
        .layer(axum::middleware::from_fn(request_id_middleware)))
}

fn cors_layer(config: &ServerConfig, session_header: HeaderName) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            session_header.clone(),
        ])
        .expose_headers([session_header, REQUEST_ID_HEADER.clone(), header::RETRY_AFTER]);

    if config.cors_origins.is_empty() || config.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<std::result::Result<Vec<_>, _>>();
    match origins {
        Ok(origins) => layer.allow_origin(origins),
        Err(e) => {
            tracing::warn!(error = %e, "invalid CORS origin configuration, falling back to allow any");
            layer.allow_origin(Any)
        }
    }
}

/// 网关服务器
pub struct ApiServer {
    config: ServerConfig,
    router: Router,
}

impl ApiServer {
    pub fn new(context: Arc<AppContext>) -> Result<Self> {
        let config = context.config.server.clone();
        let router = build_router(context)?;
        Ok(Self { config, router })
    }

    /// 监听地址
    pub fn bind_address(&self) -> Result<SocketAddr> {
        let address = self.config.listen_address();
        address.parse().map_err(|e| {
            GatewayError::config_with_source(format!("invalid listen address '{address}'"), e)
        })
    }

    /// 启动服务器，直到 `shutdown` 被取消
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.bind_address()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "gateway server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| GatewayError::internal_with_source("gateway server error", e))?;

        tracing::info!("gateway server stopped");
        Ok(())
    }
}
