//! # 系统处理器

use std::sync::OnceLock;
use std::time::Instant;

use axum::{extract::State, response::Response};
use serde::Serialize;

use crate::api::response;
use crate::api::server::AppState;
use crate::store::StoreStats;

/// 全局启动时间
static START_TIME: OnceLock<Instant> = OnceLock::new();

/// 初始化启动时间
pub fn init_start_time() {
    START_TIME.set(Instant::now()).ok();
}

fn uptime_seconds() -> u64 {
    START_TIME.get_or_init(Instant::now).elapsed().as_secs()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthInfo {
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    store: StoreStats,
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Response {
    response::success(HealthInfo {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: uptime_seconds(),
        store: state.store.stats(),
    })
}

/// `GET /ping`
pub async fn ping_handler() -> &'static str {
    "pong"
}
