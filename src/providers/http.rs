//! # HTTP 辅助函数
//!
//! 适配器共用的请求发送与响应解析。所有错误都经过 `ErrorTranslator` 归类，
//! 响应体内容不会进入错误消息。

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::{ErrorTranslator, GatewayError, ProviderError, ProviderResult, Result};

const USER_AGENT: &str = concat!("credential-gateway/", env!("CARGO_PKG_VERSION"));

/// 创建适配器专属的 HTTP 客户端
pub(crate) fn build_client(connect_timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| GatewayError::internal_with_source("failed to create HTTP client", e))
}

/// 发送请求，非 2xx 状态直接归类为错误
pub(crate) async fn send(request: RequestBuilder, secret: &str) -> ProviderResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| ErrorTranslator::classify_transport(e, secret))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    tracing::debug!(status = status.as_u16(), "provider returned error status");
    Err(ErrorTranslator::classify_status(
        status,
        response.headers().get(RETRY_AFTER),
    ))
}

/// 读取并解析 JSON 响应体
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    secret: &str,
) -> ProviderResult<T> {
    let body = response
        .bytes()
        .await
        .map_err(|e| ErrorTranslator::classify_transport(e, secret))?;

    serde_json::from_slice(&body).map_err(|e| {
        ProviderError::InvalidResponse(format!(
            "unexpected response shape at line {} column {}",
            e.line(),
            e.column()
        ))
    })
}
