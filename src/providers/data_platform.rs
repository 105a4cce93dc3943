//! # 数据平台适配器
//!
//! Databricks 风格的 REST 接口。凭证附加字段：
//! - `host`（必填，缺省协议为 https）
//! - `workspace_id`（可选，作为 `X-Databricks-Org-Id` 请求头）
//! - `warehouse_id`（可选，SQL 查询的默认仓库）

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;

use super::http;
use super::traits::ProviderAdapter;
use super::types::{Auxiliary, OperationKind, ProbeResult, ProviderKind, ProviderTimeouts};
use crate::config::DataPlatformConfig;
use crate::error::{GatewayError, ProviderError, ProviderResult, Result};
use crate::store::SecretMaterial;

const OPERATIONS: &[OperationKind] = &[OperationKind::ConnectivityTest, OperationKind::DataQuery];

/// 允许的附加字段
pub const AUXILIARY_KEYS: [&str; 3] = ["host", "workspace_id", "warehouse_id"];

const ORG_ID_HEADER: &str = "X-Databricks-Org-Id";

#[derive(Debug, Deserialize)]
struct DataQuery {
    statement: String,
    #[serde(default)]
    warehouse_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    warehouse_id: &'a str,
    wait_timeout: String,
    on_wait_timeout: &'static str,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    statement_id: String,
    status: StatementStatus,
    #[serde(default)]
    manifest: Option<Manifest>,
    #[serde(default)]
    result: Option<ResultData>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    #[serde(default)]
    error: Option<StatementError>,
}

#[derive(Debug, Deserialize)]
struct StatementError {
    #[serde(default)]
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    schema: Option<Schema>,
}

#[derive(Debug, Deserialize)]
struct Schema {
    #[serde(default)]
    columns: Vec<Column>,
}

#[derive(Debug, Deserialize)]
struct Column {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ResultData {
    #[serde(default)]
    data_array: Vec<Value>,
}

/// 数据平台适配器
#[derive(Debug, Clone)]
pub struct DataPlatformProvider {
    client: Client,
    statement_wait_seconds: u64,
    timeouts: ProviderTimeouts,
}

impl DataPlatformProvider {
    pub fn new(config: &DataPlatformConfig) -> Result<Self> {
        let timeouts = ProviderTimeouts {
            probe: Duration::from_millis(config.probe_timeout_ms),
            invoke: Duration::from_millis(config.invoke_timeout_ms),
        };
        Ok(Self {
            client: http::build_client(timeouts.probe)?,
            statement_wait_seconds: config.statement_wait_seconds,
            timeouts,
        })
    }

    /// 规范化 host：补全协议、去掉路径尾部斜杠
    pub fn normalize_host(raw: &str) -> std::result::Result<String, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err("host cannot be empty".to_string());
        }
        let candidate = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };

        let url = Url::parse(&candidate).map_err(|e| format!("host is not a valid URL: {e}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("unsupported host scheme '{}'", url.scheme()));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err("host must name a server".to_string());
        }
        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    fn base_url(auxiliary: &Auxiliary) -> ProviderResult<String> {
        let host = auxiliary
            .get("host")
            .ok_or_else(|| ProviderError::InvalidRequest("auxiliary 'host' is required".into()))?;
        Self::normalize_host(host).map_err(ProviderError::InvalidRequest)
    }

    fn authorized(
        request: RequestBuilder,
        material: &SecretMaterial,
        auxiliary: &Auxiliary,
    ) -> RequestBuilder {
        let request = request.bearer_auth(material.expose());
        match auxiliary.get("workspace_id").map(|id| id.trim()) {
            Some(id) if !id.is_empty() => request.header(ORG_ID_HEADER, id),
            _ => request,
        }
    }

    async fn data_query(
        &self,
        material: &SecretMaterial,
        auxiliary: &Auxiliary,
        payload: &Value,
    ) -> ProviderResult<Value> {
        let query: DataQuery = serde_json::from_value(payload.clone()).map_err(|_| {
            ProviderError::InvalidRequest(
                "data-query payload requires 'statement' and optional 'warehouse_id'".into(),
            )
        })?;
        let statement = query.statement.trim();
        if statement.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "data-query 'statement' cannot be empty".into(),
            ));
        }
        let warehouse_id = query
            .warehouse_id
            .as_deref()
            .or_else(|| auxiliary.get("warehouse_id").map(String::as_str))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ProviderError::InvalidRequest(
                    "a 'warehouse_id' is required in the payload or the credential".into(),
                )
            })?;

        let base = Self::base_url(auxiliary)?;
        let body = StatementRequest {
            statement,
            warehouse_id,
            wait_timeout: format!("{}s", self.statement_wait_seconds),
            on_wait_timeout: "CANCEL",
        };
        let request = Self::authorized(
            self.client
                .post(format!("{base}/api/2.0/sql/statements"))
                .timeout(self.timeouts.invoke)
                .json(&body),
            material,
            auxiliary,
        );

        let secret = material.expose();
        let response = http::send(request, secret).await?;
        let statement: StatementResponse = http::read_json(response, secret).await?;

        if statement.status.state.eq_ignore_ascii_case("FAILED") {
            let code = statement
                .status
                .error
                .and_then(|e| e.error_code)
                .unwrap_or_else(|| "UNKNOWN".to_string());
            return Err(ProviderError::InvalidRequest(format!(
                "statement failed with error code {code}"
            )));
        }

        let columns: Vec<String> = statement
            .manifest
            .and_then(|m| m.schema)
            .map(|s| s.columns.into_iter().map(|c| c.name).collect())
            .unwrap_or_default();
        let rows = statement.result.map(|r| r.data_array).unwrap_or_default();

        Ok(json!({
            "statement_id": statement.statement_id,
            "state": statement.status.state,
            "columns": columns,
            "rows": rows,
        }))
    }
}

#[async_trait]
impl ProviderAdapter for DataPlatformProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DataPlatform
    }

    fn supported_operations(&self) -> &'static [OperationKind] {
        OPERATIONS
    }

    fn timeouts(&self) -> ProviderTimeouts {
        self.timeouts
    }

    fn validate_auxiliary(&self, auxiliary: &Auxiliary) -> Result<()> {
        if let Some(key) = auxiliary.keys().find(|k| !AUXILIARY_KEYS.contains(&k.as_str())) {
            return Err(GatewayError::validation_field(
                format!("unknown auxiliary field '{key}'"),
                format!("auxiliary.{key}"),
            ));
        }

        let host = auxiliary
            .get("host")
            .ok_or_else(|| GatewayError::validation_field("host is required", "auxiliary.host"))?;
        Self::normalize_host(host)
            .map(drop)
            .map_err(|message| GatewayError::validation_field(message, "auxiliary.host"))
    }

    async fn validate(
        &self,
        material: &SecretMaterial,
        auxiliary: &Auxiliary,
    ) -> ProviderResult<ProbeResult> {
        let base = Self::base_url(auxiliary)?;
        let request = Self::authorized(
            self.client
                .get(format!("{base}/api/2.0/clusters/list"))
                .timeout(self.timeouts.probe),
            material,
            auxiliary,
        );

        match http::send(request, material.expose()).await {
            Ok(_) => Ok(ProbeResult::accepted("credential accepted by provider")),
            Err(ProviderError::AuthRejected { status }) => Ok(ProbeResult::rejected(format!(
                "credential rejected by provider (status {status})"
            ))),
            Err(err) => Err(err),
        }
    }

    async fn invoke(
        &self,
        operation: OperationKind,
        material: &SecretMaterial,
        auxiliary: &Auxiliary,
        payload: &Value,
    ) -> ProviderResult<Value> {
        match operation {
            OperationKind::DataQuery => self.data_query(material, auxiliary, payload).await,
            other => Err(ProviderError::UnsupportedOperation(format!(
                "'{other}' is not supported by provider '{}'",
                self.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn provider() -> DataPlatformProvider {
        DataPlatformProvider::new(&DataPlatformConfig::default()).unwrap()
    }

    fn aux(pairs: &[(&str, &str)]) -> Auxiliary {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[rstest]
    #[case("adb-123.azuredatabricks.net", "https://adb-123.azuredatabricks.net")]
    #[case("https://adb-123.azuredatabricks.net/", "https://adb-123.azuredatabricks.net")]
    #[case("http://127.0.0.1:8080", "http://127.0.0.1:8080")]
    fn host_is_normalized(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(DataPlatformProvider::normalize_host(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("ftp://files.example.com")]
    #[case("https://")]
    fn bad_hosts_are_rejected(#[case] raw: &str) {
        assert!(DataPlatformProvider::normalize_host(raw).is_err());
    }

    #[test]
    fn host_is_required() {
        let err = provider()
            .validate_auxiliary(&aux(&[("workspace_id", "1")]))
            .unwrap_err();
        assert_eq!(err.field(), Some("auxiliary.host"));
    }

    #[test]
    fn unknown_auxiliary_keys_are_rejected() {
        let err = provider()
            .validate_auxiliary(&aux(&[("host", "h.example.com"), ("token", "x")]))
            .unwrap_err();
        assert_eq!(err.field(), Some("auxiliary.token"));
    }

    #[test]
    fn full_auxiliary_is_accepted() {
        assert!(
            provider()
                .validate_auxiliary(&aux(&[
                    ("host", "h.example.com"),
                    ("workspace_id", "42"),
                    ("warehouse_id", "wh-1"),
                ]))
                .is_ok()
        );
    }

    #[test]
    fn data_platform_does_not_chat() {
        let provider = provider();
        assert!(provider.supports(OperationKind::DataQuery));
        assert!(!provider.supports(OperationKind::Chat));
    }
}
