//! # 网关
//!
//! 所有出站调用的唯一入口：解析存储的凭证、调用对应的适配器，
//! 把结果翻译成统一的错误分类。调用方永远接触不到明文密钥。
//!
//! 凭证状态机：
//! - `UNVALIDATED` --探测成功--> `VALID`
//! - `UNVALIDATED`/`VALID` --服务商拒绝凭证--> `INVALID`
//! - 超时、不可达、限流不改变状态
//! - 重新写入 --> `UNVALIDATED`

mod task;
pub mod validator;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ErrorTranslator, GatewayError, Result};
use crate::providers::{Auxiliary, OperationKind, ProviderKind, ProviderRegistry};
use crate::session::SessionId;
use crate::store::{CredentialRecord, CredentialStatus, CredentialStore, SecretMaterial};

pub use validator::ConnectivityValidator;

/// 凭证状态视图，不含任何密钥信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStatusView {
    pub provider: ProviderKind,
    pub has_key: bool,
    pub valid: bool,
    pub status: Option<CredentialStatus>,
    pub validated_at: Option<DateTime<Utc>>,
    pub stored_at: Option<DateTime<Utc>>,
}

impl CredentialStatusView {
    fn from_record(provider: ProviderKind, record: Option<&CredentialRecord>) -> Self {
        Self {
            provider,
            has_key: record.is_some(),
            valid: record.is_some_and(|r| r.status() == CredentialStatus::Valid),
            status: record.map(CredentialRecord::status),
            validated_at: record.and_then(CredentialRecord::validated_at),
            stored_at: record.map(CredentialRecord::stored_at),
        }
    }
}

/// 凭证测试结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    pub provider: ProviderKind,
    pub valid: bool,
    pub detail: String,
    /// 结论是否写回了存储的记录
    pub persisted: bool,
}

/// 单个操作的可用性
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationAvailability {
    pub operation: OperationKind,
    pub available: bool,
}

/// 单个服务商的能力
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCapabilities {
    pub provider: ProviderKind,
    pub display_name: &'static str,
    pub has_key: bool,
    pub status: Option<CredentialStatus>,
    pub operations: Vec<OperationAvailability>,
}

/// 会话的能力报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityReport {
    pub ai_enabled: bool,
    pub providers: Vec<ProviderCapabilities>,
}

/// 网关
#[derive(Debug, Clone)]
pub struct Gateway {
    store: Arc<CredentialStore>,
    registry: Arc<ProviderRegistry>,
    validator: ConnectivityValidator,
}

impl Gateway {
    #[must_use]
    pub fn new(store: Arc<CredentialStore>, registry: Arc<ProviderRegistry>) -> Self {
        let validator = ConnectivityValidator::new(Arc::clone(&registry));
        Self {
            store,
            registry,
            validator,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// 写入凭证（不做连通性验证），新记录状态为 `UNVALIDATED`
    pub fn set_credential(
        &self,
        session: &SessionId,
        provider: ProviderKind,
        material: SecretMaterial,
        auxiliary: Auxiliary,
    ) -> Result<CredentialStatusView> {
        if material.is_empty() {
            return Err(GatewayError::validation_field(
                "secret material cannot be empty",
                "secret",
            ));
        }
        self.registry.get(provider)?.validate_auxiliary(&auxiliary)?;

        let record = self.store.set(session, provider, &material, auxiliary)?;
        tracing::info!(
            session = %session.short(),
            provider = %provider,
            version = record.version(),
            "credential set"
        );
        Ok(CredentialStatusView::from_record(provider, Some(&record)))
    }

    /// 测试凭证
    ///
    /// 未提供密钥时测试已存储的密钥；未提供附加字段时沿用存储记录的附加字段。
    /// 只有被测材料与存储记录一致（指纹和附加字段都相同）时，结论才会写回记录。
    pub async fn test_credential(
        &self,
        session: &SessionId,
        provider: ProviderKind,
        material: Option<SecretMaterial>,
        auxiliary: Option<Auxiliary>,
    ) -> Result<TestOutcome> {
        let stored = self.store.get(session, provider);

        let material = match material {
            Some(material) => material,
            None => {
                let record = stored
                    .as_deref()
                    .ok_or(GatewayError::CredentialMissing { provider })?;
                self.store.open(record)?
            }
        };
        let auxiliary = auxiliary
            .or_else(|| stored.as_ref().map(|r| r.auxiliary().clone()))
            .unwrap_or_default();
        let fingerprint = material.fingerprint();

        let probe = self
            .validator
            .probe(provider, material, auxiliary.clone())
            .await?;

        let persisted = match stored {
            Some(record)
                if record.matches_material(&fingerprint) && record.auxiliary() == &auxiliary =>
            {
                if probe.valid {
                    self.store.mark_valid(session, provider, record.version())
                } else {
                    self.store.mark_invalid(session, provider, record.version())
                }
            }
            _ => false,
        };

        tracing::info!(
            session = %session.short(),
            provider = %provider,
            valid = probe.valid,
            persisted,
            "credential tested"
        );
        Ok(TestOutcome {
            provider,
            valid: probe.valid,
            detail: probe.detail,
            persisted,
        })
    }

    /// 查询凭证状态
    #[must_use]
    pub fn status(&self, session: &SessionId, provider: ProviderKind) -> CredentialStatusView {
        let record = self.store.get(session, provider);
        CredentialStatusView::from_record(provider, record.as_deref())
    }

    /// 删除凭证，幂等
    pub fn remove_credential(&self, session: &SessionId, provider: ProviderKind) -> bool {
        let removed = self.store.remove(session, provider);
        tracing::info!(session = %session.short(), provider = %provider, removed, "credential removed");
        removed
    }

    /// 执行一次服务商操作
    pub async fn invoke(
        &self,
        session: &SessionId,
        provider: ProviderKind,
        operation: OperationKind,
        payload: Value,
    ) -> Result<Value> {
        if operation == OperationKind::ConnectivityTest {
            let outcome = self.test_credential(session, provider, None, None).await?;
            return serde_json::to_value(outcome)
                .map_err(|e| GatewayError::internal_with_source("failed to encode test outcome", e));
        }

        let adapter = self.registry.get(provider)?;
        if !adapter.supports(operation) {
            return Err(GatewayError::validation_field(
                format!("operation '{operation}' is not supported by provider '{provider}'"),
                "operation",
            ));
        }

        let record = self
            .store
            .get(session, provider)
            .ok_or(GatewayError::CredentialMissing { provider })?;
        if record.status() == CredentialStatus::Invalid {
            return Err(GatewayError::CredentialInvalid {
                provider,
                message: "stored credential was rejected by the provider; set a new one".into(),
            });
        }

        let material = self.store.open(&record)?;
        let auxiliary = record.auxiliary().clone();
        let budget = adapter.timeouts().invoke;
        let started = std::time::Instant::now();

        let outcome = task::run_bounded(budget, async move {
            adapter
                .invoke(operation, &material, &auxiliary, &payload)
                .await
        })
        .await?;

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match outcome {
            Ok(value) => {
                if record.status() == CredentialStatus::Unvalidated {
                    self.store.mark_valid(session, provider, record.version());
                }
                tracing::info!(
                    session = %session.short(),
                    provider = %provider,
                    operation = %operation,
                    elapsed_ms,
                    "provider call succeeded"
                );
                Ok(value)
            }
            Err(err) if err.is_auth_rejection() => {
                let marked = self.store.mark_invalid(session, provider, record.version());
                tracing::warn!(
                    session = %session.short(),
                    provider = %provider,
                    operation = %operation,
                    marked,
                    "provider rejected stored credential"
                );
                Err(GatewayError::CredentialInvalid {
                    provider,
                    message: "provider rejected the stored credential".into(),
                })
            }
            Err(err) => {
                let err = ErrorTranslator::translate(provider, err, budget);
                tracing::warn!(
                    session = %session.short(),
                    provider = %provider,
                    operation = %operation,
                    kind = %err.kind(),
                    elapsed_ms,
                    "provider call failed"
                );
                Err(err)
            }
        }
    }

    /// 会话可用能力
    #[must_use]
    pub fn capabilities(&self, session: &SessionId) -> CapabilityReport {
        let providers: Vec<ProviderCapabilities> = self
            .registry
            .kinds()
            .into_iter()
            .filter_map(|provider| {
                let adapter = self.registry.get(provider).ok()?;
                let record = self.store.get(session, provider);
                let status = record.as_ref().map(|r| r.status());
                let usable = status.is_some_and(|s| s != CredentialStatus::Invalid);
                Some(ProviderCapabilities {
                    provider,
                    display_name: provider.display_name(),
                    has_key: record.is_some(),
                    status,
                    operations: adapter
                        .supported_operations()
                        .iter()
                        .map(|&operation| OperationAvailability {
                            operation,
                            available: usable,
                        })
                        .collect(),
                })
            })
            .collect();

        let ai_enabled = providers.iter().any(|p| {
            p.provider == ProviderKind::AiResearch
                && p.has_key
                && p.status != Some(CredentialStatus::Invalid)
        });

        CapabilityReport {
            ai_enabled,
            providers,
        }
    }

    /// 结束会话（登出），返回删除的凭证数
    pub fn end_session(&self, session: &SessionId) -> usize {
        let removed = self.store.remove_session(session);
        tracing::info!(session = %session.short(), removed, "session ended");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProvidersConfig;
    use crate::error::ErrorKind;
    use crate::session::ManualClock;
    use crate::store::{SecretSealer, StoreSettings};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn gateway() -> Gateway {
        let store = CredentialStore::new(
            StoreSettings {
                ttl: chrono::Duration::hours(4),
                max_records: 16,
            },
            SecretSealer::ephemeral(),
            Arc::new(ManualClock::default()),
        );
        let registry = ProviderRegistry::from_config(&ProvidersConfig::default()).unwrap();
        Gateway::new(Arc::new(store), Arc::new(registry))
    }

    fn sid(raw: &str) -> SessionId {
        SessionId::parse(raw).unwrap()
    }

    #[test]
    fn set_then_status_reports_unvalidated() {
        let gateway = gateway();
        let session = sid("s1");
        gateway
            .set_credential(&session, ProviderKind::AiResearch, "sk-1".into(), Auxiliary::new())
            .unwrap();

        let status = gateway.status(&session, ProviderKind::AiResearch);
        assert!(status.has_key);
        assert!(!status.valid);
        assert_eq!(status.status, Some(CredentialStatus::Unvalidated));
        assert!(status.stored_at.is_some());
        assert_eq!(status.validated_at, None);
    }

    #[test]
    fn empty_material_is_rejected() {
        let gateway = gateway();
        let err = gateway
            .set_credential(&sid("s1"), ProviderKind::AiResearch, "  ".into(), Auxiliary::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(err.field(), Some("secret"));
        assert!(!gateway.status(&sid("s1"), ProviderKind::AiResearch).has_key);
    }

    #[test]
    fn data_platform_requires_host() {
        let gateway = gateway();
        let err = gateway
            .set_credential(&sid("s1"), ProviderKind::DataPlatform, "dapi".into(), Auxiliary::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(err.field(), Some("auxiliary.host"));
    }

    #[tokio::test]
    async fn invoke_without_credential_is_missing() {
        let gateway = gateway();
        let err = gateway
            .invoke(&sid("s1"), ProviderKind::DataPlatform, OperationKind::DataQuery, json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialMissing);
        assert_eq!(err.provider(), Some(ProviderKind::DataPlatform));
    }

    #[tokio::test]
    async fn unsupported_operation_is_validation_error() {
        let gateway = gateway();
        let err = gateway
            .invoke(&sid("s1"), ProviderKind::DataPlatform, OperationKind::Chat, json!("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(err.field(), Some("operation"));
    }

    #[tokio::test]
    async fn invalid_record_short_circuits_invoke() {
        let gateway = gateway();
        let session = sid("s1");
        let view = gateway
            .set_credential(&session, ProviderKind::AiResearch, "sk-1".into(), Auxiliary::new())
            .unwrap();
        assert!(view.has_key);
        let record = gateway.store().get(&session, ProviderKind::AiResearch).unwrap();
        gateway
            .store()
            .mark_invalid(&session, ProviderKind::AiResearch, record.version());

        let err = gateway
            .invoke(&session, ProviderKind::AiResearch, OperationKind::Chat, json!("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialInvalid);
    }

    #[test]
    fn capabilities_follow_credential_state() {
        let gateway = gateway();
        let session = sid("s1");

        let report = gateway.capabilities(&session);
        assert!(!report.ai_enabled);
        assert!(report.providers.iter().all(|p| !p.has_key));

        gateway
            .set_credential(&session, ProviderKind::AiResearch, "sk-1".into(), Auxiliary::new())
            .unwrap();
        let report = gateway.capabilities(&session);
        assert!(report.ai_enabled);
        let ai = &report.providers[0];
        assert_eq!(ai.provider, ProviderKind::AiResearch);
        assert!(ai.operations.iter().all(|o| o.available));
        let data = &report.providers[1];
        assert!(data.operations.iter().all(|o| !o.available));
    }

    #[test]
    fn end_session_removes_everything() {
        let gateway = gateway();
        let session = sid("s1");
        gateway
            .set_credential(&session, ProviderKind::AiResearch, "sk-1".into(), Auxiliary::new())
            .unwrap();
        assert_eq!(gateway.end_session(&session), 1);
        assert!(!gateway.status(&session, ProviderKind::AiResearch).has_key);
    }

    #[test]
    fn status_view_serializes_camel_case() {
        let view = gateway().status(&sid("s1"), ProviderKind::AiResearch);
        let json = serde_json::to_value(view).unwrap();
        assert_eq!(
            json,
            json!({
                "provider": "ai-research",
                "hasKey": false,
                "valid": false,
                "status": null,
                "validatedAt": null
            })
        );
    }
}
