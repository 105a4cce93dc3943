//! # 连通性探测
//!
//! 用候选凭证向服务商发起一次轻量请求，不读写凭证存储。

use std::sync::Arc;

use super::task::run_bounded;
use crate::error::{ErrorTranslator, GatewayError, Result};
use crate::providers::{Auxiliary, ProbeResult, ProviderKind, ProviderRegistry};
use crate::store::SecretMaterial;

/// 连通性探测器
#[derive(Debug, Clone)]
pub struct ConnectivityValidator {
    registry: Arc<ProviderRegistry>,
}

impl ConnectivityValidator {
    #[must_use]
    pub const fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// 探测凭证
    ///
    /// 明确的授权拒绝返回 `valid: false`；超时、不可达、限流以错误返回。
    pub async fn probe(
        &self,
        provider: ProviderKind,
        material: SecretMaterial,
        auxiliary: Auxiliary,
    ) -> Result<ProbeResult> {
        if material.is_empty() {
            return Err(GatewayError::validation_field(
                "secret material cannot be empty",
                "secret",
            ));
        }
        let adapter = self.registry.get(provider)?;
        adapter.validate_auxiliary(&auxiliary)?;

        let budget = adapter.timeouts().probe;
        let outcome = run_bounded(budget, async move {
            adapter.validate(&material, &auxiliary).await
        })
        .await?;

        match outcome {
            Ok(result) => {
                tracing::debug!(provider = %provider, valid = result.valid, "connectivity probe finished");
                Ok(result)
            }
            Err(err) => {
                let err = ErrorTranslator::translate(provider, err, budget);
                tracing::debug!(provider = %provider, kind = %err.kind(), "connectivity probe failed");
                Err(err)
            }
        }
    }
}
