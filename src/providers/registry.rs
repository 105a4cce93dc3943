use std::collections::HashMap;
use std::sync::Arc;

use super::ai_research::AiResearchProvider;
use super::data_platform::DataPlatformProvider;
use super::traits::ProviderAdapter;
use super::types::ProviderKind;
use crate::config::ProvidersConfig;
use crate::error::{GatewayError, Result};

/// 服务商类型到适配器的映射
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用配置注册内置适配器
    pub fn from_config(config: &ProvidersConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(AiResearchProvider::new(&config.ai_research)?));
        registry.register(Arc::new(DataPlatformProvider::new(&config.data_platform)?));
        Ok(registry)
    }

    /// 注册适配器，同类型的旧适配器会被替换
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&kind).cloned().ok_or_else(|| {
            GatewayError::internal(format!("no adapter registered for provider '{kind}'"))
        })
    }

    /// 已注册的服务商，按固定顺序
    #[must_use]
    pub fn kinds(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.adapters.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProvidersConfig;
    use crate::providers::OperationKind;

    #[test]
    fn built_in_providers_resolve() {
        let registry = ProviderRegistry::from_config(&ProvidersConfig::default()).unwrap();

        let ai = registry.get(ProviderKind::AiResearch).unwrap();
        assert_eq!(ai.kind(), ProviderKind::AiResearch);
        assert!(ai.supports(OperationKind::Chat));

        let data = registry.get(ProviderKind::DataPlatform).unwrap();
        assert_eq!(data.kind(), ProviderKind::DataPlatform);
        assert!(data.supports(OperationKind::DataQuery));

        assert_eq!(registry.kinds(), ProviderKind::ALL.to_vec());
    }

    #[test]
    fn empty_registry_reports_internal_error() {
        let err = ProviderRegistry::new()
            .get(ProviderKind::AiResearch)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Internal);
    }
}
