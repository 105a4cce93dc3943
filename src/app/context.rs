//! 应用上下文（DI 容器）
//!
//! 统一持有跨模块共享的服务实例，便于在测试中注入替身实现。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::gateway::Gateway;
use crate::providers::ProviderRegistry;
use crate::session::{Clock, SessionIdentity, SystemClock};
use crate::store::CredentialStore;

#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<CredentialStore>,
    pub gateway: Arc<Gateway>,
    pub sessions: SessionIdentity,
}

impl AppContext {
    pub fn new(config: Arc<AppConfig>, store: Arc<CredentialStore>, gateway: Arc<Gateway>) -> Self {
        let sessions = SessionIdentity::new(Arc::clone(&store));
        Self {
            config,
            store,
            gateway,
            sessions,
        }
    }

    /// 使用系统时钟和内置适配器构建
    pub fn from_config(config: AppConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// 使用指定时钟构建
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let registry = Arc::new(ProviderRegistry::from_config(&config.providers)?);
        Self::with_registry(config, clock, registry)
    }

    /// 使用指定时钟和适配器注册表构建
    pub fn with_registry(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        registry: Arc<ProviderRegistry>,
    ) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(CredentialStore::from_config(&config, clock)?);
        let gateway = Arc::new(Gateway::new(Arc::clone(&store), registry));
        Ok(Self::new(Arc::new(config), store, gateway))
    }
}
