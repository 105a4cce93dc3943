//! # Credential Gateway
//!
//! 会话作用域的凭证代理：浏览器会话把各服务商的 API 密钥交给网关保管，
//! 之后所有出站调用都由网关代为发起。密钥只以密封形式保存在内存中，
//! 不会出现在任何响应或日志里。

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod providers;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{ErrorKind, GatewayError, Result};
pub use gateway::Gateway;
pub use providers::{OperationKind, ProviderKind};
pub use session::SessionId;
pub use store::{CredentialStore, SecretMaterial};
