//! # 外部服务商适配器模块
//!
//! 每个服务商一个适配器，负责请求构造、认证头、附加字段校验以及
//! 把服务商原生错误归类为 `ProviderError`。

pub mod ai_research;
pub mod data_platform;
mod http;
pub mod registry;
pub mod traits;
pub mod types;

pub use ai_research::AiResearchProvider;
pub use data_platform::DataPlatformProvider;
pub use registry::ProviderRegistry;
pub use traits::ProviderAdapter;
pub use types::{Auxiliary, OperationKind, ProbeResult, ProviderKind, ProviderTimeouts};
