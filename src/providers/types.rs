//! # 服务商通用类型定义

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// 受支持的外部服务商
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// AI 研究/对话服务（OpenAI 兼容接口，默认 DeepSeek）
    AiResearch,
    /// 数据平台服务（Databricks 风格 REST 接口）
    DataPlatform,
}

impl ProviderKind {
    pub const ALL: [Self; 2] = [Self::AiResearch, Self::DataPlatform];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AiResearch => "ai-research",
            Self::DataPlatform => "data-platform",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::AiResearch => "AI Research",
            Self::DataPlatform => "Data Platform",
        }
    }

    /// 解析服务商名称，接受常见别名
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ai-research" | "ai_research" | "ai" | "deepseek" => Some(Self::AiResearch),
            "data-platform" | "data_platform" | "databricks" => Some(Self::DataPlatform),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            GatewayError::validation_field(format!("unknown provider '{s}'"), "provider")
        })
    }
}

/// 操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    ConnectivityTest,
    Chat,
    ResearchQuery,
    DataQuery,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectivityTest => "connectivity-test",
            Self::Chat => "chat",
            Self::ResearchQuery => "research-query",
            Self::DataQuery => "data-query",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 凭证附加字段（host、workspace_id 等）
pub type Auxiliary = BTreeMap<String, String>;

/// 连通性探测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub valid: bool,
    pub detail: String,
}

impl ProbeResult {
    pub fn accepted<T: Into<String>>(detail: T) -> Self {
        Self {
            valid: true,
            detail: detail.into(),
        }
    }

    pub fn rejected<T: Into<String>>(detail: T) -> Self {
        Self {
            valid: false,
            detail: detail.into(),
        }
    }
}

/// 单次调用的超时预算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderTimeouts {
    /// 连通性探测
    pub probe: Duration,
    /// 内容生成/查询
    pub invoke: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_provider_aliases() {
        assert_eq!(ProviderKind::parse("deepseek"), Some(ProviderKind::AiResearch));
        assert_eq!(ProviderKind::parse("AI_RESEARCH"), Some(ProviderKind::AiResearch));
        assert_eq!(ProviderKind::parse("databricks"), Some(ProviderKind::DataPlatform));
        assert_eq!(ProviderKind::parse("openai"), None);
    }

    #[test]
    fn provider_kind_round_trips_through_serde_names() {
        for kind in ProviderKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn operation_names_are_kebab_case() {
        let op: OperationKind = serde_json::from_str("\"research-query\"").unwrap();
        assert_eq!(op, OperationKind::ResearchQuery);
        assert_eq!(OperationKind::DataQuery.to_string(), "data-query");
    }
}
