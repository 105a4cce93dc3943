//! # AI 研究服务适配器
//!
//! OpenAI 兼容的对话接口（默认 DeepSeek）：
//! - 探测：`GET {base}/models`
//! - 对话与研究查询：`POST {base}/chat/completions`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::http;
use super::traits::ProviderAdapter;
use super::types::{Auxiliary, OperationKind, ProbeResult, ProviderKind, ProviderTimeouts};
use crate::config::AiResearchConfig;
use crate::error::{GatewayError, ProviderError, ProviderResult, Result};
use crate::store::SecretMaterial;

const OPERATIONS: &[OperationKind] = &[
    OperationKind::ConnectivityTest,
    OperationKind::Chat,
    OperationKind::ResearchQuery,
];

/// 聊天消息
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// 聊天完成请求
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// 研究查询负载
#[derive(Debug, Deserialize)]
struct ResearchQuery {
    question: String,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    indicators: Vec<String>,
}

/// AI 研究服务适配器
#[derive(Debug, Clone)]
pub struct AiResearchProvider {
    client: Client,
    base_url: String,
    model: String,
    system_prompt: String,
    max_tokens: u32,
    temperature: f32,
    timeouts: ProviderTimeouts,
}

impl AiResearchProvider {
    /// 根据配置创建适配器
    pub fn new(config: &AiResearchConfig) -> Result<Self> {
        let timeouts = ProviderTimeouts {
            probe: Duration::from_millis(config.probe_timeout_ms),
            invoke: Duration::from_millis(config.invoke_timeout_ms),
        };
        Ok(Self {
            client: http::build_client(timeouts.probe)?,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeouts,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `chat` 负载：`{"message": "..."}` 或字符串
    fn chat_message(payload: &Value) -> ProviderResult<String> {
        let message = match payload {
            Value::String(text) => Some(text.as_str()),
            Value::Object(map) => map.get("message").and_then(Value::as_str),
            _ => None,
        };
        message
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(ToString::to_string)
            .ok_or_else(|| {
                ProviderError::InvalidRequest("chat payload requires a non-empty 'message'".into())
            })
    }

    /// 把研究查询格式化为结构化提示词
    fn research_prompt(payload: &Value) -> ProviderResult<String> {
        let query: ResearchQuery = serde_json::from_value(payload.clone()).map_err(|_| {
            ProviderError::InvalidRequest(
                "research-query payload requires 'question' with optional 'context' and 'indicators'"
                    .into(),
            )
        })?;
        if query.question.trim().is_empty() {
            return Err(ProviderError::InvalidRequest(
                "research-query 'question' cannot be empty".into(),
            ));
        }

        let context = query
            .context
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("Not specified");
        let indicators = if query.indicators.is_empty() {
            "Not specified".to_string()
        } else {
            query.indicators.join(", ")
        };

        Ok(format!(
            "Economic Research Query: {}\n\
             Additional Context: {context}\n\
             Focus Indicators: {indicators}\n\n\
             Please provide a comprehensive analysis including:\n\
             1. Current status and recent trends\n\
             2. Relevant economic data and evidence\n\
             3. Policy implications and considerations\n\
             4. Risk factors and scenarios\n\
             5. Recommendations for further analysis",
            query.question.trim()
        ))
    }

    async fn complete(&self, material: &SecretMaterial, prompt: String) -> ProviderResult<Value> {
        let secret = material.expose();
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        };

        let response = http::send(
            self.client
                .post(self.endpoint("chat/completions"))
                .bearer_auth(secret)
                .timeout(self.timeouts.invoke)
                .json(&request),
            secret,
        )
        .await?;

        let completion: ChatCompletionResponse = http::read_json(response, secret).await?;
        let choice = completion.choices.into_iter().next().ok_or_else(|| {
            ProviderError::InvalidResponse("completion contained no choices".into())
        })?;

        Ok(json!({
            "response": choice.message.content,
            "model": completion.model.unwrap_or_else(|| self.model.clone()),
            "usage": completion.usage,
        }))
    }
}

#[async_trait]
impl ProviderAdapter for AiResearchProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AiResearch
    }

    fn supported_operations(&self) -> &'static [OperationKind] {
        OPERATIONS
    }

    fn timeouts(&self) -> ProviderTimeouts {
        self.timeouts
    }

    fn validate_auxiliary(&self, auxiliary: &Auxiliary) -> Result<()> {
        match auxiliary.keys().next() {
            Some(key) => Err(GatewayError::validation_field(
                format!("provider '{}' does not accept auxiliary field '{key}'", self.kind()),
                format!("auxiliary.{key}"),
            )),
            None => Ok(()),
        }
    }

    async fn validate(
        &self,
        material: &SecretMaterial,
        _auxiliary: &Auxiliary,
    ) -> ProviderResult<ProbeResult> {
        let secret = material.expose();
        let request = self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(secret)
            .timeout(self.timeouts.probe);

        match http::send(request, secret).await {
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
        _auxiliary: &Auxiliary,
        payload: &Value,
    ) -> ProviderResult<Value> {
        let prompt = match operation {
            OperationKind::Chat => Self::chat_message(payload)?,
            OperationKind::ResearchQuery => Self::research_prompt(payload)?,
            other => {
                return Err(ProviderError::UnsupportedOperation(format!(
                    "'{other}' is not supported by provider '{}'",
                    self.kind()
                )));
            }
        };
        self.complete(material, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_payload_accepts_object_or_string() {
        assert_eq!(
            AiResearchProvider::chat_message(&json!({"message": " hi "})).unwrap(),
            "hi"
        );
        assert_eq!(
            AiResearchProvider::chat_message(&json!("hello")).unwrap(),
            "hello"
        );
        assert!(AiResearchProvider::chat_message(&json!({"message": ""})).is_err());
        assert!(AiResearchProvider::chat_message(&json!(42)).is_err());
    }

    #[test]
    fn research_prompt_includes_fields() {
        let prompt = AiResearchProvider::research_prompt(&json!({
            "question": "What drives core inflation?",
            "indicators": ["CPI", "unemployment"]
        }))
        .unwrap();
        assert!(prompt.contains("Economic Research Query: What drives core inflation?"));
        assert!(prompt.contains("Additional Context: Not specified"));
        assert!(prompt.contains("Focus Indicators: CPI, unemployment"));
    }

    #[test]
    fn research_prompt_requires_question() {
        assert!(AiResearchProvider::research_prompt(&json!({"context": "x"})).is_err());
        assert!(AiResearchProvider::research_prompt(&json!({"question": "  "})).is_err());
    }

    #[test]
    fn auxiliary_must_be_empty() {
        let provider = AiResearchProvider::new(&AiResearchConfig::default()).unwrap();
        assert!(provider.validate_auxiliary(&Auxiliary::new()).is_ok());

        let mut auxiliary = Auxiliary::new();
        auxiliary.insert("host".into(), "x".into());
        let err = provider.validate_auxiliary(&auxiliary).unwrap_err();
        assert_eq!(err.field(), Some("auxiliary.host"));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = AiResearchConfig {
            base_url: "http://localhost:9000/v1/".into(),
            ..AiResearchConfig::default()
        };
        let provider = AiResearchProvider::new(&config).unwrap();
        assert_eq!(provider.endpoint("models"), "http://localhost:9000/v1/models");
    }
}
