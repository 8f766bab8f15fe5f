use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

use crate::agent::MessageRole;
use crate::error::{QuestFlowError, Result};
use crate::llm::client::LlmClient;
use crate::llm::types::{LlmMessage, LlmRequest, LlmResponse, TokenUsage};

/// OpenAI 兼容协议的 HTTP 客户端
#[derive(Clone)]
pub struct GenericHttpClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    auth_header: Option<String>,
}

impl GenericHttpClient {
    /// 创建 HTTP 客户端
    ///
    /// - 连接池：复用连接
    /// - 超时设置：避免长时间等待
    fn create_client() -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| QuestFlowError::Other(anyhow!("failed to build HTTP client: {e}")))
    }

    pub fn new<S1, S2, S3>(endpoint: S1, api_key: S2, model: S3) -> Result<Self>
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Ok(Self {
            client: Self::create_client()?,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            auth_header: None,
        })
    }

    pub fn with_auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = Some(header.into());
        self
    }

    fn full_endpoint(&self) -> String {
        if self.endpoint.contains("/chat/completions") {
            self.endpoint.clone()
        } else {
            format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
        }
    }

    fn wire_message(message: &LlmMessage) -> Value {
        match message.role {
            MessageRole::Tool => json!({
                "role": "user",
                "content": format!(
                    "Result of tool `{}`:\n{}",
                    message.tool.as_deref().unwrap_or("unknown"),
                    message.content
                ),
            }),
            role => json!({ "role": role.as_str(), "content": message.content }),
        }
    }

    fn build_body(&self, request: &LlmRequest) -> Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.extend(request.messages.iter().map(Self::wire_message));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
        });
        if let Some(schema) = &request.response_schema {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": { "name": "decision", "schema": wire_schema(schema) },
            });
        }
        body
    }

    fn parse_usage(payload: &Value) -> TokenUsage {
        let usage = &payload["usage"];
        let prompt = usage["prompt_tokens"].as_u64().unwrap_or(0);
        let completion = usage["completion_tokens"].as_u64().unwrap_or(0);
        let total = usage["total_tokens"].as_u64().unwrap_or(prompt + completion);
        TokenUsage::new(prompt, completion, total)
    }
}

/// 结构化输出的根节点必须是 object，联合类型包进 `decision` 字段
fn needs_envelope(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) != Some("object")
}

fn wire_schema(schema: &Value) -> Value {
    if !needs_envelope(schema) {
        return schema.clone();
    }
    let mut union = schema.clone();
    if let Some(object) = union.as_object_mut() {
        if let Some(variants) = object.remove("oneOf") {
            object.insert("anyOf".into(), variants);
        }
    }
    json!({
        "type": "object",
        "properties": { "decision": union },
        "required": ["decision"],
        "additionalProperties": false,
    })
}

/// 去掉 `decision` 外层；不是信封时原样返回
fn open_envelope(content: String) -> String {
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(mut object)) if object.len() == 1 => match object.remove("decision") {
            Some(inner) => inner.to_string(),
            None => content,
        },
        _ => content,
    }
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...(truncated, {} bytes)", &text[..idx], text.len()),
        None => text.to_string(),
    }
}

#[async_trait]
impl LlmClient for GenericHttpClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let body = self.build_body(&request);
        let endpoint = self.full_endpoint();
        let auth_value = match &self.auth_header {
            Some(header) => format!("{} {}", header, self.api_key),
            None => format!("Bearer {}", self.api_key),
        };

        let response = self
            .client
            .post(&endpoint)
            .header("Authorization", auth_value)
            .json(&body)
            .send()
            .await
            .map_err(|e| QuestFlowError::Llm(format!("HTTP request error: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(QuestFlowError::RateLimited {
                retry_after: retry_after(response.headers()),
            });
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| QuestFlowError::Llm(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(QuestFlowError::Llm(format!(
                "request failed with status {status}: {}\nEndpoint: {endpoint}",
                truncate(&response_text, 500)
            )));
        }

        let payload: Value = serde_json::from_str(&response_text).map_err(|e| {
            QuestFlowError::Llm(format!(
                "response parse error: {e}\nResponse body: {}",
                truncate(&response_text, 500)
            ))
        })?;
        let mut content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| QuestFlowError::Llm("missing message content".to_string()))?
            .to_string();
        if request.response_schema.as_ref().is_some_and(needs_envelope) {
            content = open_envelope(content);
        }

        Ok(LlmResponse {
            content,
            usage: Self::parse_usage(&payload),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_results_are_sent_as_user_turns() {
        let message = LlmMessage {
            role: MessageRole::Tool,
            content: "a lamp".into(),
            tool: Some("inventory".into()),
        };
        let wire = GenericHttpClient::wire_message(&message);
        assert_eq!(wire["role"], "user");
        assert!(wire["content"].as_str().unwrap().contains("inventory"));
    }

    #[test]
    fn usage_defaults_total() {
        let payload = json!({"usage": {"prompt_tokens": 7, "completion_tokens": 3}});
        assert_eq!(GenericHttpClient::parse_usage(&payload), TokenUsage::new(7, 3, 10));
    }

    fn decision_request() -> LlmRequest {
        let mut registry = crate::tools::ToolRegistry::new();
        registry
            .register(std::sync::Arc::new(crate::tools::FnTool::new(
                crate::tools::ToolManifest::builder("map")
                    .string_param("room", "room name")
                    .build(),
                |_| async { Ok(Value::Null) },
            )))
            .unwrap();
        let schema = crate::agent::DecisionSchema::from_registry(&registry).to_json_schema();
        LlmRequest::new(None, Vec::new()).with_response_schema(schema)
    }

    #[test]
    fn decision_schema_is_sent_under_an_object_root() {
        let client = GenericHttpClient::new("http://localhost", "key", "gpt-4o").unwrap();
        let body = client.build_body(&decision_request());
        let schema = &body["response_format"]["json_schema"]["schema"];
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["decision"]));
        let variants = schema["properties"]["decision"]["anyOf"].as_array().unwrap();
        assert_eq!(variants.len(), 2);
        assert!(schema["properties"]["decision"].get("oneOf").is_none());
    }

    #[test]
    fn object_schemas_are_sent_unchanged() {
        let client = GenericHttpClient::new("http://localhost", "key", "gpt-4o").unwrap();
        let schema = json!({"type": "object", "properties": {}});
        let request = LlmRequest::new(None, Vec::new()).with_response_schema(schema.clone());
        assert_eq!(client.build_body(&request)["response_format"]["json_schema"]["schema"], schema);
    }

    #[test]
    fn envelope_is_opened_before_parsing() {
        let opened = open_envelope(r#"{"decision":{"action":"respond","reply":"north"}}"#.into());
        let value: Value = serde_json::from_str(&opened).unwrap();
        assert_eq!(value, json!({"action": "respond", "reply": "north"}));
        assert_eq!(open_envelope("north".into()), "north");
    }

    #[test]
    fn retry_after_ignores_unrepresentable_values() {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut parse = |raw: &'static str| {
            headers.insert(
                reqwest::header::RETRY_AFTER,
                reqwest::header::HeaderValue::from_static(raw),
            );
            retry_after(&headers)
        };
        assert_eq!(parse("1e30"), None);
        assert_eq!(parse("-3"), None);
        assert_eq!(parse("inf"), None);
        assert_eq!(parse("2.5"), Some(Duration::from_millis(2500)));
    }
}
