use serde_json::{json, Map, Value};

use crate::error::{QuestFlowError, Result};
use crate::schema::{self, Schema};
use crate::tools::ToolRegistry;

pub const RESPOND_ACTION: &str = "respond";

/// 模型可选的一个分支
#[derive(Clone, Debug, PartialEq)]
pub enum DecisionVariant {
    Respond,
    Tool { name: String, parameters: Schema },
}

impl DecisionVariant {
    pub fn action(&self) -> &str {
        match self {
            DecisionVariant::Respond => RESPOND_ACTION,
            DecisionVariant::Tool { name, .. } => name,
        }
    }

    fn to_json_schema(&self) -> Value {
        let (payload_key, payload_schema) = match self {
            DecisionVariant::Respond => ("reply", json!({ "type": "string" })),
            DecisionVariant::Tool { parameters, .. } => ("params", parameters.to_json_schema()),
        };
        let mut properties = Map::new();
        properties.insert("action".into(), json!({ "const": self.action() }));
        properties.insert(payload_key.into(), payload_schema);
        json!({
            "type": "object",
            "properties": properties,
            "required": ["action", payload_key],
            "additionalProperties": false,
        })
    }
}

/// 解析后的模型决策
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    Respond { reply: String },
    Invoke { tool: String, params: Value },
}

/// `respond` 加上每个已注册工具各一个分支的标签联合
///
/// 由 Agent 的注册表一次性构建，之后分支集合不再变化
#[derive(Clone, Debug, PartialEq)]
pub struct DecisionSchema {
    variants: Vec<DecisionVariant>,
}

impl DecisionSchema {
    pub fn from_registry(registry: &ToolRegistry) -> Self {
        let mut variants = vec![DecisionVariant::Respond];
        variants.extend(registry.manifests().map(|manifest| DecisionVariant::Tool {
            name: manifest.name.clone(),
            parameters: manifest.parameters.clone(),
        }));
        Self { variants }
    }

    pub fn variants(&self) -> &[DecisionVariant] {
        &self.variants
    }

    pub fn actions(&self) -> Vec<&str> {
        self.variants.iter().map(DecisionVariant::action).collect()
    }

    pub fn to_json_schema(&self) -> Value {
        let one_of: Vec<Value> = self
            .variants
            .iter()
            .map(DecisionVariant::to_json_schema)
            .collect();
        json!({ "oneOf": one_of })
    }

    fn variant(&self, action: &str) -> Option<&DecisionVariant> {
        self.variants.iter().find(|v| v.action() == action)
    }

    /// 解析并校验模型原始输出
    ///
    /// 未注册的 action 原样返回，由调用方报告查找失败；
    /// 已知工具的参数必须符合其 schema
    pub fn parse(&self, raw: &str) -> Result<Decision> {
        let value: Value = serde_json::from_str(strip_code_fence(raw))
            .map_err(|e| QuestFlowError::MalformedDecision(format!("not JSON: {e}")))?;
        let object = value
            .as_object()
            .ok_or_else(|| QuestFlowError::MalformedDecision("expected an object".into()))?;
        let action = object
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| QuestFlowError::MalformedDecision("missing `action`".into()))?;

        match self.variant(action) {
            Some(DecisionVariant::Respond) => {
                let reply = object
                    .get("reply")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        QuestFlowError::MalformedDecision("`respond` without `reply`".into())
                    })?;
                Ok(Decision::Respond {
                    reply: reply.to_string(),
                })
            }
            Some(DecisionVariant::Tool { name, parameters }) => {
                let params = object.get("params").cloned().unwrap_or_else(|| json!({}));
                schema::validate(parameters, &params).map_err(|e| {
                    QuestFlowError::InvalidParameters {
                        tool: name.clone(),
                        message: e.to_string(),
                    }
                })?;
                Ok(Decision::Invoke {
                    tool: name.clone(),
                    params,
                })
            }
            None => Ok(Decision::Invoke {
                tool: action.to_string(),
                params: object.get("params").cloned().unwrap_or(Value::Null),
            }),
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().trim_end_matches("```").trim()
}
