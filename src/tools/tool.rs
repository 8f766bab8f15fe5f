use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

use super::manifest::ToolManifest;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub params: Value,
    pub call_id: String,
}

impl ToolInvocation {
    pub fn new<T: Into<String>>(name: T, params: Value) -> Self {
        Self {
            name: name.into(),
            params,
            call_id: crate::agent::message::uuid().replacen("msg", "call", 1),
        }
    }
}

/// Agent 可调用的具名能力，用来代替直接回答
///
/// `call` 执行前参数按 `manifest().parameters` 校验；
/// 文本结果应以 `Value::String` 返回
#[async_trait]
pub trait Tool: Send + Sync {
    fn manifest(&self) -> &ToolManifest;

    fn name(&self) -> &str {
        &self.manifest().name
    }

    async fn call(&self, invocation: ToolInvocation) -> Result<Value>;
}

pub type ToolHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// 由闭包实现的工具
pub struct FnTool {
    manifest: ToolManifest,
    handler: ToolHandler,
}

impl FnTool {
    pub fn new<F, Fut>(manifest: ToolManifest, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            manifest,
            handler: Arc::new(move |params| Box::pin(handler(params))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn manifest(&self) -> &ToolManifest {
        &self.manifest
    }

    async fn call(&self, invocation: ToolInvocation) -> Result<Value> {
        (self.handler)(invocation.params).await
    }
}
