//! HTTP 客户端实现模块
//!
//! `GenericHttpClient` 使用 OpenAI 兼容的 chat/completions 协议与模型服务通信。

#[cfg(feature = "openai-client")]
pub mod generic;

#[cfg(feature = "openai-client")]
pub use generic::GenericHttpClient;
