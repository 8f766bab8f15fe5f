use std::env;

use crate::error::{QuestFlowError, Result};

pub const DEBUG_VAR: &str = "QUESTFLOW_DEBUG";

/// 环境变量配置管理
pub struct EnvConfig;

impl EnvConfig {
    /// 解析配置值
    ///
    /// `${VAR}` 形式从环境变量读取，其余原样返回。
    pub fn resolve(value: &str) -> Result<String> {
        match value
            .strip_prefix("${")
            .and_then(|rest| rest.strip_suffix('}'))
        {
            Some(name) => Self::get_env(name),
            None => Ok(value.to_string()),
        }
    }

    /// 获取 API Key
    ///
    /// 未配置时回退到 `default_env_var`。
    pub fn get_api_key(api_key: Option<&str>, default_env_var: &str) -> Result<String> {
        match api_key.map(str::trim).filter(|key| !key.is_empty()) {
            Some(key) => Self::resolve(key),
            None => Self::get_env(default_env_var),
        }
    }

    pub fn get_env(key: &str) -> Result<String> {
        env::var(key).map_err(|_| {
            QuestFlowError::Config(format!("environment variable `{key}` is not set"))
        })
    }

    pub fn get_env_optional(key: &str) -> Option<String> {
        env::var(key).ok().filter(|value| !value.is_empty())
    }

    pub fn is_debug_mode() -> bool {
        env::var(DEBUG_VAR).is_ok()
    }

    pub fn log_level() -> Option<String> {
        Self::get_env_optional("RUST_LOG")
    }
}
