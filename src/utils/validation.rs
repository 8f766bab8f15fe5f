use crate::error::{QuestFlowError, Result};

fn invalid(message: impl Into<String>) -> QuestFlowError {
    QuestFlowError::Config(message.into())
}

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 验证 URL 格式
    pub fn validate_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(invalid("URL must not be empty"));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(invalid(format!("URL `{url}` must start with http:// or https://")));
        }
        Ok(())
    }

    /// 验证模型名称
    pub fn validate_model_name(model: &str) -> Result<()> {
        if model.trim().is_empty() {
            return Err(invalid("model name must not be empty"));
        }
        let lower = model.to_lowercase();
        if lower.contains("gpt") && !lower.contains("gpt-") {
            tracing::warn!(model = %model, "model name looks unusual; GPT models are usually named like `gpt-4o`");
        }
        Ok(())
    }

    /// 验证工作流名称
    ///
    /// 名称会出现在汇总表和 `--only` 参数中，只允许字母、数字、下划线和短横线。
    pub fn validate_workflow_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(invalid("workflow name must not be empty"));
        }
        if name.len() > 64 {
            return Err(invalid(format!("workflow name `{name}` is longer than 64 characters")));
        }
        if !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Err(invalid(format!(
                "workflow name `{name}` may only contain letters, digits, `_` and `-`"
            )));
        }
        Ok(())
    }

    /// 验证温度参数
    pub fn validate_temperature(temperature: f32) -> Result<()> {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(invalid(format!(
                "temperature must be between 0.0 and 2.0, got {temperature}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(ConfigValidator::validate_url("").is_err());
        assert!(ConfigValidator::validate_url("localhost:8000").is_err());
        assert!(ConfigValidator::validate_url("http://localhost:8000").is_ok());
        assert!(ConfigValidator::validate_url("https://games.example.com").is_ok());
    }

    #[test]
    fn test_validate_workflow_name() {
        assert!(ConfigValidator::validate_workflow_name("").is_err());
        assert!(ConfigValidator::validate_workflow_name("gpt4o-team_2").is_ok());
        assert!(ConfigValidator::validate_workflow_name("two words").is_err());
        assert!(ConfigValidator::validate_workflow_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_temperature() {
        assert!(ConfigValidator::validate_temperature(-0.1).is_err());
        assert!(ConfigValidator::validate_temperature(0.0).is_ok());
        assert!(ConfigValidator::validate_temperature(2.5).is_err());
    }
}
