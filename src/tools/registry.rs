use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{QuestFlowError, Result};

use super::manifest::ToolManifest;
use super::tool::Tool;

/// 单个 Agent 的工具，按注册顺序，名称唯一
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(QuestFlowError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Result<Self> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|idx| Arc::clone(&self.tools[*idx]))
    }

    pub fn manifests(&self) -> impl Iterator<Item = &ToolManifest> {
        self.tools.iter().map(|tool| tool.manifest())
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|tool| tool.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::FnTool;
    use serde_json::Value;

    fn noop(name: &str) -> Arc<dyn Tool> {
        Arc::new(FnTool::new(ToolManifest::builder(name).build(), |_| async {
            Ok(Value::Null)
        }))
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut registry = ToolRegistry::new();
        registry.register(noop("map")).unwrap();
        let err = registry.register(noop("map")).unwrap_err();
        assert!(matches!(err, QuestFlowError::DuplicateTool(name) if name == "map"));
    }

    #[test]
    fn keeps_registration_order() {
        let registry = ToolRegistry::new()
            .with_tool(noop("b"))
            .and_then(|r| r.with_tool(noop("a")))
            .unwrap();
        assert_eq!(registry.names(), vec!["b".to_string(), "a".to_string()]);
        assert!(registry.get("a").is_some());
        assert!(registry.get("c").is_none());
    }
}
