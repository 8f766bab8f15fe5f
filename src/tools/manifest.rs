use serde::{Deserialize, Serialize};

use crate::schema::Schema;

/// 向模型描述工具：名称、用途与参数
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolManifest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parameters: Schema,
}

impl ToolManifest {
    pub fn builder(name: impl Into<String>) -> ToolManifestBuilder {
        ToolManifestBuilder::new(name)
    }
}

#[derive(Clone, Debug)]
pub struct ToolManifestBuilder {
    manifest: ToolManifest,
}

impl ToolManifestBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            manifest: ToolManifest {
                name: name.into(),
                description: String::new(),
                parameters: Schema::empty_object(),
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.manifest.description = description.into();
        self
    }

    pub fn parameters(mut self, schema: Schema) -> Self {
        self.manifest.parameters = schema;
        self
    }

    /// 添加必填字符串参数，schema 变为封闭对象
    pub fn string_param(self, name: &str, description: &str) -> Self {
        self.param(name, Schema::string().with_description(description))
    }

    pub fn param(mut self, name: &str, schema: Schema) -> Self {
        let mut properties: Vec<(String, Schema)> = match self.manifest.parameters.kind {
            crate::schema::SchemaKind::Object { properties, .. } => {
                properties.into_iter().collect()
            }
            _ => Vec::new(),
        };
        properties.push((name.to_string(), schema));
        self.manifest.parameters = Schema::object(properties);
        self
    }

    pub fn build(self) -> ToolManifest {
        self.manifest
    }
}
