use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::TokenUsage;

/// 每百万 token 的美元价格
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ModelPrice {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPrice {
    pub fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PriceTable {
    prices: HashMap<String, ModelPrice>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, model: impl Into<String>, price: ModelPrice) -> Self {
        self.insert(model, price);
        self
    }

    pub fn insert(&mut self, model: impl Into<String>, price: ModelPrice) {
        self.prices.insert(model.into(), price);
    }

    /// `other` 中的条目覆盖已有条目
    pub fn extend(&mut self, other: PriceTable) {
        self.prices.extend(other.prices);
    }

    pub fn get(&self, model: &str) -> Option<ModelPrice> {
        self.prices.get(model).copied()
    }

    /// 未配置价格的模型返回 `None`
    pub fn estimate(&self, model: &str, usage: &TokenUsage) -> Option<f64> {
        let price = self.get(model)?;
        let input = (usage.prompt_tokens as f64 / 1_000_000.0) * price.input_per_million;
        let output = (usage.completion_tokens as f64 / 1_000_000.0) * price.output_per_million;
        Some(input + output)
    }
}

/// 常用聊天模型的内置价格表
pub fn default_prices() -> PriceTable {
    PriceTable::new()
        .with_price("gpt-4o", ModelPrice::new(2.50, 10.0))
        .with_price("gpt-4o-mini", ModelPrice::new(0.15, 0.60))
        .with_price("gpt-4.1", ModelPrice::new(2.0, 8.0))
        .with_price("gpt-4.1-mini", ModelPrice::new(0.40, 1.60))
        .with_price("claude-3-5-sonnet-20241022", ModelPrice::new(3.0, 15.0))
        .with_price("claude-3-5-haiku-20241022", ModelPrice::new(0.80, 4.0))
        .with_price("local-echo", ModelPrice::new(0.0, 0.0))
}
