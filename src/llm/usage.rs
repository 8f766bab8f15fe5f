use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::pricing::PriceTable;
use super::types::TokenUsage;

/// 按模型标识记录的 token 用量
///
/// 只累加，不会重置任何模型的累计值
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageLedger {
    models: BTreeMap<String, TokenUsage>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, model: &str, usage: TokenUsage) {
        *self.models.entry(model.to_string()).or_default() += usage;
    }

    pub fn merge(&mut self, other: &UsageLedger) {
        for (model, usage) in &other.models {
            self.record(model, *usage);
        }
    }

    pub fn get(&self, model: &str) -> Option<TokenUsage> {
        self.models.get(model).copied()
    }

    pub fn models(&self) -> impl Iterator<Item = (&str, &TokenUsage)> {
        self.models.iter().map(|(model, usage)| (model.as_str(), usage))
    }

    /// 所有模型的总和
    pub fn total(&self) -> TokenUsage {
        let mut total = TokenUsage::default();
        for usage in self.models.values() {
            total += *usage;
        }
        total
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn cost(&self, prices: &PriceTable) -> f64 {
        self.models
            .iter()
            .map(|(model, usage)| match prices.estimate(model, usage) {
                Some(cost) => cost,
                None => {
                    debug!(model = %model, "no price configured; counting as zero cost");
                    0.0
                }
            })
            .sum()
    }
}
