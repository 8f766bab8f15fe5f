pub mod client;
pub mod echo;
pub mod http;
pub mod pricing;
pub mod retry;
pub mod types;
pub mod usage;

pub use client::{DynLlmClient, LlmClient};
pub use echo::LocalEchoClient;
pub use pricing::{default_prices, ModelPrice, PriceTable};
pub use retry::{RetryPolicy, RetryingClient};
pub use types::{LlmMessage, LlmRequest, LlmResponse, TokenUsage};
pub use usage::UsageLedger;

#[cfg(feature = "openai-client")]
pub use http::GenericHttpClient;
