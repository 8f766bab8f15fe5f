use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{instrument, warn};

use super::session::{GameSessionClient, SessionStart};

#[derive(Deserialize)]
struct StartResponse {
    session_id: String,
    #[serde(default)]
    output: String,
}

#[derive(Deserialize)]
struct CommandResponse {
    #[serde(default)]
    output: String,
}

/// 游戏会话 HTTP 客户端
///
/// `POST {base}/start` 与 `POST {base}/command`；失败时返回可读的错误文本。
#[derive(Clone)]
pub struct HttpGameClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGameClient {
    pub fn new(base_url: impl Into<String>) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| crate::error::QuestFlowError::Config(format!("game HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl GameSessionClient for HttpGameClient {
    #[instrument(skip(self))]
    async fn start(&self, game: &str) -> SessionStart {
        let response = match self
            .client
            .post(self.url("start"))
            .json(&json!({ "game": game }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "game start request failed");
                return SessionStart::failed(format!("Error starting game: {e}"));
            }
        };
        let status = response.status();
        if !status.is_success() {
            return SessionStart::failed(format!("Error starting game: HTTP {status}"));
        }
        match response.json::<StartResponse>().await {
            Ok(body) => SessionStart {
                session_id: body.session_id,
                text: body.output,
            },
            Err(e) => SessionStart::failed(format!("Error starting game: bad response: {e}")),
        }
    }

    #[instrument(skip(self))]
    async fn send_command(&self, session_id: &str, command: &str) -> String {
        let response = match self
            .client
            .post(self.url("command"))
            .json(&json!({ "session_id": session_id, "command": command }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "game command request failed");
                return format!("Error sending command: {e}");
            }
        };
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return "Error: game session expired or not found. Please start a new game.".into();
        }
        if !status.is_success() {
            return format!("Error sending command: HTTP {status}");
        }
        match response.json::<CommandResponse>().await {
            Ok(body) => body.output,
            Err(e) => format!("Error sending command: bad response: {e}"),
        }
    }
}
