use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStart {
    /// 会话创建失败时为空
    pub session_id: String,
    pub text: String,
}

impl SessionStart {
    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            session_id: String::new(),
            text: text.into(),
        }
    }

    pub fn is_started(&self) -> bool {
        !self.session_id.is_empty()
    }
}

/// 外部文字冒险会话服务
///
/// 实现永不失败：传输问题以可读文本代替游戏输出返回
#[async_trait]
pub trait GameSessionClient: Send + Sync {
    async fn start(&self, game: &str) -> SessionStart;
    async fn send_command(&self, session_id: &str, command: &str) -> String;
}

pub type DynGameClient = Arc<dyn GameSessionClient>;

/// 一条命令及游戏的回应
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exchange {
    pub command: String,
    pub response: String,
}

/// 已开始的会话，绑定创建它的客户端
///
/// 克隆共享会话及未读交互日志，驱动游戏的一方
/// 能看到经任一克隆（例如工具）发出的命令
#[derive(Clone)]
pub struct SessionHandle {
    client: DynGameClient,
    session_id: String,
    exchanges: Arc<Mutex<Vec<Exchange>>>,
}

impl SessionHandle {
    pub fn new(client: DynGameClient, session_id: impl Into<String>) -> Self {
        Self {
            client,
            session_id: session_id.into(),
            exchanges: Arc::default(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn send(&self, command: &str) -> String {
        let response = self.client.send_command(&self.session_id, command).await;
        self.exchanges.lock().push(Exchange {
            command: command.to_string(),
            response: response.clone(),
        });
        response
    }

    /// 自上次调用以来的交互，最早的在前
    pub fn take_exchanges(&self) -> Vec<Exchange> {
        std::mem::take(&mut *self.exchanges.lock())
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl GameSessionClient for Echo {
        async fn start(&self, _game: &str) -> SessionStart {
            SessionStart::failed("unused")
        }

        async fn send_command(&self, _session_id: &str, command: &str) -> String {
            format!("> {command}")
        }
    }

    #[tokio::test]
    async fn clones_share_the_exchange_log() {
        let session = SessionHandle::new(Arc::new(Echo), "s");
        let tool_side = session.clone();
        tool_side.send("open door").await;
        let seen = session.take_exchanges();
        assert_eq!(
            seen,
            vec![Exchange {
                command: "open door".into(),
                response: "> open door".into()
            }]
        );
        assert!(session.take_exchanges().is_empty());
    }
}
