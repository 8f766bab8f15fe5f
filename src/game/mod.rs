#[cfg(feature = "game-http")]
pub mod http;
pub mod patterns;
pub mod session;
pub mod tool;

#[cfg(feature = "game-http")]
pub use http::HttpGameClient;
pub use patterns::{extract_moves, extract_score, is_game_over, termination_reason, Progress};
pub use session::{DynGameClient, Exchange, GameSessionClient, SessionHandle, SessionStart};
pub use tool::SendCommandTool;
