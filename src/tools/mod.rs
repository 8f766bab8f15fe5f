pub mod manifest;
pub mod memory;
pub mod registry;
pub mod tool;

pub use manifest::{ToolManifest, ToolManifestBuilder};
pub use memory::{RecallTool, RememberTool};
pub use registry::ToolRegistry;
pub use tool::{FnTool, Tool, ToolHandler, ToolInvocation};
