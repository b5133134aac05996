//! 核心层：错误分类、恢复提示、运行状态

pub mod error;
pub mod recovery;
pub mod state;

pub use error::{AgentError, ToolError};
pub use recovery::RecoveryEngine;
pub use state::{AbortReason, LoopState, RunOutcome, RunReport};
