//! 记忆层：LLM 消息与单次运行的 Scratchpad（不跨运行保存）

pub mod conversation;
pub mod scratchpad;

pub use conversation::{Message, Role};
pub use scratchpad::{Scratchpad, ScratchpadEntry, StepAction};
