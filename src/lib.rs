//! Ruth - 预订邮件处理 Agent
//!
//! 模块划分：
//! - **agent**: 无头 Agent 运行时（邮件 -> 任务 -> 主循环）
//! - **booking**: 航班时刻查询、预订记录与持久化
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、恢复提示、运行状态
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / 脚本化）
//! - **memory**: LLM 消息与单次运行的 Scratchpad
//! - **observability**: 日志初始化
//! - **react**: Reasoning Oracle、Planner、ReAct 主循环
//! - **tools**: 工具描述、注册表、执行器与领域工具

pub mod agent;
pub mod booking;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;

pub use agent::{create_agent_components, AgentComponents, Email};
pub use crate::core::{RunOutcome, RunReport};
