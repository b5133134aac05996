//! 认知层：Reasoning Oracle 边界、基于 LLM 的 Planner、ReAct 主循环

pub mod events;
pub mod loop_;
pub mod oracle;
pub mod planner;

pub use events::ReactEvent;
pub use loop_::{
    react_loop, ReactSession, DEFAULT_FALLBACK_MESSAGE, DEFAULT_MAX_STEPS, DEFAULT_ORACLE_TIMEOUT,
};
pub use oracle::{OracleStep, ReasoningOracle, ToolCall};
pub use planner::{parse_llm_output, Planner, FINAL_ANSWER};
