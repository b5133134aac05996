//! Reasoning Oracle 边界
//!
//! 给定任务、工具描述与当前 Scratchpad，返回下一步动作或最终回复。实现可以是 LLM（Planner），也可以是测试桩。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::AgentError;
use crate::memory::Scratchpad;
use crate::tools::ToolDescriptor;

/// Oracle 给出的工具调用：工具名 + 原始参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    pub args: Map<String, Value>,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            tool: tool.into(),
            args,
        }
    }
}

/// Oracle 的一步输出
#[derive(Debug, Clone, PartialEq)]
pub enum OracleStep {
    Action { call: ToolCall, thought: String },
    FinalAnswer { text: String, thought: String },
}

/// 推理 Oracle：同步语义的一问一答，结果可能不确定
#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    async fn next_step(
        &self,
        task: &str,
        tools: &[&ToolDescriptor],
        scratchpad: &Scratchpad,
    ) -> Result<OracleStep, AgentError>;
}
