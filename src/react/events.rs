//! 运行过程事件：用于向前端推送思考、工具调用、观察与结果

use serde::Serialize;

use crate::core::AbortReason;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactEvent {
    /// 迭代计数更新（当前第几次推理）
    StepUpdate { step: usize, max_steps: usize },
    /// 正在请求 Oracle
    Thinking,
    /// Oracle 的思考内容
    ThinkingContent { text: String },
    /// 调用工具
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览，避免过长）
    Observation { tool: String, preview: String },
    /// 工具调用或 Oracle 回复失败
    ToolFailure { tool: String, reason: String },
    /// 最终回复
    FinalAnswer { text: String },
    /// 运行中止
    Aborted { reason: AbortReason },
}
