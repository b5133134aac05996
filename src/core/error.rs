//! 错误类型
//!
//! AgentError：编排层错误（配置、重复注册、Oracle 协议/超时/LLM 失败）；
//! ToolError：工具层错误，由 ToolExecutor 统一转为 Observation::Failure，不会冒泡到主循环。

use std::time::Duration;

use thiserror::Error;

/// 编排过程中可能出现的错误
///
/// 只有 `Config` 与 `DuplicateTool` 允许在启动阶段直接终止进程；
/// Oracle 相关错误在主循环内转为 Failure 观察，交给下一轮推理自我纠正。
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    /// Oracle 输出无法解析为 Action 或 Final Answer；raw 为原始回复
    #[error("Oracle protocol error: {reason}")]
    OracleProtocol { reason: String, raw: String },

    #[error("Oracle timed out after {0:?}")]
    OracleTimeout(Duration),

    #[error("LLM error: {0}")]
    LlmError(String),
}

/// 单次工具调用失败的原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// 参数校验失败；details 汇总了全部问题（缺失参数、类型不符、未知参数）
    #[error("Invalid arguments for {tool}: {details}")]
    Validation { tool: String, details: String },

    /// 工具已执行但领域操作无法完成（如航段缺少必填字段）
    #[error("{0}")]
    Domain(String),

    #[error("Tool {tool} timed out after {after:?}")]
    Timeout { tool: String, after: Duration },
}

impl AgentError {
    pub fn protocol(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::OracleProtocol {
            reason: reason.into(),
            raw: raw.into(),
        }
    }
}

impl ToolError {
    pub fn domain(reason: impl Into<String>) -> Self {
        Self::Domain(reason.into())
    }
}
