//! 工具调用结果：Observation
//!
//! 成功与失败统一为带标签的结果，失败附带分类、具体原因与可选的恢复提示，写入 Scratchpad 后不再修改。

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{AgentError, ToolError};

/// 失败分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    UnknownTool,
    Domain,
    Timeout,
    OracleProtocol,
    OracleUnavailable,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::UnknownTool => "unknown_tool",
            FailureKind::Domain => "domain",
            FailureKind::Timeout => "timeout",
            FailureKind::OracleProtocol => "oracle_protocol",
            FailureKind::OracleUnavailable => "oracle_unavailable",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 失败详情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Failure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: Option<String>) -> Self {
        self.hint = hint;
        self
    }
}

impl From<ToolError> for Failure {
    fn from(err: ToolError) -> Self {
        let kind = match &err {
            ToolError::UnknownTool(_) => FailureKind::UnknownTool,
            ToolError::Validation { .. } => FailureKind::Validation,
            ToolError::Domain(_) => FailureKind::Domain,
            ToolError::Timeout { .. } => FailureKind::Timeout,
        };
        Failure::new(kind, err.to_string())
    }
}

impl From<&AgentError> for Failure {
    fn from(err: &AgentError) -> Self {
        let kind = match err {
            AgentError::OracleProtocol { .. } => FailureKind::OracleProtocol,
            AgentError::OracleTimeout(_) => FailureKind::Timeout,
            _ => FailureKind::OracleUnavailable,
        };
        Failure::new(kind, err.to_string())
    }
}

/// 一次调用的观察结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Observation {
    Success { value: Value },
    Failure(Failure),
}

impl Observation {
    pub fn success(value: impl Into<Value>) -> Self {
        Observation::Success {
            value: value.into(),
        }
    }

    pub fn failure(failure: Failure) -> Self {
        Observation::Failure(failure)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Observation::Success { .. })
    }

    pub fn as_failure(&self) -> Option<&Failure> {
        match self {
            Observation::Failure(f) => Some(f),
            Observation::Success { .. } => None,
        }
    }

    /// 渲染为写回推理上下文的文本：字符串原样输出，其余值输出紧凑 JSON
    pub fn render(&self) -> String {
        match self {
            Observation::Success { value: Value::String(s) } => s.clone(),
            Observation::Success { value } => value.to_string(),
            Observation::Failure(f) => match &f.hint {
                Some(hint) => format!("ERROR ({}): {}\nHint: {}", f.kind, f.reason, hint),
                None => format!("ERROR ({}): {}", f.kind, f.reason),
            },
        }
    }
}
