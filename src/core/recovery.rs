//! 错误恢复引擎
//!
//! 根据失败分类给出恢复提示，随 Failure 观察写回推理上下文，让 Oracle 在下一轮自我纠正
//! （重新输出合法格式、改用已注册工具、修正参数后重试）。

use crate::tools::{Failure, FailureKind};

/// 语义化错误恢复：将失败映射为一句给 Oracle 的提示
#[derive(Debug, Default, Clone)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    /// 根据失败类型返回建议提示；tool_names 用于提示可用工具
    pub fn hint(&self, failure: &Failure, tool_names: &[String]) -> Option<String> {
        match failure.kind {
            FailureKind::OracleProtocol => Some(
                "Your previous reply could not be parsed. Reply with a Thought line followed by exactly one \
                 JSON blob in a ```json fenced block: {\"action\": \"<tool name or Final Answer>\", \
                 \"action_input\": {...}}."
                    .to_string(),
            ),
            FailureKind::UnknownTool => Some(format!(
                "Only these tools exist: {}. Choose one of them or give the Final Answer.",
                tool_names.join(", ")
            )),
            FailureKind::Validation => Some(
                "Correct the arguments to match the tool's parameter list and call it again.".to_string(),
            ),
            FailureKind::Domain => Some(
                "Fix the problem described above using information from the task, or report it in the \
                 Final Answer if the information is not available."
                    .to_string(),
            ),
            FailureKind::Timeout => Some("The call timed out. You may retry once.".to_string()),
            FailureKind::OracleUnavailable => None,
        }
    }

    /// 便捷方法：返回附带提示的 Failure
    pub fn annotate(&self, failure: Failure, tool_names: &[String]) -> Failure {
        let hint = self.hint(&failure, tool_names);
        failure.with_hint(hint)
    }
}
