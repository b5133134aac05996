//! 运行状态定义：主循环状态机、结束原因与运行报告
//!
//! Reasoning -> Acting -> Observing -> (Reasoning | Done)，任意状态可进入终态 Aborted。

use serde::Serialize;

use crate::memory::Scratchpad;

/// 主循环状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Reasoning,
    Acting,
    Observing,
    Done,
    Aborted,
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Done | LoopState::Aborted)
    }
}

/// 未得到最终回复就结束的原因
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// 达到最大迭代次数（资源耗尽，而非领域错误）
    IterationLimit,
    /// 被调用方显式终止
    Cancelled,
}

/// 一次运行的结果
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Oracle 给出最终回复
    Answered { text: String },
    /// 中止：message 为配置的兜底回复
    Aborted { reason: AbortReason, message: String },
}

impl RunOutcome {
    /// 返回给调用方的文本（最终回复或兜底回复）
    pub fn message(&self) -> &str {
        match self {
            RunOutcome::Answered { text } => text,
            RunOutcome::Aborted { message, .. } => message,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, RunOutcome::Answered { .. })
    }

    /// 中止的运行需要人工跟进
    pub fn needs_escalation(&self) -> bool {
        matches!(self, RunOutcome::Aborted { .. })
    }
}

/// 运行报告：结果、Oracle 调用次数与本次运行的 Scratchpad
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub iterations: usize,
    pub scratchpad: Scratchpad,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_message_and_escalation() {
        let answered = RunOutcome::Answered {
            text: "Thanks, Ruth".into(),
        };
        assert_eq!(answered.message(), "Thanks, Ruth");
        assert!(!answered.needs_escalation());

        let aborted = RunOutcome::Aborted {
            reason: AbortReason::IterationLimit,
            message: "Someone will get in touch".into(),
        };
        assert_eq!(aborted.message(), "Someone will get in touch");
        assert!(aborted.needs_escalation());
        assert!(!aborted.is_answered());
    }

    #[test]
    fn test_terminal_states() {
        assert!(LoopState::Done.is_terminal());
        assert!(LoopState::Aborted.is_terminal());
        assert!(!LoopState::Observing.is_terminal());
    }
}
