//! Scratchpad：单次运行内的 (Thought, Action, Observation) 序列
//!
//! 只追加、不剪枝；同一时刻最多一条待补 Observation 的条目。运行结束随 RunReport 交还调用方，不跨运行保存。

use serde::Serialize;

use crate::react::ToolCall;
use crate::tools::Observation;

/// 条目中的动作部分
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepAction {
    /// 调用工具
    Tool { call: ToolCall },
    /// Oracle 的回复无法解析或调用失败，保留原始输出便于其自我纠正
    Unparsed { raw: String },
    /// 最终回复标记
    Final { answer: String },
}

/// 单条记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScratchpadEntry {
    pub thought: String,
    pub action: StepAction,
    pub observation: Option<Observation>,
}

impl ScratchpadEntry {
    pub fn tool_call(thought: impl Into<String>, call: ToolCall) -> Self {
        Self {
            thought: thought.into(),
            action: StepAction::Tool { call },
            observation: None,
        }
    }

    pub fn unparsed(raw: impl Into<String>, observation: Observation) -> Self {
        Self {
            thought: String::new(),
            action: StepAction::Unparsed { raw: raw.into() },
            observation: Some(observation),
        }
    }

    pub fn final_answer(thought: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            action: StepAction::Final {
                answer: answer.into(),
            },
            observation: None,
        }
    }

    /// 等待 Observation 的工具调用条目
    pub fn is_pending(&self) -> bool {
        matches!(self.action, StepAction::Tool { .. }) && self.observation.is_none()
    }

    /// 渲染为推理上下文中的一段文本
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.thought.is_empty() {
            out.push_str(&format!("Thought: {}\n", self.thought));
        }
        match &self.action {
            StepAction::Tool { call } => {
                let blob = serde_json::json!({
                    "action": call.tool,
                    "action_input": call.args,
                });
                out.push_str(&format!("Action:\n```json\n{}\n```\n", blob));
            }
            StepAction::Unparsed { raw } => {
                out.push_str(&format!("(unusable reply)\n{}\n", raw.trim()));
            }
            StepAction::Final { answer } => {
                out.push_str(&format!("Final Answer: {}\n", answer));
            }
        }
        if let Some(obs) = &self.observation {
            out.push_str(&format!("Observation: {}\n", obs.render()));
        }
        out
    }
}

/// 只追加的运行记录
#[derive(Debug, Clone, Default, Serialize)]
pub struct Scratchpad {
    entries: Vec<ScratchpadEntry>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: ScratchpadEntry) {
        debug_assert!(self.pending().is_none(), "previous step still awaits its observation");
        self.entries.push(entry);
    }

    /// 为待定条目补上 Observation；没有待定条目时返回 false
    pub fn attach_observation(&mut self, observation: Observation) -> bool {
        match self.entries.last_mut() {
            Some(entry) if entry.is_pending() => {
                entry.observation = Some(observation);
                true
            }
            _ => false,
        }
    }

    pub fn pending(&self) -> Option<&ScratchpadEntry> {
        self.entries.last().filter(|e| e.is_pending())
    }

    pub fn entries(&self) -> &[ScratchpadEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按顺序惰性渲染每条记录
    pub fn render(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(ScratchpadEntry::render)
    }

    /// 所有失败的 Observation（按顺序）
    pub fn failures(&self) -> impl Iterator<Item = &crate::tools::Failure> + '_ {
        self.entries
            .iter()
            .filter_map(|e| e.observation.as_ref().and_then(Observation::as_failure))
    }
}
