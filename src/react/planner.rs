//! Planner：基于 LLM 的 Reasoning Oracle
//!
//! 拼 system（人设 + 工具词表 + 输出格式）与 user（任务 + Scratchpad），调用 LLM；
//! parse_llm_output 从文本中提取 `{"action": ..., "action_input": ...}` 并解析为工具调用或最终回复。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::{Message, Scratchpad};
use crate::react::{OracleStep, ReasoningOracle, ToolCall};
use crate::tools::{render_vocabulary, to_schema_json, tool_call_schema_json, ToolDescriptor};

/// 结束动作名
pub const FINAL_ANSWER: &str = "Final Answer";

#[derive(Debug, Deserialize)]
struct ActionBlob {
    action: String,
    #[serde(default)]
    action_input: Value,
}

/// 解析 LLM 输出：
/// - 含 JSON 块（```json ... ```，或以 `{` 开头 / 含 `"action"` 键的裸 JSON）时必须是合法的动作对象，否则为协议错误；
/// - action 为 "Final Answer" 时为最终回复，否则为工具调用（action_input 必须是对象）；
/// - 其余文本（即使夹带花括号）整段视为最终回复（去掉可选的 "Final Answer:" 前缀）。
pub fn parse_llm_output(output: &str) -> Result<OracleStep, AgentError> {
    let trimmed = output.trim();

    let (json_str, before) = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        let body = rest.find("```").map(|end| &rest[..end]).unwrap_or(rest);
        (body.trim(), &trimmed[..start])
    } else if let Some(start) = trimmed.find("```") {
        let rest = &trimmed[start + 3..];
        let body = rest.find("```").map(|end| &rest[..end]).unwrap_or(rest);
        (body.trim(), &trimmed[..start])
    } else if let Some(start) = trimmed
        .find('{')
        .filter(|_| trimmed.starts_with('{') || trimmed.contains("\"action\""))
    {
        match trimmed.rfind('}') {
            Some(end) if end > start => (&trimmed[start..=end], &trimmed[..start]),
            _ => (&trimmed[start..], &trimmed[..start]),
        }
    } else {
        return Ok(final_from_text(trimmed));
    };

    let thought = extract_thought(before);
    let blob: ActionBlob = serde_json::from_str(json_str)
        .map_err(|e| AgentError::protocol(format!("{}: {}", e, json_str), output))?;

    let action = blob.action.trim();
    if action.is_empty() {
        return Err(AgentError::protocol(
            format!("empty \"action\" in {}", json_str),
            output,
        ));
    }

    if action.eq_ignore_ascii_case(FINAL_ANSWER) {
        let text = match blob.action_input {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        return Ok(OracleStep::FinalAnswer { text, thought });
    }

    match blob.action_input {
        Value::Object(args) => Ok(OracleStep::Action {
            call: ToolCall::new(action, args),
            thought,
        }),
        Value::Null => Ok(OracleStep::Action {
            call: ToolCall::new(action, Default::default()),
            thought,
        }),
        other => Err(AgentError::protocol(
            format!(
                "\"action_input\" for {} must be a JSON object, got {}",
                action, other
            ),
            output,
        )),
    }
}

fn final_from_text(text: &str) -> OracleStep {
    match text.find("Final Answer:") {
        Some(idx) => OracleStep::FinalAnswer {
            text: text[idx + "Final Answer:".len()..].trim().to_string(),
            thought: extract_thought(&text[..idx]),
        },
        None => OracleStep::FinalAnswer {
            text: text.to_string(),
            thought: String::new(),
        },
    }
}

fn extract_thought(before: &str) -> String {
    let t = before.trim();
    let t = t.strip_prefix("Thought:").unwrap_or(t).trim();
    let t = t.strip_suffix("Action:").unwrap_or(t).trim();
    t.to_string()
}

/// Planner：持有 LLM 与人设 prompt，按每轮状态组装请求
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    /// system：人设 + 工具词表 + 输出格式说明
    pub fn build_system(&self, tools: &[&ToolDescriptor]) -> String {
        let names: Vec<&str> = tools.iter().map(|d| d.name.as_str()).collect();
        format!(
            "{base}\n\n\
             You have access to the following tools:\n\n{vocab}\n\
             Tool arguments must satisfy these JSON Schemas:\n{params}\n\n\
             Respond with exactly one action per reply. Use a JSON blob with an \"action\" key \
             (one of: {names}, or \"{fin}\") and an \"action_input\" key (the tool arguments as an object, \
             or the reply text for \"{fin}\"). The blob follows this schema:\n{schema}\n\n\
             Format:\n\
             Thought: what to do next and why\n\
             Action:\n```json\n{{\"action\": \"<name>\", \"action_input\": {{...}}}}\n```\n\n\
             After each action you will receive an Observation. When the task is complete reply with:\n\
             Thought: I know what to respond\n\
             Action:\n```json\n{{\"action\": \"{fin}\", \"action_input\": \"<reply>\"}}\n```",
            base = self.system_prompt,
            vocab = render_vocabulary(tools),
            params = to_schema_json(tools),
            names = names.join(", "),
            fin = FINAL_ANSWER,
            schema = tool_call_schema_json(),
        )
    }

    /// user：任务 + 已有的 Scratchpad 记录
    pub fn build_user(&self, task: &str, scratchpad: &Scratchpad) -> String {
        let mut out = format!("Task:\n{}\n", task.trim());
        if !scratchpad.is_empty() {
            out.push_str("\nPrevious steps:\n");
            for step in scratchpad.render() {
                out.push_str(&step);
            }
        }
        out.push_str("\n(Reply with your next Thought and Action.)");
        out
    }
}

#[async_trait]
impl ReasoningOracle for Planner {
    async fn next_step(
        &self,
        task: &str,
        tools: &[&ToolDescriptor],
        scratchpad: &Scratchpad,
    ) -> Result<OracleStep, AgentError> {
        let messages = vec![
            Message::system(self.build_system(tools)),
            Message::user(self.build_user(task, scratchpad)),
        ];
        let output = self
            .llm
            .complete(&messages)
            .await
            .map_err(AgentError::LlmError)?;
        tracing::debug!(output = %output, "oracle reply");
        parse_llm_output(&output)
    }
}
