//! ReAct 主循环（Orchestration Loop Controller）
//!
//! Reasoning -> Acting (Tool) -> Observing -> 下一轮 Reasoning，直到 Oracle 给出 Final Answer 或达到迭代上限。
//! 一次迭代 = 一次 Oracle 调用；Oracle 超时、传输错误或回复无法解析都记为 Failure 观察并占用一次迭代。
//! 循环本身从不返回错误：中止时给出配置的兜底回复。

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::core::{AbortReason, AgentError, LoopState, RecoveryEngine, RunOutcome, RunReport};
use crate::memory::{Scratchpad, ScratchpadEntry};
use crate::react::{OracleStep, ReactEvent, ReasoningOracle};
use crate::tools::{Failure, Observation, ToolExecutor};

/// 默认最大迭代次数
pub const DEFAULT_MAX_STEPS: usize = 15;
/// 默认单次 Oracle 调用超时
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(60);
/// 默认兜底回复
pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "Reservation couldn't be created. Someone from the team will get in touch with the passenger.";
/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;
/// 思考内容展示最大字符数
const THINKING_PREVIEW_CHARS: usize = 800;

/// 单次运行的配置
pub struct ReactSession<'a> {
    pub oracle: &'a dyn ReasoningOracle,
    pub executor: &'a ToolExecutor,
    pub max_steps: usize,
    pub oracle_timeout: Duration,
    pub fallback_message: &'a str,
    /// 在两步之间检查；不打断进行中的 Oracle 或工具调用
    pub cancel_token: CancellationToken,
    pub event_tx: Option<&'a UnboundedSender<ReactEvent>>,
}

impl<'a> ReactSession<'a> {
    pub fn new(oracle: &'a dyn ReasoningOracle, executor: &'a ToolExecutor) -> Self {
        Self {
            oracle,
            executor,
            max_steps: DEFAULT_MAX_STEPS,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
            fallback_message: DEFAULT_FALLBACK_MESSAGE,
            cancel_token: CancellationToken::new(),
            event_tx: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_oracle_timeout(mut self, oracle_timeout: Duration) -> Self {
        self.oracle_timeout = oracle_timeout;
        self
    }

    pub fn with_fallback_message(mut self, message: &'a str) -> Self {
        self.fallback_message = message;
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// 设置事件推送通道
    pub fn with_event_tx(mut self, tx: &'a UnboundedSender<ReactEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send(&self, ev: ReactEvent) {
        if let Some(tx) = self.event_tx {
            let _ = tx.send(ev);
        }
    }
}

fn transition(state: &mut LoopState, next: LoopState) {
    tracing::debug!(from = ?state, to = ?next, "loop transition");
    *state = next;
}

fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}

/// 执行一次完整运行
pub async fn react_loop(session: &ReactSession<'_>, task: &str) -> RunReport {
    let tools = session.executor.registry().describe_all();
    let tool_names = session.executor.tool_names();
    let recovery = RecoveryEngine::new();

    let mut scratchpad = Scratchpad::new();
    let mut state = LoopState::Reasoning;
    let mut iterations = 0;

    loop {
        let abort_reason = if session.cancel_token.is_cancelled() {
            Some(AbortReason::Cancelled)
        } else if iterations >= session.max_steps {
            Some(AbortReason::IterationLimit)
        } else {
            None
        };
        if let Some(reason) = abort_reason {
            transition(&mut state, LoopState::Aborted);
            tracing::warn!(?reason, iterations, "run aborted without a final answer");
            session.send(ReactEvent::Aborted { reason });
            return RunReport {
                outcome: RunOutcome::Aborted {
                    reason,
                    message: session.fallback_message.to_string(),
                },
                iterations,
                scratchpad,
            };
        }

        iterations += 1;
        session.send(ReactEvent::StepUpdate {
            step: iterations,
            max_steps: session.max_steps,
        });
        session.send(ReactEvent::Thinking);

        let step = match timeout(
            session.oracle_timeout,
            session.oracle.next_step(task, &tools, &scratchpad),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AgentError::OracleTimeout(session.oracle_timeout)),
        };

        match step {
            Ok(OracleStep::FinalAnswer { text, thought }) => {
                if !thought.is_empty() {
                    session.send(ReactEvent::ThinkingContent {
                        text: preview(&thought, THINKING_PREVIEW_CHARS),
                    });
                }
                scratchpad.append(ScratchpadEntry::final_answer(thought, text.clone()));
                transition(&mut state, LoopState::Done);
                tracing::info!(iterations, "run finished with a final answer");
                session.send(ReactEvent::FinalAnswer { text: text.clone() });
                return RunReport {
                    outcome: RunOutcome::Answered { text },
                    iterations,
                    scratchpad,
                };
            }
            Ok(OracleStep::Action { call, thought }) => {
                if !thought.is_empty() {
                    session.send(ReactEvent::ThinkingContent {
                        text: preview(&thought, THINKING_PREVIEW_CHARS),
                    });
                }
                transition(&mut state, LoopState::Acting);
                session.send(ReactEvent::ToolCall {
                    tool: call.tool.clone(),
                    args: serde_json::Value::Object(call.args.clone()),
                });
                scratchpad.append(ScratchpadEntry::tool_call(thought, call.clone()));

                let observation = session.executor.invoke(&call).await;

                transition(&mut state, LoopState::Observing);
                match &observation {
                    Observation::Failure(f) => session.send(ReactEvent::ToolFailure {
                        tool: call.tool.clone(),
                        reason: f.reason.clone(),
                    }),
                    Observation::Success { .. } => session.send(ReactEvent::Observation {
                        tool: call.tool.clone(),
                        preview: preview(&observation.render(), OBSERVATION_PREVIEW_CHARS),
                    }),
                }
                scratchpad.attach_observation(observation);
            }
            Err(e) => {
                tracing::warn!(error = %e, iterations, "oracle step failed");
                let raw = match &e {
                    AgentError::OracleProtocol { raw, .. } => raw.clone(),
                    AgentError::OracleTimeout(_) => "no reply (timed out)".to_string(),
                    _ => "no reply (oracle unavailable)".to_string(),
                };
                let failure = recovery.annotate(Failure::from(&e), &tool_names);
                session.send(ReactEvent::ToolFailure {
                    tool: "oracle".to_string(),
                    reason: failure.reason.clone(),
                });
                scratchpad.append(ScratchpadEntry::unparsed(raw, Observation::failure(failure)));
            }
        }

        transition(&mut state, LoopState::Reasoning);
    }
}
