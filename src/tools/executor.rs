//! 工具执行器（Tool Invocation Adapter）
//!
//! 持有 ToolRegistry 与全局超时。invoke(call) 依次：按名查找 -> 参数校验 -> 在独立任务中限时执行，
//! 未知工具、校验失败、领域错误、超时与 panic 全部转为 Observation::Failure；每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::{RecoveryEngine, ToolError};
use crate::react::ToolCall;
use crate::tools::schema::validate_args;
use crate::tools::{Failure, Observation, ToolRegistry};

/// 工具执行器：对每次调用施加超时，并将结果规范化为 Observation
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
    recovery: RecoveryEngine,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, timeout_secs: u64) -> Self {
        Self::with_timeout(registry, Duration::from_secs(timeout_secs))
    }

    pub fn with_timeout(registry: Arc<ToolRegistry>, timeout: Duration) -> Self {
        Self {
            registry,
            timeout,
            recovery: RecoveryEngine::new(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    /// 执行一次工具调用；永不返回错误，所有失败都体现在 Observation 中
    pub async fn invoke(&self, call: &ToolCall) -> Observation {
        let start = Instant::now();
        let result = self.run(call).await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(_) => (true, "ok"),
            Err(ToolError::UnknownTool(_)) => (false, "unknown_tool"),
            Err(ToolError::Validation { .. }) => (false, "invalid_args"),
            Err(ToolError::Domain(_)) => (false, "error"),
            Err(ToolError::Timeout { .. }) => (false, "timeout"),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": call.tool,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&call.args),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(value) => Observation::success(value),
            Err(e) => {
                let failure = self.recovery.annotate(Failure::from(e), &self.tool_names());
                Observation::failure(failure)
            }
        }
    }

    async fn run(&self, call: &ToolCall) -> Result<serde_json::Value, ToolError> {
        let tool = self
            .registry
            .get(&call.tool)
            .ok_or_else(|| ToolError::UnknownTool(call.tool.clone()))?;

        let args = validate_args(tool.descriptor(), &call.args).map_err(|problems| {
            ToolError::Validation {
                tool: call.tool.clone(),
                details: problems.join("; "),
            }
        })?;

        // 在独立任务中执行：工具内部 panic 只影响本次调用
        let handle = tokio::spawn(async move { tool.execute(args).await });
        let abort = handle.abort_handle();
        match timeout(self.timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                tracing::error!(tool = %call.tool, error = %join_err, "tool task failed");
                Err(ToolError::domain(format!("tool {} crashed: {}", call.tool, join_err)))
            }
            Err(_) => {
                abort.abort();
                Err(ToolError::Timeout {
                    tool: call.tool.clone(),
                    after: self.timeout,
                })
            }
        }
    }
}

fn args_preview(args: &serde_json::Map<String, serde_json::Value>) -> String {
    let s = serde_json::Value::Object(args.clone()).to_string();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
