//! 工具注册表
//!
//! 所有工具实现 Tool trait（descriptor / execute），由 ToolRegistry 按名注册与查找，保留注册顺序。
//! 启动后只读，包一层 Arc 即可在并发运行的多个主循环间共享。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::{AgentError, ToolError};
use crate::tools::schema::ToolDescriptor;

/// 工具 trait：描述（供 LLM 理解与参数校验）与异步执行
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    /// 执行工具；args 已由 ToolExecutor 按 descriptor 校验并规范化
    async fn execute(&self, args: Map<String, Value>) -> Result<Value, ToolError>;

    fn name(&self) -> &str {
        &self.descriptor().name
    }
}

/// 工具注册表：按注册顺序存储 Arc<dyn Tool>，名字到下标的索引用于分发
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；同名工具已存在时返回 DuplicateTool
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), AgentError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }
        tracing::debug!(tool = %name, "registered tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(Arc::new(tool));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    /// 按注册顺序返回全部工具描述
    pub fn describe_all(&self) -> Vec<&ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// 渲染工具词表：每个工具一段（签名、描述、参数说明），供 prompt 中的 Available tools 段落
pub fn render_vocabulary(descriptors: &[&ToolDescriptor]) -> String {
    let mut out = String::new();
    for d in descriptors {
        out.push_str(&format!("{}: {}\n", d.signature(), d.description));
        for p in &d.params {
            let req = if p.required { "required" } else { "optional" };
            out.push_str(&format!("  - {} ({}, {}): {}", p.name, p.param_type, req, p.description));
            if let Some(default) = &p.default {
                out.push_str(&format!(" [default: {}]", default));
            }
            out.push('\n');
        }
    }
    out
}

/// 各工具参数的 JSON Schema（name / description / parameters），供 prompt 中的参数约束段落
pub fn to_schema_json(descriptors: &[&ToolDescriptor]) -> String {
    let tools: Vec<Value> = descriptors
        .iter()
        .map(|d| {
            serde_json::json!({
                "name": d.name,
                "description": d.description,
                "parameters": d.parameters_schema()
            })
        })
        .collect();
    serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
}
