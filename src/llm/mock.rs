//! 脚本化 LLM 客户端（用于测试与离线演练，无需 API）
//!
//! 按顺序返回预设回复；脚本耗尽后重复最后一条（空脚本则返回错误）。同时记录收到的每次请求，便于断言 prompt 内容。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::Message;

#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// 已收到的请求次数
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// 第 n 次请求的消息（从 0 开始）
    pub fn request(&self, n: usize) -> Option<Vec<Message>> {
        self.requests.lock().ok().and_then(|r| r.get(n).cloned())
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Ok(mut reqs) = self.requests.lock() {
            reqs.push(messages.to_vec());
        }
        let next = self.replies.lock().map_err(|e| e.to_string())?.pop_front();
        let mut last = self.last.lock().map_err(|e| e.to_string())?;
        match next {
            Some(reply) => {
                *last = Some(reply.clone());
                Ok(reply)
            }
            None => last.clone().ok_or_else(|| "script exhausted".to_string()),
        }
    }
}
