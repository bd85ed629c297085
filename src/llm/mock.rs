//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 按顺序返回预置的回复；预置回复用完后，把最后一条 User 消息中形如 `name(args)` 的调用包装成决策 JSON。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message, Role};

/// Mock 客户端：脚本化回复 + 调用字符串回显
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依次返回给定回复
    pub fn scripted<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let script = responses.into_iter().map(|s| Ok(s.into())).collect();
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 追加一条失败回复（模拟网络错误等）
    pub fn push_error(&self, err: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(err.into()));
        }
    }

    /// 已收到的调用次数
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// 第 idx 次调用收到的消息
    pub fn request(&self, idx: usize) -> Option<Vec<Message>> {
        self.calls.lock().ok().and_then(|c| c.get(idx).cloned())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        if let Some(reply) = scripted {
            return reply;
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.trim())
            .unwrap_or("");
        let task = last_user.split('(').next().unwrap_or("").trim();
        Ok(serde_json::json!({
            "task": task,
            "function_call": last_user,
        })
        .to_string())
    }
}
