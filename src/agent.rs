//! 计算智能体运行时
//!
//! 单条用户输入的完整流程：system prompt（运算列表 + 决策 JSON Schema）-> oracle -> Extractor
//! -> 精确记忆查找 -> 未命中则 Dispatcher 计算并写入记忆。
//! 回复无法解析或 oracle 失败时由 RecoveryEngine 决定是否带纠正提示重问（次数受 max_retries 限制）。

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::AppConfig;
use crate::core::error::render_params;
use crate::core::{CalcError, Number, Parameters, RecoveryAction, RecoveryEngine};
use crate::decision::{CanonicalDecision, Extractor, Reconciler};
use crate::llm::{create_llm_from_config, LlmClient, Message};
use crate::memory::{MemoryRecord, MemoryStore, RecordPersistence};
use crate::tools::{builtin_registry, decision_schema_json, Dispatcher, OperationRegistry};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_RETRIES: u32 = 1;

/// 一次请求的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub operation_name: String,
    pub parameters: Parameters,
    pub value: Number,
    /// true 表示直接复用了记忆中的结果，没有重新计算
    pub from_memory: bool,
    /// false 表示计算成功但写入记忆失败，下次同样的请求会重新计算
    pub persisted: bool,
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) = {}",
            self.operation_name,
            render_params(&self.parameters),
            self.value
        )?;
        if self.from_memory {
            write!(f, " (from memory)")?;
        }
        if !self.persisted {
            write!(f, " (not saved to memory)")?;
        }
        Ok(())
    }
}

/// 根据注册表生成 system prompt：运算列表、各运算参数的 JSON Schema、决策 JSON Schema
pub fn build_system_prompt(registry: &OperationRegistry) -> String {
    format!(
        "You translate arithmetic requests into a single operation call.\n\
        Available operations:\n{}\n\n\
        Parameter schemas:\n{}\n\n\
        Reply with exactly one JSON object matching this schema and nothing else:\n{}\n\
        Use the operation name for both \"task\" and \"function_call\", and put the numbers in \
        \"function_call_params\" using the parameter names listed above.",
        registry.describe(),
        registry.to_schema_json(),
        decision_schema_json()
    )
}

pub struct CalcAgent {
    llm: Arc<dyn LlmClient>,
    dispatcher: Dispatcher,
    reconciler: Reconciler,
    memory: MemoryStore,
    recovery: RecoveryEngine,
    system_prompt: String,
    request_timeout: Duration,
    max_retries: u32,
}

impl CalcAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        registry: OperationRegistry,
        reconciler: Reconciler,
        memory: MemoryStore,
    ) -> Self {
        let system_prompt = build_system_prompt(&registry);
        Self {
            llm,
            dispatcher: Dispatcher::new(registry),
            reconciler,
            memory,
            recovery: RecoveryEngine::new(),
            system_prompt,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// 按配置组装：内置运算表、配置的别名、记忆文件、oracle 后端
    pub fn from_config(cfg: &AppConfig) -> Self {
        let llm = create_llm_from_config(cfg);
        let memory = if cfg.app.persist_memory {
            MemoryStore::open(RecordPersistence::new(&cfg.app.memory_path))
        } else {
            tracing::info!("Memory persistence disabled, results are kept for this session only");
            MemoryStore::in_memory()
        };
        Self::new(
            llm,
            builtin_registry(),
            Reconciler::new(cfg.reconciler.synonym_table()),
            memory,
        )
        .with_request_timeout(Duration::from_secs(cfg.llm.timeouts.request))
        .with_max_retries(cfg.agent.max_retries)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// oracle 累计 token 使用量 (prompt, completion, total)
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// 处理单条用户输入
    pub async fn handle(&mut self, user_input: &str) -> Result<Answer, CalcError> {
        let decision = self.decide(user_input).await?;

        if let Some(record) = self
            .memory
            .lookup_exact(&decision.operation_name, &decision.parameters)
        {
            tracing::info!(
                operation = %record.operation_name,
                recorded_at = %record.timestamp,
                "Memory hit"
            );
            return Ok(Answer {
                operation_name: record.operation_name.clone(),
                parameters: record.parameters.clone(),
                value: record.result,
                from_memory: true,
                persisted: true,
            });
        }

        let result = self.dispatcher.dispatch(&decision)?;
        let persisted = match self.memory.append(MemoryRecord::new(
            user_input,
            result.operation_name.clone(),
            result.parameters.clone(),
            result.value,
        )) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Computed result was not saved to memory");
                false
            }
        };

        Ok(Answer {
            operation_name: result.operation_name,
            parameters: result.parameters,
            value: result.value,
            from_memory: false,
            persisted,
        })
    }

    /// 询问 oracle 并抽取规范决策；可重试的错误带纠正提示重问
    async fn decide(&self, user_input: &str) -> Result<CanonicalDecision, CalcError> {
        let extractor = Extractor::new(self.dispatcher.registry(), &self.reconciler);
        let mut messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(user_input),
        ];
        let mut retries = 0;

        loop {
            let (err, replied) = match self.ask_oracle(&messages).await {
                Ok(raw) => match extractor.extract(&raw) {
                    Ok(decision) => return Ok(decision),
                    Err(e) => {
                        messages.push(Message::assistant(raw));
                        (e, true)
                    }
                },
                Err(e) => (e, false),
            };

            match self.recovery.handle(&err) {
                RecoveryAction::RetryWithPrompt(hint) if retries < self.max_retries => {
                    retries += 1;
                    tracing::warn!(error = %err, attempt = retries, "Retrying oracle");
                    // 没有收到回复时原样重发
                    if replied {
                        messages.push(Message::user(hint));
                    }
                }
                _ => return Err(err),
            }
        }
    }

    async fn ask_oracle(&self, messages: &[Message]) -> Result<String, CalcError> {
        match tokio::time::timeout(self.request_timeout, self.llm.complete(messages)).await {
            Ok(Ok(raw)) => {
                let (prompt_tokens, completion_tokens, total_tokens) = self.llm.token_usage();
                tracing::debug!(
                    response = %raw,
                    prompt_tokens,
                    completion_tokens,
                    total_tokens,
                    "Oracle replied"
                );
                Ok(raw)
            }
            Ok(Err(e)) => Err(CalcError::Oracle(e)),
            Err(_) => Err(CalcError::OracleTimeout),
        }
    }
}
