//! 按配置与环境变量选择 oracle 后端（Gemini / DeepSeek / OpenAI 兼容 / Mock）

use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};

/// Gemini 的 OpenAI 兼容端点
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_DEFAULT_MODEL: &str = "deepseek-chat";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// 根据 `[llm] provider` 与对应 API Key 创建客户端；缺 Key 或 provider 为 mock 时退回 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let (key_var, default_base, default_model) = match provider.as_str() {
        "gemini" => ("GEMINI_API_KEY", Some(GEMINI_BASE_URL), GEMINI_DEFAULT_MODEL),
        "deepseek" => ("DEEPSEEK_API_KEY", Some(DEEPSEEK_BASE_URL), DEEPSEEK_DEFAULT_MODEL),
        "openai" => ("OPENAI_API_KEY", None, OPENAI_DEFAULT_MODEL),
        "mock" => {
            tracing::info!("Using Mock LLM (provider = mock)");
            return Arc::new(MockLlmClient::new());
        }
        other => {
            tracing::warn!("Unknown LLM provider '{}', using Mock LLM", other);
            return Arc::new(MockLlmClient::new());
        }
    };

    let Ok(api_key) = std::env::var(key_var) else {
        tracing::warn!("{} not set, using Mock LLM", key_var);
        return Arc::new(MockLlmClient::new());
    };

    let model = cfg
        .llm
        .model
        .clone()
        .unwrap_or_else(|| default_model.to_string());
    let base = cfg.llm.base_url.as_deref().or(default_base);
    tracing::info!("Using {} LLM ({})", provider, model);
    Arc::new(OpenAiClient::new(base, &model, Some(api_key.as_str())))
}
