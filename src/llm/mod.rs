//! LLM 层：oracle 客户端抽象与实现（OpenAI 兼容 / Mock）及后端选择

pub mod mock;
pub mod openai;
pub mod provider;
pub mod traits;

pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use provider::create_llm_from_config;
pub use traits::{LlmClient, Message, Role};
