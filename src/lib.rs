//! Bee Calc - Rust 算术智能体
//!
//! 把 oracle（LLM）对自然语言算术请求的非结构化回复，变成校验过的规范调用并执行，结果写入精确匹配记忆。
//!
//! 模块划分：
//! - **agent**: 单条请求的编排（prompt -> oracle -> 抽取 -> 记忆 -> 计算）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 数值类型、错误分类与恢复策略
//! - **decision**: 结构化输出抽取与参数归一化
//! - **llm**: oracle 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 精确匹配记忆与 JSON 持久化
//! - **observability**: 日志初始化
//! - **tools**: 运算注册表、内置运算与分发器

pub mod agent;
pub mod config;
pub mod core;
pub mod decision;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod tools;

pub use agent::{Answer, CalcAgent};
