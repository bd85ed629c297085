//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `BEE_CALC__*` 覆盖（双下划线表示嵌套，如 `BEE_CALC__LLM__PROVIDER=openai`）。

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::decision::SynonymTable;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub reconciler: ReconcilerSection,
}

/// [app] 段：记忆文件位置与是否落盘
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_memory_path")]
    pub memory_path: PathBuf,
    /// false 时记忆只保存在本次运行的内存中
    #[serde(default = "default_persist_memory")]
    pub persist_memory: bool,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            memory_path: default_memory_path(),
            persist_memory: default_persist_memory(),
        }
    }
}

fn default_memory_path() -> PathBuf {
    PathBuf::from("memory_data.json")
}

fn default_persist_memory() -> bool {
    true
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：gemini / deepseek / openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    /// 未设置时使用各后端的默认模型
    pub model: Option<String>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次 oracle 请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [agent] 段：回复无法解析或 oracle 失败时的重试次数
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

fn default_max_retries() -> u32 {
    1
}

/// [reconciler] 段：额外的参数别名，值为从 1 开始的参数位置
///
/// ```toml
/// [reconciler.synonyms]
/// summand = 1
/// addend = 2
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReconcilerSection {
    #[serde(default)]
    pub synonyms: HashMap<String, usize>,
}

impl ReconcilerSection {
    /// 内置别名 + 配置别名（同名时配置覆盖）
    pub fn synonym_table(&self) -> SynonymTable {
        let mut table = SynonymTable::default();
        table.extend_one_based(&self.synonyms);
        table
    }
}

/// 从 config 目录加载配置，环境变量 BEE_CALC__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 BEE_CALC__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("BEE_CALC")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
