//! 记忆持久化
//!
//! 整个记录序列以 JSON 数组写入单个文件；每次 append 全量重写，启动时整体读入。

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::memory::MemoryRecord;

/// 简单的文件持久化：单文件 JSON 数组，每个元素是一条 MemoryRecord
#[derive(Debug, Clone)]
pub struct RecordPersistence {
    path: PathBuf,
}

impl RecordPersistence {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 从 JSON 文件加载记录；文件不存在时返回空 Vec，内容损坏时返回 Err
    pub fn load(&self) -> anyhow::Result<Vec<MemoryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<MemoryRecord> = serde_json::from_str(&data)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(records)
    }

    /// 将全部记录写入 JSON 文件；父目录不存在时自动创建
    pub fn save(&self, records: &[MemoryRecord]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(records)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}
