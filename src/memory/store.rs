//! 精确匹配记忆
//!
//! 只追加的 (输入, 运算, 参数, 结果) 记录序列；lookup_exact 只在运算名与规范参数表完全相同时命中，
//! 不做任何部分、模糊或语义匹配。append 是唯一的写操作，每次都同步全量落盘。

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{CalcError, Number, Parameters};
use crate::memory::RecordPersistence;

/// 一次已完成计算的记录，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub original_input: String,
    pub operation_name: String,
    pub parameters: Parameters,
    pub result: Number,
    pub timestamp: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(
        original_input: impl Into<String>,
        operation_name: impl Into<String>,
        parameters: Parameters,
        result: Number,
    ) -> Self {
        Self {
            original_input: original_input.into(),
            operation_name: operation_name.into(),
            parameters,
            result,
            timestamp: Utc::now(),
        }
    }

    /// 运算名与参数表完全一致（键集合相同、每个值精确相等）
    pub fn matches(&self, operation_name: &str, parameters: &Parameters) -> bool {
        self.operation_name == operation_name && &self.parameters == parameters
    }
}

/// 记忆存储：独占记录序列，也是持久化文件的唯一写入者
#[derive(Debug)]
pub struct MemoryStore {
    records: Vec<MemoryRecord>,
    persistence: Option<RecordPersistence>,
}

impl MemoryStore {
    /// 从持久化文件打开；文件缺失或损坏都视为空记忆
    pub fn open(persistence: RecordPersistence) -> Self {
        let records = match persistence.load() {
            Ok(records) => {
                tracing::info!(
                    "Loaded {} memory records from {}",
                    records.len(),
                    persistence.path().display()
                );
                records
            }
            Err(e) => {
                tracing::warn!("Memory file unreadable ({:#}), starting with empty memory", e);
                Vec::new()
            }
        };
        Self {
            records,
            persistence: Some(persistence),
        }
    }

    /// 不落盘的内存记忆
    pub fn in_memory() -> Self {
        Self {
            records: Vec::new(),
            persistence: None,
        }
    }

    /// 最近一条完全匹配的记录
    pub fn lookup_exact(&self, operation_name: &str, parameters: &Parameters) -> Option<&MemoryRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| r.matches(operation_name, parameters))
    }

    /// 追加一条记录并全量落盘；落盘失败时内存中的序列保持不变
    pub fn append(&mut self, record: MemoryRecord) -> Result<(), CalcError> {
        if let Some(persistence) = &self.persistence {
            let mut next = self.records.clone();
            next.push(record);
            persistence
                .save(&next)
                .map_err(|e| CalcError::Persistence(format!("{e:#}")))?;
            self.records = next;
        } else {
            self.records.push(record);
        }
        Ok(())
    }

    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 需要跨任务共享时使用：lookup 走读锁，append 走写锁
#[derive(Debug, Clone)]
pub struct SharedMemoryStore {
    inner: Arc<RwLock<MemoryStore>>,
}

impl SharedMemoryStore {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub fn lookup_exact(
        &self,
        operation_name: &str,
        parameters: &Parameters,
    ) -> Result<Option<MemoryRecord>, CalcError> {
        let store = self
            .inner
            .read()
            .map_err(|_| CalcError::Persistence("memory lock poisoned".to_string()))?;
        Ok(store.lookup_exact(operation_name, parameters).cloned())
    }

    pub fn append(&self, record: MemoryRecord) -> Result<(), CalcError> {
        let mut store = self
            .inner
            .write()
            .map_err(|_| CalcError::Persistence("memory lock poisoned".to_string()))?;
        store.append(record)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
