//! 参数名同义词表
//!
//! oracle 常把参数写成 param1 / num1 / first / x 等形式；同义词表把归一化后的别名映射到参数位置（0 起）。
//! 表内容是可调的配置数据：默认表 + 配置文件 [reconciler.synonyms]（1 起的位置）。

use std::collections::HashMap;

/// 带序号的别名前缀：param1、integer2、num_1、Value 2 ...
const NUMBERED_PREFIXES: &[&str] = &[
    "param", "parameter", "integer", "int", "num", "number", "value", "val", "arg", "argument",
    "operand", "input", "x", "n",
];

/// 默认表覆盖的最大位置（1 起）
const MAX_NUMBERED_POSITION: usize = 4;

/// 单词别名及其位置（0 起）
const WORD_ALIASES: &[(&str, usize)] = &[
    ("number", 0),
    ("num", 0),
    ("value", 0),
    ("n", 0),
    ("operand", 0),
    ("first", 0),
    ("second", 1),
    ("third", 2),
    ("fourth", 3),
    ("x", 0),
    ("y", 1),
    ("z", 2),
    ("lhs", 0),
    ("rhs", 1),
    ("left", 0),
    ("right", 1),
    ("base", 0),
    ("exponent", 1),
    ("dividend", 0),
    ("divisor", 1),
    ("numerator", 0),
    ("denominator", 1),
    ("angle", 0),
];

/// 键名归一化：小写，去掉下划线、连字符与空白
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// 同义词表：归一化别名 -> 参数位置（0 起）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymTable {
    aliases: HashMap<String, usize>,
}

impl SynonymTable {
    /// 空表（只做精确名与位置回退）
    pub fn empty() -> Self {
        Self {
            aliases: HashMap::new(),
        }
    }

    pub fn insert(&mut self, alias: &str, position: usize) {
        self.aliases.insert(normalize_key(alias), position);
    }

    /// 合并配置中的别名；配置里的位置从 1 开始，0 视为无效并忽略
    pub fn extend_one_based(&mut self, entries: &HashMap<String, usize>) {
        for (alias, position) in entries {
            match position.checked_sub(1) {
                Some(p) => self.insert(alias, p),
                None => tracing::warn!("Ignoring synonym '{}' with position 0 (positions start at 1)", alias),
            }
        }
    }

    /// 查询别名对应的位置（0 起）
    pub fn position(&self, key: &str) -> Option<usize> {
        self.aliases.get(&normalize_key(key)).copied()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for prefix in NUMBERED_PREFIXES {
            for n in 1..=MAX_NUMBERED_POSITION {
                table.insert(&format!("{prefix}{n}"), n - 1);
            }
        }
        for (alias, position) in WORD_ALIASES {
            table.insert(alias, *position);
        }
        table
    }
}
