//! 核心层：数值类型、错误分类与恢复策略

pub mod error;
pub mod number;
pub mod recovery;

pub use error::{CalcError, RecoveryAction};
pub use number::{Number, NumericKind, Parameters};
pub use recovery::RecoveryEngine;
