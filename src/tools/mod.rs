//! 运算层：注册表、参数 schema、内置运算表与分发器

pub mod calculator;
pub mod dispatcher;
pub mod registry;
pub mod schema;

pub use calculator::builtin_registry;
pub use dispatcher::{DispatchResult, Dispatcher};
pub use registry::{Args, Operation, OperationBinding, OperationRegistry};
pub use schema::{decision_schema_json, OperationSchema, ParamSpec};
