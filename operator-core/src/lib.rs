//! 通用命令调度核心（operator-core）
//!
//! 调用方构造命令（动作名 + 可选主体类型 + 参数包）提交给 [`Operator`]，
//! 由路由表按 `(action, subject)` 分发给一个或多个已注册的 Worker：
//! - 主体类型按祖先链从最具体到根逐级匹配，父类型上注册的 Worker 自动服务子类型；
//! - 同层 Worker 按 `order` 稳定排序，Worker 可通过 `TryNext` / `Break` 控制链路；
//! - 每条命令都会派生 `pre:<action>` 与 `after:<action>` 生命周期命令，
//!   供校验、转换、审计等横切 Worker 观察或改写命令与结果。
//!
//! 本 crate 与存储和传输无关，任何实现了 [`Worker`] 的组件都可以接入。
//!
//! 典型用法：
//! 1. 用 [`OperatorBuilder`] 注册 Worker、路由与主体类型层级（或由 [`OperatorConfig`] 装载）；
//! 2. `build()` 冻结为 `Arc<Operator>`；
//! 3. 调用 `operator.execute(command).await` 得到结果。
//!
pub mod action_map;
pub mod chain;
pub mod command;
pub mod config;
pub mod error;
pub mod operator;
pub mod registry;
pub mod subject;
pub mod worker;

pub use command::{Command, Params, ResultStack};
pub use config::{OperatorConfig, WorkerFactory};
pub use error::{OperatorError, OperatorResult};
pub use operator::{Operator, OperatorBuilder};
pub use worker::{Configurable, Delegating, Outcome, Worker};
