//! Worker 协议
//!
//! 所有处理器都实现 [`Worker`]：接收命令，返回带链路控制语义的 [`Outcome`]。
//! 可选能力以独立 trait 提供，Worker 通过 `configurable()` / `delegating()` 暴露：
//! - [`Configurable`]：Worker 私有配置（装配时由参数包注入）；
//! - [`Delegating`]：持有 Operator 的弱引用，可在执行中发起嵌套调度。
//!
mod configurable;
mod delegating;
mod func;

pub use configurable::{Configurable, WorkerConfig};
pub use delegating::{Delegating, OperatorLink};
pub use func::{FnWorker, worker_fn};

use crate::{command::Command, error::OperatorResult};
use async_trait::async_trait;
use serde_json::Value;

/// Worker 执行结果与链路控制信号
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 正常返回；是否继续由命令的链式属性决定
    Done(Value),
    /// 本 Worker 放弃处理，交给链上的下一个（结果保持不变）
    TryNext,
    /// 立即终止链路；`Some` 时以该值作为结果
    Break(Option<Value>),
}

impl Outcome {
    pub fn done(value: impl Into<Value>) -> Self {
        Self::Done(value.into())
    }

    pub fn stop(value: impl Into<Value>) -> Self {
        Self::Break(Some(value.into()))
    }
}

/// 命令处理器
#[async_trait]
pub trait Worker: Send + Sync {
    /// 处理命令；无法识别的命令应返回 `NotSupported` 或 [`Outcome::TryNext`]
    async fn execute(&self, command: &mut Command) -> OperatorResult<Outcome>;

    fn configurable(&self) -> Option<&dyn Configurable> {
        None
    }

    fn delegating(&self) -> Option<&dyn Delegating> {
        None
    }
}
