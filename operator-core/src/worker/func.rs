use super::{Outcome, Worker};
use crate::{command::Command, error::OperatorResult};
use async_trait::async_trait;
use std::sync::Arc;

/// 闭包 Worker：把同步函数包装为 [`Worker`]
pub struct FnWorker<F> {
    f: F,
}

impl<F> FnWorker<F>
where
    F: Fn(&mut Command) -> OperatorResult<Outcome> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> Worker for FnWorker<F>
where
    F: Fn(&mut Command) -> OperatorResult<Outcome> + Send + Sync,
{
    async fn execute(&self, command: &mut Command) -> OperatorResult<Outcome> {
        (self.f)(command)
    }
}

/// 便捷构造：`builder.add_worker("audit", worker_fn(|cmd| ...))`
pub fn worker_fn<F>(f: F) -> Arc<dyn Worker>
where
    F: Fn(&mut Command) -> OperatorResult<Outcome> + Send + Sync + 'static,
{
    Arc::new(FnWorker::new(f))
}
