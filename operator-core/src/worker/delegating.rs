use crate::{
    error::{OperatorError, OperatorResult},
    operator::Operator,
};
use std::sync::{Arc, OnceLock, Weak};

/// 委托型 Worker：持有 Operator 的回引用，可在执行中发起嵌套 `execute`
///
/// Operator 在 `build()` 冻结时调用 `attach`，使用弱引用避免与注册表形成环。
pub trait Delegating: Send + Sync {
    fn attach(&self, operator: Weak<Operator>);

    fn operator(&self) -> OperatorResult<Arc<Operator>>;
}

/// `Delegating` 的默认实现，Worker 内嵌后转发即可
#[derive(Debug, Default)]
pub struct OperatorLink {
    inner: OnceLock<Weak<Operator>>,
}

impl OperatorLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.get().is_some()
    }
}

impl Delegating for OperatorLink {
    fn attach(&self, operator: Weak<Operator>) {
        // 同一个 Worker 只绑定第一个 Operator
        if self.inner.set(operator).is_err() {
            tracing::debug!("operator link already attached, ignoring");
        }
    }

    fn operator(&self) -> OperatorResult<Arc<Operator>> {
        self.inner
            .get()
            .and_then(Weak::upgrade)
            .ok_or(OperatorError::OperatorUnavailable)
    }
}
