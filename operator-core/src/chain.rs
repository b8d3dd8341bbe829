//! 链路解析（Chain resolver）
//!
//! 对给定命令，从主体类型的最具体层级逐级走到根层级；每一层按 `order`
//! 稳定排序后依次产出 Worker。解析是惰性的：Worker 名称到实例的查找发生在
//! 迭代到该项时，因此未注册的名称在调用阶段才报 `WorkerNotFound`。
//!
use crate::{
    action_map::{ActionEntry, ActionMap},
    command::Command,
    error::OperatorResult,
    registry::WorkerRegistry,
    subject::SubjectHierarchy,
    worker::Worker,
};
use std::{collections::VecDeque, sync::Arc};

/// 链上的一环
#[derive(Clone)]
pub struct ChainLink {
    pub worker_name: String,
    /// 命中的层级（根层级为空串）
    pub subject: String,
    pub order: i64,
    pub worker: Arc<dyn Worker>,
}

impl std::fmt::Debug for ChainLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainLink")
            .field("worker_name", &self.worker_name)
            .field("subject", &self.subject)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// 惰性、有限的 Worker 序列；每次解析都重新创建
pub struct Chain<'a> {
    registry: &'a WorkerRegistry,
    actions: &'a ActionMap,
    action: String,
    levels: VecDeque<String>,
    pending: VecDeque<(String, ActionEntry)>,
}

impl<'a> Chain<'a> {
    pub(crate) fn resolve(
        registry: &'a WorkerRegistry,
        actions: &'a ActionMap,
        subjects: &SubjectHierarchy,
        command: &Command,
    ) -> Self {
        Self {
            registry,
            actions,
            action: command.name().to_string(),
            levels: subjects.ancestry(command.subject()).into(),
            pending: VecDeque::new(),
        }
    }
}

impl Iterator for Chain<'_> {
    type Item = OperatorResult<ChainLink>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((subject, entry)) = self.pending.pop_front() {
                let link = self.registry.get_worker(&entry.worker).map(|worker| ChainLink {
                    worker_name: entry.worker,
                    subject,
                    order: entry.order,
                    worker,
                });
                return Some(link);
            }

            let level = self.levels.pop_front()?;
            let entries = self.actions.sorted_entries(&self.action, &level);
            if !entries.is_empty() {
                tracing::debug!(
                    action = %self.action,
                    subject = %level,
                    workers = entries.len(),
                    "chain level matched"
                );
            }
            self.pending = entries
                .into_iter()
                .map(|entry| (level.clone(), entry.clone()))
                .collect();
        }
    }
}
