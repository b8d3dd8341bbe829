//! 调度器（Operator）
//!
//! 唯一的公共入口 `execute`，单次调用的状态机：
//! 1. PreExecute：普通命令包装为 `pre:<action>` 命令并走同一套调度，之后取回（可能被改写的）父命令；
//! 2. 主调度：按链路解析结果依次执行 Worker，应用 TryNext / Break 信号；
//! 3. AfterExecute：结果规整为结果栈，包装为 `after:<action>` 命令调度，之后取回（可能被替换的）结果。
//!
//! Pre/After 命令本身不会再被包装，递归深度因此有界。
//! 除两种链路控制信号外，Worker 返回的任何错误都原样向上传播。
//!
use crate::{
    action_map::ActionMap,
    chain::Chain,
    command::{Command, Params},
    error::OperatorResult,
    registry::{TableId, WorkerRegistry},
    subject::SubjectHierarchy,
    worker::{Outcome, Worker},
};
use serde_json::Value;
use std::{fmt, future::Future, pin::Pin, sync::Arc};
use tracing::Instrument;

type DispatchFuture<'a, T> = Pin<Box<dyn Future<Output = OperatorResult<T>> + Send + 'a>>;

/// 冻结后的调度器：注册表、路由表与主体层级在构建后只读
pub struct Operator {
    registry: WorkerRegistry,
    actions: ActionMap,
    subjects: SubjectHierarchy,
}

impl Operator {
    pub fn builder() -> OperatorBuilder {
        OperatorBuilder::default()
    }

    pub fn get_worker(&self, name: &str) -> OperatorResult<Arc<dyn Worker>> {
        self.registry.get_worker(name)
    }

    pub fn get_worker_by_table(
        &self,
        table_id: impl Into<TableId>,
    ) -> OperatorResult<Option<Arc<dyn Worker>>> {
        self.registry.get_worker_by_table(&table_id.into())
    }

    pub fn worker_params(&self, name: &str) -> Option<&Params> {
        self.registry.worker_params(name)
    }

    pub fn worker_param(&self, name: &str, key: &str) -> Option<&Value> {
        self.registry.worker_param(name, key)
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    /// 路由表只读快照
    pub fn action_map(&self) -> &ActionMap {
        &self.actions
    }

    pub fn subjects(&self) -> &SubjectHierarchy {
        &self.subjects
    }

    /// 解析命令对应的 Worker 链
    pub fn chain(&self, command: &Command) -> Chain<'_> {
        Chain::resolve(&self.registry, &self.actions, &self.subjects, command)
    }

    /// 调度命令并返回最终结果；无匹配 Worker 时返回 `Null`
    pub fn execute(&self, command: Command) -> DispatchFuture<'_, Value> {
        let span = tracing::debug_span!(
            "execute",
            action = %command.name(),
            subject = command.subject().unwrap_or_default(),
        );

        Box::pin(
            async move {
                let (command, result) = self.run(command).await?;
                self.after_execute(command, result).await
            }
            .instrument(span),
        )
    }

    /// 前置拦截：返回供主调度继续使用的命令
    pub async fn pre_execute(&self, command: Command) -> OperatorResult<Command> {
        if command.is_lifecycle() {
            return Ok(command);
        }

        tracing::debug!(action = %command.name(), "pre-execute");
        let (pre, _) = self.run(Command::pre(command)).await?;
        Ok(pre.extract_parent_command())
    }

    /// 后置拦截：返回交给调用方的最终结果
    pub async fn after_execute(&self, command: Command, result: Value) -> OperatorResult<Value> {
        if command.is_lifecycle() {
            return Ok(result);
        }

        tracing::debug!(action = %command.name(), "after-execute");
        let (after, _) = self.run(Command::after(command, result)).await?;
        Ok(after.extract_result())
    }

    /// 前置拦截 + 主调度，返回调度后的命令与结果
    fn run(&self, command: Command) -> DispatchFuture<'_, (Command, Value)> {
        Box::pin(async move {
            let mut command = self.pre_execute(command).await?;
            let result = self.dispatch(&mut command).await?;
            Ok((command, result))
        })
    }

    async fn dispatch(&self, command: &mut Command) -> OperatorResult<Value> {
        let mut result = Value::Null;
        // TryNext 之后单次命令也会跑完剩余 Worker，直到 Break
        let mut stop_after_first = !command.is_chainable() || command.is_finally();

        for link in self.chain(command) {
            let link = link?;
            tracing::trace!(
                action = %command.name(),
                worker = %link.worker_name,
                level = %link.subject,
                order = link.order,
                "invoke worker"
            );

            let stop = match link.worker.execute(command).await? {
                Outcome::Done(value) => {
                    result = value;
                    stop_after_first
                }
                Outcome::TryNext => {
                    tracing::debug!(worker = %link.worker_name, "try next");
                    stop_after_first = false;
                    false
                }
                Outcome::Break(value) => {
                    tracing::debug!(worker = %link.worker_name, "break chain");
                    if let Some(value) = value {
                        result = value;
                    }
                    true
                }
            };

            if stop {
                break;
            }
        }

        Ok(result)
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("registry", &self.registry)
            .field("actions", &self.actions)
            .field("subjects", &self.subjects)
            .finish()
    }
}

/// 注册阶段的构建器，`build()` 之后得到只读的 `Arc<Operator>`
#[derive(Debug, Default)]
pub struct OperatorBuilder {
    registry: WorkerRegistry,
    actions: ActionMap,
    subjects: SubjectHierarchy,
}

impl OperatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_worker(&mut self, name: impl Into<String>, worker: Arc<dyn Worker>) -> &mut Self {
        self.registry.add_worker(name, worker);
        self
    }

    pub fn set_worker_params(&mut self, name: impl Into<String>, params: Params) -> &mut Self {
        self.registry.set_worker_params(name, params);
        self
    }

    pub fn set_worker_table(
        &mut self,
        table_id: impl Into<TableId>,
        name: impl Into<String>,
    ) -> &mut Self {
        self.registry.set_worker_table(table_id, name);
        self
    }

    /// 在 `(action, subject)` 下追加 Worker；`subject` 为 `None` 即根层级
    pub fn add_action(
        &mut self,
        action: &str,
        worker: &str,
        subject: Option<&str>,
        order: i64,
    ) -> &mut Self {
        self.actions.add_action(action, worker, subject, order);
        self
    }

    /// 声明主体类型及其直接父类型
    pub fn declare_subject(&mut self, subject: &str, parent: Option<&str>) -> &mut Self {
        self.subjects.declare(subject, parent);
        self
    }

    pub fn action_map(&self) -> &ActionMap {
        &self.actions
    }

    /// 冻结：展开主体层级、向可配置 Worker 注入参数包、为委托型 Worker 绑定回引用
    pub fn build(self) -> OperatorResult<Arc<Operator>> {
        let Self {
            registry,
            actions,
            mut subjects,
        } = self;
        subjects.freeze()?;

        for (name, worker) in registry.workers() {
            if let (Some(configurable), Some(params)) =
                (worker.configurable(), registry.worker_params(name))
            {
                configurable.add_config(params.clone());
            }
        }

        let operator = Arc::new_cyclic(|weak| {
            for (_, worker) in registry.workers() {
                if let Some(delegating) = worker.delegating() {
                    delegating.attach(weak.clone());
                }
            }
            Operator {
                registry,
                actions,
                subjects,
            }
        });

        tracing::debug!(
            workers = operator.registry.worker_names().count(),
            "operator built"
        );
        Ok(operator)
    }
}
