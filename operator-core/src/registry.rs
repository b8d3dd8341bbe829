//! Worker 注册表
//!
//! 按名称保存可执行的 Worker、每个 Worker 的私有参数包，以及
//! 表标识（table id）到 Worker 名称的二级索引。重复注册同名 Worker 会静默覆盖。
//!
use crate::{
    command::Params,
    error::{OperatorError, OperatorResult},
    worker::Worker,
};
use serde_json::Value;
use std::{collections::HashMap, fmt, sync::Arc};

/// 不透明的表标识，数字与字符串统一按字符串存储
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(String);

impl TableId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 从配置值构造，仅接受数字或字符串
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self(n.to_string())),
            Value::String(s) => Some(Self(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TableId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TableId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u32> for TableId {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for TableId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Default)]
pub struct WorkerRegistry {
    workers: HashMap<String, Arc<dyn Worker>>,
    params: HashMap<String, Params>,
    tables: HashMap<TableId, String>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 Worker；同名覆盖
    pub fn add_worker(&mut self, name: impl Into<String>, worker: Arc<dyn Worker>) {
        let name = name.into();
        if self.workers.insert(name.clone(), worker).is_some() {
            tracing::debug!(worker = %name, "worker replaced");
        }
    }

    pub fn get_worker(&self, name: &str) -> OperatorResult<Arc<dyn Worker>> {
        self.workers
            .get(name)
            .cloned()
            .ok_or_else(|| OperatorError::WorkerNotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.workers.contains_key(name)
    }

    pub fn worker_names(&self) -> impl Iterator<Item = &str> {
        self.workers.keys().map(String::as_str)
    }

    pub(crate) fn workers(&self) -> impl Iterator<Item = (&str, &Arc<dyn Worker>)> {
        self.workers.iter().map(|(name, w)| (name.as_str(), w))
    }

    pub fn set_worker_params(&mut self, name: impl Into<String>, params: Params) {
        self.params.insert(name.into(), params);
    }

    /// Worker 的完整参数包；未设置时为 `None`
    pub fn worker_params(&self, name: &str) -> Option<&Params> {
        self.params.get(name)
    }

    /// 读取 Worker 参数包中的单个键；缺失返回 `None`，从不报错
    pub fn worker_param(&self, name: &str, key: &str) -> Option<&Value> {
        self.params.get(name).and_then(|p| p.get(key))
    }

    pub fn all_worker_params(&self) -> &HashMap<String, Params> {
        &self.params
    }

    /// 表标识 -> Worker 名称；后设置者覆盖
    pub fn set_worker_table(&mut self, table_id: impl Into<TableId>, name: impl Into<String>) {
        self.tables.insert(table_id.into(), name.into());
    }

    /// 按表标识查找 Worker：未映射返回 `Ok(None)`，映射到未注册名称返回 `WorkerNotFound`
    pub fn get_worker_by_table(&self, table_id: &TableId) -> OperatorResult<Option<Arc<dyn Worker>>> {
        match self.tables.get(table_id) {
            Some(name) => self.get_worker(name).map(Some),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.worker_names().collect();
        names.sort_unstable();
        f.debug_struct("WorkerRegistry")
            .field("workers", &names)
            .field("params", &self.params)
            .field("tables", &self.tables)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{Outcome, worker_fn};
    use serde_json::json;

    fn constant(value: i64) -> Arc<dyn Worker> {
        worker_fn(move |_| Ok(Outcome::done(value)))
    }

    #[test]
    fn get_worker_fails_for_unknown_name() {
        let registry = WorkerRegistry::new();
        match registry.get_worker("ghost") {
            Err(OperatorError::WorkerNotFound { name }) => assert_eq!(name, "ghost"),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected WorkerNotFound"),
        }
    }

    #[tokio::test]
    async fn re_adding_a_name_overwrites() {
        let mut registry = WorkerRegistry::new();
        registry.add_worker("w", constant(1));
        registry.add_worker("w", constant(2));

        let worker = registry.get_worker("w").unwrap();
        let out = worker.execute(&mut crate::command::Command::new("x")).await.unwrap();
        assert_eq!(out, Outcome::done(2));
    }

    #[test]
    fn worker_params_absent_key_is_none() {
        let mut registry = WorkerRegistry::new();
        let mut params = Params::new();
        params.insert("table".into(), json!("users"));
        registry.set_worker_params("keeper", params);

        assert_eq!(registry.worker_param("keeper", "table"), Some(&json!("users")));
        assert_eq!(registry.worker_param("keeper", "missing"), None);
        assert_eq!(registry.worker_param("nobody", "table"), None);
        assert!(registry.worker_params("nobody").is_none());
    }

    #[test]
    fn table_index_resolves_and_reports_dangling_names() {
        let mut registry = WorkerRegistry::new();
        registry.add_worker("keeper", constant(0));
        registry.set_worker_table(7u32, "keeper");
        registry.set_worker_table("orphans", "ghost");

        assert!(registry.get_worker_by_table(&TableId::from(7u32)).unwrap().is_some());
        assert!(registry.get_worker_by_table(&TableId::from("nope")).unwrap().is_none());
        assert!(matches!(
            registry.get_worker_by_table(&TableId::from("orphans")),
            Err(OperatorError::WorkerNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn last_table_mapping_wins() {
        let mut registry = WorkerRegistry::new();
        registry.add_worker("old", constant(1));
        registry.add_worker("new", constant(2));
        registry.set_worker_table(7u32, "old");
        registry.set_worker_table(7u32, "new");

        let worker = registry
            .get_worker_by_table(&TableId::from(7u32))
            .unwrap()
            .unwrap();
        let out = worker.execute(&mut crate::command::Command::new("x")).await.unwrap();
        assert_eq!(out, Outcome::done(2));
    }

    #[test]
    fn table_id_from_config_value() {
        assert_eq!(TableId::from_value(&json!(12)), Some(TableId::from(12u32)));
        assert_eq!(TableId::from_value(&json!("t")), Some(TableId::from("t")));
        assert_eq!(TableId::from_value(&json!(true)), None);
    }
}
