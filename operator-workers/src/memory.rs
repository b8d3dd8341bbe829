//! 内存 Keeper Worker
//!
//! 以 [`MemoryStore`] 为后端处理 `find` / `get` / `count` / `save` / `delete` /
//! `create` / `load` / `reserve` / `generate-id`。实体字段通过配置中的 `fields`
//! 显式声明，`load` 与 `reserve` 只处理这些字段。
//!
//! 配置键：
//! - `table`：表名，默认 `entities`；
//! - `fields`：字段列表，默认 `["id", "created", "changed", "owner"]`；
//! - `tableId`：1..=255 的整数，`generate-id` 必需。
//!
use crate::store::{MemoryStore, OrderBy, Row};
use async_trait::async_trait;
use operator_core::{
    Command, Configurable, OperatorError, OperatorResult, Outcome, Params, Worker,
    command::action, config::PARAM_TABLE_ID, worker::WorkerConfig,
};
use serde_json::{Value, json};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

pub const DEFAULT_TABLE: &str = "entities";
pub const DEFAULT_FIELDS: [&str; 4] = ["id", "created", "changed", "owner"];
/// `create` 生成的实体上标记主体类型的键
pub const TYPE_KEY: &str = "@type";
pub const DEFAULT_SUBJECT: &str = "entity";

const WORKER_NAME: &str = "memory";

pub struct MemoryWorker {
    store: Arc<MemoryStore>,
    config: WorkerConfig,
    sequence: AtomicU64,
}

impl MemoryWorker {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        let mut defaults = Params::new();
        defaults.insert("table".into(), json!(DEFAULT_TABLE));
        defaults.insert("fields".into(), json!(DEFAULT_FIELDS));
        Self {
            store,
            config: WorkerConfig::new(defaults),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn table(&self) -> String {
        self.config
            .get_config("table")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_TABLE.to_string())
    }

    pub fn fields(&self) -> Vec<String> {
        match self.config.get_config("fields") {
            Some(Value::Array(fields)) => fields
                .iter()
                .filter_map(|f| f.as_str().map(str::to_string))
                .collect(),
            _ => DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn find(
        &self,
        criteria: &Params,
        limit: Option<usize>,
        offset: Option<usize>,
        order: Option<&OrderBy>,
    ) -> Value {
        let rows = self
            .store
            .select_by(&self.table(), criteria, limit, offset, order);
        Value::Array(rows.into_iter().map(Value::Object).collect())
    }

    pub fn get(&self, id: &Value) -> Value {
        if id.is_null() {
            return Value::Null;
        }
        let mut criteria = Params::new();
        criteria.insert("id".into(), id.clone());
        self.store
            .select_by(&self.table(), &criteria, Some(1), None, None)
            .into_iter()
            .next()
            .map(Value::Object)
            .unwrap_or(Value::Null)
    }

    pub fn count(&self, criteria: &Params) -> usize {
        self.store.count(&self.table(), criteria)
    }

    /// 已存在的 id 走更新，否则插入（缺 id 时自动分配），返回 id
    pub fn save(&self, mut data: Row) -> OperatorResult<Value> {
        let table = self.table();
        match data.get("id").cloned().filter(|id| !id.is_null()) {
            Some(id) if self.store.contains(&table, &id) => {
                data.remove("id");
                self.store.update(&table, data, &id);
                Ok(id)
            }
            Some(id) => {
                self.store.insert(&table, data);
                Ok(id)
            }
            None => {
                let id = json!(self.assign_id()?);
                data.insert("id".into(), id.clone());
                self.store.insert(&table, data);
                Ok(id)
            }
        }
    }

    pub fn delete(&self, id: &Value) -> usize {
        self.store.delete(&self.table(), id)
    }

    /// 新实体：类型标记 + 所有字段置空
    pub fn create(&self, subject: &str) -> Value {
        let mut entity = Params::new();
        entity.insert(TYPE_KEY.into(), json!(subject));
        for field in self.fields() {
            entity.insert(field, Value::Null);
        }
        Value::Object(entity)
    }

    /// 把 `data` 中已声明且非空的字段写入实体
    pub fn load(&self, mut entity: Params, data: &Params) -> Value {
        for field in self.fields() {
            if let Some(value) = data.get(&field).filter(|v| !v.is_null()) {
                entity.insert(field, value.clone());
            }
        }
        Value::Object(entity)
    }

    /// 把实体的已声明字段导出为可存储的行
    pub fn reserve(&self, entity: &Params) -> Value {
        let mut row = Row::new();
        for field in self.fields() {
            if let Some(value) = entity.get(&field) {
                row.insert(field, reserve_value(value));
            }
        }
        Value::Object(row)
    }

    /// `(sequence << 8) | tableId`
    pub fn generate_id(&self) -> OperatorResult<u64> {
        let raw = self.config.get_config(PARAM_TABLE_ID).unwrap_or(Value::Null);
        let table_id = raw
            .as_u64()
            .or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok()))
            .filter(|id| (1..=255).contains(id))
            .ok_or_else(|| {
                OperatorError::invalid_argument(format!(
                    "Table id {} not in range",
                    display_table_id(&raw)
                ))
            })?;

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        Ok((sequence << 8) | table_id)
    }

    fn assign_id(&self) -> OperatorResult<u64> {
        if self.config.get_config(PARAM_TABLE_ID).is_some() {
            self.generate_id()
        } else {
            Ok(self.sequence.fetch_add(1, Ordering::Relaxed) + 1)
        }
    }
}

#[async_trait]
impl Worker for MemoryWorker {
    async fn execute(&self, command: &mut Command) -> OperatorResult<Outcome> {
        let value = match command.name() {
            action::FIND => {
                let criteria = object_param(command, "criteria")?.unwrap_or_default();
                let limit = usize_param(command, "limit");
                let offset = usize_param(command, "offset");
                let order = command
                    .param("order")
                    .and_then(Value::as_str)
                    .map(OrderBy::parse);
                self.find(&criteria, limit, offset, order.as_ref())
            }
            action::GET => self.get(&command.param_or("id", Value::Null)),
            action::COUNT => {
                let criteria = object_param(command, "criteria")?.unwrap_or_default();
                json!(self.count(&criteria))
            }
            action::SAVE => {
                let data = required_object(command, "data")?;
                self.save(data)?
            }
            action::DELETE => json!(self.delete(command.require_param("id")?)),
            action::CREATE => self.create(command.subject().unwrap_or(DEFAULT_SUBJECT)),
            action::LOAD => {
                let entity = required_object(command, "entity")?;
                let data = required_object(command, "data")?;
                self.load(entity, &data)
            }
            action::RESERVE => {
                let entity = required_object(command, "entity")?;
                self.reserve(&entity)
            }
            action::GENERATE_ID => json!(self.generate_id()?),
            other => return Err(OperatorError::not_supported(WORKER_NAME, other)),
        };

        tracing::trace!(action = %command.name(), table = %self.table(), "memory worker handled");
        Ok(Outcome::Done(value))
    }

    fn configurable(&self) -> Option<&dyn Configurable> {
        Some(&self.config)
    }
}

/// 错误信息里的 tableId：字符串不带引号，缺失为空
fn display_table_id(raw: &Value) -> String {
    match raw {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn reserve_value(value: &Value) -> Value {
    match value {
        Value::Object(nested) => match nested.get("id") {
            Some(Value::String(id)) => json!(id),
            Some(id) if !id.is_null() => json!(id.to_string()),
            _ => value.clone(),
        },
        Value::Bool(true) => json!("t"),
        Value::Bool(false) => json!("f"),
        other => other.clone(),
    }
}

fn object_param(command: &Command, key: &str) -> OperatorResult<Option<Params>> {
    match command.param(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map.clone())),
        Some(_) => Err(OperatorError::invalid_argument(format!(
            "param `{key}` of `{}` must be an object",
            command.name()
        ))),
    }
}

fn required_object(command: &Command, key: &str) -> OperatorResult<Params> {
    command.require_param(key)?;
    object_param(command, key)?.ok_or_else(|| {
        OperatorError::invalid_argument(format!(
            "param `{key}` of `{}` must be an object",
            command.name()
        ))
    })
}

fn usize_param(command: &Command, key: &str) -> Option<usize> {
    command
        .param(key)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn worker_with(config: Value) -> MemoryWorker {
        let worker = MemoryWorker::new(Arc::new(MemoryStore::new()));
        worker.config.add_config(params(config));
        worker
    }

    #[test]
    fn generate_id_checks_range() {
        let worker = worker_with(json!({"tableId": 7}));
        assert_eq!(worker.generate_id().unwrap(), (1 << 8) | 7);
        assert_eq!(worker.generate_id().unwrap(), (2 << 8) | 7);

        for bad in [json!(0), json!(256), json!("x"), Value::Null] {
            let worker = worker_with(json!({ "tableId": bad }));
            match worker.generate_id() {
                Err(OperatorError::InvalidArgument { reason }) => {
                    assert!(reason.contains("not in range"))
                }
                other => panic!("unexpected: {other:?}"),
            }
        }
    }

    #[test]
    fn out_of_range_message_shows_plain_table_id() {
        let message = |config: Value| match worker_with(config).generate_id() {
            Err(OperatorError::InvalidArgument { reason }) => reason,
            other => panic!("unexpected: {other:?}"),
        };
        assert_eq!(message(json!({"tableId": "x"})), "Table id x not in range");
        assert_eq!(message(json!({"tableId": 300})), "Table id 300 not in range");
        assert_eq!(message(json!({})), "Table id  not in range");
    }

    #[test]
    fn save_inserts_then_updates() {
        let worker = worker_with(json!({"table": "users", "tableId": 2}));
        let id = worker.save(params(json!({"name": "alice"}))).unwrap();
        assert_eq!(id, json!((1 << 8) | 2));

        worker
            .save(params(json!({"id": id.clone(), "name": "alicia"})))
            .unwrap();
        assert_eq!(worker.count(&Params::new()), 1);
        assert_eq!(worker.get(&id)["name"], json!("alicia"));
        assert!(worker.store().contains("users", &id));
    }

    #[test]
    fn load_and_reserve_only_touch_declared_fields() {
        let worker = worker_with(json!({"fields": ["id", "name", "active", "owner"]}));
        let entity = worker.create("user");
        assert_eq!(
            entity,
            json!({"@type": "user", "id": null, "name": null, "active": null, "owner": null})
        );

        let loaded = worker.load(
            params(entity),
            &params(json!({"id": 5, "name": "bob", "secret": "x", "owner": null})),
        );
        assert_eq!(loaded["name"], json!("bob"));
        assert!(loaded.get("secret").is_none());

        let mut entity = params(loaded);
        entity.insert("active".into(), json!(true));
        entity.insert("owner".into(), json!({"@type": "user", "id": 9}));
        let row = worker.reserve(&entity);
        assert_eq!(
            row,
            json!({"id": 5, "name": "bob", "active": "t", "owner": "9"})
        );
    }

    #[tokio::test]
    async fn unknown_action_is_not_supported() {
        let worker = worker_with(json!({}));
        let err = worker
            .execute(&mut Command::new("teleport"))
            .await
            .unwrap_err();
        assert!(matches!(err, OperatorError::NotSupported { .. }));
    }

    #[tokio::test]
    async fn find_params_are_validated() {
        let worker = worker_with(json!({}));
        let mut cmd = Command::new(action::FIND).with_param("criteria", json!([1]));
        assert!(matches!(
            worker.execute(&mut cmd).await,
            Err(OperatorError::InvalidArgument { .. })
        ));
    }
}
