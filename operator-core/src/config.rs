//! 配置装载（registration surface）
//!
//! 把静态配置结构翻译为构建器上的 `add_worker` / `add_action` / `set_worker_table` /
//! `set_worker_params` 调用。配置形如：
//!
//! ```json
//! {
//!   "subjects": { "entity": null, "user": "entity" },
//!   "workers": {
//!     "keeper": {
//!       "tableId": 3,
//!       "map": { "find": "user", "after:find": { "user": 10, "": 5 } },
//!       "table": "users"
//!     }
//!   }
//! }
//! ```
//!
//! 保留键 `tableId` 注册表索引（同时保留在参数包中），`map` 注册路由；其余键进入参数包。
//! Worker 实例无法写进 JSON，由 [`WorkerFactory`] 按名称提供。
//!
use crate::{
    command::Params,
    error::{OperatorError, OperatorResult},
    operator::OperatorBuilder,
    registry::TableId,
    worker::Worker,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    collections::{BTreeMap, HashMap},
    io::Read,
    sync::Arc,
};

pub const PARAM_TABLE_ID: &str = "tableId";
pub const PARAM_ACTIONS_MAP: &str = "map";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// 主体类型 -> 直接父类型（`null` 表示挂在根下）
    #[serde(default)]
    pub subjects: BTreeMap<String, Option<String>>,
    /// Worker 名称 -> 设置；保持文档顺序，决定同序 Worker 的注册先后
    #[serde(default)]
    pub workers: Map<String, Value>,
}

impl OperatorConfig {
    pub fn from_json_str(s: &str) -> OperatorResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> OperatorResult<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_value(value: Value) -> OperatorResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// 按配置中的 Worker 名称提供实例
pub trait WorkerFactory {
    /// `params` 为去掉 `map` 之后的参数包
    fn create(&self, name: &str, params: &Params) -> Option<Arc<dyn Worker>>;
}

impl WorkerFactory for HashMap<String, Arc<dyn Worker>> {
    fn create(&self, name: &str, _params: &Params) -> Option<Arc<dyn Worker>> {
        self.get(name).cloned()
    }
}

impl OperatorBuilder {
    /// 按配置依次注册主体类型与 Worker
    pub fn apply_config(
        &mut self,
        config: &OperatorConfig,
        factory: &dyn WorkerFactory,
    ) -> OperatorResult<&mut Self> {
        for (subject, parent) in &config.subjects {
            self.declare_subject(subject, parent.as_deref());
        }
        for (subject, parent) in &config.subjects {
            if let Some(parent) = parent.as_deref().filter(|p| !p.is_empty()) {
                if !config.subjects.contains_key(parent) {
                    tracing::warn!(%subject, %parent, "parent subject type is not declared");
                }
            }
        }

        let empty = Map::new();
        for (name, settings) in &config.workers {
            let settings = match settings {
                Value::Object(map) => map,
                Value::Null => &empty,
                _ => {
                    return Err(OperatorError::Config {
                        reason: format!("settings of worker `{name}` must be an object"),
                    });
                }
            };

            let mut params = Params::new();
            for (key, value) in settings {
                match key.as_str() {
                    PARAM_TABLE_ID => {
                        let table_id =
                            TableId::from_value(value).ok_or_else(|| OperatorError::Config {
                                reason: format!(
                                    "`{PARAM_TABLE_ID}` of worker `{name}` must be a number or string"
                                ),
                            })?;
                        self.set_worker_table(table_id, name.as_str());
                        params.insert(key.clone(), value.clone());
                    }
                    PARAM_ACTIONS_MAP => self.apply_actions_map(name, value)?,
                    _ => {
                        params.insert(key.clone(), value.clone());
                    }
                }
            }

            let worker = factory
                .create(name, &params)
                .ok_or_else(|| OperatorError::Config {
                    reason: format!("no handler provided for worker `{name}`"),
                })?;
            self.add_worker(name.as_str(), worker);
            self.set_worker_params(name.as_str(), params);
        }

        Ok(self)
    }

    /// `map` 的两种写法：`action -> subject` 或 `action -> { subject -> order }`
    fn apply_actions_map(&mut self, worker: &str, map: &Value) -> OperatorResult<()> {
        let Value::Object(actions) = map else {
            return Err(OperatorError::Config {
                reason: format!("`{PARAM_ACTIONS_MAP}` of worker `{worker}` must be an object"),
            });
        };

        for (action, binding) in actions {
            match binding {
                Value::Null => {
                    self.add_action(action, worker, None, 0);
                }
                Value::String(subject) => {
                    self.add_action(action, worker, Some(subject.as_str()), 0);
                }
                Value::Object(by_subject) => {
                    for (subject, order) in by_subject {
                        let order = order.as_i64().ok_or_else(|| OperatorError::Config {
                            reason: format!(
                                "order of `{action}`/`{subject}` for worker `{worker}` must be an integer"
                            ),
                        })?;
                        self.add_action(action, worker, Some(subject.as_str()), order);
                    }
                }
                _ => {
                    return Err(OperatorError::Config {
                        reason: format!(
                            "binding of `{action}` for worker `{worker}` must be a subject or an object"
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        action_map::ActionEntry,
        command::Command,
        worker::{Outcome, worker_fn},
    };
    use serde_json::json;

    fn factory(names: &[&str]) -> HashMap<String, Arc<dyn Worker>> {
        names
            .iter()
            .map(|name| {
                let tag = name.to_string();
                let worker = worker_fn(move |_| Ok(Outcome::done(tag.clone())));
                (name.to_string(), worker)
            })
            .collect()
    }

    #[tokio::test]
    async fn reserved_keys_are_routed() {
        let config = OperatorConfig::from_value(json!({
            "subjects": { "entity": null, "user": "entity" },
            "workers": {
                "keeper": {
                    "tableId": 3,
                    "map": { "find": "entity", "after:find": { "user": 10, "": 5 } },
                    "table": "users"
                }
            }
        }))
        .unwrap();

        let mut b = OperatorBuilder::new();
        b.apply_config(&config, &factory(&["keeper"])).unwrap();

        let map = b.action_map();
        assert_eq!(
            map.entries("find", "entity").unwrap(),
            [ActionEntry { worker: "keeper".into(), order: 0 }]
        );
        assert_eq!(map.entries("after:find", "user").unwrap()[0].order, 10);
        assert_eq!(map.entries("after:find", "").unwrap()[0].order, 5);

        let op = b.build().unwrap();
        assert_eq!(op.worker_param("keeper", "table"), Some(&json!("users")));
        assert_eq!(op.worker_param("keeper", "tableId"), Some(&json!(3)));
        assert_eq!(op.worker_param("keeper", "map"), None);
        assert!(op.get_worker_by_table(3u32).unwrap().is_some());

        let out = op
            .execute(Command::new("find").with_subject("user"))
            .await
            .unwrap();
        assert_eq!(out, json!("keeper"));
    }

    #[test]
    fn document_order_drives_registration_order() {
        let config = OperatorConfig::from_json_str(
            r#"{ "workers": {
                "zeta": { "map": { "save": "" } },
                "alpha": { "map": { "save": "" } }
            } }"#,
        )
        .unwrap();
        let mut b = OperatorBuilder::new();
        b.apply_config(&config, &factory(&["zeta", "alpha"])).unwrap();

        let order: Vec<&str> = b
            .action_map()
            .sorted_entries("save", "")
            .into_iter()
            .map(|e| e.worker.as_str())
            .collect();
        assert_eq!(order, ["zeta", "alpha"]);
    }

    #[test]
    fn missing_handler_is_config_error() {
        let config = OperatorConfig::from_value(json!({ "workers": { "ghost": {} } })).unwrap();
        let err = OperatorBuilder::new()
            .apply_config(&config, &factory(&[]))
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, OperatorError::Config { .. }));
    }

    #[test]
    fn malformed_order_is_config_error() {
        let config = OperatorConfig::from_value(json!({
            "workers": { "w": { "map": { "find": { "user": "high" } } } }
        }))
        .unwrap();
        let err = OperatorBuilder::new()
            .apply_config(&config, &factory(&["w"]))
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, OperatorError::Config { .. }));
    }

    #[test]
    fn invalid_json_is_serde_error() {
        assert!(matches!(
            OperatorConfig::from_json_str("{ not json"),
            Err(OperatorError::Serde { .. })
        ));
    }
}
