use crate::command::Params;
use parking_lot::RwLock;
use serde_json::Value;

/// 可配置 Worker：与单次调用参数无关的私有设置
///
/// `path` 以 `.` 分隔，逐级进入嵌套对象，例如 `db.table`。
pub trait Configurable: Send + Sync {
    /// 整体替换配置
    fn set_config(&self, config: Params);
    /// 深度合并配置，同名标量以新值为准
    fn add_config(&self, config: Params);
    fn get_config(&self, path: &str) -> Option<Value>;

    fn get_config_or(&self, path: &str, default: Value) -> Value {
        self.get_config(path).unwrap_or(default)
    }
}

/// 基于读写锁的配置容器，Worker 内嵌后转发即可
#[derive(Debug, Default)]
pub struct WorkerConfig {
    inner: RwLock<Params>,
}

impl WorkerConfig {
    pub fn new(defaults: Params) -> Self {
        Self {
            inner: RwLock::new(defaults),
        }
    }

    pub fn snapshot(&self) -> Params {
        self.inner.read().clone()
    }
}

impl Configurable for WorkerConfig {
    fn set_config(&self, config: Params) {
        *self.inner.write() = config;
    }

    fn add_config(&self, config: Params) {
        let mut guard = self.inner.write();
        merge(&mut guard, config);
    }

    fn get_config(&self, path: &str) -> Option<Value> {
        let guard = self.inner.read();
        if path.is_empty() {
            return Some(Value::Object(guard.clone()));
        }

        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = guard.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone())
    }
}

fn merge(target: &mut Params, source: Params) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge(existing, incoming),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}
