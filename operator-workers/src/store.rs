//! 内存存储（MemoryStore）
//!
//! 以表名分组保存行数据，提供按条件查询、计数、插入、更新、删除等最小接口，
//! 供 [`MemoryWorker`](crate::memory::MemoryWorker) 使用；多个 Worker 可共享同一个实例。
//!
use dashmap::DashMap;
use operator_core::Params;
use serde_json::Value;
use std::cmp::Ordering;

pub type Row = Params;

/// 查询排序：字段名前缀 `-` 表示降序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn parse(expr: &str) -> Self {
        match expr.strip_prefix('-') {
            Some(field) => Self {
                field: field.to_string(),
                descending: true,
            },
            None => Self {
                field: expr.to_string(),
                descending: false,
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<String, Vec<Row>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_by(
        &self,
        table: &str,
        criteria: &Params,
        limit: Option<usize>,
        offset: Option<usize>,
        order: Option<&OrderBy>,
    ) -> Vec<Row> {
        let Some(rows) = self.tables.get(table) else {
            return Vec::new();
        };

        let mut matched: Vec<Row> = rows
            .iter()
            .filter(|row| matches(row, criteria))
            .cloned()
            .collect();
        drop(rows);

        if let Some(order) = order {
            matched.sort_by(|a, b| {
                let ordering = compare(a.get(&order.field), b.get(&order.field));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        matched
            .into_iter()
            .skip(offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }

    pub fn count(&self, table: &str, criteria: &Params) -> usize {
        self.tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| matches(row, criteria)).count())
            .unwrap_or(0)
    }

    pub fn contains(&self, table: &str, id: &Value) -> bool {
        self.tables
            .get(table)
            .is_some_and(|rows| rows.iter().any(|row| row.get("id") == Some(id)))
    }

    pub fn insert(&self, table: &str, row: Row) {
        self.tables.entry(table.to_string()).or_default().push(row);
    }

    /// 合并更新 `id` 对应的行，返回受影响行数
    pub fn update(&self, table: &str, data: Row, id: &Value) -> usize {
        let Some(mut rows) = self.tables.get_mut(table) else {
            return 0;
        };

        let mut affected = 0;
        for row in rows.iter_mut().filter(|row| row.get("id") == Some(id)) {
            for (key, value) in &data {
                row.insert(key.clone(), value.clone());
            }
            affected += 1;
        }
        affected
    }

    pub fn delete(&self, table: &str, id: &Value) -> usize {
        let Some(mut rows) = self.tables.get_mut(table) else {
            return 0;
        };

        let before = rows.len();
        rows.retain(|row| row.get("id") != Some(id));
        before - rows.len()
    }
}

fn matches(row: &Row, criteria: &Params) -> bool {
    criteria
        .iter()
        .all(|(key, expected)| row.get(key).unwrap_or(&Value::Null) == expected)
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert("users", row(json!({"id": 1, "name": "carol", "age": 31})));
        store.insert("users", row(json!({"id": 2, "name": "alice", "age": 25})));
        store.insert("users", row(json!({"id": 3, "name": "bob", "age": 31})));
        store
    }

    fn names(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r["name"].as_str().unwrap()).collect()
    }

    #[test]
    fn select_filters_orders_and_pages() {
        let store = seeded();
        let all = store.select_by("users", &Params::new(), None, None, None);
        assert_eq!(names(&all), ["carol", "alice", "bob"]);

        let by_age = row(json!({"age": 31}));
        let desc = OrderBy::parse("-name");
        let rows = store.select_by("users", &by_age, None, None, Some(&desc));
        assert_eq!(names(&rows), ["carol", "bob"]);

        let asc = OrderBy::parse("name");
        let page = store.select_by("users", &Params::new(), Some(1), Some(1), Some(&asc));
        assert_eq!(names(&page), ["bob"]);
    }

    #[test]
    fn unknown_table_is_empty() {
        let store = MemoryStore::new();
        assert!(store.select_by("nope", &Params::new(), None, None, None).is_empty());
        assert_eq!(store.count("nope", &Params::new()), 0);
        assert_eq!(store.delete("nope", &json!(1)), 0);
    }

    #[test]
    fn update_and_delete_by_id() {
        let store = seeded();
        assert_eq!(store.update("users", row(json!({"age": 26})), &json!(2)), 1);
        assert_eq!(store.count("users", &row(json!({"age": 26}))), 1);

        assert_eq!(store.delete("users", &json!(2)), 1);
        assert!(!store.contains("users", &json!(2)));
        assert_eq!(store.count("users", &Params::new()), 2);
    }
}
