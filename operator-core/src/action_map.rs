//! 路由表（Action Map）
//!
//! 动作名 -> 主体类型 -> 有序的 `(worker, order)` 列表。空字符串主体类型表示根层级：
//! 无论命令声明何种类型，祖先遍历最后都会经过它。
//!
//! 重复的 `add_action` 不会去重，同一 Worker 被注册两次就会在链上执行两次。
//!
use serde::Serialize;
use std::collections::HashMap;

/// 根层级的主体类型
pub const ROOT_SUBJECT: &str = "";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionEntry {
    pub worker: String,
    pub order: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionMap {
    actions: HashMap<String, HashMap<String, Vec<ActionEntry>>>,
}

impl ActionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在 `(action, subject)` 下追加一条记录；`subject` 为 `None` 时挂在根层级
    pub fn add_action(&mut self, action: &str, worker: &str, subject: Option<&str>, order: i64) {
        let subject = subject.unwrap_or(ROOT_SUBJECT);
        self.actions
            .entry(action.to_string())
            .or_default()
            .entry(subject.to_string())
            .or_default()
            .push(ActionEntry {
                worker: worker.to_string(),
                order,
            });
    }

    /// 注册顺序的原始记录
    pub fn entries(&self, action: &str, subject: &str) -> Option<&[ActionEntry]> {
        self.actions
            .get(action)
            .and_then(|by_subject| by_subject.get(subject))
            .map(Vec::as_slice)
    }

    /// 按 `order` 升序稳定排序后的记录，同序保持注册顺序
    pub fn sorted_entries(&self, action: &str, subject: &str) -> Vec<&ActionEntry> {
        let mut entries: Vec<&ActionEntry> = self
            .entries(action, subject)
            .map(|e| e.iter().collect())
            .unwrap_or_default();
        entries.sort_by_key(|e| e.order);
        entries
    }

    pub fn contains(&self, action: &str, subject: &str) -> bool {
        self.entries(action, subject).is_some()
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entries: &[&ActionEntry]) -> Vec<String> {
        entries.iter().map(|e| e.worker.clone()).collect()
    }

    #[test]
    fn sort_is_stable_by_order() {
        let mut map = ActionMap::new();
        map.add_action("act", "A", Some("T"), 5);
        map.add_action("act", "B", Some("T"), 1);
        map.add_action("act", "C", Some("T"), 5);

        assert_eq!(names(&map.sorted_entries("act", "T")), ["B", "A", "C"]);
        // 原始记录仍保持注册顺序
        let raw: Vec<&str> = map
            .entries("act", "T")
            .unwrap()
            .iter()
            .map(|e| e.worker.as_str())
            .collect();
        assert_eq!(raw, ["A", "B", "C"]);
    }

    #[test]
    fn missing_subject_lands_on_root() {
        let mut map = ActionMap::new();
        map.add_action("get", "keeper", None, 0);
        assert!(map.contains("get", ROOT_SUBJECT));
        assert!(!map.contains("get", "user"));
        assert!(map.sorted_entries("find", ROOT_SUBJECT).is_empty());
    }

    #[test]
    fn duplicates_are_kept() {
        let mut map = ActionMap::new();
        map.add_action("save", "audit", Some("user"), 0);
        map.add_action("save", "audit", Some("user"), 0);
        assert_eq!(map.entries("save", "user").unwrap().len(), 2);
    }
}
