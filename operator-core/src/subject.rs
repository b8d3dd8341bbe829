//! 主体类型层级（subject hierarchy）
//!
//! 每个主体类型声明其直接父类型，`freeze` 时一次性展开为祖先列表并缓存：
//! `[自身, 父, 祖父, ..., ""]`。调度时只查表，不做运行时反射。
//!
use crate::{
    action_map::ROOT_SUBJECT,
    error::{OperatorError, OperatorResult},
};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct SubjectHierarchy {
    parents: HashMap<String, Option<String>>,
    ancestry: HashMap<String, Vec<String>>,
}

impl SubjectHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明主体类型及其直接父类型；重复声明以最后一次为准
    pub fn declare(&mut self, subject: &str, parent: Option<&str>) {
        let parent = parent.filter(|p| !p.is_empty()).map(str::to_string);
        self.parents.insert(subject.to_string(), parent);
        self.ancestry.clear();
    }

    pub fn parent_of(&self, subject: &str) -> Option<&str> {
        self.parents.get(subject).and_then(|p| p.as_deref())
    }

    /// 展开并缓存全部祖先列表；存在环时返回 `CyclicSubjectType`
    pub fn freeze(&mut self) -> OperatorResult<()> {
        let mut ancestry = HashMap::with_capacity(self.parents.len());
        for subject in self.parents.keys() {
            ancestry.insert(subject.clone(), self.walk(subject)?);
        }
        self.ancestry = ancestry;
        Ok(())
    }

    fn walk(&self, subject: &str) -> OperatorResult<Vec<String>> {
        let mut levels = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(subject);

        while let Some(level) = current {
            if !seen.insert(level) {
                return Err(OperatorError::CyclicSubjectType {
                    subject: subject.to_string(),
                });
            }
            levels.push(level.to_string());
            current = self.parent_of(level);
        }

        levels.push(ROOT_SUBJECT.to_string());
        Ok(levels)
    }

    /// 从最具体到根的层级序列，最后一项总是根层级 `""`
    ///
    /// 未声明的主体类型视为直接挂在根下。
    pub fn ancestry(&self, subject: Option<&str>) -> Vec<String> {
        match subject.filter(|s| !s.is_empty()) {
            None => vec![ROOT_SUBJECT.to_string()],
            Some(subject) => match self.ancestry.get(subject) {
                Some(levels) => levels.clone(),
                None => vec![subject.to_string(), ROOT_SUBJECT.to_string()],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestry_walks_to_root() {
        let mut h = SubjectHierarchy::new();
        h.declare("entity", None);
        h.declare("user", Some("entity"));
        h.declare("admin", Some("user"));
        h.freeze().unwrap();

        assert_eq!(h.ancestry(Some("admin")), ["admin", "user", "entity", ""]);
        assert_eq!(h.ancestry(Some("entity")), ["entity", ""]);
        assert_eq!(h.ancestry(None), [""]);
        assert_eq!(h.ancestry(Some("")), [""]);
    }

    #[test]
    fn undeclared_subject_hangs_off_root() {
        let mut h = SubjectHierarchy::new();
        h.freeze().unwrap();
        assert_eq!(h.ancestry(Some("order")), ["order", ""]);
    }

    #[test]
    fn undeclared_parent_terminates_walk() {
        let mut h = SubjectHierarchy::new();
        h.declare("sub", Some("base"));
        h.freeze().unwrap();
        assert_eq!(h.ancestry(Some("sub")), ["sub", "base", ""]);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut h = SubjectHierarchy::new();
        h.declare("a", Some("b"));
        h.declare("b", Some("a"));
        assert!(matches!(
            h.freeze(),
            Err(OperatorError::CyclicSubjectType { .. })
        ));
    }
}
