//! 命令（Command）
//!
//! 一次调度请求的值对象：动作名、可选的主体类型（subject type）与参数包。
//! 除普通命令外还有两种生命周期变体：
//! - Pre：包装父命令，名称为 `pre:<action>`，主体类型与参数委托给父命令，
//!   前置 Worker 可借此改写父命令；
//! - After：包装父命令与结果栈，名称为 `after:<action>`，后置 Worker 可检查或替换结果。
//!
use crate::error::{OperatorError, OperatorResult};
use bon::Builder;
use serde_json::{Map, Value};

/// 参数包：字符串键到任意值
pub type Params = Map<String, Value>;

/// 内置动作名与生命周期前缀
pub mod action {
    pub const FIND: &str = "find";
    pub const GET: &str = "get";
    pub const COUNT: &str = "count";
    pub const SAVE: &str = "save";
    pub const DELETE: &str = "delete";
    pub const LOAD: &str = "load";
    pub const RESERVE: &str = "reserve";
    pub const CREATE: &str = "create";
    pub const GENERATE_ID: &str = "generate-id";

    pub const PRE_PREFIX: &str = "pre:";
    pub const AFTER_PREFIX: &str = "after:";

    /// `find` -> `pre:find`
    pub fn pre(action: &str) -> String {
        format!("{PRE_PREFIX}{action}")
    }

    /// `find` -> `after:find`
    pub fn after(action: &str) -> String {
        format!("{AFTER_PREFIX}{action}")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
enum CommandKind {
    #[default]
    Plain,
    Pre(Box<Command>),
    After {
        parent: Box<Command>,
        results: ResultStack,
    },
}

/// 调度命令
///
/// 通过 `Command::builder()` 或 [`Command::new`] 构造：
///
/// ```rust
/// use operator_core::command::Command;
/// use serde_json::json;
///
/// let cmd = Command::builder()
///     .name("find")
///     .subject("user")
///     .chainable(true)
///     .build()
///     .with_param("limit", json!(10));
/// assert_eq!(cmd.subject(), Some("user"));
/// ```
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Command {
    #[builder(into)]
    name: String,
    #[builder(into)]
    subject: Option<String>,
    #[builder(default)]
    params: Params,
    /// 为 true 时依次执行链上所有 Worker，否则只执行第一个
    #[builder(default)]
    chainable: bool,
    /// 终结型命令：无论 `chainable` 如何都只执行一个 Worker
    #[builder(default)]
    finally: bool,
    #[builder(skip)]
    kind: CommandKind,
}

impl Command {
    /// 仅有动作名的普通命令（无主体类型、非链式）
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder().name(name).build()
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params_mut().insert(key.into(), value);
        self
    }

    pub fn with_chainable(mut self, chainable: bool) -> Self {
        self.chainable = chainable;
        self
    }

    /// 构造前置命令
    pub fn pre(parent: Command) -> Self {
        Self {
            name: action::pre(parent.name()),
            subject: None,
            params: Params::new(),
            chainable: true,
            finally: false,
            kind: CommandKind::Pre(Box::new(parent)),
        }
    }

    /// 构造后置命令，结果被规整为结果栈
    pub fn after(parent: Command, result: Value) -> Self {
        Self {
            name: action::after(parent.name()),
            subject: None,
            params: Params::new(),
            chainable: true,
            finally: false,
            kind: CommandKind::After {
                parent: Box::new(parent),
                results: ResultStack::from_result(result),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 主体类型；生命周期命令委托给父命令
    pub fn subject(&self) -> Option<&str> {
        match self.parent() {
            Some(parent) => parent.subject(),
            None => self.subject.as_deref().filter(|s| !s.is_empty()),
        }
    }

    pub fn has_subject(&self) -> bool {
        self.subject().is_some()
    }

    pub fn set_subject(&mut self, subject: Option<String>) {
        match &mut self.kind {
            CommandKind::Plain => self.subject = subject,
            CommandKind::Pre(parent) | CommandKind::After { parent, .. } => {
                parent.set_subject(subject)
            }
        }
    }

    pub fn params(&self) -> &Params {
        match self.parent() {
            Some(parent) => parent.params(),
            None => &self.params,
        }
    }

    pub fn params_mut(&mut self) -> &mut Params {
        match &mut self.kind {
            CommandKind::Plain => &mut self.params,
            CommandKind::Pre(parent) | CommandKind::After { parent, .. } => parent.params_mut(),
        }
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params().get(key)
    }

    /// 读取参数，缺失时返回 `default`
    pub fn param_or(&self, key: &str, default: Value) -> Value {
        self.param(key).cloned().unwrap_or(default)
    }

    /// 读取必需参数，缺失时返回 `InvalidArgument`
    pub fn require_param(&self, key: &str) -> OperatorResult<&Value> {
        self.param(key).ok_or_else(|| {
            OperatorError::invalid_argument(format!(
                "command `{}` requires param `{key}`",
                self.name
            ))
        })
    }

    pub fn is_chainable(&self) -> bool {
        match self.kind {
            CommandKind::Plain => self.chainable,
            _ => true,
        }
    }

    pub fn is_finally(&self) -> bool {
        match self.kind {
            CommandKind::Plain => self.finally,
            _ => false,
        }
    }

    /// 是否为 Pre/After 生命周期命令
    pub fn is_lifecycle(&self) -> bool {
        !matches!(self.kind, CommandKind::Plain)
    }

    pub fn is_pre(&self) -> bool {
        matches!(self.kind, CommandKind::Pre(_))
    }

    pub fn is_after(&self) -> bool {
        matches!(self.kind, CommandKind::After { .. })
    }

    pub fn parent(&self) -> Option<&Command> {
        match &self.kind {
            CommandKind::Plain => None,
            CommandKind::Pre(parent) | CommandKind::After { parent, .. } => Some(parent),
        }
    }

    pub fn parent_mut(&mut self) -> Option<&mut Command> {
        match &mut self.kind {
            CommandKind::Plain => None,
            CommandKind::Pre(parent) | CommandKind::After { parent, .. } => Some(parent),
        }
    }

    /// 取出（可能已被前置 Worker 修改的）父命令；非 Pre 命令原样返回
    pub fn extract_parent_command(self) -> Command {
        match self.kind {
            CommandKind::Pre(parent) => *parent,
            _ => self,
        }
    }

    pub fn results(&self) -> Option<&ResultStack> {
        match &self.kind {
            CommandKind::After { results, .. } => Some(results),
            _ => None,
        }
    }

    pub fn results_mut(&mut self) -> Option<&mut ResultStack> {
        match &mut self.kind {
            CommandKind::After { results, .. } => Some(results),
            _ => None,
        }
    }

    /// 用新值替换后置命令的结果（重新规整为结果栈）
    pub fn replace_result(&mut self, value: Value) -> OperatorResult<()> {
        let name = self.name.clone();
        let results = self.results_mut().ok_or_else(|| {
            OperatorError::invalid_argument(format!("command `{name}` carries no result"))
        })?;
        *results = ResultStack::from_result(value);
        Ok(())
    }

    /// 取出最终结果；非 After 命令返回 `Null`
    pub fn extract_result(self) -> Value {
        match self.kind {
            CommandKind::After { results, .. } => results.into_result(),
            _ => Value::Null,
        }
    }
}

/// 结果栈：后置处理看到的是完整的结果序列，而不只是一个标量
///
/// 标量结果被包装为单元素栈；数组结果按元素入栈，并记住其原本是序列。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultStack {
    items: Vec<Value>,
    sequence: bool,
}

impl ResultStack {
    pub fn from_result(result: Value) -> Self {
        match result {
            Value::Array(items) => Self {
                items,
                sequence: true,
            },
            other => Self {
                items: vec![other],
                sequence: false,
            },
        }
    }

    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.items.pop()
    }

    /// 栈顶元素
    pub fn top(&self) -> Option<&Value> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 原始结果是否为序列
    pub fn is_sequence(&self) -> bool {
        self.sequence
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    pub fn items_mut(&mut self) -> &mut Vec<Value> {
        &mut self.items
    }

    /// 还原为结果值：序列还原为数组，否则取栈顶（空栈为 `Null`）
    pub fn into_result(mut self) -> Value {
        if self.sequence {
            Value::Array(self.items)
        } else {
            self.items.pop().unwrap_or(Value::Null)
        }
    }
}
