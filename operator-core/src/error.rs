//! 调度核心统一错误定义
//!
//! 覆盖注册表查找、命令参数、主体类型层级、配置装载与 Worker 失败等最小必要集合。
//! 链路控制信号（TryNext / Break）不在此列，它们是 [`Outcome`](crate::worker::Outcome)
//! 的变体，由 Operator 的执行循环直接消费。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum OperatorError {
    // --- 注册表 ---
    #[error("worker not found: {name}")]
    WorkerNotFound { name: String },
    #[error("command not supported: worker={worker}, command={command}")]
    NotSupported { worker: String, command: String },

    // --- 命令与参数 ---
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    // --- 装配 ---
    #[error("cyclic subject type: {subject}")]
    CyclicSubjectType { subject: String },
    #[error("config error: {reason}")]
    Config { reason: String },
    #[error("operator is not attached or already dropped")]
    OperatorUnavailable,

    // --- 通用 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("worker failure: {0}")]
    Worker(#[from] anyhow::Error),
}

/// 统一 Result 类型别名
pub type OperatorResult<T> = Result<T, OperatorError>;

impl OperatorError {
    pub fn not_supported(worker: impl Into<String>, command: impl Into<String>) -> Self {
        Self::NotSupported {
            worker: worker.into(),
            command: command.into(),
        }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}
