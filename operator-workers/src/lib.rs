//! 内置 Worker（operator-workers）
//!
//! 为 [`operator_core::Operator`] 提供可直接装配的处理器：
//! - [`MemoryWorker`]：基于 [`MemoryStore`] 的实体存取（find / get / count / save / delete 等）；
//! - [`TranslatorWorker`]：挂在 `after:find` 上，把原始行翻译为实体。
//!
pub mod memory;
pub mod store;
pub mod translator;

pub use memory::MemoryWorker;
pub use store::{MemoryStore, OrderBy, Row};
pub use translator::TranslatorWorker;
