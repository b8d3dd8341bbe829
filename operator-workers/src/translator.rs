//! 数据到实体的翻译 Worker
//!
//! 挂在 `after:find` 上：把查询得到的原始行逐个交给 Operator 执行
//! `create`（按命令主体类型）与 `load`，并用得到的实体替换结果。
//! 序列结果保持为序列，单值结果保持为单值，`null` 原样保留。
//!
use async_trait::async_trait;
use operator_core::{
    Command, Delegating, OperatorError, OperatorResult, Outcome, Worker, command::action,
    worker::OperatorLink,
};
use serde_json::Value;

use crate::memory::DEFAULT_SUBJECT;

const WORKER_NAME: &str = "translator";

#[derive(Debug, Default)]
pub struct TranslatorWorker {
    link: OperatorLink,
}

impl TranslatorWorker {
    pub fn new() -> Self {
        Self::default()
    }

    async fn translate(&self, subject: &str, item: Value) -> OperatorResult<Value> {
        let data = match item {
            Value::Null => return Ok(Value::Null),
            Value::Object(data) => data,
            other => {
                return Err(OperatorError::invalid_argument(format!(
                    "cannot translate non-object row: {other}"
                )));
            }
        };

        let operator = self.link.operator()?;
        let entity = operator
            .execute(Command::new(action::CREATE).with_subject(subject))
            .await?;
        operator
            .execute(
                Command::new(action::LOAD)
                    .with_subject(subject)
                    .with_param("entity", entity)
                    .with_param("data", Value::Object(data)),
            )
            .await
    }
}

#[async_trait]
impl Worker for TranslatorWorker {
    async fn execute(&self, command: &mut Command) -> OperatorResult<Outcome> {
        if command.name() != action::after(action::FIND) {
            return Err(OperatorError::not_supported(WORKER_NAME, command.name()));
        }

        let subject = command.subject().unwrap_or(DEFAULT_SUBJECT).to_string();
        let Some(results) = command.results() else {
            return Ok(Outcome::TryNext);
        };
        let sequence = results.is_sequence();
        let items: Vec<Value> = results.iter().cloned().collect();

        let mut translated = Vec::with_capacity(items.len());
        for item in items {
            translated.push(self.translate(&subject, item).await?);
        }
        tracing::debug!(%subject, count = translated.len(), "rows translated");

        let value = if sequence {
            Value::Array(translated)
        } else {
            translated.pop().unwrap_or(Value::Null)
        };
        command.replace_result(value.clone())?;
        Ok(Outcome::Done(value))
    }

    fn delegating(&self) -> Option<&dyn Delegating> {
        Some(&self.link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_handles_after_find() {
        let worker = TranslatorWorker::new();
        let err = worker
            .execute(&mut Command::new(action::FIND))
            .await
            .unwrap_err();
        assert!(matches!(err, OperatorError::NotSupported { .. }));
    }

    #[tokio::test]
    async fn detached_translator_cannot_delegate() {
        let worker = TranslatorWorker::new();
        let mut after = Command::after(
            Command::new(action::FIND).with_subject("user"),
            serde_json::json!([{ "id": 1 }]),
        );
        assert!(matches!(
            worker.execute(&mut after).await,
            Err(OperatorError::OperatorUnavailable)
        ));
    }

    #[tokio::test]
    async fn empty_result_needs_no_operator() {
        let worker = TranslatorWorker::new();
        let mut after = Command::after(Command::new(action::FIND), Value::Null);
        assert_eq!(
            worker.execute(&mut after).await.unwrap(),
            Outcome::Done(Value::Null)
        );
        assert_eq!(after.extract_result(), Value::Null);
    }
}
