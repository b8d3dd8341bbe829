use operator_core::worker::worker_fn;
use operator_core::{
    Command, Operator, OperatorConfig, OperatorError, OperatorResult, Outcome, Worker,
    command::action,
};
use operator_workers::{MemoryStore, MemoryWorker, TranslatorWorker};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG: &str = r#"{
    "subjects": { "entity": null, "user": "entity" },
    "workers": {
        "keeper": {
            "tableId": 3,
            "table": "users",
            "fields": ["id", "name", "active", "owner"],
            "map": {
                "find": "entity", "get": "entity", "count": "entity",
                "save": "entity", "delete": "entity", "create": "entity",
                "load": "entity", "reserve": "entity", "generate-id": "entity"
            }
        },
        "validator": { "map": { "pre:save": "user" } },
        "translator": { "map": { "after:find": "entity" } }
    }
}"#;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("OPERATOR_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// 保存用户前校验 `name` 非空，并补齐默认的 `active`
fn validator() -> Arc<dyn Worker> {
    worker_fn(|command: &mut Command| {
        let Some(Value::Object(data)) = command.params_mut().get_mut("data") else {
            return Ok(Outcome::TryNext);
        };
        let named = data
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|name| !name.trim().is_empty());
        if !named {
            return Err(OperatorError::Validation {
                reason: "user name must not be empty".into(),
            });
        }
        data.entry("active").or_insert(json!(true));
        Ok(Outcome::TryNext)
    })
}

fn save_user(name: &str) -> Command {
    Command::new(action::SAVE)
        .with_subject("user")
        .with_param("data", json!({ "name": name }))
}

#[tokio::main]
async fn main() -> OperatorResult<()> {
    init_tracing();

    let store = Arc::new(MemoryStore::new());
    let mut workers: HashMap<String, Arc<dyn Worker>> = HashMap::new();
    workers.insert("keeper".into(), Arc::new(MemoryWorker::new(store.clone())));
    workers.insert("validator".into(), validator());
    workers.insert("translator".into(), Arc::new(TranslatorWorker::new()));

    let config = OperatorConfig::from_json_str(CONFIG)?;
    let mut builder = Operator::builder();
    builder.apply_config(&config, &workers)?;
    let operator = builder.build()?;

    // 保存
    for name in ["carol", "alice"] {
        let id = operator.execute(save_user(name)).await?;
        tracing::info!(%name, %id, "saved");
    }

    // 前置校验拒绝空名
    match operator.execute(save_user("  ")).await {
        Err(err) => tracing::warn!(error = %err, "rejected"),
        Ok(id) => tracing::error!(%id, "blank name was saved"),
    }

    // 查询结果经 after:find 翻译为实体
    let users = operator
        .execute(
            Command::new(action::FIND)
                .with_subject("user")
                .with_param("order", json!("name")),
        )
        .await?;
    tracing::info!(%users, "found");

    let count = operator
        .execute(Command::new(action::COUNT).with_subject("user"))
        .await?;
    tracing::info!(%count, "counted");

    let id = operator
        .execute(Command::new(action::GENERATE_ID).with_subject("user"))
        .await?;
    tracing::info!(%id, "generated id");

    Ok(())
}
