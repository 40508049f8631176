//! Fetching, creating and removing resources with default retries.
//!
//! Run with: `cargo run --example basic_call`

use serde::{Deserialize, Serialize};
use std::time::Duration;
use steadycall::{CallConfig, Client, Error, RetryPolicy};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Todo {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    completed: bool,
}

#[derive(Debug, Serialize)]
struct NewTodo {
    title: String,
    completed: bool,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("steadycall=debug,basic_call=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .timeout(Duration::from_secs(10))
        .retry_policy(RetryPolicy::new(3, Duration::from_millis(250), Duration::from_secs(5)))
        .build()?;

    println!("=== fetch ===");
    let todo = client.fetch::<Todo>("todos/1").await?;
    println!("#{} {} (done: {})", todo.id, todo.title, todo.completed);
    println!("latency {:?}, attempts {}", todo.latency, todo.attempts);
    println!();

    println!("=== create ===");
    let new_todo = NewTodo {
        title: "Write the release notes".to_string(),
        completed: false,
        user_id: 1,
    };
    let created = client.create::<_, Todo>("/todos", &new_todo).await?;
    println!("created #{} with status {}", created.id, created.status);
    println!();

    println!("=== fetch with options ===");
    let config = CallConfig::new()
        .with_query_param("userId", "1")
        .with_timeout(Duration::from_secs(2))
        .with_retry(RetryPolicy::none());
    let todos = client.fetch_with::<Vec<Todo>>("/todos", config).await?;
    println!("user 1 has {} todos", todos.len());
    println!("content-type: {:?}", todos.header("content-type"));
    println!();

    println!("=== remove ===");
    let removed = client.remove::<serde_json::Value>("/todos/1").await?;
    println!("removed, status {}", removed.status);

    Ok(())
}
