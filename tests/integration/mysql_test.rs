//! MySQL integration tests.
//!
//! Skipped unless DATABASE_URL points at a reachable MySQL server.

use std::sync::Arc;

use wiki_assistant::config::Credentials;
use wiki_assistant::connection::{ConnectionProvider, StaticResolver};
use wiki_assistant::db::{Connector, DatabaseClient, MySqlConnector, Value};
use wiki_assistant::error::WikiError;
use wiki_assistant::query::QueryExecutor;

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

fn test_target() -> Option<(String, Credentials)> {
    let url = get_test_database_url()?;
    Credentials::from_connection_string(&url).ok()
}

/// Helper to open a test connection.
async fn get_test_client() -> Option<Box<dyn DatabaseClient>> {
    let (host, credentials) = test_target()?;
    MySqlConnector::default().open(&host, &credentials).await.ok()
}

fn get_test_executor() -> Option<QueryExecutor> {
    let (host, credentials) = test_target()?;
    let provider = ConnectionProvider::new(
        Arc::new(StaticResolver::new(host)),
        Arc::new(MySqlConnector::default()),
        credentials,
    );
    Some(QueryExecutor::new(Arc::new(provider)))
}

#[tokio::test]
async fn test_execute_simple_select() {
    let Some(mut client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query("SELECT 1 AS num, 'hello' AS greeting")
        .await
        .unwrap();

    assert_eq!(
        result.rows[0].columns().collect::<Vec<_>>(),
        vec!["num", "greeting"]
    );
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].get("num"), Some(&Value::Int(1)));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_close_twice_is_noop() {
    let Some(mut client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    client.close().await.unwrap();
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_unknown_table_is_query_error() {
    let Some(mut client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = client
        .execute_query("SELECT * FROM table_that_does_not_exist_xyz")
        .await;
    assert!(matches!(result, Err(WikiError::Query(_))));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_parameter_binding() {
    let Some(mut client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let row = client
        .fetch_optional(
            "SELECT CAST(? AS CHAR) AS echoed",
            &[Value::Bytes(b"Science".to_vec())],
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(row.get("echoed"), Some(&Value::Text("Science".to_string())));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_executor_normalizes_binary_and_timestamps() {
    let Some(executor) = get_test_executor() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let rows = executor
        .execute_sql(
            "SELECT CAST('Physics' AS BINARY) AS title, \
             CAST('2024-01-01 00:00:00' AS DATETIME) AS edited;",
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("title"), Some(&Value::Text("Physics".to_string())));
    assert_eq!(
        rows[0].get("edited"),
        Some(&Value::Text("2024-01-01T00:00:00".to_string()))
    );
}

#[tokio::test]
async fn test_executor_rejects_writes() {
    let Some(executor) = get_test_executor() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = executor.execute_sql("DROP TABLE categoryoutdated").await;
    assert!(matches!(result, Err(WikiError::NotSelect(_))));
}
