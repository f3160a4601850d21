//! HTTP endpoint tests.
//!
//! Drives the real routes and handlers against mock connections.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use wiki_assistant::api;
use wiki_assistant::config::Config;
use wiki_assistant::connection::{
    AddressResolver, ConnectionProvider, FailingResolver, StaticResolver,
};
use wiki_assistant::db::{ConnectionStats, MockConnector, Row, Value};
use wiki_assistant::error::Result;
use wiki_assistant::query::QueryExecutor;

struct CountingResolver {
    calls: AtomicUsize,
}

#[async_trait]
impl AddressResolver for CountingResolver {
    async fn resolve(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("10.0.0.3".to_string())
    }
}

fn outdated_rows() -> Vec<Row> {
    let edited = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    vec![
        Row::new()
            .with("category", Value::Bytes(b"Science".to_vec()))
            .with("page_id", 7)
            .with("edited", edited),
        Row::new()
            .with("category", Value::Bytes(b"History".to_vec()))
            .with("page_id", 9)
            .with("edited", edited),
    ]
}

fn executor(
    resolver: Arc<dyn AddressResolver>,
    connector: MockConnector,
) -> (web::Data<QueryExecutor>, Arc<ConnectionStats>) {
    let stats = connector.stats();
    let provider = ConnectionProvider::new(
        resolver,
        Arc::new(connector),
        Config::default().database.credentials(),
    );
    (web::Data::new(QueryExecutor::new(Arc::new(provider))), stats)
}

fn mock_executor(connector: MockConnector) -> (web::Data<QueryExecutor>, Arc<ConnectionStats>) {
    executor(Arc::new(StaticResolver::new("10.0.0.3")), connector)
}

/// Sends one request and returns the status and raw body.
async fn send(executor: web::Data<QueryExecutor>, request: test::TestRequest) -> (StatusCode, String) {
    let app = test::init_service(
        App::new()
            .app_data(executor)
            .configure(api::configure_routes),
    )
    .await;

    let response = test::call_service(&app, request.to_request()).await;
    let status = response.status();
    let body = test::read_body(response).await;
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn send_json(
    executor: web::Data<QueryExecutor>,
    request: test::TestRequest,
) -> (StatusCode, serde_json::Value) {
    let (status, body) = send(executor, request).await;
    (status, serde_json::from_str(&body).unwrap())
}

fn execute(query: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/execute-sql")
        .set_json(json!({ "query": query }))
}

#[actix_web::test]
async fn test_select_returns_rows_in_column_order() {
    let (executor, stats) = mock_executor(MockConnector::with_rows(outdated_rows()));

    let (status, body) = send(executor, execute("SELECT * FROM categoryoutdated")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        r#"{"result":[{"category":"Science","page_id":7,"edited":"2024-01-01T00:00:00"},{"category":"History","page_id":9,"edited":"2024-01-01T00:00:00"}]}"#
    );
    assert_eq!(stats.opened(), 1);
    assert_eq!(stats.leaked(), 0);
}

#[actix_web::test]
async fn test_select_with_no_rows_is_empty_list() {
    let (executor, _) = mock_executor(MockConnector::with_rows(Vec::new()));

    let (status, body) = send_json(executor, execute("SELECT * FROM categoryoutdated WHERE 1 = 0")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "result": [] }));
}

#[actix_web::test]
async fn test_writes_are_rejected_without_connecting() {
    for sql in [
        "DELETE FROM categoryoutdated",
        "INSERT INTO categoryoutdated VALUES ('x', 1)",
        "UPDATE categoryoutdated SET page_id = 1",
        "DROP TABLE categoryoutdated",
        "SELECT 1; DELETE FROM categoryoutdated",
    ] {
        let (executor, stats) = mock_executor(MockConnector::with_rows(outdated_rows()));

        let (status, body) = send_json(executor, execute(sql)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{sql}");
        assert_eq!(body, json!({ "detail": "Only SELECT queries are allowed." }));
        assert_eq!(stats.opened(), 0, "{sql}");
    }
}

#[actix_web::test]
async fn test_commented_select_is_admitted() {
    for sql in [
        "# latest pages\nSELECT * FROM categoryoutdated",
        "SELECT * FROM categoryoutdated; # done",
        "SELECT * FROM categoryoutdated; -- done",
        "SELECT * FROM categoryoutdated;\n/* trailing */",
        "; SELECT * FROM categoryoutdated",
    ] {
        let (executor, stats) = mock_executor(MockConnector::with_rows(outdated_rows()));

        let (status, body) = send_json(executor, execute(sql)).await;

        assert_eq!(status, StatusCode::OK, "{sql}");
        assert_eq!(body["result"].as_array().map(Vec::len), Some(2), "{sql}");
        assert_eq!(stats.queries(), 1, "{sql}");
    }
}

#[actix_web::test]
async fn test_empty_query_is_invalid() {
    let (executor, stats) = mock_executor(MockConnector::with_rows(outdated_rows()));

    let (status, body) = send_json(executor, execute("  ;  ")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "detail": "Invalid SQL query." }));
    assert_eq!(stats.opened(), 0);
}

#[actix_web::test]
async fn test_rejection_does_not_need_database_address() {
    let (executor, _) = executor(
        Arc::new(FailingResolver::new("no instance")),
        MockConnector::with_rows(Vec::new()),
    );

    let (status, _) = send_json(executor, execute("TRUNCATE categoryoutdated")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_malformed_body_is_unprocessable() {
    let (executor, _) = mock_executor(MockConnector::with_rows(Vec::new()));

    let request = test::TestRequest::post()
        .uri("/execute-sql")
        .insert_header(ContentType::json())
        .set_payload("{\"query\": ");
    let (status, body) = send_json(executor.clone(), request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());

    let request = test::TestRequest::post()
        .uri("/execute-sql")
        .set_json(json!({ "sql": "SELECT 1" }));
    let (status, body) = send_json(executor, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("query"));
}

#[actix_web::test]
async fn test_database_error_is_generic() {
    let (executor, stats) = mock_executor(MockConnector::failing_queries(
        "ERROR 1146 (42S02): Table 'wiki_assistant.nope' doesn't exist",
    ));

    let (status, body) = send(executor, execute("SELECT * FROM nope")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#"{"detail":"Database error."}"#);
    assert_eq!(stats.leaked(), 0);
}

#[actix_web::test]
async fn test_connection_failure_is_reported() {
    let (executor, _) = mock_executor(MockConnector::refusing("Connection refused"));

    let (status, body) = send_json(executor, execute("SELECT 1")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "detail": "Database connection error." }));
}

#[actix_web::test]
async fn test_address_failure_is_reported() {
    let (executor, stats) = executor(
        Arc::new(FailingResolver::new("gcloud exited with 1")),
        MockConnector::with_rows(outdated_rows()),
    );

    let (status, body) = send_json(executor, execute("SELECT 1")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "detail": "Failed to get database IP address." }));
    assert_eq!(stats.opened(), 0);
}

#[actix_web::test]
async fn test_address_is_resolved_once_across_requests() {
    let resolver = Arc::new(CountingResolver {
        calls: AtomicUsize::new(0),
    });
    let (executor, stats) = executor(resolver.clone(), MockConnector::with_rows(outdated_rows()));

    let app = test::init_service(
        App::new()
            .app_data(executor)
            .configure(api::configure_routes),
    )
    .await;

    for _ in 0..3 {
        let response = test::call_service(&app, execute("SELECT 1").to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/outdated-page?category=Science")
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(stats.opened(), 4);
    assert_eq!(stats.closed(), 4);
}

#[actix_web::test]
async fn test_outdated_page_found() {
    let (executor, stats) = mock_executor(MockConnector::with_rows(outdated_rows()));

    let request = test::TestRequest::get().uri("/outdated-page?category=History");
    let (status, body) = send(executor, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        r#"{"result":{"category":"History","page_id":9,"edited":"2024-01-01T00:00:00"}}"#
    );
    assert_eq!(stats.leaked(), 0);
}

#[actix_web::test]
async fn test_outdated_page_category_is_url_decoded() {
    let rows = vec![Row::new()
        .with("category", Value::Bytes("Art & Design".as_bytes().to_vec()))
        .with("page_id", 1)];
    let (executor, _) = mock_executor(MockConnector::with_rows(rows));

    let request = test::TestRequest::get().uri("/outdated-page?category=Art%20%26%20Design");
    let (status, body) = send_json(executor, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["page_id"], json!(1));
}

#[actix_web::test]
async fn test_outdated_page_missing_is_not_found() {
    let (executor, stats) = mock_executor(MockConnector::with_rows(outdated_rows()));

    let request = test::TestRequest::get().uri("/outdated-page?category=Geology");
    let (status, body) = send_json(executor, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({ "detail": "No outdated page found for category: Geology" })
    );
    assert_eq!(stats.leaked(), 0);
}

#[actix_web::test]
async fn test_outdated_page_requires_category() {
    let (executor, stats) = mock_executor(MockConnector::with_rows(outdated_rows()));

    let request = test::TestRequest::get().uri("/outdated-page");
    let (status, body) = send_json(executor, request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
    assert_eq!(stats.opened(), 0);
}

#[actix_web::test]
async fn test_outdated_page_database_error() {
    let (executor, stats) = mock_executor(MockConnector::failing_queries("Lost connection"));

    let request = test::TestRequest::get().uri("/outdated-page?category=Science");
    let (status, body) = send_json(executor, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "detail": "Database error." }));
    assert_eq!(stats.leaked(), 0);
}
