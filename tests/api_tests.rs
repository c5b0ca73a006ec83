//! End-to-end tests against a live server.

use axum::http::StatusCode;
use serde_json::{json, Value};

use task_api::config::ServerConfig;

mod common;

async fn create_task(client: &reqwest::Client, server: &common::TestServer, title: &str) -> Value {
    let res = client
        .post(server.url("/tasks"))
        .json(&json!({ "title": title, "description": format!("{title} details") }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json::<Value>().await.unwrap()["data"].clone()
}

#[tokio::test]
async fn test_index_describes_api() {
    let server = common::start_server().await;
    let res = reqwest::get(server.url("/")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["endpoints"]["import"], "POST /tasks/import/csv");

    server.stop().await;
}

#[tokio::test]
async fn test_task_lifecycle() {
    let server = common::start_server().await;
    let client = reqwest::Client::new();

    let task = create_task(&client, &server, "Write report").await;
    let id = task["id"].as_str().unwrap().to_string();
    assert!(task["completed_at"].is_null());

    let res = client.get(server.url(&format!("/tasks/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .put(server.url(&format!("/tasks/{id}")))
        .json(&json!({ "title": "Write final report" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["title"], "Write final report");
    assert_eq!(body["data"]["description"], "Write report details");

    let res = client
        .patch(server.url(&format!("/tasks/{id}/complete")))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert!(body["data"]["completed_at"].is_string());

    let res = client.get(server.url("/tasks?completed=true")).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["count"], 1);

    let res = client.delete(server.url(&format!("/tasks/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(server.url(&format!("/tasks/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "message": "Task not found" }));

    server.stop().await;
}

#[tokio::test]
async fn test_tasks_persist_to_data_file() {
    let server = common::start_server().await;
    let client = reqwest::Client::new();
    create_task(&client, &server, "Persist me").await;

    let raw = std::fs::read_to_string(server.data_dir.path().join("tasks.json")).unwrap();
    let stored: Vec<Value> = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["title"], "Persist me");

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let server = common::start_server().await;
    let res = reqwest::get(server.url("/nowhere")).await.unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "message": "Route not found" }));

    server.stop().await;
}

#[tokio::test]
async fn test_invalid_json_is_400() {
    let server = common::start_server().await;
    let res = reqwest::Client::new()
        .post(server.url("/tasks"))
        .header("content-type", "application/json")
        .body("{broken")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Invalid JSON");

    server.stop().await;
}

#[tokio::test]
async fn test_validation_errors_listed() {
    let server = common::start_server().await;
    let res = reqwest::Client::new()
        .post(server.url("/tasks"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Invalid data");
    assert_eq!(body["errors"].as_array().unwrap().len(), 2);

    server.stop().await;
}

#[tokio::test]
async fn test_csv_import() {
    let server = common::start_server().await;
    let client = reqwest::Client::new();

    let csv = "title,description\nBuy milk,grocery\n,no title\nCall bank,card";
    let body = common::multipart_file("XyZ123", "file", "tasks.csv", csv);
    let res = client
        .post(server.url("/tasks/import/csv"))
        .header("content-type", "multipart/form-data; boundary=XyZ123")
        .body(body)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Import completed");
    assert_eq!(body["imported"], 2);
    assert_eq!(body["errors"][0]["row"], 3);

    let res = client.get(server.url("/tasks")).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["count"], 2);

    server.stop().await;
}

#[tokio::test]
async fn test_multipart_without_boundary_is_400() {
    let server = common::start_server().await;
    let res = reqwest::Client::new()
        .post(server.url("/tasks/import/csv"))
        .header("content-type", "multipart/form-data")
        .body("irrelevant")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body["message"],
        "Failed to process file: boundary not found in Content-Type"
    );

    server.stop().await;
}

#[tokio::test]
async fn test_cors_preflight() {
    let server = common::start_server().await;
    let res = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, server.url("/tasks"))
        .header("origin", "http://example.com")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");

    server.stop().await;
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let mut config = ServerConfig::default();
    config.limits.max_body_size = 64;
    let server = common::start_server_with(config).await;

    let res = reqwest::Client::new()
        .post(server.url("/tasks"))
        .json(&json!({ "title": "x".repeat(200), "description": "d" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "message": "Request body too large" }));

    server.stop().await;
}
