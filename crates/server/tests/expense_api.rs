use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use server::ServerOptions;

const CREATE_EXPENSES: &str = "CREATE TABLE expenses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    expense TEXT NOT NULL,
    expense_amount REAL NOT NULL,
    due_date INTEGER NOT NULL
)";

async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.execute_unprepared(CREATE_EXPENSES).await.unwrap();
    db
}

async fn app_with(db: DatabaseConnection, options: ServerOptions) -> Router {
    let engine = Engine::builder().database(db).build().await.unwrap();
    server::router(engine, options)
}

async fn app() -> (Router, DatabaseConnection) {
    let db = setup_db().await;
    (app_with(db.clone(), ServerOptions::default()).await, db)
}

async fn seed(db: &DatabaseConnection) {
    let backend = db.get_database_backend();
    for (id, expense, amount, due_date) in [
        (1_i64, "coffee", 4.50_f64, 20240101_i32),
        (2, "rent", 1200.00, 20240105),
    ] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO expenses (id, expense, expense_amount, due_date) VALUES (?, ?, ?, ?)",
            vec![id.into(), expense.into(), amount.into(), due_date.into()],
        ))
        .await
        .unwrap();
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let res = app.oneshot(request).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _db) = app().await;

    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn health_does_not_touch_store() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let app = app_with(db, ServerOptions::default()).await;

    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn list_empty_table() {
    let (app, _db) = app().await;

    let (status, body) = send_json(app, get("/expense/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": 200, "data": []}));
}

#[tokio::test]
async fn list_is_descending_by_id() {
    let (app, db) = app().await;
    seed(&db).await;

    let (status, body) = send_json(app, get("/expense/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": 200,
            "data": [
                {"id": 2, "expense": "rent", "expense_amount": 1200.0, "due_date": 20240105},
                {"id": 1, "expense": "coffee", "expense_amount": 4.5, "due_date": 20240101},
            ]
        })
    );
}

#[tokio::test]
async fn list_without_trailing_slash() {
    let (app, db) = app().await;
    seed(&db).await;

    let (status, body) = send_json(app, get("/expense")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn list_failed_query_is_not_found() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let app = app_with(db, ServerOptions::default()).await;

    let (status, body) = send_json(app, get("/expense/")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Resource not found"}));
}

#[tokio::test]
async fn get_existing_expense() {
    let (app, db) = app().await;
    seed(&db).await;

    let (status, body) = send_json(app, get("/expense/1/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": 200,
            "data": {"id": 1, "expense": "coffee", "expense_amount": 4.5, "due_date": 20240101}
        })
    );
}

#[tokio::test]
async fn get_without_trailing_slash() {
    let (app, db) = app().await;
    seed(&db).await;

    let (status, body) = send_json(app, get("/expense/2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["expense"], "rent");
}

#[tokio::test]
async fn get_missing_expense_is_404() {
    let (app, db) = app().await;
    seed(&db).await;

    let (status, body) = send_json(app, get("/expense/999/")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Resource not found"}));
}

#[tokio::test]
async fn get_malformed_id_is_400() {
    for uri in [
        "/expense/abc/",
        "/expense/1.5/",
        "/expense/12abc/",
        "/expense/9223372036854775808/",
    ] {
        let (app, db) = app().await;
        seed(&db).await;

        let (status, body) = send_json(app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body, json!({"error": "Invalid input"}), "{uri}");
    }
}

#[tokio::test]
async fn create_echoes_body() {
    let (app, db) = app().await;

    let (status, body) = send_json(
        app,
        post_json(
            "/expense/",
            r#"{"expense":"lunch","expense_amount":12.5,"due_date":20240110}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "success",
            "data": {"expense": "lunch", "expense_amount": 12.5, "due_date": 20240110}
        })
    );

    let engine = Engine::builder().database(db).build().await.unwrap();
    assert!(engine.list_expenses().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_ignores_unknown_fields() {
    let (app, _db) = app().await;

    let (status, body) = send_json(
        app,
        post_json(
            "/expense",
            r#"{"expense":"lunch","expense_amount":12.5,"due_date":20240110,"paid":true}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({"expense": "lunch", "expense_amount": 12.5, "due_date": 20240110})
    );
}

#[tokio::test]
async fn create_invalid_bodies_are_400() {
    for payload in [
        r#"{"expense_amount":12.5,"due_date":20240110}"#,
        r#"{"expense":"lunch","due_date":20240110}"#,
        r#"{"expense":"lunch","expense_amount":12.5}"#,
        r#"{"expense":3,"expense_amount":12.5,"due_date":20240110}"#,
        r#"{"expense":"lunch","expense_amount":"12.5","due_date":20240110}"#,
        r#"{"expense":"lunch","expense_amount":12.5,"due_date":"tomorrow"}"#,
        r#"{"expense":"lunch""#,
        "",
    ] {
        let (app, _db) = app().await;

        let (status, body) = send_json(app, post_json("/expense/", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(body, json!({"error": "Invalid input"}), "{payload}");
    }
}

#[tokio::test]
async fn create_decodes_body_whatever_content_type() {
    for content_type in [None, Some("text/plain"), Some("application/x-www-form-urlencoded")] {
        let (app, _db) = app().await;
        let mut request = Request::builder().method("POST").uri("/expense/");
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        let request = request
            .body(Body::from(
                r#"{"expense":"lunch","expense_amount":12.5,"due_date":20240110}"#,
            ))
            .unwrap();

        let (status, body) = send_json(app, request).await;
        assert_eq!(status, StatusCode::OK, "{content_type:?}");
        assert_eq!(
            body,
            json!({
                "status": "success",
                "data": {"expense": "lunch", "expense_amount": 12.5, "due_date": 20240110}
            }),
            "{content_type:?}"
        );
    }
}

#[tokio::test]
async fn create_echoes_wide_due_date() {
    let (app, _db) = app().await;

    let (status, body) = send_json(
        app,
        post_json(
            "/expense/",
            r#"{"expense":"lunch","expense_amount":12.5,"due_date":3000000000}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["due_date"], json!(3000000000_i64));
}

#[tokio::test]
async fn create_persisting_rejects_due_date_wider_than_store() {
    let db = setup_db().await;
    let app = app_with(
        db.clone(),
        ServerOptions {
            persist_created: true,
        },
    )
    .await;

    let (status, body) = send_json(
        app,
        post_json(
            "/expense/",
            r#"{"expense":"lunch","expense_amount":12.5,"due_date":3000000000}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid input"}));

    let engine = Engine::builder().database(db).build().await.unwrap();
    assert!(engine.list_expenses().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_persists_when_enabled() {
    let db = setup_db().await;
    let app = app_with(
        db.clone(),
        ServerOptions {
            persist_created: true,
        },
    )
    .await;

    let (status, body) = send_json(
        app,
        post_json(
            "/expense/",
            r#"{"expense":"lunch","expense_amount":12.5,"due_date":20240110}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let engine = Engine::builder().database(db).build().await.unwrap();
    let stored = engine.list_expenses().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].description, "lunch");
    assert_eq!(stored[0].due_date, 20240110);
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let (app, _db) = app().await;

    let (status, body) = send_json(app, get("/expenses")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Resource not found"}));
}

#[tokio::test]
async fn wrong_method_is_json_405() {
    let (app, db) = app().await;
    seed(&db).await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/expense/1/")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(app, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({"error": "Method not allowed"}));
}

#[tokio::test]
async fn serves_until_shutdown() {
    let db = setup_db().await;
    let engine = Engine::builder().database(db).build().await.unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(server::run_with_listener(
        engine,
        ServerOptions::default(),
        listener,
        async move {
            let _ = stop_rx.await;
        },
        Duration::from_secs(5),
    ));

    stop_tx.send(()).unwrap();
    let res = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(res.is_ok());
}
