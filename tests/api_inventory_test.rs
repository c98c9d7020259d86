use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use shelf_reconcile::config::ReconcileConfig;
use shelf_reconcile::infrastructure::AppState;
use shelf_reconcile::{db, seed, server};
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot`

// Helper to create a test app with the demo inventory
async fn setup_test_app() -> Router {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    seed::seed_demo_inventory(&db)
        .await
        .expect("Failed to seed inventory");
    let state = AppState::new(db, ReconcileConfig::immediate());
    server::build_router(state, &[])
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
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
async fn test_health_check() {
    let app = setup_test_app().await;

    let (status, json) = send(&app, get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["service"], "shelf-reconcile");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn test_inventory_health_report() {
    let app = setup_test_app().await;

    let (status, json) = send(&app, get("/api/inventory/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_books"], 6);
    assert_eq!(json["flagged_books"], 5);
    assert_eq!(json["health_score"], 17);
    assert_eq!(json["counters"]["no_copies"], 1);
    assert_eq!(json["problem_books"][0]["title"], "Emma");
    assert_eq!(json["problem_books"][0]["issue_type"], "no_copies");
}

#[tokio::test]
async fn test_inventory_health_for_one_book() {
    let app = setup_test_app().await;

    let (status, json) = send(&app, get("/api/inventory/health?book_id=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_books"], 1);
    assert_eq!(json["health_score"], 100);

    let (status, _) = send(&app, get("/api/inventory/health?book_id=999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_plan_preview_rejects_bad_scope() {
    let app = setup_test_app().await;

    let (status, json) = send(&app, get("/api/inventory/plan?scope=everything")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("everything"));

    let (status, _) = send(&app, get("/api/inventory/plan?scope=single_book")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        get("/api/inventory/plan?scope=single_book&book_id=999"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_plan_preview_lists_operations() {
    let app = setup_test_app().await;

    let (status, json) = send(&app, get("/api/inventory/plan?scope=missing_copies")).await;

    assert_eq!(status, StatusCode::OK);
    // Atlas of Kenya needs one copy, Emma needs four
    assert_eq!(json["total"], 5);
    assert_eq!(json["operations"][0]["op"], "create_copy");
    assert_eq!(json["operations"][0]["tracking_code"], "ATL-03");
}

#[tokio::test]
async fn test_repair_run_completes() {
    let app = setup_test_app().await;

    let (status, json) = send(&app, post_json("/api/inventory/repairs", r#"{"scope":"all"}"#)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["scope"], "all");
    let run_id = json["run_id"].as_str().unwrap().to_string();

    let mut run = Value::Null;
    for _ in 0..200 {
        let (status, json) = send(&app, get(&format!("/api/inventory/repairs/{}", run_id))).await;
        assert_eq!(status, StatusCode::OK);
        if json["phase"] == "completed" {
            run = json;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(run["phase"], "completed", "run did not finish");
    assert_eq!(run["outcome"]["failed"], 0);
    assert_eq!(run["outcome"]["cancelled"], false);
    assert_eq!(run["outcome"]["rescan"]["flagged_books"], 0);
    assert!(run["finished_at"].is_string());

    let (_, health) = send(&app, get("/api/inventory/health")).await;
    assert_eq!(health["flagged_books"], 0);
    assert_eq!(health["health_score"], 100);
    assert_eq!(health["counters"]["duplicate_tracking"], 0);
}

#[tokio::test]
async fn test_single_book_repair_reports_plain_scope() {
    let app = setup_test_app().await;

    let (status, json) = send(
        &app,
        post_json(
            "/api/inventory/repairs",
            r#"{"scope":"single_book","book_id":5}"#,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["scope"], "single_book(5)");
}

#[tokio::test]
async fn test_repair_run_validates_request() {
    let app = setup_test_app().await;

    let (status, _) = send(&app, post_json("/api/inventory/repairs", r#"{"scope":"nope"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json(
            "/api/inventory/repairs",
            r#"{"scope":"single_book","book_id":999}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_run_is_not_found() {
    let app = setup_test_app().await;
    let id = uuid::Uuid::new_v4();

    let (status, _) = send(&app, get(&format!("/api/inventory/repairs/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        post_json(&format!("/api/inventory/repairs/{}/cancel", id), ""),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document_lists_inventory_paths() {
    let app = setup_test_app().await;

    let (status, json) = send(&app, get("/api/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/inventory/health"].is_object());
    assert!(json["paths"]["/api/inventory/repairs/{id}/cancel"].is_object());
}
