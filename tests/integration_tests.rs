use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use slotbook::config::AppConfig;
use slotbook::db::{SqliteStore, DEFAULT_MIGRATIONS_DIR};
use slotbook::handlers;
use slotbook::services::identity::IdentityResolver;
use slotbook::services::workflow::BookingWorkflow;
use slotbook::state::AppState;

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        migrations_dir: PathBuf::from(DEFAULT_MIGRATIONS_DIR),
        admin_token: "test-token".to_string(),
        business_name: "Test Tailors".to_string(),
        appointment_minutes: 45,
        // cheapest valid argon2 settings
        argon2_memory_kib: 8,
        argon2_iterations: 1,
    }
}

fn test_state() -> Arc<AppState> {
    let config = test_config();
    let store = SqliteStore::open(&config.database_url, &config.migrations_dir).unwrap();
    let identities = IdentityResolver::from_config(&config).unwrap();
    Arc::new(AppState {
        workflow: BookingWorkflow::new(Arc::new(store), identities),
        config,
    })
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin_json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("Authorization", "Bearer test-token")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", "Bearer test-token")
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn booking_body(email: &str, phone: &str, slot_id: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "fullName": "Grace Hopper",
        "email": email,
        "phone": phone,
        "shirtType": "Oxford",
        "price": 65.5,
        "specialRequests": "French cuffs",
        "slotId": slot_id,
    })
}

/// Creates one future slot through the admin API and returns its id.
async fn create_slot(app: &Router, capacity: i64) -> i64 {
    let (status, json) = send(
        app,
        admin_json_request(
            "POST",
            "/api/admin/slots",
            serde_json::json!({"date": "2099-05-01", "times": ["10:00 AM"], "capacity": capacity}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json[0]["id"].as_i64().unwrap()
}

async fn slot_view(app: &Router, slot_id: i64) -> serde_json::Value {
    let (status, json) = send(app, get("/api/slots?date=2099-05-01")).await;
    assert_eq!(status, StatusCode::OK);
    json.as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"] == slot_id)
        .cloned()
        .unwrap()
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let app = test_app(test_state());
    let res = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

// ── Admin Auth ──

#[tokio::test]
async fn test_admin_requires_auth() {
    let app = test_app(test_state());
    let (status, json) = send(&app, get("/api/admin/bookings")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn test_admin_wrong_token() {
    let app = test_app(test_state());
    let req = Request::builder()
        .uri("/api/admin/bookings")
        .header("Authorization", "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Slots ──

#[tokio::test]
async fn test_create_and_list_slots() {
    let app = test_app(test_state());
    let (status, json) = send(
        &app,
        admin_json_request(
            "POST",
            "/api/admin/slots",
            serde_json::json!({"date": "2099-05-01", "times": ["9:00 AM", "1:30 PM"], "capacity": 2}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (status, json) = send(&app, get("/api/slots?date=2099-05-01")).await;
    assert_eq!(status, StatusCode::OK);
    let slots = json.as_array().unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["time"], "9:00 AM");
    assert_eq!(slots[0]["status"], "Available");
    assert_eq!(slots[0]["bookedCount"], 0);
    assert_eq!(slots[0]["isBooked"], false);

    let (_, json) = send(&app, get("/api/slots?date=2099-05-02")).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_slots_rejects_bad_label() {
    let app = test_app(test_state());
    let (status, _) = send(
        &app,
        admin_json_request(
            "POST",
            "/api/admin/slots",
            serde_json::json!({"date": "2099-05-01", "times": ["25:00"], "capacity": 2}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_past_slots_are_outdated() {
    let app = test_app(test_state());
    send(
        &app,
        admin_json_request(
            "POST",
            "/api/admin/slots",
            serde_json::json!({"date": "2001-01-01", "times": ["10:00 AM"], "capacity": 1}),
        ),
    )
    .await;

    let (_, json) = send(&app, get("/api/slots?status=Outdated")).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    let (_, json) = send(&app, get("/api/slots?status=Available")).await;
    assert!(json.as_array().unwrap().is_empty());

    for filter in ["outdated", "OUTDATED"] {
        let (status, json) = send(&app, get(&format!("/api/slots?status={filter}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["status"], "Outdated");
    }
}

// ── Bookings ──

#[tokio::test]
async fn test_booking_fills_slot_then_rejects() {
    let app = test_app(test_state());
    let slot_id = create_slot(&app, 1).await;

    let (status, json) = send(
        &app,
        json_request("POST", "/api/bookings", booking_body("g@x.com", "555", slot_id.into())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "CONFIRMED");
    assert_eq!(json["slotId"], slot_id);
    assert_eq!(json["specialRequests"], "French cuffs");

    let slot = slot_view(&app, slot_id).await;
    assert_eq!(slot["bookedCount"], 1);
    assert_eq!(slot["isBooked"], true);
    assert_eq!(slot["status"], "Full");

    let (status, json) = send(
        &app,
        json_request("POST", "/api/bookings", booking_body("h@x.com", "666", slot_id.into())),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("no longer available"));

    let (_, json) = send(&app, admin_request("GET", "/api/admin/bookings")).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_booking_with_string_slot_id() {
    let app = test_app(test_state());
    let slot_id = create_slot(&app, 2).await;

    let (status, json) = send(
        &app,
        json_request(
            "POST",
            "/api/bookings",
            booking_body("g@x.com", "555", slot_id.to_string().into()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["slotId"], slot_id);
}

#[tokio::test]
async fn test_booking_with_invalid_slot_id() {
    let app = test_app(test_state());
    for slot_id in [
        serde_json::json!("abc"),
        serde_json::json!(3.5),
        serde_json::json!(true),
        serde_json::json!([1]),
    ] {
        let (status, json) = send(
            &app,
            json_request("POST", "/api/bookings", booking_body("g@x.com", "555", slot_id.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "slotId {slot_id}");
        assert!(json["error"].as_str().unwrap().contains("slotId"), "slotId {slot_id}");
    }

    let (_, json) = send(&app, admin_request("GET", "/api/admin/bookings")).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_booking_without_slot() {
    let app = test_app(test_state());
    let (status, json) = send(
        &app,
        json_request("POST", "/api/bookings", booking_body("g@x.com", "555", serde_json::Value::Null)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "CONFIRMED");
    assert!(json["slotId"].is_null());
}

#[tokio::test]
async fn test_repeat_customer_keeps_identity() {
    let app = test_app(test_state());
    let (_, first) = send(
        &app,
        json_request("POST", "/api/bookings", booking_body("a@x.com", "555", serde_json::Value::Null)),
    )
    .await;
    let (_, second) = send(
        &app,
        json_request("POST", "/api/bookings", booking_body("a@x.com", "999", serde_json::Value::Null)),
    )
    .await;
    assert!(first["identityId"].is_i64());
    assert_eq!(first["identityId"], second["identityId"]);
}

// ── Status Changes ──

#[tokio::test]
async fn test_cancel_and_reconfirm_booking() {
    let app = test_app(test_state());
    let slot_id = create_slot(&app, 1).await;
    let (_, booking) = send(
        &app,
        json_request("POST", "/api/bookings", booking_body("g@x.com", "555", slot_id.into())),
    )
    .await;
    let booking_id = booking["id"].as_i64().unwrap();
    let uri = format!("/api/admin/bookings/{booking_id}/status");

    let (status, json) = send(
        &app,
        admin_json_request("PATCH", &uri, serde_json::json!({"status": "CANCELLED"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "CANCELLED");
    let slot = slot_view(&app, slot_id).await;
    assert_eq!(slot["bookedCount"], 0);
    assert_eq!(slot["status"], "Available");

    let (_, json) = send(&app, admin_request("GET", "/api/admin/bookings?status=cancelled")).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, json) = send(
        &app,
        admin_json_request("PATCH", &uri, serde_json::json!({"status": "CONFIRMED"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "CONFIRMED");
    let slot = slot_view(&app, slot_id).await;
    assert_eq!(slot["bookedCount"], 1);
    assert_eq!(slot["isBooked"], true);
}

#[tokio::test]
async fn test_reconfirm_into_taken_slot_conflicts() {
    let app = test_app(test_state());
    let slot_id = create_slot(&app, 1).await;
    let (_, booking) = send(
        &app,
        json_request("POST", "/api/bookings", booking_body("g@x.com", "555", slot_id.into())),
    )
    .await;
    let uri = format!("/api/admin/bookings/{}/status", booking["id"]);

    send(&app, admin_json_request("PATCH", &uri, serde_json::json!({"status": "CANCELLED"}))).await;
    let (status, _) = send(
        &app,
        json_request("POST", "/api/bookings", booking_body("h@x.com", "666", slot_id.into())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, admin_json_request("PATCH", &uri, serde_json::json!({"status": "CONFIRMED"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, json) = send(&app, admin_request("GET", "/api/admin/bookings?status=CANCELLED")).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_status_errors() {
    let app = test_app(test_state());

    let (status, _) = send(
        &app,
        admin_json_request("PATCH", "/api/admin/bookings/99/status", serde_json::json!({"status": "CANCELLED"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        admin_json_request("PATCH", "/api/admin/bookings/99/status", serde_json::json!({"status": "LOST"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, admin_request("GET", "/api/admin/bookings?status=LOST")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Slot Deletion ──

#[tokio::test]
async fn test_delete_slot_with_bookings_refused() {
    let app = test_app(test_state());
    let slot_id = create_slot(&app, 2).await;
    let (_, booking) = send(
        &app,
        json_request("POST", "/api/bookings", booking_body("g@x.com", "555", slot_id.into())),
    )
    .await;

    let (status, _) = send(&app, admin_request("DELETE", &format!("/api/admin/slots/{slot_id}"))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/api/admin/bookings/{}/status", booking["id"]);
    send(&app, admin_json_request("PATCH", &uri, serde_json::json!({"status": "CANCELLED"}))).await;

    let (status, _) = send(&app, admin_request("DELETE", &format!("/api/admin/slots/{slot_id}"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // the cancelled booking survives without its slot
    let (_, json) = send(&app, admin_request("GET", "/api/admin/bookings")).await;
    assert!(json[0]["slotId"].is_null());

    let (status, _) = send(&app, admin_request("DELETE", &format!("/api/admin/slots/{slot_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Calendar ──

#[tokio::test]
async fn test_calendar_not_found() {
    let app = test_app(test_state());
    let res = app.oneshot(get("/calendar/12345.ics")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_calendar_download() {
    let app = test_app(test_state());
    let slot_id = create_slot(&app, 1).await;
    let (_, booking) = send(
        &app,
        json_request("POST", "/api/bookings", booking_body("g@x.com", "555", slot_id.into())),
    )
    .await;

    let res = app
        .clone()
        .oneshot(get(&format!("/calendar/{}.ics", booking["id"])))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "text/calendar; charset=utf-8"
    );

    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("DTSTART:20990501T100000"));
    assert!(text.contains("DTEND:20990501T104500"));
    assert!(text.contains("SUMMARY:Oxford appointment with Test Tailors"));
    assert!(text.contains("DESCRIPTION:French cuffs"));
}

// ── Concurrency ──

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_fill_last_unit_once() {
    let app = test_app(test_state());
    let slot_id = create_slot(&app, 3).await;
    for i in 0..2 {
        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/bookings",
                booking_body(&format!("seed{i}@x.com"), &format!("seed{i}"), slot_id.into()),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let req = json_request(
                    "POST",
                    "/api/bookings",
                    booking_body(&format!("c{i}@x.com"), &format!("c{i}"), slot_id.into()),
                );
                send(&app, req).await.0
            })
        })
        .collect();

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => conflicts += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, 9);

    let slot = slot_view(&app, slot_id).await;
    assert_eq!(slot["bookedCount"], 3);
    assert_eq!(slot["isBooked"], true);
}
