use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use masjid_display_agent::repository::{HttpContentRepository, StatusReporter};
use masjid_display_agent::ContentRepository;
use masjid_display_core::api::HeartbeatReport;
use masjid_display_core::model::DisplayState;
use masjid_display_core::DisplayError;
use serde_json::{json, Value};

type Heartbeats = Arc<Mutex<Vec<(String, Value)>>>;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

async fn content(Path(display): Path<String>) -> Result<Json<Value>, StatusCode> {
    match display.as_str() {
        "main" => Ok(Json(json!({
            "data": [
                { "id": "c3", "title": "Kuliah Maghrib", "is_active": true, "display_order": 2,
                  "media_ref": "https://cdn.example.my/kuliah.jpg",
                  "sponsorship_amount": "250.00" },
                { "id": "c1", "title": "Tabung Masjid", "is_active": true, "display_order": 1,
                  "carousel_duration": 2 },
                { "id": "c2", "title": "Gotong-royong", "is_active": false, "display_order": 0 },
                { "title": "no id", "is_active": true, "display_order": 0 },
                { "id": "c4", "title": "Hari Raya", "status": "active", "display_order": 3,
                  "end_date": "2000-01-01" },
                { "id": "c5", "title": "Bad flag", "is_active": "yes", "display_order": 4 },
                { "id": "c6", "title": "Ramadan bazaar", "is_active": true, "display_order": 5,
                  "start_date": "2025-03-05", "end_date": "2025-03-30" }
            ]
        }))),
        "bare" => Ok(Json(json!([
            { "id": "b1", "title": "Only one", "is_active": true, "display_order": 0 }
        ]))),
        "empty" => Ok(Json(json!({ "data": [] }))),
        "broken" => Err(StatusCode::INTERNAL_SERVER_ERROR),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn prayer_times(
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    match query.get("zone").map(String::as_str) {
        Some("WLY01") => Ok(Json(json!({
            "zone": "WLY01",
            "date": "2025-03-01",
            "times": {
                "Subuh": "05:45:00", "zohor": "13:15", "asar": "16:30",
                "maghrib": "19:20", "isyak": "20:35", "syuruk": null
            }
        }))),
        Some("EMPTY") => Ok(Json(json!({ "zone": "EMPTY", "date": "2025-03-01", "times": {} }))),
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

async fn heartbeat(
    State(seen): State<Heartbeats>,
    Path(display): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    if display == "broken" {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    seen.lock().unwrap().push((display, body));
    StatusCode::NO_CONTENT
}

async fn serve() -> SocketAddr {
    serve_with(Heartbeats::default()).await
}

async fn serve_with(heartbeats: Heartbeats) -> SocketAddr {
    let app = Router::new()
        .route("/api/displays/{display}/content", get(content))
        .route("/api/displays/{display}/heartbeat", post(heartbeat))
        .route("/api/prayer-times", get(prayer_times))
        .with_state(heartbeats);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    addr
}

fn repo(addr: SocketAddr, display: &str) -> HttpContentRepository {
    HttpContentRepository::new(
        format!("http://{addr}/api/displays/{display}/content"),
        format!("http://{addr}/api/prayer-times"),
    )
}

#[tokio::test]
async fn content_is_validated_filtered_and_ordered() {
    let addr = serve().await;
    let playlist = repo(addr, "main").fetch_active_content(day(1)).await.unwrap();

    let ids: Vec<&str> = playlist.ids().collect();
    assert_eq!(ids, ["c1", "c3"]);

    let tabung = playlist.get(0).unwrap();
    assert_eq!(tabung.dwell_secs, Some(5), "carousel_duration is clamped");

    let kuliah = playlist.get(1).unwrap();
    assert_eq!(kuliah.media_ref, "https://cdn.example.my/kuliah.jpg");
    assert_eq!(kuliah.sponsorship_amount, 250.0);
    assert!(kuliah.sponsorship_tier().is_some());
}

#[tokio::test]
async fn schedule_window_follows_the_given_day() {
    let addr = serve().await;
    let repo = repo(addr, "main");

    let before = repo.fetch_active_content(day(4)).await.unwrap();
    assert!(!before.contains("c6"), "starts tomorrow");

    let opening = repo.fetch_active_content(day(5)).await.unwrap();
    assert_eq!(opening.ids().collect::<Vec<_>>(), ["c1", "c3", "c6"]);

    let after = repo
        .fetch_active_content(NaiveDate::from_ymd_opt(2025, 3, 31).unwrap())
        .await
        .unwrap();
    assert!(!after.contains("c6"), "ended yesterday");
}

#[tokio::test]
async fn bare_and_empty_lists_are_valid() {
    let addr = serve().await;

    let bare = repo(addr, "bare").fetch_active_content(day(1)).await.unwrap();
    assert_eq!(bare.ids().collect::<Vec<_>>(), ["b1"]);

    let empty = repo(addr, "empty").fetch_active_content(day(1)).await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn error_status_is_a_network_error() {
    let addr = serve().await;
    let err = repo(addr, "broken").fetch_active_content(day(1)).await.unwrap_err();
    assert!(matches!(err, DisplayError::Network(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_service_is_a_network_error() {
    let addr = serve().await;
    let repo = HttpContentRepository::new(
        format!("http://{addr}/nope"),
        "http://127.0.0.1:1/api/prayer-times",
    );

    let content = repo.fetch_active_content(day(1)).await;
    assert!(matches!(content, Err(DisplayError::Network(_))));
    assert!(matches!(repo.fetch_prayer_schedule("WLY01").await, Err(DisplayError::Network(_))));
}

#[tokio::test]
async fn prayer_schedule_is_parsed_for_zone() {
    let addr = serve().await;
    let schedule = repo(addr, "main").fetch_prayer_schedule("WLY01").await.unwrap();

    assert_eq!(schedule.zone_id, "WLY01");
    assert_eq!(schedule.date.to_string(), "2025-03-01");
    assert_eq!(schedule.times.len(), 5, "null entry dropped");
    assert_eq!(schedule.times["subuh"].to_string(), "05:45:00");
    assert_eq!(schedule.chronological()[0].0, "subuh");
}

#[tokio::test]
async fn prayer_schedule_without_times_is_rejected() {
    let addr = serve().await;
    let err = repo(addr, "main").fetch_prayer_schedule("EMPTY").await.unwrap_err();
    assert!(matches!(err, DisplayError::Validation(_)), "{err:?}");

    let err = repo(addr, "main").fetch_prayer_schedule("XXX99").await.unwrap_err();
    assert!(matches!(err, DisplayError::Network(_)), "{err:?}");
}

fn report() -> HeartbeatReport {
    HeartbeatReport {
        is_online: true,
        session: ulid::Ulid::nil(),
        state: DisplayState::Displaying,
        current_item: Some("c1".into()),
        playlist_len: 2,
        playlist_version: 1,
        schedule_stale: false,
        black_screen: false,
        error_count: 0,
        last_error: None,
        uptime_secs: 30,
    }
}

#[tokio::test]
async fn heartbeat_is_posted_as_json() {
    let seen = Heartbeats::default();
    let addr = serve_with(Arc::clone(&seen)).await;
    let repo = repo(addr, "main")
        .with_heartbeat_url(format!("http://{addr}/api/displays/main/heartbeat"));

    repo.report_status(report()).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (display, body) = &seen[0];
    assert_eq!(display, "main");
    assert_eq!(body["is_online"], json!(true));
    assert_eq!(body["state"], json!("displaying"));
    assert_eq!(body["current_item"], json!("c1"));
    assert_eq!(body["uptime_secs"], json!(30));
}

#[tokio::test]
async fn heartbeat_errors_and_missing_url() {
    let seen = Heartbeats::default();
    let addr = serve_with(Arc::clone(&seen)).await;

    let broken = repo(addr, "broken")
        .with_heartbeat_url(format!("http://{addr}/api/displays/broken/heartbeat"));
    let err = broken.report_status(report()).await.unwrap_err();
    assert!(matches!(err, DisplayError::Network(_)), "{err:?}");

    let silent = repo(addr, "main");
    assert_eq!(silent.heartbeat_url(), None);
    silent.report_status(report()).await.unwrap();
    assert!(seen.lock().unwrap().is_empty());
}
