use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::router::appointment_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn test_config(mock_server_uri: &str) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server_uri.to_string();
    config
}

fn test_app(config: &AppConfig) -> Router {
    appointment_routes(Arc::new(config.clone()))
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn book_request(token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/book")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// First such weekday at least a week out, so date validation never trips.
fn upcoming(weekday: Weekday) -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(7);
    while date.weekday() != weekday {
        date = date.succ_opt().unwrap();
    }
    date
}

/// Standard calendar: open every day except Sunday, no holidays.
async fn mount_open_calendar(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::clinic_settings_row()
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_holidays"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
}

async fn mount_no_leave(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_leaves"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_statuses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
}

/// The booked-appointments read carries select=start_time,duration_minutes;
/// the pre-insert slot re-check carries select=id. Matching on the select
/// keeps the two reads apart.
async fn mount_free_slot(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "start_time,duration_minutes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
}

async fn mount_lock_cycle(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/booking_locks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/booking_locks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn booking_an_open_slot_returns_the_day_token() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);

    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.supabase_jwt_secret, Some(24));

    let doctor_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();
    let date = upcoming(Weekday::Mon);

    mount_open_calendar(&mock_server).await;
    mount_no_leave(&mock_server).await;
    mount_free_slot(&mock_server).await;
    mount_lock_cycle(&mock_server).await;

    // Monday 09:00-12:00 shift, so 09:30 is offered
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_weekly_schedules"))
        .and(query_param("weekday", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::weekly_schedule_row(
                &doctor_id.to_string(), 1, "09:00:00", "12:00:00", true
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/next_queue_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(1)))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                &appointment_id.to_string(),
                &owner.id,
                &doctor_id.to_string(),
                &date.to_string(),
                "09:30:00",
                "scheduled",
                1,
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(book_request(
            &token,
            json!({
                "pet_id": Uuid::new_v4(),
                "owner_id": owner.id,
                "doctor_id": doctor_id,
                "appointment_date": date,
                "start_time": "09:30:00",
                "reason": "annual checkup"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["appointment"]["token_number"], 1);
    assert_eq!(body["appointment"]["status"], "scheduled");
    assert_eq!(body["message"], "Appointment booked");
}

#[tokio::test]
async fn past_dates_are_rejected() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);

    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.supabase_jwt_secret, Some(24));

    let yesterday = Utc::now().date_naive() - Duration::days(1);

    let response = app
        .oneshot(book_request(
            &token,
            json!({
                "pet_id": Uuid::new_v4(),
                "owner_id": owner.id,
                "doctor_id": Uuid::new_v4(),
                "appointment_date": yesterday,
                "start_time": "09:30:00",
                "reason": "annual checkup"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_reason_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);

    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.supabase_jwt_secret, Some(24));

    let response = app
        .oneshot(book_request(
            &token,
            json!({
                "pet_id": Uuid::new_v4(),
                "owner_id": owner.id,
                "doctor_id": Uuid::new_v4(),
                "appointment_date": upcoming(Weekday::Mon),
                "start_time": "09:30:00",
                "reason": "   "
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn owners_cannot_book_for_other_owners() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);

    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.supabase_jwt_secret, Some(24));

    let response = app
        .oneshot(book_request(
            &token,
            json!({
                "pet_id": Uuid::new_v4(),
                "owner_id": Uuid::new_v4(),
                "doctor_id": Uuid::new_v4(),
                "appointment_date": upcoming(Weekday::Mon),
                "start_time": "09:30:00",
                "reason": "annual checkup"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn closed_day_rejects_normal_bookings() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);

    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.supabase_jwt_secret, Some(24));

    mount_open_calendar(&mock_server).await;

    // The canned settings close weekday 0
    let response = app
        .oneshot(book_request(
            &token,
            json!({
                "pet_id": Uuid::new_v4(),
                "owner_id": owner.id,
                "doctor_id": Uuid::new_v4(),
                "appointment_date": upcoming(Weekday::Sun),
                "start_time": "09:30:00",
                "reason": "annual checkup"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn emergency_booking_pushes_through_a_closed_day() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);

    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.supabase_jwt_secret, Some(24));

    let doctor_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();
    let date = upcoming(Weekday::Sun);

    mount_open_calendar(&mock_server).await;
    mount_no_leave(&mock_server).await;
    mount_free_slot(&mock_server).await;
    mount_lock_cycle(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_weekly_schedules"))
        .and(query_param("weekday", "eq.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/next_queue_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(5)))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": appointment_id,
            "pet_id": Uuid::new_v4(),
            "owner_id": owner.id,
            "doctor_id": doctor_id,
            "appointment_date": date,
            "start_time": "10:00:00",
            "duration_minutes": 30,
            "status": "scheduled",
            "priority": "emergency",
            "is_emergency": true,
            "token_number": 5,
            "reason": "hit by car",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }])))
        .mount(&mock_server)
        .await;

    // The booking must open an emergency case as part of the same commit
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/next_emergency_queue_number"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(3)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/emergency_cases"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::emergency_case_row(
                &Uuid::new_v4().to_string(),
                &owner.id,
                3,
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(book_request(
            &token,
            json!({
                "pet_id": Uuid::new_v4(),
                "owner_id": owner.id,
                "doctor_id": doctor_id,
                "appointment_date": date,
                "start_time": "10:00:00",
                "reason": "hit by car",
                "is_emergency": true
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["appointment"]["priority"], "emergency");
    assert_eq!(body["appointment"]["is_emergency"], true);
    assert_eq!(body["appointment"]["token_number"], 5);
}

#[tokio::test]
async fn symptom_triage_escalates_without_the_flag() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);

    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.supabase_jwt_secret, Some(24));

    let doctor_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();
    let date = upcoming(Weekday::Mon);

    mount_open_calendar(&mock_server).await;
    mount_no_leave(&mock_server).await;
    mount_free_slot(&mock_server).await;
    mount_lock_cycle(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_weekly_schedules"))
        .and(query_param("weekday", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::weekly_schedule_row(
                &doctor_id.to_string(), 1, "09:00:00", "12:00:00", true
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/next_queue_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(2)))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": appointment_id,
            "pet_id": Uuid::new_v4(),
            "owner_id": owner.id,
            "doctor_id": doctor_id,
            "appointment_date": date,
            "start_time": "09:30:00",
            "duration_minutes": 30,
            "status": "scheduled",
            "priority": "emergency",
            "is_emergency": true,
            "token_number": 2,
            "reason": "seizure an hour ago, still twitching",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/next_emergency_queue_number"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(1)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/emergency_cases"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::emergency_case_row(
                &Uuid::new_v4().to_string(),
                &owner.id,
                1,
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // No is_emergency flag: the keyword triage alone must escalate
    let response = app
        .oneshot(book_request(
            &token,
            json!({
                "pet_id": Uuid::new_v4(),
                "owner_id": owner.id,
                "doctor_id": doctor_id,
                "appointment_date": date,
                "start_time": "09:30:00",
                "reason": "seizure an hour ago, still twitching"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["appointment"]["priority"], "emergency");
}

#[tokio::test]
async fn unoffered_start_time_conflicts() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);

    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.supabase_jwt_secret, Some(24));

    let doctor_id = Uuid::new_v4();

    mount_open_calendar(&mock_server).await;
    mount_no_leave(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_weekly_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::weekly_schedule_row(
                &doctor_id.to_string(), 1, "09:00:00", "12:00:00", true
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // 14:00 sits outside the 09:00-12:00 shift
    let response = app
        .oneshot(book_request(
            &token,
            json!({
                "pet_id": Uuid::new_v4(),
                "owner_id": owner.id,
                "doctor_id": doctor_id,
                "appointment_date": upcoming(Weekday::Mon),
                "start_time": "14:00:00",
                "reason": "annual checkup"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn fully_booked_day_conflicts_for_normal_bookings() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);

    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.supabase_jwt_secret, Some(24));

    let doctor_id = Uuid::new_v4();

    mount_open_calendar(&mock_server).await;
    mount_no_leave(&mock_server).await;

    // A one-hour shift with both half-hour slots already taken
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_weekly_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::weekly_schedule_row(
                &doctor_id.to_string(), 1, "09:00:00", "10:00:00", true
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "start_time": "09:00:00", "duration_minutes": 30 },
            { "start_time": "09:30:00", "duration_minutes": 30 }
        ])))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(book_request(
            &token,
            json!({
                "pet_id": Uuid::new_v4(),
                "owner_id": owner.id,
                "doctor_id": doctor_id,
                "appointment_date": upcoming(Weekday::Mon),
                "start_time": "09:00:00",
                "reason": "annual checkup"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn doctor_leave_blocks_even_emergency_bookings() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);

    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.supabase_jwt_secret, Some(24));

    mount_open_calendar(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_leaves"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4() }
        ])))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(book_request(
            &token,
            json!({
                "pet_id": Uuid::new_v4(),
                "owner_id": owner.id,
                "doctor_id": Uuid::new_v4(),
                "appointment_date": upcoming(Weekday::Mon),
                "start_time": "09:30:00",
                "reason": "hit by car",
                "is_emergency": true
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
