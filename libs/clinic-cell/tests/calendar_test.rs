use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clinic_cell::router::clinic_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn test_config(mock_server_uri: &str) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server_uri.to_string();
    config
}

fn test_app(config: &AppConfig) -> Router {
    clinic_routes(Arc::new(config.clone()))
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin_token(config: &AppConfig) -> String {
    let admin = TestUser::admin("admin@example.com");
    JwtTestUtils::create_test_token(&admin, &config.supabase_jwt_secret, Some(24))
}

#[tokio::test]
async fn settings_read_is_public() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_settings"))
        .and(query_param("id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::clinic_settings_row()
        ])))
        .mount(&mock_server)
        .await;

    let response = app.oneshot(get_request("/settings")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["opening_time"], "09:00:00");
    assert_eq!(body["closing_time"], "18:00:00");
    assert_eq!(body["slot_duration_minutes"], 30);
    assert_eq!(body["closed_weekdays"], json!([0]));
}

#[tokio::test]
async fn missing_settings_row_yields_the_standard_values() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let response = app.oneshot(get_request("/settings")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["opening_time"], "09:00:00");
    assert_eq!(body["closed_weekdays"], json!([0]));
    assert_eq!(body["emergency_enabled"], true);
}

#[tokio::test]
async fn settings_update_is_admin_only() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);

    let doctor = TestUser::doctor("doc@example.com");
    let token = JwtTestUtils::create_test_token(&doctor, &config.supabase_jwt_secret, Some(24));

    let response = app
        .oneshot(json_request(
            "PUT",
            "/settings",
            &token,
            json!({"slot_duration_minutes": 20}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_updates_the_clinic_hours() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);
    let token = admin_token(&config);

    let mut updated = MockSupabaseResponses::clinic_settings_row();
    updated["opening_time"] = json!("08:00:00");
    updated["closing_time"] = json!("17:00:00");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/clinic_settings"))
        .and(query_param("id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(json_request(
            "PUT",
            "/settings",
            &token,
            json!({"opening_time": "08:00:00", "closing_time": "17:00:00"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["settings"]["opening_time"], "08:00:00");
    assert_eq!(body["message"], "Clinic settings updated");
}

#[tokio::test]
async fn backwards_clinic_hours_are_rejected() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);
    let token = admin_token(&config);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/clinic_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(json_request(
            "PUT",
            "/settings",
            &token,
            json!({"opening_time": "18:00:00", "closing_time": "09:00:00"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn out_of_range_closed_weekday_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);
    let token = admin_token(&config);

    let response = app
        .oneshot(json_request(
            "PUT",
            "/settings",
            &token,
            json!({"closed_weekdays": [0, 7]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn holiday_listing_is_public() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_holidays"))
        .and(query_param("order", "holiday_date.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::holiday_row("2025-12-25", "Christmas")
        ])))
        .mount(&mock_server)
        .await;

    let response = app.oneshot(get_request("/holidays")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["holidays"][0]["label"], "Christmas");
    assert_eq!(body["holidays"][0]["holiday_date"], "2025-12-25");
}

#[tokio::test]
async fn admin_adds_a_holiday() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);
    let token = admin_token(&config);

    let mut row = MockSupabaseResponses::holiday_row("2025-12-25", "Christmas");
    row["recurs_annually"] = json!(true);

    Mock::given(method("POST"))
        .and(path("/rest/v1/clinic_holidays"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([row])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/holidays",
            &token,
            json!({
                "holiday_date": "2025-12-25",
                "label": "Christmas",
                "recurs_annually": true
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["holiday"]["label"], "Christmas");
    assert_eq!(body["holiday"]["recurs_annually"], true);
    assert_eq!(body["message"], "Holiday added");
}

#[tokio::test]
async fn duplicate_holiday_comes_back_as_conflict() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);
    let token = admin_token(&config);

    Mock::given(method("POST"))
        .and(path("/rest/v1/clinic_holidays"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockSupabaseResponses::error_response(
                "duplicate key value violates unique constraint",
                "23505",
            ),
        ))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/holidays",
            &token,
            json!({"holiday_date": "2025-12-25", "label": "Christmas"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn blank_holiday_label_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);
    let token = admin_token(&config);

    let response = app
        .oneshot(json_request(
            "POST",
            "/holidays",
            &token,
            json!({"holiday_date": "2025-12-25", "label": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_removes_a_holiday() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);
    let token = admin_token(&config);

    let holiday_id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/clinic_holidays"))
        .and(query_param("id", format!("eq.{}", holiday_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::holiday_row("2025-12-25", "Christmas")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/holidays/{}", holiday_id))
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["message"], "Holiday removed");
}

#[tokio::test]
async fn removing_an_unknown_holiday_is_not_found() {
    let mock_server = MockServer::start().await;
    let config = test_config(&mock_server.uri());
    let app = test_app(&config);
    let token = admin_token(&config);

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/clinic_holidays"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/holidays/{}", Uuid::new_v4()))
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
