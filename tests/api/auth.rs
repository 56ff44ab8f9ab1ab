use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::json;
use uuid::Uuid;

use crate::helpers::{
    hub_app, new_user, register_institute, register_student, send, test_state, unique_email,
    PASSWORD,
};

#[actix_web::test]
async fn registering_an_institute_signs_in_its_admin() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;

    let admin = register_institute(&app).await;
    let (status, body) = send(&app, "GET", "/api/v1/auth/me", Some(&admin.token), None).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["claims"]["role"], "admin");
    assert_eq!(
        body["data"]["claims"]["institute_id"],
        admin.institute_id.to_string()
    );
    assert!(body["data"]["claims"]["admin_id"].is_string());
    assert!(body["data"]["user"].get("password_hash").is_none());
}

#[actix_web::test]
async fn login_failures_share_one_message() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;

    let email = unique_email("login");
    let mut student = new_user(&email);
    student["roll_number"] = json!("L-001");
    let admin = register_institute(&app).await;
    let path = format!(
        "/api/v1/auth/student/register?institute_id={}",
        admin.institute_id
    );
    let (status, _) = send(&app, "POST", &path, None, Some(student)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (wrong_password, wrong_body) = send(
        &app,
        "POST",
        "/api/v1/auth/user/login",
        None,
        Some(json!({ "email": email, "password": "not-the-password" })),
    )
    .await;
    let (unknown_email, unknown_body) = send(
        &app,
        "POST",
        "/api/v1/auth/user/login",
        None,
        Some(json!({ "email": unique_email("nobody"), "password": PASSWORD })),
    )
    .await;

    assert_eq!(wrong_password, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body["message"], unknown_body["message"]);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/user/login",
        None,
        Some(json!({ "email": email.to_uppercase(), "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["user"]["role"], "student");
    assert_eq!(body["data"]["institute"]["id"], admin.institute_id.to_string());
}

#[actix_web::test]
async fn self_registration_needs_an_existing_institute() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;

    let mut body = new_user(&unique_email("orphan"));
    body["roll_number"] = json!("X-1");
    let path = format!(
        "/api/v1/auth/student/register?institute_id={}",
        Uuid::new_v4()
    );
    let (status, _) = send(&app, "POST", &path, None, Some(body)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn roll_numbers_are_unique_per_institute() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let path = format!(
        "/api/v1/auth/student/register?institute_id={}",
        admin.institute_id
    );

    for (expected, email) in [
        (StatusCode::CREATED, unique_email("first")),
        (StatusCode::CONFLICT, unique_email("second")),
    ] {
        let mut body = new_user(&email);
        body["roll_number"] = json!("CS-042");
        let (status, body) = send(&app, "POST", &path, None, Some(body)).await;
        assert_eq!(status, expected, "{body}");
    }
}

#[actix_web::test]
async fn protected_routes_reject_missing_tokens() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;

    let (status, body) = send(&app, "GET", "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let student = register_student(&app, register_institute(&app).await.institute_id).await;
    let (status, _) = send(&app, "GET", "/api/v1/auth/me", Some(&student.token), None).await;
    assert_eq!(status, StatusCode::OK);
}
