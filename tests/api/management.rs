use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::json;
use uuid::Uuid;

use crate::helpers::{
    hub_app, new_user, profile_id, register_faculty, register_institute, register_student, send,
    test_state, unique_email, PASSWORD,
};

fn student_row(email: &str) -> serde_json::Value {
    let mut row = new_user(email);
    row["roll_number"] = json!(format!("R-{}", &Uuid::new_v4().simple().to_string()[..8]));
    row
}

fn faculty_row(email: &str) -> serde_json::Value {
    let mut row = new_user(email);
    row["employee_code"] = json!(format!("E-{}", &Uuid::new_v4().simple().to_string()[..8]));
    row["designation"] = json!("Lecturer");
    row["department"] = json!("Physics");
    row
}

#[actix_web::test]
async fn bulk_student_rows_fail_on_their_own() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;

    let taken = unique_email("taken");
    let rows = json!({
        "rows": [student_row(&taken), student_row(&taken), student_row(&unique_email("fresh"))]
    });
    let (status, body) = send(&app, "POST", "/api/v1/students/bulk", Some(&admin.token), Some(rows)).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "partial");
    assert_eq!(body["data"]["succeeded"], 2);
    assert_eq!(body["data"]["rows"][0]["success"], true);
    assert_eq!(body["data"]["rows"][1]["success"], false);
    assert!(body["data"]["rows"][1]["error"].is_string());
    assert_eq!(body["data"]["rows"][2]["success"], true);

    let (_, listed) = send(&app, "GET", "/api/v1/students", Some(&admin.token), None).await;
    assert_eq!(listed["pagination"]["total_items"], 2);
}

#[actix_web::test]
async fn bulk_faculty_rows_fail_on_their_own() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;

    let mut invalid = faculty_row(&unique_email("bad"));
    invalid["department"] = json!("");
    let rows = json!({ "rows": [faculty_row(&unique_email("first")), invalid] });
    let (status, body) = send(&app, "POST", "/api/v1/faculty/bulk", Some(&admin.token), Some(rows)).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "partial");
    assert_eq!(body["data"]["succeeded"], 1);
    assert_eq!(body["data"]["failed"], 1);
    assert_eq!(body["data"]["rows"][1]["index"], 1);
}

#[actix_web::test]
async fn removed_students_are_gone_for_good() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let stranger = register_institute(&app).await;
    let student = register_student(&app, admin.institute_id).await;
    let student_id = profile_id(&app, &student.token, "student_id").await;
    let path = format!("/api/v1/students/{student_id}");

    let (status, _) = send(&app, "DELETE", &path, Some(&stranger.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &path, Some(&student.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "DELETE", &path, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, _) = send(&app, "GET", &path, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &path, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn removed_faculty_can_no_longer_sign_in() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let stranger = register_institute(&app).await;

    let email = unique_email("leaving");
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/faculty",
        Some(&admin.token),
        Some(faculty_row(&email)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let faculty_id = body["data"]["id"].as_str().unwrap().to_string();
    let path = format!("/api/v1/faculty/{faculty_id}");

    let (status, _) = send(&app, "DELETE", &path, Some(&stranger.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &path, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &path, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn faculty_cannot_remove_colleagues() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let colleague = register_faculty(&app, admin.institute_id).await;
    let other = register_faculty(&app, admin.institute_id).await;
    let colleague_id = profile_id(&app, &colleague.token, "faculty_id").await;

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/v1/faculty/{colleague_id}"),
        Some(&other.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
