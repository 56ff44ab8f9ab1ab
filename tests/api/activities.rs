use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::json;
use uuid::Uuid;

use crate::helpers::{
    create_activity, create_activity_type, hub_app, id_at, register_faculty, register_institute,
    register_student, send, test_state,
};

#[actix_web::test]
async fn approval_caps_credits_and_notifies_the_student() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let type_id = create_activity_type(&app, &admin.token).await;
    let student = register_student(&app, admin.institute_id).await;
    let activity_id = create_activity(&app, &student.token, type_id, true).await;
    let path = format!("/api/v1/activities/{activity_id}");

    let (status, body) = send(
        &app,
        "POST",
        &format!("{path}/approve"),
        Some(&admin.token),
        Some(json!({ "credits_awarded": 10, "remarks": "Well done" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "APPROVED");
    assert_eq!(body["data"]["credits_earned"], 5);
    assert_eq!(body["data"]["approval"]["approved"]["remarks"], "Well done");
    assert_eq!(body["data"]["reviewed_by"], admin.user_id.to_string());

    let (again, _) = send(&app, "POST", &format!("{path}/approve"), Some(&admin.token), None).await;
    assert_eq!(again, StatusCode::BAD_REQUEST);

    let (update, _) = send(
        &app,
        "PATCH",
        &path,
        Some(&student.token),
        Some(json!({ "title": "Renamed" })),
    )
    .await;
    assert_eq!(update, StatusCode::BAD_REQUEST);
    let (delete, _) = send(&app, "DELETE", &path, Some(&student.token), None).await;
    assert_eq!(delete, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/notifications?unread_only=true",
        Some(&student.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["kind"], "activity_approved");
    assert_eq!(body["data"][0]["related_id"], activity_id.to_string());
}

#[actix_web::test]
async fn omitted_credits_default_to_the_type_minimum() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let type_id = create_activity_type(&app, &admin.token).await;
    let student = register_student(&app, admin.institute_id).await;
    let activity_id = create_activity(&app, &student.token, type_id, true).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/activities/{activity_id}/approve"),
        Some(&admin.token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["credits_earned"], 2);
}

#[actix_web::test]
async fn rejection_needs_a_reason() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let type_id = create_activity_type(&app, &admin.token).await;
    let student = register_student(&app, admin.institute_id).await;
    let activity_id = create_activity(&app, &student.token, type_id, true).await;
    let path = format!("/api/v1/activities/{activity_id}/reject");

    let (status, _) = send(&app, "POST", &path, Some(&admin.token), Some(json!({ "reason": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        &path,
        Some(&admin.token),
        Some(json!({ "reason": "Certificate missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "REJECTED");
    assert_eq!(body["data"]["approval"]["rejected"]["reason"], "Certificate missing");
    assert!(body["data"]["credits_earned"].is_null());
}

#[actix_web::test]
async fn private_activities_stay_with_their_owner() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let type_id = create_activity_type(&app, &admin.token).await;
    let owner = register_student(&app, admin.institute_id).await;
    let classmate = register_student(&app, admin.institute_id).await;
    let activity_id = create_activity(&app, &owner.token, type_id, false).await;
    let path = format!("/api/v1/activities/{activity_id}");

    let (status, _) = send(&app, "GET", &path, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &path, Some(&classmate.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "GET", &path, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/api/v1/activities", Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_items"], 0);

    let (status, body) = send(&app, "GET", "/api/v1/activities", Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_items"], 1);
}

#[actix_web::test]
async fn details_must_follow_the_form_schema() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let type_id = create_activity_type(&app, &admin.token).await;
    let student = register_student(&app, admin.institute_id).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/activities",
        Some(&student.token),
        Some(json!({ "activity_type_id": type_id, "title": "Missing organizer", "details": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/activities",
        Some(&admin.token),
        Some(json!({ "activity_type_id": type_id, "title": "Admins cannot", "details": { "organizer": "x" } })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn duplicate_type_keys_conflict_within_an_institute() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let other = register_institute(&app).await;

    let body = |key: &str| json!({ "name": "Sports meet", "key": key, "min_credits": 1, "max_credits": 2 });

    let (status, _) = send(&app, "POST", "/api/v1/activity-types", Some(&admin.token), Some(body("Sports"))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&app, "POST", "/api/v1/activity-types", Some(&admin.token), Some(body(" sports "))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, "POST", "/api/v1/activity-types", Some(&other.token), Some(body("sports"))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[actix_web::test]
async fn assigned_types_are_reviewed_by_their_faculty() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let type_id = create_activity_type(&app, &admin.token).await;
    let student = register_student(&app, admin.institute_id).await;
    let assigned = register_faculty(&app, admin.institute_id).await;
    let bystander = register_faculty(&app, admin.institute_id).await;

    let (_, me) = send(&app, "GET", "/api/v1/auth/me", Some(&assigned.token), None).await;
    let faculty_id = me["data"]["claims"]["faculty_id"].clone();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/activity-type-assignments",
        Some(&admin.token),
        Some(json!({ "activity_type_id": type_id, "faculty_id": faculty_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/activity-type-assignments",
        Some(&admin.token),
        Some(json!({ "activity_type_id": type_id, "faculty_id": faculty_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let activity_id = create_activity(&app, &student.token, type_id, true).await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/activity-type-assignments/me/pending-activities",
        Some(&assigned.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], activity_id.to_string());

    let approve = format!("/api/v1/activities/{activity_id}/approve");
    let (status, _) = send(&app, "POST", &approve, Some(&bystander.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "POST", &approve, Some(&student.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, "POST", &approve, Some(&assigned.token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/activities/stats/summary",
        Some(&student.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["approved"], 1);
    assert_eq!(body["data"]["total_credits"], 2);
}

#[actix_web::test]
async fn malformed_review_bodies_leave_the_activity_pending() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let type_id = create_activity_type(&app, &admin.token).await;
    let student = register_student(&app, admin.institute_id).await;
    let activity_id = create_activity(&app, &student.token, type_id, true).await;
    let path = format!("/api/v1/activities/{activity_id}");

    let (status, body) = send(
        &app,
        "POST",
        &format!("{path}/approve"),
        Some(&admin.token),
        Some(json!({ "credits_awarded": "7" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = send(&app, "GET", &path, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "PENDING");
    assert!(body["data"]["credits_earned"].is_null());
}

#[actix_web::test]
async fn rejecting_an_unknown_activity_is_not_found_even_without_a_reason() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/activities/{}/reject", Uuid::new_v4()),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn reviewer_stats_skip_private_activities() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let type_id = create_activity_type(&app, &admin.token).await;
    let student = register_student(&app, admin.institute_id).await;
    create_activity(&app, &student.token, type_id, true).await;
    create_activity(&app, &student.token, type_id, false).await;

    let stats = "/api/v1/activities/stats/summary";
    let (status, body) = send(&app, "GET", stats, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["pending"], 1);

    let (_, body) = send(&app, "GET", stats, Some(&student.token), None).await;
    assert_eq!(body["data"]["total"], 2);
}

#[actix_web::test]
async fn faculty_proposed_types_wait_for_an_admin() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let faculty = register_faculty(&app, admin.institute_id).await;

    let propose = |name: &str| json!({ "name": name, "min_credits": 1, "max_credits": 3 });
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/activity-types",
        Some(&faculty.token),
        Some(propose("Paper presentation")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "SUBMITTED");
    let accepted = id_at(&body, "/data/id");
    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/activity-types",
        Some(&faculty.token),
        Some(propose("Quiz night")),
    )
    .await;
    let declined = id_at(&body, "/data/id");

    let (status, pending) = send(&app, "GET", "/api/v1/activity-types/pending", Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["data"].as_array().unwrap().len(), 2);
    let (status, _) = send(&app, "GET", "/api/v1/activity-types/pending", Some(&faculty.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let approve = format!("/api/v1/activity-types/{accepted}/approve");
    let (status, _) = send(&app, "POST", &approve, Some(&faculty.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, "POST", &approve, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "APPROVED");
    let (status, _) = send(&app, "POST", &approve, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/activity-types/{declined}/reject"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "REJECTED");

    let (_, pending) = send(&app, "GET", "/api/v1/activity-types/pending", Some(&admin.token), None).await;
    assert!(pending["data"].as_array().unwrap().is_empty());
    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/v1/activity-types/{declined}"),
        Some(&faculty.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn types_in_use_cannot_be_deleted() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let used = create_activity_type(&app, &admin.token).await;
    let unused = create_activity_type(&app, &admin.token).await;
    let student = register_student(&app, admin.institute_id).await;
    create_activity(&app, &student.token, used, true).await;

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/v1/activity-types/{used}"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let path = format!("/api/v1/activity-types/{unused}");
    let (status, _) = send(&app, "DELETE", &path, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &path, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
