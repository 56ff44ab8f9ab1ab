use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::json;
use uuid::Uuid;

use crate::helpers::{
    create_activity, create_activity_type, hub_app, profile_id, register_faculty,
    register_institute, register_student, send, test_state,
};

#[actix_web::test]
async fn bulk_type_assignment_reports_each_row() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let type_id = create_activity_type(&app, &admin.token).await;
    let faculty = register_faculty(&app, admin.institute_id).await;
    let faculty_id = profile_id(&app, &faculty.token, "faculty_id").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/activity-type-assignments/bulk",
        Some(&admin.token),
        Some(json!({
            "faculty_id": faculty_id,
            "activity_type_ids": [type_id, type_id, Uuid::new_v4()],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let report = &body["data"];
    assert_eq!(report["status"], "partial");
    assert_eq!(report["assigned"], 1);
    assert_eq!(report["already_assigned"], 1);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["rows"][0]["outcome"], "assigned");
    assert_eq!(report["rows"][1]["outcome"], "already_assigned");
    assert_eq!(report["rows"][2]["outcome"], "failed");

    let (_, types) = send(
        &app,
        "GET",
        "/api/v1/activity-type-assignments/me",
        Some(&faculty.token),
        None,
    )
    .await;
    assert_eq!(types["data"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn unassigned_types_can_be_reviewed_by_any_faculty() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let type_id = create_activity_type(&app, &admin.token).await;
    let student = register_student(&app, admin.institute_id).await;
    let faculty = register_faculty(&app, admin.institute_id).await;
    let activity_id = create_activity(&app, &student.token, type_id, true).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/activities/{activity_id}/approve"),
        Some(&faculty.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[actix_web::test]
async fn activity_assignment_overrides_the_type_reviewer() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let type_id = create_activity_type(&app, &admin.token).await;
    let student = register_student(&app, admin.institute_id).await;
    let type_reviewer = register_faculty(&app, admin.institute_id).await;
    let chosen = register_faculty(&app, admin.institute_id).await;
    let type_reviewer_id = profile_id(&app, &type_reviewer.token, "faculty_id").await;
    let chosen_id = profile_id(&app, &chosen.token, "faculty_id").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/activity-type-assignments",
        Some(&admin.token),
        Some(json!({ "activity_type_id": type_id, "faculty_id": type_reviewer_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let routed = create_activity(&app, &student.token, type_id, true).await;
    let unrouted = create_activity(&app, &student.token, type_id, true).await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/activity-assignments",
        Some(&admin.token),
        Some(json!({ "activity_id": routed, "faculty_id": chosen_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (_, queue) = send(
        &app,
        "GET",
        "/api/v1/activity-type-assignments/me/pending-activities",
        Some(&type_reviewer.token),
        None,
    )
    .await;
    assert_eq!(queue["pagination"]["total_items"], 1);
    assert_eq!(queue["data"][0]["id"], unrouted.to_string());

    let approve = format!("/api/v1/activities/{routed}/approve");
    let (status, _) = send(&app, "POST", &approve, Some(&type_reviewer.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, "POST", &approve, Some(&chosen.token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/activities/{unrouted}/approve"),
        Some(&chosen.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn activities_can_be_routed_moved_and_released() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let type_id = create_activity_type(&app, &admin.token).await;
    let student = register_student(&app, admin.institute_id).await;
    let first = register_faculty(&app, admin.institute_id).await;
    let second = register_faculty(&app, admin.institute_id).await;
    let first_id = profile_id(&app, &first.token, "faculty_id").await;
    let second_id = profile_id(&app, &second.token, "faculty_id").await;
    let held = create_activity(&app, &student.token, type_id, true).await;
    let free = create_activity(&app, &student.token, type_id, true).await;

    let assign = json!({ "activity_id": held, "faculty_id": first_id });
    let (status, _) = send(&app, "POST", "/api/v1/activity-assignments", Some(&admin.token), Some(assign.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, "POST", "/api/v1/activity-assignments", Some(&admin.token), Some(assign)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap_or_default().contains(&first_id.to_string()), "{body}");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/activity-assignments/bulk",
        Some(&admin.token),
        Some(json!({ "faculty_id": second_id, "activity_ids": [held, free] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["rows"][0]["outcome"], "failed");
    assert_eq!(body["data"]["rows"][0]["current_faculty_id"], first_id.to_string());
    assert_eq!(body["data"]["rows"][1]["outcome"], "assigned");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/activity-assignments/activity/{free}"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["faculty_id"], second_id.to_string());

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/v1/activity-assignments/reassign",
        Some(&admin.token),
        Some(json!({ "activity_id": held, "faculty_id": second_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["faculty_id"], second_id.to_string());

    let (_, counts) = send(
        &app,
        "GET",
        "/api/v1/activity-assignments/faculty-counts",
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(counts["data"].as_array().unwrap().len(), 1);
    assert_eq!(counts["data"][0]["faculty_id"], second_id.to_string());
    assert_eq!(counts["data"][0]["count"], 2);

    let (status, mine) = send(&app, "GET", "/api/v1/activity-assignments/me", Some(&second.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["data"].as_array().unwrap().len(), 2);
    let (status, _) = send(&app, "GET", "/api/v1/activity-assignments/me", Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let release = format!("/api/v1/activity-assignments/activity/{held}");
    let (status, _) = send(&app, "DELETE", &release, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", &release, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &app,
        "PATCH",
        "/api/v1/activity-assignments/reassign",
        Some(&admin.token),
        Some(json!({ "activity_id": held, "faculty_id": first_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn activities_of_other_institutes_cannot_be_routed() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let stranger = register_institute(&app).await;
    let type_id = create_activity_type(&app, &admin.token).await;
    let student = register_student(&app, admin.institute_id).await;
    let activity_id = create_activity(&app, &student.token, type_id, true).await;
    let faculty = register_faculty(&app, stranger.institute_id).await;
    let faculty_id = profile_id(&app, &faculty.token, "faculty_id").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/activity-assignments",
        Some(&stranger.token),
        Some(json!({ "activity_id": activity_id, "faculty_id": faculty_id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
