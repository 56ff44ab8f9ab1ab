use actix_web::http::StatusCode;
use actix_web::test;
use claim::assert_err;
use serde_json::json;

use smart_student_hub::db::academics;
use smart_student_hub::models::academics::AcademicPath;

use crate::helpers::{
    academic_path, create_enrolled_student, hub_app, id_at, register_institute, send, test_state,
};

#[actix_web::test]
async fn structure_upserts_are_idempotent() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;

    let (status, first) = send(
        &app,
        "POST",
        "/api/v1/academics/structure",
        Some(&admin.token),
        Some(academic_path("Engineering", "a")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    assert_eq!(first["data"]["created"], true);

    let (status, second) = send(
        &app,
        "POST",
        "/api/v1/academics/structure",
        Some(&admin.token),
        Some(academic_path(" Engineering ", "A")),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{second}");
    assert_eq!(second["data"]["created"], false);
    assert_eq!(second["data"]["section_id"], first["data"]["section_id"]);

    let (status, tree) = send(&app, "GET", "/api/v1/academics/tree", Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let programs = tree["data"].as_array().unwrap();
    assert_eq!(programs.len(), 1);
    let specialization = &programs[0]["degrees"][0]["branches"][0]["specializations"][0];
    assert_eq!(specialization["name"], "General");
    assert_eq!(specialization["years"][0]["semesters"][0]["sections"][0]["name"], "A");
}

#[actix_web::test]
async fn a_failed_cascade_leaves_nothing_behind() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;

    let mut path = academic_path("Engineering", "A");
    path["year"] = json!(0);
    let path: AcademicPath = serde_json::from_value(path).unwrap();

    let mut tx = state.pool.begin().await.unwrap();
    assert_err!(academics::upsert_path(&mut *tx, admin.institute_id, &path).await);
    tx.rollback().await.unwrap();

    let programs = academics::list_programs(&state.pool, admin.institute_id, None)
        .await
        .unwrap();
    assert!(programs.is_empty());
}

#[actix_web::test]
async fn bulk_structure_rows_succeed_independently() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;

    let mut bad = academic_path("Engineering", "B");
    bad["year"] = json!(0);
    let rows = json!({
        "rows": [academic_path("Engineering", "A"), bad, academic_path("Engineering", "A")]
    });

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/academics/structure/bulk",
        Some(&admin.token),
        Some(rows),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "partial");
    assert_eq!(body["data"]["succeeded"], 2);
    assert_eq!(body["data"]["failed"], 1);
    assert_eq!(body["data"]["rows"][1]["success"], false);
    assert_eq!(body["data"]["rows"][0]["data"]["created"], true);
    assert_eq!(body["data"]["rows"][2]["data"]["created"], false);
}

#[actix_web::test]
async fn programs_can_be_edited_and_removed_once_empty() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;

    let (_, science) = send(
        &app,
        "POST",
        "/api/v1/academics/structure",
        Some(&admin.token),
        Some(academic_path("Science", "A")),
    )
    .await;
    let science_id = id_at(&science, "/data/program_id");
    let student_id =
        create_enrolled_student(&app, &admin.token, academic_path("Engineering", "A")).await;
    let (_, programs) = send(&app, "GET", "/api/v1/academics/programs", Some(&admin.token), None).await;
    let engineering = programs["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "Engineering")
        .unwrap();
    let engineering_id = id_at(engineering, "/id");

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/v1/academics/programs/{science_id}/intake"),
        Some(&admin.token),
        Some(json!({ "intake": 120 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["intake"], 120);

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/v1/academics/programs/{science_id}/intake"),
        Some(&admin.token),
        Some(json!({ "intake": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/v1/academics/programs/{science_id}"),
        Some(&admin.token),
        Some(json!({ "name": "Engineering" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let engineering_path = format!("/api/v1/academics/programs/{engineering_id}");
    let (status, _) = send(&app, "DELETE", &engineering_path, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/v1/students/{student_id}"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", &engineering_path, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, tree) = send(&app, "GET", "/api/v1/academics/tree", Some(&admin.token), None).await;
    assert_eq!(tree["data"].as_array().unwrap().len(), 1);
    assert_eq!(tree["data"][0]["name"], "Science");
}

#[actix_web::test]
async fn programs_of_other_institutes_are_off_limits() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let admin = register_institute(&app).await;
    let stranger = register_institute(&app).await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/academics/structure",
        Some(&admin.token),
        Some(academic_path("Engineering", "A")),
    )
    .await;
    let program_id = id_at(&body, "/data/program_id");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/v1/academics/programs/{program_id}"),
        Some(&stranger.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
