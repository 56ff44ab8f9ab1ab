use actix_web::http::StatusCode;
use actix_web::test;

use crate::helpers::{hub_app, send, test_state};

#[actix_web::test]
async fn health_check_reports_the_database() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;

    let (status, body) = send(&app, "GET", "/api/v1/health_check", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "up");
}
