use actix_web::{get, web, HttpResponse};
use serde_json::json;
use sqlx::PgPool;

#[get("/health_check")]
pub async fn health_check(pool: web::Data<PgPool>) -> HttpResponse {
    let database = match sqlx::query("SELECT 1").execute(pool.get_ref()).await {
        Ok(_) => "up",
        Err(e) => {
            tracing::warn!(error = %e, "health check could not reach the database");
            "down"
        }
    };

    HttpResponse::Ok().json(json!({ "status": "ok", "database": database }))
}
