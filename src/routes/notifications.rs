use actix_web::{delete, get, post, web, HttpResponse};
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::realtime::{EventHub, HubEvent};
use crate::core::{AppError, AppSuccessResponse};
use crate::db::notifications;
use crate::models::notifications::{
    MarkedCount, NewNotification, Notification, NotificationQuery, UnreadCount,
};
use crate::models::pagination::PaginationQuery;

/// Persists a notification and pushes it to the user's open event streams.
pub async fn notify(
    pool: &PgPool,
    hub: &EventHub,
    notification: NewNotification,
) -> Result<Notification, AppError> {
    let notification = notifications::insert_notification(pool, &notification).await?;
    hub.publish(
        notification.user_id,
        HubEvent::Notification(notification.clone()),
    );
    Ok(notification)
}

/// For side effects of an action that already succeeded: a failed
/// notification is logged, never surfaced.
pub async fn notify_quietly(pool: &PgPool, hub: &EventHub, notification: NewNotification) {
    let user_id = notification.user_id;
    let kind = notification.kind;
    if let Err(e) = notify(pool, hub, notification).await {
        tracing::warn!(%user_id, %kind, error = %e, "failed to deliver notification");
    }
}

#[tracing::instrument(name = "List notifications", skip(pool, auth))]
#[get("")]
pub async fn list_notifications(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    query: web::Query<NotificationQuery>,
) -> Result<HttpResponse, AppError> {
    let pagination = PaginationQuery::new(query.page, query.per_page);

    let (items, total) = notifications::list_notifications(
        &pool,
        auth.user_id,
        query.unread_only,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::paginated(
        items,
        "Notifications retrieved successfully",
        pagination.meta(total),
    )))
}

#[tracing::instrument(name = "Unread notification count", skip(pool, auth))]
#[get("/unread-count")]
pub async fn unread_count(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let unread = notifications::unread_count(&pool, auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        UnreadCount { unread },
        "Unread count retrieved",
    )))
}

#[tracing::instrument(name = "Mark all notifications read", skip(pool, auth))]
#[post("/read-all")]
pub async fn mark_all_read(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let updated = notifications::mark_all_read(&pool, auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        MarkedCount { updated },
        "Notifications marked as read",
    )))
}

#[tracing::instrument(name = "Mark notification read", skip(pool, auth))]
#[post("/{notification_id}/read")]
pub async fn mark_read(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let notification = notifications::mark_read(&pool, path.into_inner(), auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        notification,
        "Notification marked as read",
    )))
}

#[tracing::instrument(name = "Delete notification", skip(pool, auth))]
#[delete("/{notification_id}")]
pub async fn delete_notification(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    notifications::delete_notification(&pool, id, auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        serde_json::json!({ "id": id }),
        "Notification deleted successfully",
    )))
}
