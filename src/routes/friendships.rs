use actix_web::{delete, get, post, web, HttpResponse};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::realtime::EventHub;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::friendships::{self, FriendshipList};
use crate::db::users;
use crate::models::friendships::{FriendRequest, FriendResponse, RespondRequest};
use crate::models::notifications::{NewNotification, NotificationKind};
use crate::routes::notifications::notify_quietly;

#[tracing::instrument(name = "Send friend request", skip(pool, hub, auth))]
#[post("")]
pub async fn send_request(
    pool: web::Data<PgPool>,
    hub: web::Data<EventHub>,
    auth: JwtMiddleware,
    request: web::Json<FriendRequest>,
) -> Result<HttpResponse, AppError> {
    if request.recipient_id == auth.user_id {
        return Err(AppError::validation_error(
            "You cannot send a friend request to yourself",
        ));
    }
    if !users::user_exists(&pool, request.recipient_id).await? {
        return Err(AppError::not_found("User not found"));
    }

    let friendship = friendships::insert_request(&pool, auth.user_id, request.recipient_id).await?;

    notify_quietly(
        &pool,
        &hub,
        NewNotification::new(
            friendship.recipient_id,
            NotificationKind::FriendRequest,
            "New friend request",
            format!("{} sent you a friend request", auth.claims.name),
        )
        .related_to(friendship.id)
        .with_metadata(json!({ "from": auth.user_id })),
    )
    .await;

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        friendship,
        "Friend request sent",
    )))
}

#[tracing::instrument(name = "Respond to friend request", skip(pool, hub, auth))]
#[post("/{friendship_id}/respond")]
pub async fn respond(
    pool: web::Data<PgPool>,
    hub: web::Data<EventHub>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
    request: web::Json<RespondRequest>,
) -> Result<HttpResponse, AppError> {
    let friendship = friendships::get_friendship(&pool, path.into_inner()).await?;
    if friendship.recipient_id != auth.user_id {
        return Err(AppError::forbidden_error(
            "Only the recipient can respond to a friend request",
        ));
    }

    let friendship = friendships::respond(&pool, friendship.id, request.action.status())
        .await?
        .ok_or_else(|| AppError::validation_error("Friend request has already been answered"))?;

    if request.action == FriendResponse::Accept {
        notify_quietly(
            &pool,
            &hub,
            NewNotification::new(
                friendship.requester_id,
                NotificationKind::FriendAccepted,
                "Friend request accepted",
                format!("{} accepted your friend request", auth.claims.name),
            )
            .related_to(friendship.id)
            .with_metadata(json!({ "by": auth.user_id })),
        )
        .await;
    }

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        friendship,
        "Friend request answered",
    )))
}

#[tracing::instrument(name = "Remove friendship", skip(pool, auth))]
#[delete("/{friendship_id}")]
pub async fn remove(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let friendship = friendships::get_friendship(&pool, path.into_inner()).await?;
    if !friendship.involves(auth.user_id) {
        return Err(AppError::forbidden_error(
            "You are not part of this friendship",
        ));
    }

    friendships::delete_friendship(&pool, friendship.id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        json!({ "id": friendship.id }),
        "Friendship removed",
    )))
}

async fn list(
    pool: &PgPool,
    user_id: Uuid,
    which: FriendshipList,
    message: &str,
) -> Result<HttpResponse, AppError> {
    let items = friendships::list_for_user(pool, user_id, which).await?;
    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(items, message)))
}

#[tracing::instrument(name = "List friends", skip(pool, auth))]
#[get("")]
pub async fn list_friends(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    list(&pool, auth.user_id, FriendshipList::Accepted, "Friends retrieved").await
}

#[tracing::instrument(name = "List sent friend requests", skip(pool, auth))]
#[get("/sent")]
pub async fn list_sent(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    list(
        &pool,
        auth.user_id,
        FriendshipList::SentPending,
        "Sent friend requests retrieved",
    )
    .await
}

#[tracing::instrument(name = "List received friend requests", skip(pool, auth))]
#[get("/received")]
pub async fn list_received(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    list(
        &pool,
        auth.user_id,
        FriendshipList::ReceivedPending,
        "Received friend requests retrieved",
    )
    .await
}
