use std::collections::HashMap;

use actix_web::{delete, get, post, web, HttpResponse};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::realtime::{DeletedMessage, EventHub, HubEvent, ReadReceipt, TypingSignal};
use crate::core::{AppError, AppSuccessResponse};
use crate::db::{messages, users};
use crate::models::messages::{
    preview, ConversationPage, ConversationQuery, MarkReadRequest, MarkReadResponse,
    SendMessageRequest, SortOrder, TypingRequest,
};
use crate::models::notifications::{NewNotification, NotificationKind};
use crate::models::pagination::PaginationQuery;
use crate::routes::notifications::notify_quietly;

#[tracing::instrument(name = "Send message", skip(pool, hub, auth, request))]
#[post("")]
pub async fn send_message(
    pool: web::Data<PgPool>,
    hub: web::Data<EventHub>,
    auth: JwtMiddleware,
    request: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    let content = request
        .trimmed_content()
        .map_err(AppError::validation_error)?;
    if request.recipient_id == auth.user_id {
        return Err(AppError::validation_error("You cannot message yourself"));
    }
    if !users::user_exists(&pool, request.recipient_id).await? {
        return Err(AppError::not_found("Recipient not found"));
    }

    let attachments: Vec<String> = request
        .attachments
        .iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    let message = messages::insert_message(
        &pool,
        auth.user_id,
        request.recipient_id,
        &content,
        &attachments,
    )
    .await?;

    if hub.is_online(message.recipient_id) {
        hub.publish(message.recipient_id, HubEvent::Message(message.clone()));
    } else {
        let body = if content.is_empty() {
            "Sent an attachment".to_string()
        } else {
            preview(&content)
        };
        notify_quietly(
            &pool,
            &hub,
            NewNotification::new(
                message.recipient_id,
                NotificationKind::Message,
                format!("New message from {}", auth.claims.name),
                body,
            )
            .related_to(message.id)
            .with_metadata(json!({ "sender_id": auth.user_id })),
        )
        .await;
    }

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(message, "Message sent")))
}

#[tracing::instrument(name = "Get conversation", skip(pool, auth))]
#[get("")]
pub async fn conversation(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    query: web::Query<ConversationQuery>,
) -> Result<HttpResponse, AppError> {
    let pagination = PaginationQuery::new(query.page, query.per_page);
    let (messages, has_more) = messages::conversation(
        &pool,
        auth.user_id,
        query.with_user,
        query.sort.unwrap_or(SortOrder::Desc),
        pagination.limit(),
        pagination.offset(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        ConversationPage { messages, has_more },
        "Messages retrieved successfully",
    )))
}

#[tracing::instrument(name = "Mark messages read", skip(pool, hub, auth, request))]
#[post("/read")]
pub async fn mark_read(
    pool: web::Data<PgPool>,
    hub: web::Data<EventHub>,
    auth: JwtMiddleware,
    request: web::Json<MarkReadRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    let updated = messages::mark_read(&pool, auth.user_id, &request.message_ids).await?;

    let mut by_sender: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for message in &updated {
        by_sender.entry(message.sender_id).or_default().push(message.id);
    }
    for (sender_id, message_ids) in by_sender {
        hub.publish(
            sender_id,
            HubEvent::Read(ReadReceipt {
                reader_id: auth.user_id,
                message_ids,
            }),
        );
    }

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        MarkReadResponse {
            updated: updated.len(),
        },
        "Messages marked as read",
    )))
}

#[tracing::instrument(name = "Delete message", skip(pool, hub, auth))]
#[delete("/{message_id}")]
pub async fn delete_message(
    pool: web::Data<PgPool>,
    hub: web::Data<EventHub>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let message = messages::get_message(&pool, path.into_inner()).await?;
    if message.sender_id != auth.user_id {
        return Err(AppError::forbidden_error(
            "You can only delete messages you sent",
        ));
    }

    messages::delete_message(&pool, message.id).await?;
    hub.publish(
        message.recipient_id,
        HubEvent::Delete(DeletedMessage {
            message_id: message.id,
            deleted_by: auth.user_id,
        }),
    );

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        json!({ "id": message.id }),
        "Message deleted",
    )))
}

#[tracing::instrument(name = "Typing signal", skip(hub, auth))]
#[post("/typing")]
pub async fn typing(
    hub: web::Data<EventHub>,
    auth: JwtMiddleware,
    request: web::Json<TypingRequest>,
) -> Result<HttpResponse, AppError> {
    hub.publish(
        request.recipient_id,
        HubEvent::Typing(TypingSignal {
            from: auth.user_id,
            is_typing: request.is_typing,
        }),
    );

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        json!({ "delivered": hub.is_online(request.recipient_id) }),
        "Typing signal sent",
    )))
}
