use std::time::Duration;

use actix_web::web::Bytes;
use actix_web::{get, http::header, web, HttpRequest, HttpResponse};
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;

use crate::core::jwt_auth::{bearer_token, JwtKeys};
use crate::core::realtime::{EventHub, HubError, Subscription};
use crate::core::AppError;

const KEEP_ALIVE: Duration = Duration::from_secs(20);

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// EventSource cannot set headers, so the token may ride in the query.
    pub token: Option<String>,
}

async fn next_frame(subscription: &mut Subscription) -> Result<Bytes, HubError> {
    loop {
        match tokio::time::timeout(KEEP_ALIVE, subscription.next_event()).await {
            Err(_) => return Ok(Bytes::from_static(b": keep-alive\n\n")),
            Ok(Err(e)) => return Err(e),
            Ok(Ok(event)) => match event.to_sse_frame() {
                Ok(frame) => return Ok(Bytes::from(frame)),
                Err(e) => {
                    tracing::warn!(error = %e, event = event.name(), "dropping unencodable event");
                }
            },
        }
    }
}

/// Server-sent event stream of everything addressed to the caller. The
/// caller counts as online while at least one stream is open.
#[tracing::instrument(name = "Open event stream", skip(hub, keys, req, query))]
#[get("")]
pub async fn event_stream(
    hub: web::Data<EventHub>,
    keys: web::Data<JwtKeys>,
    req: HttpRequest,
    query: web::Query<StreamQuery>,
) -> Result<HttpResponse, AppError> {
    let token = bearer_token(&req)
        .or_else(|| query.into_inner().token)
        .ok_or_else(|| AppError::unauthorized("Invalid login credentials"))?;
    let claims = keys.verify(&token)?;

    let subscription = hub.subscribe(claims.sub);
    tracing::info!(user_id = %subscription.user_id(), "event stream opened");

    let opening = stream::once(async { Ok::<_, HubError>(Bytes::from_static(b": connected\n\n")) });
    let events = stream::unfold(subscription, |mut subscription| async move {
        match next_frame(&mut subscription).await {
            Ok(frame) => Some((Ok(frame), subscription)),
            Err(_) => None,
        }
    });

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(opening.chain(events)))
}
