use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::json;
use uuid::Uuid;

use smart_student_hub::core::realtime::HubEvent;

use crate::helpers::{hub_app, register_institute, register_student, send, test_state};

#[actix_web::test]
async fn friend_requests_flow_through_notifications() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let institute = register_institute(&app).await.institute_id;
    let alice = register_student(&app, institute).await;
    let bob = register_student(&app, institute).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/friendships",
        Some(&alice.token),
        Some(json!({ "recipient_id": alice.user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/friendships",
        Some(&alice.token),
        Some(json!({ "recipient_id": bob.user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let friendship_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/friendships",
        Some(&bob.token),
        Some(json!({ "recipient_id": alice.user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let respond = format!("/api/v1/friendships/{friendship_id}/respond");
    let (status, _) = send(&app, "POST", &respond, Some(&alice.token), Some(json!({ "action": "accept" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, received) = send(&app, "GET", "/api/v1/friendships/received", Some(&bob.token), None).await;
    assert_eq!(received["data"].as_array().map(Vec::len), Some(1));

    let (status, body) = send(&app, "POST", &respond, Some(&bob.token), Some(json!({ "action": "accept" }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "accepted");

    let (_, friends) = send(&app, "GET", "/api/v1/friendships", Some(&alice.token), None).await;
    assert_eq!(friends["data"].as_array().map(Vec::len), Some(1));

    let (_, notifications) = send(&app, "GET", "/api/v1/notifications", Some(&alice.token), None).await;
    assert_eq!(notifications["data"][0]["kind"], "friend_accepted");
}

#[actix_web::test]
async fn messages_reach_online_recipients_as_events() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let institute = register_institute(&app).await.institute_id;
    let alice = register_student(&app, institute).await;
    let bob = register_student(&app, institute).await;

    let mut bob_stream = state.hub.subscribe(bob.user_id);
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/messages",
        Some(&alice.token),
        Some(json!({ "recipient_id": bob.user_id, "content": "  hello bob  " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["content"], "hello bob");

    match bob_stream.next_event().await.unwrap() {
        HubEvent::Message(message) => assert_eq!(message.sender_id, alice.user_id),
        other => panic!("unexpected event {other:?}"),
    }

    let (_, count) = send(&app, "GET", "/api/v1/notifications/unread-count", Some(&bob.token), None).await;
    assert_eq!(count["data"]["unread"], 0);
}

#[actix_web::test]
async fn offline_recipients_get_a_message_notification() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let institute = register_institute(&app).await.institute_id;
    let alice = register_student(&app, institute).await;
    let bob = register_student(&app, institute).await;

    let long = "x".repeat(250);
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/messages",
        Some(&alice.token),
        Some(json!({ "recipient_id": bob.user_id, "content": long })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, notifications) = send(&app, "GET", "/api/v1/notifications", Some(&bob.token), None).await;
    assert_eq!(notifications["data"][0]["kind"], "message");
    let preview = notifications["data"][0]["message"].as_str().unwrap();
    assert_eq!(preview.chars().count(), 201);
}

#[actix_web::test]
async fn read_receipts_and_deletes_respect_ownership() {
    let Some(state) = test_state().await else {
        return;
    };
    let app = test::init_service(hub_app(&state)).await;
    let institute = register_institute(&app).await.institute_id;
    let alice = register_student(&app, institute).await;
    let bob = register_student(&app, institute).await;

    let mut ids = Vec::new();
    for content in ["one", "two", "three"] {
        let (_, body) = send(
            &app,
            "POST",
            "/api/v1/messages",
            Some(&alice.token),
            Some(json!({ "recipient_id": bob.user_id, "content": content })),
        )
        .await;
        ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    let (_, page) = send(
        &app,
        "GET",
        &format!("/api/v1/messages?with_user={}&per_page=2", alice.user_id),
        Some(&bob.token),
        None,
    )
    .await;
    assert_eq!(page["data"]["messages"].as_array().map(Vec::len), Some(2));
    assert_eq!(page["data"]["has_more"], true);
    assert_eq!(page["data"]["messages"][0]["content"], "three");

    // the sender cannot mark their own messages read
    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/messages/read",
        Some(&alice.token),
        Some(json!({ "message_ids": ids })),
    )
    .await;
    assert_eq!(body["data"]["updated"], 0);

    let mut alice_stream = state.hub.subscribe(alice.user_id);
    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/messages/read",
        Some(&bob.token),
        Some(json!({ "message_ids": ids, })),
    )
    .await;
    assert_eq!(body["data"]["updated"], 3);
    match alice_stream.next_event().await.unwrap() {
        HubEvent::Read(receipt) => {
            assert_eq!(receipt.reader_id, bob.user_id);
            assert_eq!(receipt.message_ids.len(), 3);
        }
        other => panic!("unexpected event {other:?}"),
    }

    let delete = format!("/api/v1/messages/{}", ids[0]);
    let (status, _) = send(&app, "DELETE", &delete, Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &delete, Some(&alice.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let missing = format!("/api/v1/messages/{}", Uuid::new_v4());
    let (status, _) = send(&app, "DELETE", &missing, Some(&alice.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
