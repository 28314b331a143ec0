mod common;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use common::TestApp;

fn assert_envelope(status: StatusCode, body: &Value, what: &str) {
    assert_eq!(status, StatusCode::BAD_REQUEST, "{what}");
    assert!(body["error"]["message"].is_string(), "{what} gave {body}");
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "Alice", "Smith").await;
    let channel = app.create_channel(&alice, "general", true).await;
    let id = app.send(&alice, channel, "hello").await;

    let cases = [
        ("/message/react/v1", json!({ "messageId": -1, "reactId": 1 })),
        ("/message/react/v1", json!({ "messageId": id, "reactId": "one" })),
        ("/dm/create/v2", json!({ "uIds": [-3] })),
        ("/channels/create/v3", json!({ "name": "missing isPublic" })),
        ("/standup/start/v1", json!({ "channelId": channel })),
        ("/message/send/v2", json!({ "channelId": channel, "message": 7 })),
    ];
    for (uri, body) in cases {
        let what = format!("{uri} {body}");
        let (status, body) = app.post(uri, &alice.token, body).await;
        assert_envelope(status, &body, &what);
    }

    // Nothing was created along the way.
    assert_eq!(app.channel_messages(&alice, channel).await.len(), 1);
    let (_, body) = app.get("/channels/listall/v3", &alice.token).await;
    assert_eq!(body["channels"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_queries_are_bad_requests() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "Alice", "Smith").await;
    let channel = app.create_channel(&alice, "general", true).await;

    for uri in [
        format!("/channel/messages/v3?channelId={channel}&start=-1"),
        format!("/channel/messages/v3?channelId={channel}"),
        "/channel/details/v3?channelId=abc".to_string(),
        "/user/profile/v3".to_string(),
    ] {
        let (status, body) = app.get(&uri, &alice.token).await;
        assert_envelope(status, &body, &uri);
    }

    let (status, body) = app.delete("/message/remove/v2?messageId=-5", &alice.token).await;
    assert_envelope(status, &body, "negative messageId");
}

#[tokio::test]
async fn body_without_json_content_type_is_a_bad_request() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "Alice", "Smith").await;

    let (status, body) = app
        .request(Method::POST, "/channels/create/v3", Some(&alice.token), None)
        .await;
    assert_envelope(status, &body, "empty body");
}
