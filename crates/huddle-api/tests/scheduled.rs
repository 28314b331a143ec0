mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use huddle_api::scheduler::JobKey;
use huddle_store::unix_now;

use common::TestApp;

#[tokio::test(start_paused = true)]
async fn send_later_delivers_at_time_sent() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "Alice", "Smith").await;
    let channel = app.create_channel(&alice, "general", true).await;

    let time_sent = unix_now() + 10;
    let (status, body) = app
        .post(
            "/message/sendlater/v1",
            &alice.token,
            json!({ "channelId": channel, "message": "later", "timeSent": time_sent }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["messageId"].as_u64().unwrap();
    assert!(app.state.scheduler.is_pending(JobKey::Send(id as u32)));

    // The id is reserved up front, the message is not visible yet.
    let now_id = app.send(&alice, channel, "now").await;
    assert!(now_id > id);
    assert_eq!(app.channel_messages(&alice, channel).await.len(), 1);

    // Not editable until it exists.
    let (status, _) = app
        .put(
            "/message/edit/v2",
            &alice.token,
            json!({ "messageId": id, "message": "sooner" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    tokio::time::sleep(Duration::from_secs(11)).await;

    let messages = app.channel_messages(&alice, channel).await;
    assert_eq!(messages.len(), 2);
    let later = messages.iter().find(|m| m["messageId"] == id).unwrap();
    assert_eq!(later["message"], "later");
    assert_eq!(later["timeSent"], time_sent);
    assert_eq!(app.state.scheduler.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn send_later_validates_before_scheduling() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "Alice", "Smith").await;
    let bob = app.register("bob@example.com", "Bob", "Jones").await;
    let channel = app.create_channel(&alice, "general", true).await;
    let future = unix_now() + 60;

    let cases = [
        (&alice, json!({ "channelId": channel, "message": "late", "timeSent": unix_now() - 10 }), StatusCode::BAD_REQUEST),
        (&alice, json!({ "channelId": channel, "message": "", "timeSent": future }), StatusCode::BAD_REQUEST),
        (&alice, json!({ "channelId": 42, "message": "hi", "timeSent": future }), StatusCode::BAD_REQUEST),
        (&bob, json!({ "channelId": channel, "message": "hi", "timeSent": future }), StatusCode::FORBIDDEN),
    ];
    for (user, body, expected) in cases {
        let (status, _) = app.post("/message/sendlater/v1", &user.token, body).await;
        assert_eq!(status, expected);
    }
    assert_eq!(app.state.scheduler.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn removing_a_dm_cancels_its_scheduled_sends() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "Alice", "Smith").await;
    let bob = app.register("bob@example.com", "Bob", "Jones").await;
    let dm = app.create_dm(&alice, &[&bob]).await;

    let (status, body) = app
        .post(
            "/message/sendlaterdm/v1",
            &bob.token,
            json!({ "dmId": dm, "message": "see you", "timeSent": unix_now() + 30 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["messageId"].as_u64().unwrap() as u32;

    let (status, _) = app.delete(&format!("/dm/remove/v2?dmId={dm}"), &alice.token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!app.state.scheduler.is_pending(JobKey::Send(id)));

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(app.state.store.with_state(|ws| ws.locate_message(id).is_none()));
}

#[tokio::test(start_paused = true)]
async fn clear_cancels_pending_work() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "Alice", "Smith").await;
    let channel = app.create_channel(&alice, "general", true).await;

    app.post(
        "/message/sendlater/v1",
        &alice.token,
        json!({ "channelId": channel, "message": "later", "timeSent": unix_now() + 5 }),
    )
    .await;
    app.post(
        "/standup/start/v1",
        &alice.token,
        json!({ "channelId": channel, "length": 5 }),
    )
    .await;
    assert_eq!(app.state.scheduler.pending(), 2);

    app.state.clear();
    assert_eq!(app.state.scheduler.pending(), 0);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(app.state.store.with_state(|ws| ws.channels.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn standup_collects_lines_and_posts_summary() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "Alice", "Smith").await;
    let bob = app.register("bob@example.com", "Bob", "Jones").await;
    let carol = app.register("carol@example.com", "Carol", "Lee").await;
    let channel = app.create_channel(&alice, "general", true).await;
    app.join(&bob, channel).await;

    let (status, _) = app
        .get(&format!("/standup/active/v1?channelId={channel}"), &alice.token)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/standup/send/v1",
            &alice.token,
            json!({ "channelId": channel, "message": "too early" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/standup/start/v1",
            &alice.token,
            json!({ "channelId": channel, "length": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let time_finish = body["timeFinish"].as_i64().unwrap();

    let (_, body) = app
        .get(&format!("/standup/active/v1?channelId={channel}"), &bob.token)
        .await;
    assert_eq!(body, json!({ "isActive": true, "timeFinish": time_finish }));

    let (status, _) = app
        .post(
            "/standup/start/v1",
            &bob.token,
            json!({ "channelId": channel, "length": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The starter cannot walk out mid-standup.
    let (status, _) = app
        .post("/channel/leave/v2", &alice.token, json!({ "channelId": channel }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for (user, line) in [(&alice, "shipped the build"), (&bob, "fixing tests")] {
        let (status, _) = app
            .post(
                "/standup/send/v1",
                &user.token,
                json!({ "channelId": channel, "message": line }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = app
        .post(
            "/standup/send/v1",
            &carol.token,
            json!({ "channelId": channel, "message": "lurking" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Buffered lines are not messages yet.
    assert!(app.channel_messages(&alice, channel).await.is_empty());

    tokio::time::sleep(Duration::from_secs(6)).await;

    let messages = app.channel_messages(&bob, channel).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["uId"], alice.id);
    assert_eq!(
        messages[0]["message"],
        "alicesmith: shipped the build\nbobjones: fixing tests"
    );
    assert_eq!(messages[0]["timeSent"], time_finish);

    let (_, body) = app
        .get(&format!("/standup/active/v1?channelId={channel}"), &bob.token)
        .await;
    assert_eq!(body, json!({ "isActive": false, "timeFinish": null }));
}

#[tokio::test(start_paused = true)]
async fn standup_start_checks() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "Alice", "Smith").await;
    let bob = app.register("bob@example.com", "Bob", "Jones").await;
    let channel = app.create_channel(&alice, "general", true).await;

    let cases = [
        (&alice, json!({ "channelId": 42, "length": 5 }), StatusCode::BAD_REQUEST),
        (&alice, json!({ "channelId": channel, "length": -1 }), StatusCode::BAD_REQUEST),
        (&alice, json!({ "channelId": channel, "length": i64::MAX }), StatusCode::BAD_REQUEST),
        (&bob, json!({ "channelId": channel, "length": 5 }), StatusCode::FORBIDDEN),
    ];
    for (user, body, expected) in cases {
        let (status, _) = app.post("/standup/start/v1", &user.token, body).await;
        assert_eq!(status, expected);
    }

    let (status, _) = app
        .get(&format!("/standup/active/v1?channelId={channel}"), &bob.token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // None of the rejected starts left a standup or a timer behind.
    let (_, body) = app
        .get(&format!("/standup/active/v1?channelId={channel}"), &alice.token)
        .await;
    assert_eq!(body["isActive"], false);
    assert_eq!(app.state.scheduler.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn removed_user_scheduled_sends_are_dropped() {
    let app = TestApp::new();
    let owner = app.register("owner@example.com", "Olive", "Owner").await;
    let bob = app.register("bob@example.com", "Bob", "Jones").await;
    let channel = app.create_channel(&owner, "general", true).await;
    app.join(&bob, channel).await;

    let (status, body) = app
        .post(
            "/message/sendlater/v1",
            &bob.token,
            json!({ "channelId": channel, "message": "secret plan", "timeSent": unix_now() + 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["messageId"].as_u64().unwrap();

    let (status, _) = app
        .delete(&format!("/admin/user/remove/v1?uId={}", bob.id), &owner.token)
        .await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_secs(10)).await;

    let messages = app.channel_messages(&owner, channel).await;
    assert!(messages.is_empty(), "got {messages:?}");
    assert!(app.state.store.with_state(|ws| ws.locate_message(id as u32).is_none()));
    assert_eq!(app.state.scheduler.pending(), 0);
}
