mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::TestApp;

fn ids(members: &Value) -> Vec<u64> {
    members
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["uId"].as_u64().unwrap())
        .collect()
}

#[tokio::test]
async fn create_list_and_details() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "Alice", "Smith").await;
    let bob = app.register("bob@example.com", "Bob", "Jones").await;

    let general = app.create_channel(&alice, "general", true).await;
    let secret = app.create_channel(&bob, "secret", false).await;

    let (_, body) = app.get("/channels/list/v3", &alice.token).await;
    assert_eq!(body["channels"], json!([{ "channelId": general, "name": "general" }]));

    let (_, body) = app.get("/channels/listall/v3", &alice.token).await;
    assert_eq!(body["channels"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .get(&format!("/channel/details/v3?channelId={general}"), &alice.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "general");
    assert_eq!(body["isPublic"], true);
    assert_eq!(ids(&body["ownerMembers"]), vec![alice.id]);
    assert_eq!(ids(&body["allMembers"]), vec![alice.id]);

    let (status, _) = app
        .get(&format!("/channel/details/v3?channelId={secret}"), &alice.token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .get("/channel/details/v3?channelId=999", &alice.token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn channel_names_are_bounded() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "Alice", "Smith").await;

    for name in ["", "abcdefghijklmnopqrstu"] {
        let (status, _) = app
            .post(
                "/channels/create/v3",
                &alice.token,
                json!({ "name": name, "isPublic": true }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {name:?}");
    }
}

#[tokio::test]
async fn join_rules() {
    let app = TestApp::new();
    let owner = app.register("owner@example.com", "Olive", "Owner").await;
    let bob = app.register("bob@example.com", "Bob", "Jones").await;
    let carol = app.register("carol@example.com", "Carol", "Lee").await;

    let private = app.create_channel(&bob, "private", false).await;
    let public = app.create_channel(&bob, "public", true).await;

    let (status, _) = app
        .post("/channel/join/v3", &carol.token, json!({ "channelId": private }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Global owners may join private channels.
    app.join(&owner, private).await;

    app.join(&carol, public).await;
    let (status, _) = app
        .post("/channel/join/v3", &carol.token, json!({ "channelId": public }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/channel/join/v3", &carol.token, json!({ "channelId": 42 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invite_adds_member_and_notifies() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "Alice", "Smith").await;
    let bob = app.register("bob@example.com", "Bob", "Jones").await;
    let carol = app.register("carol@example.com", "Carol", "Lee").await;
    let channel = app.create_channel(&alice, "general", false).await;

    // Non-members cannot invite.
    let (status, _) = app
        .post(
            "/channel/invite/v3",
            &carol.token,
            json!({ "channelId": channel, "uId": bob.id }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/channel/invite/v3",
            &alice.token,
            json!({ "channelId": channel, "uId": bob.id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    for (body, expected) in [
        (json!({ "channelId": channel, "uId": bob.id }), StatusCode::BAD_REQUEST),
        (json!({ "channelId": channel, "uId": 99 }), StatusCode::BAD_REQUEST),
        (json!({ "channelId": 99, "uId": carol.id }), StatusCode::BAD_REQUEST),
    ] {
        let (status, _) = app.post("/channel/invite/v3", &alice.token, body).await;
        assert_eq!(status, expected);
    }

    let feed = app.notifications(&bob).await;
    assert_eq!(
        feed,
        vec![json!({
            "channelId": channel,
            "dmId": -1,
            "notificationMessage": "alicesmith added you to general",
        })]
    );
}

#[tokio::test]
async fn owners_can_be_promoted_and_demoted() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "Alice", "Smith").await;
    let bob = app.register("bob@example.com", "Bob", "Jones").await;
    let channel = app.create_channel(&alice, "general", true).await;
    app.join(&bob, channel).await;

    let member = json!({ "channelId": channel, "uId": bob.id });

    // Plain members lack owner permissions.
    let (status, _) = app
        .post(
            "/channel/addowner/v2",
            &bob.token,
            json!({ "channelId": channel, "uId": alice.id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "alice is already an owner");
    let (status, _) = app
        .post(
            "/channel/removeowner/v2",
            &bob.token,
            json!({ "channelId": channel, "uId": alice.id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "alice is the only owner");

    let (status, _) = app
        .post("/channel/addowner/v2", &alice.token, member.clone())
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .post("/channel/addowner/v2", &alice.token, member.clone())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .get(&format!("/channel/details/v3?channelId={channel}"), &alice.token)
        .await;
    assert_eq!(ids(&body["ownerMembers"]), vec![alice.id, bob.id]);

    // Bob now demotes Alice; he is left as the sole owner.
    let (status, _) = app
        .post(
            "/channel/removeowner/v2",
            &bob.token,
            json!({ "channelId": channel, "uId": alice.id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .post("/channel/removeowner/v2", &bob.token, member)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Alice is still the global owner and a member, so she keeps owner rights.
    let (status, _) = app
        .post(
            "/channel/addowner/v2",
            &alice.token,
            json!({ "channelId": channel, "uId": alice.id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn non_owner_is_forbidden_from_promoting() {
    let app = TestApp::new();
    let _owner = app.register("owner@example.com", "Olive", "Owner").await;
    let bob = app.register("bob@example.com", "Bob", "Jones").await;
    let carol = app.register("carol@example.com", "Carol", "Lee").await;
    let channel = app.create_channel(&bob, "general", true).await;
    app.join(&carol, channel).await;

    let (status, _) = app
        .post(
            "/channel/addowner/v2",
            &carol.token,
            json!({ "channelId": channel, "uId": carol.id }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn leaving_drops_membership_and_ownership() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "Alice", "Smith").await;
    let channel = app.create_channel(&alice, "general", true).await;

    let (status, _) = app
        .post("/channel/leave/v2", &alice.token, json!({ "channelId": channel }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/channel/leave/v2", &alice.token, json!({ "channelId": channel }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.get("/channels/list/v3", &alice.token).await;
    assert_eq!(body["channels"], json!([]));

    // The channel itself still exists, now with nobody in it.
    app.join(&alice, channel).await;
    let (_, body) = app
        .get(&format!("/channel/details/v3?channelId={channel}"), &alice.token)
        .await;
    assert_eq!(body["ownerMembers"], json!([]));
}

#[tokio::test]
async fn messages_are_paged_newest_first() {
    let app = TestApp::new();
    let alice = app.register("alice@example.com", "Alice", "Smith").await;
    let channel = app.create_channel(&alice, "general", true).await;

    let (_, body) = app
        .get(&format!("/channel/messages/v3?channelId={channel}&start=0"), &alice.token)
        .await;
    assert_eq!(body, json!({ "messages": [], "start": 0, "end": -1 }));

    for i in 0..51 {
        app.send(&alice, channel, &format!("message {i}")).await;
    }

    let (_, body) = app
        .get(&format!("/channel/messages/v3?channelId={channel}&start=0"), &alice.token)
        .await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 50);
    assert_eq!(messages[0]["message"], "message 50");
    assert_eq!(body["end"], 50);

    let (_, body) = app
        .get(&format!("/channel/messages/v3?channelId={channel}&start=50"), &alice.token)
        .await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    assert_eq!(body["messages"][0]["message"], "message 0");
    assert_eq!(body["end"], -1);

    let (status, _) = app
        .get(&format!("/channel/messages/v3?channelId={channel}&start=52"), &alice.token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
