#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use huddle_api::{AppState, AppStateInner, router};

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

/// A registered user as seen by the tests.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub token: String,
    pub id: u64,
}

impl TestApp {
    pub fn new() -> Self {
        let state: AppState = Arc::new(AppStateInner::new("test-secret", "http://localhost:3200"));
        let router = router(state.clone());
        Self { state, router }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("token", token);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn register(&self, email: &str, first: &str, last: &str) -> TestUser {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/register/v3",
                None,
                Some(json!({
                    "email": email,
                    "password": "correct-horse",
                    "nameFirst": first,
                    "nameLast": last,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        TestUser {
            token: body["token"].as_str().unwrap().to_string(),
            id: body["authUserId"].as_u64().unwrap(),
        }
    }

    pub async fn create_channel(&self, owner: &TestUser, name: &str, is_public: bool) -> u64 {
        let (status, body) = self
            .post(
                "/channels/create/v3",
                &owner.token,
                json!({ "name": name, "isPublic": is_public }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "channel create failed: {body}");
        body["channelId"].as_u64().unwrap()
    }

    pub async fn join(&self, user: &TestUser, channel_id: u64) {
        let (status, body) = self
            .post("/channel/join/v3", &user.token, json!({ "channelId": channel_id }))
            .await;
        assert_eq!(status, StatusCode::OK, "join failed: {body}");
    }

    pub async fn create_dm(&self, creator: &TestUser, others: &[&TestUser]) -> u64 {
        let ids: Vec<u64> = others.iter().map(|u| u.id).collect();
        let (status, body) = self
            .post("/dm/create/v2", &creator.token, json!({ "uIds": ids }))
            .await;
        assert_eq!(status, StatusCode::OK, "dm create failed: {body}");
        body["dmId"].as_u64().unwrap()
    }

    pub async fn send(&self, user: &TestUser, channel_id: u64, text: &str) -> u64 {
        let (status, body) = self
            .post(
                "/message/send/v2",
                &user.token,
                json!({ "channelId": channel_id, "message": text }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "send failed: {body}");
        body["messageId"].as_u64().unwrap()
    }

    pub async fn send_dm(&self, user: &TestUser, dm_id: u64, text: &str) -> u64 {
        let (status, body) = self
            .post(
                "/message/senddm/v2",
                &user.token,
                json!({ "dmId": dm_id, "message": text }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "senddm failed: {body}");
        body["messageId"].as_u64().unwrap()
    }

    pub async fn channel_messages(&self, user: &TestUser, channel_id: u64) -> Vec<Value> {
        let (status, body) = self
            .get(
                &format!("/channel/messages/v3?channelId={channel_id}&start=0"),
                &user.token,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "messages failed: {body}");
        body["messages"].as_array().unwrap().clone()
    }

    pub async fn dm_messages(&self, user: &TestUser, dm_id: u64) -> Vec<Value> {
        let (status, body) = self
            .get(&format!("/dm/messages/v2?dmId={dm_id}&start=0"), &user.token)
            .await;
        assert_eq!(status, StatusCode::OK, "dm messages failed: {body}");
        body["messages"].as_array().unwrap().clone()
    }

    pub async fn notifications(&self, user: &TestUser) -> Vec<Value> {
        let (status, body) = self.get("/notifications/get/v1", &user.token).await;
        assert_eq!(status, StatusCode::OK);
        body["notifications"].as_array().unwrap().clone()
    }
}
