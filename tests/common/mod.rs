#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use bytes::Bytes;
use groupshare::config::{AppConfig, DEFAULT_GROUP_NAME};
use groupshare::entities::{group_members, groups, prelude::*, users};
use groupshare::infrastructure::{database, seed};
use groupshare::services::storage::{ObjectStore, StoredObject, object_key};
use groupshare::utils::auth::hash_password;
use groupshare::{AppState, create_app};
use http_body_util::BodyExt;
use percent_encoding::percent_decode_str;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const PASSWORD: &str = "s3cretpass";
pub const MB: usize = 1024 * 1024;

#[derive(Default)]
pub struct MockObjectStore {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl MockObjectStore {
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn put(&self, data: Bytes, _content_type: &str, filename: &str) -> anyhow::Result<StoredObject> {
        let key = object_key(filename);
        self.objects.lock().unwrap().insert(key.clone(), data);
        Ok(StoredObject {
            url: format!("/obj/mock-bucket/{}", key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }
}

pub struct TestApp {
    pub app: Router,
    pub db: DatabaseConnection,
    pub store: Arc<MockObjectStore>,
}

pub async fn setup() -> TestApp {
    let config = AppConfig::default();
    let db = database::connect_in_memory().await.unwrap();
    seed::seed_initial_data(&db, &config).await.unwrap();

    let store = Arc::new(MockObjectStore::default());
    let state = AppState::new(db.clone(), store.clone(), config);

    TestApp {
        app: create_app(state),
        db,
        store,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Logs in through the form and returns the `Cookie` header value.
    pub async fn login(&self, username: &str) -> String {
        let response = self
            .send(form_request("POST", "/login", None, &format!("username={}&password={}", username, PASSWORD)))
            .await;
        assert_eq!(location(&response), "/home", "login failed for {}", username);
        session_cookie(&response).expect("session cookie")
    }
}

pub async fn default_group(db: &DatabaseConnection) -> groups::Model {
    Groups::find()
        .filter(groups::Column::GroupName.eq(DEFAULT_GROUP_NAME))
        .one(db)
        .await
        .unwrap()
        .unwrap()
}

pub async fn create_group(db: &DatabaseConnection, name: &str, usage: i32, limit: i32) -> groups::Model {
    groups::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        group_name: Set(name.to_string()),
        is_active: Set(true),
        group_limit: Set(limit),
        current_usage: Set(usage),
        created_at: Set(None),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn set_group_usage(db: &DatabaseConnection, group: &groups::Model, usage: i32) {
    let mut active: groups::ActiveModel = group.clone().into();
    active.current_usage = Set(usage);
    active.update(db).await.unwrap();
}

/// An account with the shared test password, member of the default group.
pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    active: bool,
    admin: bool,
    limit: i32,
    usage: i32,
) -> users::Model {
    let user = users::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        username: Set(username.to_string()),
        actual_name: Set(format!("{} name", username)),
        password_hash: Set(hash_password(PASSWORD).unwrap()),
        is_admin: Set(admin),
        is_active: Set(active),
        user_limit: Set(limit),
        current_usage: Set(usage),
        created_at: Set(None),
    }
    .insert(db)
    .await
    .unwrap();

    group_members::ActiveModel {
        user_id: Set(user.id.clone()),
        group_id: Set(default_group(db).await.id),
    }
    .insert(db)
    .await
    .unwrap();

    user
}

pub async fn reload_user(db: &DatabaseConnection, id: &str) -> users::Model {
    Users::find_by_id(id).one(db).await.unwrap().unwrap()
}

pub async fn reload_group(db: &DatabaseConnection, id: &str) -> groups::Model {
    Groups::find_by_id(id).one(db).await.unwrap().unwrap()
}

pub fn form_request(method: &str, uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn delete(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

const BOUNDARY: &str = "groupshare-test-boundary";

/// Multipart item form: text fields, repeated `groups`, optional `userFile`.
pub fn item_request(
    method: &str,
    uri: &str,
    cookie: &str,
    name: &str,
    description: &str,
    group_ids: &[&str],
    file: Option<(&str, Vec<u8>)>,
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    let mut text = |field: &str, value: &str| {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, field, value
            )
            .as_bytes(),
        );
    };
    text("name", name);
    text("description", description);
    for id in group_ids {
        text("groups", id);
    }

    if let Some((filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"userFile\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(&data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

pub fn payload(bytes: usize) -> Vec<u8> {
    vec![b'x'; bytes]
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn set_cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .map(|v| {
            v[prefix.len()..]
                .split(';')
                .next()
                .unwrap_or_default()
                .to_string()
        })
}

pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    set_cookie_value(response, "session")
        .filter(|v| !v.is_empty())
        .map(|v| format!("session={}", v))
}

/// The flash queued by a redirect, as `kind:message`.
pub fn flash(response: &Response<Body>) -> String {
    let raw = set_cookie_value(response, "flash").unwrap_or_default();
    percent_decode_str(&raw).decode_utf8().unwrap().to_string()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Object deletes run in the background; poll until `check` holds.
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..50 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
