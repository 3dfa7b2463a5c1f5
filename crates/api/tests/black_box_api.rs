use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use backoffice_api::config::ApiConfig;
use backoffice_auth::{Capability, FeatureFlags, FeatureGrant, NodeType, Operation, Role, User};
use backoffice_core::{OperationId, RoleId, Status, UserId};
use backoffice_infra::directory::DirectorySeed;

const SECRET: &str = "test-secret";
const ADMIN: i64 = 1;
const EDITOR: i64 = 2;
const EDITOR_ROLE: i64 = 7;
const OTHER_ROLE: i64 = 8;
const REVIEWER: i64 = 3;
const REVIEWER_ROLE: i64 = 9;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(ApiConfig {
            jwt_secret: SECRET.to_string(),
            ..ApiConfig::default()
        })
        .await
    }

    async fn spawn_with(config: ApiConfig) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = backoffice_api::app::build_app(&config, seed()).expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    async fn post(&self, path: &str, token: &str, role: Option<i64>, body: Value) -> reqwest::Response {
        let mut req = reqwest::Client::new()
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(&body);
        if let Some(role) = role {
            req = req.header("roleId", role.to_string());
        }
        req.send().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Superuser `admin`; `editor` holds role 7, which may list, view, add and
/// soft delete branches but neither edit nor hard delete them. `reviewer`
/// holds role 9, which may soft delete branches but not restore them.
fn seed() -> DirectorySeed {
    let page = |id: i64, name: &str| Operation {
        id: OperationId::new(id),
        key: name.to_lowercase(),
        title: name.into(),
        url: format!("/api/{name}"),
        operation_type: NodeType::Page,
        parent: Some(OperationId::new(1)),
        order_num: id as i32,
        status: Status::Active,
    };
    let editor_flags = [
        Capability::View,
        Capability::ViewList,
        Capability::Add,
        Capability::Delete,
        Capability::SoftDelete,
        Capability::UnDelete,
    ]
    .into_iter()
    .fold(FeatureFlags::default(), |flags, cap| flags.with(cap, true));
    let reviewer_flags = FeatureFlags::all()
        .with(Capability::UnDelete, false)
        .with(Capability::HardDelete, false);

    DirectorySeed {
        users: vec![
            User {
                id: UserId::new(ADMIN),
                username: "admin".into(),
                roles: vec![],
                is_superuser: true,
                is_active: true,
            },
            User {
                id: UserId::new(EDITOR),
                username: "editor".into(),
                roles: vec![RoleId::new(EDITOR_ROLE)],
                is_superuser: false,
                is_active: true,
            },
            User {
                id: UserId::new(REVIEWER),
                username: "reviewer".into(),
                roles: vec![RoleId::new(REVIEWER_ROLE)],
                is_superuser: false,
                is_active: true,
            },
        ],
        roles: vec![
            Role {
                id: RoleId::new(EDITOR_ROLE),
                title: "Editor".into(),
                status: Status::Active,
                grants: vec![FeatureGrant {
                    operation_id: OperationId::new(2),
                    flags: editor_flags,
                }],
            },
            Role {
                id: RoleId::new(OTHER_ROLE),
                title: "Other".into(),
                status: Status::Active,
                grants: vec![FeatureGrant {
                    operation_id: OperationId::new(2),
                    flags: FeatureFlags::all(),
                }],
            },
            Role {
                id: RoleId::new(REVIEWER_ROLE),
                title: "Reviewer".into(),
                status: Status::Active,
                grants: vec![FeatureGrant {
                    operation_id: OperationId::new(2),
                    flags: reviewer_flags,
                }],
            },
        ],
        operations: vec![
            Operation {
                id: OperationId::new(1),
                key: "content".into(),
                title: "Content".into(),
                url: String::new(),
                operation_type: NodeType::Menu,
                parent: None,
                order_num: 0,
                status: Status::Active,
            },
            page(2, "Branch"),
            page(3, "FileManager"),
        ],
    }
}

fn mint_jwt_at(user_id: i64, issued_at: chrono::DateTime<Utc>, ttl: ChronoDuration) -> String {
    let claims = json!({
        "sub": user_id,
        "iat": issued_at.timestamp(),
        "exp": (issued_at + ttl).timestamp(),
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn mint_jwt(user_id: i64) -> String {
    mint_jwt_at(user_id, Utc::now(), ChronoDuration::minutes(10))
}

async fn create_branch(srv: &TestServer, title: &str) -> i64 {
    let res = srv
        .post("/api/BranchAddOrUpdate/", &mint_jwt(ADMIN), None, json!({"id": 0, "title": title}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_is_public_and_tagged_with_a_request_id() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let id = res.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/whoami", srv.base_url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"message": "authentication failed"}));

    let res = client
        .post(format!("{}/api/BranchList/", srv.base_url))
        .header("roleId", EDITOR_ROLE.to_string())
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_reflects_the_directory_user() {
    let srv = TestServer::spawn().await;
    let res = reqwest::Client::new()
        .get(format!("{}/whoami", srv.base_url))
        .bearer_auth(mint_jwt(EDITOR))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["username"], "editor");
    assert_eq!(body["roles"], json!([EDITOR_ROLE]));
    assert_eq!(body["is_superuser"], false);
}

#[tokio::test]
async fn expired_token_is_rejected_before_role_checks() {
    let srv = TestServer::spawn().await;
    let stale = mint_jwt_at(EDITOR, Utc::now() - ChronoDuration::hours(2), ChronoDuration::minutes(10));

    let res = srv.post("/api/BranchList/", &stale, Some(EDITOR_ROLE), json!({})).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let unknown_user = mint_jwt(99);
    let res = srv.post("/api/BranchList/", &unknown_user, Some(EDITOR_ROLE), json!({})).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn hard_delete_without_the_flag_is_closed() {
    let srv = TestServer::spawn().await;
    let id = create_branch(&srv, "Harbour").await;

    let res = srv
        .post("/api/BranchDelete/", &mint_jwt(EDITOR), Some(EDITOR_ROLE), json!({"id": id, "type": 3}))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"message": "request closed"}));

    // The record is untouched.
    let res = srv.post("/api/BranchGet/", &mint_jwt(ADMIN), None, json!({"id": id})).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn role_header_must_name_an_assigned_role() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(EDITOR);

    for role in [None, Some(OTHER_ROLE)] {
        let res = srv.post("/api/BranchList/", &token, role, json!({})).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    let res = srv.post("/api/BranchList/", &token, Some(EDITOR_ROLE), json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"count": 0, "next": null, "previous": null, "data": []}));
}

#[tokio::test]
async fn add_and_edit_are_checked_separately() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(EDITOR);

    let res = srv
        .post("/api/BranchAddOrUpdate/", &token, Some(EDITOR_ROLE), json!({"id": 0, "title": "Dock"}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["message"], "record created");
    let id = created["data"]["id"].as_i64().unwrap();

    let res = srv
        .post("/api/BranchAddOrUpdate/", &token, Some(EDITOR_ROLE), json!({"id": id, "title": "Pier"}))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn soft_delete_and_restore_lifecycle() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(EDITOR);
    let id = create_branch(&srv, "Old town").await;

    let res = srv
        .post("/api/BranchDelete/", &token, Some(EDITOR_ROLE), json!({"id": id, "type": 1}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .post("/api/BranchList/", &token, Some(EDITOR_ROLE), json!({"is_deleted": true}))
        .await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["is_deleted"], true);

    let res = srv
        .post("/api/BranchUnDelete/", &token, Some(EDITOR_ROLE), json!({"id": id, "type": 1}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["is_deleted"], false);
}

#[tokio::test]
async fn restore_without_the_flag_is_closed() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(REVIEWER);
    let id = create_branch(&srv, "Harbour").await;

    let res = srv
        .post("/api/BranchDelete/", &token, Some(REVIEWER_ROLE), json!({"id": id, "type": 1}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .post("/api/BranchUnDelete/", &token, Some(REVIEWER_ROLE), json!({"id": id, "type": 1}))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"message": "request closed"}));

    let res = srv
        .post("/api/BranchGet/", &token, Some(REVIEWER_ROLE), json!({"id": id}))
        .await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["is_deleted"], true);
}

#[tokio::test]
async fn referenced_files_cannot_be_hard_deleted() {
    let srv = TestServer::spawn().await;
    let admin = mint_jwt(ADMIN);

    let res = srv
        .post(
            "/api/FileManagerAddOrUpdate/",
            &admin,
            None,
            json!({"id": 0, "file_name": "hq.jpg", "file_path": "/media/hq.jpg"}),
        )
        .await;
    let photo = res.json::<Value>().await.unwrap()["data"]["id"].as_i64().unwrap();

    let res = srv
        .post("/api/BranchAddOrUpdate/", &admin, None, json!({"id": 0, "title": "HQ", "photo": photo}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .post("/api/FileManagerDelete/", &admin, None, json!({"id": photo, "type": 3}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().starts_with("delete failed: "));
}

#[tokio::test]
async fn validation_and_not_found_are_bad_requests() {
    let srv = TestServer::spawn().await;
    let admin = mint_jwt(ADMIN);

    let res = srv
        .post("/api/CountryAddOrUpdate/", &admin, None, json!({"id": 0, "code": "NO"}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "validation failed");
    assert!(body["errors"]["title"].is_array());

    let res = srv.post("/api/CountryGet/", &admin, None, json!({"id": 404})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"message": "record not found"}));

    let res = srv.post("/api/WidgetList/", &admin, None, json!({})).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"message": "endpoint not found"}));
}

#[tokio::test]
async fn operation_url_edits_apply_to_roles_immediately() {
    let srv = TestServer::spawn().await;
    let admin = mint_jwt(ADMIN);
    let editor = mint_jwt(EDITOR);

    let res = srv
        .post(
            "/api/OperationAddOrUpdate/",
            &admin,
            None,
            json!({"id": 2, "key": "branch", "title": "Offices", "url": "/api/Office", "parent": 1}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.post("/api/BranchList/", &editor, Some(EDITOR_ROLE), json!({})).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.post("/api/RoleGet/", &admin, None, json!({"id": EDITOR_ROLE})).await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["features"][0]["url"], "/api/Office");
    assert_eq!(body["data"]["features"][0]["title"], "Offices");
}

#[tokio::test]
async fn menu_follows_the_selected_role() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/menu", srv.base_url))
        .bearer_auth(mint_jwt(EDITOR))
        .header("roleId", EDITOR_ROLE.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let tree: Value = res.json().await.unwrap();
    assert_eq!(tree[0]["key"], "content");
    assert_eq!(tree[0]["children"].as_array().unwrap().len(), 1);
    assert_eq!(tree[0]["children"][0]["url"], "/api/Branch");

    let res = client
        .get(format!("{}/menu", srv.base_url))
        .bearer_auth(mint_jwt(ADMIN))
        .send()
        .await
        .unwrap();
    let tree: Value = res.json().await.unwrap();
    assert_eq!(tree[0]["children"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let srv = TestServer::spawn_with(ApiConfig {
        jwt_secret: SECRET.to_string(),
        max_body_bytes: 64,
        ..ApiConfig::default()
    })
    .await;

    let res = srv
        .post(
            "/api/BranchAddOrUpdate/",
            &mint_jwt(ADMIN),
            None,
            json!({"id": 0, "title": "x".repeat(200)}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
