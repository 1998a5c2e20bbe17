#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use achievo_api::auth::jwt::{Claims, JwtConfig};
use achievo_api::config::{LogFormat, ServerConfig};
use achievo_api::router::build_app_router;
use achievo_api::state::AppState;
use achievo_core::authorization::AuthorizationGuard;
use achievo_core::coordinator::AchievementCoordinator;
use achievo_core::memory::{MemoryDirectory, MemoryDocumentStore, MemoryInbox, MemoryReferenceStore};
use achievo_core::notification::InboxEntry;
use achievo_core::roles::Role;
use achievo_core::types::DbId;
use achievo_core::workflow::VerificationWorkflow;
use achievo_events::{BusNotifier, EventBus, NotificationDelivery};
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const STUDENT: DbId = 100;
pub const STUDENT_USER: DbId = 10;
pub const OTHER_STUDENT: DbId = 101;
pub const OTHER_STUDENT_USER: DbId = 11;
pub const ADVISOR: DbId = 7;
pub const ADVISOR_USER: DbId = 20;
pub const OTHER_ADVISOR: DbId = 8;
pub const OTHER_ADVISOR_USER: DbId = 21;
pub const ADMIN_USER: DbId = 1;

/// Build a test `ServerConfig` with safe defaults. The database URLs are
/// never dialled; the test app runs on in-memory stores.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: "postgres://unused/reference".to_string(),
        document_database_url: "postgres://unused/document".to_string(),
        db_max_connections: 1,
        log_format: LogFormat::Pretty,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
        },
    }
}

/// The full application router over in-memory adapters, plus handles to
/// inspect and break those adapters.
pub struct TestApp {
    pub router: Router,
    pub config: ServerConfig,
    pub documents: Arc<MemoryDocumentStore>,
    pub references: Arc<MemoryReferenceStore>,
    pub directory: Arc<MemoryDirectory>,
    pub inbox: Arc<MemoryInbox>,
    bus: Arc<EventBus>,
    delivery: CancellationToken,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.delivery.cancel();
    }
}

/// Two students, each with their own advisor, and a running notification
/// delivery task. Must be called inside a tokio runtime.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let documents = Arc::new(MemoryDocumentStore::default());
    let references = Arc::new(MemoryReferenceStore::default());
    let directory = Arc::new(MemoryDirectory::default());
    directory.add_advisor(ADVISOR, ADVISOR_USER);
    directory.add_advisor(OTHER_ADVISOR, OTHER_ADVISOR_USER);
    directory.add_student(STUDENT, STUDENT_USER, Some(ADVISOR));
    directory.add_student(OTHER_STUDENT, OTHER_STUDENT_USER, Some(OTHER_ADVISOR));
    let inbox = Arc::new(MemoryInbox::default());

    let bus = Arc::new(EventBus::default());
    let delivery = CancellationToken::new();
    tokio::spawn(NotificationDelivery::new(inbox.clone()).run(bus.subscribe(), delivery.clone()));

    let coordinator = AchievementCoordinator::new(
        documents.clone(),
        references.clone(),
        AuthorizationGuard::new(directory.clone()),
    );
    let workflow = VerificationWorkflow::new(
        coordinator.clone(),
        Arc::new(BusNotifier::new(Arc::clone(&bus))),
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        coordinator,
        workflow,
        inbox: inbox.clone(),
        databases: Arc::new(Vec::new()),
    };

    TestApp {
        router: build_app_router(state, &config),
        config,
        documents,
        references,
        directory,
        inbox,
        bus,
        delivery,
    }
}

impl TestApp {
    /// A bearer token for the given user, signed the way the identity
    /// service signs them.
    pub fn token(&self, user_id: DbId, role: Role) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            role: role.name().to_string(),
            exp: now + 15 * 60,
            iat: now,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(self.config.jwt.secret.as_bytes()),
        )
        .unwrap()
    }

    pub fn student(&self) -> String {
        self.token(STUDENT_USER, Role::Student)
    }

    pub fn advisor(&self) -> String {
        self.token(ADVISOR_USER, Role::Advisor)
    }

    pub fn admin(&self) -> String {
        self.token(ADMIN_USER, Role::Admin)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: serde_json::Value) -> Response<Body> {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: serde_json::Value) -> Response<Body> {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Create a national first-place competition for [`STUDENT`] and return
    /// its reference id.
    pub async fn create_competition(&self) -> DbId {
        let response = self
            .post(
                "/api/v1/achievements",
                &self.student(),
                serde_json::json!({
                    "type": "competition",
                    "title": "National Robotics Cup",
                    "details": { "level": "national", "rank": 1 }
                }),
            )
            .await;
        assert_eq!(response.status(), 201);
        body_json(response).await["data"]["reference"]["reference_id"]
            .as_i64()
            .unwrap()
    }

    /// Wait until `user_id` has at least `count` inbox entries.
    pub async fn inbox_of(&self, user_id: DbId, count: usize) -> Vec<InboxEntry> {
        for _ in 0..100 {
            let entries: Vec<_> = self
                .inbox
                .all()
                .into_iter()
                .filter(|e| e.user_id == user_id)
                .collect();
            if entries.len() >= count {
                return entries;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("user {user_id} never received {count} notification(s)");
    }
}

/// Read and parse the response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
