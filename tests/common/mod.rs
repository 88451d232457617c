//! Shared setup for the integration tests: an app over the in-memory store, plus
//! helpers for registering users and sending authenticated requests.

#![allow(dead_code)]

use std::sync::Arc;

use actix_cors::Cors;
use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::header,
    middleware::Logger,
    test, web, App, Error,
};
use chrono::Duration;
use serde_json::{json, Value};
use taskdesk::{
    auth::{password, AuthGuard, PasswordHasher, RoleGuard, TokenService},
    models::{Role, User},
    routes,
    store::MemoryStore,
    AppState,
};

pub const SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "Secret1!";

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub state: web::Data<AppState>,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let tokens = Arc::new(TokenService::new(SECRET, Duration::hours(1)));
        let state = AppState::new(
            store.clone(),
            store.clone(),
            tokens,
            PasswordHasher::new(password::MIN_COST),
        );
        Self {
            store,
            state: web::Data::new(state),
        }
    }

    pub fn tokens(&self) -> Arc<TokenService> {
        self.state.tokens()
    }

    /// Creates an account holding both roles, bypassing registration.
    pub async fn insert_admin(&self, email: &str) -> User {
        self.state
            .users
            .create(
                email.to_string(),
                "Admin".to_string(),
                PASSWORD.to_string(),
                vec![Role::User, Role::Admin],
            )
            .await
            .unwrap()
    }
}

/// Builds the full middleware stack the binary uses.
pub async fn init_app(
    ctx: &TestContext,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    let policy = Arc::new(routes::access_policy());
    test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .wrap(RoleGuard::new(policy.clone()))
            .wrap(AuthGuard::new(ctx.tokens(), policy))
            .wrap(Cors::default().allow_any_origin().allow_any_method().allow_any_header())
            .wrap(Logger::default())
            .configure(routes::config),
    )
    .await
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

pub async fn register<S, B>(app: &S, email: &str, name: &str) -> ServiceResponse<B>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "email": email, "name": name, "password": PASSWORD }))
        .to_request();
    test::call_service(app, req).await
}

pub async fn login<S, B>(app: &S, email: &str, password: &str) -> ServiceResponse<B>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": email, "password": password }))
        .to_request();
    test::call_service(app, req).await
}

/// Logs in an existing account and returns its access token.
pub async fn token_for<S, B>(app: &S, email: &str) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let resp = login(app, email, PASSWORD).await;
    assert_eq!(resp.status(), 201, "login failed for {}", email);
    let body: Value = test::read_body_json(resp).await;
    body["accessToken"]
        .as_str()
        .expect("accessToken missing")
        .to_string()
}

/// Registers a fresh user and returns their access token.
pub async fn signup<S, B>(app: &S, email: &str) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let resp = register(app, email, "Tester").await;
    assert_eq!(resp.status(), 201, "registration failed for {}", email);
    token_for(app, email).await
}

/// Creates a task through the API and returns the response body.
pub async fn create_task<S, B>(app: &S, token: &str, body: Value) -> Value
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/tasks")
        .insert_header(bearer(token))
        .set_json(body)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 201);
    test::read_body_json(resp).await
}

pub async fn get_json<S, B>(app: &S, token: &str, uri: &str) -> (u16, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::get()
        .uri(uri)
        .insert_header(bearer(token))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body = test::read_body(resp).await;
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}
