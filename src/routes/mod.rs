pub mod auth;
pub mod health;
pub mod tasks;

use actix_web::{http::Method, web, HttpRequest};

use crate::auth::AccessPolicy;
use crate::error::AppError;
use crate::models::Role;

/// Turns a body, query or path extraction failure into a 400 with the usual error body.
fn bad_request<E: std::fmt::Display>(err: E, _req: &HttpRequest) -> actix_web::Error {
    AppError::ValidationError(err.to_string()).into()
}

/// Which routes skip authentication and which need a role.
pub fn access_policy() -> AccessPolicy {
    AccessPolicy::new()
        .public(Method::GET, "/health")
        .public(Method::POST, "/auth/register")
        .public(Method::POST, "/auth/login")
        .require_roles(Method::GET, "/auth/admin", &[Role::Admin])
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, req| bad_request(err, req)))
        .app_data(web::QueryConfig::default().error_handler(|err, req| bad_request(err, req)))
        .app_data(web::PathConfig::default().error_handler(|err, req| bad_request(err, req)))
        .service(health::health)
        .service(
            web::scope("/auth")
                .service(auth::register)
                .service(auth::login)
                .service(auth::profile)
                .service(auth::admin),
        )
        .service(
            web::scope("/tasks")
                .service(tasks::get_tasks)
                .service(tasks::create_task)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        );
}
