//! Request guards.
//!
//! [`AuthGuard`] authenticates the bearer token and stores the resulting [`Identity`] in
//! the request extensions. [`RoleGuard`] runs after it and checks route roles against
//! that identity. Both consult the same [`AccessPolicy`], and both short-circuit with
//! the `AppError` JSON response instead of calling the wrapped service.
//!
//! Actix runs the last `.wrap()` first, so register `RoleGuard` before `AuthGuard`.

use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::policy::{Access, AccessPolicy};
use crate::auth::token::{Identity, TokenService};
use crate::error::AppError;

/// Extracts the token from an `Authorization: Bearer <token>` header.
fn bearer_token(req: &ServiceRequest) -> Result<&str, AppError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    value
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header".into()))
}

/// The percent-decoded path the router will dispatch on. The raw `req.path()` can
/// spell the same route differently (`/auth/%61dmin`).
fn routed_path(req: &ServiceRequest) -> &str {
    req.match_info().as_str()
}

fn reject<B>(req: ServiceRequest, err: AppError) -> ServiceResponse<EitherBody<B>> {
    log::warn!("{} {} rejected: {}", req.method(), req.path(), err);
    req.into_response(err.error_response()).map_into_right_body()
}

pub struct AuthGuard {
    tokens: Arc<TokenService>,
    policy: Arc<AccessPolicy>,
}

impl AuthGuard {
    pub fn new(tokens: Arc<TokenService>, policy: Arc<AccessPolicy>) -> Self {
        Self { tokens, policy }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthGuardService {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
            policy: self.policy.clone(),
        }))
    }
}

pub struct AuthGuardService<S> {
    service: Rc<S>,
    tokens: Arc<TokenService>,
    policy: Arc<AccessPolicy>,
}

impl<S, B> Service<ServiceRequest> for AuthGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if *self.policy.resolve(req.method(), routed_path(&req)) == Access::Public {
            let service = self.service.clone();
            return Box::pin(async move { service.call(req).await.map(|res| res.map_into_left_body()) });
        }

        let identity = bearer_token(&req).and_then(|token| self.tokens.verify(token));
        match identity {
            Ok(identity) => {
                req.extensions_mut().insert(identity);
                let service = self.service.clone();
                Box::pin(async move { service.call(req).await.map(|res| res.map_into_left_body()) })
            }
            Err(err) => Box::pin(ready(Ok(reject(req, err)))),
        }
    }
}

pub struct RoleGuard {
    policy: Arc<AccessPolicy>,
}

impl RoleGuard {
    pub fn new(policy: Arc<AccessPolicy>) -> Self {
        Self { policy }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RoleGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RoleGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RoleGuardService {
            service: Rc::new(service),
            policy: self.policy.clone(),
        }))
    }
}

pub struct RoleGuardService<S> {
    service: Rc<S>,
    policy: Arc<AccessPolicy>,
}

impl<S, B> Service<ServiceRequest> for RoleGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Access::Roles(required) = self.policy.resolve(req.method(), routed_path(&req)) {
            let allowed = req
                .extensions()
                .get::<Identity>()
                .map(|identity| identity.has_any_role(required))
                .unwrap_or(false);

            if !allowed {
                let err = AppError::Forbidden("Insufficient role".into());
                return Box::pin(ready(Ok(reject(req, err))));
            }
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await.map(|res| res.map_into_left_body()) })
    }
}
