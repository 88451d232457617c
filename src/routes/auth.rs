use crate::{
    auth::{CurrentUser, LoginRequest, RegisterRequest, TokenResponse},
    error::AppError,
    state::AppState,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use serde_json::json;
use validator::Validate;

/// Register a new user
///
/// Creates a `user` account and returns it without the password hash.
///
/// ## Responses:
/// - `201 Created`: `{id, email, name, roles}`.
/// - `400 Bad Request`: invalid email, empty name or a password that breaks the policy.
/// - `409 Conflict`: the email is already registered.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    let RegisterRequest {
        email,
        name,
        password,
    } = register_data.into_inner();
    let user = state.auth.register(email, name, password).await?;

    Ok(HttpResponse::Created().json(user))
}

/// Login user
///
/// ## Responses:
/// - `201 Created`: `{accessToken}`.
/// - `401 Unauthorized`: unknown email or wrong password, with the same body either way.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let LoginRequest { email, password } = login_data.into_inner();
    let access_token = state.auth.login(&email, password).await?;

    Ok(HttpResponse::Created().json(TokenResponse { access_token }))
}

/// The caller's own account, read fresh from the store.
#[get("/profile")]
pub async fn profile(
    state: web::Data<AppState>,
    current: CurrentUser,
) -> Result<impl Responder, AppError> {
    let user = state
        .users
        .find_by_id(current.0.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(crate::models::PublicUser::from(user)))
}

/// Admin-only probe. The role check happens in `RoleGuard` before this runs.
#[get("/admin")]
pub async fn admin(_current: CurrentUser) -> impl Responder {
    HttpResponse::Ok().json(json!({ "message": "This is for admin only!" }))
}
