use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthTokens, LoginRequest, LogoutRequest, PublicUser, RefreshRequest, RegisterRequest},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
        repo::{consume_refresh_token, store_refresh_token, Role, User},
    },
    error::ApiError,
    response::ApiResponse,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

async fn issue_tokens(state: &AppState, user: &User) -> Result<AuthTokens, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id, user.role)?;
    let refresh_token = keys.sign_refresh(user.id, user.role)?;
    store_refresh_token(&state.db, user.id, &refresh_token, keys.refresh_expiry()).await?;
    Ok(AuthTokens {
        user: PublicUser::from(user),
        access_token,
        refresh_token,
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthTokens>>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.first_name.trim().is_empty()
        || payload.last_name.trim().is_empty()
        || payload.email.is_empty()
        || payload.password.is_empty()
    {
        return Err(ApiError::Validation("Missing required fields".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation("Password too short".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let role = payload.role.unwrap_or(Role::Customer);
    let user = User::create(
        &state.db,
        payload.first_name.trim(),
        payload.last_name.trim(),
        &payload.email,
        &hash,
        role,
        payload.phone.as_deref(),
    )
    .await?;

    let tokens = issue_tokens(&state, &user).await?;

    // Welcome email is best-effort; registration already succeeded.
    let notifier = state.notifier.clone();
    let welcome_user = user.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier.account_created(&welcome_user).await {
            warn!(error = %e, user_id = %welcome_user.id, "account-created email failed");
        }
    });

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message("User registered successfully", tokens)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthTokens>>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation("Email and password required".into()));
    }

    // Same message for unknown email and wrong password.
    let invalid = || ApiError::Unauthorized("Invalid email or password".into());

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    User::touch_last_login(&state.db, user.id).await?;
    let tokens = issue_tokens(&state, &user).await?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(ApiResponse::message("Login successful", tokens)))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<AuthTokens>>, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid or expired refresh token".into());
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| invalid())?;

    // Rotation: the presented token must still be in the stored set and is
    // removed before a new pair is issued, so a replayed token fails here.
    if !consume_refresh_token(&state.db, claims.sub, &payload.refresh_token).await? {
        warn!(user_id = %claims.sub, "refresh token not in stored set");
        return Err(invalid());
    }

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(invalid)?;

    let tokens = issue_tokens(&state, &user).await?;
    Ok(Json(ApiResponse::data(tokens)))
}

#[instrument(skip(state, payload))]
pub async fn logout(
    State(state): State<AppState>,
    actor: AuthUser,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    consume_refresh_token(&state.db, actor.id, &payload.refresh_token).await?;
    info!(user_id = %actor.id, "user logged out");
    Ok(Json(json!({
        "status": "success",
        "message": "Logged out successfully"
    })))
}
