use axum::{extract::State, http::StatusCode, Extension, Json};
use lessonflow_auth::{
    hash_password, validate_password_strength, verify_password, JwtClaims, JwtValidator,
};
use lessonflow_db::entities::user::{self, UserRole};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{api_error, db_error, not_found, validation_error, write_error, ApiResult};
use crate::middleware::auth::{role_from_db, AuthUser};
use crate::models::*;
use crate::validation::normalize_email;
use crate::AppState;

/// Sign a session token for `account`
pub(crate) fn issue_token(state: &AppState, account: &user::Model) -> ApiResult<TokenResponse> {
    let claims = JwtClaims::new(
        account.id,
        account.email.clone(),
        role_from_db(account.role),
        state.token_ttl,
    );

    let access_token = JwtValidator::encode(state.jwt_secret.as_bytes(), &claims).map_err(|e| {
        error!("Failed to sign session token: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to create session token",
            "TOKEN_ERROR",
        )
    })?;

    Ok(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        role: account.role,
        expires_at: claims.expires_at(),
    })
}

fn invalid_credentials() -> (StatusCode, Json<ErrorResponse>) {
    api_error(
        StatusCode::UNAUTHORIZED,
        "Invalid email or password",
        "INVALID_CREDENTIALS",
    )
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Account deactivated", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let email = req.email.trim().to_lowercase();
    debug!("Login attempt for {}", email);

    let account = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(invalid_credentials)?;

    let password_ok = verify_password(&req.password, &account.password_hash).map_err(|e| {
        error!("Stored password hash for {} is unusable: {}", account.id, e);
        invalid_credentials()
    })?;

    if !password_ok {
        return Err(invalid_credentials());
    }

    if !account.is_active {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "Account is deactivated",
            "USER_INACTIVE",
        ));
    }

    info!(user_id = %account.id, role = ?account.role, "User logged in");

    Ok(Json(issue_token(&state, &account)?))
}

/// Self-registration as a viewer (only when signup is enabled)
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = TokenResponse),
        (status = 400, description = "Invalid email or weak password", body = ErrorResponse),
        (status = 403, description = "Signup disabled", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    if !state.allow_signup {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "Public registration is disabled. Ask an admin for an account.",
            "SIGNUP_DISABLED",
        ));
    }

    let email = normalize_email(&req.email)?;
    validate_password_strength(&req.password).map_err(|e| validation_error(e.to_string()))?;

    let account = insert_user(&state, email, &req.password, req.full_name, UserRole::Viewer).await?;

    info!(user_id = %account.id, "User registered");

    Ok((StatusCode::CREATED, Json(issue_token(&state, &account)?)))
}

/// Create a user row; the email must already be normalized
pub(crate) async fn insert_user(
    state: &AppState,
    email: String,
    password: &str,
    full_name: Option<String>,
    role: UserRole,
) -> ApiResult<user::Model> {
    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&state.db)
        .await
        .map_err(db_error)?;

    if existing.is_some() {
        return Err(email_exists());
    }

    let password_hash = hash_password(password).map_err(|e| {
        error!("Failed to hash password: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to hash password",
            "HASH_ERROR",
        )
    })?;

    let now = state.clock.now();
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(password_hash),
        full_name: Set(full_name.filter(|n| !n.trim().is_empty())),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(|e| match write_error(e, "Email already registered") {
        (StatusCode::CONFLICT, _) => email_exists(),
        other => other,
    })
}

fn email_exists() -> (StatusCode, Json<ErrorResponse>) {
    api_error(
        StatusCode::CONFLICT,
        "Email already registered",
        "EMAIL_EXISTS",
    )
}

/// The authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<User>> {
    let account = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("User"))?;

    Ok(Json(account.into()))
}
