use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use lessonflow_auth::validate_password_strength;
use lessonflow_db::entities::user::{self, UserRole};
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, QueryOrder, Set};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{db_error, not_found, validation_error, ApiResult};
use crate::handlers::auth::insert_user;
use crate::middleware::AuthUser;
use crate::models::*;
use crate::validation::normalize_email;
use crate::AppState;

async fn find_user(state: &AppState, id: Uuid) -> ApiResult<user::Model> {
    user::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("User"))
}

/// List all users
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users", body = UserList),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<UserList>> {
    auth_user.require_admin()?;

    let users: Vec<User> = user::Entity::find()
        .order_by_asc(user::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(User::from)
        .collect();

    let total = users.len();
    Ok(Json(UserList { users, total }))
}

/// Create a user with any role
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid email or weak password", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    auth_user.require_admin()?;

    let email = normalize_email(&req.email)?;
    validate_password_strength(&req.password).map_err(|e| validation_error(e.to_string()))?;

    let account = insert_user(&state, email, &req.password, req.full_name, req.role).await?;

    info!(
        user_id = %account.id,
        created_by = %auth_user.user_id,
        role = ?account.role,
        "User created"
    );

    Ok((StatusCode::CREATED, Json(account.into())))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    auth_user.require_admin()?;
    Ok(Json(find_user(&state, id).await?.into()))
}

/// Change name, role or active flag
///
/// Admins cannot demote or deactivate themselves.
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Change not allowed", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    auth_user.require_admin()?;

    let account = find_user(&state, id).await?;

    if account.id == auth_user.user_id {
        let demoted = req.role.is_some_and(|r| r != UserRole::Admin);
        let deactivated = req.is_active == Some(false);
        if demoted || deactivated {
            return Err(validation_error(
                "You cannot demote or deactivate your own account",
            ));
        }
    }

    let mut active: user::ActiveModel = account.into();
    if let Some(full_name) = req.full_name {
        active.full_name = Set(Some(full_name).filter(|n| !n.trim().is_empty()));
    }
    if let Some(role) = req.role {
        active.role = Set(role);
    }
    if let Some(is_active) = req.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(state.clock.now());

    let updated = active.update(&state.db).await.map_err(db_error)?;

    info!(user_id = %updated.id, updated_by = %auth_user.user_id, "User updated");

    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Cannot delete yourself", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    auth_user.require_admin()?;

    if id == auth_user.user_id {
        return Err(validation_error("You cannot delete your own account"));
    }

    let account = find_user(&state, id).await?;
    account.delete(&state.db).await.map_err(db_error)?;

    info!(user_id = %id, deleted_by = %auth_user.user_id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}
