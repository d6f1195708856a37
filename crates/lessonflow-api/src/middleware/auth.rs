//! Bearer token authentication
//!
//! Validates the session token from `Authorization: Bearer <token>`, loads the
//! user it names and injects an [`AuthUser`] into the request extensions. The
//! role comes from the user row, not the token, so role changes and
//! deactivation take effect on the next request.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use lessonflow_auth::{JwtValidator, Role};
use lessonflow_db::entities::{
    user::{self, UserRole},
    User,
};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{api_error, db_error, forbidden, ApiResult};
use crate::models::ErrorResponse;

/// Authenticated user context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// Admin or editor
    pub fn require_editor(&self) -> ApiResult<()> {
        if self.role.can_edit_content() {
            Ok(())
        } else {
            Err(forbidden("Admin or editor role required"))
        }
    }

    /// Deleting content is admin-only
    pub fn require_delete(&self) -> ApiResult<()> {
        if self.role.can_delete() {
            Ok(())
        } else {
            Err(forbidden("Only admins can delete content"))
        }
    }

    pub fn require_admin(&self) -> ApiResult<()> {
        if self.role.can_manage_users() {
            Ok(())
        } else {
            Err(forbidden("Admin role required"))
        }
    }
}

pub fn role_from_db(role: UserRole) -> Role {
    match role {
        UserRole::Admin => Role::Admin,
        UserRole::Editor => Role::Editor,
        UserRole::Viewer => Role::Viewer,
    }
}

pub fn role_to_db(role: Role) -> UserRole {
    match role {
        Role::Admin => UserRole::Admin,
        Role::Editor => UserRole::Editor,
        Role::Viewer => UserRole::Viewer,
    }
}

/// Token validator plus the store used to re-check the user
#[derive(Clone)]
pub struct AuthState {
    pub validator: Arc<JwtValidator>,
    pub db: DatabaseConnection,
}

impl AuthState {
    pub fn new(secret: &[u8], db: DatabaseConnection) -> Self {
        Self {
            validator: Arc::new(JwtValidator::new(secret)),
            db,
        }
    }
}

fn unauthorized(message: impl Into<String>, code: &str) -> (StatusCode, Json<ErrorResponse>) {
    api_error(StatusCode::UNAUTHORIZED, message, code)
}

/// Authentication middleware for protected routes
///
/// # Errors
/// Returns 401 Unauthorized if:
/// - The Authorization header is missing or not `Bearer <token>`
/// - The token is malformed, signed with another secret or expired
/// - The user no longer exists or is deactivated
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header", "MISSING_AUTH"))?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        unauthorized(
            "Invalid Authorization header format. Expected 'Bearer <token>'",
            "INVALID_AUTH_FORMAT",
        )
    })?;

    let claims = state.validator.validate(token).map_err(|e| {
        unauthorized(format!("Invalid or expired token: {}", e), "INVALID_TOKEN")
    })?;

    let user_id = claims
        .user_id()
        .map_err(|e| unauthorized(e.to_string(), "INVALID_TOKEN"))?;

    let account: user::Model = User::find_by_id(user_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| unauthorized("User no longer exists", "USER_NOT_FOUND"))?;

    if !account.is_active {
        return Err(unauthorized("User account is deactivated", "USER_INACTIVE"));
    }

    request.extensions_mut().insert(AuthUser {
        user_id: account.id,
        email: account.email,
        role: role_from_db(account.role),
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, middleware, routing::get, Router};
    use chrono::{Duration, Utc};
    use lessonflow_auth::JwtClaims;
    use sea_orm::{ActiveModelTrait, Set};
    use tower::ServiceExt; // For oneshot()

    const SECRET: &[u8] = b"test-secret-key";

    async fn protected_handler(axum::Extension(user): axum::Extension<AuthUser>) -> Json<AuthUser> {
        Json(user)
    }

    async fn setup() -> (Router, DatabaseConnection) {
        let db = lessonflow_db::connect("sqlite::memory:").await.unwrap();
        lessonflow_db::migrate(&db).await.unwrap();

        let auth_state = Arc::new(AuthState::new(SECRET, db.clone()));
        let app = Router::new()
            .route("/protected", get(protected_handler))
            .layer(middleware::from_fn_with_state(auth_state, require_auth));

        (app, db)
    }

    async fn insert_user(db: &DatabaseConnection, role: UserRole, is_active: bool) -> user::Model {
        let now = Utc::now();
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(format!("{}@example.com", Uuid::new_v4())),
            password_hash: Set("$argon2id$unused".to_string()),
            full_name: Set(None),
            role: Set(role),
            is_active: Set(is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap()
    }

    fn token_for(u: &user::Model, role: Role, validity: Duration, secret: &[u8]) -> String {
        let claims = JwtClaims::new(u.id, u.email.clone(), role, validity);
        JwtValidator::encode(secret, &claims).unwrap()
    }

    async fn call(app: Router, auth: Option<String>) -> Response {
        let mut builder = Request::builder().uri("/protected");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn error_body(response: Response) -> ErrorResponse {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_injects_user() {
        let (app, db) = setup().await;
        let editor = insert_user(&db, UserRole::Editor, true).await;
        let token = token_for(&editor, Role::Editor, Duration::minutes(30), SECRET);

        let response = call(app, Some(format!("Bearer {}", token))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let auth_user: AuthUser = serde_json::from_slice(&body).unwrap();
        assert_eq!(auth_user.user_id, editor.id);
        assert_eq!(auth_user.role, Role::Editor);
    }

    #[tokio::test]
    async fn test_role_comes_from_store() {
        let (app, db) = setup().await;
        // Demoted after the token was issued
        let user = insert_user(&db, UserRole::Viewer, true).await;
        let token = token_for(&user, Role::Admin, Duration::minutes(30), SECRET);

        let response = call(app, Some(format!("Bearer {}", token))).await;
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let auth_user: AuthUser = serde_json::from_slice(&body).unwrap();
        assert_eq!(auth_user.role, Role::Viewer);
    }

    #[tokio::test]
    async fn test_missing_authorization_header() {
        let (app, _db) = setup().await;

        let response = call(app, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_body(response).await.code.as_deref(), Some("MISSING_AUTH"));
    }

    #[tokio::test]
    async fn test_invalid_bearer_format() {
        let (app, _db) = setup().await;

        let response = call(app, Some("Token abc".to_string())).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(error_body(response)
            .await
            .error
            .contains("Invalid Authorization header format"));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let (app, db) = setup().await;
        let user = insert_user(&db, UserRole::Admin, true).await;
        let token = token_for(&user, Role::Admin, Duration::seconds(-10), SECRET);

        let response = call(app, Some(format!("Bearer {}", token))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(error_body(response).await.error.contains("Invalid or expired token"));
    }

    #[tokio::test]
    async fn test_wrong_secret() {
        let (app, db) = setup().await;
        let user = insert_user(&db, UserRole::Admin, true).await;
        let token = token_for(&user, Role::Admin, Duration::minutes(5), b"wrong-secret-key");

        let response = call(app, Some(format!("Bearer {}", token))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_deactivated_user_rejected() {
        let (app, db) = setup().await;
        let user = insert_user(&db, UserRole::Editor, false).await;
        let token = token_for(&user, Role::Editor, Duration::minutes(5), SECRET);

        let response = call(app, Some(format!("Bearer {}", token))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_body(response).await.code.as_deref(), Some("USER_INACTIVE"));
    }

    #[test]
    fn test_role_gates() {
        let user = |role| AuthUser {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role,
        };

        assert!(user(Role::Admin).require_admin().is_ok());
        assert!(user(Role::Editor).require_admin().is_err());
        assert!(user(Role::Editor).require_editor().is_ok());
        assert!(user(Role::Editor).require_delete().is_err());

        let (status, _) = user(Role::Viewer).require_editor().unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
