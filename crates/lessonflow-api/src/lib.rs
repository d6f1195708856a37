pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod validation;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use lessonflow_publisher::{Clock, SystemClock, WorkerHealth};
use sea_orm::DatabaseConnection;
use std::{future::Future, net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across handlers
pub struct AppState {
    pub db: DatabaseConnection,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub allow_signup: bool,
    pub clock: Arc<dyn Clock>,
    /// Present when the publishing worker runs in this process
    pub worker_health: Option<Arc<WorkerHealth>>,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lessonflow API",
        version = "0.1.0",
        description = "Content management and public catalog for learning programs",
        contact(
            name = "Lessonflow Team",
            email = "team@lessonflow.dev"
        )
    ),
    paths(
        handlers::auth::login,
        handlers::auth::register,
        handlers::auth::get_current_user,
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::topics::list_topics,
        handlers::topics::create_topic,
        handlers::topics::update_topic,
        handlers::topics::delete_topic,
        handlers::programs::list_programs,
        handlers::programs::create_program,
        handlers::programs::get_program,
        handlers::programs::update_program,
        handlers::programs::delete_program,
        handlers::programs::add_program_asset,
        handlers::terms::list_terms,
        handlers::terms::create_term,
        handlers::terms::update_term,
        handlers::terms::delete_term,
        handlers::lessons::list_lessons,
        handlers::lessons::create_lesson,
        handlers::lessons::get_lesson,
        handlers::lessons::update_lesson,
        handlers::lessons::delete_lesson,
        handlers::lessons::publish_lesson,
        handlers::lessons::add_lesson_asset,
        handlers::catalog::list_catalog_programs,
        handlers::catalog::get_catalog_program,
        handlers::catalog::get_catalog_lesson,
        handlers::system::health_check,
        handlers::system::dashboard_stats,
    ),
    components(
        schemas(
            models::ErrorResponse,
            models::LoginRequest,
            models::RegisterRequest,
            models::TokenResponse,
            models::User,
            models::UserList,
            models::CreateUserRequest,
            models::UpdateUserRequest,
            models::Topic,
            models::TopicList,
            models::TopicRequest,
            models::Program,
            models::ProgramList,
            models::CreateProgramRequest,
            models::UpdateProgramRequest,
            models::AssetRequest,
            models::Term,
            models::TermList,
            models::CreateTermRequest,
            models::UpdateTermRequest,
            models::Lesson,
            models::LessonList,
            models::CreateLessonRequest,
            models::UpdateLessonRequest,
            models::PublishAction,
            models::PublishRequest,
            models::PublishResponse,
            models::CatalogProgramList,
            models::CatalogProgram,
            models::CatalogTerm,
            models::DashboardStats,
            models::RecentActivity,
            models::HealthResponse,
            models::WorkerHealthResponse,
            models::TickSummaryResponse,
        )
    ),
    tags(
        (name = "auth", description = "Login, registration and current user"),
        (name = "users", description = "User management (admin)"),
        (name = "topics", description = "Topic management"),
        (name = "programs", description = "Program management"),
        (name = "terms", description = "Term management"),
        (name = "lessons", description = "Lesson management and publishing"),
        (name = "catalog", description = "Public read-only catalog"),
        (name = "system", description = "Health and dashboard")
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

struct BearerAuth;

impl utoipa::Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS (for the admin UI)
    pub enable_cors: bool,
    /// Allowed CORS origins (if None, allows localhost origins)
    pub cors_origins: Option<Vec<String>>,
    /// Secret for signing session tokens
    pub jwt_secret: String,
    /// Session token lifetime
    pub token_ttl: chrono::Duration,
    /// Allow public self-registration as viewer
    pub allow_signup: bool,
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(
        config: ApiServerConfig,
        db: DatabaseConnection,
        worker_health: Option<Arc<WorkerHealth>>,
    ) -> Self {
        Self::with_clock(config, db, worker_health, Arc::new(SystemClock))
    }

    /// Create a server that reads time from `clock`
    pub fn with_clock(
        config: ApiServerConfig,
        db: DatabaseConnection,
        worker_health: Option<Arc<WorkerHealth>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = Arc::new(AppState {
            db,
            jwt_secret: config.jwt_secret.clone(),
            token_ttl: config.token_ttl,
            allow_signup: config.allow_signup,
            clock,
            worker_health,
        });

        Self { config, state }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let api_doc = ApiDoc::openapi();

        let auth_state = Arc::new(middleware::AuthState::new(
            self.config.jwt_secret.as_bytes(),
            self.state.db.clone(),
        ));

        // PUBLIC routes: login, signup, health and the catalog
        let public_router = Router::new()
            .route("/api/health", get(handlers::system::health_check))
            .route("/api/auth/login", post(handlers::auth::login))
            .route("/api/auth/register", post(handlers::auth::register))
            .route(
                "/catalog/programs",
                get(handlers::catalog::list_catalog_programs),
            )
            .route(
                "/catalog/programs/{id}",
                get(handlers::catalog::get_catalog_program),
            )
            .route(
                "/catalog/lessons/{id}",
                get(handlers::catalog::get_catalog_lesson),
            )
            .with_state(self.state.clone());

        // PROTECTED routes (bearer session token)
        let protected_router = Router::new()
            .route("/api/auth/me", get(handlers::auth::get_current_user))
            .route(
                "/api/users",
                get(handlers::users::list_users).post(handlers::users::create_user),
            )
            .route(
                "/api/users/{id}",
                get(handlers::users::get_user)
                    .patch(handlers::users::update_user)
                    .delete(handlers::users::delete_user),
            )
            .route(
                "/api/topics",
                get(handlers::topics::list_topics).post(handlers::topics::create_topic),
            )
            .route(
                "/api/topics/{id}",
                axum::routing::put(handlers::topics::update_topic)
                    .delete(handlers::topics::delete_topic),
            )
            .route(
                "/api/programs",
                get(handlers::programs::list_programs).post(handlers::programs::create_program),
            )
            .route(
                "/api/programs/{id}",
                get(handlers::programs::get_program)
                    .patch(handlers::programs::update_program)
                    .delete(handlers::programs::delete_program),
            )
            .route(
                "/api/programs/{id}/assets",
                post(handlers::programs::add_program_asset),
            )
            .route(
                "/api/programs/{id}/terms",
                get(handlers::terms::list_terms).post(handlers::terms::create_term),
            )
            .route(
                "/api/terms/{id}",
                axum::routing::patch(handlers::terms::update_term)
                    .delete(handlers::terms::delete_term),
            )
            .route(
                "/api/terms/{id}/lessons",
                get(handlers::lessons::list_lessons).post(handlers::lessons::create_lesson),
            )
            .route(
                "/api/lessons/{id}",
                get(handlers::lessons::get_lesson)
                    .patch(handlers::lessons::update_lesson)
                    .delete(handlers::lessons::delete_lesson),
            )
            .route(
                "/api/lessons/{id}/publish",
                post(handlers::lessons::publish_lesson),
            )
            .route(
                "/api/lessons/{id}/assets",
                post(handlers::lessons::add_lesson_asset),
            )
            .route(
                "/api/dashboard/stats",
                get(handlers::system::dashboard_stats),
            )
            .with_state(self.state.clone())
            .layer(axum_middleware::from_fn_with_state(
                auth_state,
                middleware::require_auth,
            ));

        // SwaggerUi serves the OpenAPI document at /api/openapi.json
        let router = Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", api_doc))
            .merge(public_router)
            .merge(protected_router)
            .layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            router.layer(self.cors_layer())
        } else {
            router
        }
    }

    fn cors_layer(&self) -> CorsLayer {
        let allow_origin = match &self.config.cors_origins {
            Some(origins) => {
                let origins: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|o| match HeaderValue::from_str(o) {
                        Ok(value) => Some(value),
                        Err(_) => {
                            warn!("Ignoring invalid CORS origin: {}", o);
                            None
                        }
                    })
                    .collect();
                AllowOrigin::list(origins)
            }
            None => AllowOrigin::predicate(|origin: &HeaderValue, _| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str.starts_with("http://localhost:")
                    || origin_str.starts_with("http://127.0.0.1:")
            }),
        };

        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_origin(allow_origin)
    }

    /// Serve until `shutdown` resolves
    pub async fn start<F>(self, shutdown: F) -> Result<(), anyhow::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api/openapi.json",
            self.config.bind_addr
        );
        info!("Swagger UI: http://{}/swagger-ui", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();

        assert!(json["paths"]["/api/lessons/{id}/publish"].is_object());
        assert!(json["paths"]["/catalog/programs"].is_object());
        assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
    }
}
