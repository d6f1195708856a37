use axum::{extract::State, Json};
use lessonflow_db::entities::{
    lesson::{self, LessonStatus},
    program::{self, ProgramStatus},
    user,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use std::sync::Arc;
use tracing::warn;

use crate::error::{db_error, ApiResult};
use crate::models::*;
use crate::AppState;

const RECENT_ACTIVITY_LIMIT: u64 = 5;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service health, including the store and worker", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let connected = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Health check could not reach the database: {}", e);
            false
        }
    };

    let worker = match &state.worker_health {
        Some(health) => Some(health.snapshot().await.into()),
        None => None,
    };

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        worker,
    })
}

/// Content counts and recent publishing activity
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "system"
)]
pub async fn dashboard_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<DashboardStats>> {
    let db = &state.db;

    let total_programs = program::Entity::find().count(db).await.map_err(db_error)?;
    let total_lessons = lesson::Entity::find().count(db).await.map_err(db_error)?;
    let total_users = user::Entity::find().count(db).await.map_err(db_error)?;

    let published_programs = program::Entity::find()
        .filter(program::Column::Status.eq(ProgramStatus::Published))
        .count(db)
        .await
        .map_err(db_error)?;
    let published_lessons = lesson::Entity::find()
        .filter(lesson::Column::Status.eq(LessonStatus::Published))
        .count(db)
        .await
        .map_err(db_error)?;
    let scheduled_lessons = lesson::Entity::find()
        .filter(lesson::Column::Status.eq(LessonStatus::Scheduled))
        .count(db)
        .await
        .map_err(db_error)?;

    let recent_activity = lesson::Entity::find()
        .filter(lesson::Column::Status.is_in([LessonStatus::Published, LessonStatus::Scheduled]))
        .order_by_desc(lesson::Column::UpdatedAt)
        .limit(RECENT_ACTIVITY_LIMIT)
        .all(db)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(RecentActivity::from)
        .collect();

    Ok(Json(DashboardStats {
        total_programs,
        total_lessons,
        total_users,
        published_programs,
        published_lessons,
        scheduled_lessons,
        recent_activity,
    }))
}
