use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use lessonflow_db::entities::topic;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{conflict, db_error, not_found, validation_error, write_error, ApiResult};
use crate::middleware::AuthUser;
use crate::models::*;
use crate::AppState;

const TOPIC_EXISTS: &str = "Topic name already exists";

fn topic_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(validation_error("Topic name is required"));
    }
    Ok(name.to_string())
}

async fn name_taken(state: &AppState, name: &str, except: Option<Uuid>) -> ApiResult<bool> {
    let mut query = topic::Entity::find().filter(topic::Column::Name.eq(name));
    if let Some(id) = except {
        query = query.filter(topic::Column::Id.ne(id));
    }
    Ok(query.one(&state.db).await.map_err(db_error)?.is_some())
}

#[utoipa::path(
    get,
    path = "/api/topics",
    responses((status = 200, description = "All topics by name", body = TopicList)),
    security(("bearer_auth" = [])),
    tag = "topics"
)]
pub async fn list_topics(State(state): State<Arc<AppState>>) -> ApiResult<Json<TopicList>> {
    let topics: Vec<Topic> = topic::Entity::find()
        .order_by_asc(topic::Column::Name)
        .all(&state.db)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(Topic::from)
        .collect();

    let total = topics.len();
    Ok(Json(TopicList { topics, total }))
}

#[utoipa::path(
    post,
    path = "/api/topics",
    request_body = TopicRequest,
    responses(
        (status = 201, description = "Topic created", body = Topic),
        (status = 409, description = "Name already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "topics"
)]
pub async fn create_topic(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<TopicRequest>,
) -> ApiResult<(StatusCode, Json<Topic>)> {
    auth_user.require_editor()?;

    let name = topic_name(&req.name)?;
    if name_taken(&state, &name, None).await? {
        return Err(conflict(TOPIC_EXISTS));
    }

    let created = topic::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        created_at: Set(state.clock.now()),
    }
    .insert(&state.db)
    .await
    .map_err(|e| write_error(e, TOPIC_EXISTS))?;

    info!(topic_id = %created.id, "Topic created");

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Rename a topic
#[utoipa::path(
    put,
    path = "/api/topics/{id}",
    params(("id" = Uuid, Path, description = "Topic ID")),
    request_body = TopicRequest,
    responses(
        (status = 200, description = "Topic renamed", body = Topic),
        (status = 404, description = "Topic not found", body = ErrorResponse),
        (status = 409, description = "Name already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "topics"
)]
pub async fn update_topic(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<TopicRequest>,
) -> ApiResult<Json<Topic>> {
    auth_user.require_editor()?;

    let existing = topic::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Topic"))?;

    let name = topic_name(&req.name)?;
    if name_taken(&state, &name, Some(id)).await? {
        return Err(conflict(TOPIC_EXISTS));
    }

    let mut active: topic::ActiveModel = existing.into();
    active.name = Set(name);
    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| write_error(e, TOPIC_EXISTS))?;

    Ok(Json(updated.into()))
}

/// Delete a topic; programs lose the tag
#[utoipa::path(
    delete,
    path = "/api/topics/{id}",
    params(("id" = Uuid, Path, description = "Topic ID")),
    responses(
        (status = 204, description = "Topic deleted"),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Topic not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "topics"
)]
pub async fn delete_topic(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    auth_user.require_delete()?;

    let existing = topic::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Topic"))?;

    existing.delete(&state.db).await.map_err(db_error)?;

    info!(topic_id = %id, "Topic deleted");

    Ok(StatusCode::NO_CONTENT)
}
