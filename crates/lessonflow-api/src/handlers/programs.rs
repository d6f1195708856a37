use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use lessonflow_db::entities::{
    asset::OwnerType,
    lesson,
    program::{self, ProgramStatus},
    program_topic, term, topic, LanguageList,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use sea_orm::sea_query::JoinType;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{db_error, not_found, validation_error, ApiResult};
use crate::handlers::{delete_owner_assets, program_view, upsert_asset};
use crate::middleware::AuthUser;
use crate::models::*;
use crate::validation::{languages_with_primary, validate_language, validate_title, validate_url};
use crate::AppState;

pub(crate) async fn find_program<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> ApiResult<program::Model> {
    program::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Program"))
}

/// Check every topic id exists, dropping duplicates
async fn resolve_topics<C: ConnectionTrait>(conn: &C, ids: Vec<Uuid>) -> ApiResult<Vec<Uuid>> {
    let ids: Vec<Uuid> = ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    if ids.is_empty() {
        return Ok(ids);
    }

    let found = topic::Entity::find()
        .filter(topic::Column::Id.is_in(ids.clone()))
        .all(conn)
        .await
        .map_err(db_error)?;

    if found.len() != ids.len() {
        return Err(validation_error("One or more topic ids do not exist"));
    }

    Ok(ids)
}

async fn replace_topics<C: ConnectionTrait>(
    conn: &C,
    program_id: Uuid,
    topic_ids: Vec<Uuid>,
) -> ApiResult<()> {
    program_topic::Entity::delete_many()
        .filter(program_topic::Column::ProgramId.eq(program_id))
        .exec(conn)
        .await
        .map_err(db_error)?;

    if topic_ids.is_empty() {
        return Ok(());
    }

    let rows = topic_ids.into_iter().map(|topic_id| program_topic::ActiveModel {
        program_id: Set(program_id),
        topic_id: Set(topic_id),
    });

    program_topic::Entity::insert_many(rows)
        .exec(conn)
        .await
        .map_err(db_error)?;

    Ok(())
}

/// List programs
#[utoipa::path(
    get,
    path = "/api/programs",
    params(
        ("status" = Option<String>, Query, description = "Filter by status (draft, published, archived)"),
        ("language" = Option<String>, Query, description = "Filter by primary language")
    ),
    responses(
        (status = 200, description = "Programs, most recently updated first", body = ProgramList)
    ),
    security(("bearer_auth" = [])),
    tag = "programs"
)]
pub async fn list_programs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProgramQuery>,
) -> ApiResult<Json<ProgramList>> {
    debug!("Listing programs with filters: {:?}", query);

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(program::Column::Status.eq(status));
    }
    if let Some(ref language) = query.language {
        condition = condition.add(program::Column::LanguagePrimary.eq(language.as_str()));
    }

    let rows = program::Entity::find()
        .filter(condition)
        .order_by_desc(program::Column::UpdatedAt)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    let mut programs = Vec::with_capacity(rows.len());
    for row in rows {
        programs.push(program_view(&state.db, row).await.map_err(db_error)?);
    }

    let total = programs.len();
    Ok(Json(ProgramList { programs, total }))
}

/// Create a draft program
#[utoipa::path(
    post,
    path = "/api/programs",
    request_body = CreateProgramRequest,
    responses(
        (status = 201, description = "Program created", body = Program),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 403, description = "Admin or editor role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "programs"
)]
pub async fn create_program(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<CreateProgramRequest>,
) -> ApiResult<(StatusCode, Json<Program>)> {
    auth_user.require_editor()?;

    let title = validate_title(&req.title)?;
    let languages = languages_with_primary(&req.language_primary, req.languages_available)?;

    let txn = state.db.begin().await.map_err(db_error)?;
    let topic_ids = resolve_topics(&txn, req.topic_ids).await?;

    let now = state.clock.now();
    let created = program::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        description: Set(req.description),
        language_primary: Set(req.language_primary),
        languages_available: Set(LanguageList(languages)),
        status: Set(ProgramStatus::Draft),
        published_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await
    .map_err(db_error)?;

    replace_topics(&txn, created.id, topic_ids).await?;
    txn.commit().await.map_err(db_error)?;

    info!(program_id = %created.id, created_by = %auth_user.user_id, "Program created");

    let view = program_view(&state.db, created).await.map_err(db_error)?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/api/programs/{id}",
    params(("id" = Uuid, Path, description = "Program ID")),
    responses(
        (status = 200, description = "Program with topics and posters", body = Program),
        (status = 404, description = "Program not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "programs"
)]
pub async fn get_program(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Program>> {
    let found = find_program(&state.db, id).await?;
    Ok(Json(program_view(&state.db, found).await.map_err(db_error)?))
}

/// Update program fields, topics or status
#[utoipa::path(
    patch,
    path = "/api/programs/{id}",
    params(("id" = Uuid, Path, description = "Program ID")),
    request_body = UpdateProgramRequest,
    responses(
        (status = 200, description = "Program updated", body = Program),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Program not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "programs"
)]
pub async fn update_program(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProgramRequest>,
) -> ApiResult<Json<Program>> {
    auth_user.require_editor()?;

    if req.status == Some(ProgramStatus::Published) {
        return Err(validation_error(
            "Programs are published by publishing one of their lessons",
        ));
    }

    let txn = state.db.begin().await.map_err(db_error)?;
    let existing = find_program(&txn, id).await?;

    let language_primary = req
        .language_primary
        .unwrap_or_else(|| existing.language_primary.clone());
    let languages = languages_with_primary(
        &language_primary,
        Some(
            req.languages_available
                .unwrap_or_else(|| existing.languages_available.0.clone()),
        ),
    )?;

    let mut active: program::ActiveModel = existing.into();
    if let Some(title) = req.title {
        active.title = Set(validate_title(&title)?);
    }
    if let Some(description) = req.description {
        active.description = Set(Some(description));
    }
    active.language_primary = Set(language_primary);
    active.languages_available = Set(LanguageList(languages));
    if let Some(status) = req.status {
        active.status = Set(status);
    }
    active.updated_at = Set(state.clock.now());

    let updated = active.update(&txn).await.map_err(db_error)?;

    if let Some(topic_ids) = req.topic_ids {
        let topic_ids = resolve_topics(&txn, topic_ids).await?;
        replace_topics(&txn, id, topic_ids).await?;
    }

    txn.commit().await.map_err(db_error)?;

    info!(program_id = %id, updated_by = %auth_user.user_id, "Program updated");

    Ok(Json(program_view(&state.db, updated).await.map_err(db_error)?))
}

/// Delete a program with its terms, lessons and assets
#[utoipa::path(
    delete,
    path = "/api/programs/{id}",
    params(("id" = Uuid, Path, description = "Program ID")),
    responses(
        (status = 204, description = "Program deleted"),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Program not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "programs"
)]
pub async fn delete_program(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    auth_user.require_delete()?;

    let txn = state.db.begin().await.map_err(db_error)?;
    let existing = find_program(&txn, id).await?;

    let lesson_ids: Vec<Uuid> = lesson::Entity::find()
        .select_only()
        .column(lesson::Column::Id)
        .join(JoinType::InnerJoin, lesson::Relation::Term.def())
        .filter(term::Column::ProgramId.eq(id))
        .into_tuple()
        .all(&txn)
        .await
        .map_err(db_error)?;

    delete_owner_assets(&txn, OwnerType::Lesson, lesson_ids)
        .await
        .map_err(db_error)?;
    delete_owner_assets(&txn, OwnerType::Program, vec![id])
        .await
        .map_err(db_error)?;

    existing.delete(&txn).await.map_err(db_error)?;
    txn.commit().await.map_err(db_error)?;

    info!(program_id = %id, deleted_by = %auth_user.user_id, "Program deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Add or replace a poster
#[utoipa::path(
    post,
    path = "/api/programs/{id}/assets",
    params(("id" = Uuid, Path, description = "Program ID")),
    request_body = AssetRequest,
    responses(
        (status = 200, description = "Program with updated posters", body = Program),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Program not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "programs"
)]
pub async fn add_program_asset(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssetRequest>,
) -> ApiResult<Json<Program>> {
    auth_user.require_editor()?;

    validate_language(&req.language)?;
    validate_url(&req.url)?;

    let existing = find_program(&state.db, id).await?;
    upsert_asset(&state.db, OwnerType::Program, id, req, state.clock.now())
        .await
        .map_err(db_error)?;

    Ok(Json(program_view(&state.db, existing).await.map_err(db_error)?))
}
