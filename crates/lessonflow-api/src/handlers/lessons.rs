use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use lessonflow_db::entities::{
    asset::OwnerType,
    lesson::{self, LessonStatus},
    LanguageList, UrlMap,
};
use lessonflow_publisher::publish_now;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{
    api_error, conflict, db_error, not_found, publish_error, validation_error, write_error,
    ApiResult,
};
use crate::handlers::terms::find_term;
use crate::handlers::{delete_owner_assets, lesson_view, upsert_asset};
use crate::middleware::AuthUser;
use crate::models::*;
use crate::validation::{
    languages_with_primary, validate_language, validate_lesson, validate_title, validate_url,
};
use crate::AppState;

const LESSON_EXISTS: &str = "Lesson number already exists in this term";

async fn find_lesson<C: ConnectionTrait>(conn: &C, id: Uuid) -> ApiResult<lesson::Model> {
    lesson::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Lesson"))
}

async fn number_taken(
    state: &AppState,
    term_id: Uuid,
    lesson_number: i32,
    except: Option<Uuid>,
) -> ApiResult<bool> {
    let mut query = lesson::Entity::find()
        .filter(lesson::Column::TermId.eq(term_id))
        .filter(lesson::Column::LessonNumber.eq(lesson_number));
    if let Some(id) = except {
        query = query.filter(lesson::Column::Id.ne(id));
    }
    Ok(query.one(&state.db).await.map_err(db_error)?.is_some())
}

/// Every column set, for inserting a new row
fn set_all(l: lesson::Model) -> lesson::ActiveModel {
    lesson::ActiveModel {
        id: Set(l.id),
        term_id: Set(l.term_id),
        lesson_number: Set(l.lesson_number),
        title: Set(l.title),
        content_type: Set(l.content_type),
        duration_ms: Set(l.duration_ms),
        is_paid: Set(l.is_paid),
        content_language_primary: Set(l.content_language_primary),
        content_languages_available: Set(l.content_languages_available),
        content_urls_by_language: Set(l.content_urls_by_language),
        subtitle_languages: Set(l.subtitle_languages),
        subtitle_urls_by_language: Set(l.subtitle_urls_by_language),
        status: Set(l.status),
        publish_at: Set(l.publish_at),
        published_at: Set(l.published_at),
        created_at: Set(l.created_at),
        updated_at: Set(l.updated_at),
    }
}

/// Lessons of a term in order
#[utoipa::path(
    get,
    path = "/api/terms/{id}/lessons",
    params(("id" = Uuid, Path, description = "Term ID")),
    responses(
        (status = 200, description = "Lessons ordered by lesson_number", body = LessonList),
        (status = 404, description = "Term not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "lessons"
)]
pub async fn list_lessons(
    State(state): State<Arc<AppState>>,
    Path(term_id): Path<Uuid>,
) -> ApiResult<Json<LessonList>> {
    find_term(&state.db, term_id).await?;

    let rows = lesson::Entity::find()
        .filter(lesson::Column::TermId.eq(term_id))
        .order_by_asc(lesson::Column::LessonNumber)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    let mut lessons = Vec::with_capacity(rows.len());
    for row in rows {
        lessons.push(lesson_view(&state.db, row).await.map_err(db_error)?);
    }

    let total = lessons.len();
    Ok(Json(LessonList { lessons, total }))
}

/// Create a draft lesson
#[utoipa::path(
    post,
    path = "/api/terms/{id}/lessons",
    params(("id" = Uuid, Path, description = "Term ID")),
    request_body = CreateLessonRequest,
    responses(
        (status = 201, description = "Lesson created", body = Lesson),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Term not found", body = ErrorResponse),
        (status = 409, description = "Lesson number already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "lessons"
)]
pub async fn create_lesson(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(term_id): Path<Uuid>,
    Json(req): Json<CreateLessonRequest>,
) -> ApiResult<(StatusCode, Json<Lesson>)> {
    auth_user.require_editor()?;

    find_term(&state.db, term_id).await?;

    let languages =
        languages_with_primary(&req.content_language_primary, req.content_languages_available)?;
    let now = state.clock.now();

    let draft = lesson::Model {
        id: Uuid::new_v4(),
        term_id,
        lesson_number: req.lesson_number,
        title: validate_title(&req.title)?,
        content_type: req.content_type,
        duration_ms: req.duration_ms,
        is_paid: req.is_paid,
        content_language_primary: req.content_language_primary,
        content_languages_available: LanguageList(languages),
        content_urls_by_language: UrlMap(req.content_urls_by_language),
        subtitle_languages: LanguageList(req.subtitle_languages),
        subtitle_urls_by_language: UrlMap(req.subtitle_urls_by_language),
        status: LessonStatus::Draft,
        publish_at: None,
        published_at: None,
        created_at: now,
        updated_at: now,
    };
    validate_lesson(&draft)?;

    if number_taken(&state, term_id, draft.lesson_number, None).await? {
        return Err(conflict(LESSON_EXISTS));
    }

    let created = set_all(draft)
        .insert(&state.db)
        .await
        .map_err(|e| write_error(e, LESSON_EXISTS))?;

    info!(lesson_id = %created.id, term_id = %term_id, "Lesson created");

    let view = lesson_view(&state.db, created).await.map_err(db_error)?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/api/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Lesson with thumbnails", body = Lesson),
        (status = 404, description = "Lesson not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "lessons"
)]
pub async fn get_lesson(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Lesson>> {
    let found = find_lesson(&state.db, id).await?;
    Ok(Json(lesson_view(&state.db, found).await.map_err(db_error)?))
}

/// Write the content columns of `merged` over the row read as `existing`
///
/// Workflow columns (`status`, `publish_at`, `published_at`) are left out of
/// the UPDATE, so a publish or archive committed after `existing` was read
/// survives.
pub(crate) async fn write_lesson_content<C: ConnectionTrait>(
    conn: &C,
    existing: lesson::Model,
    merged: lesson::Model,
) -> Result<lesson::Model, DbErr> {
    let mut active: lesson::ActiveModel = existing.into();
    active.lesson_number = Set(merged.lesson_number);
    active.title = Set(merged.title);
    active.content_type = Set(merged.content_type);
    active.duration_ms = Set(merged.duration_ms);
    active.is_paid = Set(merged.is_paid);
    active.content_language_primary = Set(merged.content_language_primary);
    active.content_languages_available = Set(merged.content_languages_available);
    active.content_urls_by_language = Set(merged.content_urls_by_language);
    active.subtitle_languages = Set(merged.subtitle_languages);
    active.subtitle_urls_by_language = Set(merged.subtitle_urls_by_language);
    active.updated_at = Set(merged.updated_at);
    active.update(conn).await
}

/// Update lesson content; the merged row is validated as a whole
#[utoipa::path(
    patch,
    path = "/api/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    request_body = UpdateLessonRequest,
    responses(
        (status = 200, description = "Lesson updated", body = Lesson),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 409, description = "Lesson number already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "lessons"
)]
pub async fn update_lesson(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLessonRequest>,
) -> ApiResult<Json<Lesson>> {
    auth_user.require_editor()?;

    let existing = find_lesson(&state.db, id).await?;
    let mut merged = existing.clone();

    if let Some(lesson_number) = req.lesson_number {
        if number_taken(&state, merged.term_id, lesson_number, Some(id)).await? {
            return Err(conflict(LESSON_EXISTS));
        }
        merged.lesson_number = lesson_number;
    }
    if let Some(title) = req.title {
        merged.title = validate_title(&title)?;
    }
    if let Some(content_type) = req.content_type {
        merged.content_type = content_type;
    }
    if let Some(duration_ms) = req.duration_ms {
        merged.duration_ms = Some(duration_ms);
    }
    if let Some(is_paid) = req.is_paid {
        merged.is_paid = is_paid;
    }
    if let Some(primary) = req.content_language_primary {
        merged.content_language_primary = primary;
    }
    if let Some(available) = req.content_languages_available {
        merged.content_languages_available = LanguageList(available);
    }
    if let Some(urls) = req.content_urls_by_language {
        merged.content_urls_by_language = UrlMap(urls);
    }
    if let Some(languages) = req.subtitle_languages {
        merged.subtitle_languages = LanguageList(languages);
    }
    if let Some(urls) = req.subtitle_urls_by_language {
        merged.subtitle_urls_by_language = UrlMap(urls);
    }
    merged.updated_at = state.clock.now();

    validate_lesson(&merged)?;

    let updated = write_lesson_content(&state.db, existing, merged)
        .await
        .map_err(|e| write_error(e, LESSON_EXISTS))?;

    info!(lesson_id = %id, updated_by = %auth_user.user_id, "Lesson updated");

    Ok(Json(lesson_view(&state.db, updated).await.map_err(db_error)?))
}

#[utoipa::path(
    delete,
    path = "/api/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    responses(
        (status = 204, description = "Lesson deleted"),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "lessons"
)]
pub async fn delete_lesson(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    auth_user.require_delete()?;

    let txn = state.db.begin().await.map_err(db_error)?;
    find_lesson(&txn, id).await?;

    delete_owner_assets(&txn, OwnerType::Lesson, vec![id])
        .await
        .map_err(db_error)?;
    lesson::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(db_error)?;
    txn.commit().await.map_err(db_error)?;

    info!(lesson_id = %id, deleted_by = %auth_user.user_id, "Lesson deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Publish now, schedule or archive a lesson
///
/// `publish_now` applies the same program cascade as the scheduled worker.
#[utoipa::path(
    post,
    path = "/api/lessons/{id}/publish",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    request_body = PublishRequest,
    responses(
        (status = 200, description = "Lesson status changed", body = PublishResponse),
        (status = 400, description = "Missing or past publish_at, or invalid lesson", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 409, description = "Published lessons must be archived before rescheduling", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "lessons"
)]
pub async fn publish_lesson(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<PublishRequest>,
) -> ApiResult<Json<PublishResponse>> {
    auth_user.require_editor()?;

    let now = state.clock.now();
    let txn = state.db.begin().await.map_err(db_error)?;

    let (updated, program_published) = match req.action {
        PublishAction::PublishNow => {
            let result = publish_now(&txn, id, now).await.map_err(publish_error)?;
            (result.lesson, result.program_published)
        }
        PublishAction::Schedule => {
            let publish_at = req
                .publish_at
                .ok_or_else(|| validation_error("publish_at is required for scheduling"))?;
            if publish_at < now {
                return Err(validation_error("publish_at must not be in the past"));
            }

            let current = find_lesson(&txn, id).await?;
            if current.status == LessonStatus::Published {
                return Err(api_error(
                    StatusCode::CONFLICT,
                    "Lesson is already published; archive it before rescheduling",
                    "LESSON_PUBLISHED",
                ));
            }
            validate_lesson(&current)?;

            let result = lesson::Entity::update_many()
                .set(lesson::ActiveModel {
                    status: Set(LessonStatus::Scheduled),
                    publish_at: Set(Some(publish_at)),
                    published_at: Set(None),
                    updated_at: Set(now),
                    ..Default::default()
                })
                .filter(lesson::Column::Id.eq(id))
                .filter(lesson::Column::Status.ne(LessonStatus::Published))
                .exec(&txn)
                .await
                .map_err(db_error)?;

            if result.rows_affected == 0 {
                return Err(conflict("Lesson was published concurrently"));
            }

            (find_lesson(&txn, id).await?, false)
        }
        PublishAction::Archive => {
            let mut active: lesson::ActiveModel = find_lesson(&txn, id).await?.into();
            active.status = Set(LessonStatus::Archived);
            active.updated_at = Set(now);
            (active.update(&txn).await.map_err(db_error)?, false)
        }
    };

    txn.commit().await.map_err(db_error)?;

    info!(
        lesson_id = %id,
        action = ?req.action,
        status = ?updated.status,
        program_published,
        by = %auth_user.user_id,
        "Lesson workflow action applied"
    );

    let lesson = lesson_view(&state.db, updated).await.map_err(db_error)?;
    Ok(Json(PublishResponse {
        lesson,
        program_published,
    }))
}

/// Add or replace a thumbnail
#[utoipa::path(
    post,
    path = "/api/lessons/{id}/assets",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    request_body = AssetRequest,
    responses(
        (status = 200, description = "Lesson with updated thumbnails", body = Lesson),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "lessons"
)]
pub async fn add_lesson_asset(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssetRequest>,
) -> ApiResult<Json<Lesson>> {
    auth_user.require_editor()?;

    validate_language(&req.language)?;
    validate_url(&req.url)?;

    let existing = find_lesson(&state.db, id).await?;
    upsert_asset(&state.db, OwnerType::Lesson, id, req, state.clock.now())
        .await
        .map_err(db_error)?;

    Ok(Json(lesson_view(&state.db, existing).await.map_err(db_error)?))
}
