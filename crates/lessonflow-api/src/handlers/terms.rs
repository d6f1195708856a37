use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use lessonflow_db::entities::{asset::OwnerType, lesson, term};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{conflict, db_error, not_found, write_error, ApiResult};
use crate::handlers::delete_owner_assets;
use crate::handlers::programs::find_program;
use crate::middleware::AuthUser;
use crate::models::*;
use crate::validation::validate_number;
use crate::AppState;

const TERM_EXISTS: &str = "Term number already exists in this program";

pub(crate) async fn find_term<C: ConnectionTrait>(conn: &C, id: Uuid) -> ApiResult<term::Model> {
    term::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Term"))
}

async fn number_taken(
    state: &AppState,
    program_id: Uuid,
    term_number: i32,
    except: Option<Uuid>,
) -> ApiResult<bool> {
    let mut query = term::Entity::find()
        .filter(term::Column::ProgramId.eq(program_id))
        .filter(term::Column::TermNumber.eq(term_number));
    if let Some(id) = except {
        query = query.filter(term::Column::Id.ne(id));
    }
    Ok(query.one(&state.db).await.map_err(db_error)?.is_some())
}

/// Terms of a program in order
#[utoipa::path(
    get,
    path = "/api/programs/{id}/terms",
    params(("id" = Uuid, Path, description = "Program ID")),
    responses(
        (status = 200, description = "Terms ordered by term_number", body = TermList),
        (status = 404, description = "Program not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "terms"
)]
pub async fn list_terms(
    State(state): State<Arc<AppState>>,
    Path(program_id): Path<Uuid>,
) -> ApiResult<Json<TermList>> {
    find_program(&state.db, program_id).await?;

    let terms: Vec<Term> = term::Entity::find()
        .filter(term::Column::ProgramId.eq(program_id))
        .order_by_asc(term::Column::TermNumber)
        .all(&state.db)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(Term::from)
        .collect();

    let total = terms.len();
    Ok(Json(TermList { terms, total }))
}

#[utoipa::path(
    post,
    path = "/api/programs/{id}/terms",
    params(("id" = Uuid, Path, description = "Program ID")),
    request_body = CreateTermRequest,
    responses(
        (status = 201, description = "Term created", body = Term),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Program not found", body = ErrorResponse),
        (status = 409, description = "Term number already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "terms"
)]
pub async fn create_term(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(program_id): Path<Uuid>,
    Json(req): Json<CreateTermRequest>,
) -> ApiResult<(StatusCode, Json<Term>)> {
    auth_user.require_editor()?;

    validate_number(req.term_number, "term_number")?;
    find_program(&state.db, program_id).await?;

    if number_taken(&state, program_id, req.term_number, None).await? {
        return Err(conflict(TERM_EXISTS));
    }

    let created = term::ActiveModel {
        id: Set(Uuid::new_v4()),
        program_id: Set(program_id),
        term_number: Set(req.term_number),
        title: Set(req.title),
        created_at: Set(state.clock.now()),
    }
    .insert(&state.db)
    .await
    .map_err(|e| write_error(e, TERM_EXISTS))?;

    info!(term_id = %created.id, program_id = %program_id, "Term created");

    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    patch,
    path = "/api/terms/{id}",
    params(("id" = Uuid, Path, description = "Term ID")),
    request_body = UpdateTermRequest,
    responses(
        (status = 200, description = "Term updated", body = Term),
        (status = 404, description = "Term not found", body = ErrorResponse),
        (status = 409, description = "Term number already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "terms"
)]
pub async fn update_term(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTermRequest>,
) -> ApiResult<Json<Term>> {
    auth_user.require_editor()?;

    let existing = find_term(&state.db, id).await?;
    let program_id = existing.program_id;

    let mut active: term::ActiveModel = existing.into();
    if let Some(term_number) = req.term_number {
        validate_number(term_number, "term_number")?;
        if number_taken(&state, program_id, term_number, Some(id)).await? {
            return Err(conflict(TERM_EXISTS));
        }
        active.term_number = Set(term_number);
    }
    if let Some(title) = req.title {
        active.title = Set(Some(title));
    }

    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| write_error(e, TERM_EXISTS))?;

    Ok(Json(updated.into()))
}

/// Delete a term with its lessons
#[utoipa::path(
    delete,
    path = "/api/terms/{id}",
    params(("id" = Uuid, Path, description = "Term ID")),
    responses(
        (status = 204, description = "Term deleted"),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Term not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "terms"
)]
pub async fn delete_term(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    auth_user.require_delete()?;

    let txn = state.db.begin().await.map_err(db_error)?;
    let existing = find_term(&txn, id).await?;

    let lesson_ids: Vec<Uuid> = lesson::Entity::find()
        .select_only()
        .column(lesson::Column::Id)
        .filter(lesson::Column::TermId.eq(id))
        .into_tuple()
        .all(&txn)
        .await
        .map_err(db_error)?;

    delete_owner_assets(&txn, OwnerType::Lesson, lesson_ids)
        .await
        .map_err(db_error)?;
    existing.delete(&txn).await.map_err(db_error)?;
    txn.commit().await.map_err(db_error)?;

    info!(term_id = %id, deleted_by = %auth_user.user_id, "Term deleted");

    Ok(StatusCode::NO_CONTENT)
}
