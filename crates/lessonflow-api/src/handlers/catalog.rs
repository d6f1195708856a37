//! Public read-only catalog
//!
//! Only `published` programs and lessons are ever returned. The listing is
//! keyset-paginated on `(published_at desc, id desc)` with an opaque cursor.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use lessonflow_db::entities::{
    lesson::{self, LessonStatus},
    program::{self, ProgramStatus},
    program_topic, term, topic,
};
use sea_orm::{
    sea_query::SelectStatement, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{api_error, db_error, not_found, ApiResult};
use crate::handlers::{lesson_view, program_view};
use crate::models::*;
use crate::AppState;

const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 50;

pub(crate) fn encode_cursor(published_at: DateTime<Utc>, id: Uuid) -> String {
    URL_SAFE_NO_PAD.encode(format!("{}|{}", published_at.to_rfc3339(), id))
}

pub(crate) fn decode_cursor(cursor: &str) -> Option<(DateTime<Utc>, Uuid)> {
    let raw = URL_SAFE_NO_PAD.decode(cursor).ok()?;
    let raw = String::from_utf8(raw).ok()?;
    let (at, id) = raw.split_once('|')?;

    let at = DateTime::parse_from_rfc3339(at).ok()?.with_timezone(&Utc);
    let id = Uuid::parse_str(id).ok()?;
    Some((at, id))
}

fn page_size(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Published program, or 404 for anything else
async fn published_program<C: ConnectionTrait>(conn: &C, id: Uuid) -> ApiResult<program::Model> {
    program::Entity::find_by_id(id)
        .filter(program::Column::Status.eq(ProgramStatus::Published))
        .one(conn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Program"))
}

/// Ids of programs owning at least one published lesson
fn with_published_lessons() -> SelectStatement {
    term::Entity::find()
        .select_only()
        .column(term::Column::ProgramId)
        .inner_join(lesson::Entity)
        .filter(lesson::Column::Status.eq(LessonStatus::Published))
        .into_query()
}

/// Published programs having at least one published lesson
#[utoipa::path(
    get,
    path = "/catalog/programs",
    params(
        ("language" = Option<String>, Query, description = "Primary language"),
        ("topic" = Option<String>, Query, description = "Topic name"),
        ("cursor" = Option<String>, Query, description = "Cursor from a previous page"),
        ("limit" = Option<u64>, Query, description = "Page size (1-50, default 10)")
    ),
    responses(
        (status = 200, description = "Page of published programs", body = CatalogProgramList),
        (status = 400, description = "Invalid cursor", body = ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn list_catalog_programs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Json<CatalogProgramList>> {
    let limit = page_size(query.limit);

    let mut select = program::Entity::find()
        .filter(program::Column::Status.eq(ProgramStatus::Published))
        .filter(program::Column::Id.in_subquery(with_published_lessons()));

    if let Some(language) = &query.language {
        select = select.filter(program::Column::LanguagePrimary.eq(language.as_str()));
    }

    if let Some(name) = &query.topic {
        let tagged = program_topic::Entity::find()
            .select_only()
            .column(program_topic::Column::ProgramId)
            .inner_join(topic::Entity)
            .filter(topic::Column::Name.eq(name.as_str()))
            .into_query();
        select = select.filter(program::Column::Id.in_subquery(tagged));
    }

    if let Some(cursor) = &query.cursor {
        let (at, id) = decode_cursor(cursor).ok_or_else(|| {
            api_error(StatusCode::BAD_REQUEST, "Invalid cursor", "INVALID_CURSOR")
        })?;
        select = select.filter(
            Condition::any()
                .add(program::Column::PublishedAt.lt(at))
                .add(
                    Condition::all()
                        .add(program::Column::PublishedAt.eq(at))
                        .add(program::Column::Id.lt(id)),
                ),
        );
    }

    let mut rows = select
        .order_by_desc(program::Column::PublishedAt)
        .order_by_desc(program::Column::Id)
        .limit(limit + 1)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    let has_more = rows.len() as u64 > limit;
    rows.truncate(limit as usize);

    let next_cursor = if has_more {
        rows.last()
            .and_then(|last| last.published_at.map(|at| encode_cursor(at, last.id)))
    } else {
        None
    };

    let mut data = Vec::with_capacity(rows.len());
    for row in rows {
        data.push(program_view(&state.db, row).await.map_err(db_error)?);
    }

    debug!(count = data.len(), has_more, "Catalog page served");

    Ok(Json(CatalogProgramList {
        data,
        next_cursor,
        has_more,
    }))
}

/// Published program with its terms and their published lessons
#[utoipa::path(
    get,
    path = "/catalog/programs/{id}",
    params(("id" = Uuid, Path, description = "Program ID")),
    responses(
        (status = 200, description = "Published program", body = CatalogProgram),
        (status = 404, description = "Program not found, not published or without published lessons", body = ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn get_catalog_program(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CatalogProgram>> {
    // same visibility as the listing
    let found = program::Entity::find_by_id(id)
        .filter(program::Column::Status.eq(ProgramStatus::Published))
        .filter(program::Column::Id.in_subquery(with_published_lessons()))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Program"))?;

    let terms = term::Entity::find()
        .filter(term::Column::ProgramId.eq(id))
        .order_by_asc(term::Column::TermNumber)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    let mut catalog_terms = Vec::new();
    for t in terms {
        let lessons = lesson::Entity::find()
            .filter(lesson::Column::TermId.eq(t.id))
            .filter(lesson::Column::Status.eq(LessonStatus::Published))
            .order_by_asc(lesson::Column::LessonNumber)
            .all(&state.db)
            .await
            .map_err(db_error)?;

        if lessons.is_empty() {
            continue;
        }

        let mut views = Vec::with_capacity(lessons.len());
        for l in lessons {
            views.push(lesson_view(&state.db, l).await.map_err(db_error)?);
        }

        catalog_terms.push(CatalogTerm {
            id: t.id,
            term_number: t.term_number,
            title: t.title,
            lessons: views,
        });
    }

    let program = program_view(&state.db, found).await.map_err(db_error)?;
    Ok(Json(CatalogProgram {
        program,
        terms: catalog_terms,
    }))
}

#[utoipa::path(
    get,
    path = "/catalog/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Published lesson", body = Lesson),
        (status = 404, description = "Lesson not found or not published", body = ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn get_catalog_lesson(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Lesson>> {
    let found = lesson::Entity::find_by_id(id)
        .filter(lesson::Column::Status.eq(LessonStatus::Published))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Lesson"))?;

    // a published lesson under an archived program stays hidden
    let owner = term::Entity::find_by_id(found.term_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Lesson"))?;
    published_program(&state.db, owner.program_id)
        .await
        .map_err(|_| not_found("Lesson"))?;

    Ok(Json(lesson_view(&state.db, found).await.map_err(db_error)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cursor_roundtrip_keeps_tie_breaker() {
        let at = Utc.with_ymd_and_hms(2026, 1, 16, 15, 0, 0).unwrap();
        let id = Uuid::new_v4();

        let cursor = encode_cursor(at, id);
        assert!(!cursor.contains('|'));
        assert_eq!(decode_cursor(&cursor), Some((at, id)));
    }

    #[test]
    fn test_garbage_cursor_is_rejected() {
        assert_eq!(decode_cursor("not a cursor"), None);
        assert_eq!(decode_cursor(&URL_SAFE_NO_PAD.encode("2026-01-16|nope")), None);
        assert_eq!(decode_cursor(&URL_SAFE_NO_PAD.encode("no separator")), None);
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(page_size(None), DEFAULT_PAGE_SIZE);
        assert_eq!(page_size(Some(0)), 1);
        assert_eq!(page_size(Some(500)), MAX_PAGE_SIZE);
        assert_eq!(page_size(Some(25)), 25);
    }
}
