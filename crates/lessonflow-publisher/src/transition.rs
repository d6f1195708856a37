//! Lesson publication and the program cascade
//!
//! Shared by the scheduled engine and the manual "publish now" action so a
//! program is affected the same way whichever path publishes its lesson.

use chrono::{DateTime, Utc};
use lessonflow_db::entities::{
    lesson::{self, ContentType, LessonStatus},
    program::{self, ProgramStatus},
    Lesson, Program, Term,
};
use sea_orm::{
    sea_query::{LockBehavior, LockType},
    ActiveValue::Set,
    ColumnTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait, QueryFilter, QuerySelect,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::PublishError;

/// Content rules a lesson must satisfy to be visible in the catalog
pub fn validate_publishable(lesson: &lesson::Model) -> Result<(), PublishError> {
    let invalid = |reason: String| PublishError::InvalidLesson {
        lesson_id: lesson.id,
        reason,
    };

    let primary = &lesson.content_language_primary;

    if !lesson.content_languages_available.contains(primary) {
        return Err(invalid(format!(
            "primary language '{}' is not listed in content_languages_available",
            primary
        )));
    }

    if !lesson.content_urls_by_language.contains_language(primary) {
        return Err(invalid(format!(
            "no content URL for primary language '{}'",
            primary
        )));
    }

    if lesson.content_type == ContentType::Video && !lesson.duration_ms.is_some_and(|d| d > 0) {
        return Err(invalid("video lessons require a positive duration_ms".to_string()));
    }

    Ok(())
}

/// Claim a due lesson row inside the caller's transaction
///
/// Returns `None` when the row is gone, no longer due, or (on backends with
/// row locks) held by another transaction. SQLite has no row locks; there the
/// compare-and-swap in [`publish_due_lesson`] decides the race.
pub async fn claim_due_lesson<C: ConnectionTrait>(
    conn: &C,
    lesson_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<lesson::Model>, DbErr> {
    let mut query = Lesson::find_by_id(lesson_id)
        .filter(lesson::Column::Status.eq(LessonStatus::Scheduled))
        .filter(lesson::Column::PublishAt.lte(now));

    if conn.get_database_backend() != DbBackend::Sqlite {
        query = query.lock_with_behavior(LockType::Update, LockBehavior::SkipLocked);
    }

    query.one(conn).await
}

/// Move a due lesson to `published`, only if it is still scheduled and due
///
/// Returns whether this call made the transition.
pub async fn publish_due_lesson<C: ConnectionTrait>(
    conn: &C,
    lesson_id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let result = Lesson::update_many()
        .set(lesson::ActiveModel {
            status: Set(LessonStatus::Published),
            published_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(lesson::Column::Id.eq(lesson_id))
        .filter(lesson::Column::Status.eq(LessonStatus::Scheduled))
        .filter(lesson::Column::PublishAt.lte(now))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Publish a draft program; any other status is left alone
///
/// Returns whether the program changed. `published_at` is only ever written
/// by this draft-to-published step.
pub async fn cascade_program<C: ConnectionTrait>(
    conn: &C,
    program_id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let result = Program::update_many()
        .set(program::ActiveModel {
            status: Set(ProgramStatus::Published),
            published_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(program::Column::Id.eq(program_id))
        .filter(program::Column::Status.eq(ProgramStatus::Draft))
        .exec(conn)
        .await?;

    if result.rows_affected > 0 {
        debug!(program_id = %program_id, "Program published by cascade");
    }

    Ok(result.rows_affected > 0)
}

/// Owning program of a term
pub async fn program_of_term<C: ConnectionTrait>(
    conn: &C,
    term_id: Uuid,
) -> Result<Uuid, PublishError> {
    Term::find_by_id(term_id)
        .one(conn)
        .await?
        .map(|term| term.program_id)
        .ok_or(PublishError::TermNotFound(term_id))
}

/// Result of a manual publish
#[derive(Debug, Clone)]
pub struct ManualPublish {
    pub lesson: lesson::Model,
    /// The program went from draft to published with this call
    pub program_published: bool,
}

/// Publish a lesson immediately, whatever its current status
///
/// Clears `publish_at`. A lesson that is already published keeps its
/// original `published_at`. Run this inside a transaction.
pub async fn publish_now<C: ConnectionTrait>(
    conn: &C,
    lesson_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ManualPublish, PublishError> {
    let current = Lesson::find_by_id(lesson_id)
        .one(conn)
        .await?
        .ok_or(PublishError::LessonNotFound(lesson_id))?;

    validate_publishable(&current)?;

    if current.status != LessonStatus::Published {
        Lesson::update_many()
            .set(lesson::ActiveModel {
                status: Set(LessonStatus::Published),
                published_at: Set(Some(now)),
                publish_at: Set(None),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(lesson::Column::Id.eq(lesson_id))
            .filter(lesson::Column::Status.ne(LessonStatus::Published))
            .exec(conn)
            .await?;
    }

    let program_id = program_of_term(conn, current.term_id).await?;
    let program_published = cascade_program(conn, program_id, now).await?;

    let lesson = Lesson::find_by_id(lesson_id)
        .one(conn)
        .await?
        .ok_or(PublishError::LessonNotFound(lesson_id))?;

    Ok(ManualPublish {
        lesson,
        program_published,
    })
}
