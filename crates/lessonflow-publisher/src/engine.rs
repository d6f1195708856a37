//! The publishing tick

use chrono::{DateTime, Utc};
use lessonflow_db::entities::{
    lesson::{self, LessonStatus},
    Lesson,
};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::PublishError;
use crate::health::WorkerHealth;
use crate::transition::{
    claim_due_lesson, cascade_program, program_of_term, publish_due_lesson, validate_publishable,
};

/// What happened to one due lesson during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonOutcome {
    Published { program_published: bool },
    /// Claimed or already handled elsewhere
    Skipped,
    /// Rolled back; the lesson stays scheduled
    Failed,
}

/// Counters for a single tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub started_at: DateTime<Utc>,
    pub scanned: usize,
    pub published: usize,
    pub skipped: usize,
    pub failed: usize,
    pub programs_published: usize,
    pub duration_ms: u64,
}

impl TickSummary {
    fn record(&mut self, outcome: LessonOutcome) {
        match outcome {
            LessonOutcome::Published { program_published } => {
                self.published += 1;
                if program_published {
                    self.programs_published += 1;
                }
            }
            LessonOutcome::Skipped => self.skipped += 1,
            LessonOutcome::Failed => self.failed += 1,
        }
    }
}

/// Publishes due scheduled lessons
pub struct Publisher {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
    health: Arc<WorkerHealth>,
}

impl Publisher {
    pub fn new(db: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            clock,
            health: Arc::new(WorkerHealth::new()),
        }
    }

    /// Health record updated after every tick
    pub fn health(&self) -> Arc<WorkerHealth> {
        self.health.clone()
    }

    /// Run one tick
    ///
    /// Only a failure to scan for due lessons is returned as an error; every
    /// per-lesson problem is counted in the summary instead.
    pub async fn tick(&self) -> Result<TickSummary, PublishError> {
        let started = Instant::now();
        let now = self.clock.now();

        let result = self.run_tick(now, started).await;

        match &result {
            Ok(summary) => {
                if summary.scanned == 0 {
                    debug!("Publishing tick: nothing due");
                } else {
                    info!(
                        scanned = summary.scanned,
                        published = summary.published,
                        skipped = summary.skipped,
                        failed = summary.failed,
                        programs_published = summary.programs_published,
                        duration_ms = summary.duration_ms,
                        "Publishing tick completed"
                    );
                }
                self.health.record_success(summary.clone()).await;
            }
            Err(e) => {
                error!(error = %e, "Publishing tick aborted");
                self.health.record_failure(now, e.to_string()).await;
            }
        }

        result
    }

    async fn run_tick(
        &self,
        now: DateTime<Utc>,
        started: Instant,
    ) -> Result<TickSummary, PublishError> {
        let due = self.due_lessons(now).await?;

        let mut summary = TickSummary {
            started_at: now,
            scanned: due.len(),
            ..Default::default()
        };

        for lesson_id in due {
            let outcome = self.publish_one(lesson_id, now).await;
            summary.record(outcome);
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        Ok(summary)
    }

    async fn due_lessons(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, PublishError> {
        let ids = Lesson::find()
            .select_only()
            .column(lesson::Column::Id)
            .filter(lesson::Column::Status.eq(LessonStatus::Scheduled))
            .filter(lesson::Column::PublishAt.lte(now))
            .order_by_asc(lesson::Column::PublishAt)
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await?;

        Ok(ids)
    }

    /// Publish a single due lesson in its own transaction
    pub async fn publish_one(&self, lesson_id: Uuid, now: DateTime<Utc>) -> LessonOutcome {
        match self.try_publish(lesson_id, now).await {
            Ok(outcome) => {
                if outcome == LessonOutcome::Skipped {
                    debug!(lesson_id = %lesson_id, "Lesson skipped: claimed or no longer due");
                }
                outcome
            }
            Err(e) if e.is_lock_contention(self.db.get_database_backend()) => {
                debug!(lesson_id = %lesson_id, error = %e, "Lesson skipped: locked by another transaction");
                LessonOutcome::Skipped
            }
            Err(e) => {
                warn!(lesson_id = %lesson_id, error = %e, "Failed to publish scheduled lesson");
                LessonOutcome::Failed
            }
        }
    }

    async fn try_publish(
        &self,
        lesson_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<LessonOutcome, PublishError> {
        let txn = self.db.begin().await?;

        let claimed = match self.db.get_database_backend() {
            DbBackend::Sqlite => swap_then_validate(&txn, lesson_id, now).await,
            _ => claim_then_swap(&txn, lesson_id, now).await,
        };
        let lesson = match claimed {
            Ok(Some(lesson)) => lesson,
            Ok(None) => {
                txn.rollback().await?;
                return Ok(LessonOutcome::Skipped);
            }
            Err(e) => {
                txn.rollback().await?;
                return Err(e);
            }
        };

        let program_id = program_of_term(&txn, lesson.term_id).await?;
        let program_published = cascade_program(&txn, program_id, now).await?;

        txn.commit().await?;

        info!(
            lesson_id = %lesson_id,
            program_id = %program_id,
            program_published,
            "Scheduled lesson published"
        );

        Ok(LessonOutcome::Published { program_published })
    }
}

/// Lock the due row without waiting, validate, then compare-and-swap
///
/// `None` when the row is locked elsewhere or no longer due.
async fn claim_then_swap(
    txn: &DatabaseTransaction,
    lesson_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<lesson::Model>, PublishError> {
    let Some(lesson) = claim_due_lesson(txn, lesson_id, now).await? else {
        return Ok(None);
    };

    validate_publishable(&lesson)?;

    if !publish_due_lesson(txn, lesson_id, now).await? {
        return Ok(None);
    }

    Ok(Some(lesson))
}

/// Compare-and-swap first, then validate the row it published
///
/// SQLite only waits on a busy lock when the transaction has not read yet; a
/// read-then-write transaction fails outright once another writer commits.
/// Writing first keeps losers waiting and then finding nothing to swap. The
/// caller rolls the swap back when validation fails.
async fn swap_then_validate(
    txn: &DatabaseTransaction,
    lesson_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<lesson::Model>, PublishError> {
    if !publish_due_lesson(txn, lesson_id, now).await? {
        return Ok(None);
    }

    let lesson = Lesson::find_by_id(lesson_id)
        .one(txn)
        .await?
        .ok_or(PublishError::LessonNotFound(lesson_id))?;

    validate_publishable(&lesson)?;

    Ok(Some(lesson))
}
