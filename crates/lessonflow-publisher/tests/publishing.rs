//! Scheduled publishing against an in-memory SQLite store

use chrono::{DateTime, Duration, TimeZone, Utc};
use lessonflow_db::entities::{
    lesson::{self, ContentType, LessonStatus},
    program::{self, ProgramStatus},
    term, LanguageList, Lesson, Program, UrlMap,
};
use lessonflow_publisher::{
    publish_now, run_worker, LessonOutcome, ManualClock, PublishError, Publisher,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 16, h, m, s).unwrap()
}

async fn setup_test_db() -> DatabaseConnection {
    let db = lessonflow_db::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");
    lessonflow_db::migrate(&db)
        .await
        .expect("Failed to run migrations");
    db
}

async fn insert_program(db: &DatabaseConnection, status: ProgramStatus) -> program::Model {
    let created = at(9, 0, 0);
    program::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set("Telugu for beginners".to_string()),
        description: Set(None),
        language_primary: Set("te".to_string()),
        languages_available: Set(LanguageList(vec!["te".to_string()])),
        status: Set(status),
        published_at: Set((status == ProgramStatus::Published).then_some(created)),
        created_at: Set(created),
        updated_at: Set(created),
    }
    .insert(db)
    .await
    .expect("Failed to insert program")
}

async fn insert_term(db: &DatabaseConnection, program_id: Uuid) -> term::Model {
    term::ActiveModel {
        id: Set(Uuid::new_v4()),
        program_id: Set(program_id),
        term_number: Set(1),
        title: Set(Some("Basics".to_string())),
        created_at: Set(at(9, 0, 0)),
    }
    .insert(db)
    .await
    .expect("Failed to insert term")
}

async fn insert_lesson(
    db: &DatabaseConnection,
    term_id: Uuid,
    number: i32,
    status: LessonStatus,
    publish_at: Option<DateTime<Utc>>,
) -> lesson::Model {
    let created = at(9, 0, 0);
    lesson::ActiveModel {
        id: Set(Uuid::new_v4()),
        term_id: Set(term_id),
        lesson_number: Set(number),
        title: Set(format!("Lesson {}", number)),
        content_type: Set(ContentType::Video),
        duration_ms: Set(Some(420_000)),
        is_paid: Set(false),
        content_language_primary: Set("te".to_string()),
        content_languages_available: Set(LanguageList(vec!["te".to_string()])),
        content_urls_by_language: Set(UrlMap(BTreeMap::from([(
            "te".to_string(),
            format!("https://cdn.example.com/lesson-{}.mp4", number),
        )]))),
        subtitle_languages: Set(LanguageList::default()),
        subtitle_urls_by_language: Set(UrlMap::default()),
        status: Set(status),
        publish_at: Set(publish_at),
        published_at: Set((status == LessonStatus::Published).then_some(created)),
        created_at: Set(created),
        updated_at: Set(created),
    }
    .insert(db)
    .await
    .expect("Failed to insert lesson")
}

async fn reload_lesson(db: &DatabaseConnection, id: Uuid) -> lesson::Model {
    Lesson::find_by_id(id).one(db).await.unwrap().unwrap()
}

async fn reload_program(db: &DatabaseConnection, id: Uuid) -> program::Model {
    Program::find_by_id(id).one(db).await.unwrap().unwrap()
}

fn publisher(db: &DatabaseConnection, clock: &Arc<ManualClock>) -> Publisher {
    Publisher::new(db.clone(), clock.clone())
}

#[tokio::test]
async fn test_scheduled_lesson_published_at_due_time() {
    let db = setup_test_db().await;
    let program = insert_program(&db, ProgramStatus::Draft).await;
    let term = insert_term(&db, program.id).await;
    let lesson = insert_lesson(&db, term.id, 1, LessonStatus::Scheduled, Some(at(15, 0, 0))).await;

    let clock = Arc::new(ManualClock::new(at(15, 0, 1)));
    let publisher = publisher(&db, &clock);

    let summary = publisher.tick().await.unwrap();
    assert_eq!(summary.scanned, 1);
    assert_eq!(summary.published, 1);
    assert_eq!(summary.programs_published, 1);
    assert_eq!(summary.failed, 0);

    let lesson_after = reload_lesson(&db, lesson.id).await;
    assert_eq!(lesson_after.status, LessonStatus::Published);
    assert_eq!(lesson_after.published_at, Some(at(15, 0, 1)));

    let program_after = reload_program(&db, program.id).await;
    assert_eq!(program_after.status, ProgramStatus::Published);
    assert_eq!(program_after.published_at, Some(at(15, 0, 1)));

    // A minute later nothing changes
    clock.advance(Duration::seconds(60));
    let summary = publisher.tick().await.unwrap();
    assert_eq!(summary.scanned, 0);
    assert_eq!(summary.published, 0);

    assert_eq!(reload_lesson(&db, lesson.id).await, lesson_after);
    assert_eq!(reload_program(&db, program.id).await, program_after);
}

#[tokio::test]
async fn test_lesson_not_yet_due_stays_scheduled() {
    let db = setup_test_db().await;
    let program = insert_program(&db, ProgramStatus::Draft).await;
    let term = insert_term(&db, program.id).await;
    let lesson = insert_lesson(&db, term.id, 1, LessonStatus::Scheduled, Some(at(15, 0, 0))).await;

    let clock = Arc::new(ManualClock::new(at(14, 59, 59)));
    let summary = publisher(&db, &clock).tick().await.unwrap();

    assert_eq!(summary.scanned, 0);
    assert_eq!(reload_lesson(&db, lesson.id).await.status, LessonStatus::Scheduled);
    assert_eq!(reload_program(&db, program.id).await.status, ProgramStatus::Draft);
}

#[tokio::test]
async fn test_lesson_due_exactly_now_is_published() {
    let db = setup_test_db().await;
    let program = insert_program(&db, ProgramStatus::Draft).await;
    let term = insert_term(&db, program.id).await;
    let lesson = insert_lesson(&db, term.id, 1, LessonStatus::Scheduled, Some(at(15, 0, 0))).await;

    let clock = Arc::new(ManualClock::new(at(15, 0, 0)));
    let summary = publisher(&db, &clock).tick().await.unwrap();

    assert_eq!(summary.published, 1);
    assert_eq!(reload_lesson(&db, lesson.id).await.status, LessonStatus::Published);
}

#[tokio::test]
async fn test_second_tick_is_noop() {
    let db = setup_test_db().await;
    let program = insert_program(&db, ProgramStatus::Draft).await;
    let term = insert_term(&db, program.id).await;
    for n in 1..=3 {
        insert_lesson(&db, term.id, n, LessonStatus::Scheduled, Some(at(14, 0, 0))).await;
    }

    let clock = Arc::new(ManualClock::new(at(15, 0, 0)));
    let publisher = publisher(&db, &clock);

    let first = publisher.tick().await.unwrap();
    assert_eq!(first.published, 3);

    let lessons_after_first = Lesson::find().all(&db).await.unwrap();

    let second = publisher.tick().await.unwrap();
    assert_eq!(second.scanned, 0);
    assert_eq!(second.published, 0);
    assert_eq!(Lesson::find().all(&db).await.unwrap(), lessons_after_first);
}

#[tokio::test]
async fn test_program_cascade_happens_once() {
    let db = setup_test_db().await;
    let program = insert_program(&db, ProgramStatus::Draft).await;
    let term = insert_term(&db, program.id).await;
    insert_lesson(&db, term.id, 1, LessonStatus::Scheduled, Some(at(14, 0, 0))).await;
    insert_lesson(&db, term.id, 2, LessonStatus::Scheduled, Some(at(14, 30, 0))).await;

    let clock = Arc::new(ManualClock::new(at(15, 0, 0)));
    let publisher = publisher(&db, &clock);

    let summary = publisher.tick().await.unwrap();
    assert_eq!(summary.published, 2);
    assert_eq!(summary.programs_published, 1);

    let program_after = reload_program(&db, program.id).await;
    assert_eq!(program_after.status, ProgramStatus::Published);
    assert_eq!(program_after.published_at, Some(at(15, 0, 0)));

    // A later lesson going live does not rewrite the program timestamp
    insert_lesson(&db, term.id, 3, LessonStatus::Scheduled, Some(at(15, 30, 0))).await;
    clock.set(at(16, 0, 0));

    let summary = publisher.tick().await.unwrap();
    assert_eq!(summary.published, 1);
    assert_eq!(summary.programs_published, 0);
    assert_eq!(
        reload_program(&db, program.id).await.published_at,
        Some(at(15, 0, 0))
    );
}

#[tokio::test]
async fn test_archived_program_is_not_republished() {
    let db = setup_test_db().await;
    let program = insert_program(&db, ProgramStatus::Archived).await;
    let term = insert_term(&db, program.id).await;
    let lesson = insert_lesson(&db, term.id, 1, LessonStatus::Scheduled, Some(at(14, 0, 0))).await;

    let clock = Arc::new(ManualClock::new(at(15, 0, 0)));
    let summary = publisher(&db, &clock).tick().await.unwrap();

    assert_eq!(summary.published, 1);
    assert_eq!(summary.programs_published, 0);
    assert_eq!(reload_lesson(&db, lesson.id).await.status, LessonStatus::Published);

    let program_after = reload_program(&db, program.id).await;
    assert_eq!(program_after.status, ProgramStatus::Archived);
    assert_eq!(program_after.published_at, None);
}

#[tokio::test]
async fn test_archived_and_published_lessons_untouched() {
    let db = setup_test_db().await;
    let program = insert_program(&db, ProgramStatus::Draft).await;
    let term = insert_term(&db, program.id).await;

    // Both carry a stale publish_at from before they were moved by hand
    let archived = insert_lesson(&db, term.id, 1, LessonStatus::Archived, Some(at(14, 0, 0))).await;
    let published =
        insert_lesson(&db, term.id, 2, LessonStatus::Published, Some(at(14, 0, 0))).await;

    let clock = Arc::new(ManualClock::new(at(15, 0, 0)));
    let summary = publisher(&db, &clock).tick().await.unwrap();

    assert_eq!(summary.scanned, 0);
    assert_eq!(reload_lesson(&db, archived.id).await, archived);
    assert_eq!(reload_lesson(&db, published.id).await, published);
    assert_eq!(reload_program(&db, program.id).await.status, ProgramStatus::Draft);
}

#[tokio::test]
async fn test_broken_lesson_does_not_block_healthy_one() {
    let db = setup_test_db().await;
    let program = insert_program(&db, ProgramStatus::Draft).await;
    let term = insert_term(&db, program.id).await;
    let healthy = insert_lesson(&db, term.id, 1, LessonStatus::Scheduled, Some(at(14, 0, 0))).await;

    // No URL for the primary language
    let broken = insert_lesson(&db, term.id, 2, LessonStatus::Scheduled, Some(at(14, 0, 0))).await;
    let mut broken_update: lesson::ActiveModel = broken.clone().into();
    broken_update.content_urls_by_language = Set(UrlMap::default());
    broken_update.update(&db).await.unwrap();

    let clock = Arc::new(ManualClock::new(at(15, 0, 0)));
    let publisher = publisher(&db, &clock);

    let summary = publisher.tick().await.unwrap();
    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.published, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.programs_published, 1);

    assert_eq!(reload_lesson(&db, healthy.id).await.status, LessonStatus::Published);

    let broken_after = reload_lesson(&db, broken.id).await;
    assert_eq!(broken_after.status, LessonStatus::Scheduled);
    assert_eq!(broken_after.published_at, None);

    // Retried, and still failing, on the next tick
    let summary = publisher.tick().await.unwrap();
    assert_eq!(summary.scanned, 1);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_concurrent_ticks_publish_once() {
    let db = setup_test_db().await;
    let program = insert_program(&db, ProgramStatus::Draft).await;
    let term = insert_term(&db, program.id).await;
    let lesson = insert_lesson(&db, term.id, 1, LessonStatus::Scheduled, Some(at(14, 0, 0))).await;

    let clock = Arc::new(ManualClock::new(at(15, 0, 0)));
    let first = publisher(&db, &clock);
    let second = publisher(&db, &clock);

    let (a, b) = tokio::join!(first.tick(), second.tick());
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.published + b.published, 1);
    assert_eq!(a.programs_published + b.programs_published, 1);
    assert_eq!(a.failed + b.failed, 0);
    // Whoever saw the lesson without publishing it recorded a skip
    assert_eq!(a.scanned + b.scanned, a.published + b.published + a.skipped + b.skipped);

    let lesson_after = reload_lesson(&db, lesson.id).await;
    assert_eq!(lesson_after.status, LessonStatus::Published);
    assert_eq!(lesson_after.published_at, Some(at(15, 0, 0)));
}

/// Two instances on separate pools over one SQLite file really do overlap
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ticks_on_shared_file_store_skip_instead_of_failing() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("lessons.db").display());

    let first_db = lessonflow_db::connect(&url).await.unwrap();
    lessonflow_db::migrate(&first_db).await.unwrap();
    let second_db = lessonflow_db::connect(&url).await.unwrap();

    let program = insert_program(&first_db, ProgramStatus::Draft).await;
    let term = insert_term(&first_db, program.id).await;
    let mut lesson_ids = Vec::new();
    for number in 1..=40 {
        let lesson =
            insert_lesson(&first_db, term.id, number, LessonStatus::Scheduled, Some(at(14, 0, 0))).await;
        lesson_ids.push(lesson.id);
    }

    let clock = Arc::new(ManualClock::new(at(15, 0, 0)));
    let first = publisher(&first_db, &clock);
    let second = publisher(&second_db, &clock);

    let (a, b) = tokio::join!(first.tick(), second.tick());
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.failed + b.failed, 0, "contention must be recorded as skips: {:?} {:?}", a, b);
    assert_eq!(a.published + b.published, 40);
    assert_eq!(a.programs_published + b.programs_published, 1);
    assert_eq!(a.scanned + b.scanned, a.published + b.published + a.skipped + b.skipped);

    for id in lesson_ids {
        let lesson_after = reload_lesson(&first_db, id).await;
        assert_eq!(lesson_after.status, LessonStatus::Published);
        assert_eq!(lesson_after.published_at, Some(at(15, 0, 0)));
    }

    first_db.close().await.unwrap();
    second_db.close().await.unwrap();
}

#[tokio::test]
async fn test_lost_race_is_a_skip() {
    let db = setup_test_db().await;
    let program = insert_program(&db, ProgramStatus::Draft).await;
    let term = insert_term(&db, program.id).await;
    let lesson = insert_lesson(&db, term.id, 1, LessonStatus::Scheduled, Some(at(14, 0, 0))).await;

    let clock = Arc::new(ManualClock::new(at(15, 0, 0)));
    let first = publisher(&db, &clock);
    let second = publisher(&db, &clock);

    // Both instances selected the lesson before either processed it
    let winner = first.publish_one(lesson.id, at(15, 0, 0)).await;
    let loser = second.publish_one(lesson.id, at(15, 0, 0)).await;

    assert_eq!(
        winner,
        LessonOutcome::Published {
            program_published: true
        }
    );
    assert_eq!(loser, LessonOutcome::Skipped);
}

#[tokio::test]
async fn test_manual_publish_matches_scheduled_publish() {
    let db = setup_test_db().await;
    let now = at(15, 0, 0);

    let scheduled_program = insert_program(&db, ProgramStatus::Draft).await;
    let scheduled_term = insert_term(&db, scheduled_program.id).await;
    insert_lesson(&db, scheduled_term.id, 1, LessonStatus::Scheduled, Some(at(14, 0, 0))).await;

    let manual_program = insert_program(&db, ProgramStatus::Draft).await;
    let manual_term = insert_term(&db, manual_program.id).await;
    let manual_lesson = insert_lesson(&db, manual_term.id, 1, LessonStatus::Draft, None).await;

    let clock = Arc::new(ManualClock::new(now));
    publisher(&db, &clock).tick().await.unwrap();

    let txn = db.begin().await.unwrap();
    let manual = publish_now(&txn, manual_lesson.id, now).await.unwrap();
    txn.commit().await.unwrap();

    assert!(manual.program_published);
    assert_eq!(manual.lesson.status, LessonStatus::Published);
    assert_eq!(manual.lesson.published_at, Some(now));
    assert_eq!(manual.lesson.publish_at, None);

    let by_engine = reload_program(&db, scheduled_program.id).await;
    let by_hand = reload_program(&db, manual_program.id).await;
    assert_eq!(by_engine.status, by_hand.status);
    assert_eq!(by_engine.published_at, by_hand.published_at);
}

#[tokio::test]
async fn test_manual_publish_keeps_original_timestamp() {
    let db = setup_test_db().await;
    let program = insert_program(&db, ProgramStatus::Draft).await;
    let term = insert_term(&db, program.id).await;
    let lesson = insert_lesson(&db, term.id, 1, LessonStatus::Draft, None).await;

    let txn = db.begin().await.unwrap();
    publish_now(&txn, lesson.id, at(15, 0, 0)).await.unwrap();
    txn.commit().await.unwrap();

    let txn = db.begin().await.unwrap();
    let again = publish_now(&txn, lesson.id, at(16, 0, 0)).await.unwrap();
    txn.commit().await.unwrap();

    assert!(!again.program_published);
    assert_eq!(again.lesson.published_at, Some(at(15, 0, 0)));
}

#[tokio::test]
async fn test_manual_publish_rejects_invalid_lesson() {
    let db = setup_test_db().await;
    let program = insert_program(&db, ProgramStatus::Draft).await;
    let term = insert_term(&db, program.id).await;
    let lesson = insert_lesson(&db, term.id, 1, LessonStatus::Draft, None).await;

    let mut update: lesson::ActiveModel = lesson.clone().into();
    update.duration_ms = Set(None);
    update.update(&db).await.unwrap();

    let txn = db.begin().await.unwrap();
    let result = publish_now(&txn, lesson.id, at(15, 0, 0)).await;
    assert!(matches!(result, Err(PublishError::InvalidLesson { .. })));
    txn.rollback().await.unwrap();

    assert_eq!(reload_program(&db, program.id).await.status, ProgramStatus::Draft);
}

#[tokio::test]
async fn test_unreachable_store_aborts_tick() {
    let db = setup_test_db().await;
    let clock = Arc::new(ManualClock::new(at(15, 0, 0)));
    let publisher = publisher(&db, &clock);

    db.close().await.unwrap();

    assert!(publisher.tick().await.is_err());

    let health = publisher.health().snapshot().await;
    assert_eq!(health.total_ticks, 1);
    assert_eq!(health.consecutive_failures, 1);
    assert!(health.last_error.is_some());
}

#[tokio::test]
async fn test_worker_ticks_until_shutdown() {
    let db = setup_test_db().await;
    let program = insert_program(&db, ProgramStatus::Draft).await;
    let term = insert_term(&db, program.id).await;
    let lesson = insert_lesson(&db, term.id, 1, LessonStatus::Scheduled, Some(at(14, 0, 0))).await;

    let clock = Arc::new(ManualClock::new(at(15, 0, 0)));
    let publisher = Arc::new(publisher(&db, &clock));
    let health = publisher.health();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(run_worker(
        publisher,
        std::time::Duration::from_millis(20),
        shutdown_rx,
    ));

    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    let snapshot = health.snapshot().await;
    assert!(snapshot.total_ticks >= 1);
    assert_eq!(snapshot.consecutive_failures, 0);
    assert_eq!(reload_lesson(&db, lesson.id).await.status, LessonStatus::Published);
}

#[tokio::test]
async fn test_tick_summary_serializes_for_cli() {
    let db = setup_test_db().await;
    let clock = Arc::new(ManualClock::new(at(15, 0, 0)));

    let summary = publisher(&db, &clock).tick().await.unwrap();
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["scanned"], 0);
    assert_eq!(json["published"], 0);
    assert!(json.get("programs_published").is_some());
}
