//! Integration tests for lessonflow-db
//!
//! Exercises the schema against a real SQLite in-memory database

use chrono::Utc;
use lessonflow_db::{
    connect,
    entities::{
        asset::{self, AssetKind, AssetVariant, OwnerType},
        lesson::{self, ContentType, LessonStatus},
        program::{self, ProgramStatus},
        program_topic, term, topic, LanguageList, UrlMap,
    },
    migrate,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, Set,
};
use std::collections::BTreeMap;
use uuid::Uuid;

async fn setup_test_db() -> DatabaseConnection {
    let db = connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    migrate(&db).await.expect("Failed to run migrations");

    db
}

async fn insert_program(db: &DatabaseConnection, title: &str) -> program::Model {
    let now = Utc::now();
    program::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        description: Set(Some("A program".to_string())),
        language_primary: Set("te".to_string()),
        languages_available: Set(LanguageList(vec!["te".to_string(), "en".to_string()])),
        status: Set(ProgramStatus::Draft),
        published_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("Failed to insert program")
}

async fn insert_term(db: &DatabaseConnection, program_id: Uuid, number: i32) -> term::Model {
    term::ActiveModel {
        id: Set(Uuid::new_v4()),
        program_id: Set(program_id),
        term_number: Set(number),
        title: Set(Some(format!("Term {}", number))),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("Failed to insert term")
}

fn lesson_model(term_id: Uuid, number: i32) -> lesson::ActiveModel {
    let now = Utc::now();
    let mut urls = BTreeMap::new();
    urls.insert(
        "te".to_string(),
        "https://cdn.example.com/lesson-te.mp4".to_string(),
    );

    lesson::ActiveModel {
        id: Set(Uuid::new_v4()),
        term_id: Set(term_id),
        lesson_number: Set(number),
        title: Set(format!("Lesson {}", number)),
        content_type: Set(ContentType::Video),
        duration_ms: Set(Some(600_000)),
        is_paid: Set(false),
        content_language_primary: Set("te".to_string()),
        content_languages_available: Set(LanguageList(vec!["te".to_string()])),
        content_urls_by_language: Set(UrlMap(urls)),
        subtitle_languages: Set(LanguageList::default()),
        subtitle_urls_by_language: Set(UrlMap::default()),
        status: Set(LessonStatus::Draft),
        publish_at: Set(None),
        published_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[tokio::test]
async fn test_database_connection() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let backend = db.get_database_backend();
    assert!(matches!(backend, sea_orm::DatabaseBackend::Sqlite));
}

#[tokio::test]
async fn test_migrations_run_successfully() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let result = migrate(&db).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_lesson_json_columns_round_trip() {
    let db = setup_test_db().await;
    let program = insert_program(&db, "Foundation Mathematics").await;
    let term = insert_term(&db, program.id, 1).await;

    let inserted = lesson_model(term.id, 1).insert(&db).await.unwrap();

    let found = lesson::Entity::find_by_id(inserted.id)
        .one(&db)
        .await
        .expect("Failed to query")
        .expect("Lesson not found");

    assert_eq!(found.content_languages_available.0, vec!["te".to_string()]);
    assert_eq!(
        found.content_urls_by_language.get("te").map(String::as_str),
        Some("https://cdn.example.com/lesson-te.mp4")
    );
    assert!(found.subtitle_languages.0.is_empty());
    assert_eq!(found.status, LessonStatus::Draft);
}

#[tokio::test]
async fn test_term_number_unique_within_program() {
    let db = setup_test_db().await;
    let program = insert_program(&db, "Science").await;
    let other = insert_program(&db, "Language").await;

    insert_term(&db, program.id, 1).await;

    let duplicate = term::ActiveModel {
        id: Set(Uuid::new_v4()),
        program_id: Set(program.id),
        term_number: Set(1),
        title: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(&db)
    .await;
    assert!(duplicate.is_err(), "Duplicate term number must be rejected");

    // Same number in a different program is fine
    insert_term(&db, other.id, 1).await;
}

#[tokio::test]
async fn test_lesson_number_unique_within_term() {
    let db = setup_test_db().await;
    let program = insert_program(&db, "Science").await;
    let term = insert_term(&db, program.id, 1).await;

    lesson_model(term.id, 1).insert(&db).await.unwrap();
    let duplicate = lesson_model(term.id, 1).insert(&db).await;

    assert!(duplicate.is_err(), "Duplicate lesson number must be rejected");
}

#[tokio::test]
async fn test_topic_name_unique() {
    let db = setup_test_db().await;

    let make = |name: &str| topic::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
    };

    make("Mathematics").insert(&db).await.unwrap();
    assert!(make("Mathematics").insert(&db).await.is_err());
}

#[tokio::test]
async fn test_deleting_program_cascades_to_terms_and_lessons() {
    let db = setup_test_db().await;
    let program = insert_program(&db, "Cascade").await;
    let term = insert_term(&db, program.id, 1).await;
    lesson_model(term.id, 1).insert(&db).await.unwrap();
    lesson_model(term.id, 2).insert(&db).await.unwrap();

    program.delete(&db).await.expect("Failed to delete program");

    assert_eq!(term::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(lesson::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_program_topics_many_to_many() {
    let db = setup_test_db().await;
    let program = insert_program(&db, "Tagged").await;

    let math = topic::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Mathematics".to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(&db)
    .await
    .unwrap();

    program_topic::ActiveModel {
        program_id: Set(program.id),
        topic_id: Set(math.id),
    }
    .insert(&db)
    .await
    .unwrap();

    let topics = program
        .find_related(topic::Entity)
        .all(&db)
        .await
        .expect("Failed to load topics");
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].name, "Mathematics");

    let programs = math.find_related(program::Entity).all(&db).await.unwrap();
    assert_eq!(programs.len(), 1);
    assert_eq!(programs[0].id, program.id);
}

#[tokio::test]
async fn test_asset_unique_per_owner_language_variant() {
    let db = setup_test_db().await;
    let program = insert_program(&db, "Posters").await;

    let make = |variant: AssetVariant, url: &str| asset::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_type: Set(OwnerType::Program),
        owner_id: Set(program.id),
        language: Set("te".to_string()),
        variant: Set(variant),
        kind: Set(AssetKind::Poster),
        url: Set(url.to_string()),
        created_at: Set(Utc::now()),
    };

    make(AssetVariant::Portrait, "https://img.example.com/p.jpg")
        .insert(&db)
        .await
        .unwrap();
    make(AssetVariant::Landscape, "https://img.example.com/l.jpg")
        .insert(&db)
        .await
        .unwrap();
    assert!(make(AssetVariant::Portrait, "https://img.example.com/p2.jpg")
        .insert(&db)
        .await
        .is_err());

    let count = asset::Entity::find()
        .filter(asset::Column::OwnerId.eq(program.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(count, 2);
}
