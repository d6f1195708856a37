//! Demo accounts and content for local development
//!
//! Seeding is idempotent: users are matched by email, topics by name and
//! programs by title, and anything already present is left untouched.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use lessonflow_api::middleware::role_to_db;
use lessonflow_auth::{hash_password, Role};
use lessonflow_db::entities::{
    asset::{self, AssetVariant, OwnerType},
    lesson::{self, ContentType, LessonStatus},
    program::{self, ProgramStatus},
    program_topic, term, topic, user,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Rows created by one seeding run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub topics: usize,
    pub programs: usize,
    pub lessons: usize,
}

struct DemoUser {
    email: &'static str,
    password: &'static str,
    full_name: &'static str,
    role: Role,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum DemoState {
    Published,
    /// Scheduled this many minutes after seeding
    ScheduledIn(i64),
    Draft,
}

struct DemoLesson {
    title: &'static str,
    content_type: ContentType,
    duration_ms: Option<i64>,
    is_paid: bool,
    language: &'static str,
    languages: &'static [&'static str],
    urls: &'static [(&'static str, &'static str)],
    subtitle_languages: &'static [&'static str],
    subtitle_urls: &'static [(&'static str, &'static str)],
    state: DemoState,
    thumbnails: [&'static str; 2],
}

struct DemoProgram {
    title: &'static str,
    description: &'static str,
    language: &'static str,
    languages: &'static [&'static str],
    topic: &'static str,
    posters: [&'static str; 2],
    term_title: &'static str,
    lessons: &'static [DemoLesson],
}

const USERS: &[DemoUser] = &[
    DemoUser {
        email: "admin@example.com",
        password: "admin123",
        full_name: "Admin User",
        role: Role::Admin,
    },
    DemoUser {
        email: "editor@example.com",
        password: "editor123",
        full_name: "Editor User",
        role: Role::Editor,
    },
    DemoUser {
        email: "viewer@example.com",
        password: "viewer123",
        full_name: "Viewer User",
        role: Role::Viewer,
    },
];

const TOPICS: &[&str] = &["Mathematics", "Science", "Language"];

const PROGRAMS: &[DemoProgram] = &[
    DemoProgram {
        title: "Foundation Mathematics",
        description: "Complete mathematics program for beginners",
        language: "te",
        languages: &["te", "en"],
        topic: "Mathematics",
        posters: [
            "https://picsum.photos/400/600?random=1",
            "https://picsum.photos/600/400?random=2",
        ],
        term_title: "Basic Algebra",
        lessons: &[
            DemoLesson {
                title: "Introduction to Numbers",
                content_type: ContentType::Video,
                duration_ms: Some(300_000),
                is_paid: false,
                language: "te",
                languages: &["te", "en"],
                urls: &[
                    ("te", "https://example.com/video1.mp4"),
                    ("en", "https://example.com/video1-en.mp4"),
                ],
                subtitle_languages: &["te", "en"],
                subtitle_urls: &[("te", "https://example.com/sub1.vtt")],
                state: DemoState::Published,
                thumbnails: [
                    "https://picsum.photos/400/600?random=5",
                    "https://picsum.photos/600/400?random=6",
                ],
            },
            DemoLesson {
                title: "Understanding Addition",
                content_type: ContentType::Video,
                duration_ms: Some(360_000),
                is_paid: false,
                language: "te",
                languages: &["te"],
                urls: &[("te", "https://example.com/video2.mp4")],
                subtitle_languages: &[],
                subtitle_urls: &[],
                state: DemoState::ScheduledIn(2),
                thumbnails: [
                    "https://picsum.photos/400/600?random=9",
                    "https://picsum.photos/600/400?random=10",
                ],
            },
            DemoLesson {
                title: "Subtraction Basics",
                content_type: ContentType::Article,
                duration_ms: None,
                is_paid: false,
                language: "en",
                languages: &["en"],
                urls: &[("en", "https://example.com/article3.html")],
                subtitle_languages: &[],
                subtitle_urls: &[],
                state: DemoState::Draft,
                thumbnails: [
                    "https://picsum.photos/400/600?random=11",
                    "https://picsum.photos/600/400?random=12",
                ],
            },
        ],
    },
    DemoProgram {
        title: "Science Fundamentals",
        description: "Explore the world of science",
        language: "hi",
        languages: &["hi"],
        topic: "Science",
        posters: [
            "https://picsum.photos/400/600?random=13",
            "https://picsum.photos/600/400?random=14",
        ],
        term_title: "Physics Basics",
        lessons: &[
            DemoLesson {
                title: "गति के नियम (Laws of Motion)",
                content_type: ContentType::Video,
                duration_ms: Some(420_000),
                is_paid: true,
                language: "hi",
                languages: &["hi"],
                urls: &[("hi", "https://example.com/video4.mp4")],
                subtitle_languages: &["hi"],
                subtitle_urls: &[("hi", "https://example.com/sub4.vtt")],
                state: DemoState::Published,
                thumbnails: [
                    "https://picsum.photos/400/600?random=15",
                    "https://picsum.photos/600/400?random=16",
                ],
            },
            DemoLesson {
                title: "ऊर्जा संरक्षण (Energy Conservation)",
                content_type: ContentType::Video,
                duration_ms: Some(390_000),
                is_paid: true,
                language: "hi",
                languages: &["hi"],
                urls: &[("hi", "https://example.com/video5.mp4")],
                subtitle_languages: &[],
                subtitle_urls: &[],
                state: DemoState::Published,
                thumbnails: [
                    "https://picsum.photos/400/600?random=17",
                    "https://picsum.photos/600/400?random=18",
                ],
            },
            DemoLesson {
                title: "बल और दबाव (Force and Pressure)",
                content_type: ContentType::Video,
                duration_ms: Some(360_000),
                is_paid: false,
                language: "hi",
                languages: &["hi"],
                urls: &[("hi", "https://example.com/video6.mp4")],
                subtitle_languages: &[],
                subtitle_urls: &[],
                state: DemoState::Draft,
                thumbnails: [
                    "https://picsum.photos/400/600?random=19",
                    "https://picsum.photos/600/400?random=20",
                ],
            },
        ],
    },
];

/// Login hints printed after seeding
pub fn demo_credentials() -> impl Iterator<Item = (&'static str, &'static str, Role)> {
    USERS.iter().map(|u| (u.email, u.password, u.role))
}

fn languages(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

fn urls(pairs: &[(&str, &str)]) -> std::collections::BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(lang, url)| (lang.to_string(), url.to_string()))
        .collect()
}

/// Insert the demo users, topics, programs, terms, lessons and images
///
/// Runs in one transaction. Programs holding a published lesson are stored
/// as published, matching what the program cascade would leave behind.
pub async fn seed_demo_content(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    let txn = db.begin().await.context("Failed to start seeding transaction")?;

    for demo in USERS {
        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(demo.email))
            .one(&txn)
            .await?;
        if existing.is_some() {
            debug!(email = demo.email, "Seed user already present");
            continue;
        }

        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(demo.email.to_string()),
            password_hash: Set(hash_password(demo.password)?),
            full_name: Set(Some(demo.full_name.to_string())),
            role: Set(role_to_db(demo.role)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .with_context(|| format!("Failed to insert user {}", demo.email))?;
        summary.users += 1;
    }

    let mut topic_ids = Vec::with_capacity(TOPICS.len());
    for name in TOPICS {
        let found = topic::Entity::find()
            .filter(topic::Column::Name.eq(*name))
            .one(&txn)
            .await?;
        let id = match found {
            Some(t) => t.id,
            None => {
                let created = topic::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(name.to_string()),
                    created_at: Set(now),
                }
                .insert(&txn)
                .await?;
                summary.topics += 1;
                created.id
            }
        };
        topic_ids.push((*name, id));
    }

    for demo in PROGRAMS {
        let existing = program::Entity::find()
            .filter(program::Column::Title.eq(demo.title))
            .one(&txn)
            .await?;
        if existing.is_some() {
            debug!(title = demo.title, "Seed program already present");
            continue;
        }

        let topic_id = topic_ids
            .iter()
            .find(|(name, _)| *name == demo.topic)
            .map(|(_, id)| *id)
            .with_context(|| format!("Unknown seed topic {}", demo.topic))?;

        summary.lessons += insert_program(&txn, demo, topic_id, now).await?;
        summary.programs += 1;
    }

    txn.commit().await.context("Failed to commit seed data")?;

    info!(
        users = summary.users,
        topics = summary.topics,
        programs = summary.programs,
        lessons = summary.lessons,
        "Demo content seeded"
    );
    Ok(summary)
}

/// Program with its topic link, posters, single term and lessons; returns the lesson count
async fn insert_program<C: ConnectionTrait>(
    conn: &C,
    demo: &DemoProgram,
    topic_id: Uuid,
    now: DateTime<Utc>,
) -> Result<usize> {
    let published = demo
        .lessons
        .iter()
        .any(|l| l.state == DemoState::Published);

    let created = program::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(demo.title.to_string()),
        description: Set(Some(demo.description.to_string())),
        language_primary: Set(demo.language.to_string()),
        languages_available: Set(languages(demo.languages).into()),
        status: Set(if published {
            ProgramStatus::Published
        } else {
            ProgramStatus::Draft
        }),
        published_at: Set(published.then_some(now)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .with_context(|| format!("Failed to insert program {}", demo.title))?;

    program_topic::ActiveModel {
        program_id: Set(created.id),
        topic_id: Set(topic_id),
    }
    .insert(conn)
    .await?;

    insert_images(conn, OwnerType::Program, created.id, demo.language, demo.posters, now).await?;

    let owner_term = term::ActiveModel {
        id: Set(Uuid::new_v4()),
        program_id: Set(created.id),
        term_number: Set(1),
        title: Set(Some(demo.term_title.to_string())),
        created_at: Set(now),
    }
    .insert(conn)
    .await?;

    for (number, demo_lesson) in (1..).zip(demo.lessons) {
        let (status, publish_at, published_at) = match demo_lesson.state {
            DemoState::Published => (LessonStatus::Published, None, Some(now)),
            DemoState::ScheduledIn(minutes) => (
                LessonStatus::Scheduled,
                Some(now + Duration::minutes(minutes)),
                None,
            ),
            DemoState::Draft => (LessonStatus::Draft, None, None),
        };

        let created_lesson = lesson::ActiveModel {
            id: Set(Uuid::new_v4()),
            term_id: Set(owner_term.id),
            lesson_number: Set(number),
            title: Set(demo_lesson.title.to_string()),
            content_type: Set(demo_lesson.content_type),
            duration_ms: Set(demo_lesson.duration_ms),
            is_paid: Set(demo_lesson.is_paid),
            content_language_primary: Set(demo_lesson.language.to_string()),
            content_languages_available: Set(languages(demo_lesson.languages).into()),
            content_urls_by_language: Set(urls(demo_lesson.urls).into()),
            subtitle_languages: Set(languages(demo_lesson.subtitle_languages).into()),
            subtitle_urls_by_language: Set(urls(demo_lesson.subtitle_urls).into()),
            status: Set(status),
            publish_at: Set(publish_at),
            published_at: Set(published_at),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await
        .with_context(|| format!("Failed to insert lesson {}", demo_lesson.title))?;

        insert_images(
            conn,
            OwnerType::Lesson,
            created_lesson.id,
            demo_lesson.language,
            demo_lesson.thumbnails,
            now,
        )
        .await?;
    }

    Ok(demo.lessons.len())
}

/// Portrait and landscape image for one owner
async fn insert_images<C: ConnectionTrait>(
    conn: &C,
    owner_type: OwnerType,
    owner_id: Uuid,
    language: &str,
    [portrait, landscape]: [&str; 2],
    now: DateTime<Utc>,
) -> Result<()> {
    for (variant, url) in [
        (AssetVariant::Portrait, portrait),
        (AssetVariant::Landscape, landscape),
    ] {
        asset::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_type: Set(owner_type),
            owner_id: Set(owner_id),
            language: Set(language.to_string()),
            variant: Set(variant),
            kind: Set(owner_type.asset_kind()),
            url: Set(url.to_string()),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}
