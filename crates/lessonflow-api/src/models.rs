use chrono::{DateTime, Utc};
use lessonflow_db::entities::{
    asset::{self, AssetVariant},
    lesson::{self, ContentType, LessonStatus},
    program::{self, ProgramStatus},
    term, topic,
    user::{self, UserRole},
};
use lessonflow_publisher::{TickSummary, WorkerHealthSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

/// Assets of one owner as `{language: {variant: url}}`
pub type AssetMap = BTreeMap<String, BTreeMap<String, String>>;

pub fn asset_map(assets: &[asset::Model]) -> AssetMap {
    let mut map = AssetMap::new();
    for a in assets {
        map.entry(a.language.clone())
            .or_default()
            .insert(a.variant.as_str().to_string(), a.url.clone());
    }
    map
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Self-registration request (creates a viewer)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Must be unique
    pub email: String,
    /// Minimum 8 characters
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Bearer token issued at login or registration
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `bearer`
    pub token_type: String,
    #[schema(value_type = String, example = "editor")]
    pub role: UserRole,
    pub expires_at: DateTime<Utc>,
}

/// User account (password hash never exposed)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    #[schema(value_type = String, example = "viewer")]
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for User {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserList {
    pub users: Vec<User>,
    pub total: usize,
}

/// Admin-created user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[schema(value_type = String, example = "editor")]
    pub role: UserRole,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<topic::Model> for Topic {
    fn from(t: topic::Model) -> Self {
        Self {
            id: t.id,
            name: t.name,
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TopicList {
    pub topics: Vec<Topic>,
    pub total: usize,
}

/// Create or rename a topic
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TopicRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Program {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub language_primary: String,
    pub languages_available: Vec<String>,
    #[schema(value_type = String, example = "draft")]
    pub status: ProgramStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub topics: Vec<Topic>,
    /// Posters as `{language: {variant: url}}`
    #[schema(value_type = Object)]
    pub assets: AssetMap,
}

impl Program {
    pub fn from_parts(p: program::Model, topics: Vec<topic::Model>, assets: &[asset::Model]) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            language_primary: p.language_primary,
            languages_available: p.languages_available.0,
            status: p.status,
            published_at: p.published_at,
            created_at: p.created_at,
            updated_at: p.updated_at,
            topics: topics.into_iter().map(Topic::from).collect(),
            assets: asset_map(assets),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProgramList {
    pub programs: Vec<Program>,
    pub total: usize,
}

/// Admin program listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgramQuery {
    pub status: Option<ProgramStatus>,
    pub language: Option<String>,
}

/// New program; always created as draft
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateProgramRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub language_primary: String,
    /// Defaults to `[language_primary]`
    #[serde(default)]
    pub languages_available: Option<Vec<String>>,
    #[serde(default)]
    pub topic_ids: Vec<Uuid>,
}

/// Partial program update
///
/// `status` accepts `draft` or `archived`; programs are only published when
/// one of their lessons is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProgramRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language_primary: Option<String>,
    #[serde(default)]
    pub languages_available: Option<Vec<String>>,
    #[serde(default)]
    pub topic_ids: Option<Vec<Uuid>>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub status: Option<ProgramStatus>,
}

/// Poster (program) or thumbnail (lesson); replaces any existing asset with
/// the same language and variant
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssetRequest {
    pub language: String,
    #[schema(value_type = String, example = "portrait")]
    pub variant: AssetVariant,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Term {
    pub id: Uuid,
    pub program_id: Uuid,
    pub term_number: i32,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<term::Model> for Term {
    fn from(t: term::Model) -> Self {
        Self {
            id: t.id,
            program_id: t.program_id,
            term_number: t.term_number,
            title: t.title,
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TermList {
    pub terms: Vec<Term>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateTermRequest {
    /// Starts at 1, unique within the program
    pub term_number: i32,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateTermRequest {
    #[serde(default)]
    pub term_number: Option<i32>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Lesson {
    pub id: Uuid,
    pub term_id: Uuid,
    pub lesson_number: i32,
    pub title: String,
    #[schema(value_type = String, example = "video")]
    pub content_type: ContentType,
    pub duration_ms: Option<i64>,
    pub is_paid: bool,
    pub content_language_primary: String,
    pub content_languages_available: Vec<String>,
    pub content_urls_by_language: BTreeMap<String, String>,
    pub subtitle_languages: Vec<String>,
    pub subtitle_urls_by_language: BTreeMap<String, String>,
    #[schema(value_type = String, example = "scheduled")]
    pub status: LessonStatus,
    pub publish_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Thumbnails as `{language: {variant: url}}`
    #[schema(value_type = Object)]
    pub assets: AssetMap,
}

impl Lesson {
    pub fn from_parts(l: lesson::Model, assets: &[asset::Model]) -> Self {
        Self {
            id: l.id,
            term_id: l.term_id,
            lesson_number: l.lesson_number,
            title: l.title,
            content_type: l.content_type,
            duration_ms: l.duration_ms,
            is_paid: l.is_paid,
            content_language_primary: l.content_language_primary,
            content_languages_available: l.content_languages_available.0,
            content_urls_by_language: l.content_urls_by_language.0,
            subtitle_languages: l.subtitle_languages.0,
            subtitle_urls_by_language: l.subtitle_urls_by_language.0,
            status: l.status,
            publish_at: l.publish_at,
            published_at: l.published_at,
            created_at: l.created_at,
            updated_at: l.updated_at,
            assets: asset_map(assets),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LessonList {
    pub lessons: Vec<Lesson>,
    pub total: usize,
}

/// New lesson; always created as draft
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateLessonRequest {
    pub lesson_number: i32,
    pub title: String,
    #[schema(value_type = String, example = "video")]
    pub content_type: ContentType,
    /// Required for video lessons
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub is_paid: bool,
    pub content_language_primary: String,
    /// Defaults to `[content_language_primary]`
    #[serde(default)]
    pub content_languages_available: Option<Vec<String>>,
    /// Must contain `content_language_primary`
    pub content_urls_by_language: BTreeMap<String, String>,
    #[serde(default)]
    pub subtitle_languages: Vec<String>,
    #[serde(default)]
    pub subtitle_urls_by_language: BTreeMap<String, String>,
}

/// Partial lesson update; status changes go through the publish action
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateLessonRequest {
    #[serde(default)]
    pub lesson_number: Option<i32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub is_paid: Option<bool>,
    #[serde(default)]
    pub content_language_primary: Option<String>,
    #[serde(default)]
    pub content_languages_available: Option<Vec<String>>,
    #[serde(default)]
    pub content_urls_by_language: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub subtitle_languages: Option<Vec<String>>,
    #[serde(default)]
    pub subtitle_urls_by_language: Option<BTreeMap<String, String>>,
}

/// Workflow action on a lesson
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PublishAction {
    /// Publish immediately and cascade to the program
    PublishNow,
    /// Publish at `publish_at` (must not be in the past)
    Schedule,
    /// Hide the lesson; the program is not touched
    Archive,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublishRequest {
    pub action: PublishAction,
    #[serde(default)]
    pub publish_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublishResponse {
    pub lesson: Lesson,
    /// The owning program went from draft to published
    pub program_published: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub language: Option<String>,
    pub topic: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogProgramList {
    pub data: Vec<Program>,
    /// Opaque; pass back as `cursor` for the next page
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Published program with its published lessons
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogProgram {
    #[serde(flatten)]
    pub program: Program,
    pub terms: Vec<CatalogTerm>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogTerm {
    pub id: Uuid,
    pub term_number: i32,
    pub title: Option<String>,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecentActivity {
    pub id: Uuid,
    pub title: String,
    #[schema(value_type = String)]
    pub status: LessonStatus,
    pub updated_at: DateTime<Utc>,
    pub publish_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
}

impl From<lesson::Model> for RecentActivity {
    fn from(l: lesson::Model) -> Self {
        Self {
            id: l.id,
            title: l.title,
            status: l.status,
            updated_at: l.updated_at,
            publish_at: l.publish_at,
            published_at: l.published_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub total_programs: u64,
    pub total_lessons: u64,
    pub total_users: u64,
    pub published_programs: u64,
    pub published_lessons: u64,
    pub scheduled_lessons: u64,
    /// Five most recently updated published or scheduled lessons
    pub recent_activity: Vec<RecentActivity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TickSummaryResponse {
    pub started_at: DateTime<Utc>,
    pub scanned: usize,
    pub published: usize,
    pub skipped: usize,
    pub failed: usize,
    pub programs_published: usize,
    pub duration_ms: u64,
}

impl From<TickSummary> for TickSummaryResponse {
    fn from(s: TickSummary) -> Self {
        Self {
            started_at: s.started_at,
            scanned: s.scanned,
            published: s.published,
            skipped: s.skipped,
            failed: s.failed,
            programs_published: s.programs_published,
            duration_ms: s.duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkerHealthResponse {
    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_summary: Option<TickSummaryResponse>,
    pub total_ticks: u64,
    pub failed_ticks: u64,
    pub consecutive_failures: u64,
    pub last_error: Option<String>,
}

impl From<WorkerHealthSnapshot> for WorkerHealthResponse {
    fn from(h: WorkerHealthSnapshot) -> Self {
        Self {
            last_tick_at: h.last_tick_at,
            last_summary: h.last_summary.map(Into::into),
            total_ticks: h.total_ticks,
            failed_ticks: h.failed_ticks,
            consecutive_failures: h.consecutive_failures,
            last_error: h.last_error,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,
    pub version: String,
    /// `connected` or `disconnected`
    pub database: String,
    /// Publishing worker, when it runs in this process
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerHealthResponse>,
}
