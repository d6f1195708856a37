//! Lesson entity: the unit of published content

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::json::{LanguageList, UrlMap};

/// Kind of content a lesson carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Requires `duration_ms`
    #[sea_orm(string_value = "video")]
    Video,

    #[sea_orm(string_value = "article")]
    Article,
}

/// Publishing workflow status of a lesson
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    #[sea_orm(string_value = "draft")]
    Draft,

    /// Waiting for `publish_at`; picked up by the publishing worker
    #[sea_orm(string_value = "scheduled")]
    Scheduled,

    #[sea_orm(string_value = "published")]
    Published,

    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lessons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub term_id: Uuid,

    /// Unique within the owning term
    pub lesson_number: i32,

    pub title: String,

    pub content_type: ContentType,

    /// Required for video content
    pub duration_ms: Option<i64>,

    pub is_paid: bool,

    pub content_language_primary: String,

    #[sea_orm(column_type = "Json")]
    pub content_languages_available: LanguageList,

    /// Must contain an entry for `content_language_primary`
    #[sea_orm(column_type = "Json")]
    pub content_urls_by_language: UrlMap,

    #[sea_orm(column_type = "Json")]
    pub subtitle_languages: LanguageList,

    #[sea_orm(column_type = "Json")]
    pub subtitle_urls_by_language: UrlMap,

    pub status: LessonStatus,

    /// Required while scheduled
    pub publish_at: Option<ChronoDateTimeUtc>,

    /// Required while published
    pub published_at: Option<ChronoDateTimeUtc>,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::term::Entity",
        from = "Column::TermId",
        to = "super::term::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Term,
}

impl Related<super::term::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Term.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
