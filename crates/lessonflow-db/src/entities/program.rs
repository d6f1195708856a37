//! Program entity: the top of the content tree

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::json::LanguageList;

/// Publication status of a program
///
/// A program only moves from `Draft` to `Published` when one of its lessons
/// is published. Nothing archives a program automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
pub enum ProgramStatus {
    #[sea_orm(string_value = "draft")]
    Draft,

    #[sea_orm(string_value = "published")]
    Published,

    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "programs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub language_primary: String,

    /// Always contains `language_primary`
    #[sea_orm(column_type = "Json")]
    pub languages_available: LanguageList,

    pub status: ProgramStatus,

    /// Set exactly when the program becomes published, never rewritten
    pub published_at: Option<ChronoDateTimeUtc>,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::term::Entity")]
    Terms,

    #[sea_orm(has_many = "super::program_topic::Entity")]
    ProgramTopics,
}

impl Related<super::term::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Terms.def()
    }
}

impl Related<super::program_topic::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProgramTopics.def()
    }
}

impl Related<super::topic::Entity> for Entity {
    fn to() -> RelationDef {
        super::program_topic::Relation::Topic.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::program_topic::Relation::Program.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
