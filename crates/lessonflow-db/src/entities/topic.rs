//! Topic tags attached to programs

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "topics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub name: String,

    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::program_topic::Entity")]
    ProgramTopics,
}

impl Related<super::program_topic::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProgramTopics.def()
    }
}

impl Related<super::program::Entity> for Entity {
    fn to() -> RelationDef {
        super::program_topic::Relation::Program.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::program_topic::Relation::Topic.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
