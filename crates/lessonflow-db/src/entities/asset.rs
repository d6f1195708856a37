//! Poster and thumbnail images for programs and lessons

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which table `owner_id` points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    #[sea_orm(string_value = "program")]
    Program,

    #[sea_orm(string_value = "lesson")]
    Lesson,
}

/// Image shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum AssetVariant {
    #[sea_orm(string_value = "portrait")]
    Portrait,

    #[sea_orm(string_value = "landscape")]
    Landscape,

    #[sea_orm(string_value = "square")]
    Square,

    #[sea_orm(string_value = "banner")]
    Banner,
}

impl AssetVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetVariant::Portrait => "portrait",
            AssetVariant::Landscape => "landscape",
            AssetVariant::Square => "square",
            AssetVariant::Banner => "banner",
        }
    }
}

/// Programs carry posters, lessons carry thumbnails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    #[sea_orm(string_value = "poster")]
    Poster,

    #[sea_orm(string_value = "thumbnail")]
    Thumbnail,
}

impl OwnerType {
    pub fn asset_kind(&self) -> AssetKind {
        match self {
            OwnerType::Program => AssetKind::Poster,
            OwnerType::Lesson => AssetKind::Thumbnail,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub owner_type: OwnerType,

    /// Program or lesson id, depending on `owner_type`
    pub owner_id: Uuid,

    pub language: String,

    pub variant: AssetVariant,

    pub kind: AssetKind,

    pub url: String,

    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
