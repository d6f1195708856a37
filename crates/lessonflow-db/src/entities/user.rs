//! Staff accounts for the administrative API

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a staff account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full access, including deletes and user management
    #[sea_orm(string_value = "admin")]
    Admin,

    /// Can create and edit content
    #[sea_orm(string_value = "editor")]
    Editor,

    /// Read-only access
    #[sea_orm(string_value = "viewer")]
    Viewer,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub full_name: Option<String>,

    pub role: UserRole,

    /// Inactive users cannot log in
    pub is_active: bool,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
