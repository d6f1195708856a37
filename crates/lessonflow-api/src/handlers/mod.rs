//! Route handlers, one module per resource

pub mod auth;
pub mod catalog;
pub mod lessons;
pub mod programs;
pub mod system;
pub mod terms;
pub mod topics;
pub mod users;

use chrono::{DateTime, Utc};
use lessonflow_db::entities::{
    asset::{self, OwnerType},
    lesson, program, topic,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::models::{self, AssetRequest};

pub(crate) async fn owner_assets<C: ConnectionTrait>(
    conn: &C,
    owner_type: OwnerType,
    owner_id: Uuid,
) -> Result<Vec<asset::Model>, DbErr> {
    asset::Entity::find()
        .filter(asset::Column::OwnerType.eq(owner_type))
        .filter(asset::Column::OwnerId.eq(owner_id))
        .order_by_asc(asset::Column::Language)
        .all(conn)
        .await
}

/// Program with its topics and posters
pub(crate) async fn program_view<C: ConnectionTrait>(
    conn: &C,
    program: program::Model,
) -> Result<models::Program, DbErr> {
    let topics = program
        .find_related(topic::Entity)
        .order_by_asc(topic::Column::Name)
        .all(conn)
        .await?;
    let assets = owner_assets(conn, OwnerType::Program, program.id).await?;

    Ok(models::Program::from_parts(program, topics, &assets))
}

/// Lesson with its thumbnails
pub(crate) async fn lesson_view<C: ConnectionTrait>(
    conn: &C,
    lesson: lesson::Model,
) -> Result<models::Lesson, DbErr> {
    let assets = owner_assets(conn, OwnerType::Lesson, lesson.id).await?;
    Ok(models::Lesson::from_parts(lesson, &assets))
}

/// Insert an asset or replace the URL of the one with the same language and
/// variant
pub(crate) async fn upsert_asset<C: ConnectionTrait>(
    conn: &C,
    owner_type: OwnerType,
    owner_id: Uuid,
    request: AssetRequest,
    now: DateTime<Utc>,
) -> Result<asset::Model, DbErr> {
    let existing = asset::Entity::find()
        .filter(asset::Column::OwnerType.eq(owner_type))
        .filter(asset::Column::OwnerId.eq(owner_id))
        .filter(asset::Column::Language.eq(request.language.as_str()))
        .filter(asset::Column::Variant.eq(request.variant))
        .one(conn)
        .await?;

    match existing {
        Some(existing) => {
            let mut active: asset::ActiveModel = existing.into();
            active.url = Set(request.url);
            active.update(conn).await
        }
        None => {
            asset::ActiveModel {
                id: Set(Uuid::new_v4()),
                owner_type: Set(owner_type),
                owner_id: Set(owner_id),
                language: Set(request.language),
                variant: Set(request.variant),
                kind: Set(owner_type.asset_kind()),
                url: Set(request.url),
                created_at: Set(now),
            }
            .insert(conn)
            .await
        }
    }
}

/// Remove the assets of the given owners; assets have no foreign key
pub(crate) async fn delete_owner_assets<C: ConnectionTrait>(
    conn: &C,
    owner_type: OwnerType,
    owner_ids: Vec<Uuid>,
) -> Result<(), DbErr> {
    if owner_ids.is_empty() {
        return Ok(());
    }

    asset::Entity::delete_many()
        .filter(asset::Column::OwnerType.eq(owner_type))
        .filter(asset::Column::OwnerId.is_in(owner_ids))
        .exec(conn)
        .await?;

    Ok(())
}
