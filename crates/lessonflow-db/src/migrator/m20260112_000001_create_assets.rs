//! Poster/thumbnail assets keyed by (owner, language, variant)

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Asset::Table)
                    .if_not_exists()
                    .col(uuid(Asset::Id).primary_key())
                    .col(string_len(Asset::OwnerType, 16))
                    .col(uuid(Asset::OwnerId))
                    .col(string_len(Asset::Language, 16))
                    .col(string_len(Asset::Variant, 16))
                    .col(string_len(Asset::Kind, 16))
                    .col(string_len(Asset::Url, 2048))
                    .col(
                        timestamp_with_time_zone(Asset::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_assets_owner_language_variant")
                    .table(Asset::Table)
                    .col(Asset::OwnerType)
                    .col(Asset::OwnerId)
                    .col(Asset::Language)
                    .col(Asset::Variant)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Asset::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Asset {
    #[sea_orm(iden = "assets")]
    Table,
    Id,
    OwnerType,
    OwnerId,
    Language,
    Variant,
    Kind,
    Url,
    CreatedAt,
}
