//! Users, topics and the program -> term -> lesson tree

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // 1. users
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::Email, 255).unique_key())
                    .col(string_len(User::PasswordHash, 255))
                    .col(string_len_null(User::FullName, 255))
                    .col(string_len(User::Role, 32).default("viewer"))
                    .col(boolean(User::IsActive).default(true))
                    .col(
                        timestamp_with_time_zone(User::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(User::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 2. topics
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Topic::Table)
                    .if_not_exists()
                    .col(uuid(Topic::Id).primary_key())
                    .col(string_len(Topic::Name, 255).unique_key())
                    .col(
                        timestamp_with_time_zone(Topic::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 3. programs
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Program::Table)
                    .if_not_exists()
                    .col(uuid(Program::Id).primary_key())
                    .col(string_len(Program::Title, 255))
                    .col(text_null(Program::Description))
                    .col(string_len(Program::LanguagePrimary, 16))
                    .col(json(Program::LanguagesAvailable))
                    .col(string_len(Program::Status, 32).default("draft"))
                    .col(timestamp_with_time_zone_null(Program::PublishedAt))
                    .col(
                        timestamp_with_time_zone(Program::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Program::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Catalog listing: published programs by language, newest first
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_programs_status_language_published")
                    .table(Program::Table)
                    .col(Program::Status)
                    .col(Program::LanguagePrimary)
                    .col(Program::PublishedAt)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 4. program_topics junction table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(ProgramTopic::Table)
                    .if_not_exists()
                    .col(uuid(ProgramTopic::ProgramId))
                    .col(uuid(ProgramTopic::TopicId))
                    .primary_key(
                        Index::create()
                            .col(ProgramTopic::ProgramId)
                            .col(ProgramTopic::TopicId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_program_topics_program_id")
                            .from(ProgramTopic::Table, ProgramTopic::ProgramId)
                            .to(Program::Table, Program::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_program_topics_topic_id")
                            .from(ProgramTopic::Table, ProgramTopic::TopicId)
                            .to(Topic::Table, Topic::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_program_topics_topic_id")
                    .table(ProgramTopic::Table)
                    .col(ProgramTopic::TopicId)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 5. terms
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Term::Table)
                    .if_not_exists()
                    .col(uuid(Term::Id).primary_key())
                    .col(uuid(Term::ProgramId))
                    .col(integer(Term::TermNumber))
                    .col(string_len_null(Term::Title, 255))
                    .col(
                        timestamp_with_time_zone(Term::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_terms_program_id")
                            .from(Term::Table, Term::ProgramId)
                            .to(Program::Table, Program::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_terms_program_term_number")
                    .table(Term::Table)
                    .col(Term::ProgramId)
                    .col(Term::TermNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 6. lessons
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Lesson::Table)
                    .if_not_exists()
                    .col(uuid(Lesson::Id).primary_key())
                    .col(uuid(Lesson::TermId))
                    .col(integer(Lesson::LessonNumber))
                    .col(string_len(Lesson::Title, 255))
                    .col(string_len(Lesson::ContentType, 16))
                    .col(big_integer_null(Lesson::DurationMs))
                    .col(boolean(Lesson::IsPaid).default(false))
                    .col(string_len(Lesson::ContentLanguagePrimary, 16))
                    .col(json(Lesson::ContentLanguagesAvailable))
                    .col(json(Lesson::ContentUrlsByLanguage))
                    .col(json(Lesson::SubtitleLanguages))
                    .col(json(Lesson::SubtitleUrlsByLanguage))
                    .col(string_len(Lesson::Status, 32).default("draft"))
                    .col(timestamp_with_time_zone_null(Lesson::PublishAt))
                    .col(timestamp_with_time_zone_null(Lesson::PublishedAt))
                    .col(
                        timestamp_with_time_zone(Lesson::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Lesson::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lessons_term_id")
                            .from(Lesson::Table, Lesson::TermId)
                            .to(Term::Table, Term::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_lessons_term_lesson_number")
                    .table(Lesson::Table)
                    .col(Lesson::TermId)
                    .col(Lesson::LessonNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Publishing worker scan: status = 'scheduled' AND publish_at <= now
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lessons_status_publish_at")
                    .table(Lesson::Table)
                    .col(Lesson::Status)
                    .col(Lesson::PublishAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Lesson::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Term::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProgramTopic::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Program::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Topic::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        Ok(())
    }
}

// ============================================================
// Table identifiers
// ============================================================

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Email,
    PasswordHash,
    FullName,
    Role,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Topic {
    #[sea_orm(iden = "topics")]
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Program {
    #[sea_orm(iden = "programs")]
    Table,
    Id,
    Title,
    Description,
    LanguagePrimary,
    LanguagesAvailable,
    Status,
    PublishedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ProgramTopic {
    #[sea_orm(iden = "program_topics")]
    Table,
    ProgramId,
    TopicId,
}

#[derive(DeriveIden)]
enum Term {
    #[sea_orm(iden = "terms")]
    Table,
    Id,
    ProgramId,
    TermNumber,
    Title,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Lesson {
    #[sea_orm(iden = "lessons")]
    Table,
    Id,
    TermId,
    LessonNumber,
    Title,
    ContentType,
    DurationMs,
    IsPaid,
    ContentLanguagePrimary,
    ContentLanguagesAvailable,
    ContentUrlsByLanguage,
    SubtitleLanguages,
    SubtitleUrlsByLanguage,
    Status,
    PublishAt,
    PublishedAt,
    CreatedAt,
    UpdatedAt,
}
