use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create chat_sessions table (aggregate root)
        manager
            .create_table(
                Table::create()
                    .table(ChatSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatSessions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ChatSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(ChatSessions::LoggedInAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(ChatSessions::App).string().not_null())
                    .col(ColumnDef::new(ChatSessions::ChatUserId).string())
                    .col(
                        ColumnDef::new(ChatSessions::Context)
                            .json()
                            .not_null()
                            .default("{}"),
                    )
                    .to_owned(),
            )
            .await?;

        // chat_user_id is globally unique when present (multiple NULLs allowed)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_chat_sessions_chat_user_id")
                    .table(ChatSessions::Table)
                    .col(ChatSessions::ChatUserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create assets table
        manager
            .create_table(
                Table::create()
                    .table(Assets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Assets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Assets::Filename).string().not_null())
                    .col(ColumnDef::new(Assets::ChatSessionId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assets_chat_session")
                            .from(Assets::Table, Assets::ChatSessionId)
                            .to(ChatSessions::Table, ChatSessions::Id)
                            .on_delete(ForeignKeyAction::NoAction)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_assets_chat_session")
                    .table(Assets::Table)
                    .col(Assets::ChatSessionId)
                    .to_owned(),
            )
            .await?;

        // Create chat_messages table
        // Intentionally no foreign key to chat_sessions: messages may arrive
        // before a session is materialized. Correlation is by (app, external_chat_id).
        manager
            .create_table(
                Table::create()
                    .table(ChatMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatMessages::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ChatMessages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(ChatMessages::Text).text())
                    .col(ColumnDef::new(ChatMessages::ExternalId).string().not_null())
                    .col(ColumnDef::new(ChatMessages::ExternalUserId).string())
                    .col(ColumnDef::new(ChatMessages::ExternalChatId).string())
                    .col(ColumnDef::new(ChatMessages::App).string().not_null())
                    .col(ColumnDef::new(ChatMessages::Image).string())
                    .col(ColumnDef::new(ChatMessages::Audio).string())
                    .col(ColumnDef::new(ChatMessages::Voice).string())
                    .col(ColumnDef::new(ChatMessages::Video).string())
                    .col(
                        ColumnDef::new(ChatMessages::IsForward)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookup index for resolving a message by its platform identifier.
        // Not unique: duplicates of (external_id, app) are permitted at the
        // schema level.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_chat_messages_external_id_app")
                    .table(ChatMessages::Table)
                    .col(ChatMessages::ExternalId)
                    .col(ChatMessages::App)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_chat_messages_app_external_chat")
                    .table(ChatMessages::Table)
                    .col(ChatMessages::App)
                    .col(ChatMessages::ExternalChatId)
                    .to_owned(),
            )
            .await?;

        // Create jobs table
        manager
            .create_table(
                Table::create()
                    .table(Jobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Jobs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Jobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Jobs::Status)
                            .string()
                            .not_null()
                            .default("created"),
                    )
                    .col(ColumnDef::new(Jobs::Params).json().not_null())
                    .col(ColumnDef::new(Jobs::ChatSessionId).integer().not_null())
                    .col(ColumnDef::new(Jobs::ExternalId).string())
                    .col(ColumnDef::new(Jobs::Outputs).json())
                    .col(
                        ColumnDef::new(Jobs::Public)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Jobs::App).string().not_null())
                    .col(
                        ColumnDef::new(Jobs::Nsfw)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Jobs::DeletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Jobs::ExternalStatus).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_jobs_chat_session")
                            .from(Jobs::Table, Jobs::ChatSessionId)
                            .to(ChatSessions::Table, ChatSessions::Id)
                            .on_delete(ForeignKeyAction::NoAction)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_jobs_chat_session")
                    .table(Jobs::Table)
                    .col(Jobs::ChatSessionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_jobs_external_id_app")
                    .table(Jobs::Table)
                    .col(Jobs::ExternalId)
                    .col(Jobs::App)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Jobs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatMessages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Assets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatSessions::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum ChatSessions {
    Table,
    Id,
    CreatedAt,
    LoggedInAt,
    App,
    ChatUserId,
    Context,
}

#[derive(DeriveIden)]
enum Assets {
    Table,
    Id,
    CreatedAt,
    Filename,
    ChatSessionId,
}

#[derive(DeriveIden)]
enum ChatMessages {
    Table,
    Id,
    CreatedAt,
    Text,
    ExternalId,
    ExternalUserId,
    ExternalChatId,
    App,
    Image,
    Audio,
    Voice,
    Video,
    IsForward,
}

#[derive(DeriveIden)]
enum Jobs {
    Table,
    Id,
    CreatedAt,
    Status,
    Params,
    ChatSessionId,
    ExternalId,
    Outputs,
    Public,
    App,
    Nsfw,
    DeletedAt,
    ExternalStatus,
}
