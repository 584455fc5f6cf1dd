use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::types::JobStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub created_at: DateTimeWithTimeZone,
    pub status: JobStatus,
    pub params: Json,
    pub chat_session_id: i32,
    pub external_id: Option<String>,
    pub outputs: Option<Json>,
    #[sea_orm(default_value = false)]
    pub public: bool,
    pub app: String,
    #[sea_orm(default_value = false)]
    pub nsfw: bool,
    // Soft delete marker; rows stay retrievable by id
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub external_status: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chat_sessions::Entity",
        from = "Column::ChatSessionId",
        to = "super::chat_sessions::Column::Id"
    )]
    ChatSession,
}

impl Related<super::chat_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChatSession.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
