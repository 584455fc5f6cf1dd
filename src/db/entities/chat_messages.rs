use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Raw inbound platform messages. Not linked to chat_sessions by foreign
/// key: a message can arrive before its session is materialized, so
/// correlation happens through (app, external_chat_id) instead.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "chat_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub created_at: DateTimeWithTimeZone,
    pub text: Option<String>,
    pub external_id: String,
    pub external_user_id: Option<String>,
    pub external_chat_id: Option<String>,
    pub app: String,
    pub image: Option<String>,
    pub audio: Option<String>,
    pub voice: Option<String>,
    pub video: Option<String>,
    #[sea_orm(default_value = false)]
    pub is_forward: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
