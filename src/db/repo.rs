use anyhow::{Context, Result};
use chrono::Local;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use super::entities::{assets, chat_messages, chat_sessions, jobs};
use crate::db::types::{JobStatus, SessionContext};

/// A new inbound platform message, as received from the messaging adapter.
#[derive(Debug, Clone, Default)]
pub struct NewChatMessage {
    pub text: Option<String>,
    pub external_id: String,
    pub external_user_id: Option<String>,
    pub external_chat_id: Option<String>,
    pub app: String,
    pub image: Option<String>,
    pub audio: Option<String>,
    pub voice: Option<String>,
    pub video: Option<String>,
    pub is_forward: bool,
}

pub struct Repo {
    db: DatabaseConnection,
}

impl Repo {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn ping(&self) -> Result<()> {
        self.db.ping().await.context("Database ping failed")
    }

    // ==================== Sessions ====================

    /// Create a session. A duplicate non-null chat_user_id violates the
    /// unique index and surfaces as an error.
    pub async fn create_session(
        &self,
        app: &str,
        chat_user_id: Option<String>,
    ) -> Result<chat_sessions::Model> {
        let now = Local::now().fixed_offset();

        let new_session = chat_sessions::ActiveModel {
            created_at: Set(now),
            app: Set(app.to_string()),
            chat_user_id: Set(chat_user_id),
            ..Default::default()
        };

        new_session
            .insert(&self.db)
            .await
            .context("Failed to create session")
    }

    pub async fn get_session(&self, session_id: i32) -> Result<Option<chat_sessions::Model>> {
        chat_sessions::Entity::find_by_id(session_id)
            .one(&self.db)
            .await
            .context("Failed to get session")
    }

    pub async fn get_session_by_chat_user(
        &self,
        chat_user_id: &str,
    ) -> Result<Option<chat_sessions::Model>> {
        chat_sessions::Entity::find()
            .filter(chat_sessions::Column::ChatUserId.eq(chat_user_id))
            .one(&self.db)
            .await
            .context("Failed to get session by chat user")
    }

    /// Atomically find or create the session for a platform user (using a
    /// database transaction). Repeated calls return the same row.
    pub async fn get_or_create_session(
        &self,
        app: &str,
        chat_user_id: &str,
    ) -> Result<chat_sessions::Model> {
        use sea_orm::TransactionTrait;

        let txn = self
            .db
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let existing = chat_sessions::Entity::find()
            .filter(chat_sessions::Column::ChatUserId.eq(chat_user_id))
            .one(&txn)
            .await
            .context("Failed to look up session by chat user")?;

        if let Some(session) = existing {
            txn.commit().await.context("Failed to commit transaction")?;
            return Ok(session);
        }

        let now = Local::now().fixed_offset();
        let new_session = chat_sessions::ActiveModel {
            created_at: Set(now),
            app: Set(app.to_string()),
            chat_user_id: Set(Some(chat_user_id.to_string())),
            ..Default::default()
        };

        let session = new_session
            .insert(&txn)
            .await
            .context("Failed to create session")?;

        txn.commit().await.context("Failed to commit transaction")?;

        Ok(session)
    }

    /// Record an authentication event on the session.
    pub async fn record_login(&self, session_id: i32) -> Result<chat_sessions::Model> {
        let session = chat_sessions::Entity::find_by_id(session_id)
            .one(&self.db)
            .await
            .context("Failed to query session")?
            .ok_or_else(|| anyhow::anyhow!("Session {} not found", session_id))?;

        let mut active: chat_sessions::ActiveModel = session.into_active_model();
        active.logged_in_at = Set(Some(Local::now().fixed_offset()));
        active
            .update(&self.db)
            .await
            .context("Failed to record login")
    }

    /// Replace the session context blob.
    pub async fn set_session_context(
        &self,
        session_id: i32,
        context: SessionContext,
    ) -> Result<chat_sessions::Model> {
        let session = chat_sessions::Entity::find_by_id(session_id)
            .one(&self.db)
            .await
            .context("Failed to query session")?
            .ok_or_else(|| anyhow::anyhow!("Session {} not found", session_id))?;

        let mut active: chat_sessions::ActiveModel = session.into_active_model();
        active.context = Set(context);
        active
            .update(&self.db)
            .await
            .context("Failed to update session context")
    }

    // ==================== Assets ====================

    /// Create an asset. The session must exist; a dangling chat_session_id
    /// violates the foreign key and surfaces as an error.
    pub async fn create_asset(
        &self,
        chat_session_id: i32,
        filename: &str,
    ) -> Result<assets::Model> {
        let now = Local::now().fixed_offset();

        let new_asset = assets::ActiveModel {
            created_at: Set(now),
            filename: Set(filename.to_string()),
            chat_session_id: Set(chat_session_id),
            ..Default::default()
        };

        new_asset
            .insert(&self.db)
            .await
            .context("Failed to create asset")
    }

    pub async fn get_asset(&self, asset_id: i32) -> Result<Option<assets::Model>> {
        assets::Entity::find_by_id(asset_id)
            .one(&self.db)
            .await
            .context("Failed to get asset")
    }

    pub async fn list_assets_by_session(&self, chat_session_id: i32) -> Result<Vec<assets::Model>> {
        assets::Entity::find()
            .filter(assets::Column::ChatSessionId.eq(chat_session_id))
            .order_by_asc(assets::Column::Id)
            .all(&self.db)
            .await
            .context("Failed to list assets by session")
    }

    // ==================== Chat messages ====================

    /// Persist an inbound message. Messages are immutable after insert.
    pub async fn save_message(&self, message: NewChatMessage) -> Result<chat_messages::Model> {
        let now = Local::now().fixed_offset();

        let new_message = chat_messages::ActiveModel {
            created_at: Set(now),
            text: Set(message.text),
            external_id: Set(message.external_id),
            external_user_id: Set(message.external_user_id),
            external_chat_id: Set(message.external_chat_id),
            app: Set(message.app),
            image: Set(message.image),
            audio: Set(message.audio),
            voice: Set(message.voice),
            video: Set(message.video),
            is_forward: Set(message.is_forward),
            ..Default::default()
        };

        new_message
            .insert(&self.db)
            .await
            .context("Failed to save message")
    }

    pub async fn get_message(&self, message_id: i32) -> Result<Option<chat_messages::Model>> {
        chat_messages::Entity::find_by_id(message_id)
            .one(&self.db)
            .await
            .context("Failed to get message")
    }

    /// Resolve a message by its platform identifier. The schema permits
    /// duplicates of (external_id, app), so the most recent row wins.
    pub async fn find_message_by_external(
        &self,
        external_id: &str,
        app: &str,
    ) -> Result<Option<chat_messages::Model>> {
        chat_messages::Entity::find()
            .filter(chat_messages::Column::ExternalId.eq(external_id))
            .filter(chat_messages::Column::App.eq(app))
            .order_by_desc(chat_messages::Column::Id)
            .one(&self.db)
            .await
            .context("Failed to find message by external id")
    }

    /// List recent messages of one platform conversation, newest first.
    pub async fn list_messages_by_external_chat(
        &self,
        app: &str,
        external_chat_id: &str,
        limit: u64,
    ) -> Result<Vec<chat_messages::Model>> {
        chat_messages::Entity::find()
            .filter(chat_messages::Column::App.eq(app))
            .filter(chat_messages::Column::ExternalChatId.eq(external_chat_id))
            .order_by_desc(chat_messages::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .context("Failed to list messages by external chat")
    }

    // ==================== Jobs ====================

    /// Create a job for a session. Status starts at the database default
    /// ('created'); the session must exist.
    pub async fn create_job(
        &self,
        chat_session_id: i32,
        app: &str,
        params: serde_json::Value,
        public: bool,
        nsfw: bool,
    ) -> Result<jobs::Model> {
        let now = Local::now().fixed_offset();

        let new_job = jobs::ActiveModel {
            created_at: Set(now),
            params: Set(params),
            chat_session_id: Set(chat_session_id),
            public: Set(public),
            app: Set(app.to_string()),
            nsfw: Set(nsfw),
            ..Default::default()
        };

        new_job
            .insert(&self.db)
            .await
            .context("Failed to create job")
    }

    /// Fetch a job by id. Soft-deleted jobs remain retrievable here.
    pub async fn get_job(&self, job_id: i32) -> Result<Option<jobs::Model>> {
        jobs::Entity::find_by_id(job_id)
            .one(&self.db)
            .await
            .context("Failed to get job")
    }

    pub async fn get_job_by_external(
        &self,
        external_id: &str,
        app: &str,
    ) -> Result<Option<jobs::Model>> {
        jobs::Entity::find()
            .filter(jobs::Column::ExternalId.eq(external_id))
            .filter(jobs::Column::App.eq(app))
            .one(&self.db)
            .await
            .context("Failed to get job by external id")
    }

    /// Move a job to a new status. No transition graph is enforced; workers
    /// own the lifecycle.
    pub async fn update_job_status(&self, job_id: i32, status: JobStatus) -> Result<jobs::Model> {
        let job = jobs::Entity::find_by_id(job_id)
            .one(&self.db)
            .await
            .context("Failed to query job")?
            .ok_or_else(|| anyhow::anyhow!("Job {} not found", job_id))?;

        let mut active: jobs::ActiveModel = job.into_active_model();
        active.status = Set(status);
        active
            .update(&self.db)
            .await
            .context("Failed to update job status")
    }

    /// Attach the identifier and status reported by the external backend.
    pub async fn update_job_external(
        &self,
        job_id: i32,
        external_id: Option<String>,
        external_status: Option<String>,
    ) -> Result<jobs::Model> {
        let job = jobs::Entity::find_by_id(job_id)
            .one(&self.db)
            .await
            .context("Failed to query job")?
            .ok_or_else(|| anyhow::anyhow!("Job {} not found", job_id))?;

        let mut active: jobs::ActiveModel = job.into_active_model();
        active.external_id = Set(external_id);
        active.external_status = Set(external_status);
        active
            .update(&self.db)
            .await
            .context("Failed to update job external fields")
    }

    pub async fn set_job_outputs(
        &self,
        job_id: i32,
        outputs: serde_json::Value,
    ) -> Result<jobs::Model> {
        let job = jobs::Entity::find_by_id(job_id)
            .one(&self.db)
            .await
            .context("Failed to query job")?
            .ok_or_else(|| anyhow::anyhow!("Job {} not found", job_id))?;

        let mut active: jobs::ActiveModel = job.into_active_model();
        active.outputs = Set(Some(outputs));
        active
            .update(&self.db)
            .await
            .context("Failed to set job outputs")
    }

    /// List a session's jobs, oldest first. Soft-deleted jobs are excluded
    /// unless `include_deleted` is set.
    pub async fn list_jobs_by_session(
        &self,
        chat_session_id: i32,
        include_deleted: bool,
    ) -> Result<Vec<jobs::Model>> {
        let mut query = jobs::Entity::find()
            .filter(jobs::Column::ChatSessionId.eq(chat_session_id));

        if !include_deleted {
            query = query.filter(jobs::Column::DeletedAt.is_null());
        }

        query
            .order_by_asc(jobs::Column::Id)
            .all(&self.db)
            .await
            .context("Failed to list jobs by session")
    }

    /// List publicly visible jobs for an app, newest first.
    pub async fn list_public_jobs(&self, app: &str, limit: u64) -> Result<Vec<jobs::Model>> {
        jobs::Entity::find()
            .filter(jobs::Column::App.eq(app))
            .filter(jobs::Column::Public.eq(true))
            .filter(jobs::Column::DeletedAt.is_null())
            .order_by_desc(jobs::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .context("Failed to list public jobs")
    }

    /// Soft-delete a job by stamping deleted_at. Idempotent: a job that is
    /// already deleted keeps its original timestamp.
    pub async fn soft_delete_job(&self, job_id: i32) -> Result<jobs::Model> {
        let job = jobs::Entity::find_by_id(job_id)
            .one(&self.db)
            .await
            .context("Failed to query job")?
            .ok_or_else(|| anyhow::anyhow!("Job {} not found", job_id))?;

        if job.deleted_at.is_some() {
            return Ok(job);
        }

        let mut active: jobs::ActiveModel = job.into_active_model();
        active.deleted_at = Set(Some(Local::now().fixed_offset()));
        active
            .update(&self.db)
            .await
            .context("Failed to soft-delete job")
    }

    /// Physically remove jobs soft-deleted before the cutoff. Returns the
    /// number of rows purged.
    pub async fn purge_deleted_jobs(
        &self,
        cutoff: chrono::DateTime<Local>,
    ) -> Result<u64> {
        let result = jobs::Entity::delete_many()
            .filter(jobs::Column::DeletedAt.is_not_null())
            .filter(jobs::Column::DeletedAt.lt(cutoff.fixed_offset()))
            .exec(&self.db)
            .await
            .context("Failed to purge deleted jobs")?;

        Ok(result.rows_affected)
    }

    // ==================== Statistics ====================

    pub async fn count_sessions(&self) -> Result<u64> {
        chat_sessions::Entity::find()
            .count(&self.db)
            .await
            .context("Failed to count sessions")
    }

    /// Count jobs that are neither soft-deleted nor in a terminal state.
    pub async fn count_active_jobs(&self) -> Result<u64> {
        jobs::Entity::find()
            .filter(jobs::Column::DeletedAt.is_null())
            .filter(jobs::Column::Status.is_in([
                JobStatus::Created,
                JobStatus::Queued,
                JobStatus::Running,
            ]))
            .count(&self.db)
            .await
            .context("Failed to count active jobs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectOptions, Database};
    use sea_orm_migration::MigratorTrait;
    use serde_json::json;

    async fn setup_test_db() -> Result<Repo> {
        // In-memory SQLite with a single pooled connection so every query
        // sees the same database
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1);
        let db = Database::connect(opt).await?;

        migration::Migrator::up(&db, None).await?;

        Ok(Repo::new(db))
    }

    #[tokio::test]
    async fn test_duplicate_chat_user_id_rejected() {
        let repo = setup_test_db().await.unwrap();

        repo.create_session("telegram", Some("tg:42".to_string()))
            .await
            .unwrap();

        let duplicate = repo
            .create_session("whatsapp", Some("tg:42".to_string()))
            .await;
        assert!(duplicate.is_err());

        // Multiple anonymous sessions are fine
        repo.create_session("telegram", None).await.unwrap();
        repo.create_session("telegram", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_new_session_has_empty_context() {
        let repo = setup_test_db().await.unwrap();

        let session = repo
            .create_session("telegram", Some("tg:1".to_string()))
            .await
            .unwrap();

        assert!(session.context.is_empty());
        assert_eq!(session.context, SessionContext::default());
        assert!(session.logged_in_at.is_none());
    }

    #[tokio::test]
    async fn test_get_or_create_session_is_stable() {
        let repo = setup_test_db().await.unwrap();

        let first = repo
            .get_or_create_session("telegram", "tg:7")
            .await
            .unwrap();
        let second = repo
            .get_or_create_session("telegram", "tg:7")
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let other = repo
            .get_or_create_session("telegram", "tg:8")
            .await
            .unwrap();
        assert_ne!(first.id, other.id);

        let by_user = repo
            .get_session_by_chat_user("tg:7")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_user.id, first.id);
        assert!(repo
            .get_session_by_chat_user("tg:999")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_record_login() {
        let repo = setup_test_db().await.unwrap();

        let session = repo
            .create_session("telegram", Some("tg:9".to_string()))
            .await
            .unwrap();
        assert!(session.logged_in_at.is_none());

        let updated = repo.record_login(session.id).await.unwrap();
        assert!(updated.logged_in_at.is_some());
    }

    #[tokio::test]
    async fn test_session_context_round_trip() {
        let repo = setup_test_db().await.unwrap();

        let session = repo
            .create_session("telegram", Some("tg:10".to_string()))
            .await
            .unwrap();

        let mut ctx = SessionContext::default();
        ctx.set("prompt", json!("a hamster in space"));
        ctx.set("options", json!({"size": "1024x1024", "n": 1, "seeds": [4, 8]}));

        repo.set_session_context(session.id, ctx.clone())
            .await
            .unwrap();

        let reloaded = repo.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(reloaded.context, ctx);
    }

    #[tokio::test]
    async fn test_asset_requires_existing_session() {
        let repo = setup_test_db().await.unwrap();

        let orphan = repo.create_asset(9999, "out.png").await;
        assert!(orphan.is_err());
    }

    #[tokio::test]
    async fn test_asset_create_and_list() {
        let repo = setup_test_db().await.unwrap();

        let session = repo
            .create_session("telegram", Some("tg:11".to_string()))
            .await
            .unwrap();

        let asset = repo.create_asset(session.id, "render.png").await.unwrap();
        assert_eq!(asset.chat_session_id, session.id);
        assert_eq!(asset.filename, "render.png");

        repo.create_asset(session.id, "render2.png").await.unwrap();

        let listed = repo.list_assets_by_session(session.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].filename, "render.png");

        let fetched = repo.get_asset(asset.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, asset.id);
    }

    #[tokio::test]
    async fn test_job_requires_existing_session() {
        let repo = setup_test_db().await.unwrap();

        let orphan = repo
            .create_job(9999, "telegram", json!({"prompt": "x"}), false, false)
            .await;
        assert!(orphan.is_err());
    }

    #[tokio::test]
    async fn test_new_job_defaults_to_created() {
        let repo = setup_test_db().await.unwrap();

        let session = repo
            .create_session("telegram", Some("tg:12".to_string()))
            .await
            .unwrap();

        let job = repo
            .create_job(session.id, "telegram", json!({"prompt": "x"}), false, false)
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Created);
        assert!(job.outputs.is_none());
        assert!(job.deleted_at.is_none());
        assert!(!job.public);
        assert!(!job.nsfw);
    }

    #[tokio::test]
    async fn test_job_status_and_external_updates() {
        let repo = setup_test_db().await.unwrap();

        let session = repo
            .create_session("telegram", Some("tg:13".to_string()))
            .await
            .unwrap();
        let job = repo
            .create_job(session.id, "telegram", json!({"prompt": "x"}), false, false)
            .await
            .unwrap();

        let job = repo
            .update_job_status(job.id, JobStatus::Running)
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Running);

        let job = repo
            .update_job_external(
                job.id,
                Some("ext-77".to_string()),
                Some("processing".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(job.external_id.as_deref(), Some("ext-77"));
        assert_eq!(job.external_status.as_deref(), Some("processing"));

        let by_external = repo
            .get_job_by_external("ext-77", "telegram")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_external.id, job.id);
    }

    #[tokio::test]
    async fn test_job_params_and_outputs_round_trip() {
        let repo = setup_test_db().await.unwrap();

        let session = repo
            .create_session("telegram", Some("tg:14".to_string()))
            .await
            .unwrap();

        let params = json!({"prompt": "hamster", "steps": 30, "tags": ["a", "b"]});
        let job = repo
            .create_job(session.id, "telegram", params.clone(), false, false)
            .await
            .unwrap();
        assert_eq!(job.params, params);

        let outputs = json!({"files": ["a.png"], "meta": {"seed": 99, "nested": [null, true]}});
        let job = repo.set_job_outputs(job.id, outputs.clone()).await.unwrap();
        assert_eq!(job.outputs, Some(outputs.clone()));

        let reloaded = repo.get_job(job.id).await.unwrap().unwrap();
        assert_eq!(reloaded.params, params);
        assert_eq!(reloaded.outputs, Some(outputs));
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_row_but_hides_from_listing() {
        let repo = setup_test_db().await.unwrap();

        let session = repo
            .create_session("telegram", Some("tg:15".to_string()))
            .await
            .unwrap();
        let keep = repo
            .create_job(session.id, "telegram", json!({}), false, false)
            .await
            .unwrap();
        let trashed = repo
            .create_job(session.id, "telegram", json!({}), false, false)
            .await
            .unwrap();

        repo.soft_delete_job(trashed.id).await.unwrap();

        // Still retrievable by id
        let fetched = repo.get_job(trashed.id).await.unwrap().unwrap();
        assert!(fetched.deleted_at.is_some());

        // Excluded from the default listing
        let active = repo.list_jobs_by_session(session.id, false).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep.id);

        // Present when deleted rows are requested
        let all = repo.list_jobs_by_session(session.id, true).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_soft_delete_is_idempotent() {
        let repo = setup_test_db().await.unwrap();

        let session = repo
            .create_session("telegram", Some("tg:16".to_string()))
            .await
            .unwrap();
        let job = repo
            .create_job(session.id, "telegram", json!({}), false, false)
            .await
            .unwrap();

        let first = repo.soft_delete_job(job.id).await.unwrap();
        let second = repo.soft_delete_job(job.id).await.unwrap();
        assert_eq!(first.deleted_at, second.deleted_at);
    }

    #[tokio::test]
    async fn test_purge_deleted_jobs_respects_cutoff() {
        let repo = setup_test_db().await.unwrap();

        let session = repo
            .create_session("telegram", Some("tg:17".to_string()))
            .await
            .unwrap();
        let active = repo
            .create_job(session.id, "telegram", json!({}), false, false)
            .await
            .unwrap();
        let deleted = repo
            .create_job(session.id, "telegram", json!({}), false, false)
            .await
            .unwrap();

        repo.soft_delete_job(deleted.id).await.unwrap();

        // A cutoff in the past purges nothing
        let purged = repo
            .purge_deleted_jobs(Local::now() - chrono::Duration::days(1))
            .await
            .unwrap();
        assert_eq!(purged, 0);

        // A cutoff in the future removes the soft-deleted row only
        let purged = repo
            .purge_deleted_jobs(Local::now() + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(purged, 1);

        assert!(repo.get_job(deleted.id).await.unwrap().is_none());
        assert!(repo.get_job(active.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_public_jobs() {
        let repo = setup_test_db().await.unwrap();

        let session = repo
            .create_session("telegram", Some("tg:18".to_string()))
            .await
            .unwrap();
        let public = repo
            .create_job(session.id, "telegram", json!({}), true, false)
            .await
            .unwrap();
        repo.create_job(session.id, "telegram", json!({}), false, false)
            .await
            .unwrap();
        let hidden = repo
            .create_job(session.id, "telegram", json!({}), true, false)
            .await
            .unwrap();
        repo.soft_delete_job(hidden.id).await.unwrap();

        let listed = repo.list_public_jobs("telegram", 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, public.id);
    }

    #[tokio::test]
    async fn test_save_and_find_message() {
        let repo = setup_test_db().await.unwrap();

        let message = repo
            .save_message(NewChatMessage {
                text: Some("hello".to_string()),
                external_id: "m-1".to_string(),
                external_user_id: Some("u-1".to_string()),
                external_chat_id: Some("c-1".to_string()),
                app: "telegram".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(!message.is_forward);
        assert!(message.image.is_none());

        let fetched = repo.get_message(message.id).await.unwrap().unwrap();
        assert_eq!(fetched.text.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_find_message_by_external_returns_latest_duplicate() {
        let repo = setup_test_db().await.unwrap();

        // (external_id, app) duplicates are permitted at the schema level
        for text in ["first", "second"] {
            repo.save_message(NewChatMessage {
                text: Some(text.to_string()),
                external_id: "m-dup".to_string(),
                app: "telegram".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        }

        let found = repo
            .find_message_by_external("m-dup", "telegram")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.text.as_deref(), Some("second"));

        // Same external_id in another app does not match
        assert!(repo
            .find_message_by_external("m-dup", "whatsapp")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_messages_by_external_chat() {
        let repo = setup_test_db().await.unwrap();

        for i in 0..3 {
            repo.save_message(NewChatMessage {
                text: Some(format!("msg {}", i)),
                external_id: format!("m-{}", i),
                external_chat_id: Some("c-9".to_string()),
                app: "telegram".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        }
        repo.save_message(NewChatMessage {
            external_id: "m-other".to_string(),
            external_chat_id: Some("c-other".to_string()),
            app: "telegram".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        let listed = repo
            .list_messages_by_external_chat("telegram", "c-9", 2)
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].text.as_deref(), Some("msg 2"));
        assert_eq!(listed[1].text.as_deref(), Some("msg 1"));
    }

    #[tokio::test]
    async fn test_counts() {
        let repo = setup_test_db().await.unwrap();

        let session = repo
            .create_session("telegram", Some("tg:19".to_string()))
            .await
            .unwrap();
        repo.create_session("telegram", None).await.unwrap();

        let running = repo
            .create_job(session.id, "telegram", json!({}), false, false)
            .await
            .unwrap();
        repo.update_job_status(running.id, JobStatus::Running)
            .await
            .unwrap();

        let done = repo
            .create_job(session.id, "telegram", json!({}), false, false)
            .await
            .unwrap();
        repo.update_job_status(done.id, JobStatus::Completed)
            .await
            .unwrap();

        let gone = repo
            .create_job(session.id, "telegram", json!({}), false, false)
            .await
            .unwrap();
        repo.soft_delete_job(gone.id).await.unwrap();

        assert_eq!(repo.count_sessions().await.unwrap(), 2);
        assert_eq!(repo.count_active_jobs().await.unwrap(), 1);
    }
}
