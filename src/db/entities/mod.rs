pub mod assets;
pub mod chat_messages;
pub mod chat_sessions;
pub mod jobs;
