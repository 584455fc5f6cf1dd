//! chatstore: the persistence layer of a multi-platform chat bot.
//!
//! Tracks conversational sessions, the asynchronous jobs they launch, file
//! assets they produce, and a log of raw inbound platform messages.

pub mod config;
pub mod db;
pub mod error;
pub mod maintenance;
pub mod session;
