mod context;
mod job_status;

pub use context::*;
pub use job_status::*;
