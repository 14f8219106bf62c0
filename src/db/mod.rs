pub mod comments;
pub mod posts;
pub mod refresh_tokens;
pub mod reply_jobs;
pub mod users;
