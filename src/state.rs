use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::moderation::ProfanityClassifier;
use crate::rate_limit::LoginRateLimiter;
use crate::replygen::ReplyGenerator;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub moderation: Option<Arc<dyn ProfanityClassifier>>,
    pub replygen: Arc<dyn ReplyGenerator>,
    pub login_limiter: LoginRateLimiter,
}
