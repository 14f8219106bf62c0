use axum::extract::{Query, State};
use axum::Json;
use chrono::{Days, NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::CommentDailyBreakdown;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct BreakdownParams {
    pub date_from: String,
    pub date_to: String,
}

/// Daily comment totals and blocked counts over an inclusive date range.
pub async fn comments_daily(
    State(state): State<SharedState>,
    _auth: AuthUser,
    Query(params): Query<BreakdownParams>,
) -> Result<Json<Vec<CommentDailyBreakdown>>, AppError> {
    let from = parse_date(&params.date_from)?;
    let to = parse_date(&params.date_to)?;

    if from > to {
        return Err(AppError::BadRequest(
            "Start date must be before end date.".to_string(),
        ));
    }

    let start = from.and_time(NaiveTime::MIN).and_utc();
    let end = to
        .checked_add_days(Days::new(1))
        .ok_or_else(|| AppError::BadRequest("Date range out of bounds".to_string()))?
        .and_time(NaiveTime::MIN)
        .and_utc();

    let breakdown = db::comments::daily_breakdown(&state.pool, start, end).await?;

    Ok(Json(breakdown))
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("Invalid date format. Use YYYY-MM-DD.".to_string()))
}
