use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{DayResolution, DaySummary};
use crate::models::resolved::{hhmm, hhmm_list};
use crate::services::availability::{parse_date, parse_time};
use crate::state::AppState;

// GET /api/freelancers/:id/availability
#[derive(Deserialize)]
pub struct DayQuery {
    pub date: String,
    pub category_id: Option<String>,
}

pub async fn get_day(
    State(state): State<Arc<AppState>>,
    Path(freelancer_id): Path<String>,
    Query(query): Query<DayQuery>,
) -> Result<Json<DayResolution>, AppError> {
    let date = parse_date(&query.date, "date")?;
    let resolution = state
        .availability
        .resolve_day(&freelancer_id, query.category_id.as_deref(), date)
        .await?;
    Ok(Json(resolution))
}

// GET /api/freelancers/:id/next-available
#[derive(Deserialize)]
pub struct NextAvailableQuery {
    pub from: String,
    pub category_id: Option<String>,
    pub horizon_days: Option<u32>,
}

#[derive(Serialize)]
pub struct NextAvailableResponse {
    date: NaiveDate,
}

pub async fn get_next_available(
    State(state): State<Arc<AppState>>,
    Path(freelancer_id): Path<String>,
    Query(query): Query<NextAvailableQuery>,
) -> Result<Json<NextAvailableResponse>, AppError> {
    let from = parse_date(&query.from, "from")?;
    let date = state
        .availability
        .find_next_available(
            &freelancer_id,
            query.category_id.as_deref(),
            from,
            query.horizon_days,
        )
        .await?;
    Ok(Json(NextAvailableResponse { date }))
}

// GET /api/freelancers/:id/calendar
#[derive(Deserialize)]
pub struct CalendarQuery {
    pub from: String,
    pub to: String,
    pub category_id: Option<String>,
}

pub async fn get_calendar(
    State(state): State<Arc<AppState>>,
    Path(freelancer_id): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Vec<DaySummary>>, AppError> {
    let from = parse_date(&query.from, "from")?;
    let to = parse_date(&query.to, "to")?;
    let marks = state
        .availability
        .mark_calendar(&freelancer_id, query.category_id.as_deref(), from, to)
        .await?;
    Ok(Json(marks))
}

// GET /api/freelancers/:id/end-times
#[derive(Deserialize)]
pub struct EndTimesQuery {
    pub date: String,
    pub start: String,
    pub category_id: Option<String>,
}

#[derive(Serialize)]
pub struct EndTimesResponse {
    date: NaiveDate,
    #[serde(serialize_with = "hhmm")]
    start: chrono::NaiveTime,
    #[serde(serialize_with = "hhmm_list")]
    end_times: Vec<chrono::NaiveTime>,
}

pub async fn get_end_times(
    State(state): State<Arc<AppState>>,
    Path(freelancer_id): Path<String>,
    Query(query): Query<EndTimesQuery>,
) -> Result<Json<EndTimesResponse>, AppError> {
    let date = parse_date(&query.date, "date")?;
    let start = parse_time(&query.start, "start")?;
    let end_times = state
        .availability
        .end_time_options(&freelancer_id, query.category_id.as_deref(), date, start)
        .await?;
    Ok(Json(EndTimesResponse {
        date,
        start,
        end_times,
    }))
}
