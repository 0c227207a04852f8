//! HTTP handlers for report endpoints

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::reporting::{
    present_consumption, present_profitability, ConsumptionColumn, DailyRollup,
    ProfitabilityColumn, ReportRange, ReportingService, SortDirection,
};
use crate::AppState;

/// Query parameters for the profitability report
#[derive(Debug, Deserialize)]
pub struct ProfitabilityQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub sort_by: Option<ProfitabilityColumn>,
    pub direction: Option<SortDirection>,
    pub filter: Option<String>,
    /// "csv" for export, JSON otherwise
    pub format: Option<String>,
}

/// Query parameters for the consumption report
#[derive(Debug, Deserialize)]
pub struct ConsumptionQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub sort_by: Option<ConsumptionColumn>,
    pub direction: Option<SortDirection>,
    pub filter: Option<String>,
    pub format: Option<String>,
}

/// Per-dish profitability over a date range
pub async fn profitability_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ProfitabilityQuery>,
) -> AppResult<Response> {
    let service = ReportingService::new(state.store);
    let rows = service
        .profitability_report(
            current_user.0.restaurant_id,
            ReportRange {
                from: query.from,
                to: query.to,
            },
        )
        .await?;
    let presented = present_profitability(
        &rows,
        query.sort_by.unwrap_or(ProfitabilityColumn::Name),
        query.direction.unwrap_or(SortDirection::Ascending),
        query.filter.as_deref(),
    );

    if query.format.as_deref() == Some("csv") {
        let csv = ReportingService::export_to_csv(&presented)?;
        return Ok(csv_response(csv, "profitability.csv"));
    }
    Ok(Json(presented).into_response())
}

/// Per-ingredient consumption over a date range
pub async fn consumption_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ConsumptionQuery>,
) -> AppResult<Response> {
    let service = ReportingService::new(state.store);
    let rows = service
        .consumption_report(
            current_user.0.restaurant_id,
            ReportRange {
                from: query.from,
                to: query.to,
            },
        )
        .await?;
    let presented = present_consumption(
        &rows,
        query.sort_by.unwrap_or(ConsumptionColumn::Name),
        query.direction.unwrap_or(SortDirection::Ascending),
        query.filter.as_deref(),
    );

    if query.format.as_deref() == Some("csv") {
        let csv = ReportingService::export_to_csv(&presented)?;
        return Ok(csv_response(csv, "consumption.csv"));
    }
    Ok(Json(presented).into_response())
}

/// Current same-day rollup maintained by the restaurant's background task
pub async fn daily_rollup(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<DailyRollup>> {
    let rx = state.rollups.receiver(current_user.0.restaurant_id);
    let rollup = rx.borrow().clone();
    Ok(Json(rollup))
}

fn csv_response(csv: String, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    )
        .into_response()
}
