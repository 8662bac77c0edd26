//! Clinic dashboard figures.

use axum::{extract::State, Json};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use netram_db::DashboardSummary;

use crate::auth::AuthUser;
use crate::error::{ApiQuery, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// Reference day for "today" and "upcoming"; defaults to the UTC date.
    pub date: Option<NaiveDate>,
}

/// GET /api/dashboard
pub async fn dashboard(
    State(state): State<SharedState>,
    user: AuthUser,
    ApiQuery(q): ApiQuery<DashboardQuery>,
) -> ApiResult<Json<DashboardSummary>> {
    user.require_staff()?;
    let today = q.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.dashboard().summary(today).await?))
}
