//! Electronic medical record endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use netram_common::entities::{EmrRecord, Role};
use netram_common::forms::EmrForm;
use netram_common::validation::Validate;
use netram_db::PatientScope;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::handlers::patients::{can_access, load_patient};
use crate::state::SharedState;

const CLINICAL_ROLES: &[Role] = &[Role::Doctor, Role::Admin];
const DEFAULT_LIST_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct EmrListQuery {
    pub patient_id: Option<String>,
    pub limit: Option<usize>,
}

async fn load_record(state: &SharedState, id: &str) -> ApiResult<EmrRecord> {
    state.emr()
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("EMR record {id} not found")))
}

/// Clinicians read everything; a patient account reads its own patients' records.
async fn ensure_can_read(state: &SharedState, user: &AuthUser, patient_id: &str) -> ApiResult<()> {
    match user.role() {
        Role::Doctor | Role::Admin => Ok(()),
        Role::Patient => {
            let patient = load_patient(state, patient_id).await?;
            if can_access(user, &patient) { Ok(()) } else { Err(ApiError::forbidden()) }
        }
        Role::Receptionist => Err(ApiError::forbidden()),
    }
}

/// GET /api/emr?patient_id=&limit=
pub async fn list_records(
    State(state): State<SharedState>,
    user: AuthUser,
    ApiQuery(q): ApiQuery<EmrListQuery>,
) -> ApiResult<Json<Vec<EmrRecord>>> {
    if let Some(pid) = q.patient_id.as_deref() {
        ensure_can_read(&state, &user, pid).await?;
        return Ok(Json(state.emr().for_patient(pid).await?));
    }
    match user.role() {
        Role::Doctor | Role::Admin => {
            let limit = q.limit.unwrap_or(DEFAULT_LIST_LIMIT);
            Ok(Json(state.emr().list(limit).await?))
        }
        Role::Patient => {
            let scope = PatientScope::OwnedBy(user.uid().to_string());
            let ids: Vec<String> = state.patients().list(&scope, None).await?
                .into_iter()
                .map(|p| p.id)
                .collect();
            Ok(Json(state.emr().for_patients(&ids).await?))
        }
        Role::Receptionist => Err(ApiError::forbidden()),
    }
}

/// POST /api/emr
pub async fn create_record(
    State(state): State<SharedState>,
    user: AuthUser,
    ApiJson(form): ApiJson<EmrForm>,
) -> ApiResult<(StatusCode, Json<EmrRecord>)> {
    user.require_any(CLINICAL_ROLES)?;
    form.validate()?;
    load_patient(&state, form.patient_id.trim()).await?;

    let record = state.emr().insert(&form.into_record(user.uid())).await?;
    info!(record_id = %record.id, patient_id = %record.patient_id, "EMR entry written");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/emr/{id}
pub async fn get_record(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<EmrRecord>> {
    let record = load_record(&state, &id).await?;
    ensure_can_read(&state, &user, &record.patient_id).await?;
    Ok(Json(record))
}

/// PUT /api/emr/{id}
pub async fn update_record(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(form): ApiJson<EmrForm>,
) -> ApiResult<Json<EmrRecord>> {
    user.require_any(CLINICAL_ROLES)?;
    form.validate()?;
    let existing = load_record(&state, &id).await?;

    let mut record = form.into_record(&existing.author_id);
    record.id = existing.id;
    record.created_at = existing.created_at;
    Ok(Json(state.emr().update(&record).await?))
}
