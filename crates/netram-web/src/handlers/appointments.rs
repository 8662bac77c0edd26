//! Appointment scheduling endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{info, warn};

use netram_common::entities::{Appointment, AppointmentStatus};
use netram_common::forms::AppointmentForm;
use netram_common::validation::Validate;
use netram_db::{AppointmentFilter, PatientScope};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::handlers::patients::{can_access, load_patient};
use crate::sms::appointment_confirmation;
use crate::state::{AppEvent, SharedState};

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub patient_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: AppointmentStatus,
}

async fn own_patient_ids(state: &SharedState, user: &AuthUser) -> ApiResult<HashSet<String>> {
    let scope = PatientScope::OwnedBy(user.uid().to_string());
    Ok(state.patients().list(&scope, None).await?.into_iter().map(|p| p.id).collect())
}

async fn load_appointment(state: &SharedState, id: &str) -> ApiResult<Appointment> {
    state.appointments()
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Appointment {id} not found")))
}

/// SMS outcome is logged; it never fails the booking.
async fn send_confirmation(state: &SharedState, appt: &Appointment) {
    let Some(patient_id) = appt.patient_id.as_deref() else { return };
    let phone = match state.patients().find_by_id(patient_id).await {
        Ok(Some(p)) => p.phone,
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "Could not load patient for SMS confirmation");
            None
        }
    };
    let Some(phone) = phone else { return };
    let text = appointment_confirmation(
        &appt.patient_name,
        &appt.doctor_name,
        &appt.date.format("%Y-%m-%d").to_string(),
        &appt.time,
    );
    let result = state.sms.send(&phone, &text).await;
    if !result.success {
        warn!(
            appointment_id = %appt.id,
            error = result.error_message.as_deref().unwrap_or("unknown"),
            "SMS confirmation failed"
        );
    }
}

/// GET /api/appointments?date=&status=&patient_id=
pub async fn list_appointments(
    State(state): State<SharedState>,
    user: AuthUser,
    ApiQuery(q): ApiQuery<AppointmentListQuery>,
) -> ApiResult<Json<Vec<Appointment>>> {
    let filter = AppointmentFilter { date: q.date, status: q.status, patient_id: q.patient_id };
    let mut appts = state.appointments().list(&filter).await?;
    if !user.role().is_staff() {
        let mine = own_patient_ids(&state, &user).await?;
        appts.retain(|a| a.patient_id.as_ref().is_some_and(|id| mine.contains(id)));
    }
    Ok(Json(appts))
}

/// POST /api/appointments
pub async fn create_appointment(
    State(state): State<SharedState>,
    user: AuthUser,
    ApiJson(form): ApiJson<AppointmentForm>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    form.validate()?;
    let appt = form.into_appointment();
    match appt.patient_id.as_deref() {
        Some(pid) => {
            let patient = load_patient(&state, pid).await?;
            if !can_access(&user, &patient) {
                return Err(ApiError::forbidden());
            }
        }
        None => user.require_staff()?,
    }

    let appt = state.appointments().insert(&appt).await?;
    info!(appointment_id = %appt.id, date = %appt.date, time = %appt.time, "Appointment booked");
    send_confirmation(&state, &appt).await;
    state.publish(AppEvent::AppointmentBooked {
        appointment_id: appt.id.clone(),
        patient_name: appt.patient_name.clone(),
        date: appt.date.format("%Y-%m-%d").to_string(),
        time: appt.time.clone(),
    });
    Ok((StatusCode::CREATED, Json(appt)))
}

/// GET /api/appointments/{id}
pub async fn get_appointment(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Appointment>> {
    let appt = load_appointment(&state, &id).await?;
    if !user.role().is_staff() {
        let mine = own_patient_ids(&state, &user).await?;
        if !appt.patient_id.as_ref().is_some_and(|pid| mine.contains(pid)) {
            return Err(ApiError::forbidden());
        }
    }
    Ok(Json(appt))
}

/// PUT /api/appointments/{id}
pub async fn update_appointment(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(form): ApiJson<AppointmentForm>,
) -> ApiResult<Json<Appointment>> {
    user.require_staff()?;
    form.validate()?;
    let mut appt = load_appointment(&state, &id).await?;
    form.apply_to(&mut appt);
    Ok(Json(state.appointments().update(&appt).await?))
}

/// POST /api/appointments/{id}/status
pub async fn set_appointment_status(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> ApiResult<Json<Appointment>> {
    user.require_staff()?;
    let appt = state.appointments().set_status(&id, body.status).await?;
    state.publish(AppEvent::AppointmentStatusChanged {
        appointment_id: appt.id.clone(),
        status: appt.status.as_str().to_string(),
    });
    Ok(Json(appt))
}

/// DELETE /api/appointments/{id}
pub async fn delete_appointment(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require_staff()?;
    if !state.appointments().delete(&id).await? {
        return Err(ApiError::NotFound(format!("Appointment {id} not found")));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}
