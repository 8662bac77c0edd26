//! Billing endpoints. Front-desk staff manage invoices; a patient account may
//! list the invoices of its own patient records.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use netram_common::entities::{Invoice, InvoiceStatus, Role};
use netram_common::forms::InvoiceForm;
use netram_common::validation::Validate;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::handlers::patients::{can_access, load_patient};
use crate::state::{AppEvent, SharedState};

const BILLING_ROLES: &[Role] = &[Role::Admin, Role::Receptionist];

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListQuery {
    pub patient_id: Option<String>,
    pub status: Option<InvoiceStatus>,
}

async fn load_invoice(state: &SharedState, id: &str) -> ApiResult<Invoice> {
    state.invoices()
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Invoice {id} not found")))
}

/// GET /api/billing?patient_id=&status=
pub async fn list_invoices(
    State(state): State<SharedState>,
    user: AuthUser,
    ApiQuery(q): ApiQuery<InvoiceListQuery>,
) -> ApiResult<Json<Vec<Invoice>>> {
    if user.role() == Role::Patient {
        let pid = q.patient_id.as_deref().ok_or_else(ApiError::forbidden)?;
        let patient = load_patient(&state, pid).await?;
        if !can_access(&user, &patient) {
            return Err(ApiError::forbidden());
        }
    } else {
        user.require_any(BILLING_ROLES)?;
    }
    let invoices = state.invoices().list(q.patient_id.as_deref(), q.status).await?;
    Ok(Json(invoices))
}

/// POST /api/billing
pub async fn create_invoice(
    State(state): State<SharedState>,
    user: AuthUser,
    ApiJson(form): ApiJson<InvoiceForm>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    user.require_any(BILLING_ROLES)?;
    form.validate()?;
    load_patient(&state, form.patient_id.trim()).await?;

    let invoice = state.invoices().insert(&form.into_invoice()).await?;
    info!(invoice_id = %invoice.id, amount_cents = invoice.amount_cents, "Invoice issued");
    state.publish(AppEvent::InvoiceIssued {
        invoice_id: invoice.id.clone(),
        patient_name: invoice.patient_name.clone(),
        amount_cents: invoice.amount_cents,
    });
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// GET /api/billing/{id}
pub async fn get_invoice(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Invoice>> {
    let invoice = load_invoice(&state, &id).await?;
    if user.role() == Role::Patient {
        let patient = load_patient(&state, &invoice.patient_id).await?;
        if !can_access(&user, &patient) {
            return Err(ApiError::forbidden());
        }
    } else {
        user.require_any(BILLING_ROLES)?;
    }
    Ok(Json(invoice))
}

/// PUT /api/billing/{id}
pub async fn update_invoice(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(form): ApiJson<InvoiceForm>,
) -> ApiResult<Json<Invoice>> {
    user.require_any(BILLING_ROLES)?;
    form.validate()?;
    let existing = load_invoice(&state, &id).await?;

    let status = form.status.unwrap_or(existing.status);
    let date = form.date.unwrap_or(existing.date);
    let mut invoice = form.into_invoice();
    invoice.id = existing.id;
    invoice.status = status;
    invoice.date = date;
    invoice.created_at = existing.created_at;
    Ok(Json(state.invoices().update(&invoice).await?))
}

/// POST /api/billing/{id}/pay
pub async fn pay_invoice(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Invoice>> {
    user.require_any(BILLING_ROLES)?;
    let invoice = state.invoices().set_status(&id, InvoiceStatus::Paid).await?;
    info!(invoice_id = %invoice.id, "Invoice paid");
    state.publish(AppEvent::InvoicePaid { invoice_id: invoice.id.clone() });
    Ok(Json(invoice))
}
