//! Axum router — maps all URL paths to handlers.

use axum::{
    extract::DefaultBodyLimit,
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
    compression::CompressionLayer,
};
use crate::state::SharedState;
use crate::access::access_check;
use crate::handlers::{
    auth::{signup, login, logout, me, complete_onboarding},
    patients::{list_patients, create_patient, get_patient, update_patient, delete_patient},
    appointments::{
        list_appointments, create_appointment, get_appointment, update_appointment,
        delete_appointment, set_appointment_status,
    },
    billing::{list_invoices, create_invoice, get_invoice, update_invoice, pay_invoice},
    emr::{list_records, create_record, get_record, update_record},
    dashboard::dashboard,
    ai::{eye_scan, summarize, topic_summary, rewrite, literature_review, suggest_conditions},
    uploads::{diagnosis, analyze_document},
    search::medical_search,
    system::{system_status, ai_audit, health},
};
use crate::sse::sse_handler;

/// Multipart framing on top of the raw file ceiling.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build and return the full Axum router.
pub fn build_router(shared: SharedState) -> Router {
    let body_limit = shared.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(health))

        // Auth & access
        .route("/api/auth/signup",            post(signup))
        .route("/api/auth/login",             post(login))
        .route("/api/auth/logout",            post(logout))
        .route("/api/auth/me",                get(me))
        .route("/api/auth/onboarding/{step}", post(complete_onboarding))
        .route("/api/access",                 get(access_check))

        // Clinic records
        .route("/api/patients",      get(list_patients).post(create_patient))
        .route("/api/patients/{id}", get(get_patient).put(update_patient).delete(delete_patient))
        .route("/api/appointments",  get(list_appointments).post(create_appointment))
        .route("/api/appointments/{id}",
            get(get_appointment).put(update_appointment).delete(delete_appointment))
        .route("/api/appointments/{id}/status", post(set_appointment_status))
        .route("/api/billing",          get(list_invoices).post(create_invoice))
        .route("/api/billing/{id}",     get(get_invoice).put(update_invoice))
        .route("/api/billing/{id}/pay", post(pay_invoice))
        .route("/api/emr",      get(list_records).post(create_record))
        .route("/api/emr/{id}", get(get_record).put(update_record))
        .route("/api/dashboard", get(dashboard))

        // AI
        .route("/api/ai/eye-scan",           post(eye_scan))
        .route("/api/ai/summarize",          post(summarize))
        .route("/api/ai/topic-summary",      post(topic_summary))
        .route("/api/ai/rewrite",            post(rewrite))
        .route("/api/ai/literature-review",  post(literature_review))
        .route("/api/ai/suggest-conditions", post(suggest_conditions))
        .route("/api/diagnosis",        post(diagnosis))
        .route("/api/analyze-document", post(analyze_document))
        .route("/api/medical-search",   get(medical_search))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // System
        .route("/api/system",          get(system_status))
        .route("/api/system/ai-audit", get(ai_audit))

        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
