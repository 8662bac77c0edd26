//! Patient record endpoints.
//!
//! Staff see every patient; a patient account only sees the records it
//! created. Deletion is reserved for admins.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use netram_common::entities::{Patient, Role};
use netram_common::forms::PatientForm;
use netram_common::validation::Validate;
use netram_db::PatientScope;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::state::{AppEvent, SharedState};

#[derive(Debug, Default, Deserialize)]
pub struct PatientListQuery {
    pub search: Option<String>,
}

pub(crate) fn scope_for(user: &AuthUser) -> PatientScope {
    if user.role().is_staff() {
        PatientScope::All
    } else {
        PatientScope::OwnedBy(user.uid().to_string())
    }
}

pub(crate) fn can_access(user: &AuthUser, patient: &Patient) -> bool {
    user.role().is_staff() || patient.user_id == user.uid()
}

pub(crate) async fn load_patient(state: &SharedState, id: &str) -> ApiResult<Patient> {
    state.patients()
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Patient {id} not found")))
}

/// GET /api/patients?search=
pub async fn list_patients(
    State(state): State<SharedState>,
    user: AuthUser,
    ApiQuery(q): ApiQuery<PatientListQuery>,
) -> ApiResult<Json<Vec<Patient>>> {
    let search = q.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let patients = state.patients().list(&scope_for(&user), search).await?;
    Ok(Json(patients))
}

/// POST /api/patients
pub async fn create_patient(
    State(state): State<SharedState>,
    user: AuthUser,
    ApiJson(form): ApiJson<PatientForm>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    form.validate()?;
    let patient = state.patients().insert(&form.into_patient(user.uid())).await?;
    info!(patient_id = %patient.id, by = %user.uid(), "Patient registered");
    state.publish(AppEvent::PatientRegistered {
        patient_id: patient.id.clone(),
        name: patient.name.clone(),
    });
    Ok((StatusCode::CREATED, Json(patient)))
}

/// GET /api/patients/{id}
pub async fn get_patient(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Patient>> {
    let patient = load_patient(&state, &id).await?;
    if !can_access(&user, &patient) {
        return Err(ApiError::forbidden());
    }
    Ok(Json(patient))
}

/// PUT /api/patients/{id}
pub async fn update_patient(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(form): ApiJson<PatientForm>,
) -> ApiResult<Json<Patient>> {
    form.validate()?;
    let mut patient = load_patient(&state, &id).await?;
    if !can_access(&user, &patient) {
        return Err(ApiError::forbidden());
    }
    form.apply_to(&mut patient);
    Ok(Json(state.patients().update(&patient).await?))
}

/// DELETE /api/patients/{id}
pub async fn delete_patient(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    user.require_any(&[Role::Admin])?;
    if !state.patients().delete(&id).await? {
        return Err(ApiError::NotFound(format!("Patient {id} not found")));
    }
    info!(patient_id = %id, "Patient deleted");
    Ok(Json(serde_json::json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use crate::testing::*;
    use axum::http::StatusCode;
    use netram_common::Role;
    use serde_json::json;

    fn patient_form(name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "dob": "1975-04-12",
            "phone": "555-010-2030",
            "tags": "glaucoma, diabetes",
        })
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let app = TestApp::new();
        let staff = app.sign_up("r@clinic.org", Role::Receptionist).await;

        let (status, body) = app.post("/api/patients", Some(&staff), patient_form("John Doe")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["tags"], json!(["glaucoma", "diabetes"]));
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) = app.get(&format!("/api/patients/{id}"), Some(&staff)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "John Doe");

        let (status, _) = app.get("/api/patients/missing", Some(&staff)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_form_lists_fields() {
        let app = TestApp::new();
        let staff = app.sign_up("d@clinic.org", Role::Doctor).await;
        let (status, body) = app.post("/api/patients", Some(&staff), json!({"name": "J"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"]["name"].is_array());
        assert!(body["details"]["dob"].is_array());
    }

    #[tokio::test]
    async fn test_patient_role_sees_only_own_records() {
        let app = TestApp::new();
        let staff = app.sign_up("d@clinic.org", Role::Doctor).await;
        let patient = app.sign_up("p@home.org", Role::Patient).await;

        app.post("/api/patients", Some(&staff), patient_form("Alice Staff")).await;
        let (_, own) = app.post("/api/patients", Some(&patient), patient_form("Bob Self")).await;

        let (_, all) = app.get("/api/patients", Some(&staff)).await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (_, mine) = app.get("/api/patients", Some(&patient)).await;
        let names: Vec<&str> = mine.as_array().unwrap().iter().map(|p| p["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Bob Self"]);

        let (_, staff_list) = app.get("/api/patients?search=alice", Some(&staff)).await;
        let staff_id = staff_list[0]["id"].as_str().unwrap().to_string();
        let (status, _) = app.get(&format!("/api/patients/{staff_id}"), Some(&patient)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let own_id = own["id"].as_str().unwrap();
        let (status, _) = app.get(&format!("/api/patients/{own_id}"), Some(&patient)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_search_by_tag() {
        let app = TestApp::new();
        let staff = app.sign_up("d@clinic.org", Role::Doctor).await;
        app.post("/api/patients", Some(&staff), patient_form("John Doe")).await;
        app.post("/api/patients", Some(&staff), json!({"name": "Jane Roe", "dob": "1980-01-01"})).await;

        let (_, hits) = app.get("/api/patients?search=GLAUC", Some(&staff)).await;
        assert_eq!(hits.as_array().unwrap().len(), 1);
        assert_eq!(hits[0]["name"], "John Doe");
    }

    #[tokio::test]
    async fn test_update_and_admin_only_delete() {
        let app = TestApp::new();
        let doctor = app.sign_up("d@clinic.org", Role::Doctor).await;
        let admin = app.sign_up("a@clinic.org", Role::Admin).await;

        let (_, created) = app.post("/api/patients", Some(&doctor), patient_form("John Doe")).await;
        let id = created["id"].as_str().unwrap().to_string();

        let mut edit = patient_form("John A. Doe");
        edit["medical_history"] = json!("Hypertension");
        let (status, updated) = app.put(&format!("/api/patients/{id}"), Some(&doctor), edit).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "John A. Doe");
        assert_eq!(updated["created_at"], created["created_at"]);

        let (status, _) = app.delete(&format!("/api/patients/{id}"), Some(&doctor)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app.delete(&format!("/api/patients/{id}"), Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.delete(&format!("/api/patients/{id}"), Some(&admin)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_requires_token() {
        let app = TestApp::new();
        let (status, body) = app.get("/api/patients", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required");
    }
}
