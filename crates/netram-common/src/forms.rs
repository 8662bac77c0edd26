//! Submitted form payloads and their validation rules.
//!
//! Forms are what clients send; entities are what the store keeps. Each form
//! knows how to build a fresh entity and how to apply itself to an existing one.

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use crate::entities::{
    invoice_total, Appointment, AppointmentStatus, AppointmentType, EmrRecord, Invoice,
    InvoiceItem, InvoiceStatus, Patient, Prescription, Role,
};
use crate::validation::{blank_to_none, is_valid_email, min_chars, split_tags, Validate, ValidationErrors};

// ── Auth ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Option<Role>,
}

impl SignUpForm {
    pub fn role(&self) -> Role {
        self.role.unwrap_or(Role::Patient)
    }
}

impl Validate for SignUpForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        if !is_valid_email(&self.email) {
            errs.add("email", "Invalid email address.");
        }
        if self.password.chars().count() < 6 {
            errs.add("password", "Password must be at least 6 characters long");
        }
        if !min_chars(&self.name, 2) {
            errs.add("name", "Name is required");
        }
        errs.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for LoginForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        if !is_valid_email(&self.email) {
            errs.add("email", "Invalid email address.");
        }
        if self.password.is_empty() {
            errs.add("password", "Password is required");
        }
        errs.into_result()
    }
}

// ── Patient ──────────────────────────────────────────────────────────────────

/// Tags arrive either as the form's comma-separated string or as a JSON list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    Csv(String),
    List(Vec<String>),
}

impl TagsInput {
    pub fn into_tags(self) -> Vec<String> {
        match self {
            TagsInput::Csv(raw) => split_tags(&raw),
            TagsInput::List(list) => list.iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub emergency_contact_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_phone: Option<String>,
    #[serde(default)]
    pub insurance_provider: Option<String>,
    #[serde(default)]
    pub insurance_policy_number: Option<String>,
    #[serde(default)]
    pub medical_history: Option<String>,
    #[serde(default)]
    pub tags: Option<TagsInput>,
}

impl Validate for PatientForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        if !min_chars(&self.name, 2) {
            errs.add("name", "Name must be at least 2 characters.");
        }
        if self.dob.is_none() {
            errs.add("dob", "Date of birth is required.");
        }
        if let Some(phone) = blank_to_none(self.phone.clone()) {
            if phone.chars().count() < 10 {
                errs.add("phone", "Phone number must be at least 10 digits.");
            }
        }
        if let Some(email) = blank_to_none(self.email.clone()) {
            if !is_valid_email(&email) {
                errs.add("email", "Invalid email address.");
            }
        }
        errs.into_result()
    }
}

impl PatientForm {
    /// Builds a new record owned by `user_id`. Call after `validate`.
    pub fn into_patient(self, user_id: &str) -> Patient {
        let mut patient = Patient {
            id: String::new(),
            name: String::new(),
            dob: NaiveDate::default(),
            phone: None,
            email: None,
            address: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            insurance_provider: None,
            insurance_policy_number: None,
            medical_history: None,
            tags: Vec::new(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };
        self.apply_to(&mut patient);
        patient
    }

    /// Overwrites every editable field; ownership and timestamps are kept.
    pub fn apply_to(self, patient: &mut Patient) {
        patient.name = self.name.trim().to_string();
        if let Some(dob) = self.dob {
            patient.dob = dob;
        }
        patient.phone = blank_to_none(self.phone);
        patient.email = blank_to_none(self.email);
        patient.address = blank_to_none(self.address);
        patient.emergency_contact_name = blank_to_none(self.emergency_contact_name);
        patient.emergency_contact_phone = blank_to_none(self.emergency_contact_phone);
        patient.insurance_provider = blank_to_none(self.insurance_provider);
        patient.insurance_policy_number = blank_to_none(self.insurance_policy_number);
        patient.medical_history = blank_to_none(self.medical_history);
        patient.tags = self.tags.map(TagsInput::into_tags).unwrap_or_default();
    }
}

// ── Appointment ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentForm {
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub doctor_name: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub appointment_type: Option<AppointmentType>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Normalises `9:05` and `09:05` to `09:05`.
pub fn normalize_time(raw: &str) -> Option<String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .ok()
        .map(|t| t.format("%H:%M").to_string())
}

impl Validate for AppointmentForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        if !min_chars(&self.patient_name, 2) {
            errs.add("patient_name", "Patient name is required.");
        }
        if !min_chars(&self.doctor_name, 2) {
            errs.add("doctor_name", "Doctor name is required.");
        }
        if self.date.is_none() {
            errs.add("date", "Appointment date is required.");
        }
        if normalize_time(&self.time).is_none() {
            errs.add("time", "Time must be in HH:MM format.");
        }
        errs.into_result()
    }
}

impl AppointmentForm {
    pub fn into_appointment(self) -> Appointment {
        Appointment {
            id: String::new(),
            patient_id: blank_to_none(self.patient_id),
            patient_name: self.patient_name.trim().to_string(),
            doctor_name: self.doctor_name.trim().to_string(),
            date: self.date.unwrap_or_default(),
            time: normalize_time(&self.time).unwrap_or(self.time),
            appointment_type: self.appointment_type.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            notes: blank_to_none(self.notes),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Status is only replaced when the form names one.
    pub fn apply_to(self, appt: &mut Appointment) {
        let status = self.status.unwrap_or(appt.status);
        let created_at = appt.created_at;
        let id = std::mem::take(&mut appt.id);
        *appt = self.into_appointment();
        appt.id = id;
        appt.status = status;
        appt.created_at = created_at;
    }
}

// ── Billing ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceForm {
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
}

impl Validate for InvoiceForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        if self.patient_id.trim().is_empty() {
            errs.add("patient_id", "Patient is required.");
        }
        if !min_chars(&self.patient_name, 2) {
            errs.add("patient_name", "Patient name is required.");
        }
        if self.items.is_empty() {
            errs.add("items", "At least one line item is required.");
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.description.trim().is_empty() {
                errs.add(&format!("items[{i}].description"), "Description is required.");
            }
            if item.amount_cents < 0 {
                errs.add(&format!("items[{i}].amount_cents"), "Amount cannot be negative.");
            }
        }
        if invoice_total(&self.items).is_none() {
            errs.add("items", "Invoice total is too large.");
        }
        errs.into_result()
    }
}

impl InvoiceForm {
    pub fn into_invoice(self) -> Invoice {
        // Overflow is rejected by `validate`.
        let amount_cents = invoice_total(&self.items).unwrap_or(i64::MAX);
        Invoice {
            id: String::new(),
            patient_id: self.patient_id.trim().to_string(),
            patient_name: self.patient_name.trim().to_string(),
            items: self.items,
            amount_cents,
            status: self.status.unwrap_or_default(),
            date: self.date.unwrap_or_else(|| Utc::now().date_naive()),
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

// ── EMR ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct EmrForm {
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub visit_date: Option<NaiveDate>,
    #[serde(default)]
    pub chief_complaint: String,
    #[serde(default)]
    pub findings: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Validate for EmrForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        if self.patient_id.trim().is_empty() {
            errs.add("patient_id", "Patient is required.");
        }
        if self.chief_complaint.trim().is_empty() {
            errs.add("chief_complaint", "Chief complaint is required.");
        }
        for (i, rx) in self.prescriptions.iter().enumerate() {
            if rx.medication.trim().is_empty() {
                errs.add(&format!("prescriptions[{i}].medication"), "Medication is required.");
            }
        }
        errs.into_result()
    }
}

impl EmrForm {
    pub fn into_record(self, author_id: &str) -> EmrRecord {
        EmrRecord {
            id: String::new(),
            patient_id: self.patient_id.trim().to_string(),
            author_id: author_id.to_string(),
            visit_date: self.visit_date.unwrap_or_else(|| Utc::now().date_naive()),
            chief_complaint: self.chief_complaint.trim().to_string(),
            findings: blank_to_none(self.findings),
            diagnosis: blank_to_none(self.diagnosis),
            prescriptions: self.prescriptions,
            notes: blank_to_none(self.notes),
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}
