/// Core entity types stored in the clinic document store.
/// Every record carries a store-assigned `id` plus `created_at` / `updated_at`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Receptionist,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient      => "patient",
            Role::Doctor       => "doctor",
            Role::Receptionist => "receptionist",
            Role::Admin        => "admin",
        }
    }

    /// Admins, doctors and receptionists.
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Patient)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient"      => Ok(Role::Patient),
            "doctor"       => Ok(Role::Doctor),
            "receptionist" => Ok(Role::Receptionist),
            "admin"        => Ok(Role::Admin),
            other          => Err(format!("unknown role '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// User profile
// ---------------------------------------------------------------------------

/// Account profile. Onboarding flags only apply to the role they belong to
/// and are `None` for every other role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    #[serde(default)]
    pub first_login_pending: bool,
    #[serde(default)]
    pub license_verified: Option<bool>,
    #[serde(default)]
    pub profile_complete: Option<bool>,
    #[serde(default)]
    pub consent_signed: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Fresh profile with the onboarding steps each role starts with.
    pub fn new(uid: String, email: String, display_name: String, role: Role) -> Self {
        Self {
            uid,
            email,
            display_name,
            role,
            first_login_pending: role == Role::Admin,
            license_verified: (role == Role::Doctor).then_some(false),
            profile_complete: (role == Role::Patient).then_some(false),
            consent_signed: (role == Role::Patient).then_some(false),
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Patient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub dob: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_policy_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Account that registered this record.
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Patient {
    /// Case-insensitive name or tag match, plain substring match on phone.
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self.phone.as_deref().is_some_and(|p| p.contains(term.trim()))
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

// ---------------------------------------------------------------------------
// Appointment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AppointmentStatus {
    Confirmed,
    #[default]
    Pending,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Pending   => "Pending",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    #[default]
    Consultation,
    FollowUp,
    Scan,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub doctor_name: String,
    pub date: NaiveDate,
    /// 24-hour `HH:MM`, so lexicographic order is chronological.
    pub time: String,
    #[serde(default)]
    pub appointment_type: AppointmentType,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Billing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum InvoiceStatus {
    Paid,
    #[default]
    Pending,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Paid    => "Paid",
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Overdue => "Overdue",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceItem {
    pub description: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    #[serde(default)]
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub items: Vec<InvoiceItem>,
    /// Always the sum of `items`.
    pub amount_cents: i64,
    #[serde(default)]
    pub status: InvoiceStatus,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Sum of the line items, or `None` if it does not fit in an `i64`.
pub fn invoice_total(items: &[InvoiceItem]) -> Option<i64> {
    items.iter().try_fold(0i64, |acc, i| acc.checked_add(i.amount_cents))
}

// ---------------------------------------------------------------------------
// EMR
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    pub medication: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmrRecord {
    #[serde(default)]
    pub id: String,
    pub patient_id: String,
    /// Clinician who wrote the entry.
    pub author_id: String,
    pub visit_date: NaiveDate,
    pub chief_complaint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub findings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(name: &str, phone: Option<&str>, tags: &[&str]) -> Patient {
        Patient {
            id: "p1".into(),
            name: name.into(),
            dob: NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
            phone: phone.map(String::from),
            email: None,
            address: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            insurance_provider: None,
            insurance_policy_number: None,
            medical_history: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            user_id: "u1".into(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_onboarding_flags_per_role() {
        let admin = UserProfile::new("a".into(), "a@x.io".into(), "A".into(), Role::Admin);
        assert!(admin.first_login_pending);
        assert_eq!(admin.license_verified, None);

        let doctor = UserProfile::new("d".into(), "d@x.io".into(), "D".into(), Role::Doctor);
        assert!(!doctor.first_login_pending);
        assert_eq!(doctor.license_verified, Some(false));
        assert_eq!(doctor.consent_signed, None);

        let patient = UserProfile::new("p".into(), "p@x.io".into(), "P".into(), Role::Patient);
        assert_eq!(patient.profile_complete, Some(false));
        assert_eq!(patient.consent_signed, Some(false));

        let desk = UserProfile::new("r".into(), "r@x.io".into(), "R".into(), Role::Receptionist);
        assert!(!desk.first_login_pending);
        assert_eq!(desk.profile_complete, None);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Doctor".parse::<Role>().unwrap(), Role::Doctor);
        assert!("nurse".parse::<Role>().is_err());
        assert!(Role::Receptionist.is_staff());
        assert!(!Role::Patient.is_staff());
    }

    #[test]
    fn test_patient_search_matching() {
        let p = patient("Jane Roe", Some("5551234567"), &["Glaucoma"]);
        assert!(p.matches_search("jane"));
        assert!(p.matches_search("1234"));
        assert!(p.matches_search("glau"));
        assert!(p.matches_search(""));
        assert!(!p.matches_search("cataract"));
    }

    #[test]
    fn test_status_serialization_matches_stored_strings() {
        let json = serde_json::to_string(&AppointmentStatus::Cancelled).unwrap();
        assert_eq!(json, "\"Cancelled\"");
        let json = serde_json::to_string(&AppointmentType::FollowUp).unwrap();
        assert_eq!(json, "\"follow_up\"");
    }

    #[test]
    fn test_invoice_total() {
        let items = vec![
            InvoiceItem { description: "Exam".into(), amount_cents: 15000 },
            InvoiceItem { description: "OCT scan".into(), amount_cents: 5000 },
        ];
        assert_eq!(invoice_total(&items), Some(20000));
    }

    #[test]
    fn test_invoice_total_overflow() {
        let items = vec![
            InvoiceItem { description: "Exam".into(), amount_cents: i64::MAX },
            InvoiceItem { description: "Drops".into(), amount_cents: 1 },
        ];
        assert_eq!(invoice_total(&items), None);
    }
}
