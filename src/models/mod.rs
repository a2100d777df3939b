//! Domain records shared by the session and directory layers.
//!
//! Records are serialized with camelCase field names so the persisted JSON
//! matches the layout the portal front end reads.
//!
//! @author Shastho
//! @copyright 2025

pub mod profile;
pub mod records;

pub use profile::{
    BloodBankProfile, BloodTypeCount, Chamber, DiagnosticProfile, DoctorForm, DoctorProfile,
    FacilityForm, PatientForm, PatientProfile, Profile, RegistrationForm, UserOwned,
};
pub use records::{Appointment, AppointmentStatus, Hospital, Medication, Prescription};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account category. Determines the profile schema and the dashboard a
/// user lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Diagnostic,
    BloodBank,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Patient, Role::Doctor, Role::Diagnostic, Role::BloodBank];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Diagnostic => "diagnostic",
            Role::BloodBank => "bloodbank",
        }
    }

    /// Registration form the caller should show once this role is picked.
    pub fn registration_route(&self) -> Route {
        match self {
            Role::Patient => Route::RegisterPatient,
            Role::Doctor => Route::RegisterDoctor,
            Role::Diagnostic => Route::RegisterDiagnostic,
            Role::BloodBank => Route::RegisterBloodBank,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Step of the sign-in and registration funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Phone,
    Otp,
    Role,
    Complete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Phone => "phone",
            Phase::Otp => "otp",
            Phase::Role => "role",
            Phase::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Where the caller should navigate after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    RegisterPatient,
    RegisterDoctor,
    RegisterDiagnostic,
    RegisterBloodBank,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::RegisterPatient => "/register/patient",
            Route::RegisterDoctor => "/register/doctor",
            Route::RegisterDiagnostic => "/register/diagnostic",
            Route::RegisterBloodBank => "/register/bloodbank",
            Route::Dashboard => "/dashboard",
        }
    }
}

/// Persisted account record. `id` is assigned at role selection and never
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub phone: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

impl User {
    pub fn new(phone: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id("user"),
            phone: phone.into(),
            role,
            name: None,
            email: None,
            created_at: now,
            last_login_at: now,
        }
    }
}

/// Builds an identifier of the form `<prefix>_<unix millis>_<8 hex chars>`.
///
/// The time component keeps ids roughly creation-ordered; the random suffix
/// keeps two ids minted in the same millisecond apart.
pub fn generate_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), &suffix[..8])
}
