//! Directory queries behind the portal's list and detail views.
//!
//! Searches are case-insensitive substring matches over a few text fields of
//! each record; a blank term returns the whole collection. Hospitals,
//! diagnostic centers and blood banks are seeded with fixture data the first
//! time their key is read.
//!
//! @author Shastho
//! @copyright 2025

use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{self, keys, StorageError, Store};
use crate::models::{
    generate_id, Appointment, AppointmentStatus, BloodBankProfile, DiagnosticProfile,
    DoctorProfile, Hospital, Prescription, Profile, User,
};
use crate::phone::format_phone_number;

const HOSPITAL_FIXTURES: &str = include_str!("../data/hospitals.json");
const DIAGNOSTIC_FIXTURES: &str = include_str!("../data/diagnostics.json");
const BLOOD_BANK_FIXTURES: &str = include_str!("../data/bloodbanks.json");

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Appointment not found: {0}")]
    AppointmentNotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn fixtures<T: DeserializeOwned>(name: &str, raw: &str) -> Vec<T> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Fixture {} is malformed, seeding nothing: {}", name, e);
        Vec::new()
    })
}

/// True when `term` is blank or occurs in any of `fields`, ignoring case.
fn matches_term<'a>(term: &str, fields: impl IntoIterator<Item = &'a str>) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty()
        || fields
            .into_iter()
            .any(|field| field.to_lowercase().contains(&term))
}

/// Upcoming and past appointments, in stored order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentSplit {
    pub upcoming: Vec<Appointment>,
    pub past: Vec<Appointment>,
}

/// New appointment request.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub date: NaiveDate,
    pub time: String,
    pub problem: Option<String>,
}

#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn Store>,
}

impl Directory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Doctors whose name, specialization or hospital matches `term`.
    pub async fn doctors(&self, term: &str) -> Result<Vec<DoctorProfile>, DirectoryError> {
        let doctors: Vec<DoctorProfile> = db::load_list(self.store(), keys::DOCTORS).await?;
        Ok(doctors
            .into_iter()
            .filter(|d| {
                matches_term(
                    term,
                    [d.name.as_str(), d.specialization.as_str(), d.hospital.as_str()],
                )
            })
            .collect())
    }

    /// Hospitals whose name, address or any specialty matches `term`.
    pub async fn hospitals(&self, term: &str) -> Result<Vec<Hospital>, DirectoryError> {
        let hospitals: Vec<Hospital> = db::load_list_or_seed(self.store(), keys::HOSPITALS, || {
            fixtures("hospitals", HOSPITAL_FIXTURES)
        })
        .await?;
        Ok(hospitals
            .into_iter()
            .filter(|h| {
                matches_term(
                    term,
                    [h.name.as_str(), h.address.as_str()]
                        .into_iter()
                        .chain(h.specialties.iter().map(String::as_str)),
                )
            })
            .collect())
    }

    /// Diagnostic centers whose name, address or any service matches `term`.
    pub async fn diagnostics(&self, term: &str) -> Result<Vec<DiagnosticProfile>, DirectoryError> {
        let centers: Vec<DiagnosticProfile> =
            db::load_list_or_seed(self.store(), keys::DIAGNOSTICS, || {
                fixtures("diagnostics", DIAGNOSTIC_FIXTURES)
            })
            .await?;
        Ok(centers
            .into_iter()
            .filter(|c| {
                matches_term(
                    term,
                    [c.name.as_str(), c.address.as_str()]
                        .into_iter()
                        .chain(c.services.iter().map(String::as_str)),
                )
            })
            .collect())
    }

    /// Blood banks whose name or address matches `term`.
    pub async fn blood_banks(&self, term: &str) -> Result<Vec<BloodBankProfile>, DirectoryError> {
        let banks: Vec<BloodBankProfile> =
            db::load_list_or_seed(self.store(), keys::BLOOD_BANKS, || {
                fixtures("bloodbanks", BLOOD_BANK_FIXTURES)
            })
            .await?;
        Ok(banks
            .into_iter()
            .filter(|b| matches_term(term, [b.name.as_str(), b.address.as_str()]))
            .collect())
    }

    /// Splits a patient's appointments around `today`.
    ///
    /// Upcoming: dated today or later and pending or confirmed. Past: dated
    /// before today, or cancelled.
    pub async fn appointments_for(
        &self,
        patient_id: &str,
        today: NaiveDate,
    ) -> Result<AppointmentSplit, DirectoryError> {
        let appointments: Vec<Appointment> =
            db::load_list(self.store(), keys::APPOINTMENTS).await?;

        let (upcoming, past): (Vec<Appointment>, Vec<Appointment>) = appointments
            .into_iter()
            .filter(|a| a.patient_id == patient_id)
            .partition(|a| a.is_upcoming(today));
        Ok(AppointmentSplit { upcoming, past })
    }

    /// Records a pending appointment with a doctor.
    pub async fn book_appointment(
        &self,
        request: BookingRequest,
    ) -> Result<Appointment, DirectoryError> {
        let doctor = self
            .doctors("")
            .await?
            .into_iter()
            .find(|d| d.id == request.doctor_id);

        let appointment = Appointment {
            id: generate_id("appt"),
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            doctor_name: doctor.as_ref().map(|d| d.name.clone()),
            specialty: doctor.as_ref().map(|d| d.specialization.clone()),
            hospital: doctor.as_ref().map(|d| d.hospital.clone()),
            date: request.date,
            time: request.time,
            status: AppointmentStatus::Pending,
            problem: request.problem.filter(|p| !p.trim().is_empty()),
        };

        db::push_to_list(self.store(), keys::APPOINTMENTS, appointment.clone()).await?;
        info!(
            "Booked appointment {} with doctor {} on {}",
            appointment.id, appointment.doctor_id, appointment.date
        );
        Ok(appointment)
    }

    /// Marks an appointment cancelled; it then counts as past.
    pub async fn cancel_appointment(&self, appointment_id: &str) -> Result<(), DirectoryError> {
        let mut appointments: Vec<Appointment> =
            db::load_list(self.store(), keys::APPOINTMENTS).await?;

        let appointment = appointments
            .iter_mut()
            .find(|a| a.id == appointment_id)
            .ok_or_else(|| DirectoryError::AppointmentNotFound(appointment_id.to_string()))?;
        appointment.status = AppointmentStatus::Cancelled;

        db::save_list(self.store(), keys::APPOINTMENTS, &appointments).await?;
        info!("Cancelled appointment {}", appointment_id);
        Ok(())
    }

    /// A patient's prescriptions, newest first.
    pub async fn prescriptions_for(
        &self,
        patient_id: &str,
    ) -> Result<Vec<Prescription>, DirectoryError> {
        let mut prescriptions: Vec<Prescription> =
            db::load_list(self.store(), keys::PRESCRIPTIONS).await?;
        prescriptions.retain(|p| p.patient_id == patient_id);
        prescriptions.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(prescriptions)
    }

    pub async fn add_prescription(&self, prescription: Prescription) -> Result<(), DirectoryError> {
        info!(
            "Adding prescription {} for patient {}",
            prescription.id, prescription.patient_id
        );
        db::push_to_list(self.store(), keys::PRESCRIPTIONS, prescription).await?;
        Ok(())
    }

    pub async fn profile_for(&self, user: &User) -> Result<Option<Profile>, DirectoryError> {
        Ok(db::find_profile(self.store(), user.role, &user.id).await?)
    }

    /// Name shown on the dashboard: the profile name, then the account name,
    /// then the formatted phone number.
    pub async fn display_name(&self, user: &User) -> Result<String, DirectoryError> {
        let profile_name = self
            .profile_for(user)
            .await?
            .map(|p| p.name().trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(profile_name
            .or_else(|| user.name.clone().filter(|n| !n.trim().is_empty()))
            .unwrap_or_else(|| format_phone_number(&user.phone)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{Medication, RegistrationForm, Role};

    fn directory() -> (Directory, MemoryStore) {
        let store = MemoryStore::new();
        (Directory::new(Arc::new(store.clone())), store)
    }

    fn doctor(name: &str, specialization: &str, hospital: &str) -> DoctorProfile {
        let form = RegistrationForm::from_json(
            Role::Doctor,
            &serde_json::json!({
                "name": name,
                "specialization": specialization,
                "degrees": "MBBS",
                "hospital": hospital,
            })
            .to_string(),
        )
        .unwrap();
        match form.into_profile("user_x") {
            Profile::Doctor(d) => d,
            other => panic!("unexpected profile {:?}", other),
        }
    }

    fn appointment(id: &str, date: &str, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: id.into(),
            patient_id: "patient_1".into(),
            doctor_id: "doctor_1".into(),
            doctor_name: None,
            specialty: None,
            hospital: None,
            date: date.parse().unwrap(),
            time: "03:00 PM - 06:00 PM".into(),
            status,
            problem: None,
        }
    }

    #[test]
    fn test_fixtures_parse() {
        assert_eq!(fixtures::<Hospital>("hospitals", HOSPITAL_FIXTURES).len(), 5);
        assert_eq!(fixtures::<DiagnosticProfile>("diagnostics", DIAGNOSTIC_FIXTURES).len(), 1);
        assert_eq!(fixtures::<BloodBankProfile>("bloodbanks", BLOOD_BANK_FIXTURES).len(), 1);
    }

    #[test]
    fn test_matches_term() {
        assert!(matches_term("", ["anything"]));
        assert!(matches_term("  ", ["anything"]));
        assert!(matches_term("CARDIO", ["Cardiology"]));
        assert!(!matches_term("ortho", ["Cardiology", "Neurology"]));
    }

    #[tokio::test]
    async fn test_hospitals_seeded_and_searchable() {
        let (directory, store) = directory();

        assert_eq!(directory.hospitals("").await.unwrap().len(), 5);
        assert!(store.get(keys::HOSPITALS).await.unwrap().is_some());

        let dhanmondi = directory.hospitals("dhanmondi").await.unwrap();
        assert_eq!(dhanmondi.len(), 2);

        let neuro: Vec<String> = directory
            .hospitals("Neurology")
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(neuro, vec!["hosp_2", "hosp_4"]);
    }

    #[tokio::test]
    async fn test_diagnostics_match_services() {
        let (directory, _) = directory();

        assert_eq!(directory.diagnostics("mri").await.unwrap().len(), 1);
        assert!(directory.diagnostics("dialysis").await.unwrap().is_empty());
    }

    #[test]
    fn test_seeded_center_hours_match_registered_default() {
        let form = RegistrationForm::from_json(
            Role::Diagnostic,
            r#"{"name": "Ibn Sina Diagnostic", "address": "Dhanmondi", "contactInfo": "10615"}"#,
        )
        .unwrap();
        let Profile::Diagnostic(registered) = form.into_profile("user_y") else {
            panic!("expected diagnostic profile");
        };

        let seeded = fixtures::<DiagnosticProfile>("diagnostics", DIAGNOSTIC_FIXTURES);
        assert_eq!(seeded[0].operating_hours, registered.operating_hours);
    }

    #[tokio::test]
    async fn test_blood_banks_match_name_and_address() {
        let (directory, _) = directory();

        assert_eq!(directory.blood_banks("sandhani").await.unwrap().len(), 1);
        assert_eq!(directory.blood_banks("medical college").await.unwrap().len(), 1);
        // Services are not searched
        assert!(directory.blood_banks("emergency").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_doctors_are_not_seeded() {
        let (directory, store) = directory();

        assert!(directory.doctors("").await.unwrap().is_empty());
        assert!(store.get(keys::DOCTORS).await.unwrap().is_none());

        let doctors = vec![
            doctor("Dr. Humayun Kabir", "Neurologist", "Apollo Hospital"),
            doctor("Dr. Anjan Bishwas", "Dermatology", "Labaid Hospital"),
        ];
        db::save_list(&store, keys::DOCTORS, &doctors).await.unwrap();

        assert_eq!(directory.doctors("labaid").await.unwrap().len(), 1);
        assert_eq!(directory.doctors("neuro").await.unwrap()[0].name, "Dr. Humayun Kabir");
        assert_eq!(directory.doctors("dr.").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_appointment_partition() {
        let (directory, store) = directory();
        let mut other_patient = appointment("4", "2023-06-20", AppointmentStatus::Pending);
        other_patient.patient_id = "patient_2".into();
        let appointments = vec![
            appointment("1", "2023-06-15", AppointmentStatus::Confirmed),
            appointment("2", "2023-06-22", AppointmentStatus::Pending),
            appointment("3", "2023-05-10", AppointmentStatus::Confirmed),
            appointment("5", "2023-06-30", AppointmentStatus::Cancelled),
            other_patient,
        ];
        db::save_list(&store, keys::APPOINTMENTS, &appointments).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let split = directory.appointments_for("patient_1", today).await.unwrap();

        let ids = |list: &[Appointment]| list.iter().map(|a| a.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&split.upcoming), vec!["1", "2"]);
        assert_eq!(ids(&split.past), vec!["3", "5"]);
    }

    #[tokio::test]
    async fn test_book_and_cancel_appointment() {
        let (directory, store) = directory();
        let doc = doctor("Dr. Abdus Salam", "Orthopedic", "Labaid Hospital");
        db::save_list(&store, keys::DOCTORS, &[doc.clone()]).await.unwrap();

        let booked = directory
            .book_appointment(BookingRequest {
                patient_id: "patient_1".into(),
                doctor_id: doc.id.clone(),
                date: NaiveDate::from_ymd_opt(2023, 7, 1).unwrap(),
                time: "03:00 PM - 06:00 PM".into(),
                problem: Some("Knee pain".into()),
            })
            .await
            .unwrap();
        assert_eq!(booked.status, AppointmentStatus::Pending);
        assert_eq!(booked.doctor_name.as_deref(), Some("Dr. Abdus Salam"));

        let today = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        assert_eq!(directory.appointments_for("patient_1", today).await.unwrap().upcoming.len(), 1);

        directory.cancel_appointment(&booked.id).await.unwrap();
        let split = directory.appointments_for("patient_1", today).await.unwrap();
        assert!(split.upcoming.is_empty());
        assert_eq!(split.past[0].status, AppointmentStatus::Cancelled);

        assert!(matches!(
            directory.cancel_appointment("missing").await,
            Err(DirectoryError::AppointmentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_prescriptions_newest_first() {
        let (directory, _) = directory();
        let prescription = |id: &str, date: &str| Prescription {
            id: id.into(),
            patient_id: "patient_1".into(),
            doctor_id: "doctor_1".into(),
            doctor_name: Some("Dr. Humayun Kabir".into()),
            date: date.parse().unwrap(),
            diagnosis: "Common Cold".into(),
            medications: vec![Medication {
                name: "Paracetamol 500mg".into(),
                dosage: "1 tablet".into(),
                duration: "3 days".into(),
                instruction: "Take if fever".into(),
            }],
            advice: "Rest".into(),
            follow_up: None,
        };

        directory.add_prescription(prescription("1", "2023-04-10")).await.unwrap();
        directory.add_prescription(prescription("2", "2023-05-15")).await.unwrap();

        let ids: Vec<String> = directory
            .prescriptions_for("patient_1")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert!(directory.prescriptions_for("patient_9").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_display_name_fallbacks() {
        let (directory, store) = directory();
        let mut user = User::new("01712345678", Role::Doctor);

        assert_eq!(directory.display_name(&user).await.unwrap(), "+88 01712345678");

        user.name = Some("Rahim".into());
        assert_eq!(directory.display_name(&user).await.unwrap(), "Rahim");

        let mut profile = doctor("Dr. Rahim Uddin", "ENT", "DMC");
        profile.user_id = user.id.clone();
        db::save_list(&store, keys::DOCTORS, &[profile]).await.unwrap();
        assert_eq!(directory.display_name(&user).await.unwrap(), "Dr. Rahim Uddin");
    }
}
