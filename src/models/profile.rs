//! Role-specific profiles and the registration forms that produce them.

use serde::{Deserialize, Serialize};

use super::{generate_id, Role};

/// Rating a newly registered doctor starts with.
pub const DEFAULT_DOCTOR_RATING: f32 = 4.8;
/// Consultation fee used when the form leaves it blank.
pub const DEFAULT_DOCTOR_FEE: u32 = 1200;

const DIAGNOSTIC_SERVICES: [&str; 5] = [
    "Blood tests (CBC, Lipid Profile, Blood Sugar, etc.)",
    "Imaging services (X-ray, Ultrasound, CT Scan, MRI)",
    "ECG and Echocardiography",
    "Endoscopy and Colonoscopy",
    "Pathology and Histopathology",
];
const DIAGNOSTIC_HOURS: &str = "8 AM\u{2013}10 PM (Daily)";

const BLOOD_BANK_SERVICES: [&str; 3] = [
    "Voluntary blood donation",
    "Blood storage",
    "Emergency blood supply",
];
const BLOOD_BANK_HOURS: &str = "24/7";
const BLOOD_BANK_INVENTORY: [(&str, u32); 8] = [
    ("A+", 25),
    ("B+", 30),
    ("O+", 50),
    ("AB+", 10),
    ("A-", 5),
    ("B-", 8),
    ("O-", 15),
    ("AB-", 3),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub blood_group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default)]
    pub is_blood_donor: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chamber {
    pub location: String,
    pub schedule: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub specialization: String,
    pub degrees: String,
    pub hospital: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub contact_info: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub chambers: Vec<Chamber>,
    pub rating: f32,
    pub fee: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticProfile {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub address: String,
    pub contact_info: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub operating_hours: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodTypeCount {
    #[serde(rename = "type")]
    pub blood_type: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodBankProfile {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub address: String,
    pub contact_info: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub blood_types: Vec<BloodTypeCount>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub operating_hours: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Records that carry a back-reference to the owning user.
pub trait UserOwned {
    fn owner_id(&self) -> &str;
}

macro_rules! impl_user_owned {
    ($($profile:ty),+) => {
        $(impl UserOwned for $profile {
            fn owner_id(&self) -> &str {
                &self.user_id
            }
        })+
    };
}

impl_user_owned!(PatientProfile, DoctorProfile, DiagnosticProfile, BloodBankProfile);

/// A stored profile, tagged by the role whose collection it lives in.
#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
    Patient(PatientProfile),
    Doctor(DoctorProfile),
    Diagnostic(DiagnosticProfile),
    BloodBank(BloodBankProfile),
}

impl Profile {
    pub fn role(&self) -> Role {
        match self {
            Profile::Patient(_) => Role::Patient,
            Profile::Doctor(_) => Role::Doctor,
            Profile::Diagnostic(_) => Role::Diagnostic,
            Profile::BloodBank(_) => Role::BloodBank,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Profile::Patient(p) => &p.id,
            Profile::Doctor(p) => &p.id,
            Profile::Diagnostic(p) => &p.id,
            Profile::BloodBank(p) => &p.id,
        }
    }

    /// Back-reference to the owning user.
    pub fn user_id(&self) -> &str {
        match self {
            Profile::Patient(p) => &p.user_id,
            Profile::Doctor(p) => &p.user_id,
            Profile::Diagnostic(p) => &p.user_id,
            Profile::BloodBank(p) => &p.user_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Profile::Patient(p) => &p.name,
            Profile::Doctor(p) => &p.name,
            Profile::Diagnostic(p) => &p.name,
            Profile::BloodBank(p) => &p.name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientForm {
    pub name: String,
    pub age: Option<u32>,
    pub gender: String,
    pub blood_group: String,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub is_blood_donor: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DoctorForm {
    pub name: String,
    pub email: Option<String>,
    pub specialization: String,
    pub degrees: String,
    pub hospital: String,
    pub experience: String,
    pub contact_info: String,
    pub location: String,
    pub chambers: Vec<Chamber>,
    pub fee: Option<u32>,
}

/// Form shared by diagnostic centers and blood banks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FacilityForm {
    pub name: String,
    pub address: String,
    pub contact_info: String,
    pub email: String,
    pub description: String,
    pub website: Option<String>,
}

/// Registration payload submitted after role selection, one shape per role.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationForm {
    Patient(PatientForm),
    Doctor(DoctorForm),
    Diagnostic(FacilityForm),
    BloodBank(FacilityForm),
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !blank(v))
}

impl RegistrationForm {
    /// Parses a camelCase JSON payload into the form shape for `role`.
    pub fn from_json(role: Role, json: &str) -> serde_json::Result<Self> {
        Ok(match role {
            Role::Patient => RegistrationForm::Patient(serde_json::from_str(json)?),
            Role::Doctor => RegistrationForm::Doctor(serde_json::from_str(json)?),
            Role::Diagnostic => RegistrationForm::Diagnostic(serde_json::from_str(json)?),
            Role::BloodBank => RegistrationForm::BloodBank(serde_json::from_str(json)?),
        })
    }

    pub fn role(&self) -> Role {
        match self {
            RegistrationForm::Patient(_) => Role::Patient,
            RegistrationForm::Doctor(_) => Role::Doctor,
            RegistrationForm::Diagnostic(_) => Role::Diagnostic,
            RegistrationForm::BloodBank(_) => Role::BloodBank,
        }
    }

    /// Display name carried by the form, if filled in.
    pub fn name(&self) -> Option<&str> {
        let name = match self {
            RegistrationForm::Patient(f) => &f.name,
            RegistrationForm::Doctor(f) => &f.name,
            RegistrationForm::Diagnostic(f) | RegistrationForm::BloodBank(f) => &f.name,
        };
        let name = name.trim();
        (!name.is_empty()).then_some(name)
    }

    /// Required fields that are empty, using their wire names.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let mut require = |empty: bool, field: &'static str| {
            if empty {
                missing.push(field);
            }
        };

        match self {
            RegistrationForm::Patient(f) => {
                require(blank(&f.name), "name");
                require(matches!(f.age, None | Some(0)), "age");
                require(blank(&f.gender), "gender");
                require(blank(&f.blood_group), "bloodGroup");
            }
            RegistrationForm::Doctor(f) => {
                require(blank(&f.name), "name");
                require(blank(&f.specialization), "specialization");
                require(blank(&f.degrees), "degrees");
                require(blank(&f.hospital), "hospital");
            }
            RegistrationForm::Diagnostic(f) | RegistrationForm::BloodBank(f) => {
                require(blank(&f.name), "name");
                require(blank(&f.address), "address");
                require(blank(&f.contact_info), "contactInfo");
            }
        }

        missing
    }

    /// Builds the stored profile owned by `user_id`, filling role defaults.
    ///
    /// Callers validate with [`RegistrationForm::missing_fields`] first; an
    /// unset patient age is stored as `0`.
    pub fn into_profile(self, user_id: &str) -> Profile {
        let id = generate_id(self.role().as_str());
        let user_id = user_id.to_string();

        match self {
            RegistrationForm::Patient(f) => Profile::Patient(PatientProfile {
                id,
                user_id,
                name: f.name.trim().to_string(),
                age: f.age.unwrap_or_default(),
                gender: f.gender,
                blood_group: f.blood_group,
                height: non_blank(f.height),
                weight: non_blank(f.weight),
                is_blood_donor: f.is_blood_donor,
            }),
            RegistrationForm::Doctor(f) => Profile::Doctor(DoctorProfile {
                id,
                user_id,
                name: f.name.trim().to_string(),
                email: non_blank(f.email),
                specialization: f.specialization,
                degrees: f.degrees,
                hospital: f.hospital,
                experience: f.experience,
                contact_info: f.contact_info,
                location: f.location,
                chambers: f
                    .chambers
                    .into_iter()
                    .filter(|c| !blank(&c.location) || !blank(&c.schedule))
                    .collect(),
                rating: DEFAULT_DOCTOR_RATING,
                fee: f.fee.filter(|fee| *fee > 0).unwrap_or(DEFAULT_DOCTOR_FEE),
            }),
            RegistrationForm::Diagnostic(f) => Profile::Diagnostic(DiagnosticProfile {
                id,
                user_id,
                name: f.name.trim().to_string(),
                address: f.address,
                contact_info: f.contact_info,
                email: f.email,
                description: f.description,
                services: DIAGNOSTIC_SERVICES.iter().map(|s| s.to_string()).collect(),
                operating_hours: DIAGNOSTIC_HOURS.to_string(),
                website: non_blank(f.website),
            }),
            RegistrationForm::BloodBank(f) => Profile::BloodBank(BloodBankProfile {
                id,
                user_id,
                name: f.name.trim().to_string(),
                address: f.address,
                contact_info: f.contact_info,
                email: f.email,
                description: f.description,
                blood_types: BLOOD_BANK_INVENTORY
                    .iter()
                    .map(|(blood_type, count)| BloodTypeCount {
                        blood_type: blood_type.to_string(),
                        count: *count,
                    })
                    .collect(),
                services: BLOOD_BANK_SERVICES.iter().map(|s| s.to_string()).collect(),
                operating_hours: BLOOD_BANK_HOURS.to_string(),
                website: non_blank(f.website),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient_form() -> RegistrationForm {
        RegistrationForm::Patient(PatientForm {
            name: "Karim".into(),
            age: Some(30),
            gender: "male".into(),
            blood_group: "B+".into(),
            ..Default::default()
        })
    }

    #[test]
    fn test_patient_form_from_json() {
        let json = r#"{"name": "Karim", "age": 30, "gender": "male", "bloodGroup": "B+"}"#;
        let form = RegistrationForm::from_json(Role::Patient, json).unwrap();

        assert_eq!(form, patient_form());
        assert!(form.missing_fields().is_empty());
        assert_eq!(form.name(), Some("Karim"));
    }

    #[test]
    fn test_missing_required_fields() {
        let form = RegistrationForm::Patient(PatientForm {
            name: "  ".into(),
            gender: "female".into(),
            ..Default::default()
        });
        assert_eq!(form.missing_fields(), vec!["name", "age", "bloodGroup"]);
        assert_eq!(form.name(), None);

        let form = RegistrationForm::BloodBank(FacilityForm {
            name: "Sandhani".into(),
            ..Default::default()
        });
        assert_eq!(form.missing_fields(), vec!["address", "contactInfo"]);

        let form = RegistrationForm::Doctor(DoctorForm {
            name: "Dr. Rahman".into(),
            specialization: "Cardiology".into(),
            ..Default::default()
        });
        assert_eq!(form.missing_fields(), vec!["degrees", "hospital"]);
    }

    #[test]
    fn test_zero_age_counts_as_missing() {
        let RegistrationForm::Patient(mut form) = patient_form() else {
            unreachable!();
        };
        form.age = Some(0);

        assert_eq!(RegistrationForm::Patient(form).missing_fields(), vec!["age"]);
    }

    #[test]
    fn test_diagnostic_defaults() {
        let form = RegistrationForm::Diagnostic(FacilityForm {
            name: "Popular Diagnostic Centre".into(),
            address: "Dhanmondi, Dhaka".into(),
            contact_info: "10636".into(),
            ..Default::default()
        });

        let Profile::Diagnostic(center) = form.into_profile("user_4") else {
            panic!("expected diagnostic profile");
        };
        assert_eq!(center.operating_hours, "8 AM\u{2013}10 PM (Daily)");
        assert_eq!(center.services.len(), 5);
    }

    #[test]
    fn test_patient_profile_back_reference() {
        let profile = patient_form().into_profile("user_1");

        assert_eq!(profile.role(), Role::Patient);
        assert_eq!(profile.user_id(), "user_1");
        assert!(profile.id().starts_with("patient_"));
        assert_eq!(profile.name(), "Karim");
    }

    #[test]
    fn test_doctor_defaults() {
        let form = RegistrationForm::Doctor(DoctorForm {
            name: "Dr. Rahman".into(),
            specialization: "Cardiology".into(),
            degrees: "MBBS, FCPS".into(),
            hospital: "Square Hospital".into(),
            chambers: vec![Chamber {
                location: String::new(),
                schedule: String::new(),
            }],
            fee: Some(0),
            ..Default::default()
        });

        let Profile::Doctor(doctor) = form.into_profile("user_2") else {
            panic!("expected doctor profile");
        };
        assert_eq!(doctor.fee, DEFAULT_DOCTOR_FEE);
        assert_eq!(doctor.rating, DEFAULT_DOCTOR_RATING);
        assert!(doctor.chambers.is_empty());
    }

    #[test]
    fn test_blood_bank_defaults() {
        let form = RegistrationForm::BloodBank(FacilityForm {
            name: "Sandhani".into(),
            address: "Dhaka Medical College Campus".into(),
            contact_info: "+880-2-9668690".into(),
            website: Some(String::new()),
            ..Default::default()
        });

        let Profile::BloodBank(bank) = form.into_profile("user_3") else {
            panic!("expected blood bank profile");
        };
        assert_eq!(bank.blood_types.len(), 8);
        assert_eq!(bank.operating_hours, "24/7");
        assert_eq!(bank.services.len(), 3);
        assert!(bank.website.is_none());

        let json = serde_json::to_string(&bank).unwrap();
        assert!(json.contains("\"type\":\"O+\""));
        assert!(json.contains("\"userId\":\"user_3\""));
    }
}
