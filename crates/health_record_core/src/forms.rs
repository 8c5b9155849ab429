//! crates/health_record_core/src/forms.rs
//!
//! Form state for the data-entry screens and its conversion into request
//! payloads. Everything here runs before a request is sent: a form that does
//! not validate produces `PortError::Validation` and no network call.

use crate::domain::{
    HealthLogEntry, Mood, PainLevel, ProfileUpdate, RegisterRequest, ReportFile, ReportType,
    ReportUpload, UserRole,
};
use crate::ports::{PortError, PortResult};

/// File extensions the upload screen offers.
pub const ALLOWED_REPORT_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "doc", "docx"];

/// Advertised upload size limit (10 MiB).
pub const MAX_REPORT_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Inclusive bounds for the 1 to 10 self-assessment scales.
pub const SCALE_MIN: i32 = 1;
pub const SCALE_MAX: i32 = 10;

/// The server rejects shorter passwords at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

//=========================================================================================
// Daily Health Log
//=========================================================================================

/// The health log form as the user edits it. Numeric vitals are free text.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthLogForm {
    pub patient_name: String,
    pub doctor_name: String,
    pub temperature: String,
    pub blood_pressure_systolic: String,
    pub blood_pressure_diastolic: String,
    pub has_fever: bool,
    pub has_cough: bool,
    pub has_headache: bool,
    pub has_fatigue: bool,
    pub has_body_pain: bool,
    pub has_nausea: bool,
    pub mood: Mood,
    pub pain_level: PainLevel,
    pub sleep_hours: String,
    pub sleep_quality: i32,
    pub stress_level: i32,
    pub anxiety_level: i32,
    pub notes: String,
}

impl Default for HealthLogForm {
    fn default() -> Self {
        Self {
            patient_name: String::new(),
            doctor_name: String::new(),
            temperature: "37.0".to_string(),
            blood_pressure_systolic: "120".to_string(),
            blood_pressure_diastolic: "80".to_string(),
            has_fever: false,
            has_cough: false,
            has_headache: false,
            has_fatigue: false,
            has_body_pain: false,
            has_nausea: false,
            mood: Mood::Okay,
            pain_level: PainLevel::None,
            sleep_hours: "7.5".to_string(),
            sleep_quality: 5,
            stress_level: 5,
            anxiety_level: 5,
            notes: String::new(),
        }
    }
}

impl HealthLogForm {
    /// Builds the request body. Blank numeric fields become absent.
    pub fn to_entry(&self) -> PortResult<HealthLogEntry> {
        Ok(HealthLogEntry {
            patient_name: non_blank(&self.patient_name),
            doctor_name: non_blank(&self.doctor_name),
            temperature: parse_optional::<f64>(&self.temperature, "Temperature")?,
            blood_pressure_systolic: parse_optional::<i32>(
                &self.blood_pressure_systolic,
                "Systolic blood pressure",
            )?,
            blood_pressure_diastolic: parse_optional::<i32>(
                &self.blood_pressure_diastolic,
                "Diastolic blood pressure",
            )?,
            has_fever: self.has_fever,
            has_cough: self.has_cough,
            has_headache: self.has_headache,
            has_fatigue: self.has_fatigue,
            has_body_pain: self.has_body_pain,
            has_nausea: self.has_nausea,
            mood: self.mood,
            pain_level: self.pain_level,
            sleep_hours: parse_optional::<f64>(&self.sleep_hours, "Sleep hours")?,
            sleep_quality: check_scale(self.sleep_quality, "Sleep quality")?,
            stress_level: check_scale(self.stress_level, "Stress level")?,
            anxiety_level: check_scale(self.anxiety_level, "Anxiety level")?,
            notes: non_blank(&self.notes),
        })
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

trait FiniteCheck {
    fn is_usable(&self) -> bool;
}

impl FiniteCheck for f64 {
    fn is_usable(&self) -> bool {
        self.is_finite()
    }
}

impl FiniteCheck for i32 {
    fn is_usable(&self) -> bool {
        true
    }
}

fn parse_optional<T>(raw: &str, label: &str) -> PortResult<Option<T>>
where
    T: std::str::FromStr + FiniteCheck,
{
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<T>() {
        Ok(value) if value.is_usable() => Ok(Some(value)),
        _ => Err(PortError::Validation(format!("{} must be a number", label))),
    }
}

fn check_scale(value: i32, label: &str) -> PortResult<i32> {
    if (SCALE_MIN..=SCALE_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(PortError::Validation(format!(
            "{} must be between {} and {}",
            label, SCALE_MIN, SCALE_MAX
        )))
    }
}

//=========================================================================================
// Report Upload
//=========================================================================================

/// A non-blocking remark about a picked file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadAdvisory {
    UnsupportedExtension(String),
    TooLarge { bytes: usize },
}

impl std::fmt::Display for UploadAdvisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadAdvisory::UnsupportedExtension(ext) => write!(
                f,
                "'.{}' is not a supported file type (PDF, images, Word documents)",
                ext
            ),
            UploadAdvisory::TooLarge { bytes } => write!(
                f,
                "file is {:.1} MB, larger than the 10 MB limit",
                *bytes as f64 / (1024.0 * 1024.0)
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportUploadForm {
    pub report_type: ReportType,
    pub title: String,
    pub description: String,
    pub doctor_name: String,
    pub hospital_name: String,
    pub diagnosis: String,
    pub file: Option<ReportFile>,
}

impl ReportUploadForm {
    /// Checks the required fields and builds the upload.
    pub fn validate(&self) -> PortResult<ReportUpload> {
        let file = self
            .file
            .clone()
            .ok_or_else(|| PortError::Validation("Please select a file".to_string()))?;
        let title = non_blank(&self.title)
            .ok_or_else(|| PortError::Validation("Please enter a title".to_string()))?;

        Ok(ReportUpload {
            report_type: self.report_type,
            title,
            description: non_blank(&self.description),
            doctor_name: non_blank(&self.doctor_name),
            hospital_name: non_blank(&self.hospital_name),
            diagnosis: non_blank(&self.diagnosis),
            file,
        })
    }

    /// Type and size remarks. These are advisory and never block an upload.
    pub fn advisories(&self) -> Vec<UploadAdvisory> {
        let Some(file) = &self.file else {
            return Vec::new();
        };

        let mut advisories = Vec::new();
        match file.extension() {
            Some(ext) if ALLOWED_REPORT_EXTENSIONS.contains(&ext.as_str()) => {}
            Some(ext) => advisories.push(UploadAdvisory::UnsupportedExtension(ext)),
            None => advisories.push(UploadAdvisory::UnsupportedExtension(String::new())),
        }
        if file.bytes.len() > MAX_REPORT_FILE_BYTES {
            advisories.push(UploadAdvisory::TooLarge {
                bytes: file.bytes.len(),
            });
        }
        advisories
    }
}

//=========================================================================================
// Profile
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileForm {
    pub full_name: String,
    pub phone: String,
}

impl ProfileForm {
    pub fn to_update(&self) -> PortResult<ProfileUpdate> {
        let full_name = non_blank(&self.full_name)
            .ok_or_else(|| PortError::Validation("Please enter your full name".to_string()))?;
        Ok(ProfileUpdate {
            full_name: Some(full_name),
            phone: non_blank(&self.phone),
        })
    }
}

//=========================================================================================
// Registration
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub role: UserRole,
}

impl RegistrationForm {
    pub fn to_request(&self) -> PortResult<RegisterRequest> {
        let full_name = non_blank(&self.full_name)
            .ok_or_else(|| PortError::Validation("Please enter your full name".to_string()))?;
        let email = non_blank(&self.email)
            .filter(|e| e.contains('@'))
            .ok_or_else(|| PortError::Validation("Please enter a valid email".to_string()))?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PortError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        Ok(RegisterRequest {
            email,
            password: self.password.clone(),
            full_name,
            phone: non_blank(&self.phone),
            role: self.role,
        })
    }
}
