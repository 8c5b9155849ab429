//! crates/health_record_core/src/domain.rs
//!
//! Defines the core data structures exchanged with the health-record API.
//! Field names follow the wire format so the structs serialize directly into
//! request bodies and deserialize from responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Users and Sessions
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Patient,
    Doctor,
    Admin,
}

/// The profile of the signed-in user, as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

impl UserProfile {
    pub fn first_name(&self) -> &str {
        self.full_name.split_whitespace().next().unwrap_or_default()
    }
}

/// An authenticated session. The user and the token only ever exist together.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: UserProfile,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Persisted state has not been read yet.
    Loading,
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response body of a successful login or registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthGrant {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: UserProfile,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Partial profile update; absent fields are left untouched by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedToken {
    pub valid: bool,
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
}

//=========================================================================================
// Health Logs
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Excellent,
    Good,
    #[default]
    Okay,
    Low,
    Depressed,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Excellent => "excellent",
            Mood::Good => "good",
            Mood::Okay => "okay",
            Mood::Low => "low",
            Mood::Depressed => "depressed",
        }
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "excellent" => Ok(Mood::Excellent),
            "good" => Ok(Mood::Good),
            "okay" => Ok(Mood::Okay),
            "low" => Ok(Mood::Low),
            "depressed" => Ok(Mood::Depressed),
            other => Err(format!("unknown mood '{}'", other)),
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PainLevel {
    #[default]
    None,
    Mild,
    Moderate,
    Severe,
    Critical,
}

impl PainLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PainLevel::None => "none",
            PainLevel::Mild => "mild",
            PainLevel::Moderate => "moderate",
            PainLevel::Severe => "severe",
            PainLevel::Critical => "critical",
        }
    }
}

impl FromStr for PainLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(PainLevel::None),
            "mild" => Ok(PainLevel::Mild),
            "moderate" => Ok(PainLevel::Moderate),
            "severe" => Ok(PainLevel::Severe),
            "critical" => Ok(PainLevel::Critical),
            other => Err(format!("unknown pain level '{}'", other)),
        }
    }
}

impl fmt::Display for PainLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The body sent when creating a daily health log.
///
/// Optional fields are serialized as `null` rather than omitted, and the six
/// symptom flags are always sent as booleans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthLogEntry {
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    /// Degrees Celsius.
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub blood_pressure_systolic: Option<i32>,
    #[serde(default)]
    pub blood_pressure_diastolic: Option<i32>,
    #[serde(default)]
    pub has_fever: bool,
    #[serde(default)]
    pub has_cough: bool,
    #[serde(default)]
    pub has_headache: bool,
    #[serde(default)]
    pub has_fatigue: bool,
    #[serde(default)]
    pub has_body_pain: bool,
    #[serde(default)]
    pub has_nausea: bool,
    #[serde(default)]
    pub mood: Mood,
    #[serde(default)]
    pub pain_level: PainLevel,
    #[serde(default)]
    pub sleep_hours: Option<f64>,
    #[serde(default = "default_scale")]
    pub sleep_quality: i32,
    #[serde(default = "default_scale")]
    pub stress_level: i32,
    #[serde(default = "default_scale")]
    pub anxiety_level: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_scale() -> i32 {
    5
}

impl HealthLogEntry {
    /// Names of the symptom flags that are set, in form order.
    pub fn active_symptoms(&self) -> Vec<&'static str> {
        [
            (self.has_fever, "fever"),
            (self.has_cough, "cough"),
            (self.has_headache, "headache"),
            (self.has_fatigue, "fatigue"),
            (self.has_body_pain, "body pain"),
            (self.has_nausea, "nausea"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }
}

/// A health log as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthLog {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, with = "wire_time::option")]
    pub log_date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub entry: HealthLogEntry,
    #[serde(default, with = "wire_time::option")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthLogUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

//=========================================================================================
// Medical Reports
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    #[default]
    LabTest,
    Prescription,
    Xray,
    Mri,
    CtScan,
    Ultrasound,
    MedicalCertificate,
    Vaccination,
    Other,
}

impl ReportType {
    pub const ALL: [ReportType; 9] = [
        ReportType::LabTest,
        ReportType::Prescription,
        ReportType::Xray,
        ReportType::Mri,
        ReportType::CtScan,
        ReportType::Ultrasound,
        ReportType::MedicalCertificate,
        ReportType::Vaccination,
        ReportType::Other,
    ];

    /// The wire value, also used as the multipart form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::LabTest => "lab_test",
            ReportType::Prescription => "prescription",
            ReportType::Xray => "xray",
            ReportType::Mri => "mri",
            ReportType::CtScan => "ct_scan",
            ReportType::Ultrasound => "ultrasound",
            ReportType::MedicalCertificate => "medical_certificate",
            ReportType::Vaccination => "vaccination",
            ReportType::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportType::LabTest => "Lab Test",
            ReportType::Prescription => "Prescription",
            ReportType::Xray => "X-Ray",
            ReportType::Mri => "MRI",
            ReportType::CtScan => "CT Scan",
            ReportType::Ultrasound => "Ultrasound",
            ReportType::MedicalCertificate => "Medical Certificate",
            ReportType::Vaccination => "Vaccination",
            ReportType::Other => "Other",
        }
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ReportType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown report type '{}'", s.trim()))
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalReport {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub report_type: ReportType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "wire_time::option")]
    pub report_date: Option<DateTime<Utc>>,
    pub file_name: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default, with = "wire_time::option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A file picked for upload.
#[derive(Clone, PartialEq)]
pub struct ReportFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ReportFile {
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

impl fmt::Debug for ReportFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Metadata and file for a multipart report upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportUpload {
    pub report_type: ReportType,
    pub title: String,
    pub description: Option<String>,
    pub doctor_name: Option<String>,
    pub hospital_name: Option<String>,
    pub diagnosis: Option<String>,
    pub file: ReportFile,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medications: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

//=========================================================================================
// AI Insights and Assistant
//=========================================================================================

/// Response of a fresh trend analysis.
///
/// `insights` is usually text (optionally with a fenced JSON block) but some
/// deployments return an object directly, so it is kept as a raw value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InsightReport {
    #[serde(default)]
    pub insights: serde_json::Value,
    #[serde(default)]
    pub logs_analyzed: Option<u32>,
    #[serde(default)]
    pub data_points_analyzed: Option<u32>,
    #[serde(default)]
    pub analysis_period_days: Option<u32>,
    #[serde(default)]
    pub analysis_date: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveInsightRequest {
    pub patient_name: String,
    pub log_ids: Vec<String>,
    pub logs_analyzed: u32,
    pub insights_raw: String,
    pub insights: serde_json::Value,
    pub data_points_analyzed: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedInsightAck {
    #[serde(default)]
    pub message: Option<String>,
    pub insight_id: String,
}

/// A previously persisted analysis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SavedInsight {
    pub id: String,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub analyzed_log_ids: Vec<String>,
    #[serde(default)]
    pub logs_analyzed_count: u32,
    #[serde(default, with = "wire_time::option")]
    pub analysis_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trends: Option<serde_json::Value>,
    #[serde(default)]
    pub correlations: Option<serde_json::Value>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub alerts: Option<serde_json::Value>,
    #[serde(default)]
    pub insights_raw: Option<String>,
    #[serde(default)]
    pub data_points_analyzed: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SavedInsightList {
    #[serde(default)]
    pub insights: Vec<SavedInsight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymptomSeverity {
    #[default]
    Mild,
    Moderate,
    Severe,
}

impl FromStr for SymptomSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mild" => Ok(SymptomSeverity::Mild),
            "moderate" => Ok(SymptomSeverity::Moderate),
            "severe" => Ok(SymptomSeverity::Severe),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymptomAdviceRequest {
    pub symptom: String,
    pub severity: SymptomSeverity,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SymptomAdvice {
    #[serde(default)]
    pub symptom: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub advice: Option<String>,
    #[serde(default)]
    pub disclaimer: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_history: Option<Vec<ChatMessage>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SleepAnalysis {
    #[serde(default)]
    pub average_sleep_hours: Option<f64>,
    #[serde(default)]
    pub average_sleep_quality: Option<f64>,
    #[serde(default)]
    pub total_nights_tracked: Option<u32>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub insights: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Counts shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub logs: usize,
    pub reports: usize,
}

//=========================================================================================
// Timestamps
//=========================================================================================

/// The API emits ISO-8601 timestamps both with and without an offset; naive
/// values are UTC.
mod wire_time {
    use chrono::{DateTime, NaiveDateTime, Utc};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            match raw {
                None => Ok(None),
                Some(s) => super::parse(&s)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", s))),
            }
        }
    }
}
