//! crates/health_record_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client logic is written against.
//! These traits are the boundary between the core and its adapters: the REST
//! API client and the durable key-value store that survives restarts.

use async_trait::async_trait;
use crate::domain::{
    AuthGrant, ChatMessage, HealthLog, HealthLogEntry, HealthLogUpdate, InsightReport,
    MedicalReport, ProfileUpdate, RegisterRequest, ReportUpdate, ReportUpload, SaveInsightRequest,
    SavedInsight, SavedInsightAck, SleepAnalysis, SymptomAdvice, SymptomSeverity, UserProfile,
    VerifiedToken, ChatReply,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
///
/// The `Display` output of `Validation`, `Unauthorized`, `NotFound` and `Api`
/// is the bare message, so it can be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    /// Input rejected locally; no request was sent.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    /// Any other non-2xx response.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The HTTP status behind this error, when it came from the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            PortError::Unauthorized(_) => Some(401),
            PortError::NotFound(_) => Some(404),
            PortError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Durable Storage Port
//=========================================================================================

/// A persistent string key-value store, the client-side equivalent of
/// browser local storage.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> PortResult<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> PortResult<()>;

    /// Removing a key that does not exist is not an error.
    async fn remove_item(&self, key: &str) -> PortResult<()>;
}

//=========================================================================================
// Remote Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> PortResult<AuthGrant>;

    async fn login(&self, email: &str, password: &str) -> PortResult<AuthGrant>;

    async fn current_user(&self) -> PortResult<UserProfile>;

    async fn update_profile(&self, update: &ProfileUpdate) -> PortResult<UserProfile>;

    async fn verify_token(&self) -> PortResult<VerifiedToken>;

    async fn logout(&self) -> PortResult<()>;
}

#[async_trait]
pub trait HealthLogService: Send + Sync {
    async fn create_log(&self, entry: &HealthLogEntry) -> PortResult<HealthLog>;

    async fn list_logs(&self) -> PortResult<Vec<HealthLog>>;

    async fn get_log(&self, log_id: &str) -> PortResult<HealthLog>;

    async fn update_log(&self, log_id: &str, update: &HealthLogUpdate) -> PortResult<HealthLog>;

    async fn delete_log(&self, log_id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait ReportService: Send + Sync {
    /// Uploads the file and its metadata as a single multipart request.
    async fn upload_report(&self, upload: &ReportUpload) -> PortResult<MedicalReport>;

    async fn list_reports(&self) -> PortResult<Vec<MedicalReport>>;

    async fn get_report(&self, report_id: &str) -> PortResult<MedicalReport>;

    async fn update_report(&self, report_id: &str, update: &ReportUpdate)
        -> PortResult<MedicalReport>;

    async fn delete_report(&self, report_id: &str) -> PortResult<()>;

    /// Downloads the PDF health summary.
    async fn export_summary(&self) -> PortResult<Vec<u8>>;

    /// Where the server exposes a stored report file.
    fn file_url(&self, file_name: &str) -> String;
}

#[async_trait]
pub trait InsightService: Send + Sync {
    async fn insights(&self, days: u32) -> PortResult<InsightReport>;

    async fn generate_insight(&self) -> PortResult<InsightReport>;

    async fn save_insight(&self, request: &SaveInsightRequest) -> PortResult<SavedInsightAck>;

    async fn list_saved_insights(&self) -> PortResult<Vec<SavedInsight>>;

    async fn delete_saved_insight(&self, insight_id: &str) -> PortResult<()>;

    async fn symptom_advice(
        &self,
        symptom: &str,
        severity: SymptomSeverity,
    ) -> PortResult<SymptomAdvice>;

    async fn chat(
        &self,
        message: &str,
        history: Option<&[ChatMessage]>,
    ) -> PortResult<ChatReply>;

    async fn sleep_analysis(&self) -> PortResult<SleepAnalysis>;
}
