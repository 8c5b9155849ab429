//! In-memory stand-in for the REST API, used by the view controller tests.

use crate::app::state::AppState;
use async_trait::async_trait;
use health_record_core::domain::{
    AuthGrant, ChatMessage, ChatReply, HealthLog, HealthLogEntry, HealthLogUpdate, InsightReport,
    MedicalReport, ProfileUpdate, RegisterRequest, ReportType, ReportUpdate, ReportUpload,
    SaveInsightRequest, SavedInsight, SavedInsightAck, SleepAnalysis, SymptomAdvice,
    SymptomSeverity, UserProfile, UserRole, VerifiedToken,
};
use health_record_core::ports::{
    AuthService, HealthLogService, InsightService, PortError, PortResult, ReportService,
};
use health_record_core::session::SessionStore;
use health_record_core::storage::MemoryStorage;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct FakeApi {
    pub logs: Mutex<Vec<HealthLog>>,
    pub reports: Mutex<Vec<MedicalReport>>,
    pub saved: Mutex<Vec<SavedInsight>>,
    pub save_requests: Mutex<Vec<SaveInsightRequest>>,
    pub uploads: Mutex<Vec<ReportUpload>>,
    pub insight_text: Mutex<Value>,
    pub pdf: Mutex<Vec<u8>>,
    pub fail_reports: AtomicBool,
    pub fail_insights: AtomicBool,
    pub fail_save: AtomicBool,
    pub fail_logout: AtomicBool,
    pub insight_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeApi {
    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn add_log(&self, id: &str) {
        self.logs.lock().unwrap().push(sample_log(id));
    }

    pub fn add_report(&self, id: &str) {
        self.reports.lock().unwrap().push(sample_report(id));
    }

    pub fn add_saved(&self, saved: SavedInsight) {
        self.saved.lock().unwrap().push(saved);
    }

    pub fn set_insight_text(&self, value: Value) {
        *self.insight_text.lock().unwrap() = value;
    }
}

pub fn sample_user() -> UserProfile {
    UserProfile {
        id: "u-1".into(),
        full_name: "Ada Lovelace".into(),
        email: "ada@example.com".into(),
        phone: None,
        role: UserRole::Patient,
    }
}

pub fn sample_log(id: &str) -> HealthLog {
    HealthLog {
        id: id.to_string(),
        user_id: Some("u-1".into()),
        log_date: None,
        entry: HealthLogEntry {
            patient_name: None,
            doctor_name: None,
            temperature: Some(37.0),
            blood_pressure_systolic: Some(120),
            blood_pressure_diastolic: Some(80),
            has_fever: false,
            has_cough: false,
            has_headache: false,
            has_fatigue: false,
            has_body_pain: false,
            has_nausea: false,
            mood: Default::default(),
            pain_level: Default::default(),
            sleep_hours: Some(7.5),
            sleep_quality: 5,
            stress_level: 5,
            anxiety_level: 5,
            notes: None,
        },
        created_at: None,
    }
}

pub fn sample_report(id: &str) -> MedicalReport {
    MedicalReport {
        id: id.to_string(),
        user_id: Some("u-1".into()),
        report_type: ReportType::LabTest,
        title: format!("Report {}", id),
        description: None,
        report_date: None,
        file_name: format!("{}.pdf", id),
        file_type: "pdf".into(),
        doctor_name: None,
        created_at: None,
    }
}

pub fn saved_insight(id: &str) -> SavedInsight {
    SavedInsight {
        id: id.to_string(),
        patient_name: Some("Ada Lovelace".into()),
        analyzed_log_ids: vec!["log-1".into()],
        logs_analyzed_count: 1,
        analysis_date: None,
        trends: Some(serde_json::json!({"sleep": "stable"})),
        correlations: None,
        recommendations: vec!["Keep a regular bedtime".into()],
        alerts: None,
        insights_raw: None,
        data_points_analyzed: 12,
    }
}

/// An app over a fresh fake, signed in as [`sample_user`].
pub async fn create_test_app() -> (AppState, Arc<FakeApi>) {
    let session = Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())));
    session.initialize().await;
    session
        .login(sample_user(), "test-token".into())
        .await
        .unwrap();
    let api = Arc::new(FakeApi::default());
    (AppState::from_api(session, api.clone()), api)
}

/// An app whose persisted session is empty.
pub async fn create_signed_out_app() -> (AppState, Arc<FakeApi>) {
    let session = Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())));
    session.initialize().await;
    let api = Arc::new(FakeApi::default());
    (AppState::from_api(session, api.clone()), api)
}

fn not_found(what: &str) -> PortError {
    PortError::NotFound(format!("{} not found", what))
}

#[async_trait]
impl AuthService for FakeApi {
    async fn register(&self, request: &RegisterRequest) -> PortResult<AuthGrant> {
        Ok(AuthGrant {
            access_token: "registered-token".into(),
            token_type: "bearer".into(),
            user: UserProfile {
                id: self.next_id("u"),
                full_name: request.full_name.clone(),
                email: request.email.clone(),
                phone: request.phone.clone(),
                role: request.role,
            },
        })
    }

    async fn login(&self, email: &str, password: &str) -> PortResult<AuthGrant> {
        if password != "secret" {
            return Err(PortError::Unauthorized("Incorrect email or password".into()));
        }
        Ok(AuthGrant {
            access_token: "fresh-token".into(),
            token_type: "bearer".into(),
            user: UserProfile {
                email: email.to_string(),
                ..sample_user()
            },
        })
    }

    async fn current_user(&self) -> PortResult<UserProfile> {
        Ok(sample_user())
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> PortResult<UserProfile> {
        let mut user = sample_user();
        if let Some(name) = &update.full_name {
            user.full_name = name.clone();
        }
        user.phone = update.phone.clone();
        Ok(user)
    }

    async fn verify_token(&self) -> PortResult<VerifiedToken> {
        Ok(VerifiedToken {
            valid: true,
            user_id: "u-1".into(),
            email: "ada@example.com".into(),
            role: UserRole::Patient,
        })
    }

    async fn logout(&self) -> PortResult<()> {
        if self.fail_logout.load(Ordering::SeqCst) {
            return Err(PortError::Transport("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl HealthLogService for FakeApi {
    async fn create_log(&self, entry: &HealthLogEntry) -> PortResult<HealthLog> {
        let log = HealthLog {
            id: self.next_id("log"),
            entry: entry.clone(),
            ..sample_log("")
        };
        self.logs.lock().unwrap().insert(0, log.clone());
        Ok(log)
    }

    async fn list_logs(&self) -> PortResult<Vec<HealthLog>> {
        Ok(self.logs.lock().unwrap().clone())
    }

    async fn get_log(&self, log_id: &str) -> PortResult<HealthLog> {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.id == log_id)
            .cloned()
            .ok_or_else(|| not_found("Log"))
    }

    async fn update_log(&self, log_id: &str, update: &HealthLogUpdate) -> PortResult<HealthLog> {
        let mut logs = self.logs.lock().unwrap();
        let log = logs
            .iter_mut()
            .find(|l| l.id == log_id)
            .ok_or_else(|| not_found("Log"))?;
        if let Some(notes) = &update.notes {
            log.entry.notes = Some(notes.clone());
        }
        Ok(log.clone())
    }

    async fn delete_log(&self, log_id: &str) -> PortResult<()> {
        let mut logs = self.logs.lock().unwrap();
        let before = logs.len();
        logs.retain(|l| l.id != log_id);
        if logs.len() == before {
            return Err(not_found("Log"));
        }
        Ok(())
    }
}

#[async_trait]
impl ReportService for FakeApi {
    async fn upload_report(&self, upload: &ReportUpload) -> PortResult<MedicalReport> {
        self.uploads.lock().unwrap().push(upload.clone());
        let report = MedicalReport {
            id: self.next_id("rep"),
            report_type: upload.report_type,
            title: upload.title.clone(),
            file_name: upload.file.file_name.clone(),
            ..sample_report("")
        };
        self.reports.lock().unwrap().insert(0, report.clone());
        Ok(report)
    }

    async fn list_reports(&self) -> PortResult<Vec<MedicalReport>> {
        if self.fail_reports.load(Ordering::SeqCst) {
            return Err(PortError::Api {
                status: 500,
                message: "Internal Server Error".into(),
            });
        }
        Ok(self.reports.lock().unwrap().clone())
    }

    async fn get_report(&self, report_id: &str) -> PortResult<MedicalReport> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == report_id)
            .cloned()
            .ok_or_else(|| not_found("Report"))
    }

    async fn update_report(
        &self,
        report_id: &str,
        update: &ReportUpdate,
    ) -> PortResult<MedicalReport> {
        let mut reports = self.reports.lock().unwrap();
        let report = reports
            .iter_mut()
            .find(|r| r.id == report_id)
            .ok_or_else(|| not_found("Report"))?;
        if let Some(title) = &update.title {
            report.title = title.clone();
        }
        Ok(report.clone())
    }

    async fn delete_report(&self, report_id: &str) -> PortResult<()> {
        let mut reports = self.reports.lock().unwrap();
        let before = reports.len();
        reports.retain(|r| r.id != report_id);
        if reports.len() == before {
            return Err(not_found("Report"));
        }
        Ok(())
    }

    async fn export_summary(&self) -> PortResult<Vec<u8>> {
        Ok(self.pdf.lock().unwrap().clone())
    }

    fn file_url(&self, file_name: &str) -> String {
        format!("http://fake/static/uploads/{}", file_name)
    }
}

#[async_trait]
impl InsightService for FakeApi {
    async fn insights(&self, days: u32) -> PortResult<InsightReport> {
        self.insight_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_insights.load(Ordering::SeqCst) {
            return Err(PortError::Api {
                status: 503,
                message: "AI service unavailable".into(),
            });
        }
        Ok(InsightReport {
            insights: self.insight_text.lock().unwrap().clone(),
            logs_analyzed: Some(self.logs.lock().unwrap().len() as u32),
            data_points_analyzed: Some(42),
            analysis_period_days: Some(days),
            ..Default::default()
        })
    }

    async fn generate_insight(&self) -> PortResult<InsightReport> {
        self.insights(30).await
    }

    async fn save_insight(&self, request: &SaveInsightRequest) -> PortResult<SavedInsightAck> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(PortError::Api {
                status: 500,
                message: "Failed to save insight".into(),
            });
        }
        self.save_requests.lock().unwrap().push(request.clone());
        let id = self.next_id("ins");
        let saved = SavedInsight {
            id: id.clone(),
            patient_name: Some(request.patient_name.clone()),
            analyzed_log_ids: request.log_ids.clone(),
            logs_analyzed_count: request.logs_analyzed,
            insights_raw: Some(request.insights_raw.clone()),
            data_points_analyzed: request.data_points_analyzed,
            trends: None,
            recommendations: Vec::new(),
            ..saved_insight("")
        };
        self.saved.lock().unwrap().insert(0, saved);
        Ok(SavedInsightAck {
            message: Some("Insight saved successfully".into()),
            insight_id: id,
        })
    }

    async fn list_saved_insights(&self) -> PortResult<Vec<SavedInsight>> {
        Ok(self.saved.lock().unwrap().clone())
    }

    async fn delete_saved_insight(&self, insight_id: &str) -> PortResult<()> {
        let mut saved = self.saved.lock().unwrap();
        let before = saved.len();
        saved.retain(|s| s.id != insight_id);
        if saved.len() == before {
            return Err(not_found("Insight"));
        }
        Ok(())
    }

    async fn symptom_advice(
        &self,
        symptom: &str,
        severity: SymptomSeverity,
    ) -> PortResult<SymptomAdvice> {
        Ok(SymptomAdvice {
            symptom: Some(symptom.to_string()),
            severity: Some(format!("{:?}", severity).to_lowercase()),
            advice: Some("Rest and drink fluids".into()),
            ..Default::default()
        })
    }

    async fn chat(&self, message: &str, _history: Option<&[ChatMessage]>) -> PortResult<ChatReply> {
        Ok(ChatReply {
            response: format!("echo: {}", message),
            ..Default::default()
        })
    }

    async fn sleep_analysis(&self) -> PortResult<SleepAnalysis> {
        Ok(SleepAnalysis {
            average_sleep_hours: Some(7.5),
            ..Default::default()
        })
    }
}
