//! services/client/src/adapters/http.rs
//!
//! The REST adapter. One `HttpApiClient` implements every remote service port
//! from the `core` crate on top of a single `reqwest::Client`. Each request
//! carries the bearer token currently held by the `SessionStore`.

use async_trait::async_trait;
use health_record_core::domain::{
    AuthGrant, ChatMessage, ChatReply, ChatRequest, HealthLog, HealthLogEntry, HealthLogUpdate,
    InsightReport, LoginRequest, MedicalReport, ProfileUpdate, RegisterRequest, ReportUpdate,
    ReportUpload, SaveInsightRequest, SavedInsight, SavedInsightAck, SavedInsightList,
    SleepAnalysis, SymptomAdvice, SymptomAdviceRequest, SymptomSeverity, UserProfile,
    VerifiedToken,
};
use health_record_core::ports::{
    AuthService, HealthLogService, InsightService, PortError, PortResult, ReportService,
};
use health_record_core::session::SessionStore;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct HttpApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl HttpApiClient {
    /// Creates a client for the server at `base_url` (without the `/api` prefix).
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<SessionStore>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("phr-client/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Builds `<base>/api/<segments...>`, percent-encoding each segment so ids
    /// can never change the shape of the path.
    fn endpoint(&self, segments: &[&str]) -> PortResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| PortError::Unexpected(format!("Invalid API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| PortError::Unexpected("API base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn request(&self, method: Method, segments: &[&str]) -> PortResult<RequestBuilder> {
        let builder = self.http.request(method, self.endpoint(segments)?);
        Ok(match self.session.token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Sends the request and turns non-2xx responses into `PortError`s.
    /// A 401 is reported as-is; there is no retry.
    async fn send(&self, builder: RequestBuilder) -> PortResult<Response> {
        let response = builder.send().await.map_err(transport_error)?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &[&str]) -> PortResult<T> {
        let response = self.send(self.request(Method::GET, path).await?).await?;
        decode(response).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &[&str], body: &B) -> PortResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(self.request(method, path).await?.json(body))
            .await?;
        decode(response).await
    }

    /// For endpoints whose response body carries nothing we need.
    async fn send_discarding(&self, method: Method, path: &[&str]) -> PortResult<()> {
        self.send(self.request(method, path).await?).await?;
        Ok(())
    }
}

//=========================================================================================
// Response Handling
//=========================================================================================

fn transport_error(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Transport("the request timed out".to_string())
    } else {
        PortError::Transport(e.to_string())
    }
}

async fn check_status(response: Response) -> PortResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_detail(&body)
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
    debug!("API responded {}: {}", status, message);

    Err(match status.as_u16() {
        401 => PortError::Unauthorized(message),
        404 => PortError::NotFound(message),
        code => PortError::Api {
            status: code,
            message,
        },
    })
}

/// Pulls the server's `detail` message out of an error body.
///
/// Request validation failures carry a list of `{msg}` objects instead of a
/// string; their messages are joined.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> PortResult<T> {
    let url = response.url().path().to_string();
    response.json::<T>().await.map_err(|e| {
        warn!("Could not decode response from {}: {}", url, e);
        PortError::Unexpected(format!("Invalid response body: {}", e))
    })
}

//=========================================================================================
// Service Port Implementations
//=========================================================================================

#[async_trait]
impl AuthService for HttpApiClient {
    async fn register(&self, request: &RegisterRequest) -> PortResult<AuthGrant> {
        self.send_json(Method::POST, &["auth", "register"], request).await
    }

    async fn login(&self, email: &str, password: &str) -> PortResult<AuthGrant> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send_json(Method::POST, &["auth", "login"], &body).await
    }

    async fn current_user(&self) -> PortResult<UserProfile> {
        self.get_json(&["auth", "me"]).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> PortResult<UserProfile> {
        self.send_json(Method::PUT, &["auth", "me"], update).await
    }

    async fn verify_token(&self) -> PortResult<VerifiedToken> {
        self.get_json(&["auth", "verify-token"]).await
    }

    async fn logout(&self) -> PortResult<()> {
        self.send_discarding(Method::POST, &["auth", "logout"]).await
    }
}

#[async_trait]
impl HealthLogService for HttpApiClient {
    async fn create_log(&self, entry: &HealthLogEntry) -> PortResult<HealthLog> {
        self.send_json(Method::POST, &["logs"], entry).await
    }

    async fn list_logs(&self) -> PortResult<Vec<HealthLog>> {
        self.get_json(&["logs"]).await
    }

    async fn get_log(&self, log_id: &str) -> PortResult<HealthLog> {
        self.get_json(&["logs", log_id]).await
    }

    async fn update_log(&self, log_id: &str, update: &HealthLogUpdate) -> PortResult<HealthLog> {
        self.send_json(Method::PUT, &["logs", log_id], update)
            .await
    }

    async fn delete_log(&self, log_id: &str) -> PortResult<()> {
        self.send_discarding(Method::DELETE, &["logs", log_id])
            .await
    }
}

#[async_trait]
impl ReportService for HttpApiClient {
    async fn upload_report(&self, upload: &ReportUpload) -> PortResult<MedicalReport> {
        let file_part = Part::bytes(upload.file.bytes.clone())
            .file_name(upload.file.file_name.clone())
            .mime_str(&upload.file.content_type)
            .map_err(|e| {
                PortError::Validation(format!(
                    "Invalid content type '{}': {}",
                    upload.file.content_type, e
                ))
            })?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("report_type", upload.report_type.as_str())
            .text("title", upload.title.clone());
        let optional_fields = [
            ("description", &upload.description),
            ("doctor_name", &upload.doctor_name),
            ("hospital_name", &upload.hospital_name),
            ("diagnosis", &upload.diagnosis),
        ];
        for (name, value) in optional_fields {
            if let Some(value) = value {
                form = form.text(name, value.clone());
            }
        }

        let response = self
            .send(self.request(Method::POST, &["reports", "upload"]).await?.multipart(form))
            .await?;
        decode(response).await
    }

    async fn list_reports(&self) -> PortResult<Vec<MedicalReport>> {
        self.get_json(&["reports"]).await
    }

    async fn get_report(&self, report_id: &str) -> PortResult<MedicalReport> {
        self.get_json(&["reports", report_id]).await
    }

    async fn update_report(
        &self,
        report_id: &str,
        update: &ReportUpdate,
    ) -> PortResult<MedicalReport> {
        self.send_json(Method::PUT, &["reports", report_id], update)
            .await
    }

    async fn delete_report(&self, report_id: &str) -> PortResult<()> {
        self.send_discarding(Method::DELETE, &["reports", report_id])
            .await
    }

    async fn export_summary(&self) -> PortResult<Vec<u8>> {
        let response = self
            .send(self.request(Method::GET, &["reports", "export-summary"]).await?)
            .await?;
        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }

    fn file_url(&self, file_name: &str) -> String {
        match Url::parse(&self.base_url) {
            Ok(mut url) => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments
                        .pop_if_empty()
                        .extend(["static", "uploads", file_name]);
                }
                url.to_string()
            }
            Err(_) => format!("{}/static/uploads/{}", self.base_url, file_name),
        }
    }
}

#[async_trait]
impl InsightService for HttpApiClient {
    async fn insights(&self, days: u32) -> PortResult<InsightReport> {
        let builder = self
            .request(Method::GET, &["ai", "insights"])
            .await?
            .query(&[("days", days)]);
        decode(self.send(builder).await?).await
    }

    async fn generate_insight(&self) -> PortResult<InsightReport> {
        self.send_json(Method::POST, &["ai", "generate-insight"], &serde_json::json!({}))
            .await
    }

    async fn save_insight(&self, request: &SaveInsightRequest) -> PortResult<SavedInsightAck> {
        self.send_json(Method::POST, &["ai", "save-insight"], request)
            .await
    }

    async fn list_saved_insights(&self) -> PortResult<Vec<SavedInsight>> {
        let list: SavedInsightList = self.get_json(&["ai", "saved-insights"]).await?;
        Ok(list.insights)
    }

    async fn delete_saved_insight(&self, insight_id: &str) -> PortResult<()> {
        self.send_discarding(Method::DELETE, &["ai", "saved-insights", insight_id])
            .await
    }

    async fn symptom_advice(
        &self,
        symptom: &str,
        severity: SymptomSeverity,
    ) -> PortResult<SymptomAdvice> {
        let body = SymptomAdviceRequest {
            symptom: symptom.to_string(),
            severity,
        };
        self.send_json(Method::POST, &["ai", "symptom-advice"], &body)
            .await
    }

    async fn chat(
        &self,
        message: &str,
        history: Option<&[ChatMessage]>,
    ) -> PortResult<ChatReply> {
        let body = ChatRequest {
            message: message.to_string(),
            conversation_history: history.map(|h| h.to_vec()),
        };
        self.send_json(Method::POST, &["ai", "chat"], &body).await
    }

    async fn sleep_analysis(&self) -> PortResult<SleepAnalysis> {
        self.get_json(&["ai", "sleep-analysis"]).await
    }
}
