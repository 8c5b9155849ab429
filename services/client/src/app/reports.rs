//! services/client/src/app/reports.rs
//!
//! Medical reports: listing, uploading, deleting and exporting the PDF
//! health summary.

use crate::app::state::{AppState, Generation, ViewScope, ViewStatus};
use crate::error::{ClientError, ClientResult};
use chrono::{NaiveDate, Utc};
use health_record_core::domain::MedicalReport;
use health_record_core::forms::ReportUploadForm;
use health_record_core::ports::{PortError, PortResult};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default)]
pub struct ReportsState {
    pub reports: Vec<MedicalReport>,
    pub form: ReportUploadForm,
    pub status: ViewStatus,
}

pub struct ReportsView {
    app: AppState,
    scope: ViewScope,
    list_fetch: Generation,
    state: RwLock<ReportsState>,
}

impl ReportsView {
    pub fn new(app: AppState) -> Self {
        Self {
            app,
            scope: ViewScope::new(),
            list_fetch: Generation::new(),
            state: RwLock::new(ReportsState::default()),
        }
    }

    pub fn unmount(&self) {
        self.scope.unmount();
    }

    pub async fn snapshot(&self) -> ReportsState {
        self.state.read().await.clone()
    }

    pub async fn refresh(&self) {
        let ticket = self.scope.ticket(&self.list_fetch);
        match ticket.run(self.app.reports.list_reports()).await {
            Some(Ok(reports)) if ticket.is_current() => self.state.write().await.reports = reports,
            Some(Err(e)) => error!("Error fetching reports: {}", e),
            _ => {}
        }
    }

    pub async fn edit_form(&self, edit: impl FnOnce(&mut ReportUploadForm)) {
        edit(&mut self.state.write().await.form);
    }

    /// Uploads the picked file with its metadata. Type and size problems are
    /// only logged; the server has the final say.
    pub async fn upload(&self) -> PortResult<MedicalReport> {
        let upload = {
            let mut state = self.state.write().await;
            state.status.begin();
            for advisory in state.form.advisories() {
                warn!("Uploading anyway: {}", advisory);
            }
            match state.form.validate() {
                Ok(upload) => upload,
                Err(e) => {
                    state.status.fail(e.to_string());
                    return Err(e);
                }
            }
        };

        match self.app.reports.upload_report(&upload).await {
            Ok(report) => {
                info!("Uploaded report {} ({})", report.id, report.file_name);
                {
                    let mut state = self.state.write().await;
                    state.form = ReportUploadForm::default();
                    state.status.finish();
                }
                self.refresh().await;
                Ok(report)
            }
            Err(e) => {
                error!("Error uploading report: {}", e);
                self.state
                    .write()
                    .await
                    .status
                    .fail(format!("Upload failed: {}", e));
                Err(e)
            }
        }
    }

    pub async fn delete(&self, report_id: &str) -> PortResult<()> {
        self.state.write().await.status.begin();
        if let Err(e) = self.app.reports.delete_report(report_id).await {
            error!("Error deleting report: {}", e);
            self.state.write().await.status.fail("Failed to delete report");
            return Err(e);
        }
        self.state.write().await.status.finish();
        self.refresh().await;
        Ok(())
    }

    pub fn file_url(&self, report: &MedicalReport) -> String {
        self.app.reports.file_url(&report.file_name)
    }

    /// Downloads the PDF summary into `dir` and returns the written path.
    pub async fn export_summary(&self, dir: &Path) -> ClientResult<PathBuf> {
        let user = self.app.session.user().await.ok_or_else(|| {
            ClientError::Port(PortError::Unauthorized("Not signed in".to_string()))
        })?;

        self.state.write().await.status.begin();
        let bytes = match self.app.reports.export_summary().await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Error generating report: {}", e);
                self.state
                    .write()
                    .await
                    .status
                    .fail("Failed to generate health report");
                return Err(e.into());
            }
        };

        let path = dir.join(export_file_name(&user.full_name, Utc::now().date_naive()));
        if let Err(e) = write_summary(dir, &path, &bytes).await {
            error!("Error writing health summary to {:?}: {}", path, e);
            self.state
                .write()
                .await
                .status
                .fail("Failed to generate health report");
            return Err(e.into());
        }
        self.state.write().await.status.finish();
        info!("Wrote health summary ({} bytes) to {:?}", bytes.len(), path);
        Ok(path)
    }
}

async fn write_summary(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(path, bytes).await
}

/// `health_report_<Full_Name>_<YYYY-MM-DD>.pdf`
///
/// Whitespace runs become a single `_`; any character that is not
/// alphanumeric, `-` or `_` is replaced with `_` so the name stays a single
/// path component.
pub fn export_file_name(full_name: &str, date: NaiveDate) -> String {
    let name: String = full_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("health_report_{}_{}.pdf", name, date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fake::{create_test_app, sample_report, sample_user};
    use health_record_core::domain::{ReportFile, ReportType};
    use tempfile::TempDir;

    fn pdf(name: &str, len: usize) -> ReportFile {
        ReportFile {
            file_name: name.to_string(),
            content_type: "application/pdf".to_string(),
            bytes: vec![b'%'; len],
        }
    }

    #[test]
    fn export_file_name_uses_underscores() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            export_file_name("Ada  King Lovelace", date),
            "health_report_Ada_King_Lovelace_2024-03-09.pdf"
        );
    }

    #[test]
    fn export_file_name_strips_path_separators() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            export_file_name("Ada N/A Love\\lace: Jr.", date),
            "health_report_Ada_N_A_Love_lace__Jr__2024-03-09.pdf"
        );
    }

    #[tokio::test]
    async fn upload_checks_file_then_title() {
        let (app, api) = create_test_app().await;
        let view = ReportsView::new(app);

        let err = view.upload().await.unwrap_err();
        assert_eq!(err.to_string(), "Please select a file");

        view.edit_form(|form| form.file = Some(pdf("blood.pdf", 10))).await;
        let err = view.upload().await.unwrap_err();
        assert_eq!(err.to_string(), "Please enter a title");
        assert!(api.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_sends_metadata_and_resets_form() {
        let (app, api) = create_test_app().await;
        let view = ReportsView::new(app);
        view.edit_form(|form| {
            form.report_type = ReportType::Prescription;
            form.title = "Annual panel".into();
            form.doctor_name = "Dr. Who".into();
            form.file = Some(pdf("panel.pdf", 64));
        })
        .await;

        let report = view.upload().await.unwrap();
        assert_eq!(report.title, "Annual panel");

        let uploads = api.uploads.lock().unwrap().clone();
        assert_eq!(uploads[0].report_type, ReportType::Prescription);
        assert_eq!(uploads[0].doctor_name.as_deref(), Some("Dr. Who"));
        assert_eq!(uploads[0].description, None);

        let state = view.snapshot().await;
        assert_eq!(state.form, ReportUploadForm::default());
        assert_eq!(state.reports.len(), 1);
        assert_eq!(
            view.file_url(&state.reports[0]),
            "http://fake/static/uploads/panel.pdf"
        );
    }

    #[tokio::test]
    async fn unsupported_file_type_is_still_uploaded() {
        let (app, api) = create_test_app().await;
        let view = ReportsView::new(app);
        view.edit_form(|form| {
            form.title = "Scan".into();
            form.file = Some(pdf("scan.tiff", 8));
        })
        .await;

        view.upload().await.unwrap();
        assert_eq!(api.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn export_writes_pdf_bytes() {
        let (app, api) = create_test_app().await;
        *api.pdf.lock().unwrap() = b"%PDF-1.4 summary".to_vec();
        let view = ReportsView::new(app);
        let temp_dir = TempDir::new().unwrap();

        let path = view.export_summary(temp_dir.path()).await.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("health_report_Ada_Lovelace_"));
        assert!(name.ends_with(".pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 summary");
    }

    #[tokio::test]
    async fn export_with_slash_in_name_stays_in_dir() {
        let (app, api) = create_test_app().await;
        *api.pdf.lock().unwrap() = b"%PDF".to_vec();
        let mut user = sample_user();
        user.full_name = "Ada N/A Lovelace".into();
        app.session.update_user(user).await.unwrap();
        let view = ReportsView::new(app);
        let temp_dir = TempDir::new().unwrap();

        let path = view.export_summary(temp_dir.path()).await.unwrap();
        assert_eq!(path.parent(), Some(temp_dir.path()));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("health_report_Ada_N_A_Lovelace_"));
        assert!(!view.snapshot().await.status.loading);
    }

    #[tokio::test]
    async fn export_write_failure_shows_banner() {
        let (app, _api) = create_test_app().await;
        let view = ReportsView::new(app);
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"x").unwrap();

        assert!(view.export_summary(&blocker).await.is_err());
        let status = view.snapshot().await.status;
        assert!(!status.loading);
        assert_eq!(status.error.as_deref(), Some("Failed to generate health report"));
    }

    #[tokio::test]
    async fn successful_delete_clears_previous_banner() {
        let (app, api) = create_test_app().await;
        api.reports.lock().unwrap().push(sample_report("r-1"));
        let view = ReportsView::new(app);
        view.upload().await.unwrap_err();
        assert!(view.snapshot().await.status.error.is_some());

        view.delete("r-1").await.unwrap();
        assert_eq!(view.snapshot().await.status.error, None);
    }
}
