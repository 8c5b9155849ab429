//! services/client/src/app/insights.rs
//!
//! The AI insights view. The user picks logs, runs an analysis, and every
//! fresh analysis is saved to the server so it can be reopened later.

use crate::app::state::{AppState, Generation, ViewScope, ViewStatus};
use chrono::{DateTime, Utc};
use health_record_core::domain::{HealthLog, SaveInsightRequest, SavedInsight, UserProfile};
use health_record_core::insight::{self, Insight};
use health_record_core::ports::{PortError, PortResult};
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

const DEFAULT_PATIENT_NAME: &str = "Patient";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Produced by an analysis run in this view.
    Fresh,
    /// Reopened from the saved list.
    Saved,
}

/// The analysis currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedInsight {
    /// Server id, once the analysis is persisted.
    pub id: Option<String>,
    pub patient_name: String,
    pub logs_analyzed: u32,
    pub data_points_analyzed: u32,
    pub analysis_date: Option<DateTime<Utc>>,
    /// `None` when the analysis came back empty.
    pub insight: Option<Insight>,
    pub provenance: Provenance,
}

impl DisplayedInsight {
    fn from_saved(saved: &SavedInsight) -> Self {
        Self {
            id: Some(saved.id.clone()),
            patient_name: saved
                .patient_name
                .clone()
                .unwrap_or_else(|| DEFAULT_PATIENT_NAME.to_string()),
            logs_analyzed: saved.logs_analyzed_count,
            data_points_analyzed: saved.data_points_analyzed,
            analysis_date: saved.analysis_date,
            insight: Some(Insight::from_saved(saved)),
            provenance: Provenance::Saved,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InsightsState {
    pub logs: Vec<HealthLog>,
    /// Selected log ids, in the order they were picked.
    pub selected: Vec<String>,
    pub displayed: Option<DisplayedInsight>,
    pub saved: Vec<SavedInsight>,
    pub status: ViewStatus,
}

pub struct InsightsView {
    app: AppState,
    days: u32,
    scope: ViewScope,
    log_fetch: Generation,
    saved_fetch: Generation,
    analysis: Generation,
    state: RwLock<InsightsState>,
}

impl InsightsView {
    /// `days` is the look-back window sent with each analysis.
    pub fn new(app: AppState, days: u32) -> Self {
        Self {
            app,
            days,
            scope: ViewScope::new(),
            log_fetch: Generation::new(),
            saved_fetch: Generation::new(),
            analysis: Generation::new(),
            state: RwLock::new(InsightsState::default()),
        }
    }

    pub async fn mount(&self) {
        tokio::join!(self.load_logs(), self.refresh_saved());
    }

    pub fn unmount(&self) {
        self.scope.unmount();
    }

    pub async fn snapshot(&self) -> InsightsState {
        self.state.read().await.clone()
    }

    //=====================================================================================
    // Background Fetches
    //=====================================================================================

    pub async fn load_logs(&self) {
        let ticket = self.scope.ticket(&self.log_fetch);
        match ticket.run(self.app.logs.list_logs()).await {
            Some(Ok(logs)) if ticket.is_current() => self.state.write().await.logs = logs,
            Some(Err(e)) => error!("Error fetching logs: {}", e),
            _ => {}
        }
    }

    pub async fn refresh_saved(&self) {
        let ticket = self.scope.ticket(&self.saved_fetch);
        match ticket.run(self.app.ai.list_saved_insights()).await {
            Some(Ok(saved)) if ticket.is_current() => self.state.write().await.saved = saved,
            Some(Err(e)) => warn!("Error fetching saved insights: {}", e),
            _ => {}
        }
    }

    //=====================================================================================
    // Selection
    //=====================================================================================

    pub async fn toggle_log(&self, log_id: &str) {
        let mut state = self.state.write().await;
        match state.selected.iter().position(|id| id == log_id) {
            Some(index) => {
                state.selected.remove(index);
            }
            None => state.selected.push(log_id.to_string()),
        }
    }

    pub async fn clear_selection(&self) {
        self.state.write().await.selected.clear();
    }

    //=====================================================================================
    // Analysis
    //=====================================================================================

    /// Runs an analysis over the look-back window and auto-saves the result.
    ///
    /// A failed save is logged and does not affect what is displayed.
    #[instrument(skip(self))]
    pub async fn generate(&self) -> PortResult<()> {
        let selected = {
            let mut state = self.state.write().await;
            if state.selected.is_empty() {
                let message = "Please select at least one log to analyze";
                state.status.fail(message);
                return Err(PortError::Validation(message.to_string()));
            }
            state.status.begin();
            state.displayed = None;
            state.selected.clone()
        };

        let ticket = self.scope.ticket(&self.analysis);
        let report = match ticket.run(self.app.ai.insights(self.days)).await {
            None => return Ok(()),
            Some(Ok(report)) => report,
            Some(Err(e)) => {
                error!("Error generating insight: {}", e);
                if ticket.is_current() {
                    self.state
                        .write()
                        .await
                        .status
                        .fail(format!("Failed to generate insight: {}", e));
                }
                return Err(e);
            }
        };
        if !ticket.is_current() {
            return Ok(());
        }

        let patient_name = patient_name(self.app.session.user().await.as_ref());
        let displayed = DisplayedInsight {
            id: None,
            patient_name: patient_name.clone(),
            logs_analyzed: report.logs_analyzed.unwrap_or_default(),
            data_points_analyzed: report.data_points_analyzed.unwrap_or_default(),
            analysis_date: Some(Utc::now()),
            insight: insight::normalize(&report.insights),
            provenance: Provenance::Fresh,
        };
        let save_request = displayed.insight.as_ref().map(|parsed| {
            let value = parsed.to_value();
            SaveInsightRequest {
                patient_name,
                log_ids: selected,
                logs_analyzed: displayed.logs_analyzed,
                insights_raw: value.to_string(),
                insights: value,
                data_points_analyzed: displayed.data_points_analyzed,
            }
        });

        {
            let mut state = self.state.write().await;
            state.displayed = Some(displayed);
            state.status.finish();
        }

        match save_request {
            Some(request) => self.auto_save(&request).await,
            None => info!("Analysis returned no insights; nothing to save"),
        }
        Ok(())
    }

    /// Same selection, new analysis.
    pub async fn reanalyze(&self) -> PortResult<()> {
        self.generate().await
    }

    async fn auto_save(&self, request: &SaveInsightRequest) {
        match self.app.ai.save_insight(request).await {
            Ok(ack) => {
                info!("Insight saved as {}", ack.insight_id);
                let mut state = self.state.write().await;
                if let Some(displayed) = state
                    .displayed
                    .as_mut()
                    .filter(|d| d.provenance == Provenance::Fresh && d.id.is_none())
                {
                    displayed.id = Some(ack.insight_id);
                }
                drop(state);
                self.refresh_saved().await;
            }
            Err(e) => error!("Error saving insight: {}", e),
        }
    }

    //=====================================================================================
    // Saved Insights
    //=====================================================================================

    /// Shows a saved insight from the loaded list.
    pub async fn load_saved(&self, insight_id: &str) -> PortResult<()> {
        let mut state = self.state.write().await;
        let displayed = state
            .saved
            .iter()
            .find(|s| s.id == insight_id)
            .map(DisplayedInsight::from_saved)
            .ok_or_else(|| PortError::NotFound(format!("Insight {} not found", insight_id)))?;
        state.displayed = Some(displayed);
        state.status.error = None;
        Ok(())
    }

    /// Deletes a saved insight and clears the display if it was showing it.
    #[instrument(skip(self))]
    pub async fn delete_saved(&self, insight_id: &str) -> PortResult<()> {
        self.state.write().await.status.begin();
        if let Err(e) = self.app.ai.delete_saved_insight(insight_id).await {
            error!("Error deleting insight: {}", e);
            self.state.write().await.status.fail("Failed to delete insight");
            return Err(e);
        }

        {
            let mut state = self.state.write().await;
            state.status.finish();
            if state
                .displayed
                .as_ref()
                .is_some_and(|d| d.id.as_deref() == Some(insight_id))
            {
                state.displayed = None;
            }
        }
        self.refresh_saved().await;
        Ok(())
    }
}

fn patient_name(user: Option<&UserProfile>) -> String {
    user.map(|u| u.full_name.trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_PATIENT_NAME)
        .to_string()
}
