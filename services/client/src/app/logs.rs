//! services/client/src/app/logs.rs
//!
//! Daily health logs: the history list and the entry form.

use crate::app::state::{AppState, Generation, ViewScope, ViewStatus};
use health_record_core::domain::HealthLog;
use health_record_core::forms::HealthLogForm;
use health_record_core::ports::PortResult;
use tokio::sync::RwLock;
use tracing::{error, info};

#[derive(Debug, Clone, Default)]
pub struct LogsState {
    pub logs: Vec<HealthLog>,
    pub form: HealthLogForm,
    pub status: ViewStatus,
}

pub struct LogsView {
    app: AppState,
    scope: ViewScope,
    list_fetch: Generation,
    state: RwLock<LogsState>,
}

impl LogsView {
    pub fn new(app: AppState) -> Self {
        Self {
            app,
            scope: ViewScope::new(),
            list_fetch: Generation::new(),
            state: RwLock::new(LogsState::default()),
        }
    }

    pub fn unmount(&self) {
        self.scope.unmount();
    }

    pub async fn snapshot(&self) -> LogsState {
        self.state.read().await.clone()
    }

    pub async fn refresh(&self) {
        let ticket = self.scope.ticket(&self.list_fetch);
        self.state.write().await.status.loading = true;
        match ticket.run(self.app.logs.list_logs()).await {
            Some(Ok(logs)) if ticket.is_current() => {
                let mut state = self.state.write().await;
                state.logs = logs;
                state.status.finish();
            }
            Some(Err(e)) => {
                error!("Error fetching logs: {}", e);
                self.state.write().await.status.finish();
            }
            _ => {}
        }
    }

    /// Applies `edit` to the form being filled in.
    pub async fn edit_form(&self, edit: impl FnOnce(&mut HealthLogForm)) {
        edit(&mut self.state.write().await.form);
    }

    /// Validates and submits the form, then resets it and reloads the list.
    pub async fn submit(&self) -> PortResult<HealthLog> {
        let entry = {
            let mut state = self.state.write().await;
            state.status.begin();
            match state.form.to_entry() {
                Ok(entry) => entry,
                Err(e) => {
                    state.status.fail(e.to_string());
                    return Err(e);
                }
            }
        };

        match self.app.logs.create_log(&entry).await {
            Ok(log) => {
                info!("Saved health log {}", log.id);
                {
                    let mut state = self.state.write().await;
                    state.form = HealthLogForm::default();
                    state.status.finish();
                }
                self.refresh().await;
                Ok(log)
            }
            Err(e) => {
                error!("Error saving log: {}", e);
                self.state
                    .write()
                    .await
                    .status
                    .fail(format!("Failed to save log: {}", e));
                Err(e)
            }
        }
    }

    pub async fn delete(&self, log_id: &str) -> PortResult<()> {
        if let Err(e) = self.app.logs.delete_log(log_id).await {
            error!("Error deleting log: {}", e);
            self.state.write().await.status.fail("Failed to delete log");
            return Err(e);
        }
        self.refresh().await;
        Ok(())
    }
}
