//! services/client/src/app/dashboard.rs
//!
//! The landing view: a greeting and counts of the user's logs and reports.

use crate::app::state::{AppState, Generation, ViewScope};
use health_record_core::domain::DashboardStats;
use health_record_core::session::ViewAccess;
use tokio::sync::RwLock;
use tracing::{error, instrument};

pub struct DashboardView {
    app: AppState,
    scope: ViewScope,
    counts: Generation,
    stats: RwLock<DashboardStats>,
}

impl DashboardView {
    pub fn new(app: AppState) -> Self {
        Self {
            app,
            scope: ViewScope::new(),
            counts: Generation::new(),
            stats: RwLock::new(DashboardStats::default()),
        }
    }

    /// Checks access and loads the counts when the user is signed in.
    pub async fn mount(&self) -> ViewAccess {
        let access = self.app.session.access().await;
        if matches!(access, ViewAccess::Granted(_)) {
            self.refresh().await;
        }
        access
    }

    pub fn unmount(&self) {
        self.scope.unmount();
    }

    /// Fetches both counts together. The stats only change when both
    /// requests succeed; a failure is logged and the old values stay.
    #[instrument(skip(self))]
    pub async fn refresh(&self) {
        let ticket = self.scope.ticket(&self.counts);
        let fetch = async {
            futures::try_join!(self.app.logs.list_logs(), self.app.reports.list_reports())
        };

        match ticket.run(fetch).await {
            Some(Ok((logs, reports))) if ticket.is_current() => {
                *self.stats.write().await = DashboardStats {
                    logs: logs.len(),
                    reports: reports.len(),
                };
            }
            Some(Err(e)) => error!("Error fetching dashboard stats: {}", e),
            _ => {}
        }
    }

    pub async fn stats(&self) -> DashboardStats {
        *self.stats.read().await
    }

    pub async fn greeting(&self) -> String {
        match self.app.session.user().await {
            Some(user) => format!("Welcome back, {}!", user.first_name()),
            None => "Welcome back!".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fake::{create_signed_out_app, create_test_app};
    use health_record_core::session::LOGIN_ROUTE;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn counts_logs_and_reports() {
        let (app, api) = create_test_app().await;
        api.add_log("log-1");
        api.add_log("log-2");
        api.add_report("rep-1");

        let view = DashboardView::new(app);
        assert!(matches!(view.mount().await, ViewAccess::Granted(_)));
        assert_eq!(view.stats().await, DashboardStats { logs: 2, reports: 1 });
        assert_eq!(view.greeting().await, "Welcome back, Ada!");
    }

    #[tokio::test]
    async fn one_failing_fetch_keeps_previous_stats() {
        let (app, api) = create_test_app().await;
        api.add_log("log-1");
        api.add_report("rep-1");
        let view = DashboardView::new(app);
        view.refresh().await;

        api.add_log("log-2");
        api.fail_reports.store(true, Ordering::SeqCst);
        view.refresh().await;

        assert_eq!(view.stats().await, DashboardStats { logs: 1, reports: 1 });
    }

    #[tokio::test]
    async fn unmounted_view_ignores_results() {
        let (app, api) = create_test_app().await;
        api.add_log("log-1");
        let view = DashboardView::new(app);
        view.unmount();
        view.refresh().await;

        assert_eq!(view.stats().await, DashboardStats::default());
    }

    #[tokio::test]
    async fn signed_out_user_is_redirected() {
        let (app, api) = create_signed_out_app().await;
        api.add_log("log-1");
        let view = DashboardView::new(app);

        assert_eq!(view.mount().await, ViewAccess::Redirect(LOGIN_ROUTE));
        assert_eq!(view.stats().await, DashboardStats::default());
    }
}
