pub mod auth;
pub mod dashboard;
pub mod insights;
pub mod logs;
pub mod profile;
pub mod reports;
pub mod state;

#[cfg(test)]
pub(crate) mod fake;

pub use auth::AuthFlow;
pub use dashboard::DashboardView;
pub use insights::{DisplayedInsight, InsightsView, Provenance};
pub use logs::LogsView;
pub use profile::ProfileView;
pub use reports::ReportsView;
pub use state::{AppState, ViewStatus};
