//! services/client/src/app/state.rs
//!
//! Defines the application's shared state and the per-view bookkeeping used by
//! the controllers: a loading/error status and a scope that lets a view drop
//! results which arrive after it has moved on.

use crate::adapters::{FileStorage, HttpApiClient};
use crate::config::Config;
use crate::error::ClientResult;
use health_record_core::domain::Session;
use health_record_core::ports::{
    AuthService, HealthLogService, InsightService, PortError, ReportService,
};
use health_record_core::session::{SessionStore, ViewAccess};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

//=========================================================================================
// AppState (Shared Across All Views)
//=========================================================================================

/// The shared application state, created once at startup and handed to every view.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionStore>,
    pub auth: Arc<dyn AuthService>,
    pub logs: Arc<dyn HealthLogService>,
    pub reports: Arc<dyn ReportService>,
    pub ai: Arc<dyn InsightService>,
}

impl AppState {
    /// Wires every service port to the same API implementation.
    pub fn from_api<A>(session: Arc<SessionStore>, api: Arc<A>) -> Self
    where
        A: AuthService + HealthLogService + ReportService + InsightService + 'static,
    {
        Self {
            session,
            auth: api.clone(),
            logs: api.clone(),
            reports: api.clone(),
            ai: api,
        }
    }

    /// Builds the production stack from configuration and restores any
    /// persisted session.
    pub async fn connect(config: &Config) -> ClientResult<Self> {
        let storage = Arc::new(FileStorage::new(config.storage_path.clone()));
        let session = Arc::new(SessionStore::new(storage));
        session.initialize().await;

        let api = Arc::new(HttpApiClient::new(
            &config.api_base_url,
            config.request_timeout,
            session.clone(),
        )?);
        Ok(Self::from_api(session, api))
    }

    /// The current session, or `Unauthorized` when nobody is signed in.
    pub async fn require_session(&self) -> ClientResult<Session> {
        match self.session.access().await {
            ViewAccess::Granted(session) => Ok(session),
            ViewAccess::Redirect(route) => {
                Err(PortError::Unauthorized(format!("Not signed in (see {})", route)).into())
            }
            ViewAccess::Pending => {
                Err(PortError::Unauthorized("Session is still loading".to_string()).into())
            }
        }
    }
}

//=========================================================================================
// ViewStatus
//=========================================================================================

/// Loading flag and error banner of a view. The banner is cleared when the
/// next user action starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewStatus {
    pub loading: bool,
    pub error: Option<String>,
}

impl ViewStatus {
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.error = Some(message.into());
    }

    pub fn finish(&mut self) {
        self.loading = false;
    }
}

//=========================================================================================
// ViewScope, Generations and Tickets
//=========================================================================================

/// Counts launches of one kind of async operation. Only the latest launch
/// may apply its result.
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifetime of a mounted view. Unmounting cancels everything still in flight.
#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    cancel: CancellationToken,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new operation of the given kind, superseding earlier ones.
    pub fn ticket(&self, generation: &Generation) -> Ticket {
        let issued = generation.0.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            issued,
            generation: generation.clone(),
            cancel: self.cancel.clone(),
        }
    }

    pub fn unmount(&self) {
        self.cancel.cancel();
    }

    pub fn is_mounted(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

/// Proof that an operation was started; checked before its result is applied.
#[derive(Debug, Clone)]
pub struct Ticket {
    issued: u64,
    generation: Generation,
    cancel: CancellationToken,
}

impl Ticket {
    /// True while the view is mounted and no newer operation has started.
    pub fn is_current(&self) -> bool {
        !self.cancel.is_cancelled() && self.generation.current() == self.issued
    }

    /// Runs `fut` unless the view unmounts first, in which case the future is
    /// dropped and `None` returned.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            output = fut => Some(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fake::{create_signed_out_app, create_test_app};
    use crate::error::ClientError;
    use std::time::Duration;

    #[test]
    fn newer_ticket_supersedes_older() {
        let scope = ViewScope::new();
        let generation = Generation::new();
        let first = scope.ticket(&generation);
        assert!(first.is_current());

        let second = scope.ticket(&generation);
        assert!(!first.is_current());
        assert!(second.is_current());
    }

    #[test]
    fn generations_are_independent() {
        let scope = ViewScope::new();
        let logs = Generation::new();
        let saved = Generation::new();
        let a = scope.ticket(&logs);
        let _b = scope.ticket(&saved);
        assert!(a.is_current());
    }

    #[tokio::test]
    async fn unmount_cancels_in_flight_work() {
        let scope = ViewScope::new();
        let ticket = scope.ticket(&Generation::new());

        let unmounter = scope.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            unmounter.unmount();
        });

        let result = ticket
            .run(tokio::time::sleep(Duration::from_secs(30)))
            .await;
        assert!(result.is_none());
        assert!(!ticket.is_current());
        assert!(!scope.is_mounted());
    }

    #[tokio::test]
    async fn require_session_rejects_signed_out_users() {
        let (signed_in, _api) = create_test_app().await;
        assert_eq!(signed_in.require_session().await.unwrap().token, "test-token");

        let (signed_out, _api) = create_signed_out_app().await;
        let err = signed_out.require_session().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Port(PortError::Unauthorized(ref message)) if message.contains("/login")
        ));
    }

    #[test]
    fn status_banner_clears_on_next_action() {
        let mut status = ViewStatus::default();
        status.begin();
        status.fail("Upload failed: boom");
        assert_eq!(status.error.as_deref(), Some("Upload failed: boom"));
        assert!(!status.loading);

        status.begin();
        assert!(status.error.is_none());
        assert!(status.loading);
    }
}
