//! services/client/src/app/auth.rs
//!
//! Sign-in, registration and sign-out. A successful grant is handed to the
//! session store, which persists it.

use crate::app::state::AppState;
use health_record_core::domain::{AuthGrant, UserProfile};
use health_record_core::forms::RegistrationForm;
use health_record_core::ports::{PortError, PortResult};
use tracing::{info, instrument, warn};

pub struct AuthFlow {
    app: AppState,
}

impl AuthFlow {
    pub fn new(app: AppState) -> Self {
        Self { app }
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> PortResult<UserProfile> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(PortError::Validation(
                "Please enter your email and password".to_string(),
            ));
        }
        let grant = self.app.auth.login(email, password).await?;
        self.accept(grant).await
    }

    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &RegistrationForm) -> PortResult<UserProfile> {
        let request = form.to_request()?;
        let grant = self.app.auth.register(&request).await?;
        info!("Registered {}", grant.user.email);
        self.accept(grant).await
    }

    /// Tells the server, then always clears the local session.
    pub async fn logout(&self) -> PortResult<()> {
        if self.app.session.token().await.is_some() {
            if let Err(e) = self.app.auth.logout().await {
                warn!("Server logout failed, clearing local session anyway: {}", e);
            }
        }
        self.app.session.logout().await
    }

    async fn accept(&self, grant: AuthGrant) -> PortResult<UserProfile> {
        let user = grant.user.clone();
        self.app.session.login(grant.user, grant.access_token).await?;
        Ok(user)
    }
}
