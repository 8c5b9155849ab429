//! services/client/src/app/profile.rs

use crate::app::state::{AppState, ViewStatus};
use health_record_core::domain::UserProfile;
use health_record_core::forms::ProfileForm;
use health_record_core::ports::PortResult;
use tokio::sync::RwLock;
use tracing::{error, info};

pub const PROFILE_UPDATED: &str = "Profile updated successfully!";

#[derive(Debug, Clone, Default)]
pub struct ProfileState {
    pub form: ProfileForm,
    pub status: ViewStatus,
    pub success: Option<String>,
}

pub struct ProfileView {
    app: AppState,
    state: RwLock<ProfileState>,
}

impl ProfileView {
    pub fn new(app: AppState) -> Self {
        Self {
            app,
            state: RwLock::new(ProfileState::default()),
        }
    }

    /// Prefills the form from the signed-in user.
    pub async fn mount(&self) {
        if let Some(user) = self.app.session.user().await {
            self.state.write().await.form = ProfileForm {
                full_name: user.full_name,
                phone: user.phone.unwrap_or_default(),
            };
        }
    }

    pub async fn snapshot(&self) -> ProfileState {
        self.state.read().await.clone()
    }

    pub async fn edit_form(&self, edit: impl FnOnce(&mut ProfileForm)) {
        edit(&mut self.state.write().await.form);
    }

    /// Sends the update and, on success, replaces the user held by the session.
    pub async fn submit(&self) -> PortResult<UserProfile> {
        let update = {
            let mut state = self.state.write().await;
            state.status.begin();
            state.success = None;
            match state.form.to_update() {
                Ok(update) => update,
                Err(e) => {
                    state.status.fail(e.to_string());
                    return Err(e);
                }
            }
        };

        let result = match self.app.auth.update_profile(&update).await {
            Ok(user) => self.app.session.update_user(user.clone()).await.map(|_| user),
            Err(e) => Err(e),
        };

        let mut state = self.state.write().await;
        match result {
            Ok(user) => {
                info!("Profile updated for {}", user.email);
                state.status.finish();
                state.success = Some(PROFILE_UPDATED.to_string());
                Ok(user)
            }
            Err(e) => {
                error!("Error updating profile: {}", e);
                state.status.fail(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fake::{create_signed_out_app, create_test_app};
    use health_record_core::ports::PortError;

    #[tokio::test]
    async fn submit_updates_session_user() {
        let (app, _api) = create_test_app().await;
        let view = ProfileView::new(app.clone());
        view.mount().await;
        assert_eq!(view.snapshot().await.form.full_name, "Ada Lovelace");

        view.edit_form(|form| {
            form.full_name = "Augusta Ada King".into();
            form.phone = "555-0199".into();
        })
        .await;
        view.submit().await.unwrap();

        let user = app.session.user().await.unwrap();
        assert_eq!(user.full_name, "Augusta Ada King");
        assert_eq!(user.phone.as_deref(), Some("555-0199"));
        assert_eq!(
            view.snapshot().await.success.as_deref(),
            Some(PROFILE_UPDATED)
        );
    }

    #[tokio::test]
    async fn signed_out_update_is_rejected() {
        let (app, _api) = create_signed_out_app().await;
        let view = ProfileView::new(app);
        view.edit_form(|form| form.full_name = "Someone".into()).await;

        let result = view.submit().await;
        assert!(matches!(result, Err(PortError::Unauthorized(_))));
        assert!(view.snapshot().await.success.is_none());
    }
}
