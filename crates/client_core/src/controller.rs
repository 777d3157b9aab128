use std::sync::Arc;

use shared::{
    domain::{ObjectId, ObjectType, ResourceObject},
    protocol::{
        CreateObjectRequest, EmailVerificationRequest, ForgotPasswordRequest,
        PasswordResetRequest, SigninRequest, SignupRequest,
    },
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    error::{ClientError, ErrorKind},
    session::{SessionState, SessionStore},
    transport::ApiClient,
    ui::{Notice, UiSurface, View},
    validation::{check_password_policy, require_filled},
    view_model::{delete_prompt, profile_view, resource_list_view, ResourceListView},
};

/// What happened to a user action. Failures have already been reported
/// through the UI by the time this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Cancelled,
    Failed(ErrorKind),
}

impl Outcome {
    pub fn is_done(self) -> bool {
        self == Outcome::Done
    }
}

/// Background logout notification. Navigation never waits on it.
pub struct LogoutNotification {
    handle: Option<JoinHandle<bool>>,
}

impl LogoutNotification {
    /// Whether a request was sent at all.
    pub fn was_sent(&self) -> bool {
        self.handle.is_some()
    }

    /// Waits for the request; `true` when the backend acknowledged it.
    pub async fn settled(self) -> bool {
        match self.handle {
            Some(handle) => handle.await.unwrap_or(false),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Register,
    Login,
    VerifyEmail,
    ResendVerification,
    ForgotPassword,
    ResetPassword,
    ValidateSession,
    LoadProfile,
    LoadObjects,
    CreateObject,
    DeleteObject,
}

impl Action {
    fn name(self) -> &'static str {
        match self {
            Action::Register => "register",
            Action::Login => "login",
            Action::VerifyEmail => "verify_email",
            Action::ResendVerification => "resend_verification",
            Action::ForgotPassword => "forgot_password",
            Action::ResetPassword => "reset_password",
            Action::ValidateSession => "validate_session",
            Action::LoadProfile => "load_profile",
            Action::LoadObjects => "load_objects",
            Action::CreateObject => "create_object",
            Action::DeleteObject => "delete_object",
        }
    }

    fn failure_notice(self, err: &ClientError) -> String {
        match self {
            Action::Register => "Registration failed.".to_string(),
            Action::Login => match err.server_message() {
                Some(message) => format!("Login failed: {message}"),
                None => "Login failed. Check your username and password.".to_string(),
            },
            Action::VerifyEmail => "Email verification failed.".to_string(),
            Action::ResendVerification => "Could not resend the verification code.".to_string(),
            Action::ForgotPassword => "Could not send the password reset link.".to_string(),
            Action::ResetPassword => "Password reset failed.".to_string(),
            Action::ValidateSession => "Could not check the session.".to_string(),
            Action::LoadProfile => "Could not load the profile.".to_string(),
            Action::LoadObjects => "Could not load objects.".to_string(),
            Action::CreateObject => "Could not create the object.".to_string(),
            Action::DeleteObject => "Could not delete the object.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Listing {
    All,
    Children(ObjectId),
    ByType(ObjectType),
}

/// Bridges UI events to the backend and owns the session lifecycle.
pub struct SessionController {
    api: Arc<ApiClient>,
    store: Arc<dyn SessionStore>,
    ui: Arc<dyn UiSurface>,
    state: Mutex<SessionState>,
}

impl SessionController {
    pub fn new(api: ApiClient, store: Arc<dyn SessionStore>, ui: Arc<dyn UiSurface>) -> Self {
        Self {
            api: Arc::new(api),
            store,
            ui,
            state: Mutex::new(SessionState::Anonymous),
        }
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    /// Derives the session state from whatever token the store already holds.
    pub async fn restore(&self) -> SessionState {
        let next = match self.session_token().await {
            Ok(_) => SessionState::Authenticated,
            Err(ClientError::MissingSession) => SessionState::Anonymous,
            Err(err) => {
                warn!(error = %err, "failed to read stored session");
                SessionState::Anonymous
            }
        };
        self.transition(next).await;
        next
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Outcome {
        if let Err(err) = require_filled(&[
            ("username", username),
            ("email", email),
            ("password", password),
        ]) {
            return self.fail(Action::Register, err).await;
        }

        let request = SignupRequest {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        match self.api.register(&request).await {
            Ok(()) => {
                info!(username = %request.username, "registration accepted");
                self.ui.notify(Notice::success(
                    "Registration successful. Check your email for the verification code.",
                ));
                self.ui.navigate(View::VerifyEmail {
                    email: request.email,
                });
                Outcome::Done
            }
            Err(err) => self.fail(Action::Register, err).await,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Outcome {
        if let Err(err) = require_filled(&[("username", username), ("password", password)]) {
            return self.fail(Action::Login, err).await;
        }

        self.transition(SessionState::Authenticating).await;
        let request = SigninRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        let token = self.api.login(&request).await.and_then(|response| {
            response
                .session_token()
                .map(str::to_string)
                .ok_or_else(|| ClientError::UnexpectedResponse("login response carried no token".into()))
        });

        let committed = match token {
            Ok(token) => self.store.store(&token).await.map_err(ClientError::store),
            Err(err) => Err(err),
        };
        match committed {
            Ok(()) => {
                self.transition(SessionState::Authenticated).await;
                info!(username = %request.username, "signed in");
                self.ui.notify(Notice::success("Signed in."));
                self.ui.navigate(View::Profile);
                Outcome::Done
            }
            Err(err) => {
                // A token from an earlier session must not outlive a failed sign-in.
                self.end_session().await;
                self.fail(Action::Login, err).await
            }
        }
    }

    pub async fn verify_email(&self, email: &str, code: &str) -> Outcome {
        if let Err(err) = require_filled(&[("email", email), ("code", code)]) {
            return self.fail(Action::VerifyEmail, err).await;
        }

        let request = EmailVerificationRequest {
            email: email.trim().to_string(),
            code: code.trim().to_string(),
        };
        match self.api.verify_email(&request).await {
            Ok(()) => {
                self.ui.notify(Notice::success("Email verified. You can sign in now."));
                self.ui.navigate(View::Login);
                Outcome::Done
            }
            Err(err) => self.fail(Action::VerifyEmail, err).await,
        }
    }

    pub async fn resend_verification(&self, email: &str) -> Outcome {
        if let Err(err) = require_filled(&[("email", email)]) {
            return self.fail(Action::ResendVerification, err).await;
        }
        match self.api.resend_verification(email.trim()).await {
            Ok(()) => {
                self.ui.notify(Notice::info("A new verification code is on its way."));
                Outcome::Done
            }
            Err(err) => self.fail(Action::ResendVerification, err).await,
        }
    }

    pub async fn forgot_password(&self, email: &str) -> Outcome {
        if let Err(err) = require_filled(&[("email", email)]) {
            return self.fail(Action::ForgotPassword, err).await;
        }

        let request = ForgotPasswordRequest {
            email: email.trim().to_string(),
        };
        match self.api.forgot_password(&request).await {
            Ok(()) => {
                self.ui.notify(Notice::info(
                    "If the address is registered, a reset link has been sent.",
                ));
                self.ui.navigate(View::ResetPassword);
                Outcome::Done
            }
            Err(err) => self.fail(Action::ForgotPassword, err).await,
        }
    }

    pub async fn reset_password(&self, reset_token: &str, new_password: &str) -> Outcome {
        let checked = require_filled(&[("reset token", reset_token), ("new password", new_password)])
            .and_then(|()| check_password_policy(new_password));
        if let Err(err) = checked {
            return self.fail(Action::ResetPassword, err).await;
        }

        let request = PasswordResetRequest {
            token: reset_token.trim().to_string(),
            new_password: new_password.to_string(),
        };
        match self.api.reset_password(&request).await {
            Ok(()) => {
                self.ui.notify(Notice::success("Password changed. Sign in with the new password."));
                self.ui.navigate(View::Login);
                Outcome::Done
            }
            Err(err) => self.fail(Action::ResetPassword, err).await,
        }
    }

    /// Sends the logout notification in the background, then clears the
    /// session and returns to the login view without waiting for it.
    pub async fn logout(&self) -> LogoutNotification {
        let token = match self.store.load().await {
            Ok(token) => token.filter(|token| !token.trim().is_empty()),
            Err(err) => {
                warn!(error = %err, "failed to read stored session before logout");
                None
            }
        };

        let handle = token.map(|token| {
            let api = Arc::clone(&self.api);
            tokio::spawn(async move {
                match api.logout(&token).await {
                    Ok(()) => {
                        debug!("logout acknowledged by server");
                        true
                    }
                    Err(err) => {
                        warn!(error = %err, "logout notification failed");
                        false
                    }
                }
            })
        });

        self.end_session().await;
        info!("signed out");
        self.ui.navigate(View::Login);
        LogoutNotification { handle }
    }

    pub async fn validate_session(&self) -> Outcome {
        let token = match self.session_token().await {
            Ok(token) => token,
            Err(ClientError::MissingSession) => {
                self.transition(SessionState::Anonymous).await;
                return Outcome::Failed(ErrorKind::Auth);
            }
            Err(err) => return self.fail(Action::ValidateSession, err).await,
        };

        match self.api.validate(&token).await {
            Ok(()) => {
                self.transition(SessionState::Authenticated).await;
                Outcome::Done
            }
            Err(err) => self.fail(Action::ValidateSession, err).await,
        }
    }

    /// Any failure after a token was presented ends the session.
    pub async fn load_profile(&self) -> Outcome {
        let token = match self.session_token().await {
            Ok(token) => token,
            Err(ClientError::MissingSession) => {
                debug!("no stored session; redirecting to login");
                self.transition(SessionState::Anonymous).await;
                self.ui.navigate(View::Login);
                return Outcome::Failed(ErrorKind::Auth);
            }
            Err(err) => return self.fail(Action::LoadProfile, err).await,
        };

        match self.api.profile(&token).await {
            Ok(profile) => {
                self.transition(SessionState::Authenticated).await;
                self.ui.render_profile(&profile_view(&profile));
                Outcome::Done
            }
            Err(err) => {
                warn!(error = %err, "profile request failed; ending session");
                self.end_session().await;
                self.ui
                    .notify(Notice::error("Your session is no longer valid. Please sign in again."));
                self.ui.navigate(View::Login);
                Outcome::Failed(ErrorKind::Auth)
            }
        }
    }

    pub async fn load_resource_list(&self) -> Outcome {
        self.load_listing(Listing::All).await
    }

    pub async fn load_children(&self, parent_id: ObjectId) -> Outcome {
        self.load_listing(Listing::Children(parent_id)).await
    }

    pub async fn load_resources_by_type(&self, object_type: ObjectType) -> Outcome {
        self.load_listing(Listing::ByType(object_type)).await
    }

    pub async fn create_resource(
        &self,
        name: &str,
        object_type: ObjectType,
        parent_id: Option<ObjectId>,
    ) -> Outcome {
        if let Err(err) = require_filled(&[("name", name)]) {
            return self.fail(Action::CreateObject, err).await;
        }
        let token = match self.session_token().await {
            Ok(token) => token,
            Err(err) => return self.fail(Action::CreateObject, err).await,
        };

        let request = CreateObjectRequest {
            name: name.trim().to_string(),
            object_type,
            parent_id,
        };
        match self.api.create_object(&token, &request).await {
            Ok(created) => {
                info!(
                    object_id = created.as_ref().map(|object| object.id.0),
                    object_type = %object_type,
                    "object created"
                );
                self.ui.reset_resource_form();
                self.ui.notify(Notice::success("Object created."));
                self.load_resource_list().await;
                Outcome::Done
            }
            Err(err) => self.fail(Action::CreateObject, err).await,
        }
    }

    pub async fn delete_resource(&self, id: ObjectId) -> Outcome {
        let token = match self.session_token().await {
            Ok(token) => token,
            Err(err) => return self.fail(Action::DeleteObject, err).await,
        };
        if !self.ui.confirm(&delete_prompt(id)) {
            debug!(object_id = id.0, "delete cancelled");
            return Outcome::Cancelled;
        }

        match self.api.delete_object(&token, id).await {
            Ok(()) => {
                info!(object_id = id.0, "object deleted");
                self.ui.notify(Notice::success("Object deleted."));
                self.load_resource_list().await;
                Outcome::Done
            }
            Err(err) => self.fail(Action::DeleteObject, err).await,
        }
    }

    async fn load_listing(&self, listing: Listing) -> Outcome {
        let token = match self.session_token().await {
            Ok(token) => token,
            Err(err) => return self.fail(Action::LoadObjects, err).await,
        };

        let fetched: Result<Vec<ResourceObject>, ClientError> = match listing {
            Listing::All => self.api.list_objects(&token).await,
            Listing::Children(parent_id) => self.api.list_children(&token, parent_id).await,
            Listing::ByType(object_type) => self.api.list_by_type(&token, object_type).await,
        };

        match fetched {
            Ok(objects) => {
                let view = resource_list_view(&objects);
                debug!(?listing, count = view.rows.len(), "objects loaded");
                self.ui.render_resources(&view);
                if view.is_empty() {
                    self.ui.notify(Notice::info("No objects found."));
                }
                Outcome::Done
            }
            Err(err) => {
                self.ui.render_resources(&ResourceListView::default());
                self.fail(Action::LoadObjects, err).await
            }
        }
    }

    async fn session_token(&self) -> Result<String, ClientError> {
        self.store
            .load()
            .await
            .map_err(ClientError::store)?
            .filter(|token| !token.trim().is_empty())
            .ok_or(ClientError::MissingSession)
    }

    async fn transition(&self, next: SessionState) {
        let mut state = self.state.lock().await;
        if *state != next {
            debug!(from = ?*state, to = ?next, "session state changed");
            *state = next;
        }
    }

    async fn end_session(&self) {
        if let Err(err) = self.store.clear().await {
            warn!(error = %err, "failed to clear stored session");
        }
        self.transition(SessionState::Anonymous).await;
    }

    async fn fail(&self, action: Action, err: ClientError) -> Outcome {
        let kind = err.kind();
        match kind {
            ErrorKind::Validation => {
                debug!(action = action.name(), error = %err, "input rejected");
                self.ui.notify(Notice::error(capitalize(&err.to_string())));
            }
            ErrorKind::Auth => {
                warn!(action = action.name(), error = %err, "session unusable");
                self.end_session().await;
                let message = match err {
                    ClientError::MissingSession => "Please sign in to continue.",
                    _ => "Your session has expired. Please sign in again.",
                };
                self.ui.notify(Notice::error(message));
                self.ui.navigate(View::Login);
            }
            ErrorKind::Request => {
                warn!(action = action.name(), error = %err, "request failed");
                self.ui.notify(Notice::error(action.failure_notice(&err)));
            }
        }
        Outcome::Failed(kind)
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
