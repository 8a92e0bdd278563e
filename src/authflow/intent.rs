//! User intents and the dispatcher that routes them to the controllers.
//!
//! The presentation layer only emits `UserIntent` values and renders what
//! `AuthApp` exposes afterwards (flow state, messages, profile). Entering
//! `Authenticated` with a token counts as dashboard entry and loads the profile.

use super::{
    api::ApiClient,
    errors::FlowError,
    flow::{AfterVerification, AuthFlowController, FlowState, View},
    profile::ProfileController,
    session::SessionStore,
    types::{Credentials, PasswordResetRequest, Profile, SignupRequest, StatusMessage},
};
use tracing::debug;

#[derive(Debug)]
pub enum UserIntent {
    ShowLogin,
    ShowSignup,
    Signup(SignupRequest),
    Verify { code: String },
    ResendVerification,
    Login { credentials: Credentials, remember: bool },
    Logout,
    LoadProfile,
    SaveProfile(Profile),
    RequestPasswordReset { email: String },
    ResetPassword(PasswordResetRequest),
}

impl UserIntent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ShowLogin => "show-login",
            Self::ShowSignup => "show-signup",
            Self::Signup(_) => "signup",
            Self::Verify { .. } => "verify",
            Self::ResendVerification => "resend",
            Self::Login { .. } => "login",
            Self::Logout => "logout",
            Self::LoadProfile => "load-profile",
            Self::SaveProfile(_) => "save-profile",
            Self::RequestPasswordReset { .. } => "forgot-password",
            Self::ResetPassword(_) => "reset-password",
        }
    }
}

/// Controller whose message was recorded last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageSource {
    Flow,
    Profile,
}

#[derive(Debug)]
pub struct AuthApp {
    flow: AuthFlowController,
    profile: ProfileController,
    last_message: MessageSource,
}

impl AuthApp {
    #[must_use]
    pub fn new(api: ApiClient, session: SessionStore, after: AfterVerification) -> Self {
        Self {
            flow: AuthFlowController::new(api.clone(), session, after),
            profile: ProfileController::new(api),
            last_message: MessageSource::Flow,
        }
    }

    #[must_use]
    pub fn flow(&self) -> &AuthFlowController {
        &self.flow
    }

    #[must_use]
    pub fn profile(&self) -> &ProfileController {
        &self.profile
    }

    /// Most recently recorded message; profile messages only count while
    /// authenticated.
    #[must_use]
    pub fn message(&self) -> Option<&StatusMessage> {
        if self.flow.state() != &FlowState::Authenticated {
            return self.flow.message();
        }
        match self.last_message {
            MessageSource::Profile => self.profile.message().or_else(|| self.flow.message()),
            MessageSource::Flow => self.flow.message().or_else(|| self.profile.message()),
        }
    }

    /// Confirms a persisted session by loading the profile. Does nothing unless the
    /// flow starts out authenticated.
    ///
    /// # Errors
    /// Returns the profile load error; the flow is already back to `Anonymous` when
    /// the session was rejected.
    pub async fn start(&mut self) -> Result<(), FlowError> {
        if self.flow.state() == &FlowState::Authenticated && self.flow.token().is_some() {
            self.last_message = MessageSource::Profile;
            self.profile.load_profile(&mut self.flow).await
        } else {
            Ok(())
        }
    }

    /// Applies one intent and returns the outcome of the operation it maps to.
    /// Loading the profile on dashboard entry is reported through the messages only.
    ///
    /// # Errors
    /// Returns the `FlowError` of the dispatched operation.
    pub async fn dispatch(&mut self, intent: UserIntent) -> Result<(), FlowError> {
        debug!(intent = intent.name(), state = self.flow.state().name(), "dispatch");
        let was_authenticated = self.flow.state() == &FlowState::Authenticated;
        self.last_message = match intent {
            UserIntent::LoadProfile | UserIntent::SaveProfile(_) => MessageSource::Profile,
            _ => MessageSource::Flow,
        };

        let result = match intent {
            UserIntent::ShowLogin => {
                self.flow.switch_view(View::Login);
                Ok(())
            }
            UserIntent::ShowSignup => {
                self.flow.switch_view(View::Signup);
                Ok(())
            }
            UserIntent::Signup(request) => self.flow.submit_signup(request).await,
            UserIntent::Verify { code } => self.flow.submit_verification(&code).await,
            UserIntent::ResendVerification => self.flow.resend_verification().await,
            UserIntent::Login {
                credentials,
                remember,
            } => self.flow.submit_login(credentials, remember).await,
            UserIntent::Logout => self.flow.logout(),
            UserIntent::LoadProfile => self.profile.load_profile(&mut self.flow).await,
            UserIntent::SaveProfile(profile) => {
                self.profile.save_profile(&mut self.flow, profile).await
            }
            UserIntent::RequestPasswordReset { email } => {
                self.flow.request_password_reset(&email).await
            }
            UserIntent::ResetPassword(request) => self.flow.submit_password_reset(request).await,
        };

        let authenticated = self.flow.state() == &FlowState::Authenticated;
        if authenticated && !was_authenticated && self.flow.token().is_some() {
            // A successful load keeps the login message in front.
            if self.profile.load_profile(&mut self.flow).await.is_err() {
                self.last_message = MessageSource::Profile;
            }
        } else if !authenticated {
            self.profile.reset();
        }

        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::authflow::{api::DEFAULT_TIMEOUT, flow::LOGIN_OK, types::Tone};
    use std::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[tokio::test]
    async fn view_intents_switch_forms_without_requests() {
        let api = ApiClient::new("http://127.0.0.1:9", DEFAULT_TIMEOUT).unwrap();
        let mut app = AuthApp::new(api, SessionStore::in_memory(), AfterVerification::Authenticate);

        app.dispatch(UserIntent::ShowSignup).await.unwrap();
        assert_eq!(app.flow().view(), Some(View::Signup));
        app.dispatch(UserIntent::ShowLogin).await.unwrap();
        assert_eq!(app.flow().view(), Some(View::Login));
        assert!(app.message().is_none());
    }

    #[tokio::test]
    async fn start_is_a_no_op_without_session() {
        let api = ApiClient::new("http://127.0.0.1:9", DEFAULT_TIMEOUT).unwrap();
        let mut app = AuthApp::new(api, SessionStore::in_memory(), AfterVerification::Authenticate);
        app.start().await.unwrap();
        assert_eq!(app.flow().state(), &FlowState::Anonymous);
    }

    #[test]
    fn intent_names_are_stable() {
        assert_eq!(UserIntent::Logout.name(), "logout");
        assert_eq!(
            UserIntent::Verify {
                code: "1".to_string()
            }
            .name(),
            "verify"
        );
    }

    #[tokio::test]
    async fn latest_message_wins_while_authenticated() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logintoken"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "tok" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/profile"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "email": "a@b.com", "full_name": "Ada" })),
            )
            .expect(2)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri(), DEFAULT_TIMEOUT).unwrap();
        let mut app = AuthApp::new(api, SessionStore::in_memory(), AfterVerification::Authenticate);

        app.dispatch(UserIntent::Login {
            credentials: Credentials::new("a@b.com", "pw"),
            remember: false,
        })
        .await
        .unwrap();
        assert_eq!(app.flow().state(), &FlowState::Authenticated);
        assert!(app.profile().profile().is_some());
        assert_eq!(app.message().unwrap().text, LOGIN_OK);

        app.dispatch(UserIntent::LoadProfile).await.unwrap();
        assert_eq!(app.message().unwrap().text, "Profile loaded");

        let err = app
            .dispatch(UserIntent::Verify {
                code: "1".to_string(),
            })
            .await
            .unwrap_err();
        let message = app.message().unwrap();
        assert_eq!(message.tone, Tone::Error);
        assert_eq!(message.text, err.to_string());
        assert_eq!(app.flow().state(), &FlowState::Authenticated);
    }
}
