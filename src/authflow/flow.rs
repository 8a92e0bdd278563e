//! Signup, verification and login state machine.
//!
//! `AuthFlowController` owns the `FlowState` and the `SessionStore`. Each operation
//! validates its input locally, issues at most one request, and translates the
//! response into a state transition plus a `StatusMessage`. Transport failures map
//! to `FlowError::Network` and never change the state, so the user can retry from
//! the same screen. Operations take `&mut self`, which rules out overlapping
//! requests on one controller.

use super::{
    api::{string_field, ApiClient, ApiResponse},
    errors::{ApiError, FlowError},
    session::SessionStore,
    types::{Credentials, PasswordResetRequest, SignupRequest, StatusMessage},
};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::{fmt, str::FromStr};
use tracing::{info, instrument, warn};

pub const PASSWORD_MISMATCH: &str = "passwords do not match";
pub const EMAIL_REQUIRED: &str = "Please enter your email address";
pub const PASSWORD_REQUIRED: &str = "Please enter your password";
pub const CODE_REQUIRED: &str = "Please enter the verification code";
pub const SIGNUP_SENT: &str = "Signup successful. A verification code was sent to your email.";
pub const SIGNUP_FAILED: &str = "Signup failed";
pub const VERIFIED: &str = "Email verified.";
pub const VERIFIED_LOGIN: &str = "Email verified. Please log in.";
pub const INVALID_CODE: &str = "Invalid verification code";
pub const LOGIN_OK: &str = "Login successful";
pub const LOGIN_FAILED: &str = "Login failed";
pub const LOGGED_OUT: &str = "You have been logged out.";
pub const RESET_REQUEST_FAILED: &str = "Password reset request failed";
pub const RESET_OK: &str = "Password reset successfully";
pub const RESET_FAILED: &str = "Password reset failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Anonymous,
    SigningUp,
    /// Carries the email used at signup; verify and resend always reuse it.
    AwaitingVerification(String),
    Authenticated,
}

impl FlowState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::SigningUp => "signing up",
            Self::AwaitingVerification(_) => "awaiting verification",
            Self::Authenticated => "authenticated",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingVerification(email) => write!(f, "awaiting verification ({email})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Form shown while the user is not authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Signup,
}

/// What a successful email verification leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfterVerification {
    /// Enter `Authenticated` directly. No token is issued by verification.
    #[default]
    Authenticate,
    /// Return to the login form.
    RequireLogin,
}

impl FromStr for AfterVerification {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "authenticate" => Ok(Self::Authenticate),
            "login" => Ok(Self::RequireLogin),
            other => Err(format!(
                "invalid verification outcome '{other}', expected 'authenticate' or 'login'"
            )),
        }
    }
}

#[derive(Debug)]
pub struct AuthFlowController {
    api: ApiClient,
    session: SessionStore,
    state: FlowState,
    after_verification: AfterVerification,
    message: Option<StatusMessage>,
}

impl AuthFlowController {
    /// Starts `Authenticated` when the store already holds a token (pending profile
    /// confirmation), `Anonymous` otherwise.
    #[must_use]
    pub fn new(
        api: ApiClient,
        session: SessionStore,
        after_verification: AfterVerification,
    ) -> Self {
        let state = if session.get().is_some() {
            FlowState::Authenticated
        } else {
            FlowState::Anonymous
        };

        Self {
            api,
            session,
            state,
            after_verification,
            message: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// The form currently shown, if any.
    #[must_use]
    pub fn view(&self) -> Option<View> {
        match self.state {
            FlowState::Anonymous => Some(View::Login),
            FlowState::SigningUp => Some(View::Signup),
            FlowState::AwaitingVerification(_) | FlowState::Authenticated => None,
        }
    }

    #[must_use]
    pub fn message(&self) -> Option<&StatusMessage> {
        self.message.as_ref()
    }

    #[must_use]
    pub fn token(&self) -> Option<&SecretString> {
        self.session.get()
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Switches between the login and signup forms. Returns `false` and changes
    /// nothing outside `Anonymous`/`SigningUp`, so a pending verification cannot be
    /// abandoned.
    pub fn switch_view(&mut self, target: View) -> bool {
        if !matches!(self.state, FlowState::Anonymous | FlowState::SigningUp) {
            return false;
        }

        self.state = match target {
            View::Login => FlowState::Anonymous,
            View::Signup => FlowState::SigningUp,
        };
        self.message = None;
        true
    }

    /// # Errors
    /// Returns `FlowError` when the passwords differ, the server rejects the signup or
    /// the request fails.
    #[instrument(skip_all)]
    pub async fn submit_signup(&mut self, request: SignupRequest) -> Result<(), FlowError> {
        let result = self.signup(&request.normalized()).await;
        self.record(result)
    }

    /// # Errors
    /// Returns `FlowError` when not awaiting verification, the code is rejected or
    /// the request fails.
    #[instrument(skip_all)]
    pub async fn submit_verification(&mut self, code: &str) -> Result<(), FlowError> {
        let result = self.verify(code).await;
        self.record(result)
    }

    /// # Errors
    /// Returns `FlowError` when not awaiting verification, the server reports a
    /// failure status or the request fails.
    #[instrument(skip_all)]
    pub async fn resend_verification(&mut self) -> Result<(), FlowError> {
        let result = self.resend().await;
        self.record(result)
    }

    /// `remember` is forwarded to the server and decides whether the token is
    /// persisted beyond this process.
    ///
    /// # Errors
    /// Returns `FlowError` when fields are empty, the server rate limits or rejects
    /// the login, or the request fails.
    #[instrument(skip(self, credentials))]
    pub async fn submit_login(
        &mut self,
        credentials: Credentials,
        remember: bool,
    ) -> Result<(), FlowError> {
        let result = self.login(&credentials.normalized(), remember).await;
        self.record(result)
    }

    /// Local logout; no request is made.
    ///
    /// # Errors
    /// Returns `FlowError::InvalidState` while awaiting verification.
    pub fn logout(&mut self) -> Result<(), FlowError> {
        let result = if let FlowState::AwaitingVerification(_) = self.state {
            Err(self.invalid("logout"))
        } else {
            self.drop_session();
            self.state = FlowState::Anonymous;
            info!("logged out");
            Ok(StatusMessage::info(LOGGED_OUT))
        };
        self.record(result)
    }

    /// Ends the session after a protected endpoint rejected it.
    pub fn expire_session(&mut self) {
        warn!("session rejected, returning to login");
        self.drop_session();
        self.state = FlowState::Anonymous;
        self.message = Some(StatusMessage::error(FlowError::SessionExpired.to_string()));
    }

    /// # Errors
    /// Returns `FlowError` when the email is empty, the server rejects the request
    /// or the request fails.
    #[instrument(skip_all)]
    pub async fn request_password_reset(&mut self, email: &str) -> Result<(), FlowError> {
        let result = self.password_reset(email.trim()).await;
        self.record(result)
    }

    /// # Errors
    /// Returns `FlowError` when the new passwords differ, the server rejects the code
    /// or the request fails.
    #[instrument(skip_all)]
    pub async fn submit_password_reset(
        &mut self,
        request: PasswordResetRequest,
    ) -> Result<(), FlowError> {
        let result = self.reset_password(&request.normalized()).await;
        self.record(result)
    }

    async fn signup(&mut self, request: &SignupRequest) -> Result<StatusMessage, FlowError> {
        if !self.is_signed_out() {
            return Err(self.invalid("signup"));
        }
        validate_credentials(&request.credentials)?;
        if request.credentials.password.expose_secret() != request.confirm_password.expose_secret()
        {
            return Err(FlowError::Validation(PASSWORD_MISMATCH.to_string()));
        }

        let response = self
            .api
            .signup(&request.credentials)
            .await
            .map_err(network_failure)?;
        let body = response.json().map_err(network_failure)?;

        if response.ok() {
            info!("signup accepted, awaiting verification");
            self.state = FlowState::AwaitingVerification(request.credentials.email.clone());
            Ok(StatusMessage::success(SIGNUP_SENT))
        } else {
            self.state = FlowState::SigningUp;
            Err(domain_error(&response, body.as_ref(), SIGNUP_FAILED))
        }
    }

    async fn verify(&mut self, code: &str) -> Result<StatusMessage, FlowError> {
        let FlowState::AwaitingVerification(email) = &self.state else {
            return Err(self.invalid("verification"));
        };
        let email = email.clone();

        let code = code.trim();
        if code.is_empty() {
            return Err(FlowError::Validation(CODE_REQUIRED.to_string()));
        }
        let code = SecretString::from(code.to_string());

        let response = self
            .api
            .verify_email(&email, &code)
            .await
            .map_err(network_failure)?;
        let body = response.json().map_err(network_failure)?;

        if !response.ok() {
            return Err(domain_error(&response, body.as_ref(), INVALID_CODE));
        }

        info!("email verified");
        match self.after_verification {
            AfterVerification::Authenticate => {
                self.state = FlowState::Authenticated;
                Ok(StatusMessage::success(VERIFIED))
            }
            AfterVerification::RequireLogin => {
                self.state = FlowState::Anonymous;
                Ok(StatusMessage::success(VERIFIED_LOGIN))
            }
        }
    }

    async fn resend(&mut self) -> Result<StatusMessage, FlowError> {
        let FlowState::AwaitingVerification(email) = &self.state else {
            return Err(self.invalid("resending the code"));
        };

        let response = self
            .api
            .resend_verification(email)
            .await
            .map_err(network_failure)?;
        let body = response.json().map_err(network_failure)?;
        let text = string_field(body.as_ref(), "message")
            .or_else(|| string_field(body.as_ref(), "error"))
            .unwrap_or_default();

        if response.ok() {
            Ok(StatusMessage::success(text))
        } else {
            Err(FlowError::Domain(text))
        }
    }

    async fn login(
        &mut self,
        credentials: &Credentials,
        remember: bool,
    ) -> Result<StatusMessage, FlowError> {
        if !self.is_signed_out() {
            return Err(self.invalid("login"));
        }
        validate_credentials(credentials)?;

        let response = self
            .api
            .login(credentials, remember)
            .await
            .map_err(network_failure)?;

        if response.status == StatusCode::TOO_MANY_REQUESTS {
            warn!("login rate limited");
            self.state = FlowState::Anonymous;
            return Err(FlowError::RateLimited);
        }

        let body = response.json().map_err(network_failure)?;
        let token = if response.ok() {
            string_field(body.as_ref(), "access_token")
        } else {
            None
        };

        let Some(token) = token else {
            self.state = FlowState::Anonymous;
            return Err(domain_error(&response, body.as_ref(), LOGIN_FAILED));
        };

        if let Err(e) = self.session.set(SecretString::from(token), remember) {
            // The token is still held in memory for this process.
            warn!("failed to persist session: {e:#}");
        }
        self.state = FlowState::Authenticated;
        info!(remember, "login succeeded");
        Ok(StatusMessage::success(LOGIN_OK))
    }

    async fn password_reset(&mut self, email: &str) -> Result<StatusMessage, FlowError> {
        if !self.is_signed_out() {
            return Err(self.invalid("password reset"));
        }
        if email.is_empty() {
            return Err(FlowError::Validation(EMAIL_REQUIRED.to_string()));
        }

        let response = self
            .api
            .request_password_reset(email)
            .await
            .map_err(network_failure)?;
        let body = response.json().map_err(network_failure)?;

        if response.ok() {
            Ok(StatusMessage::success(
                string_field(body.as_ref(), "message").unwrap_or_default(),
            ))
        } else {
            Err(domain_error(&response, body.as_ref(), RESET_REQUEST_FAILED))
        }
    }

    async fn reset_password(
        &mut self,
        request: &PasswordResetRequest,
    ) -> Result<StatusMessage, FlowError> {
        if !self.is_signed_out() {
            return Err(self.invalid("password reset"));
        }
        if request.email.is_empty() {
            return Err(FlowError::Validation(EMAIL_REQUIRED.to_string()));
        }
        if request.code.expose_secret().is_empty() {
            return Err(FlowError::Validation(CODE_REQUIRED.to_string()));
        }
        if request.new_password.expose_secret().is_empty() {
            return Err(FlowError::Validation(PASSWORD_REQUIRED.to_string()));
        }
        if request.new_password.expose_secret() != request.confirm_password.expose_secret() {
            return Err(FlowError::Validation(PASSWORD_MISMATCH.to_string()));
        }

        let response = self
            .api
            .reset_password(request)
            .await
            .map_err(network_failure)?;
        let body = response.json().map_err(network_failure)?;

        if response.ok() {
            Ok(StatusMessage::success(
                string_field(body.as_ref(), "message").unwrap_or_else(|| RESET_OK.to_string()),
            ))
        } else {
            Err(domain_error(&response, body.as_ref(), RESET_FAILED))
        }
    }

    fn is_signed_out(&self) -> bool {
        matches!(self.state, FlowState::Anonymous | FlowState::SigningUp)
    }

    fn invalid(&self, operation: &'static str) -> FlowError {
        FlowError::InvalidState {
            operation,
            state: self.state.name(),
        }
    }

    fn drop_session(&mut self) {
        if let Err(e) = self.session.clear() {
            warn!("failed to clear session: {e:#}");
        }
    }

    fn record(&mut self, result: Result<StatusMessage, FlowError>) -> Result<(), FlowError> {
        match result {
            Ok(message) => {
                self.message = Some(message);
                Ok(())
            }
            Err(err) => {
                self.message = Some(StatusMessage::error(err.to_string()));
                Err(err)
            }
        }
    }
}

fn validate_credentials(credentials: &Credentials) -> Result<(), FlowError> {
    if credentials.email.is_empty() {
        return Err(FlowError::Validation(EMAIL_REQUIRED.to_string()));
    }
    if credentials.password.expose_secret().is_empty() {
        return Err(FlowError::Validation(PASSWORD_REQUIRED.to_string()));
    }
    Ok(())
}

/// Server-provided `error` text, or `fallback`.
pub(crate) fn domain_error(
    response: &ApiResponse,
    body: Option<&Value>,
    fallback: &str,
) -> FlowError {
    let text = string_field(body, "error").unwrap_or_else(|| fallback.to_string());
    info!(status = %response.status, "request rejected: {text}");
    FlowError::Domain(text)
}

pub(crate) fn network_failure(err: ApiError) -> FlowError {
    warn!("request failed: {err}");
    FlowError::from(err)
}
