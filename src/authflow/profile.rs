//! Authenticated profile access. The profile is loaded on dashboard entry and kept
//! only for the lifetime of this controller. Any failure to load it ends the session;
//! save failures map status codes to fixed, field-specific messages.

use super::{
    api::{string_field, ApiClient},
    errors::FlowError,
    flow::{domain_error, network_failure, AuthFlowController, FlowState},
    types::{Profile, ProfileRecord, StatusMessage},
};
use reqwest::StatusCode;
use tracing::{info, instrument, warn};

pub const FULL_NAME_TOO_LONG: &str = "Full name must be at most 20 characters";
pub const ADDRESS_TOO_LONG: &str = "Address must be at most 20 characters";
pub const INVALID_PHONE: &str = "Phone number is not valid for its country";
pub const USER_NOT_FOUND: &str = "User not found";
pub const UPDATE_FAILED: &str = "Update failed";
pub const UPDATE_OK: &str = "Profile updated successfully";

/// Fixed message for the validation statuses of `PUT /profile`.
#[must_use]
pub fn save_status_message(status: StatusCode) -> Option<&'static str> {
    match status.as_u16() {
        402 => Some(FULL_NAME_TOO_LONG),
        403 => Some(ADDRESS_TOO_LONG),
        404 => Some(INVALID_PHONE),
        405 => Some(USER_NOT_FOUND),
        _ => None,
    }
}

#[derive(Debug)]
pub struct ProfileController {
    api: ApiClient,
    profile: Option<Profile>,
    email: Option<String>,
    message: Option<StatusMessage>,
}

impl ProfileController {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            profile: None,
            email: None,
            message: None,
        }
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Account email reported alongside the profile.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn message(&self) -> Option<&StatusMessage> {
        self.message.as_ref()
    }

    /// Forgets everything loaded for the previous session.
    pub fn reset(&mut self) {
        self.profile = None;
        self.email = None;
        self.message = None;
    }

    /// Loads the profile with the session token. A rejected or failed load clears
    /// the session and returns `flow` to `Anonymous`.
    ///
    /// # Errors
    /// Returns `FlowError::SessionExpired` when the session is missing or rejected,
    /// `FlowError::Network` on transport failure.
    #[instrument(skip_all)]
    pub async fn load_profile(&mut self, flow: &mut AuthFlowController) -> Result<(), FlowError> {
        let result = self.load(flow).await;
        self.record(result)
    }

    /// Submits `profile`. On success the local copy is replaced; the flow state is
    /// left alone unless the server rejects the token.
    ///
    /// # Errors
    /// Returns `FlowError::Domain` with the status-mapped message on validation
    /// failures, `FlowError::SessionExpired` on 401, `FlowError::Network` on transport
    /// failure.
    #[instrument(skip_all)]
    pub async fn save_profile(
        &mut self,
        flow: &mut AuthFlowController,
        profile: Profile,
    ) -> Result<(), FlowError> {
        let result = self.save(flow, profile).await;
        self.record(result)
    }

    async fn load(&mut self, flow: &mut AuthFlowController) -> Result<StatusMessage, FlowError> {
        require_authenticated(flow, "loading the profile")?;
        let Some(token) = flow.token() else {
            return Err(self.end_session(flow));
        };

        let response = self
            .api
            .fetch_profile(token)
            .await
            .map_err(network_failure)?;

        if !response.ok() {
            warn!(status = %response.status, "profile load rejected");
            return Err(self.end_session(flow));
        }

        let record: ProfileRecord = response.decode().map_err(network_failure)?;
        self.email = record.email.clone();
        self.profile = Some(Profile::from(record));
        info!("profile loaded");
        Ok(StatusMessage::info("Profile loaded"))
    }

    async fn save(
        &mut self,
        flow: &mut AuthFlowController,
        profile: Profile,
    ) -> Result<StatusMessage, FlowError> {
        require_authenticated(flow, "saving the profile")?;
        let Some(token) = flow.token() else {
            return Err(self.end_session(flow));
        };

        let response = self
            .api
            .update_profile(token, &profile)
            .await
            .map_err(network_failure)?;

        if response.status == StatusCode::UNAUTHORIZED {
            return Err(self.end_session(flow));
        }
        // The fixed messages win over whatever the body says.
        if let Some(text) = save_status_message(response.status) {
            info!(status = %response.status, "profile update rejected");
            return Err(FlowError::Domain(text.to_string()));
        }

        let body = response.json().map_err(network_failure)?;
        if !response.ok() {
            return Err(domain_error(&response, body.as_ref(), UPDATE_FAILED));
        }

        self.profile = Some(profile);
        info!("profile updated");
        Ok(StatusMessage::success(
            string_field(body.as_ref(), "message").unwrap_or_else(|| UPDATE_OK.to_string()),
        ))
    }

    fn end_session(&mut self, flow: &mut AuthFlowController) -> FlowError {
        self.profile = None;
        self.email = None;
        flow.expire_session();
        FlowError::SessionExpired
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

fn require_authenticated(
    flow: &AuthFlowController,
    operation: &'static str,
) -> Result<(), FlowError> {
    if flow.state() == &FlowState::Authenticated {
        Ok(())
    } else {
        Err(FlowError::InvalidState {
            operation,
            state: flow.state().name(),
        })
    }
}
