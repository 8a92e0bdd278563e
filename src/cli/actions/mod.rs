pub mod logout;
pub mod shell;
pub mod status;

// Internal "interpreter" for `Action`.
mod run;

use crate::authflow::{ApiClient, AuthApp, SessionStore};
use crate::cli::globals::GlobalArgs;
use anyhow::{Context, Result};
use tracing::debug;

#[derive(Debug)]
pub enum Action {
    Shell(GlobalArgs),
    Status(GlobalArgs),
    Logout(GlobalArgs),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> Result<()> {
        run::execute(self).await
    }
}

/// Wires the HTTP client and the session file into an app.
///
/// # Errors
/// Returns an error if the API URL is unusable or the session file cannot be read.
pub fn build_app(globals: &GlobalArgs) -> Result<AuthApp> {
    let api = ApiClient::new(&globals.api_url, globals.timeout)
        .with_context(|| format!("invalid API URL: {}", globals.api_url))?;
    debug!(api = api.base_url(), timeout = ?globals.timeout, "api client ready");
    let session = SessionStore::open(globals.session_file.clone())?;

    Ok(AuthApp::new(api, session, globals.after_verification))
}
