use crate::authflow::SessionStore;
use crate::cli::{
    actions::{build_app, shell::render},
    globals::GlobalArgs,
};
use anyhow::Result;
use std::io::{self, Write};
use tracing::debug;

/// Confirms the stored session against the API and prints the outcome.
///
/// # Errors
/// Returns an error if the app cannot be built or stdout fails.
pub async fn execute(globals: GlobalArgs) -> Result<()> {
    let mut app = build_app(&globals)?;
    let mut stdout = io::stdout();

    writeln!(stdout, "{}", describe_session(app.flow().session()))?;

    if let Err(error) = app.start().await {
        debug!(%error, "stored session not confirmed");
    }
    render(&app, &mut stdout)?;

    Ok(())
}

fn describe_session(session: &SessionStore) -> String {
    let location = session
        .path()
        .map_or_else(|| "memory".to_string(), |path| path.display().to_string());

    if session.is_persistent() {
        format!("session: remembered in {location}")
    } else {
        format!("session: none stored in {location}")
    }
}
