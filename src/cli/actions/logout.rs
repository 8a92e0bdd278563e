use crate::authflow::{flow::LOGGED_OUT, SessionStore};
use crate::cli::globals::GlobalArgs;
use anyhow::{Context, Result};
use std::io::{self, Write};
use tracing::info;

/// Forgets the stored session. No request is sent; tokens are not revoked
/// server-side.
///
/// # Errors
/// Returns an error if the session file cannot be removed.
pub fn execute(globals: &GlobalArgs) -> Result<()> {
    let mut session = SessionStore::open(globals.session_file.clone())?;
    session.clear().with_context(|| {
        format!(
            "failed to remove session file {}",
            globals.session_file.display()
        )
    })?;
    info!(path = %globals.session_file.display(), "session cleared");

    writeln!(io::stdout(), "{LOGGED_OUT}")?;
    Ok(())
}
