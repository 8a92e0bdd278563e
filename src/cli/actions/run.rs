use crate::cli::actions::{logout, shell, status, Action};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Shell(globals) => shell::execute(globals).await,
        Action::Status(globals) => status::execute(globals).await,
        Action::Logout(globals) => logout::execute(&globals),
    }
}
