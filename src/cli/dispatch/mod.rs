use crate::authflow::flow::AfterVerification;
use crate::cli::{
    actions::Action,
    commands::{ARG_AFTER_VERIFY, ARG_API_URL, ARG_SESSION_FILE, ARG_TIMEOUT},
    globals::GlobalArgs,
};
use anyhow::{anyhow, Context, Result};
use std::{path::PathBuf, time::Duration};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let globals = globals(matches)?;

    Ok(match matches.subcommand_name() {
        Some("status") => Action::Status(globals),
        Some("logout") => Action::Logout(globals),
        _ => Action::Shell(globals),
    })
}

fn globals(matches: &clap::ArgMatches) -> Result<GlobalArgs> {
    let api_url = matches
        .get_one::<String>(ARG_API_URL)
        .cloned()
        .context("missing required argument: --api-url")?;

    let mut globals = GlobalArgs::new(api_url);

    if let Some(path) = matches.get_one::<PathBuf>(ARG_SESSION_FILE) {
        globals.set_session_file(path);
    }

    if let Some(seconds) = matches.get_one::<u64>(ARG_TIMEOUT) {
        globals.timeout = Duration::from_secs(*seconds);
    }

    if let Some(after) = matches.get_one::<String>(ARG_AFTER_VERIFY) {
        globals.after_verification = after
            .parse::<AfterVerification>()
            .map_err(|e| anyhow!(e))?;
    }

    Ok(globals)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn default_action_is_the_shell() {
        let matches = commands::new().get_matches_from(vec![
            "authflow",
            "--api-url",
            "http://127.0.0.1:5000",
            "--session-file",
            "/tmp/session.json",
        ]);
        match handler(&matches).unwrap() {
            Action::Shell(globals) => {
                assert_eq!(globals.api_url, "http://127.0.0.1:5000");
                assert_eq!(globals.session_file, PathBuf::from("/tmp/session.json"));
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn subcommands_map_to_actions() {
        let matches = commands::new().get_matches_from(vec![
            "authflow",
            "--timeout",
            "4",
            "--after-verify",
            "login",
            "status",
        ]);
        match handler(&matches).unwrap() {
            Action::Status(globals) => {
                assert_eq!(globals.timeout, Duration::from_secs(4));
                assert_eq!(globals.after_verification, AfterVerification::RequireLogin);
            }
            other => panic!("unexpected action {other:?}"),
        }

        let matches = commands::new().get_matches_from(vec!["authflow", "logout"]);
        assert!(matches!(handler(&matches).unwrap(), Action::Logout(_)));
    }
}
