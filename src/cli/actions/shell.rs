//! Line-oriented front end. Each line becomes at most one `UserIntent`; the next
//! prompt is only shown once the previous request has settled, so a single
//! operation is ever in flight.

use crate::authflow::{
    types::PasswordResetRequest, AuthApp, Credentials, FlowState, Profile, SignupRequest,
    StatusMessage, Tone, UserIntent,
};
use crate::cli::{actions::build_app, globals::GlobalArgs};
use anyhow::Result;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "\
commands:
  signup <email> <password> <confirm>     create an account
  verify <code>                           submit the emailed code
  resend                                  send a new verification code
  login <email> <password> [--remember]   log in, --remember keeps the session on disk
  logout                                  forget the session
  view login|signup                       switch forms
  profile                                 reload the profile
  save <full name> | <address> | <phone>  update the profile, empty fields are kept
  forgot <email>                          request a password reset code
  reset <email> <code> <new> <confirm>    set a new password
  status                                  show the current state
  help                                    this text
  quit                                    leave";

#[derive(Debug)]
pub enum ShellCommand {
    Intent(UserIntent),
    /// Profile edit where `None` keeps the loaded value.
    EditProfile {
        full_name: Option<String>,
        address: Option<String>,
        phone_number: Option<String>,
    },
    Status,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`; unknown commands yield the
/// usage hint as error.
///
/// Missing positional arguments are passed on as empty strings so the controllers
/// report them with their usual messages.
///
/// # Errors
/// Returns a usage hint for unknown commands or malformed arguments.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    let Some((command, rest)) = split_command(line) else {
        return Ok(None);
    };

    let args: Vec<&str> = rest.split_whitespace().collect();
    let arg = |index: usize| args.get(index).copied().unwrap_or("");

    let parsed = match command.to_lowercase().as_str() {
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        "status" => ShellCommand::Status,
        "signup" => ShellCommand::Intent(UserIntent::Signup(SignupRequest::new(
            arg(0),
            arg(1),
            arg(2),
        ))),
        "verify" => ShellCommand::Intent(UserIntent::Verify {
            code: arg(0).to_string(),
        }),
        "resend" => ShellCommand::Intent(UserIntent::ResendVerification),
        "login" => {
            let remember = args.iter().any(|a| matches!(*a, "--remember" | "-r"));
            let positional: Vec<&str> = args
                .iter()
                .copied()
                .filter(|a| !matches!(*a, "--remember" | "-r"))
                .collect();
            let email = positional.first().copied().unwrap_or("");
            let password = positional.get(1).copied().unwrap_or("");
            ShellCommand::Intent(UserIntent::Login {
                credentials: Credentials::new(email, password),
                remember,
            })
        }
        "logout" => ShellCommand::Intent(UserIntent::Logout),
        "view" => match arg(0) {
            "login" => ShellCommand::Intent(UserIntent::ShowLogin),
            "signup" => ShellCommand::Intent(UserIntent::ShowSignup),
            _ => return Err("usage: view login|signup".to_string()),
        },
        "profile" => ShellCommand::Intent(UserIntent::LoadProfile),
        "save" => {
            let fields: Vec<&str> = rest.split('|').map(str::trim).collect();
            if fields.len() != 3 {
                return Err("usage: save <full name> | <address> | <phone>".to_string());
            }
            let keep_or = |value: &str| (!value.is_empty()).then(|| value.to_string());
            ShellCommand::EditProfile {
                full_name: keep_or(fields[0]),
                address: keep_or(fields[1]),
                phone_number: keep_or(fields[2]),
            }
        }
        "forgot" => ShellCommand::Intent(UserIntent::RequestPasswordReset {
            email: arg(0).to_string(),
        }),
        "reset" => ShellCommand::Intent(UserIntent::ResetPassword(PasswordResetRequest::new(
            arg(0),
            arg(1),
            arg(2),
            arg(3),
        ))),
        other => return Err(format!("unknown command '{other}', type 'help'")),
    };

    Ok(Some(parsed))
}

fn split_command(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    Some(
        line.split_once(char::is_whitespace)
            .map_or((line, ""), |(command, rest)| (command, rest.trim())),
    )
}

/// Fills unset fields from the currently loaded profile.
#[must_use]
pub fn merge_profile(
    current: Option<&Profile>,
    full_name: Option<String>,
    address: Option<String>,
    phone_number: Option<String>,
) -> Profile {
    let current = current.cloned().unwrap_or_default();
    Profile {
        full_name: full_name.unwrap_or(current.full_name),
        address: address.unwrap_or(current.address),
        phone_number: phone_number.unwrap_or(current.phone_number),
    }
}

fn tag(message: &StatusMessage) -> &'static str {
    match message.tone {
        Tone::Info => "[info]",
        Tone::Success => "[ok]",
        Tone::Error => "[error]",
    }
}

/// Writes the state line, the latest message and, on the dashboard, the profile.
///
/// # Errors
/// Returns an error if `out` cannot be written to.
pub fn render(app: &AuthApp, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "state: {}", app.flow().state())?;

    if let Some(message) = app.message() {
        writeln!(out, "{} {}", tag(message), message.text)?;
    }

    if app.flow().state() == &FlowState::Authenticated {
        if let Some(email) = app.profile().email() {
            writeln!(out, "  email:        {email}")?;
        }
        if let Some(profile) = app.profile().profile() {
            writeln!(out, "  full name:    {}", profile.full_name)?;
            writeln!(out, "  address:      {}", profile.address)?;
            writeln!(out, "  phone number: {}", profile.phone_number)?;
        }
    }

    Ok(())
}

async fn apply(app: &mut AuthApp, intent: UserIntent, out: &mut impl Write) -> io::Result<()> {
    if let Err(error) = app.dispatch(intent).await {
        debug!(%error, "intent failed");
        // Errors raised outside the visible controller (e.g. profile commands while
        // logged out) have no message of their own.
        let shown = app.message().map(|m| m.text.as_str());
        if shown != Some(error.to_string().as_str()) {
            writeln!(out, "[error] {error}")?;
        }
    }
    render(app, out)
}

/// Run the interactive shell until `quit` or end of input.
///
/// # Errors
/// Returns an error if the app cannot be built or stdin/stdout fail.
pub async fn execute(globals: GlobalArgs) -> Result<()> {
    let mut app = build_app(&globals)?;
    let mut stdout = io::stdout();

    if let Err(error) = app.start().await {
        debug!(%error, "stored session not confirmed");
    }
    render(&app, &mut stdout)?;
    writeln!(stdout, "type 'help' for commands")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        write!(stdout, "authflow> ")?;
        stdout.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(stdout)?;
            break;
        };

        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ShellCommand::Quit)) => break,
            Ok(Some(ShellCommand::Help)) => writeln!(stdout, "{HELP}")?,
            Ok(Some(ShellCommand::Status)) => render(&app, &mut stdout)?,
            Ok(Some(ShellCommand::Intent(intent))) => apply(&mut app, intent, &mut stdout).await?,
            Ok(Some(ShellCommand::EditProfile {
                full_name,
                address,
                phone_number,
            })) => {
                let profile =
                    merge_profile(app.profile().profile(), full_name, address, phone_number);
                apply(&mut app, UserIntent::SaveProfile(profile), &mut stdout).await?;
            }
            Err(usage) => writeln!(stdout, "{usage}")?,
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::authflow::{
        api::DEFAULT_TIMEOUT, flow::AfterVerification, ApiClient, SessionStore,
    };
    use secrecy::ExposeSecret;

    fn intent(line: &str) -> UserIntent {
        match parse_line(line).unwrap() {
            Some(ShellCommand::Intent(intent)) => intent,
            other => panic!("expected an intent, got {other:?}"),
        }
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("   \t").unwrap().is_none());
    }

    #[test]
    fn parses_signup() {
        let UserIntent::Signup(request) = intent("signup  a@b.com  secret1 secret1") else {
            panic!("expected signup");
        };
        assert_eq!(request.credentials.email, "a@b.com");
        assert_eq!(request.credentials.password.expose_secret(), "secret1");
        assert_eq!(request.confirm_password.expose_secret(), "secret1");
    }

    #[test]
    fn parses_login_with_remember_anywhere() {
        for line in ["login a@b.com pw --remember", "login --remember a@b.com pw"] {
            let UserIntent::Login {
                credentials,
                remember,
            } = intent(line)
            else {
                panic!("expected login");
            };
            assert_eq!(credentials.email, "a@b.com");
            assert_eq!(credentials.password.expose_secret(), "pw");
            assert!(remember);
        }

        let UserIntent::Login { remember, .. } = intent("LOGIN a@b.com pw") else {
            panic!("expected login");
        };
        assert!(!remember);
    }

    #[test]
    fn missing_arguments_become_empty_fields() {
        let UserIntent::Login { credentials, .. } = intent("login a@b.com") else {
            panic!("expected login");
        };
        assert_eq!(credentials.password.expose_secret(), "");

        let UserIntent::Verify { code } = intent("verify") else {
            panic!("expected verify");
        };
        assert!(code.is_empty());
    }

    #[test]
    fn parses_profile_edits() {
        match parse_line("save Ada Lovelace | | +44 20 7946 0958").unwrap() {
            Some(ShellCommand::EditProfile {
                full_name,
                address,
                phone_number,
            }) => {
                assert_eq!(full_name.as_deref(), Some("Ada Lovelace"));
                assert!(address.is_none());
                assert_eq!(phone_number.as_deref(), Some("+44 20 7946 0958"));
            }
            other => panic!("expected edit, got {other:?}"),
        }

        assert!(parse_line("save only a name").is_err());
    }

    #[test]
    fn rejects_unknown_commands() {
        let err = parse_line("dance").unwrap_err();
        assert!(err.contains("unknown command 'dance'"));
        assert!(parse_line("view dashboard").is_err());
    }

    #[test]
    fn parses_control_commands() {
        assert!(matches!(parse_line("quit").unwrap(), Some(ShellCommand::Quit)));
        assert!(matches!(parse_line("exit").unwrap(), Some(ShellCommand::Quit)));
        assert!(matches!(parse_line("?").unwrap(), Some(ShellCommand::Help)));
        assert!(matches!(
            parse_line("status").unwrap(),
            Some(ShellCommand::Status)
        ));
        assert!(matches!(intent("view signup"), UserIntent::ShowSignup));
        assert!(matches!(intent("profile"), UserIntent::LoadProfile));
        assert!(matches!(
            intent("forgot a@b.com"),
            UserIntent::RequestPasswordReset { .. }
        ));
        assert!(matches!(
            intent("reset a@b.com 1234 n1 n1"),
            UserIntent::ResetPassword(_)
        ));
    }

    #[test]
    fn merge_keeps_loaded_values() {
        let current = Profile {
            full_name: "Ada".to_string(),
            address: "London".to_string(),
            phone_number: "123".to_string(),
        };
        let merged = merge_profile(Some(&current), None, Some("Paris".to_string()), None);
        assert_eq!(
            merged,
            Profile {
                full_name: "Ada".to_string(),
                address: "Paris".to_string(),
                phone_number: "123".to_string(),
            }
        );
        assert_eq!(merge_profile(None, None, None, None), Profile::default());
    }

    #[tokio::test]
    async fn renders_state_and_local_validation_message() {
        let api = ApiClient::new("http://127.0.0.1:9", DEFAULT_TIMEOUT).unwrap();
        let mut app = AuthApp::new(
            api,
            SessionStore::in_memory(),
            AfterVerification::Authenticate,
        );

        let mut out = Vec::new();
        apply(&mut app, intent("signup a@b.com one two"), &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("state: anonymous"));
        assert!(text.contains("[error] passwords do not match"));
        assert_eq!(text.matches("passwords do not match").count(), 1);
    }

    #[tokio::test]
    async fn profile_commands_while_logged_out_report_the_error() {
        let api = ApiClient::new("http://127.0.0.1:9", DEFAULT_TIMEOUT).unwrap();
        let mut app = AuthApp::new(
            api,
            SessionStore::in_memory(),
            AfterVerification::Authenticate,
        );

        let mut out = Vec::new();
        apply(&mut app, UserIntent::LoadProfile, &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[error] loading the profile is not available while anonymous"));
    }
}
