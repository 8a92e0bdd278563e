use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};
use std::path::PathBuf;

pub const ARG_API_URL: &str = "api-url";
pub const ARG_SESSION_FILE: &str = "session-file";
pub const ARG_TIMEOUT: &str = "timeout";
pub const ARG_AFTER_VERIFY: &str = "after-verify";
pub const ARG_VERBOSITY: &str = "verbosity";

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn validator_api_url() -> ValueParser {
    ValueParser::from(move |url: &str| -> std::result::Result<String, String> {
        let trimmed = url.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Ok(trimmed.to_string())
        } else {
            Err("expected an http:// or https:// URL".to_string())
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("authflow")
        .about("Signup, email verification, login and profile client")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand(Command::new("shell").about("Interactive session (default)"))
        .subcommand(
            Command::new("status").about("Show the stored session and, when logged in, the profile"),
        )
        .subcommand(Command::new("logout").about("Forget the stored session"))
        .arg(
            Arg::new(ARG_API_URL)
                .short('u')
                .long("api-url")
                .help("Base URL of the authentication API")
                .default_value("http://127.0.0.1:5000")
                .env("AUTHFLOW_API_URL")
                .global(true)
                .value_parser(validator_api_url()),
        )
        .arg(
            Arg::new(ARG_SESSION_FILE)
                .short('s')
                .long("session-file")
                .help("Where a remembered session token is kept (default: ~/.authflow/session.json)")
                .env("AUTHFLOW_SESSION_FILE")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .short('t')
                .long("timeout")
                .help("Request timeout in seconds")
                .default_value("10")
                .env("AUTHFLOW_TIMEOUT")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..=300)),
        )
        .arg(
            Arg::new(ARG_AFTER_VERIFY)
                .long("after-verify")
                .help("Outcome of a successful email verification")
                .default_value("authenticate")
                .env("AUTHFLOW_AFTER_VERIFY")
                .global(true)
                .value_parser(["authenticate", "login"]),
        )
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("AUTHFLOW_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
