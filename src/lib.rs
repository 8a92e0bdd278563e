//! # Authflow (client-side authentication and session controller)
//!
//! `authflow` drives a user through signup, email verification, login and
//! authenticated profile access against a remote JSON API.
//!
//! ## Flow
//!
//! 1. **Signup:** credentials plus a confirmation password are checked locally and
//!    posted to `/signup`. Success moves the flow to `AwaitingVerification(email)`.
//! 2. **Verification:** the emailed code is posted to `/email_verification` together
//!    with the retained email. `/resend_verification` asks for a new code.
//! 3. **Login:** `/logintoken` returns a bearer token, kept by the session store
//!    (durably when "remember me" is set, in memory otherwise).
//! 4. **Profile:** `/profile` is read on dashboard entry and updated on save. Any
//!    failure to load it ends the session.
//!
//! The controllers never panic on server or transport failures; every outcome is
//! surfaced as a status message and the flow stays retryable.

pub mod authflow;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
