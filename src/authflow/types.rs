//! Data model and wire payloads for the auth API. Credentials and codes are held
//! as `SecretString` and only exposed when the request body is built, so they
//! must never end up in logs.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Error,
}

/// Text surfaced to the user after an operation, with the tone to render it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub tone: Tone,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            tone: Tone::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            tone: Tone::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            tone: Tone::Error,
            text: text.into(),
        }
    }
}

/// Email and password pair, alive only for the duration of a request.
#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: SecretString::from(password.to_string()),
        }
    }

    /// Re-applies the email trim for values built field by field.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_string(),
            ..self
        }
    }
}

#[derive(Debug)]
pub struct SignupRequest {
    pub credentials: Credentials,
    pub confirm_password: SecretString,
}

impl SignupRequest {
    pub fn new(email: &str, password: &str, confirm_password: &str) -> Self {
        Self {
            credentials: Credentials::new(email, password),
            confirm_password: SecretString::from(confirm_password.to_string()),
        }
    }

    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            credentials: self.credentials.normalized(),
            ..self
        }
    }
}

#[derive(Debug)]
pub struct PasswordResetRequest {
    pub email: String,
    pub code: SecretString,
    pub new_password: SecretString,
    pub confirm_password: SecretString,
}

impl PasswordResetRequest {
    pub fn new(email: &str, code: &str, new_password: &str, confirm_password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            code: SecretString::from(code.trim().to_string()),
            new_password: SecretString::from(new_password.to_string()),
            confirm_password: SecretString::from(confirm_password.to_string()),
        }
    }

    /// Trims the email and the code; passwords are kept verbatim.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_string(),
            code: SecretString::from(self.code.expose_secret().trim().to_string()),
            ..self
        }
    }
}

/// Editable profile fields as sent to `PUT /profile`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub full_name: String,
    pub address: String,
    pub phone_number: String,
}

/// Body of `GET /profile`. Unset fields come back as `null`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfileRecord {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl From<ProfileRecord> for Profile {
    fn from(record: ProfileRecord) -> Self {
        Self {
            full_name: record.full_name.unwrap_or_default(),
            address: record.address.unwrap_or_default(),
            phone_number: record.phone_number.unwrap_or_default(),
        }
    }
}
