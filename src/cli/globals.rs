use crate::authflow::{api::DEFAULT_TIMEOUT, flow::AfterVerification};
use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub api_url: String,
    pub session_file: PathBuf,
    pub timeout: Duration,
    pub after_verification: AfterVerification,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_url: String) -> Self {
        Self {
            api_url,
            session_file: default_session_file(),
            timeout: DEFAULT_TIMEOUT,
            after_verification: AfterVerification::default(),
        }
    }

    pub fn set_session_file(&mut self, path: impl AsRef<Path>) {
        self.session_file = path.as_ref().to_path_buf();
    }
}

/// `$HOME/.authflow/session.json`, relative to the working directory when `HOME`
/// is unset.
#[must_use]
pub fn default_session_file() -> PathBuf {
    let base = env::var_os("HOME").map_or_else(PathBuf::new, PathBuf::from);
    base.join(".authflow").join("session.json")
}
