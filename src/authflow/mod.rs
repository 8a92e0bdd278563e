//! Auth flow core: HTTP boundary, token storage, the signup/verify/login state
//! machine and the profile controller. This module handles passwords, codes and
//! bearer tokens and must never log them.

pub mod api;
pub mod errors;
pub mod flow;
pub mod intent;
pub mod profile;
pub mod session;
pub mod types;

pub use self::api::{ApiClient, ApiResponse};
pub use self::errors::{ApiError, FlowError};
pub use self::flow::{AfterVerification, AuthFlowController, FlowState, View};
pub use self::intent::{AuthApp, UserIntent};
pub use self::profile::ProfileController;
pub use self::session::SessionStore;
pub use self::types::{Credentials, Profile, SignupRequest, StatusMessage, Tone};
