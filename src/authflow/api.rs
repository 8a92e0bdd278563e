//! HTTP boundary for the remote auth API.
//!
//! Every call returns either an `ApiResponse` (status plus raw body) or an
//! `ApiError` describing a transport failure; nothing panics or escapes as an
//! unhandled error. Callers branch on the status and decide whether to decode the
//! body, which keeps the rate-limit path free of any body parsing.
//!
//! Flow Overview:
//! - Build one `ApiClient` from the configured base URL and request timeout.
//! - Call the endpoint helpers; each maps to exactly one request.
//! - Bearer tokens are attached only for `/profile` and are never logged.

use super::{
    errors::ApiError,
    types::{Credentials, PasswordResetRequest, Profile},
};
use crate::APP_USER_AGENT;
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Normalized response of a completed request.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    raw: String,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: StatusCode, raw: impl Into<String>) -> Self {
        Self {
            status,
            raw: raw.into(),
        }
    }

    #[must_use]
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Decodes the body as JSON. An empty body is `None`.
    ///
    /// # Errors
    /// Returns `ApiError::Decode` when the body is present but not valid JSON.
    pub fn json(&self) -> Result<Option<Value>, ApiError> {
        let trimmed = self.raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(trimmed)?))
    }

    /// Decodes the body into `T`, using `T::default()` for an empty body.
    ///
    /// # Errors
    /// Returns `ApiError::Decode` when the body does not match `T`.
    pub fn decode<T: DeserializeOwned + Default>(&self) -> Result<T, ApiError> {
        match self.json()? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(T::default()),
        }
    }
}

/// Returns a non-empty string field from a decoded body.
#[must_use]
pub fn string_field(body: Option<&Value>, key: &str) -> Option<String> {
    body.and_then(|value| value.get(key))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for the API rooted at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is not http(s) or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url.trim())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::Scheme(parsed.scheme().to_string()));
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the full URL for an API path, keeping any path prefix of the base.
    ///
    /// # Errors
    /// Returns an error if the joined URL does not parse.
    pub fn endpoint_url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(Url::parse(&format!(
            "{}/{}",
            self.base_url,
            path.trim().trim_start_matches('/')
        ))?)
    }

    /// `POST /signup`
    ///
    /// # Errors
    /// Returns `ApiError` on transport failure.
    pub async fn signup(&self, credentials: &Credentials) -> Result<ApiResponse, ApiError> {
        let body = json!({
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
        });
        self.send(Method::POST, "/signup", None, Some(&body)).await
    }

    /// `POST /email_verification`
    ///
    /// # Errors
    /// Returns `ApiError` on transport failure.
    pub async fn verify_email(
        &self,
        email: &str,
        code: &SecretString,
    ) -> Result<ApiResponse, ApiError> {
        let body = json!({ "email": email, "code": code.expose_secret() });
        self.send(Method::POST, "/email_verification", None, Some(&body))
            .await
    }

    /// `POST /resend_verification`
    ///
    /// # Errors
    /// Returns `ApiError` on transport failure.
    pub async fn resend_verification(&self, email: &str) -> Result<ApiResponse, ApiError> {
        let body = json!({ "email": email });
        self.send(Method::POST, "/resend_verification", None, Some(&body))
            .await
    }

    /// `POST /logintoken`. `remember` is forwarded as-is; the server picks the token lifetime.
    ///
    /// # Errors
    /// Returns `ApiError` on transport failure.
    pub async fn login(
        &self,
        credentials: &Credentials,
        remember: bool,
    ) -> Result<ApiResponse, ApiError> {
        let body = json!({
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
            "remember": remember,
        });
        self.send(Method::POST, "/logintoken", None, Some(&body))
            .await
    }

    /// `GET /profile` with the bearer token.
    ///
    /// # Errors
    /// Returns `ApiError` on transport failure.
    pub async fn fetch_profile(&self, token: &SecretString) -> Result<ApiResponse, ApiError> {
        self.send(Method::GET, "/profile", Some(token), None).await
    }

    /// `PUT /profile` with the bearer token.
    ///
    /// # Errors
    /// Returns `ApiError` on transport failure.
    pub async fn update_profile(
        &self,
        token: &SecretString,
        profile: &Profile,
    ) -> Result<ApiResponse, ApiError> {
        let body = serde_json::to_value(profile)?;
        self.send(Method::PUT, "/profile", Some(token), Some(&body))
            .await
    }

    /// `POST /password_reset`, asks the server to email a reset code.
    ///
    /// # Errors
    /// Returns `ApiError` on transport failure.
    pub async fn request_password_reset(&self, email: &str) -> Result<ApiResponse, ApiError> {
        let body = json!({ "email": email });
        self.send(Method::POST, "/password_reset", None, Some(&body))
            .await
    }

    /// `POST /reset_password`
    ///
    /// # Errors
    /// Returns `ApiError` on transport failure.
    pub async fn reset_password(
        &self,
        request: &PasswordResetRequest,
    ) -> Result<ApiResponse, ApiError> {
        let body = json!({
            "email": request.email,
            "code": request.code.expose_secret(),
            "new_password": request.new_password.expose_secret(),
        });
        self.send(Method::POST, "/reset_password", None, Some(&body))
            .await
    }

    #[instrument(skip(self, token, body))]
    async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&SecretString>,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.endpoint_url(path)?;
        debug!("api request: {} {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .header("Accept", "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("api response: {}", status);

        // Rate-limit responses carry no usable body; never read it.
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(ApiResponse::new(status, String::new()));
        }

        let raw = response.text().await?;
        Ok(ApiResponse { status, raw })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[test]
    fn new_rejects_non_http_scheme() {
        let result = ApiClient::new("ftp://api.local", DEFAULT_TIMEOUT);
        assert!(matches!(result, Err(ApiError::Scheme(scheme)) if scheme == "ftp"));
        assert!(ApiClient::new("not a url", DEFAULT_TIMEOUT).is_err());
    }

    #[test]
    fn endpoint_url_keeps_base_path() {
        let client = ApiClient::new("https://api.local/v1/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "https://api.local/v1");
        assert_eq!(
            client.endpoint_url("/signup").unwrap().as_str(),
            "https://api.local/v1/signup"
        );
    }

    #[test]
    fn response_json_handles_empty_and_malformed_bodies() {
        assert!(ApiResponse::new(StatusCode::OK, "  ")
            .json()
            .unwrap()
            .is_none());
        assert!(matches!(
            ApiResponse::new(StatusCode::OK, "<html>").json(),
            Err(ApiError::Decode(_))
        ));
        let body = ApiResponse::new(StatusCode::BAD_REQUEST, r#"{"error":"Invalid email"}"#)
            .json()
            .unwrap();
        assert_eq!(
            string_field(body.as_ref(), "error"),
            Some("Invalid email".to_string())
        );
        assert_eq!(string_field(body.as_ref(), "message"), None);
    }

    #[test]
    fn string_field_ignores_blank_and_non_string_values() {
        let body = json!({ "error": "  ", "message": 42 });
        assert_eq!(string_field(Some(&body), "error"), None);
        assert_eq!(string_field(Some(&body), "message"), None);
        assert_eq!(string_field(None, "error"), None);
    }

    #[tokio::test]
    async fn login_posts_credentials_and_remember_flag() -> Result<(), ApiError> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logintoken"))
            .and(body_json(json!({
                "email": "a@b.com",
                "password": "pw1",
                "remember": true
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), DEFAULT_TIMEOUT)?;
        let response = client
            .login(&Credentials::new(" a@b.com ", "pw1"), true)
            .await?;
        assert!(response.ok());
        assert_eq!(
            string_field(response.json()?.as_ref(), "access_token"),
            Some("tok".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn profile_requests_carry_bearer_token() -> Result<(), ApiError> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/profile"))
            .and(header("Authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "full_name": "Ada" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), DEFAULT_TIMEOUT)?;
        let token = SecretString::from("secret-token".to_string());
        let response = client.fetch_profile(&token).await?;
        assert_eq!(response.status, StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn rate_limited_body_is_never_read() -> Result<(), ApiError> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logintoken"))
            .respond_with(ResponseTemplate::new(429).set_body_string("{not json"))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), DEFAULT_TIMEOUT)?;
        let response = client.login(&Credentials::new("a@b.com", "pw"), false).await?;
        assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
        assert!(response.json()?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn slow_responses_time_out() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/resend_verification"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "message": "late" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Duration::from_millis(200)).unwrap();
        let result = client.resend_verification("a@b.com").await;
        assert!(matches!(result, Err(ApiError::Timeout)));
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let port = match TcpListener::bind("127.0.0.1:0") {
            Ok(listener) => listener.local_addr().unwrap().port(),
            Err(_) => {
                eprintln!("Skipping test: cannot bind localhost");
                return;
            }
        };

        let client = ApiClient::new(&format!("http://127.0.0.1:{port}"), DEFAULT_TIMEOUT).unwrap();
        let result = client.resend_verification("a@b.com").await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }
}
