use chrono::Utc;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{
    ApiEnvelope, LoginData, LoginMethod, LoginRequest, SendSmsCodeRequest, Session,
    SmsLoginRequest,
};
use crate::retry::{is_retryable_status, with_retry, RetryConfig, Retryable};

pub const DEFAULT_API_BASE: &str = "https://api.epicfish.cn/thingz/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MIN_PASSWORD_LEN: usize = 6;
const SUCCESS_CODE: i64 = 200;

/// Auth failures. The `Display` text is what the user gets to see.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Request timed out, please check your network connection")]
    Timeout,

    #[error("Network unavailable, please check your network settings")]
    Offline,

    #[error("Network error: {0}")]
    Network(reqwest::Error),

    #[error("{message}")]
    Server { code: i64, message: String },

    #[error("Login failed (HTTP {0})")]
    Http(u16),

    #[error("Could not read the server response, please try again later")]
    InvalidResponse,
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthError::Timeout
        } else if err.is_connect() {
            AuthError::Offline
        } else if err.is_decode() {
            AuthError::InvalidResponse
        } else {
            AuthError::Network(err)
        }
    }
}

impl Retryable for AuthError {
    fn is_retryable(&self) -> bool {
        match self {
            AuthError::Timeout | AuthError::Offline | AuthError::Network(_) => true,
            AuthError::Http(status) => StatusCode::from_u16(*status)
                .map(is_retryable_status)
                .unwrap_or(false),
            AuthError::Validation(_) | AuthError::Server { .. } | AuthError::InvalidResponse => {
                false
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

/// Client for the account service
///
/// The service is a plain JSON API: every response is an envelope with an
/// application `code` next to the HTTP status, and both must say 200.
pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
    retry_config: RetryConfig,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("ThingZ/0.1.0"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry_config: RetryConfig::default(),
        })
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Account + password login. The account field doubles as the phone number.
    pub async fn login_with_password(&self, username: &str, password: &str) -> Result<Session> {
        validate_password_login(username, password)?;

        let request = LoginRequest {
            phone: username,
            password,
            remember_me: true,
        };
        let data: LoginData = self.post_for_data("/auth/login", &request).await?;
        info!("Password login succeeded");
        Ok(data.into_session(LoginMethod::Username, Utc::now()))
    }

    /// Phone + SMS verification code login
    pub async fn login_with_sms(&self, phone: &str, code: &str) -> Result<Session> {
        validate_sms_login(phone, code)?;

        let request = SmsLoginRequest {
            phone,
            code,
            remember_me: true,
        };
        let data: LoginData = self.post_for_data("/auth/sms-login", &request).await?;
        info!("SMS login succeeded");
        Ok(data.into_session(LoginMethod::Phone, Utc::now()))
    }

    /// Ask the server to text a login code to `phone`
    pub async fn send_sms_code(&self, phone: &str) -> Result<()> {
        if phone.trim().is_empty() {
            return Err(AuthError::Validation(
                "Phone number must not be empty".to_string(),
            ));
        }

        let request = SendSmsCodeRequest {
            phone,
            purpose: "login",
        };
        let (status, body) = self.post_raw("/auth/send-sms-code", &request).await?;
        interpret::<serde_json::Value>(status, &body)?;
        debug!("Verification code sent");
        Ok(())
    }

    async fn post_for_data<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let (status, text) = self.post_raw(path, body).await?;
        let envelope = interpret::<T>(status, &text)?;
        envelope.data.ok_or(AuthError::InvalidResponse)
    }

    async fn post_raw<B: Serialize>(&self, path: &str, body: &B) -> Result<(StatusCode, String)> {
        let url = format!("{}{}", self.base_url, path);

        with_retry(&self.retry_config, || async {
            let response = self.client.post(&url).json(body).send().await?;
            let status = response.status();
            let text = response.text().await?;

            if is_retryable_status(status) {
                return Err(AuthError::Http(status.as_u16()));
            }
            Ok::<_, AuthError>((status, text))
        })
        .await
    }
}

fn validate_password_login(username: &str, password: &str) -> Result<()> {
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::Validation(
            "Username and password must not be empty".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn validate_sms_login(phone: &str, code: &str) -> Result<()> {
    if phone.is_empty() || code.is_empty() {
        return Err(AuthError::Validation(
            "Phone number and verification code must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Map an HTTP status + body onto the envelope rules
///
/// - 200 with `code == 200`: success
/// - 200 with another code, or non-200 with a readable envelope: server message
/// - non-200 without an envelope: bare HTTP failure
fn interpret<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<ApiEnvelope<T>> {
    let parsed = serde_json::from_str::<ApiEnvelope<T>>(body);

    if status == StatusCode::OK {
        let envelope = parsed.map_err(|_| AuthError::InvalidResponse)?;
        if envelope.code == SUCCESS_CODE {
            return Ok(envelope);
        }
        return Err(AuthError::Server {
            code: envelope.code,
            message: envelope.message,
        });
    }

    match parsed {
        Ok(envelope) => Err(AuthError::Server {
            code: envelope.code,
            message: envelope.message,
        }),
        Err(_) => Err(AuthError::Http(status.as_u16())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_OK: &str = r#"{
        "code": 200,
        "message": "ok",
        "timestamp": 1720000000,
        "data": {
            "accessToken": "token-123",
            "refreshToken": "refresh-456",
            "tokenType": "Bearer",
            "expiresIn": 7200,
            "user": {
                "id": "42",
                "username": "alice",
                "phone": "13800000000",
                "email": "alice@example.com",
                "avatarUrl": null
            }
        }
    }"#;

    #[test]
    fn test_validation_messages() {
        let err = validate_password_login("", "secret").unwrap_err();
        assert_eq!(err.to_string(), "Username and password must not be empty");

        let err = validate_password_login("alice", "12345").unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 6 characters");

        assert!(validate_password_login("alice", "123456").is_ok());
        assert!(validate_sms_login("13800000000", "").is_err());
    }

    #[test]
    fn test_interpret_success() {
        let envelope = interpret::<LoginData>(StatusCode::OK, LOGIN_OK).unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.access_token, "token-123");
        assert_eq!(data.user.username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_interpret_application_error() {
        let body = r#"{"code": 401, "message": "Wrong password", "data": null}"#;
        let err = interpret::<LoginData>(StatusCode::OK, body).unwrap_err();
        assert_eq!(err.to_string(), "Wrong password");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_interpret_http_error_with_envelope() {
        let body = r#"{"code": 403, "message": "Account locked"}"#;
        let err = interpret::<LoginData>(StatusCode::FORBIDDEN, body).unwrap_err();
        assert!(matches!(err, AuthError::Server { code: 403, .. }));
    }

    #[test]
    fn test_interpret_http_error_without_envelope() {
        let err = interpret::<LoginData>(StatusCode::BAD_GATEWAY, "<html>").unwrap_err();
        assert_eq!(err.to_string(), "Login failed (HTTP 502)");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_interpret_garbage_success_body() {
        let err = interpret::<LoginData>(StatusCode::OK, "not json").unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse));
    }

    #[tokio::test]
    async fn test_login_rejects_before_network() {
        // Nothing listens here; validation must fail first
        let client = AuthClient::new("http://127.0.0.1:9", Duration::from_millis(50))
            .unwrap()
            .with_retry_config(RetryConfig::none());
        let err = client.login_with_password("alice", "123").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));

        let err = client.send_sms_code("  ").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_maps_to_transport_error() {
        let client = AuthClient::new("http://127.0.0.1:9", Duration::from_millis(200))
            .unwrap()
            .with_retry_config(RetryConfig::none());
        let err = client
            .login_with_password("alice", "123456")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
