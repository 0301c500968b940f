use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the user signed in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoginMethod {
    Username,
    Phone,
    Wechat,
    Apple,
}

impl LoginMethod {
    pub fn display_name(&self) -> &'static str {
        match self {
            LoginMethod::Username => "账号密码",
            LoginMethod::Phone => "手机号",
            LoginMethod::Wechat => "微信",
            LoginMethod::Apple => "Apple ID",
        }
    }
}

/// The signed-in user as the app keeps it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub avatar: Option<String>,
    pub login_method: LoginMethod,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

/// A successful login: who the user is plus the bearer token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Token lifetime in seconds as reported by the server
    pub expires_in: u64,
}

/// Every endpoint wraps its payload in the same envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    pub message: String,
    pub data: Option<T>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub phone: &'a str,
    pub password: &'a str,
    pub remember_me: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsLoginRequest<'a> {
    pub phone: &'a str,
    pub code: &'a str,
    pub remember_me: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendSmsCodeRequest<'a> {
    pub phone: &'a str,
    #[serde(rename = "type")]
    pub purpose: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: ApiUser,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
    pub id: String,
    pub username: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub nick: Option<String>,
}

impl LoginData {
    /// Turn the server payload into a session, falling back to the phone
    /// number when the account has no username
    pub fn into_session(self, method: LoginMethod, now: DateTime<Utc>) -> Session {
        let api_user = self.user;
        let user = User {
            id: api_user.id,
            username: api_user.username.unwrap_or_else(|| api_user.phone.clone()),
            email: api_user.email,
            phone_number: Some(api_user.phone),
            avatar: api_user.avatar_url,
            login_method: method,
            created_at: now,
            last_login_at: now,
        };

        Session {
            user,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_in: self.expires_in,
        }
    }
}
