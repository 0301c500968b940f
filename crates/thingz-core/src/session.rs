use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use thingz_api::{AuthClient, Session, User};

use crate::clock::Clock;
use crate::store::SlotStore;
use crate::{Error, Result};

pub const SESSION_SLOT: &str = "session";

/// Saved login, tokens obfuscated with a machine-specific key
///
/// XOR is obfuscation only. It keeps tokens out of casual `sqlite3` dumps,
/// nothing more.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    user: User,
    access_token: Vec<u8>,
    refresh_token: Vec<u8>,
    token_type: String,
    expires_in: u64,
    stored_at: DateTime<Utc>,
    valid_for_days: u32,
}

impl StoredSession {
    fn expires_at(&self) -> DateTime<Utc> {
        self.stored_at + Duration::days(i64::from(self.valid_for_days))
    }
}

/// Persists the signed-in session between runs
pub struct SessionStore {
    slots: Arc<dyn SlotStore>,
    clock: Arc<dyn Clock>,
    valid_for_days: u32,
}

impl SessionStore {
    pub fn new(slots: Arc<dyn SlotStore>, clock: Arc<dyn Clock>, valid_for_days: u32) -> Self {
        Self {
            slots,
            clock,
            valid_for_days,
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        let stored = StoredSession {
            user: session.user.clone(),
            access_token: obfuscate(session.access_token.as_bytes()),
            refresh_token: obfuscate(session.refresh_token.as_bytes()),
            token_type: session.token_type.clone(),
            expires_in: session.expires_in,
            stored_at: self.clock.now(),
            valid_for_days: self.valid_for_days,
        };
        self.slots
            .write_slot(SESSION_SLOT, &serde_json::to_string(&stored)?)
    }

    fn stored(&self) -> Option<StoredSession> {
        let raw = match self.slots.read_slot(SESSION_SLOT) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read saved session: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<StoredSession>(&raw) {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!("Ignoring unreadable saved session: {}", e);
                None
            }
        }
    }

    /// The saved session, unless there is none or it has expired
    pub fn load(&self) -> Option<Session> {
        let stored = self.stored()?;
        if self.clock.now() > stored.expires_at() {
            debug!("Saved session for {} has expired", stored.user.username);
            return None;
        }

        Some(Session {
            access_token: reveal(&stored.access_token),
            refresh_token: reveal(&stored.refresh_token),
            token_type: stored.token_type,
            expires_in: stored.expires_in,
            user: stored.user,
        })
    }

    /// Whole days until the saved session lapses; zero once expired
    pub fn days_remaining(&self) -> Option<i64> {
        let stored = self.stored()?;
        let remaining = (stored.expires_at() - self.clock.now()).num_days();
        Some(remaining.max(0))
    }

    pub fn clear(&self) -> Result<()> {
        self.slots.clear_slot(SESSION_SLOT)
    }
}

fn obfuscate(data: &[u8]) -> Vec<u8> {
    let key = machine_key();
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect()
}

fn reveal(data: &[u8]) -> String {
    String::from_utf8_lossy(&obfuscate(data)).to_string()
}

/// 32-byte key seeded from hostname and user name
fn machine_key() -> Vec<u8> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let hostname = hostname::get()
        .unwrap_or_else(|_| std::ffi::OsString::from("unknown"))
        .to_string_lossy()
        .to_string();
    let seed = format!("thingz-{}-{}", hostname, whoami::username());

    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);

    let mut key = Vec::with_capacity(32);
    let mut val = hasher.finish();
    for _ in 0..4 {
        key.extend_from_slice(&val.to_le_bytes());
        val = val.wrapping_mul(1103515245).wrapping_add(12345);
    }
    key
}

/// Login flows on top of the remote client, remembering the result locally
pub struct AuthService {
    client: AuthClient,
    sessions: SessionStore,
}

impl AuthService {
    pub fn new(client: AuthClient, sessions: SessionStore) -> Self {
        Self { client, sessions }
    }

    pub async fn login_with_password(&self, username: &str, password: &str) -> Result<User> {
        let session = self.client.login_with_password(username, password).await?;
        self.remember(session)
    }

    pub async fn login_with_sms(&self, phone: &str, code: &str) -> Result<User> {
        let session = self.client.login_with_sms(phone, code).await?;
        self.remember(session)
    }

    pub async fn send_sms_code(&self, phone: &str) -> Result<()> {
        self.client.send_sms_code(phone).await?;
        Ok(())
    }

    fn remember(&self, session: Session) -> Result<User> {
        self.sessions.save(&session)?;
        info!(
            "Signed in as {} via {}",
            session.user.username,
            session.user.login_method.display_name()
        );
        Ok(session.user)
    }

    pub fn logout(&self) -> Result<()> {
        self.sessions.clear()?;
        info!("Signed out");
        Ok(())
    }

    pub fn current_user(&self) -> Option<User> {
        self.sessions.load().map(|session| session.user)
    }

    pub fn access_token(&self) -> Option<String> {
        self.sessions.load().map(|session| session.access_token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.sessions.load().is_some()
    }

    /// Fails with `NotFound` when nobody is signed in
    pub fn require_user(&self) -> Result<User> {
        self.current_user()
            .ok_or_else(|| Error::NotFound("No signed-in user".to_string()))
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;
    use thingz_api::LoginMethod;
    use thingz_storage::StorageManager;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap()
    }

    fn session() -> Session {
        Session {
            user: User {
                id: "u-1".to_string(),
                username: "alice".to_string(),
                email: None,
                phone_number: Some("13800000000".to_string()),
                avatar: None,
                login_method: LoginMethod::Phone,
                created_at: now(),
                last_login_at: now(),
            },
            access_token: "access-token-123".to_string(),
            refresh_token: "refresh-token-456".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 7200,
        }
    }

    fn store(clock: Arc<FixedClock>) -> (SessionStore, Arc<StorageManager>) {
        let storage = Arc::new(StorageManager::in_memory().unwrap());
        (SessionStore::new(storage.clone(), clock, 30), storage)
    }

    #[test]
    fn test_obfuscation_round_trip() {
        let original = "access-token-123";
        let hidden = obfuscate(original.as_bytes());
        assert_ne!(hidden, original.as_bytes());
        assert_eq!(reveal(&hidden), original);
    }

    #[test]
    fn test_save_and_load() {
        let clock = Arc::new(FixedClock::new(now()));
        let (sessions, storage) = store(clock);

        assert!(sessions.load().is_none());
        sessions.save(&session()).unwrap();

        assert_eq!(sessions.load(), Some(session()));
        assert_eq!(sessions.days_remaining(), Some(30));

        let raw = storage.get_slot(SESSION_SLOT).unwrap().unwrap();
        assert!(!raw.contains("access-token-123"));
    }

    #[test]
    fn test_session_expires() {
        let clock = Arc::new(FixedClock::new(now()));
        let (sessions, _storage) = store(clock.clone());
        sessions.save(&session()).unwrap();

        clock.advance(Duration::days(29));
        assert!(sessions.load().is_some());

        clock.advance(Duration::days(2));
        assert!(sessions.load().is_none());
        assert_eq!(sessions.days_remaining(), Some(0));
    }

    #[test]
    fn test_clear_and_corrupt_slot() {
        let clock = Arc::new(FixedClock::new(now()));
        let (sessions, storage) = store(clock);
        sessions.save(&session()).unwrap();
        sessions.clear().unwrap();
        assert!(sessions.load().is_none());

        storage.set_slot(SESSION_SLOT, "garbage").unwrap();
        assert!(sessions.load().is_none());
        assert!(sessions.days_remaining().is_none());
    }

    #[test]
    fn test_service_without_login() {
        let clock = Arc::new(FixedClock::new(now()));
        let (sessions, _storage) = store(clock);
        let client = AuthClient::new("http://127.0.0.1:9", std::time::Duration::from_secs(1)).unwrap();
        let service = AuthService::new(client, sessions);

        assert!(!service.is_authenticated());
        assert!(service.current_user().is_none());
        assert!(matches!(service.require_user(), Err(Error::NotFound(_))));

        service.sessions().save(&session()).unwrap();
        assert_eq!(service.current_user().map(|u| u.username), Some("alice".to_string()));
        assert_eq!(service.access_token(), Some("access-token-123".to_string()));

        service.logout().unwrap();
        assert!(!service.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_validation_leaves_no_session() {
        let clock = Arc::new(FixedClock::new(now()));
        let (sessions, _storage) = store(clock);
        let client = AuthClient::new("http://127.0.0.1:9", std::time::Duration::from_secs(1)).unwrap();
        let service = AuthService::new(client, sessions);

        let err = service.login_with_password("", "").await.unwrap_err();
        assert!(matches!(err, Error::AuthError(_)));
        assert!(!service.is_authenticated());
    }
}
