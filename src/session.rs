use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use demobank_core::{Role, User};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: u64,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// Bearer sessions created after a verified OTP.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn create(&self, user: &User, now: OffsetDateTime) -> Session {
        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            user_id: user.id,
            role: user.role,
            expires_at: now + self.ttl,
        };
        let mut sessions = self.write();
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(session.token.clone(), session.clone());
        tracing::debug!(user_id = user.id, "Session created");
        session
    }

    /// Looks up a live session. Expired sessions are dropped on sight.
    pub fn get(&self, token: &str, now: OffsetDateTime) -> Option<Session> {
        match self.read().get(token) {
            Some(s) if s.expires_at > now => return Some(s.clone()),
            Some(_) => {}
            None => return None,
        }
        self.write().remove(token);
        None
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.write().remove(token).is_some()
    }

    /// Ends every session of a user, e.g. after the user is deleted.
    pub fn revoke_user(&self, user_id: u64) -> usize {
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        before - sessions.len()
    }

    /// Ends every session. Used when user records are replaced wholesale.
    pub fn clear(&self) -> usize {
        let mut sessions = self.write();
        let ended = sessions.len();
        sessions.clear();
        ended
    }
}
