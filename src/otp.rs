//! One-time passcodes issued after a successful password check.
//!
//! A challenge holds a 4-digit code, an expiry and a failed-attempt counter.
//! Challenges are kept server-side and addressed by a random id; the code
//! itself never has to round-trip through the client.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use rand::Rng;
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

pub const CODE_LENGTH: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtpError {
    #[error("unknown or expired verification request")]
    UnknownChallenge,
    #[error("verification code has expired")]
    Expired,
    #[error("too many failed attempts")]
    Locked,
    #[error("incorrect verification code, {remaining} attempt(s) left")]
    Mismatch { remaining: u8 },
    #[error("verification code was already used")]
    AlreadyUsed,
}

pub fn generate_code() -> String {
    let n: u16 = rand::rng().random_range(0..10_000);
    format!("{:0width$}", n, width = CODE_LENGTH)
}

#[derive(Debug, Clone)]
pub struct OtpChallenge {
    pub id: String,
    pub user_id: u64,
    code: String,
    pub expires_at: OffsetDateTime,
    pub attempts: u8,
    pub max_attempts: u8,
    pub consumed: bool,
}

impl OtpChallenge {
    pub fn new(user_id: u64, ttl: Duration, max_attempts: u8, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            user_id,
            code: generate_code(),
            expires_at: now + ttl,
            attempts: 0,
            max_attempts,
            consumed: false,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn remaining_attempts(&self) -> u8 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    pub fn is_locked(&self) -> bool {
        self.remaining_attempts() == 0
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Checks a submitted code. A correct code consumes the challenge; each
    /// wrong code uses up one attempt.
    pub fn verify(&mut self, code: &str, now: OffsetDateTime) -> Result<(), OtpError> {
        if self.consumed {
            return Err(OtpError::AlreadyUsed);
        }
        if self.is_locked() {
            return Err(OtpError::Locked);
        }
        if self.is_expired(now) {
            return Err(OtpError::Expired);
        }

        if bool::from(self.code.as_bytes().ct_eq(code.trim().as_bytes())) {
            self.consumed = true;
            return Ok(());
        }

        self.attempts += 1;
        match self.remaining_attempts() {
            0 => Err(OtpError::Locked),
            remaining => Err(OtpError::Mismatch { remaining }),
        }
    }

    /// Issues a fresh code and expiry. Failed attempts carry over.
    pub fn resend(&mut self, ttl: Duration, now: OffsetDateTime) -> Result<(), OtpError> {
        if self.consumed {
            return Err(OtpError::AlreadyUsed);
        }
        if self.is_locked() {
            return Err(OtpError::Locked);
        }
        self.code = generate_code();
        self.expires_at = now + ttl;
        Ok(())
    }
}

pub struct OtpStore {
    challenges: Mutex<HashMap<String, OtpChallenge>>,
    ttl: Duration,
    max_attempts: u8,
}

impl OtpStore {
    pub fn new(ttl: Duration, max_attempts: u8) -> Self {
        Self {
            challenges: Mutex::new(HashMap::new()),
            ttl,
            max_attempts: max_attempts.max(1),
        }
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, OtpChallenge>> {
        self.challenges.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drops challenges that expired more than one ttl ago. Recently expired
    /// ones are kept so callers still get `Expired` rather than `UnknownChallenge`.
    fn prune(&self, challenges: &mut HashMap<String, OtpChallenge>, now: OffsetDateTime) {
        let ttl = self.ttl;
        challenges.retain(|_, c| !c.consumed && c.expires_at + ttl > now);
    }

    pub fn issue(&self, user_id: u64, now: OffsetDateTime) -> OtpChallenge {
        let challenge = OtpChallenge::new(user_id, self.ttl, self.max_attempts, now);
        let mut challenges = self.guard();
        self.prune(&mut challenges, now);
        challenges.insert(challenge.id.clone(), challenge.clone());
        challenge
    }

    /// Returns the user the challenge was issued for once the code matches.
    pub fn verify(&self, id: &str, code: &str, now: OffsetDateTime) -> Result<u64, OtpError> {
        let mut challenges = self.guard();
        self.prune(&mut challenges, now);
        let challenge = challenges.get_mut(id).ok_or(OtpError::UnknownChallenge)?;
        challenge.verify(code, now)?;
        let user_id = challenge.user_id;
        challenges.remove(id);
        Ok(user_id)
    }

    pub fn resend(&self, id: &str, now: OffsetDateTime) -> Result<OtpChallenge, OtpError> {
        let mut challenges = self.guard();
        self.prune(&mut challenges, now);
        let challenge = challenges.get_mut(id).ok_or(OtpError::UnknownChallenge)?;
        challenge.resend(self.ttl, now)?;
        Ok(challenge.clone())
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shows only the last four digits of a phone number.
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 4 {
        return String::new();
    }
    let last4: String = digits[digits.len() - 4..].iter().collect();
    format!("***-***-{}", last4)
}
