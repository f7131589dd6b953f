use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::models::DocumentId;

const TICK_SECONDS: i64 = 12 * 60 * 60;
const TOKEN_HEX_LEN: usize = 20;

/// Binds a purpose, a user and a document to a 12-hour tick. A token is valid
/// in the tick it was issued in and the one after.
pub struct NonceIssuer {
    secret: Vec<u8>,
}

impl NonceIssuer {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn create(&self, purpose: &str, user: &str, document: DocumentId) -> String {
        self.token_for_tick(tick(Utc::now().timestamp()), purpose, user, document)
    }

    pub fn verify(&self, token: &str, purpose: &str, user: &str, document: DocumentId) -> bool {
        self.verify_at(Utc::now().timestamp(), token, purpose, user, document)
    }

    fn verify_at(
        &self,
        now: i64,
        token: &str,
        purpose: &str,
        user: &str,
        document: DocumentId,
    ) -> bool {
        if token.is_empty() {
            return false;
        }
        let current = tick(now);
        [current, current - 1]
            .into_iter()
            .any(|t| self.token_for_tick(t, purpose, user, document) == token)
    }

    fn token_for_tick(&self, tick: i64, purpose: &str, user: &str, document: DocumentId) -> String {
        let mut hasher = Sha256::new();
        hasher.update(tick.to_be_bytes());
        hasher.update(b"|");
        hasher.update(purpose.as_bytes());
        hasher.update(b"|");
        hasher.update(user.as_bytes());
        hasher.update(b"|");
        hasher.update(document.to_be_bytes());
        hasher.update(b"|");
        hasher.update(&self.secret);
        let mut token = hex::encode(hasher.finalize());
        token.truncate(TOKEN_HEX_LEN);
        token
    }

    #[cfg(test)]
    fn create_at(&self, now: i64, purpose: &str, user: &str, document: DocumentId) -> String {
        self.token_for_tick(tick(now), purpose, user, document)
    }
}

fn tick(now: i64) -> i64 {
    now.div_euclid(TICK_SECONDS) + 1
}
