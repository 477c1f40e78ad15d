use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// How long an issued token stays valid.
pub const SESSION_HOURS: i64 = 12;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// User id
    pub sub: i32,
    pub username: String,
    pub exp: usize,
}

/// HS256 signing keys for session tokens.
pub struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn random() -> Self {
        let secret: [u8; 32] = rand::random();
        Self::new(&secret)
    }

    pub fn issue(&self, user_id: i32, username: &str) -> Result<String> {
        let session = AuthSession {
            sub: user_id,
            username: username.to_string(),
            exp: (Utc::now() + Duration::hours(SESSION_HOURS)).timestamp() as usize,
        };
        Ok(encode(&Header::default(), &session, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<AuthSession> {
        Ok(decode::<AuthSession>(token, &self.decoding, &Validation::default())?.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let keys = Keys::new(b"test secret");
        let token = keys.issue(7, "admin").unwrap();
        let session = keys.verify(&token).unwrap();
        assert_eq!(session.sub, 7);
        assert_eq!(session.username, "admin");
    }

    #[test]
    fn test_rejects_foreign_and_tampered_tokens() {
        let keys = Keys::new(b"test secret");
        let token = keys.issue(1, "admin").unwrap();
        assert!(Keys::new(b"other secret").verify(&token).is_err());

        // claims of another token under this token's signature
        let other = keys.issue(2, "eve").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);
        assert!(keys.verify(&forged).is_err());
        assert!(keys.verify("not a token").is_err());
    }

    #[test]
    fn test_rejects_expired() {
        let keys = Keys::new(b"test secret");
        let expired = AuthSession {
            sub: 1,
            username: "admin".to_string(),
            exp: (Utc::now() - Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(&Header::default(), &expired, &keys.encoding).unwrap();
        assert!(keys.verify(&token).is_err());
    }
}
