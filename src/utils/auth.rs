use anyhow::{Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: usize,
    pub jti: String, // session id
}

pub fn create_session_token(
    user_id: &str,
    session_id: &str,
    expires_at: DateTime<Utc>,
    secret: &str,
) -> Result<String> {
    let claims = Claims {
        sub: user_id.to_owned(),
        exp: expires_at.timestamp() as usize,
        jti: session_id.to_owned(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

pub fn validate_session_token(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` on a wrong password, `Err` only when the stored hash is unreadable.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(password_hash).map_err(|e| anyhow!("Corrupt password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_cycle() {
        let secret = "test_secret";
        let expires_at = Utc::now() + chrono::Duration::minutes(30);
        let token = create_session_token("user_123", "session_1", expires_at, secret).unwrap();
        let claims = validate_session_token(&token, secret).unwrap();
        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.jti, "session_1");
    }

    #[test]
    fn test_session_token_wrong_secret() {
        let expires_at = Utc::now() + chrono::Duration::minutes(30);
        let token = create_session_token("user_123", "session_1", expires_at, "a").unwrap();
        assert!(validate_session_token(&token, "b").is_err());
    }

    #[test]
    fn test_expired_session_token() {
        let expires_at = Utc::now() - chrono::Duration::hours(2);
        let token = create_session_token("user_123", "session_1", expires_at, "s").unwrap();
        assert!(validate_session_token(&token, "s").is_err());
    }

    #[test]
    fn test_password_hash_verify() {
        let hash = hash_password("hunter42x").unwrap();
        assert!(verify_password("hunter42x", &hash).unwrap());
        assert!(!verify_password("hunter43x", &hash).unwrap());
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }
}
