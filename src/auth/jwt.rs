use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{
    auth::{claims::Claims, repo_types::Role},
    config::JwtConfig,
    error::{AppError, AuthError},
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token signature or format is invalid")]
    Invalid,
    #[error("token has expired")]
    Expired,
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => AppError::Auth(AuthError::InvalidToken),
            TokenError::Expired => AppError::Auth(AuthError::ExpiredToken),
        }
    }
}

/// Signing and verification keys plus the claim settings they enforce.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(cfg.ttl_minutes.max(0) as u64 * 60),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

impl JwtKeys {
    pub fn issue(&self, user_id: i64, username: &str, role: Role) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id, %role, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        debug!(user_id = data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: secret.into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 60 * 24 * 7,
        })
    }

    #[test]
    fn issue_and_verify_carry_identity_and_role() {
        let keys = make_keys("dev-secret");
        let token = keys.issue(42, "alice", Role::Admin).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn verify_rejects_foreign_signature() {
        let token = make_keys("one-secret").issue(1, "bob", Role::User).unwrap();
        let err = make_keys("other-secret").verify(&token).unwrap_err();
        assert_eq!(err, TokenError::Invalid);
    }

    #[test]
    fn verify_rejects_garbage() {
        assert_eq!(
            make_keys("s").verify("not.a.token").unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn verify_reports_expiry() {
        let keys = make_keys("dev-secret");
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            sub: 7,
            username: "carol".into(),
            role: Role::User,
            iat: now - 8 * 24 * 3600,
            exp: now - 24 * 3600,
            iss: keys.issuer.clone(),
            aud: keys.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn verify_rejects_wrong_audience() {
        let good = make_keys("same-secret");
        let mut bad = make_keys("same-secret");
        bad.audience = "someone-else".into();
        let token = good.issue(1, "dave", Role::User).unwrap();
        assert_eq!(bad.verify(&token).unwrap_err(), TokenError::Invalid);
    }
}
