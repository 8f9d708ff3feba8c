//! Role gate for rules with a `Role` condition.
//!
//! # Responsibilities
//! - Read the role token from the `nf_jwt` cookie
//! - Verify HS256 signatures when a secret is configured
//! - Reject expired tokens
//! - Extract the roles array at the configured dotted path
//!
//! # Design Decisions
//! - Every failure denies; callers turn a denial into a 404, never a 5xx
//! - Without a secret the payload is decoded but not verified

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;

/// Cookie holding the role token.
pub const AUTH_COOKIE: &str = "nf_jwt";

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("invalid token: {0}")]
    Token(jsonwebtoken::errors::Error),
    #[error("signature mismatch")]
    Signature,
    #[error("token expired at {0}")]
    Expired(u64),
    #[error("no roles array at `{0}`")]
    Roles(String),
}

impl From<jsonwebtoken::errors::Error> for GateError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            ErrorKind::InvalidSignature => GateError::Signature,
            _ => GateError::Token(error),
        }
    }
}

/// Role token checker for one compiled table.
#[derive(Debug, Clone, Copy)]
pub struct RoleGate<'a> {
    secret: Option<&'a str>,
    role_path: &'a str,
}

impl<'a> RoleGate<'a> {
    pub fn new(secret: Option<&'a str>, role_path: &'a str) -> Self {
        Self { secret, role_path }
    }

    /// True when `token` carries at least one of `allowed`.
    pub fn allows(&self, token: Option<&str>, allowed: &[String]) -> bool {
        let Some(token) = token else {
            tracing::debug!("No role token presented");
            return false;
        };

        match self.roles(token, unix_now()) {
            Ok(roles) => roles.iter().any(|role| allowed.contains(role)),
            Err(GateError::Expired(exp)) => {
                tracing::warn!(exp, "Expired JWT provided in request");
                false
            }
            Err(error) => {
                tracing::warn!(%error, "Invalid JWT provided in request");
                false
            }
        }
    }

    /// Decode `token` and return its roles as of `now` (Unix seconds).
    pub fn roles(&self, token: &str, now: u64) -> Result<Vec<String>, GateError> {
        let (key, mut validation) = match self.secret {
            Some(secret) => (
                DecodingKey::from_secret(secret.as_bytes()),
                Validation::new(Algorithm::HS256),
            ),
            None => {
                let mut validation = Validation::new(Algorithm::HS256);
                validation.insecure_disable_signature_validation();
                (DecodingKey::from_secret(&[]), validation)
            }
        };
        // Expiry is checked against `now` below.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let claims = decode::<Value>(token, &key, &validation)?.claims;
        let exp = claims.get("exp").and_then(Value::as_u64).unwrap_or(0);
        if exp < now {
            return Err(GateError::Expired(exp));
        }

        let roles = self
            .role_path
            .split('.')
            .try_fold(&claims, |value, key| value.get(key))
            .and_then(Value::as_array)
            .ok_or_else(|| GateError::Roles(self.role_path.to_string()))?;

        Ok(roles
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Build an HS256 token for tests.
#[cfg(test)]
pub(crate) fn sign_token(secret: &str, claims: &Value) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}
