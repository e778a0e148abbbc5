use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::AppError;
use crate::session::SessionStore;
use crate::state::AppState;

pub const AUTH_REQUIRED: &str = "Admin authentication required";
pub const INVALID_TOKEN: &str = "Invalid or expired admin token";

type Sha256Digest = [u8; 32];

fn digest(value: &str) -> Sha256Digest {
    Sha256::digest(value.as_bytes()).into()
}

/// Equality over fixed-size digests that always touches every byte.
fn digests_match(a: &Sha256Digest, b: &Sha256Digest) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// The single admin account. Only SHA-256 digests are kept in memory.
#[derive(Clone)]
pub struct AdminCredentials {
    username: String,
    username_digest: Sha256Digest,
    password_digest: Sha256Digest,
}

impl AdminCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        AdminCredentials {
            username: username.to_string(),
            username_digest: digest(username),
            password_digest: digest(password),
        }
    }

    /// Builds credentials from a hex-encoded SHA-256 of the password.
    pub fn from_hashed(username: &str, password_sha256_hex: &str) -> Result<Self, String> {
        let bytes = hex::decode(password_sha256_hex.trim())
            .map_err(|e| format!("ADMIN_PASSWORD_SHA256 is not valid hex: {e}"))?;
        let password_digest: Sha256Digest = bytes
            .try_into()
            .map_err(|_| "ADMIN_PASSWORD_SHA256 must be 32 bytes".to_string())?;

        Ok(AdminCredentials {
            username: username.to_string(),
            username_digest: digest(username),
            password_digest,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        let username_ok = digests_match(&digest(username), &self.username_digest);
        let password_ok = digests_match(&digest(password), &self.password_digest);
        username_ok & password_ok
    }
}

/// Who made an authorized request. Inserted into request extensions by
/// [`require_admin`].
#[derive(Debug, Clone)]
pub struct AdminContext {
    pub username: String,
    pub token: String,
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let mut parts = header?.split(' ');
    let scheme = parts.next()?;
    let token = parts.next()?;

    (scheme == "Bearer" && !token.is_empty()).then_some(token)
}

pub fn authorize(
    sessions: &dyn SessionStore,
    header: Option<&str>,
    now: DateTime<Utc>,
) -> Result<AdminContext, AppError> {
    sessions.sweep_expired(now)?;

    let token = bearer_token(header).ok_or_else(|| AppError::unauthorized(AUTH_REQUIRED))?;
    let session = sessions
        .lookup(token, now)?
        .ok_or_else(|| AppError::unauthorized(INVALID_TOKEN))?;

    Ok(AdminContext {
        username: session.username,
        token: token.to_string(),
    })
}

pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let admin = authorize(state.sessions.as_ref(), header, Utc::now()).inspect_err(|e| {
        debug!("Rejected {} {}: {e}", req.method(), req.uri().path());
    })?;

    req.extensions_mut().insert(admin);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use chrono::Duration;

    #[test]
    fn test_verify_credentials() {
        let creds = AdminCredentials::new("admin", "admin123");

        assert!(creds.verify("admin", "admin123"));
        assert!(!creds.verify("admin", "admin1234"));
        assert!(!creds.verify("Admin", "admin123"));
        assert!(!creds.verify("", ""));
    }

    #[test]
    fn test_hashed_credentials() {
        let hashed = hex::encode(Sha256::digest(b"s3cret"));
        let creds = AdminCredentials::from_hashed("owner", &hashed).unwrap();

        assert!(creds.verify("owner", "s3cret"));
        assert!(!creds.verify("owner", &hashed));
        assert!(AdminCredentials::from_hashed("owner", "abcd").is_err());
        assert!(AdminCredentials::from_hashed("owner", "not hex").is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("bearer abc")), None);
        assert_eq!(bearer_token(Some("Bearer")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn test_authorize_messages() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        let session = store.create("admin", now).unwrap();

        match authorize(&store, None, now) {
            Err(AppError::Unauthorized(message)) => assert_eq!(message, AUTH_REQUIRED),
            other => panic!("unexpected result: {other:?}"),
        }
        match authorize(&store, Some("Bearer nope"), now) {
            Err(AppError::Unauthorized(message)) => assert_eq!(message, INVALID_TOKEN),
            other => panic!("unexpected result: {other:?}"),
        }

        let header = format!("Bearer {}", session.token);
        let admin = authorize(&store, Some(&header), now).unwrap();
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.token, session.token);

        let later = now + Duration::hours(8) + Duration::minutes(1);
        assert!(matches!(
            authorize(&store, Some(&header), later),
            Err(AppError::Unauthorized(_))
        ));
    }
}
