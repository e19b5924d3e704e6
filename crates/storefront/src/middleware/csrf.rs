//! Per-session CSRF tokens.
//!
//! A random token is minted the first time a session sees the cart and must
//! accompany every mutating POST. The comparison is against the session's
//! stored token, never a client-supplied pair.

use rand::Rng;
use rand::distr::Alphanumeric;
use tower_sessions::Session;

use crate::cart::store::keys;
use crate::error::AppError;

/// Length of generated CSRF tokens.
const CSRF_TOKEN_LENGTH: usize = 32;

fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CSRF_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Return the session's CSRF token, minting one if absent.
///
/// # Errors
///
/// Returns `AppError::Store` if the session cannot be read or written.
pub async fn ensure_csrf_token(session: &Session) -> Result<String, AppError> {
    if let Some(token) = session
        .get::<String>(keys::CSRF_TOKEN)
        .await
        .map_err(crate::cart::store::StoreError::from)?
    {
        return Ok(token);
    }

    let token = generate_token();
    session
        .insert(keys::CSRF_TOKEN, &token)
        .await
        .map_err(crate::cart::store::StoreError::from)?;
    Ok(token)
}

/// Verify a client-provided CSRF token against the session.
///
/// # Errors
///
/// Returns `AppError::InvalidCsrf` when the token is absent or mismatched,
/// `AppError::Store` if the session cannot be read.
pub async fn verify_csrf_token(session: &Session, provided: Option<&str>) -> Result<(), AppError> {
    let stored = session
        .get::<String>(keys::CSRF_TOKEN)
        .await
        .map_err(crate::cart::store::StoreError::from)?;

    match (stored, provided) {
        (Some(stored), Some(provided)) if stored == provided => Ok(()),
        _ => Err(AppError::InvalidCsrf),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), CSRF_TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
