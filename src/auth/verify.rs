use jsonwebtoken::{decode, DecodingKey, Validation};

use super::{AuthError, Claims, Identity};

/// Pull the token out of an `Authorization: Bearer <token>` value.
///
/// Returns `None` when the header is absent, uses another scheme, or has no
/// second segment.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    let mut segments = header?.split_whitespace();
    let scheme = segments.next()?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    segments.next()
}

/// Verify a raw `Authorization` header value against the signing secret.
///
/// Signature and expiry are checked; the payload shape is trusted once the
/// signature holds.
pub fn verify(header: Option<&str>, secret: &str) -> Result<Identity, AuthError> {
    let token = extract_bearer(header).ok_or(AuthError::Unauthenticated)?;

    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| AuthError::TokenInvalid(e.to_string()))?;

    Ok(Identity::from(token_data.claims))
}
