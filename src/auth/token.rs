use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;

/// base64url that accepts the payload segment with or without padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The only claim this client reads. The signature is the backend's concern.
#[derive(Debug, Deserialize)]
pub struct Claims {
    pub exp: f64,
}

pub fn decode_claims(token: &str) -> Option<Claims> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    let bytes = URL_SAFE_LENIENT.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Expiry instant encoded in the token's `exp` claim.
pub fn expiry_of(token: &str) -> Option<DateTime<Utc>> {
    let claims = decode_claims(token)?;
    if !claims.exp.is_finite() {
        return None;
    }
    Utc.timestamp_opt(claims.exp.floor() as i64, 0).single()
}

/// Fail-closed: a token whose expiry cannot be read counts as expired.
pub fn is_token_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    match expiry_of(token) {
        Some(exp) => now >= exp,
        None => true,
    }
}

pub fn is_token_expired(token: &str) -> bool {
    is_token_expired_at(token, Utc::now())
}

/// Remaining lifetime, negative once expired. `None` if undecodable.
pub fn time_until_expiry(token: &str, now: DateTime<Utc>) -> Option<Duration> {
    expiry_of(token).map(|exp| exp - now)
}
