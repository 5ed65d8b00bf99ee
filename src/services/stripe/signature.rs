//! `Stripe-Signature` header handling shared by the live and mock services.
//!
//! The header looks like `t=1492774577,v1=5257a869...,v0=...`. The signed
//! payload is `"{t}.{raw body}"`, HMAC-SHA256 keyed by the endpoint secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::StripeServiceError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed timestamp before the event is rejected.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

struct ParsedHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Result<ParsedHeader<'_>, StripeServiceError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    StripeServiceError::Webhook("invalid timestamp in signature header".into())
                })?)
            }
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| StripeServiceError::Webhook("signature header missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(StripeServiceError::Webhook(
            "signature header missing v1 signature".into(),
        ));
    }

    Ok(ParsedHeader {
        timestamp,
        signatures,
    })
}

fn compute_signature(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<Vec<u8>, StripeServiceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| StripeServiceError::Config(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Checks `header` against `payload` at time `now` (unix seconds).
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), StripeServiceError> {
    if secret.is_empty() {
        return Err(StripeServiceError::Config("webhook secret is empty".into()));
    }
    let parsed = parse_header(header)?;

    let within_tolerance = match now.checked_sub(parsed.timestamp) {
        Some(age) => age.unsigned_abs() <= tolerance_secs.unsigned_abs(),
        None => false,
    };
    if !within_tolerance {
        return Err(StripeServiceError::Webhook(
            "signature timestamp outside tolerance".into(),
        ));
    }

    let expected = compute_signature(secret, parsed.timestamp, payload)?;
    let matched = parsed.signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| bool::from(bytes.ct_eq(&expected)))
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(StripeServiceError::Webhook(
            "no matching v1 signature".into(),
        ))
    }
}

/// Produces a header value the way Stripe would for `payload` at `timestamp`.
pub fn sign_payload(
    payload: &[u8],
    secret: &str,
    timestamp: i64,
) -> Result<String, StripeServiceError> {
    let sig = compute_signature(secret, timestamp, payload)?;
    Ok(format!("t={},v1={}", timestamp, hex::encode(sig)))
}

pub fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
