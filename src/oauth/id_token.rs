//! ID-token claim validation.
//!
//! The engine trusts the token because it arrived over the code exchange's
//! TLS channel directly from the token endpoint, and validates the claims
//! that bind it to this client and this attempt: issuer, audience, expiry,
//! and the `nonce` check value.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Map, Value};

use crate::codec::CLOCK_TOLERANCE_SECONDS;
use crate::errors::ProtocolError;

/// Decode the claim set from a compact JWT without interpreting the header
/// or signature.
///
/// # Errors
/// [`ProtocolError::IdToken`] when the token is not three dot-separated
/// base64url segments around a JSON object.
pub fn decode_claims(id_token: &str) -> Result<Map<String, Value>, ProtocolError> {
    let mut segments = id_token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(ProtocolError::IdToken(
            "expected a three-segment compact JWT".to_string(),
        ));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('=').as_bytes())
        .map_err(|_| ProtocolError::IdToken("payload is not base64url".to_string()))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| ProtocolError::IdToken("payload is not a JSON object".to_string()))
}

fn audience_contains(claims: &Map<String, Value>, client_id: &str) -> bool {
    match claims.get("aud") {
        Some(Value::String(aud)) => aud == client_id,
        Some(Value::Array(auds)) => auds
            .iter()
            .any(|aud| aud.as_str() == Some(client_id)),
        _ => false,
    }
}

/// Validate issuer, audience, expiry, and nonce binding.
///
/// # Errors
/// [`ProtocolError::IdToken`] for issuer/audience/expiry failures,
/// [`ProtocolError::InvalidNonce`] when the stored nonce does not match.
pub fn validate_claims(
    claims: &Map<String, Value>,
    expected_issuer: &str,
    client_id: &str,
    expected_nonce: Option<&str>,
    now: i64,
) -> Result<(), ProtocolError> {
    if !expected_issuer.is_empty() {
        let issuer = claims.get("iss").and_then(Value::as_str).unwrap_or("");
        if issuer.trim_end_matches('/') != expected_issuer.trim_end_matches('/') {
            return Err(ProtocolError::IdToken(format!(
                "issuer {issuer} does not match {expected_issuer}"
            )));
        }
    }

    if !audience_contains(claims, client_id) {
        return Err(ProtocolError::IdToken(
            "audience does not include this client".to_string(),
        ));
    }

    let exp = claims
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or_else(|| ProtocolError::IdToken("missing exp claim".to_string()))?;
    if now > exp + CLOCK_TOLERANCE_SECONDS {
        return Err(ProtocolError::IdToken("token expired".to_string()));
    }

    if let Some(expected) = expected_nonce {
        let nonce = claims.get("nonce").and_then(Value::as_str);
        if nonce != Some(expected) {
            return Err(ProtocolError::InvalidNonce);
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn encode_unsigned(claims: &Value) -> String {
    // Test helper: compact JWT with an empty signature segment.
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    #[allow(clippy::unwrap_used)]
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
    format!("{header}.{payload}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn claims(value: Value) -> Map<String, Value> {
        #[allow(clippy::unwrap_used)]
        decode_claims(&encode_unsigned(&value)).unwrap()
    }

    fn valid() -> Map<String, Value> {
        claims(json!({
            "iss": "https://accounts.acme.test",
            "aud": "client-1",
            "sub": "u1",
            "exp": NOW + 300,
            "nonce": "n-1"
        }))
    }

    #[test]
    fn valid_claims_pass() {
        assert!(validate_claims(
            &valid(),
            "https://accounts.acme.test",
            "client-1",
            Some("n-1"),
            NOW
        )
        .is_ok());
    }

    #[test]
    fn audience_may_be_an_array() {
        let claims = claims(json!({
            "iss": "https://accounts.acme.test",
            "aud": ["other", "client-1"],
            "exp": NOW + 300
        }));
        assert!(validate_claims(&claims, "https://accounts.acme.test", "client-1", None, NOW).is_ok());
        assert!(validate_claims(&claims, "https://accounts.acme.test", "client-2", None, NOW).is_err());
    }

    #[test]
    fn issuer_mismatch_is_rejected_modulo_trailing_slash() {
        assert!(validate_claims(
            &valid(),
            "https://accounts.acme.test/",
            "client-1",
            None,
            NOW
        )
        .is_ok());
        assert!(validate_claims(&valid(), "https://evil.test", "client-1", None, NOW).is_err());
    }

    #[test]
    fn expiry_honors_clock_tolerance() {
        let claims = valid();
        assert!(validate_claims(
            &claims,
            "https://accounts.acme.test",
            "client-1",
            None,
            NOW + 300 + CLOCK_TOLERANCE_SECONDS
        )
        .is_ok());
        assert!(validate_claims(
            &claims,
            "https://accounts.acme.test",
            "client-1",
            None,
            NOW + 300 + CLOCK_TOLERANCE_SECONDS + 1
        )
        .is_err());
    }

    #[test]
    fn nonce_mismatch_is_a_distinct_error() {
        let err = validate_claims(
            &valid(),
            "https://accounts.acme.test",
            "client-1",
            Some("different"),
            NOW,
        )
        .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidNonce));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(decode_claims("only-one-segment").is_err());
        assert!(decode_claims("a.b.c.d").is_err());
        assert!(decode_claims("a.!!!.c").is_err());
    }
}
