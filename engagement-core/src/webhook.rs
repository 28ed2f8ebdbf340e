use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// The two pieces of an inbound webhook a signature check needs, lifted
/// out of whatever transport header map the HTTP layer used (spec §4.3:
/// "`verify(headers, raw_body) -> bool`").
#[derive(Debug, Clone)]
pub struct WebhookHeaders {
    /// Hex-encoded HMAC-SHA256 signature as sent by the provider.
    pub signature: String,
    /// Unix seconds from the provider's timestamp header.
    pub timestamp: i64,
}

/// Shared by C2 (webhook-triggered sync) and C3 (event ingestion) —
/// both need to reject forged or replayed webhooks before acting on
/// them (spec §4.2, §4.3).
pub trait WebhookVerifier: Send + Sync {
    fn verify(&self, headers: &WebhookHeaders, raw_body: &[u8], now: DateTime<Utc>) -> bool;
}

/// Canonical HMAC-SHA256 verifier: signs `v0:{timestamp}:{raw_body}` with
/// a shared secret and checks a replay window (spec §4.3).
pub struct HmacSha256Verifier {
    pub secret: String,
    pub replay_window: Duration,
}

impl HmacSha256Verifier {
    pub fn new(secret: impl Into<String>, replay_window_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            replay_window: Duration::seconds(replay_window_seconds),
        }
    }
}

impl WebhookVerifier for HmacSha256Verifier {
    fn verify(&self, headers: &WebhookHeaders, raw_body: &[u8], now: DateTime<Utc>) -> bool {
        let Some(event_time) = DateTime::from_timestamp(headers.timestamp, 0) else {
            return false;
        };
        if (now - event_time).abs() > self.replay_window {
            return false;
        }

        let base_string = format!("v0:{}:{}", headers.timestamp, String::from_utf8_lossy(raw_body));
        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes()) else {
            return false;
        };
        mac.update(base_string.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());
        constant_time_eq(expected.as_bytes(), headers.signature.as_bytes())
    }
}

/// A verifier that accepts everything — only ever constructed when the
/// operator has explicitly set `allow_insecure_signatures=true` (spec
/// §4.3: "a policy switch MAY disable verification only when an
/// explicit `allow_insecure=true` environment flag is set").
pub struct InsecureNoopVerifier;

impl WebhookVerifier for InsecureNoopVerifier {
    fn verify(&self, _headers: &WebhookHeaders, _raw_body: &[u8], _now: DateTime<Utc>) -> bool {
        true
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: i64, body: &str) -> String {
        let base_string = format!("v0:{}:{}", timestamp, body);
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(base_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_within_replay_window_passes() {
        let now = Utc::now();
        let secret = "shh";
        let body = r#"{"kind":"create"}"#;
        let signature = sign(secret, now.timestamp(), body);
        let verifier = HmacSha256Verifier::new(secret, 300);
        let headers = WebhookHeaders {
            signature,
            timestamp: now.timestamp(),
        };
        assert!(verifier.verify(&headers, body.as_bytes(), now));
    }

    #[test]
    fn wrong_signature_fails() {
        let now = Utc::now();
        let verifier = HmacSha256Verifier::new("shh", 300);
        let headers = WebhookHeaders {
            signature: "deadbeef".into(),
            timestamp: now.timestamp(),
        };
        assert!(!verifier.verify(&headers, b"{}", now));
    }

    #[test]
    fn outside_replay_window_fails_even_with_correct_signature() {
        let now = Utc::now();
        let secret = "shh";
        let body = "{}";
        let old_timestamp = (now - Duration::seconds(301)).timestamp();
        let signature = sign(secret, old_timestamp, body);
        let verifier = HmacSha256Verifier::new(secret, 300);
        let headers = WebhookHeaders {
            signature,
            timestamp: old_timestamp,
        };
        assert!(!verifier.verify(&headers, body.as_bytes(), now));
    }

    #[test]
    fn insecure_noop_verifier_always_passes() {
        let headers = WebhookHeaders {
            signature: "".into(),
            timestamp: 0,
        };
        assert!(InsecureNoopVerifier.verify(&headers, b"", Utc::now()));
    }
}
