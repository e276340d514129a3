//! Bearer credentials binding a participant identity to one poll.
//!
//! A token is `base64url(claims JSON) . hex(HMAC-SHA256(claims JSON))`. It is
//! opaque to clients, decodable server-side, and tamper-evident; verification
//! uses a constant-time comparison.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::ServiceError;

type HmacSha256 = Hmac<Sha256>;

/// Identity claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantClaims {
    /// Poll the token grants access to.
    pub poll_id: String,
    /// Stable participant identifier.
    pub participant_id: String,
    /// Display name chosen when the token was issued.
    pub name: String,
}

/// Issue an opaque, tamper-evident token for the given claims.
pub fn issue(secret: &str, claims: &ParticipantClaims) -> String {
    let payload =
        serde_json::to_vec(claims).expect("claims struct serializes without fallible types");
    let signature = hex::encode(sign(secret, &payload));
    format!("{}.{signature}", URL_SAFE_NO_PAD.encode(&payload))
}

/// Decode and verify a token, returning its claims.
pub fn verify(secret: &str, token: &str) -> Result<ParticipantClaims, ServiceError> {
    let (payload_b64, signature_hex) = token
        .split_once('.')
        .ok_or_else(|| ServiceError::Unauthorized("malformed access token".into()))?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| ServiceError::Unauthorized("malformed access token".into()))?;
    let signature = hex::decode(signature_hex)
        .map_err(|_| ServiceError::Unauthorized("malformed access token".into()))?;

    let mut mac = mac(secret);
    mac.update(&payload);
    mac.verify_slice(&signature)
        .map_err(|_| ServiceError::Unauthorized("access token signature mismatch".into()))?;

    serde_json::from_slice(&payload)
        .map_err(|_| ServiceError::Unauthorized("malformed access token claims".into()))
}

fn mac(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size")
}

fn sign(secret: &str, payload: &[u8]) -> Vec<u8> {
    let mut mac = mac(secret);
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> ParticipantClaims {
        ParticipantClaims {
            poll_id: "AB12CD".into(),
            participant_id: "u1".into(),
            name: "Ana".into(),
        }
    }

    #[test]
    fn round_trip() {
        let token = issue("secret", &claims());
        let decoded = verify("secret", &token).unwrap();
        assert_eq!(decoded, claims());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = issue("secret", &claims());
        let signature = token.split_once('.').unwrap().1;
        let forged_claims = ParticipantClaims {
            participant_id: "someone-else".into(),
            ..claims()
        };
        let forged_payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{forged_payload}.{signature}");

        assert!(matches!(
            verify("secret", &forged),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue("secret", &claims());
        assert!(matches!(
            verify("other-secret", &token),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        for token in ["", "no-dot", "a.b", "!!!.###"] {
            assert!(verify("secret", token).is_err(), "token `{token}`");
        }
    }
}
