#![forbid(unsafe_code)]

//! Signed session tokens.
//!
//! Format: `base64url(claims JSON) "." base64url(HMAC-SHA256 over the encoded
//! claims)`, both unpadded. Opaque to clients; scoped to exactly one session
//! and user with an embedded wall-clock expiry claim.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use cadenza_core::{StreamError, StreamResult};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Claims embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Session id the token is scoped to.
    pub sid: String,
    /// Owning user.
    pub uid: String,
    /// Mint time, unix seconds. Continuity checks compare the session's last
    /// heartbeat against this.
    pub iat: i64,
    /// Wall-clock expiry, unix seconds.
    pub exp: i64,
}

/// Mints and verifies session tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    #[must_use]
    pub fn mint(&self, claims: &TokenClaims) -> String {
        let payload = serde_json::to_vec(claims).expect("token claims serialize to JSON");
        let body = URL_SAFE_NO_PAD.encode(payload);
        let mut mac = self.mac();
        mac.update(body.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{body}.{sig}")
    }

    /// Structural and signature verification only; expiry and scope are
    /// session-level policy enforced by the manager.
    pub fn verify(&self, token: &str) -> StreamResult<TokenClaims> {
        let (body, sig) = token
            .split_once('.')
            .ok_or_else(|| StreamError::TokenInvalid("malformed token".into()))?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig)
            .map_err(|_| StreamError::TokenInvalid("malformed signature encoding".into()))?;

        let mut mac = self.mac();
        mac.update(body.as_bytes());
        mac.verify_slice(&sig)
            .map_err(|_| StreamError::TokenInvalid("signature mismatch".into()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| StreamError::TokenInvalid("malformed payload encoding".into()))?;
        serde_json::from_slice(&payload)
            .map_err(|_| StreamError::TokenInvalid("malformed claims".into()))
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length")
    }
}
