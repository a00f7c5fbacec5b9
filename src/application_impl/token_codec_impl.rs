use super::KeyPair;
use crate::application_port::*;
use crate::domain_model::*;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, Header, Validation, decode, decode_header, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct Claims {
    exp: i64,
    uuid: String,
}

// Field types are checked by hand so a wrong-typed claim is reported as such
// instead of as an undecodable payload.
#[derive(Debug, Deserialize)]
struct RawClaims {
    exp: Option<serde_json::Value>,
    uuid: Option<serde_json::Value>,
}

const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// RS512 token codec. Verification accepts any RSA PKCS#1 algorithm.
pub struct JwtRsaCodec {
    keys: KeyPair,
}

impl JwtRsaCodec {
    pub fn new(keys: KeyPair) -> Self {
        JwtRsaCodec { keys }
    }

    fn validation() -> Validation {
        let mut v = Validation::new(Algorithm::RS512);
        v.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        v.leeway = 0;
        v.validate_exp = true;
        v.validate_nbf = true;
        v.validate_aud = false;
        v.set_required_spec_claims(&["exp"]);
        v
    }

    fn classify(value: &str, error: jsonwebtoken::errors::Error) -> CodecError {
        match error.kind() {
            JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => CodecError::Expired,
            JwtErrorKind::InvalidSignature => CodecError::InvalidSignature,
            JwtErrorKind::InvalidAlgorithm => {
                let alg = decode_header(value)
                    .map(|h| format!("{:?}", h.alg))
                    .ok()
                    .or_else(|| raw_header_alg(value))
                    .unwrap_or_else(|| "unknown".to_string());
                CodecError::UnexpectedAlgorithm(alg)
            }
            JwtErrorKind::MissingRequiredClaim(claim) => CodecError::ClaimType(claim.clone()),
            // jsonwebtoken cannot parse headers naming algorithms it does not
            // know, `none` included.
            _ => match raw_header_alg(value) {
                Some(alg) if !is_accepted(&alg) => CodecError::UnexpectedAlgorithm(alg),
                _ => CodecError::Malformed(error.to_string()),
            },
        }
    }
}

/// Reads `alg` from the first segment without going through `Header`.
fn raw_header_alg(value: &str) -> Option<String> {
    let segment = value.split('.').next()?;
    let bytes = URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).ok()?;
    let header: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    header.get("alg")?.as_str().map(str::to_string)
}

fn is_accepted(alg: &str) -> bool {
    ACCEPTED_ALGORITHMS.iter().any(|a| format!("{:?}", a) == alg)
}

impl TokenCodec for JwtRsaCodec {
    fn create(&self, ttl: Duration) -> Result<Token, CodecError> {
        let id = TokenId::new_random();
        let ttl =
            chrono::Duration::from_std(ttl).map_err(|e| CodecError::Signing(e.to_string()))?;
        let exp = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| CodecError::Signing("expiry out of range".to_string()))?
            .timestamp();
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| CodecError::Signing("expiry out of range".to_string()))?;
        let claims = Claims {
            exp,
            uuid: id.to_string(),
        };
        let value = encode(&Header::new(Algorithm::RS512), &claims, &self.keys.encoding)
            .map_err(|e| CodecError::Signing(e.to_string()))?;
        Ok(Token {
            value,
            id,
            expires_at,
        })
    }

    fn verify(&self, value: &str) -> Result<VerifiedToken, CodecError> {
        let data = decode::<RawClaims>(value, &self.keys.decoding, &Self::validation())
            .map_err(|e| Self::classify(value, e))?;
        let claims = data.claims;

        let exp = claims
            .exp
            .as_ref()
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| CodecError::ClaimType("exp".to_string()))?;
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| CodecError::ClaimType("exp".to_string()))?;
        let id = claims
            .uuid
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .and_then(|s| s.parse::<TokenId>().ok())
            .ok_or_else(|| CodecError::ClaimType("uuid".to_string()))?;

        Ok(VerifiedToken { id, expires_at })
    }
}
