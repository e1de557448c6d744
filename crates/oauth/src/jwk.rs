//! Wire-format JWK/JWKS types and their conversion into [`jsonwebtoken::DecodingKey`]s.

use jsonwebtoken::DecodingKey;
use serde::Deserialize;

/// A single entry of a JSON Web Key Set, as published by an authorization server.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(rename = "use", default)]
    pub use_: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    // RSA
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
    // EC
    #[serde(default)]
    pub crv: Option<String>,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// Curves this resource server recognizes in an EC JWK. Curves outside this set are rejected
/// up front rather than handed to the crypto backend.
const SUPPORTED_EC_CURVES: &[&str] = &["P-256", "P-384", "P-521"];

#[derive(Debug, thiserror::Error)]
pub enum JwkDecodeError {
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),
    #[error("unsupported curve: {0}")]
    UnsupportedCurve(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),
}

impl Jwk {
    /// Decode this JWK into a verification key, iff it has a usable `kid`.
    ///
    /// Returns `Ok(None)` for a key this resource server intentionally ignores: an absent
    /// `kid` (per the cache's keyed-lookup-only contract) or a `kty` other than RSA/EC. Any
    /// other failure (missing RSA/EC components, an unsupported curve, malformed base64url) is
    /// returned as an error so the caller can log and skip just this one key.
    pub fn decode(&self) -> Result<Option<(String, DecodingKey)>, JwkDecodeError> {
        let Some(kid) = self.kid.as_ref().filter(|k| !k.is_empty()) else {
            return Ok(None);
        };

        let key = match self.kty.as_str() {
            "RSA" => self.decode_rsa()?,
            "EC" => self.decode_ec()?,
            other => {
                let _ = other;
                return Ok(None);
            }
        };

        Ok(Some((kid.clone(), key)))
    }

    fn decode_rsa(&self) -> Result<DecodingKey, JwkDecodeError> {
        let n = self.n.as_deref().ok_or(JwkDecodeError::MissingField("n"))?;
        let e = self.e.as_deref().ok_or(JwkDecodeError::MissingField("e"))?;
        DecodingKey::from_rsa_components(n, e)
            .map_err(|err| JwkDecodeError::InvalidKeyMaterial(err.to_string()))
    }

    fn decode_ec(&self) -> Result<DecodingKey, JwkDecodeError> {
        let crv = self
            .crv
            .as_deref()
            .ok_or(JwkDecodeError::MissingField("crv"))?;
        if !SUPPORTED_EC_CURVES.contains(&crv) {
            return Err(JwkDecodeError::UnsupportedCurve(crv.to_string()));
        }
        let x = self.x.as_deref().ok_or(JwkDecodeError::MissingField("x"))?;
        let y = self.y.as_deref().ok_or(JwkDecodeError::MissingField("y"))?;
        DecodingKey::from_ec_components(x, y)
            .map_err(|err| JwkDecodeError::InvalidKeyMaterial(err.to_string()))
    }
}
