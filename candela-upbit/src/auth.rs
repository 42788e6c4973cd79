use std::fmt;

use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use sha2::{Digest, Sha512};
use uuid::Uuid;

use candela_core::CandelaError;

/// API key pair for private endpoints.
#[derive(Clone)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Key pair from explicit values.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Read `UPBIT_ACCESS_KEY` and `UPBIT_SECRET_KEY`.
    ///
    /// # Errors
    /// Returns `InvalidArg` naming the first missing variable.
    pub fn from_env() -> Result<Self, CandelaError> {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| CandelaError::InvalidArg(format!("{name} is not set")))
        };
        Ok(Self::new(var("UPBIT_ACCESS_KEY")?, var("UPBIT_SECRET_KEY")?))
    }

    /// Bearer header value for a request whose parameters encode to `query`.
    ///
    /// An empty `query` signs a parameterless request (no `query_hash`).
    ///
    /// # Errors
    /// Returns `InvalidArg` if the token cannot be encoded.
    pub fn authorization(&self, query: &str) -> Result<String, CandelaError> {
        let claims = Claims {
            access_key: &self.access_key,
            nonce: Uuid::new_v4().to_string(),
            query_hash: (!query.is_empty()).then(|| query_hash(query)),
            query_hash_alg: (!query.is_empty()).then_some("SHA512"),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret_key.as_bytes()),
        )
        .map_err(|e| CandelaError::InvalidArg(format!("jwt: {e}")))?;
        Ok(format!("Bearer {token}"))
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    access_key: &'a str,
    nonce: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_hash_alg: Option<&'static str>,
}

/// Hex SHA-512 of the unescaped query string.
#[must_use]
pub fn query_hash(query: &str) -> String {
    hex::encode(Sha512::digest(query.as_bytes()))
}
