//! Authentication middleware for JWT token validation
//!
//! Requests without an `Authorization` header pass through anonymously; the
//! upload pipeline then rejects them as unauthenticated. A header that is
//! present but invalid is rejected here with 401.

use anyhow::{Context, Result};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use media::Principal;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// User email, when the issuer includes it
    #[serde(default)]
    pub email: Option<String>,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Verifies bearer tokens issued by the identity provider.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl JwtVerifier {
    /// Build a verifier from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PUBLIC_KEY`: RS256 public key (PEM) or path to it
    /// - `JWT_SECRET`: HS256 shared secret, used when no public key is set
    ///
    /// Returns `None` when neither is configured.
    pub fn from_env() -> Result<Option<Self>> {
        if let Ok(public_key) = env::var("JWT_PUBLIC_KEY") {
            // If the public key looks like a file path, read from file
            let public_key = if public_key.starts_with("-----BEGIN") {
                public_key
            } else {
                std::fs::read_to_string(&public_key)
                    .with_context(|| format!("Failed to read public key file {}", public_key))?
                    .trim()
                    .to_string()
            };

            return Ok(Some(Self::from_rsa_pem(public_key.as_bytes())?));
        }

        match env::var("JWT_SECRET") {
            Ok(secret) => Ok(Some(Self::from_secret(secret.as_bytes()))),
            Err(_) => Ok(None),
        }
    }

    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self> {
        Ok(Self {
            decoding_key: DecodingKey::from_rsa_pem(pem).context("Invalid JWT public key")?,
            algorithm: Algorithm::RS256,
        })
    }

    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
        }
    }

    /// Validate an access token and return the principal it names.
    pub fn verify(&self, token: &str) -> Result<Principal, ApiError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;

        let token_data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                warn!("Failed to validate token: {}", e);
                ApiError::Unauthorized
            })?;

        if token_data.claims.token_type != TokenType::Access {
            warn!("Rejected non-access token for {}", token_data.claims.sub);
            return Err(ApiError::Unauthorized);
        }

        Ok(Principal {
            id: token_data.claims.sub,
            email: token_data.claims.email,
        })
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        debug!("Anonymous request to {}", req.uri().path());
        return Ok(next.run(req).await);
    };

    // Check if it's a Bearer token
    let token = auth_header
        .to_str()
        .ok()
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let verifier = state.jwt.as_ref().ok_or_else(|| {
        warn!("Bearer token received but no JWT key is configured");
        ApiError::Unauthorized
    })?;

    let principal = verifier.verify(token)?;

    // Insert the principal into the request extensions
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
