//! Apple Music developer token minting.
//!
//! MusicKit wants a short ES256 assertion signed with the team's `.p8` key.
//! Missing credentials are not an error: the caller silently degrades to
//! unauthenticated extraction.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::Serialize;

use crate::config;
use crate::error::Result;

const TOKEN_VALIDITY_DAYS: i64 = 180;

#[derive(Debug, Clone)]
pub struct AppleCredentials {
    pub team_id: String,
    pub key_id: String,
    pub private_key_path: PathBuf,
}

impl AppleCredentials {
    /// Credentials from the environment; `None` unless both ids are set to
    /// real (non-placeholder) values.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            team_id: config::apple_team_id()?,
            key_id: config::apple_key_id()?,
            private_key_path: config::apple_private_key_path(),
        })
    }
}

#[derive(Serialize)]
struct DeveloperTokenClaims {
    iss: String,
    iat: i64,
    exp: i64,
}

pub fn generate_developer_token(credentials: &AppleCredentials) -> Result<String> {
    let pem = std::fs::read(&credentials.private_key_path)?;
    let key = EncodingKey::from_ec_pem(&pem)?;

    let mut header = Header::new(Algorithm::ES256);
    header.kid = Some(credentials.key_id.clone());

    let now = Utc::now();
    let claims = DeveloperTokenClaims {
        iss: credentials.team_id.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::days(TOKEN_VALIDITY_DAYS)).timestamp(),
    };

    Ok(encode(&header, &claims, &key)?)
}

/// Mint a developer token when credentials are configured. `Ok(None)` means
/// unauthenticated mode, not a failure.
pub fn mint_developer_token() -> Result<Option<String>> {
    let Some(credentials) = AppleCredentials::from_env() else {
        tracing::info!("Apple Music developer credentials not configured");
        return Ok(None);
    };

    if !credentials.private_key_path.exists() {
        tracing::error!(
            path = %credentials.private_key_path.display(),
            "Apple Music private key file not found"
        );
        return Ok(None);
    }

    let token = generate_developer_token(&credentials)?;
    tracing::info!("Apple Music developer token generated");
    Ok(Some(token))
}
