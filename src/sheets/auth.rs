//! Google API access tokens.
//!
//! Supports a pre-issued bearer token, or a service account key exchanged
//! for a short-lived token with the OAuth 2.0 JWT bearer grant.

use super::SheetsError;
use crate::config::AuthConfig;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for signed assertions, in seconds.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The fields of a service account key file that the token flow needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[hidden]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Parse a service account key from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, SheetsError> {
        serde_json::from_str(json).map_err(|e| SheetsError::Credentials(e.to_string()))
    }

    /// Load a service account key from a file.
    pub fn from_file(path: &Path) -> Result<Self, SheetsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

enum TokenSource {
    Static(String),
    ServiceAccount {
        key: ServiceAccountKey,
        scope: String,
        cache: Mutex<Option<CachedToken>>,
    },
}

/// Hands out bearer tokens for Sheets API requests.
pub struct TokenProvider {
    source: TokenSource,
    http: reqwest::Client,
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match &self.source {
            TokenSource::Static(_) => "static".to_string(),
            TokenSource::ServiceAccount { key, .. } => {
                format!("service account {}", key.client_email)
            }
        };
        f.debug_struct("TokenProvider")
            .field("source", &source)
            .finish()
    }
}

impl TokenProvider {
    /// Use a fixed bearer token.
    pub fn from_static(token: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            source: TokenSource::Static(token.into()),
            http,
        }
    }

    /// Exchange a service account key for tokens on demand.
    pub fn from_service_account(
        key: ServiceAccountKey,
        scope: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            source: TokenSource::ServiceAccount {
                key,
                scope: scope.into(),
                cache: Mutex::new(None),
            },
            http,
        }
    }

    /// Pick a token source from the configuration.
    ///
    /// Order: static token env var, credentials file, credentials JSON env var.
    pub fn from_config(config: &AuthConfig, http: reqwest::Client) -> Result<Self, SheetsError> {
        if let Some(token) = non_empty_env(&config.access_token_env) {
            info!("Using access token from {}", config.access_token_env);
            return Ok(Self::from_static(token, http));
        }

        let key = if let Some(ref path) = config.credentials_file {
            info!("Using service account key file {}", path.display());
            ServiceAccountKey::from_file(path)?
        } else if let Some(json) = non_empty_env(&config.credentials_env) {
            info!("Using service account key from {}", config.credentials_env);
            ServiceAccountKey::from_json(&json)?
        } else {
            return Err(SheetsError::Credentials(format!(
                "set {} or {}, or configure auth.credentials_file",
                config.access_token_env, config.credentials_env
            )));
        };

        Ok(Self::from_service_account(key, config.scope.clone(), http))
    }

    /// Return a valid access token, fetching a new one when needed.
    pub async fn access_token(&self) -> Result<String, SheetsError> {
        let (key, scope, cache) = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ServiceAccount { key, scope, cache } => (key, scope, cache),
        };

        let mut cached = cache.lock().await;
        let now = Utc::now();
        if let Some(ref token) = *cached {
            if token.is_fresh(now) {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting access token for {}", key.client_email);
        let assertion = sign_assertion(key, scope, now)?;
        let response = self
            .http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Auth(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        let fresh = CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        };
        let value = fresh.value.clone();
        *cached = Some(fresh);

        Ok(value)
    }
}

/// Sign the JWT assertion sent to the token endpoint.
fn sign_assertion(
    key: &ServiceAccountKey,
    scope: &str,
    now: DateTime<Utc>,
) -> Result<String, SheetsError> {
    let claims = Claims {
        iss: &key.client_email,
        scope,
        aud: &key.token_uri,
        iat: now.timestamp(),
        exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| SheetsError::Credentials(format!("invalid private key: {}", e)))?;

    encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| SheetsError::Credentials(format!("failed to sign assertion: {}", e)))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
