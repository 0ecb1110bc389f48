//! services/api/src/adapters/supabase_auth.rs
//!
//! This module contains the adapter for access-token verification against
//! Supabase's auth endpoint. It implements the `TokenVerificationService`
//! port from the `core` crate.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use sleep_coach_core::ports::{PortError, PortResult, TokenVerificationService};
use uuid::Uuid;

/// The slice of `GET /auth/v1/user` we care about.
#[derive(Deserialize)]
struct SupabaseUser {
    id: Uuid,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that verifies Supabase JWTs by asking the auth server who the
/// token belongs to. Token validity, expiry, and signature checks all stay on
/// the provider's side.
#[derive(Clone)]
pub struct SupabaseVerifier {
    client: reqwest::Client,
    user_endpoint: String,
}

impl SupabaseVerifier {
    /// Creates a new `SupabaseVerifier` for the given project URL and anon key.
    pub fn new(supabase_url: &str, anon_key: &str) -> Result<Self, PortError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(anon_key)
                .map_err(|e| PortError::Unexpected(format!("Invalid Supabase anon key: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                PortError::Unexpected(format!("Failed to build Supabase HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            user_endpoint: format!("{}/auth/v1/user", supabase_url.trim_end_matches('/')),
        })
    }
}

//=========================================================================================
// `TokenVerificationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TokenVerificationService for SupabaseVerifier {
    /// Resolves an access token to the authenticated user's id.
    ///
    /// Any non-success status from the auth server (missing, malformed,
    /// expired, or revoked token) maps to `Unauthorized`; transport failures
    /// map to `Unexpected`.
    async fn verify_token(&self, access_token: &str) -> PortResult<Uuid> {
        let response = self
            .client
            .get(&self.user_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                PortError::Unexpected(format!("Token verification request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(PortError::Unauthorized);
        }

        let user: SupabaseUser = response
            .json()
            .await
            .map_err(|_| PortError::Unauthorized)?;
        Ok(user.id)
    }
}
