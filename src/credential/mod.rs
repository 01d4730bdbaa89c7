pub mod store;

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{Error, Result};
use crate::oauth::{ClientSecrets, TokenEndpoint, TokenGrant};

pub use store::TokenStore;

/// An OAuth2 user credential, stored in Google's authorized-user layout.
///
/// Besides the tokens it records the token endpoint and client it was issued
/// for, so it can be refreshed without the client-secret file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "token")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    /// Build a credential from the response to an authorization-code exchange.
    pub fn from_grant(
        grant: TokenGrant,
        secrets: &ClientSecrets,
        requested_scopes: &[&str],
        now: DateTime<Utc>,
    ) -> Self {
        let scopes = grant
            .scopes
            .unwrap_or_else(|| requested_scopes.iter().map(|s| s.to_string()).collect());
        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            scopes,
            expiry: grant.expires_in.map(|d| expiry_after(now, d)),
        }
    }

    /// `true` once `now` is within [`config::EXPIRY_SKEW_SECS`] of the expiry.
    /// A credential without an expiry never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry
                .checked_sub_signed(Duration::seconds(config::EXPIRY_SKEW_SECS))
                .map_or(true, |deadline| now >= deadline),
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && !self.is_expired_at(now)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Exchange the refresh token for a new access token, updating `self` in place.
    pub fn refresh<E: TokenEndpoint + ?Sized>(&mut self, endpoint: &E) -> Result<()> {
        if !self.can_refresh() {
            return Err(Error::RefreshUnavailable);
        }
        debug!("refreshing access token against {}", self.token_uri);
        let grant = endpoint.refresh(self)?;
        self.apply_grant(grant, Utc::now());
        Ok(())
    }

    /// Apply a refresh response. The refresh token survives unless the
    /// provider rotated it.
    pub fn apply_grant(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        self.access_token = grant.access_token;
        if let Some(rotated) = grant.refresh_token {
            self.refresh_token = Some(rotated);
        }
        if let Some(scopes) = grant.scopes {
            self.scopes = scopes;
        }
        self.expiry = grant.expires_in.map(|d| expiry_after(now, d));
    }
}

/// Lifetimes the date range cannot hold fall back to one hour.
fn expiry_after(now: DateTime<Utc>, expires_in: std::time::Duration) -> DateTime<Utc> {
    let fallback = now + Duration::hours(1);
    Duration::from_std(expires_in)
        .ok()
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(fallback)
}
