//! OAuth 2.0 plumbing: client secrets, token grants, and the blocking client
//! that talks to the provider's authorization and token endpoints.

pub mod redirect;

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{debug, info, warn};
use oauth2::basic::{BasicClient, BasicErrorResponse, BasicErrorResponseType, BasicTokenResponse};
use oauth2::reqwest;
use oauth2::{
    AuthType, AuthUrl, ClientId, ClientSecret, CsrfToken, HttpClientError, PkceCodeChallenge,
    RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;

use crate::config;
use crate::credential::Credential;
use crate::error::{Error, Result};
use redirect::RedirectListener;

/// The OAuth client descriptor downloaded from the Google Cloud console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    config::DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    config::DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|source| Error::UnreadableClientSecrets {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(path, &bytes)
    }

    fn from_slice(path: &Path, bytes: &[u8]) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedClientSecrets {
            path: path.to_path_buf(),
            reason,
        };
        let file: ClientSecretsFile =
            serde_json::from_slice(bytes).map_err(|e| malformed(e.to_string()))?;
        let secrets = match (file.installed, file.web) {
            (Some(installed), None) => installed,
            (None, Some(web)) => web,
            _ => {
                return Err(malformed(
                    "client secrets must be for a web or installed app".to_string(),
                ))
            }
        };
        if secrets.client_id.is_empty() {
            return Err(malformed("client_id is empty".to_string()));
        }
        Ok(secrets)
    }
}

/// The useful part of a token endpoint response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<Duration>,
    pub scopes: Option<Vec<String>>,
}

impl From<&BasicTokenResponse> for TokenGrant {
    fn from(response: &BasicTokenResponse) -> Self {
        Self {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_in: response.expires_in(),
            scopes: response
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.as_str().to_owned()).collect()),
        }
    }
}

/// Something that can trade a refresh token for a new access token.
pub trait TokenEndpoint {
    fn refresh(&self, credential: &Credential) -> Result<TokenGrant>;
}

/// Something that can walk a user through consent and return the issued tokens.
pub trait ConsentFlow {
    fn authorize(&self, secrets: &ClientSecrets, scopes: &[&str]) -> Result<TokenGrant>;
}

/// Blocking OAuth client for Google's installed-app flow.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::blocking::Client,
    open_browser: bool,
}

impl OAuthClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::blocking::ClientBuilder::new()
            // Following redirects opens the client up to SSRF vulnerabilities.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::transport("build http client", e))?;
        Ok(Self {
            http,
            open_browser: true,
        })
    }

    /// Whether to launch the system browser at the consent URL. The URL is
    /// always printed.
    pub fn open_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }
}

impl TokenEndpoint for OAuthClient {
    fn refresh(&self, credential: &Credential) -> Result<TokenGrant> {
        let refresh_token = credential
            .refresh_token
            .clone()
            .map(RefreshToken::new)
            .ok_or(Error::RefreshUnavailable)?;

        let client = BasicClient::new(ClientId::new(credential.client_id.clone()))
            .set_client_secret(ClientSecret::new(credential.client_secret.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(token_url(&credential.token_uri)?);

        let response = client
            .exchange_refresh_token(&refresh_token)
            .request(&self.http)
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(ref sr)
                    if *sr.error() == BasicErrorResponseType::InvalidGrant =>
                {
                    Error::RefreshRejected(sr.to_string())
                }
                e => token_error("refresh access token", e),
            })?;

        debug!("access token refreshed");
        Ok(TokenGrant::from(&response))
    }
}

impl ConsentFlow for OAuthClient {
    fn authorize(&self, secrets: &ClientSecrets, scopes: &[&str]) -> Result<TokenGrant> {
        let listener = RedirectListener::bind()?;
        let redirect_uri = listener.redirect_uri();
        let redirect_url = RedirectUrl::new(redirect_uri.clone())
            .map_err(|e| invalid_endpoint(&redirect_uri, e))?;
        let auth_url = AuthUrl::new(secrets.auth_uri.clone())
            .map_err(|e| invalid_endpoint(&secrets.auth_uri, e))?;

        let client = BasicClient::new(ClientId::new(secrets.client_id.clone()))
            .set_client_secret(ClientSecret::new(secrets.client_secret.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_auth_uri(auth_url)
            .set_token_uri(token_url(&secrets.token_uri)?)
            .set_redirect_uri(redirect_url);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (consent_url, csrf) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(scopes.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("access_type", "offline")
            .set_pkce_challenge(pkce_challenge)
            .url();

        println!("Please visit this URL to authorize this application: {consent_url}");
        if self.open_browser {
            if let Err(e) = webbrowser::open(consent_url.as_str()) {
                warn!("could not open a browser ({e}); open the URL above manually");
            }
        }

        info!("waiting for authorization on {redirect_uri}");
        let code = listener.wait_for_code(&csrf)?;

        let response = client
            .exchange_code(code)
            .set_pkce_verifier(pkce_verifier)
            .request(&self.http)
            .map_err(|e| token_error("exchange authorization code", e))?;

        Ok(TokenGrant::from(&response))
    }
}

fn token_url(uri: &str) -> Result<TokenUrl> {
    TokenUrl::new(uri.to_string()).map_err(|e| invalid_endpoint(uri, e))
}

fn invalid_endpoint(url: &str, err: impl std::fmt::Display) -> Error {
    Error::InvalidEndpoint {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

fn token_error(
    context: &str,
    err: RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>,
) -> Error {
    match err {
        RequestTokenError::ServerResponse(sr) => Error::Authorization(format!("{context}: {sr}")),
        e => Error::transport(context, e),
    }
}
