use std::path::Path;

use chrono::Utc;
use log::info;

use crate::config;
use crate::credential::{Credential, TokenStore};
use crate::error::Result;
use crate::oauth::{ClientSecrets, ConsentFlow, TokenEndpoint};

/// How [`ensure_credential`] obtained its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    /// The stored credential was still valid; the store was not touched.
    Reused,
    /// The stored credential had expired and was refreshed.
    Refreshed,
    /// The user went through interactive consent.
    Authorized,
}

/// Make sure `store` holds a usable credential for the upload scope.
///
/// Steps:
/// 1. Load whatever is in `store`.
/// 2. A valid credential is returned as is.
/// 3. An expired credential with a refresh token is refreshed.
/// 4. Anything else goes through `flow`'s interactive consent, configured from
///    the client secrets at `client_secrets`.
/// 5. After 3 or 4 the store is overwritten.
pub fn ensure_credential<F>(
    store: &TokenStore,
    client_secrets: &Path,
    flow: &F,
) -> Result<(Credential, Provisioned)>
where
    F: TokenEndpoint + ConsentFlow + ?Sized,
{
    let (credential, outcome) = match store.load()? {
        Some(credential) if credential.is_valid() => {
            info!("stored credential is still valid");
            return Ok((credential, Provisioned::Reused));
        }
        Some(mut credential) if credential.is_expired() && credential.can_refresh() => {
            info!("stored credential expired, refreshing");
            credential.refresh(flow)?;
            (credential, Provisioned::Refreshed)
        }
        _ => {
            let secrets = ClientSecrets::from_file(client_secrets)?;
            info!("starting interactive authorization for {}", secrets.client_id);
            let scopes = [config::UPLOAD_SCOPE];
            let grant = flow.authorize(&secrets, &scopes)?;
            let credential = Credential::from_grant(grant, &secrets, &scopes, Utc::now());
            (credential, Provisioned::Authorized)
        }
    };

    store.save(&credential)?;
    Ok((credential, outcome))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fs;
    use std::time::Duration as StdDuration;

    use chrono::Duration;

    use super::*;
    use crate::credential::tests::credential;
    use crate::oauth::TokenGrant;
    use crate::{Error, ErrorKind};

    const SECRETS: &str = r#"{"installed": {
        "client_id": "42.apps.googleusercontent.com",
        "client_secret": "GOCSPX-test",
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": "https://oauth2.googleapis.com/token"
    }}"#;

    /// Answers both refresh and consent without touching the network.
    #[derive(Default)]
    struct FakeFlow {
        refreshes: Cell<usize>,
        consents: Cell<usize>,
        offline: bool,
    }

    impl FakeFlow {
        /// Every token request fails as if the provider were unreachable.
        fn offline() -> Self {
            Self {
                offline: true,
                ..Default::default()
            }
        }
    }

    impl TokenEndpoint for FakeFlow {
        fn refresh(&self, _credential: &Credential) -> Result<TokenGrant> {
            self.refreshes.set(self.refreshes.get() + 1);
            if self.offline {
                return Err(Error::transport("refresh access token", "connection refused"));
            }
            Ok(TokenGrant {
                access_token: "ya29.refreshed".to_string(),
                refresh_token: None,
                expires_in: Some(StdDuration::from_secs(3599)),
                scopes: None,
            })
        }
    }

    impl ConsentFlow for FakeFlow {
        fn authorize(&self, _secrets: &ClientSecrets, scopes: &[&str]) -> Result<TokenGrant> {
            self.consents.set(self.consents.get() + 1);
            assert_eq!(scopes, [config::UPLOAD_SCOPE]);
            if self.offline {
                return Err(Error::transport("exchange authorization code", "connection refused"));
            }
            Ok(TokenGrant {
                access_token: "ya29.consented".to_string(),
                refresh_token: Some("1//consented".to_string()),
                expires_in: Some(StdDuration::from_secs(3599)),
                scopes: None,
            })
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        store: TokenStore,
        secrets: std::path::PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let secrets = dir.path().join("client_secrets.json");
        fs::write(&secrets, SECRETS).unwrap();
        Fixture {
            store: TokenStore::new(dir.path().join("token.json")),
            secrets,
            _dir: dir,
        }
    }

    #[test]
    fn test_first_run_authorizes_and_saves() {
        let fx = fixture();
        let flow = FakeFlow::default();

        let (cred, outcome) = ensure_credential(&fx.store, &fx.secrets, &flow).unwrap();

        assert_eq!(outcome, Provisioned::Authorized);
        assert_eq!(flow.consents.get(), 1);
        assert_eq!(cred.client_id, "42.apps.googleusercontent.com");
        assert_eq!(cred.scopes, vec![config::UPLOAD_SCOPE.to_string()]);
        assert_eq!(fx.store.load_required().unwrap(), cred);
    }

    #[test]
    fn test_valid_token_is_not_rewritten() {
        let fx = fixture();
        let flow = FakeFlow::default();
        fx.store
            .save(&credential(Some(Utc::now() + Duration::hours(1)), Some("1//r")))
            .unwrap();
        let before = fs::read(fx.store.path()).unwrap();

        let (_, first) = ensure_credential(&fx.store, &fx.secrets, &flow).unwrap();
        let (_, second) = ensure_credential(&fx.store, &fx.secrets, &flow).unwrap();

        assert_eq!(first, Provisioned::Reused);
        assert_eq!(second, Provisioned::Reused);
        assert_eq!(fs::read(fx.store.path()).unwrap(), before);
        assert_eq!(flow.refreshes.get() + flow.consents.get(), 0);
    }

    #[test]
    fn test_expired_token_is_refreshed_and_persisted() {
        let fx = fixture();
        let flow = FakeFlow::default();
        fx.store
            .save(&credential(Some(Utc::now() - Duration::hours(1)), Some("1//r")))
            .unwrap();

        let (cred, outcome) = ensure_credential(&fx.store, &fx.secrets, &flow).unwrap();

        assert_eq!(outcome, Provisioned::Refreshed);
        assert_eq!(flow.refreshes.get(), 1);
        assert_eq!(flow.consents.get(), 0);
        let stored = fx.store.load_required().unwrap();
        assert_eq!(stored.access_token, "ya29.refreshed");
        assert_eq!(stored.refresh_token.as_deref(), Some("1//r"));
        assert_eq!(stored, cred);
    }

    #[test]
    fn test_expired_without_refresh_token_reauthorizes() {
        let fx = fixture();
        let flow = FakeFlow::default();
        fx.store
            .save(&credential(Some(Utc::now() - Duration::hours(1)), None))
            .unwrap();

        let (_, outcome) = ensure_credential(&fx.store, &fx.secrets, &flow).unwrap();

        assert_eq!(outcome, Provisioned::Authorized);
        assert_eq!(flow.refreshes.get(), 0);
    }

    #[test]
    fn test_missing_secrets_is_fatal_and_writes_nothing() {
        let fx = fixture();
        fs::remove_file(&fx.secrets).unwrap();
        let flow = FakeFlow::default();

        let err = ensure_credential(&fx.store, &fx.secrets, &flow).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(err, Error::UnreadableClientSecrets { .. }));
        assert_eq!(flow.consents.get(), 0);
        assert!(fx.store.load().unwrap().is_none());
    }

    #[test]
    fn test_refresh_network_failure_leaves_store_untouched() {
        let fx = fixture();
        let flow = FakeFlow::offline();
        fx.store
            .save(&credential(Some(Utc::now() - Duration::hours(1)), Some("1//r")))
            .unwrap();
        let before = fs::read(fx.store.path()).unwrap();

        let err = ensure_credential(&fx.store, &fx.secrets, &flow).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(flow.refreshes.get(), 1);
        assert_eq!(flow.consents.get(), 0);
        assert_eq!(fs::read(fx.store.path()).unwrap(), before);
    }

    #[test]
    fn test_code_exchange_network_failure_writes_nothing() {
        let fx = fixture();
        let flow = FakeFlow::offline();

        let err = ensure_credential(&fx.store, &fx.secrets, &flow).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(flow.consents.get(), 1);
        assert!(fx.store.load().unwrap().is_none());
    }

    #[test]
    fn test_reauthorize_failure_keeps_previous_token() {
        let fx = fixture();
        let flow = FakeFlow::offline();
        fx.store
            .save(&credential(Some(Utc::now() - Duration::hours(1)), None))
            .unwrap();
        let before = fs::read(fx.store.path()).unwrap();

        let err = ensure_credential(&fx.store, &fx.secrets, &flow).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(fs::read(fx.store.path()).unwrap(), before);
    }
}
