//! YouTube Data API v3 upload client.
//!
//! [`YouTube`] is an authenticated handle; [`YouTube::insert_video`] returns a
//! [`ResumableUpload`] that the caller drives chunk by chunk.

pub mod media;
pub mod resumable;
pub mod transport;
pub mod video;

use log::debug;

use crate::config::UploadConfig;
use crate::credential::Credential;
use crate::error::{Error, Result};

pub use media::{ChunkSize, MediaFile};
pub use resumable::{ResumableUpload, UploadStatus};
pub use transport::{ChunkOutcome, HttpTransport, UploadTransport};
pub use video::{parse_tags, PrivacyStatus, UploadRequest, UploadedVideo, Video};

/// An authenticated client bound to the upload endpoint.
pub struct YouTube<'t, T: UploadTransport + ?Sized> {
    access_token: String,
    transport: &'t T,
    config: UploadConfig,
}

impl<'t, T: UploadTransport + ?Sized> YouTube<'t, T> {
    /// Bind `credential` to `transport`. An expired or empty credential is
    /// refused so it can never reach the API.
    pub fn new(credential: &Credential, transport: &'t T, config: &UploadConfig) -> Result<Self> {
        if credential.access_token.is_empty() {
            return Err(Error::UnusableCredential("access token is empty"));
        }
        if credential.is_expired() {
            return Err(Error::UnusableCredential("access token has expired"));
        }
        debug!("client bound to {}", config.upload_endpoint);
        Ok(Self {
            access_token: credential.access_token.clone(),
            transport,
            config: config.clone(),
        })
    }

    /// `videos.insert` with `metadata` and a resumable `media` body.
    pub fn insert_video(&self, metadata: Video, media: MediaFile) -> ResumableUpload<'t, T> {
        ResumableUpload::new(
            self.transport,
            self.access_token.clone(),
            self.config.clone(),
            metadata,
            media,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::tests::credential;
    use crate::youtube::transport::fake::FakeTransport;
    use chrono::{Duration, Utc};

    #[test]
    fn test_refuses_expired_credential() {
        let transport = FakeTransport::default();
        let cred = credential(Some(Utc::now() - Duration::hours(1)), Some("1//r"));
        let result = YouTube::new(&cred, &transport, &UploadConfig::default());
        assert!(matches!(
            result,
            Err(Error::UnusableCredential("access token has expired"))
        ));
    }

    #[test]
    fn test_refuses_empty_access_token() {
        let transport = FakeTransport::default();
        let mut cred = credential(Some(Utc::now() + Duration::hours(1)), Some("1//r"));
        cred.access_token.clear();

        let err = YouTube::new(&cred, &transport, &UploadConfig::default())
            .err()
            .unwrap();

        assert!(err.to_string().contains("access token is empty"));
        assert!(!err.to_string().contains("refresh token"));
        assert_eq!(err.kind(), crate::ErrorKind::Authentication);
    }

    #[test]
    fn test_accepts_valid_credential() {
        let transport = FakeTransport::default();
        let cred = credential(Some(Utc::now() + Duration::hours(1)), None);
        assert!(YouTube::new(&cred, &transport, &UploadConfig::default()).is_ok());
        assert_eq!(transport.network_calls(), 0);
    }
}
