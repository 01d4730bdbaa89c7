use log::info;

use crate::config::UploadConfig;
use crate::credential::TokenStore;
use crate::error::{Error, Result};
use crate::oauth::TokenEndpoint;
use crate::pipeline::hook::ProgressHook;
use crate::youtube::{MediaFile, UploadRequest, UploadStatus, UploadTransport, Video, YouTube};

/// Upload `request.file` using the credential in `store`, returning the new video's ID.
///
/// The token store must already exist; this never starts interactive
/// authorization. An expired credential is refreshed in memory only. The
/// refreshed token is **not** written back to `store`.
///
/// The media file is opened before any network call, so a bad path fails
/// without touching the token endpoint or the API.
pub fn upload_video<E, T, H>(
    request: &UploadRequest,
    store: &TokenStore,
    endpoint: &E,
    transport: &T,
    cfg: &UploadConfig,
    hook: &H,
) -> Result<String>
where
    E: TokenEndpoint + ?Sized,
    T: UploadTransport + ?Sized,
    H: ProgressHook + ?Sized,
{
    let mut credential = store.load_required()?;
    let media = MediaFile::open(&request.file, &cfg.content_type, cfg.chunk_size)?;

    if !credential.is_valid() {
        info!("access token expired, refreshing");
        credential.refresh(endpoint)?;
    }

    let youtube = YouTube::new(&credential, transport, cfg)?;

    info!(
        "uploading {} ({} bytes) as {:?} [{}]",
        media.path().display(),
        media.len(),
        request.title,
        request.privacy
    );
    let mut upload = youtube.insert_video(Video::from(request), media);

    for step in &mut upload {
        match step? {
            UploadStatus::Progress(fraction) => hook.on_progress(fraction),
            UploadStatus::Completed(video_id) => {
                hook.on_complete(&video_id);
                return Ok(video_id);
            }
        }
    }

    Err(Error::transport(
        "upload video",
        "transfer ended without a final response",
    ))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::fs;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::credential::tests::{credential, CountingEndpoint};
    use crate::pipeline::hook::NoopProgress;
    use crate::youtube::transport::fake::FakeTransport;
    use crate::youtube::{parse_tags, ChunkSize, PrivacyStatus};
    use crate::ErrorKind;

    struct Fixture {
        dir: tempfile::TempDir,
        store: TokenStore,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = TokenStore::new(dir.path().join("token.json"));
            Self { dir, store }
        }

        fn with_token(expires_in: Duration, refresh: Option<&str>) -> Self {
            let fx = Self::new();
            fx.store
                .save(&credential(Some(Utc::now() + expires_in), refresh))
                .unwrap();
            fx
        }

        fn media(&self, name: &str, len: usize) -> std::path::PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, vec![0x42u8; len]).unwrap();
            path
        }
    }

    /// Records every fraction it sees.
    #[derive(Default)]
    struct Recorder(RefCell<Vec<f64>>);

    impl ProgressHook for Recorder {
        fn on_progress(&self, fraction: f64) {
            self.0.borrow_mut().push(fraction);
        }
    }

    fn chunked(bytes: u64) -> UploadConfig {
        UploadConfig {
            chunk_size: ChunkSize::Bytes(bytes),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_token_store_makes_no_calls() {
        let fx = Fixture::new();
        let endpoint = CountingEndpoint::default();
        let transport = FakeTransport::default();
        let request = UploadRequest::new(fx.dir.path().join("video.mp4"), "Test");

        let err = upload_video(
            &request,
            &fx.store,
            &endpoint,
            &transport,
            &UploadConfig::default(),
            &NoopProgress,
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains(&fx.store.path().display().to_string()));
        assert_eq!(endpoint.refreshes.get(), 0);
        assert_eq!(transport.network_calls(), 0);
    }

    #[test]
    fn test_ten_chunk_upload() {
        let fx = Fixture::with_token(Duration::hours(1), Some("1//r"));
        let chunk = 1000;
        let mut request = UploadRequest::new(fx.media("clip.mp4", 10 * chunk), "Demo");
        request.tags = parse_tags("a,b");
        request.privacy = PrivacyStatus::Unlisted;
        let endpoint = CountingEndpoint::default();
        let transport = FakeTransport::default();
        let hook = Recorder::default();

        let id = upload_video(
            &request,
            &fx.store,
            &endpoint,
            &transport,
            &chunked(chunk as u64),
            &hook,
        )
        .unwrap();

        assert_eq!(id, "vid-0001");
        assert_eq!(transport.initiated.get(), 1);
        assert_eq!(transport.chunks.get(), 10);
        assert_eq!(hook.0.borrow().len(), 9);
        assert_eq!(endpoint.refreshes.get(), 0);

        let metadata = transport.metadata.borrow().clone().unwrap();
        assert_eq!(metadata["snippet"]["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(metadata["status"]["privacyStatus"], "unlisted");
        assert_eq!(metadata["status"]["madeForKids"], false);
        assert_eq!(metadata["status"]["selfDeclaredMadeForKids"], false);
    }

    #[test]
    fn test_empty_tags_reach_payload_as_empty_list() {
        let fx = Fixture::with_token(Duration::hours(1), None);
        let mut request = UploadRequest::new(fx.media("clip.mp4", 10), "Demo");
        request.tags = parse_tags("");
        let transport = FakeTransport::default();

        upload_video(
            &request,
            &fx.store,
            &CountingEndpoint::default(),
            &transport,
            &UploadConfig::default(),
            &NoopProgress,
        )
        .unwrap();

        let metadata = transport.metadata.borrow().clone().unwrap();
        assert_eq!(metadata["snippet"]["tags"], serde_json::json!([]));
    }

    #[test]
    fn test_expired_token_refreshed_once_and_not_persisted() {
        let fx = Fixture::with_token(-Duration::hours(1), Some("1//r"));
        let on_disk = fs::read(fx.store.path()).unwrap();
        let request = UploadRequest::new(fx.media("clip.mp4", 10), "Demo");
        let endpoint = CountingEndpoint::default();
        let transport = FakeTransport::default();

        upload_video(
            &request,
            &fx.store,
            &endpoint,
            &transport,
            &UploadConfig::default(),
            &NoopProgress,
        )
        .unwrap();

        assert_eq!(endpoint.refreshes.get(), 1);
        let used = transport.access_tokens.borrow();
        assert_eq!(used.as_slice(), ["ya29.fresh-1"]);
        assert_ne!(used[0], "ya29.stale");
        assert_eq!(fs::read(fx.store.path()).unwrap(), on_disk);
    }

    #[test]
    fn test_expired_without_refresh_token_is_auth_error() {
        let fx = Fixture::with_token(-Duration::hours(1), None);
        let request = UploadRequest::new(fx.media("clip.mp4", 10), "Demo");
        let endpoint = CountingEndpoint::default();
        let transport = FakeTransport::default();

        let err = upload_video(
            &request,
            &fx.store,
            &endpoint,
            &transport,
            &UploadConfig::default(),
            &NoopProgress,
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(endpoint.refreshes.get(), 0);
        assert_eq!(transport.network_calls(), 0);
    }

    #[test]
    fn test_missing_media_fails_before_network() {
        let fx = Fixture::with_token(-Duration::hours(1), Some("1//r"));
        let request = UploadRequest::new(fx.dir.path().join("nope.mp4"), "Demo");
        let endpoint = CountingEndpoint::default();
        let transport = FakeTransport::default();

        let err = upload_video(
            &request,
            &fx.store,
            &endpoint,
            &transport,
            &UploadConfig::default(),
            &NoopProgress,
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Input);
        assert_eq!(endpoint.refreshes.get(), 0);
        assert_eq!(transport.network_calls(), 0);
    }

    #[test]
    fn test_chunk_failure_aborts_upload() {
        let fx = Fixture::with_token(Duration::hours(1), None);
        let request = UploadRequest::new(fx.media("clip.mp4", 3000), "Demo");
        let transport = FakeTransport::failing_on(2);

        let err = upload_video(
            &request,
            &fx.store,
            &CountingEndpoint::default(),
            &transport,
            &chunked(1000),
            &NoopProgress,
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(transport.chunks.get(), 2);
    }
}
