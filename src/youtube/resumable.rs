use log::debug;

use crate::config::UploadConfig;
use crate::error::{Error, Result};
use crate::youtube::media::MediaFile;
use crate::youtube::transport::{ChunkOutcome, SessionRequest, UploadTransport};
use crate::youtube::video::Video;

/// One step of a resumable upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadStatus {
    /// Fraction (0.0–1.0) of the file the server has confirmed.
    Progress(f64),
    /// The video was created with this ID.
    Completed(String),
}

/// An in-progress `videos.insert` using the resumable protocol.
///
/// Nothing is sent until the first [`next_chunk`](Self::next_chunk), which
/// also opens the session. As an [`Iterator`] it yields each step and stops
/// after completion or the first error.
pub struct ResumableUpload<'a, T: UploadTransport + ?Sized> {
    transport: &'a T,
    access_token: String,
    config: UploadConfig,
    metadata: Video,
    media: MediaFile,
    session_uri: Option<String>,
    offset: u64,
    finished: bool,
}

impl<'a, T: UploadTransport + ?Sized> ResumableUpload<'a, T> {
    pub(crate) fn new(
        transport: &'a T,
        access_token: String,
        config: UploadConfig,
        metadata: Video,
        media: MediaFile,
    ) -> Self {
        Self {
            transport,
            access_token,
            config,
            metadata,
            media,
            session_uri: None,
            offset: 0,
            finished: false,
        }
    }

    pub fn session_uri(&self) -> Option<&str> {
        self.session_uri.as_deref()
    }

    /// Fraction of the media the server has acknowledged so far.
    pub fn progress(&self) -> f64 {
        if self.media.is_empty() {
            0.0
        } else {
            self.offset as f64 / self.media.len() as f64
        }
    }

    /// Send the next chunk, opening the session first if needed.
    pub fn next_chunk(&mut self) -> Result<UploadStatus> {
        if self.finished {
            return Err(Error::transport("advance upload", "upload already finished"));
        }

        let session_uri = match self.session_uri.clone() {
            Some(uri) => uri,
            None => {
                let request = SessionRequest {
                    endpoint: &self.config.upload_endpoint,
                    parts: &self.config.parts,
                    metadata: &self.metadata,
                    content_type: self.media.content_type(),
                    content_length: self.media.len(),
                };
                let uri = self.transport.initiate(&self.access_token, &request)?;
                self.session_uri = Some(uri.clone());
                uri
            }
        };

        let chunk = self.media.chunk_at(self.offset)?;
        let sent_from = self.offset;
        match self.transport.send_chunk(&session_uri, chunk)? {
            ChunkOutcome::Complete(video) => {
                self.offset = self.media.len();
                self.finished = true;
                debug!("upload complete, video id {}", video.id);
                Ok(UploadStatus::Completed(video.id))
            }
            ChunkOutcome::Incomplete { persisted } => {
                if persisted <= sent_from {
                    return Err(Error::transport(
                        "upload chunk",
                        format!("server accepted no bytes past offset {sent_from}"),
                    ));
                }
                self.offset = persisted.min(self.media.len());
                Ok(UploadStatus::Progress(self.progress()))
            }
        }
    }
}

impl<T: UploadTransport + ?Sized> Iterator for ResumableUpload<'_, T> {
    type Item = Result<UploadStatus>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let step = self.next_chunk();
        if !matches!(step, Ok(UploadStatus::Progress(_))) {
            self.finished = true;
        }
        Some(step)
    }
}
