use log::debug;
use reqwest::blocking::{Body, Client, ClientBuilder};
use reqwest::header::{CONTENT_RANGE, LOCATION, RANGE};
use reqwest::StatusCode;

use crate::error::{Error, Result};
use crate::youtube::media::MediaChunk;
use crate::youtube::video::{UploadedVideo, Video};

/// Parameters of the request that opens a resumable session.
#[derive(Debug, Clone)]
pub struct SessionRequest<'a> {
    pub endpoint: &'a str,
    pub parts: &'a str,
    pub metadata: &'a Video,
    pub content_type: &'a str,
    pub content_length: u64,
}

/// What the server said after receiving a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// `308 Resume Incomplete`: the server holds the first `persisted` bytes.
    Incomplete { persisted: u64 },
    /// The upload finished and the video resource was created.
    Complete(UploadedVideo),
}

/// The two HTTP exchanges of the resumable upload protocol.
pub trait UploadTransport {
    /// Open a session and return its URI.
    fn initiate(&self, access_token: &str, request: &SessionRequest<'_>) -> Result<String>;

    /// Send one chunk to an open session.
    fn send_chunk(&self, session_uri: &str, chunk: MediaChunk) -> Result<ChunkOutcome>;
}

/// [`UploadTransport`] over blocking `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let http = ClientBuilder::new()
            // 308 is "resume incomplete" here, never a redirect to follow.
            .redirect(reqwest::redirect::Policy::none())
            // a single auto-sized chunk can take arbitrarily long
            .timeout(None)
            .build()
            .map_err(|e| Error::transport("build http client", e))?;
        Ok(Self { http })
    }
}

impl UploadTransport for HttpTransport {
    fn initiate(&self, access_token: &str, request: &SessionRequest<'_>) -> Result<String> {
        let context = "start resumable upload";
        let response = self
            .http
            .post(request.endpoint)
            .query(&[("uploadType", "resumable"), ("part", request.parts)])
            .bearer_auth(access_token)
            .header("X-Upload-Content-Type", request.content_type)
            .header("X-Upload-Content-Length", request.content_length.to_string())
            .json(request.metadata)
            .send()
            .map_err(|e| Error::transport(context, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unexpected(context, response));
        }

        let session_uri = response
            .headers()
            .get(LOCATION)
            .ok_or_else(|| Error::transport(context, "no Location header in response"))?
            .to_str()
            .map_err(|e| Error::transport(context, e))?
            .to_string();
        debug!("resumable session opened ({status})");
        Ok(session_uri)
    }

    fn send_chunk(&self, session_uri: &str, chunk: MediaChunk) -> Result<ChunkOutcome> {
        let context = "upload chunk";
        let range = chunk.content_range();
        debug!("sending {range}");

        let response = self
            .http
            .put(session_uri)
            .header(CONTENT_RANGE, range)
            .body(Body::sized(chunk.body, chunk.len))
            .send()
            .map_err(|e| Error::transport(context, e))?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                let video: UploadedVideo = response
                    .json()
                    .map_err(|e| Error::transport("parse upload response", e))?;
                Ok(ChunkOutcome::Complete(video))
            }
            StatusCode::PERMANENT_REDIRECT => {
                let persisted = response
                    .headers()
                    .get(RANGE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(persisted_bytes)
                    .unwrap_or(0);
                Ok(ChunkOutcome::Incomplete { persisted })
            }
            _ => Err(unexpected(context, response)),
        }
    }
}

/// Parse a `Range: bytes=0-N` header into the number of bytes held (`N + 1`).
pub fn persisted_bytes(range: &str) -> Option<u64> {
    let last = range.trim().strip_prefix("bytes=")?.split_once('-')?.1;
    last.trim().parse::<u64>().ok().map(|n| n + 1)
}

fn unexpected(context: &str, response: reqwest::blocking::Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    Error::UnexpectedStatus {
        context: context.to_string(),
        status,
        body,
    }
}
