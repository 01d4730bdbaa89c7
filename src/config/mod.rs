use crate::youtube::media::ChunkSize;

// OAuth
pub const UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const REDIRECT_HOST: &str = "127.0.0.1";

/// Seconds subtracted from a credential's expiry before it is treated as expired.
pub const EXPIRY_SKEW_SECS: i64 = 10;

// Data API
pub const API_VERSION: &str = "v3";
pub const UPLOAD_ENDPOINT: &str = "https://www.googleapis.com/upload/youtube/v3/videos";
pub const INSERT_PARTS: &str = "snippet,status";
pub const MEDIA_CONTENT_TYPE: &str = "video/*";

// Upload defaults
pub const DEFAULT_CATEGORY_ID: &str = "22"; // People & Blogs
pub const DEFAULT_CHUNK_SIZE: u64 = 0; // 0 = send the whole file in one request

/// Resumable chunks (other than the last) must be a multiple of this.
pub const CHUNK_GRANULARITY: u64 = 256 * 1024;

/// Runtime configuration for a single upload.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub upload_endpoint: String,
    pub parts: String,
    pub content_type: String,
    pub chunk_size: ChunkSize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_endpoint: UPLOAD_ENDPOINT.to_string(),
            parts: INSERT_PARTS.to_string(),
            content_type: MEDIA_CONTENT_TYPE.to_string(),
            chunk_size: ChunkSize::Auto,
        }
    }
}
