pub mod config;
pub mod credential;
mod error;
pub mod oauth;
pub mod pipeline;
pub mod youtube;

pub use config::UploadConfig;
pub use credential::{Credential, TokenStore};
pub use error::{Error, ErrorKind, Result};
pub use oauth::{ClientSecrets, ConsentFlow, OAuthClient, TokenEndpoint, TokenGrant};
pub use pipeline::hook::{NoopProgress, ProgressHook};
pub use pipeline::provision::{ensure_credential, Provisioned};
pub use pipeline::upload::upload_video;
pub use youtube::{
    parse_tags, ChunkSize, HttpTransport, PrivacyStatus, ResumableUpload, UploadRequest,
    UploadStatus, UploadTransport, YouTube,
};
