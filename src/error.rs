use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Broad class of a failure, used to decide what the user has to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed token store / client-secret file.
    Configuration,
    /// The credential cannot be used; `ytup auth` must be re-run.
    Authentication,
    /// Network failure or unexpected response from an upstream service.
    Transport,
    /// Bad local input (media file, chunk size).
    Input,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("token store not found at {path}; run `ytup auth` first to authenticate")]
    MissingTokenStore { path: PathBuf },
    #[error("cannot read token store {path}")]
    UnreadableTokenStore {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("token store {path} does not contain a credential")]
    MalformedTokenStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot write token store {path}")]
    TokenStoreWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot read client secrets {path}")]
    UnreadableClientSecrets {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid client secrets {path}: {reason}")]
    MalformedClientSecrets { path: PathBuf, reason: String },
    #[error("invalid endpoint url {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("credential expired and has no refresh token; run `ytup auth` again")]
    RefreshUnavailable,
    #[error("credential is not usable: {0}; run `ytup auth` again")]
    UnusableCredential(&'static str),
    #[error("refresh token rejected by provider ({0}); run `ytup auth` again")]
    RefreshRejected(String),
    #[error("authorization failed: {0}")]
    Authorization(String),

    #[error("{context}: {message}")]
    Transport { context: String, message: String },
    #[error("{context}: server returned {status}: {body}")]
    UnexpectedStatus {
        context: String,
        status: u16,
        body: String,
    },

    #[error("media file not found: {path}")]
    MediaNotFound { path: PathBuf },
    #[error("cannot read media file {path}")]
    MediaRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("chunk size {0} is not a positive multiple of 262144 bytes")]
    InvalidChunkSize(u64),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingTokenStore { .. }
            | Error::UnreadableTokenStore { .. }
            | Error::MalformedTokenStore { .. }
            | Error::TokenStoreWrite { .. }
            | Error::UnreadableClientSecrets { .. }
            | Error::MalformedClientSecrets { .. }
            | Error::InvalidEndpoint { .. } => ErrorKind::Configuration,
            Error::RefreshUnavailable
            | Error::UnusableCredential(_)
            | Error::RefreshRejected(_)
            | Error::Authorization(_) => ErrorKind::Authentication,
            Error::Transport { .. } | Error::UnexpectedStatus { .. } => ErrorKind::Transport,
            Error::MediaNotFound { .. } | Error::MediaRead { .. } | Error::InvalidChunkSize(_) => {
                ErrorKind::Input
            }
        }
    }

    pub(crate) fn transport(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Error::Transport {
            context: context.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_store_is_configuration() {
        let err = Error::MissingTokenStore {
            path: PathBuf::from("/tmp/token.json"),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("/tmp/token.json"));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Error::RefreshUnavailable.kind(), ErrorKind::Authentication);
        assert_eq!(
            Error::transport("upload chunk", "connection reset").kind(),
            ErrorKind::Transport
        );
        assert_eq!(Error::InvalidChunkSize(3).kind(), ErrorKind::Input);
    }
}
