use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::config;
use crate::error::{Error, Result};

/// How much of the file each resumable request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSize {
    /// Everything that remains, in a single request.
    Auto,
    /// A fixed number of bytes (the final chunk may be shorter).
    Bytes(u64),
}

impl ChunkSize {
    /// `0` selects [`ChunkSize::Auto`]; anything else must be a multiple of
    /// [`config::CHUNK_GRANULARITY`].
    pub fn from_bytes(bytes: u64) -> Result<Self> {
        if bytes == 0 {
            Ok(ChunkSize::Auto)
        } else if bytes % config::CHUNK_GRANULARITY != 0 {
            Err(Error::InvalidChunkSize(bytes))
        } else {
            Ok(ChunkSize::Bytes(bytes))
        }
    }
}

/// A local file opened as a resumable media source.
#[derive(Debug)]
pub struct MediaFile {
    path: PathBuf,
    file: File,
    len: u64,
    content_type: String,
    chunk_size: ChunkSize,
}

/// One slice of the media, ready to be sent.
pub struct MediaChunk {
    pub offset: u64,
    pub len: u64,
    pub total: u64,
    pub body: Box<dyn Read + Send>,
}

impl MediaFile {
    pub fn open(path: &Path, content_type: &str, chunk_size: ChunkSize) -> Result<Self> {
        let file = File::open(path).map_err(|e| media_error(path, e))?;
        let len = file.metadata().map_err(|e| media_error(path, e))?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            len,
            content_type: content_type.to_string(),
            chunk_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The chunk starting at `offset`.
    pub fn chunk_at(&self, offset: u64) -> Result<MediaChunk> {
        let remaining = self.len.saturating_sub(offset);
        let len = match self.chunk_size {
            ChunkSize::Auto => remaining,
            ChunkSize::Bytes(n) => n.min(remaining),
        };

        let mut handle = self.file.try_clone().map_err(|e| media_error(&self.path, e))?;
        handle
            .seek(SeekFrom::Start(offset))
            .map_err(|e| media_error(&self.path, e))?;

        Ok(MediaChunk {
            offset,
            len,
            total: self.len,
            body: Box::new(handle.take(len)),
        })
    }
}

impl MediaChunk {
    /// Value for the `Content-Range` header of this chunk's `PUT`.
    pub fn content_range(&self) -> String {
        if self.len == 0 {
            format!("bytes */{}", self.total)
        } else {
            format!(
                "bytes {}-{}/{}",
                self.offset,
                self.offset + self.len - 1,
                self.total
            )
        }
    }

    pub fn is_last(&self) -> bool {
        self.offset + self.len >= self.total
    }
}

fn media_error(path: &Path, source: io::Error) -> Error {
    if source.kind() == io::ErrorKind::NotFound {
        Error::MediaNotFound {
            path: path.to_path_buf(),
        }
    } else {
        Error::MediaRead {
            path: path.to_path_buf(),
            source,
        }
    }
}
