use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::credential::Credential;
use crate::error::{Error, Result};

/// On-disk home of a [`Credential`] between runs.
///
/// Access is not locked; two processes sharing a path can race.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credential, or `None` if the file does not exist.
    pub fn load(&self) -> Result<Option<Credential>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::UnreadableTokenStore {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let credential =
            serde_json::from_slice(&bytes).map_err(|source| Error::MalformedTokenStore {
                path: self.path.clone(),
                source,
            })?;
        debug!("loaded credential from {}", self.path.display());
        Ok(Some(credential))
    }

    /// Like [`load`](Self::load) but a missing file is an error.
    pub fn load_required(&self) -> Result<Credential> {
        self.load()?.ok_or_else(|| Error::MissingTokenStore {
            path: self.path.clone(),
        })
    }

    /// Overwrite the store with `credential`. On Unix the file is owner-only.
    pub fn save(&self, credential: &Credential) -> Result<()> {
        let write_err = |source| Error::TokenStoreWrite {
            path: self.path.clone(),
            source,
        };

        let mut json = serde_json::to_vec_pretty(credential)
            .map_err(|e| write_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        json.push(b'\n');

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path).map_err(write_err)?;
        // `mode` only applies on creation; tighten files that already existed
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(write_err)?;
        }
        file.write_all(&json).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;

        debug!("wrote credential to {}", self.path.display());
        Ok(())
    }
}
