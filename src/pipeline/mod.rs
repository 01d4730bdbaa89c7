//! The two user-facing flows: provisioning a credential and uploading a video.
//!
//! Each runs once per process. They share nothing but the token store path.

pub mod hook;
pub mod provision;
pub mod upload;

pub use hook::{NoopProgress, ProgressHook};
pub use provision::{ensure_credential, Provisioned};
pub use upload::upload_video;
