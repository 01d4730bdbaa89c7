use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config;

/// Who can see an uploaded video.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    #[default]
    Public,
    Private,
    Unlisted,
}

impl PrivacyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PrivacyStatus::Public => "public",
            PrivacyStatus::Private => "private",
            PrivacyStatus::Unlisted => "unlisted",
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to upload one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file: PathBuf,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy: PrivacyStatus,
    pub made_for_kids: bool,
}

impl UploadRequest {
    /// A request with an empty description, no tags, the default category,
    /// public visibility, and not made for kids.
    pub fn new(file: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            title: title.into(),
            description: String::new(),
            tags: Vec::new(),
            category_id: config::DEFAULT_CATEGORY_ID.to_string(),
            privacy: PrivacyStatus::default(),
            made_for_kids: false,
        }
    }
}

/// Split a comma-separated tag list. Tags are trimmed and blanks dropped, so
/// `""` yields no tags at all.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// The `video` resource sent as upload metadata.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#resource>
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Video {
    pub snippet: VideoSnippet,
    pub status: VideoStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    pub privacy_status: PrivacyStatus,
    pub made_for_kids: bool,
    /// Older clients read this key instead of `madeForKids`; both carry the same value.
    pub self_declared_made_for_kids: bool,
}

impl From<&UploadRequest> for Video {
    fn from(request: &UploadRequest) -> Self {
        Self {
            snippet: VideoSnippet {
                title: request.title.clone(),
                description: request.description.clone(),
                tags: request.tags.clone(),
                category_id: request.category_id.clone(),
            },
            status: VideoStatus {
                privacy_status: request.privacy,
                made_for_kids: request.made_for_kids,
                self_declared_made_for_kids: request.made_for_kids,
            },
        }
    }
}

/// The part of the final upload response we care about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedVideo {
    /// The ID that YouTube uses to uniquely identify the video.
    pub id: String,
}
