//! Error type shared by the page builder and its collaborators.

use std::io;
use std::path::PathBuf;

/// Failure while turning one archived video into HTML.
///
/// The metadata family is recovered per video (logged, then the batch moves
/// on). Listing, template and write failures abort the batch because the
/// output of every later video would hit the same problem.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("reading metadata {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parsing metadata {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid upload date {0:?}, expected YYYYMMDD")]
    InvalidUploadDate(String),

    #[error("video {0} has neither channel_id nor uploader_id")]
    MissingUploaderId(String),

    #[error("reading comments {path}: {message}")]
    Comments { path: PathBuf, message: String },

    #[error("listing directory {path}: {source}")]
    DirectoryListing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("template {template}: {message}")]
    Template { template: String, message: String },

    #[error("writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProcessingError {
    /// Returns true when the batch may skip the offending video and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MetadataRead { .. }
                | Self::MetadataParse { .. }
                | Self::InvalidUploadDate(_)
                | Self::MissingUploaderId(_)
                | Self::Comments { .. }
        )
    }
}
