//! Typed view of the yt-dlp `.info.json` sidecar that sits next to every
//! archived video.
//!
//! Only the handful of fields the page builder renders are modelled. Unknown
//! keys are ignored so newer yt-dlp releases keep loading; the fields without
//! `#[serde(default)]` are required and a sidecar missing any of them fails
//! to parse, which the builder treats as "skip this video".

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use crate::error::ProcessingError;

/// Suffix yt-dlp appends to the sidecar; stripping it yields the base stem.
pub const METADATA_SUFFIX: &str = ".info.json";

/// Fields of the sidecar used to render a video page.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub uploader: String,
    /// yt-dlp writes `null` when the count is hidden; the key itself must
    /// still be present.
    #[serde(deserialize_with = "nullable")]
    pub view_count: Option<u64>,
    /// `YYYYMMDD`, as yt-dlp writes it.
    pub upload_date: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub uploader_id: Option<String>,
}

impl VideoInfo {
    /// Reads and parses a sidecar from disk.
    pub fn load(path: &Path) -> Result<Self, ProcessingError> {
        let file = File::open(path).map_err(|source| ProcessingError::MetadataRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            ProcessingError::MetadataParse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Identifier used for channel links: `channel_id`, else `uploader_id`.
    pub fn uploader_key(&self) -> Result<&str, ProcessingError> {
        self.channel_id
            .as_deref()
            .or(self.uploader_id.as_deref())
            .ok_or_else(|| ProcessingError::MissingUploaderId(self.id.clone()))
    }

    pub fn display_date(&self) -> Result<String, ProcessingError> {
        format_upload_date(&self.upload_date)
    }
}

// A `deserialize_with` field has no implicit default, so a missing key still
// fails while an explicit `null` becomes `None`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

/// Turns yt-dlp's `20230405` into `2023-04-05`.
pub fn format_upload_date(value: &str) -> Result<String, ProcessingError> {
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .map_err(|_| ProcessingError::InvalidUploadDate(value.to_owned()))
}

/// Strips [`METADATA_SUFFIX`] from a sidecar filename. Names without the
/// suffix are returned unchanged.
pub fn base_stem(file: &str) -> &str {
    file.strip_suffix(METADATA_SUFFIX).unwrap_or(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
        "id": "dQw4w9WgXcQ",
        "title": "Sample <Title>",
        "description": "line one\nline two",
        "uploader": "Uploader",
        "view_count": 42,
        "upload_date": "20230405",
        "channel_id": "UC123",
        "formats": [{"format_id": "18"}]
    }"#;

    #[test]
    fn load_reads_required_fields() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("clip.info.json");
        fs::write(&path, SAMPLE)?;
        let info = VideoInfo::load(&path)?;
        assert_eq!(info.id, "dQw4w9WgXcQ");
        assert_eq!(info.view_count, Some(42));
        assert_eq!(info.uploader_key()?, "UC123");
        Ok(())
    }

    #[test]
    fn load_rejects_missing_required_key() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("clip.info.json");
        fs::write(&path, r#"{"id": "x", "title": "t"}"#)?;
        let err = VideoInfo::load(&path).unwrap_err();
        assert!(matches!(err, ProcessingError::MetadataParse { .. }));
        assert!(err.is_recoverable());
        Ok(())
    }

    #[test]
    fn null_view_count_is_accepted_but_missing_key_is_not() -> anyhow::Result<()> {
        let hidden: VideoInfo = serde_json::from_str(&SAMPLE.replace("42", "null"))?;
        assert_eq!(hidden.view_count, None);

        let without_key = SAMPLE.replace(r#""view_count": 42,"#, "");
        assert!(serde_json::from_str::<VideoInfo>(&without_key).is_err());
        Ok(())
    }

    #[test]
    fn load_reports_missing_file() {
        let err = VideoInfo::load(Path::new("/nonexistent/clip.info.json")).unwrap_err();
        assert!(matches!(err, ProcessingError::MetadataRead { .. }));
    }

    #[test]
    fn uploader_key_falls_back_to_uploader_id() -> anyhow::Result<()> {
        let mut info: VideoInfo = serde_json::from_str(SAMPLE)?;
        info.channel_id = None;
        info.uploader_id = Some("@handle".into());
        assert_eq!(info.uploader_key()?, "@handle");
        info.uploader_id = None;
        assert!(info.uploader_key().is_err());
        Ok(())
    }

    #[test]
    fn format_upload_date_inserts_dashes() {
        assert_eq!(format_upload_date("20230405").unwrap(), "2023-04-05");
        assert!(format_upload_date("2023-04").is_err());
        assert!(format_upload_date("20231340").is_err());
    }

    #[test]
    fn base_stem_strips_suffix() {
        assert_eq!(base_stem("clip [abc].info.json"), "clip [abc]");
        assert_eq!(base_stem("clip.json"), "clip.json");
    }
}
