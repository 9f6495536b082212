//! Shared lecture files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthorSummary, Table, tables};

/// Largest accepted upload (50 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Coarse file category shown in the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Document,
    Image,
    Video,
    Audio,
    #[default]
    Other,
}

impl FileType {
    pub const ALL: [FileType; 5] = [
        FileType::Document,
        FileType::Image,
        FileType::Video,
        FileType::Audio,
        FileType::Other,
    ];

    /// Classify a MIME type.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();
        if mime.starts_with("image/") {
            FileType::Image
        } else if mime.starts_with("video/") {
            FileType::Video
        } else if mime.starts_with("audio/") {
            FileType::Audio
        } else if mime.contains("pdf") || mime.contains("document") || mime.contains("presentation") {
            FileType::Document
        } else {
            FileType::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileType::Document => "document",
            FileType::Image => "image",
            FileType::Video => "video",
            FileType::Audio => "audio",
            FileType::Other => "other",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            FileType::Document => "📄",
            FileType::Image => "🖼",
            FileType::Video => "🎬",
            FileType::Audio => "🎵",
            FileType::Other => "📎",
        }
    }
}

/// Best-effort MIME type from a file extension.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "txt" | "md" => "text/plain",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        _ => "application/octet-stream",
    }
}

/// Metadata row for an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub file_name: String,
    pub file_path: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_type: FileType,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub download_count: i64,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub uploader: Option<AuthorSummary>,
}

impl Table for FileRecord {
    const NAME: &'static str = tables::FILES;
}

impl FileRecord {
    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or_default()
    }
}

/// Insert payload for a file row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFileRecord {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub file_type: FileType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub user_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_mime() {
        assert_eq!(FileType::from_mime("image/png"), FileType::Image);
        assert_eq!(FileType::from_mime("video/mp4"), FileType::Video);
        assert_eq!(FileType::from_mime("audio/mpeg"), FileType::Audio);
        assert_eq!(FileType::from_mime("application/pdf"), FileType::Document);
        assert_eq!(
            FileType::from_mime(mime_for_extension("pptx")),
            FileType::Document
        );
        assert_eq!(FileType::from_mime(mime_for_extension("docx")), FileType::Document);
        assert_eq!(FileType::from_mime("text/plain"), FileType::Other);
        assert_eq!(FileType::from_mime("application/zip"), FileType::Other);
    }

    #[test]
    fn test_file_type_serializes_lowercase() {
        let json = serde_json::to_string(&FileType::Document).unwrap();
        assert_eq!(json, "\"document\"");
    }
}
