//! Lecture file library: uploads, listing, downloads.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use dioxus::prelude::*;
use serde_json::json;
use studyhub_core::model::{FileRecord, FileType, MAX_UPLOAD_BYTES, NewFileRecord, mime_for_extension, tables};
use studyhub_core::query::{Direction, Filter, Query};
use studyhub_core::{Backend, Database, Result as CoreResult};
use uuid::Uuid;

use super::{HookError, HookResult, non_blank, profiles_by_id, required};
use crate::bridge;
use crate::state::{AppContext, use_app};

/// Folder inside the bucket that uploads land in.
const UPLOAD_FOLDER: &str = "lecture-files";

/// Form input for an upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadDraft {
    pub title: String,
    pub description: Option<String>,
    pub course: Option<String>,
    pub tags: Vec<String>,
}

/// Storage path for a new object: `lecture-files/{unix_millis}.{ext}`.
pub fn object_path(file_name: &str, unix_millis: i64) -> String {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .unwrap_or("bin");
    format!("{UPLOAD_FOLDER}/{unix_millis}.{ext}")
}

/// Files matching `query` in title, description, course or tags, narrowed to `kind`.
pub fn filter_files(files: &[FileRecord], query: &str, kind: Option<FileType>) -> Vec<FileRecord> {
    let needle = query.trim().to_lowercase();
    files
        .iter()
        .filter(|f| kind.is_none_or(|k| f.file_type == k))
        .filter(|f| {
            needle.is_empty()
                || f.title.to_lowercase().contains(&needle)
                || f.description.as_deref().is_some_and(|d| d.to_lowercase().contains(&needle))
                || f.course.as_deref().is_some_and(|c| c.to_lowercase().contains(&needle))
                || f.tags().iter().any(|t| t.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

/// First free path for `file_name` inside `dir`.
fn available_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let path = Path::new(file_name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("download");
    let ext = path.extension().and_then(|e| e.to_str());
    (1..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{stem} ({n}).{ext}")),
            None => dir.join(format!("{stem} ({n})")),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

#[derive(Debug, Clone)]
pub struct FileService {
    db: Database,
    bucket: String,
}

impl FileService {
    pub fn new(db: Database, bucket: impl Into<String>) -> Self {
        Self {
            db,
            bucket: bucket.into(),
        }
    }

    /// All files, newest first, with uploaders.
    pub async fn fetch_files(&self) -> HookResult<Vec<FileRecord>> {
        let mut files: Vec<FileRecord> = self
            .db
            .fetch(Query::table(tables::FILES).order("created_at", Direction::Descending))
            .await?;
        let uploaders = profiles_by_id(&self.db, files.iter().map(|f| f.user_id)).await?;
        for f in &mut files {
            f.uploader = uploaders.get(&f.user_id).map(|p| p.summary());
        }
        Ok(files)
    }

    /// Read a local file and upload it.
    pub async fn upload_file(&self, draft: UploadDraft, path: &Path) -> HookResult<FileRecord> {
        let read_error = |source| HookError::FileRead {
            path: path.to_path_buf(),
            source,
        };
        let size = tokio::fs::metadata(path).await.map_err(read_error)?.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(HookError::FileTooLarge { size });
        }
        let data = tokio::fs::read(path).await.map_err(read_error)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        self.upload_bytes(draft, &file_name, Bytes::from(data)).await
    }

    /// Store `data` and record it in the `files` table.
    pub async fn upload_bytes(&self, draft: UploadDraft, file_name: &str, data: Bytes) -> HookResult<FileRecord> {
        let user = self.db.require_user()?;
        let title = required(&draft.title, "Title")?;
        let size = data.len() as u64;
        if size > MAX_UPLOAD_BYTES {
            return Err(HookError::FileTooLarge { size });
        }

        let path = object_path(file_name, Utc::now().timestamp_millis());
        let ext = Path::new(file_name).extension().and_then(|e| e.to_str()).unwrap_or("");
        let mime = mime_for_extension(ext);
        self.db.backend().upload(&self.bucket, &path, data, mime).await?;

        let tags: Vec<String> = draft.tags.into_iter().filter(|t| !t.trim().is_empty()).collect();
        let row = NewFileRecord {
            title,
            description: non_blank(draft.description),
            file_name: file_name.to_string(),
            file_path: path,
            file_size: size,
            file_type: FileType::from_mime(mime),
            course: non_blank(draft.course),
            tags: (!tags.is_empty()).then_some(tags),
            user_id: user.id,
        };
        let record: FileRecord = self.db.insert(&row).await?;
        tracing::info!(file = %record.id, path = %record.file_path, size, "File uploaded");
        Ok(record)
    }

    async fn try_increment(&self, file_id: Uuid) -> CoreResult<i64> {
        let file: FileRecord = self.db.get(file_id).await?;
        let count = file.download_count + 1;
        self.db
            .update::<FileRecord, _>(
                vec![Filter::eq("id", file_id.to_string())],
                &json!({ "download_count": count }),
            )
            .await?;
        Ok(count)
    }

    /// Bump the download counter. Errors are logged, never surfaced.
    pub async fn increment_download_count(&self, file_id: Uuid) {
        if let Err(e) = self.try_increment(file_id).await {
            tracing::error!(file = %file_id, error = %e, "Error incrementing download count");
        }
    }

    /// Fetch a file's contents and count the download.
    pub async fn download(&self, file: &FileRecord) -> HookResult<Bytes> {
        let data = self.db.backend().download(&self.bucket, &file.file_path).await?;
        self.increment_download_count(file.id).await;
        Ok(data)
    }

    /// Download into `dir`, returning where the file was written.
    pub async fn download_to(&self, file: &FileRecord, dir: &Path) -> HookResult<PathBuf> {
        let data = self.download(file).await?;
        let write_error = |source| HookError::FileWrite {
            path: dir.to_path_buf(),
            source,
        };
        tokio::fs::create_dir_all(dir).await.map_err(write_error)?;
        let target = available_path(dir, &file.file_name);
        tokio::fs::write(&target, &data).await.map_err(write_error)?;
        Ok(target)
    }
}

/// File library mirrored into signals.
#[derive(Clone, Copy, PartialEq)]
pub struct UseFiles {
    app: AppContext,
    pub files: Signal<Vec<FileRecord>>,
    pub loading: Signal<bool>,
    pub uploading: Signal<bool>,
}

pub fn use_files() -> UseFiles {
    let app = use_app();
    let files = use_signal(Vec::new);
    let loading = use_signal(|| true);
    let uploading = use_signal(|| false);
    let hook = UseFiles {
        app,
        files,
        loading,
        uploading,
    };
    use_effect(move || hook.refresh());
    hook
}

impl UseFiles {
    fn service(&self) -> FileService {
        let handle = self.app.handle.read().clone();
        FileService::new(handle.db.clone(), handle.bucket())
    }

    pub fn refresh(&self) {
        let hook = *self;
        spawn(async move { hook.reload().await });
    }

    async fn reload(&self) {
        let (mut files, mut loading) = (self.files, self.loading);
        loading.set(true);
        match self.service().fetch_files().await {
            Ok(list) => files.set(list),
            Err(e) => {
                tracing::error!(error = %e, "Error fetching files");
                self.app.toaster.error("Failed to load files", &e);
            }
        }
        loading.set(false);
    }

    /// Upload a local file; `true` on success.
    pub async fn upload(&self, draft: UploadDraft, path: PathBuf) -> bool {
        let mut uploading = self.uploading;
        uploading.set(true);
        let result = self.service().upload_file(draft, &path).await;
        uploading.set(false);
        match result {
            Ok(_) => {
                self.app.toaster.success("File uploaded successfully");
                self.reload().await;
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Error uploading file");
                self.app.toaster.error("Upload failed", &e);
                false
            }
        }
    }

    /// Save a file to the downloads folder.
    pub async fn download(&self, file: FileRecord) {
        let dir = bridge::downloads_dir(&self.app.handle.read().data_dir);
        match self.service().download_to(&file, &dir).await {
            Ok(path) => {
                self.app
                    .toaster
                    .info("Download complete", path.display().to_string());
                let mut files = self.files;
                if let Some(f) = files.write().iter_mut().find(|f| f.id == file.id) {
                    f.download_count += 1;
                }
            }
            Err(e) => self.app.toaster.error("Download failed", &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::testing::signed_in;
    use studyhub_core::config::DEFAULT_BUCKET;

    fn draft(title: &str) -> UploadDraft {
        UploadDraft {
            title: title.to_string(),
            description: Some("   ".to_string()),
            course: Some("CS 301".to_string()),
            tags: vec!["notes".to_string()],
        }
    }

    #[test]
    fn test_object_path() {
        assert_eq!(object_path("Chapter 5.pdf", 1714560000000), "lecture-files/1714560000000.pdf");
        assert_eq!(object_path("Makefile", 7), "lecture-files/7.bin");
        assert_eq!(object_path("notes.", 8), "lecture-files/8.bin");
        assert_eq!(object_path("slides.final.PPTX", 9), "lecture-files/9.PPTX");
    }

    #[tokio::test]
    async fn test_upload_bytes_classifies_and_stores() {
        let (db, backend, me) = signed_in("Sarah Johnson").await;
        let service = FileService::new(db, DEFAULT_BUCKET);
        let record = service
            .upload_bytes(draft("Networks"), "slides.pptx", Bytes::from_static(b"PK.."))
            .await
            .unwrap();
        assert_eq!(record.file_type, FileType::Document);
        assert_eq!(record.file_size, Some(4));
        assert_eq!(record.user_id, me);
        assert!(record.description.is_none());
        assert!(record.file_path.starts_with("lecture-files/"));
        assert!(record.file_path.ends_with(".pptx"));
        assert!(backend.has_object(DEFAULT_BUCKET, &record.file_path));

        let files = service.fetch_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(
            files[0].uploader.as_ref().unwrap().full_name.as_deref(),
            Some("Sarah Johnson")
        );
    }

    #[tokio::test]
    async fn test_upload_requires_user() {
        let (db, backend, _) = signed_in("Sarah Johnson").await;
        backend.sign_out().await.unwrap();
        let err = FileService::new(db, DEFAULT_BUCKET)
            .upload_bytes(draft("x"), "a.pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap_err();
        assert!(err.is_not_authenticated());
    }

    #[tokio::test]
    async fn test_upload_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.PNG");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let (db, _backend, _) = signed_in("Sarah Johnson").await;
        let service = FileService::new(db, DEFAULT_BUCKET);
        let record = service.upload_file(draft("Whiteboard"), &path).await.unwrap();
        assert_eq!(record.file_type, FileType::Image);
        assert_eq!(record.file_name, "photo.PNG");

        let missing = service
            .upload_file(draft("Gone"), &dir.path().join("missing.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(missing, HookError::FileRead { .. }));
    }

    #[tokio::test]
    async fn test_download_counts_and_writes() {
        let (db, _backend, _) = signed_in("Sarah Johnson").await;
        let service = FileService::new(db, DEFAULT_BUCKET);
        let record = service
            .upload_bytes(draft("Notes"), "notes.pdf", Bytes::from_static(b"%PDF-1.7"))
            .await
            .unwrap();

        let out = tempfile::tempdir().unwrap();
        let first = service.download_to(&record, out.path()).await.unwrap();
        let second = service.download_to(&record, out.path()).await.unwrap();
        assert_eq!(first.file_name().unwrap(), "notes.pdf");
        assert_eq!(second.file_name().unwrap(), "notes (1).pdf");
        assert_eq!(std::fs::read(&first).unwrap(), b"%PDF-1.7");

        let files = service.fetch_files().await.unwrap();
        assert_eq!(files[0].download_count, 2);
    }

    #[tokio::test]
    async fn test_increment_unknown_file_is_silent() {
        let (db, _backend, _) = signed_in("Sarah Johnson").await;
        FileService::new(db, DEFAULT_BUCKET)
            .increment_download_count(Uuid::new_v4())
            .await;
    }

    #[tokio::test]
    async fn test_filter_files() {
        let (db, _backend, _) = signed_in("Sarah Johnson").await;
        let service = FileService::new(db, DEFAULT_BUCKET);
        service
            .upload_bytes(draft("Linear Algebra"), "la.pdf", Bytes::from_static(b"1"))
            .await
            .unwrap();
        service
            .upload_bytes(draft("Lab recording"), "lab.mp4", Bytes::from_static(b"2"))
            .await
            .unwrap();
        let files = service.fetch_files().await.unwrap();

        assert_eq!(filter_files(&files, "", None).len(), 2);
        assert_eq!(filter_files(&files, "algebra", None).len(), 1);
        assert_eq!(filter_files(&files, "cs 301", Some(FileType::Video)).len(), 1);
        assert_eq!(filter_files(&files, "NOTES", Some(FileType::Document)).len(), 1);
        assert!(filter_files(&files, "", Some(FileType::Audio)).is_empty());
    }
}
