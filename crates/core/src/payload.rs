use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::StorageError;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub enum PayloadSource {
    Buffer(Bytes),
    /// Bytes still on local disk, e.g. a spooled multipart upload.
    Path(PathBuf),
}

/// A file to upload: its original name, MIME type and where the bytes are.
#[derive(Debug, Clone)]
pub struct Payload {
    pub file_name: String,
    pub content_type: String,
    pub source: PayloadSource,
}

impl Payload {
    pub fn from_bytes(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            source: PayloadSource::Buffer(data.into()),
        }
    }

    /// Upload a local file under its own name.
    pub fn from_path(path: impl AsRef<Path>, content_type: Option<&str>) -> Self {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = content_type
            .map(str::to_string)
            .unwrap_or_else(|| guess_content_type(&file_name).to_string());
        Self {
            file_name,
            content_type,
            source: PayloadSource::Path(path.to_path_buf()),
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match &self.source {
            PayloadSource::Path(path) => Some(path),
            PayloadSource::Buffer(_) => None,
        }
    }

    pub(crate) async fn read(&self) -> Result<Bytes, StorageError> {
        match &self.source {
            PayloadSource::Buffer(data) => Ok(data.clone()),
            PayloadSource::Path(path) => match tokio::fs::read(path).await {
                Ok(data) => Ok(Bytes::from(data)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                    StorageError::InvalidInput(format!("file not found: {}", path.display())),
                ),
                Err(e) => Err(StorageError::InvalidInput(format!(
                    "failed to read {}: {e}",
                    path.display()
                ))),
            },
        }
    }
}

/// Content type by extension for the formats clinics upload.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" | "oga" => "audio/ogg",
        "m4a" => "audio/mp4",
        "webm" => "audio/webm",
        "flac" => "audio/flac",
        "json" => "application/json",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_from_extension() {
        assert_eq!(guess_content_type("rec.WAV"), "audio/wav");
        assert_eq!(guess_content_type("diabetes.ogg"), "audio/ogg");
        assert_eq!(guess_content_type("noext"), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn path_payload_takes_file_name() {
        let payload = Payload::from_path("/tmp/uploads/rec.mp3", None);
        assert_eq!(payload.file_name, "rec.mp3");
        assert_eq!(payload.content_type, "audio/mpeg");
        assert!(payload.local_path().is_some());
    }

    #[tokio::test]
    async fn missing_file_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let payload = Payload::from_path(dir.path().join("gone.wav"), None);
        let err = payload.read().await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec.wav");
        std::fs::write(&path, b"RIFF").unwrap();
        let payload = Payload::from_path(&path, Some("audio/x-wav"));
        assert_eq!(payload.content_type, "audio/x-wav");
        assert_eq!(payload.read().await.unwrap(), Bytes::from_static(b"RIFF"));
    }
}
