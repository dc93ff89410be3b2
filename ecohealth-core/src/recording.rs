//! Voice clips and the recorder handle that produces them.

use async_trait::async_trait;
use reqwest::multipart::Part;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{PortalError, PortalResult};

pub const DEFAULT_CLIP_NAME: &str = "voice_message.webm";
pub const DEFAULT_CLIP_MIME: &str = "audio/webm";

#[derive(Clone, PartialEq, Eq)]
pub struct VoiceClip {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl VoiceClip {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// A clip as the browser recorder produced it.
    pub fn webm(bytes: Vec<u8>) -> Self {
        Self::new(DEFAULT_CLIP_NAME, DEFAULT_CLIP_MIME, bytes)
    }

    pub async fn from_path(path: impl AsRef<Path>) -> PortalResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PortalError::Recording(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_CLIP_NAME.to_string());
        Ok(Self::new(file_name, mime_for_path(path), bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_part(self) -> PortalResult<Part> {
        Ok(Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.mime_type)?)
    }
}

impl fmt::Debug for VoiceClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceClip")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "webm" => "audio/webm",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" | "oga" => "audio/ogg",
        "m4a" | "mp4" => "audio/mp4",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// Formats an elapsed recording time as `m:ss`.
fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Paired acquire/release of an audio source.
///
/// `start` acquires, and exactly one of `stop` or `cancel` releases.
#[async_trait]
pub trait Recorder: Send {
    fn is_recording(&self) -> bool;

    fn elapsed(&self) -> Duration;

    async fn start(&mut self) -> PortalResult<()>;

    async fn stop(&mut self) -> PortalResult<VoiceClip>;

    async fn cancel(&mut self) -> PortalResult<()>;
}

/// Recorder backed by an existing audio file, used by the terminal front end.
#[derive(Debug)]
pub struct FileRecorder {
    source: PathBuf,
    started_at: Option<Instant>,
}

impl FileRecorder {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            started_at: None,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

#[async_trait]
impl Recorder for FileRecorder {
    fn is_recording(&self) -> bool {
        self.started_at.is_some()
    }

    fn elapsed(&self) -> Duration {
        self.started_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    async fn start(&mut self) -> PortalResult<()> {
        if self.started_at.is_some() {
            return Err(PortalError::Recording("Already recording".to_string()));
        }
        if !tokio::fs::try_exists(&self.source).await.unwrap_or(false) {
            return Err(PortalError::Recording(format!(
                "Audio source {} does not exist",
                self.source.display()
            )));
        }
        self.started_at = Some(Instant::now());
        debug!(source = %self.source.display(), "Recording started");
        Ok(())
    }

    async fn stop(&mut self) -> PortalResult<VoiceClip> {
        let started = self
            .started_at
            .take()
            .ok_or_else(|| PortalError::Recording("Not recording".to_string()))?;
        let clip = VoiceClip::from_path(&self.source).await?;
        debug!(
            duration = %format_duration(started.elapsed()),
            bytes = clip.len(),
            "Recording stopped"
        );
        Ok(clip)
    }

    async fn cancel(&mut self) -> PortalResult<()> {
        if self.started_at.take().is_some() {
            debug!(source = %self.source.display(), "Recording cancelled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00");
        assert_eq!(format_duration(Duration::from_secs(9)), "0:09");
        assert_eq!(format_duration(Duration::from_secs(75)), "1:15");
        assert_eq!(format_duration(Duration::from_secs(600)), "10:00");
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a.webm")), "audio/webm");
        assert_eq!(mime_for_path(Path::new("a.MP3")), "audio/mpeg");
        assert_eq!(mime_for_path(Path::new("a")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_file_recorder_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.wav");
        std::fs::write(&path, b"RIFFdata").unwrap();

        let mut recorder = FileRecorder::new(&path);
        assert!(recorder.stop().await.is_err());

        recorder.start().await.unwrap();
        assert!(recorder.is_recording());
        assert!(recorder.start().await.is_err());

        let clip = recorder.stop().await.unwrap();
        assert!(!recorder.is_recording());
        assert_eq!(clip.file_name, "note.wav");
        assert_eq!(clip.mime_type, "audio/wav");
        assert_eq!(clip.bytes, b"RIFFdata".to_vec());
    }

    #[tokio::test]
    async fn test_cancel_releases_without_clip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.webm");
        std::fs::write(&path, b"x").unwrap();

        let mut recorder = FileRecorder::new(&path);
        recorder.start().await.unwrap();
        recorder.cancel().await.unwrap();
        assert!(!recorder.is_recording());
        assert!(recorder.stop().await.is_err());
    }

    #[tokio::test]
    async fn test_missing_source_fails_to_start() {
        let mut recorder = FileRecorder::new("/nonexistent/clip.webm");
        assert!(matches!(recorder.start().await, Err(PortalError::Recording(_))));
        assert!(!recorder.is_recording());
    }
}
