//! FFmpeg DASH transcoder.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;
use walkdir::WalkDir;

use vod_models::ResourceId;

use crate::error::{MediaError, MediaResult};
use crate::probe::probe_duration;

/// Result of one transcode invocation.
///
/// The scratch directory holding the output is owned by this value: once it
/// is dropped, the scratch tree is removed. Callers promote the listed
/// files into durable storage before letting the output go out of scope.
#[derive(Debug)]
pub struct TranscodeOutput {
    /// Source duration probed from the input.
    pub duration: Duration,
    /// Absolute path of the generated manifest, inside the scratch area.
    pub manifest_path: PathBuf,
    /// Every produced file (manifest included), relative to the manifest's
    /// directory.
    pub output_files: Vec<String>,
    scratch: TempDir,
}

impl TranscodeOutput {
    pub fn new(
        duration: Duration,
        manifest_path: PathBuf,
        output_files: Vec<String>,
        scratch: TempDir,
    ) -> Self {
        Self {
            duration,
            manifest_path,
            output_files,
            scratch,
        }
    }

    /// Root of the scratch area.
    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }
}

/// Converts a stored source asset into streamable output.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Transcode `{base}/{resource_id}/{source_filename}` into an
    /// adaptive-bitrate rendition set in a fresh scratch directory.
    async fn transcode(
        &self,
        resource_id: &ResourceId,
        source_filename: &str,
    ) -> MediaResult<TranscodeOutput>;
}

/// [`Transcoder`] backed by the ffmpeg/ffprobe binaries, producing a DASH
/// manifest with two fixed renditions (480p and 720p).
pub struct FfmpegTranscoder {
    base_path: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        resource_id: &ResourceId,
        source_filename: &str,
    ) -> MediaResult<TranscodeOutput> {
        let source_path = self
            .base_path
            .join(resource_id.as_str())
            .join(source_filename);

        if !source_path.exists() {
            return Err(MediaError::FileNotFound(source_path));
        }

        let duration = probe_duration(&source_path).await?;

        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let scratch = tempfile::Builder::new().prefix("transcode-").tempdir()?;
        let manifest_path = scratch.path().join("manifest.mpd");

        debug!(
            resource_id = %resource_id,
            scratch = %scratch.path().display(),
            "starting dash transcode"
        );

        let output = Command::new("ffmpeg")
            .arg("-i")
            .arg(&source_path)
            .args(dash_args())
            .arg(&manifest_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::FfmpegFailed {
                message: format!("transcode {}", source_path.display()),
                stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
                exit_code: output.status.code(),
            });
        }

        let output_files = relative_output_files(scratch.path())?;

        Ok(TranscodeOutput::new(
            duration,
            manifest_path,
            output_files,
            scratch,
        ))
    }
}

/// Fixed two-rendition DASH ladder: 854x480 and 1280x720, AAC stereo audio.
fn dash_args() -> Vec<&'static str> {
    vec![
        "-c:a", "aac", "-ac", "2",
        "-map", "0:v:0", "-map", "0:v:0", "-map", "0:a:0",
        "-c:v:0", "libx264", "-crf:v:0", "23", "-preset:v:0", "medium",
        "-maxrate:v:0", "1500k", "-bufsize:v:0", "3000k", "-s:v:0", "854x480",
        "-c:v:1", "libx264", "-crf:v:1", "22", "-preset:v:1", "medium",
        "-maxrate:v:1", "3000k", "-bufsize:v:1", "6000k", "-s:v:1", "1280x720",
        "-adaptation_sets", "id=0,streams=v id=1,streams=a",
        "-f", "dash",
    ]
}

/// Enumerate every file under `root`, as slash-separated paths relative to
/// `root`, in a stable order.
fn relative_output_files(root: &Path) -> MediaResult<Vec<String>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(root)
            .expect("walked entry is under its root");
        files.push(rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"));
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_output_files_lists_nested_files_in_stable_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("manifest.mpd"), b"mpd").unwrap();
        std::fs::create_dir(dir.path().join("chunks")).unwrap();
        std::fs::write(dir.path().join("chunks/seg2.m4s"), b"2").unwrap();
        std::fs::write(dir.path().join("chunks/seg1.m4s"), b"1").unwrap();

        let files = relative_output_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec!["chunks/seg1.m4s", "chunks/seg2.m4s", "manifest.mpd"]
        );
    }

    #[test]
    fn dropping_the_output_removes_the_scratch_tree() {
        let scratch = tempfile::Builder::new()
            .prefix("transcode-")
            .tempdir()
            .unwrap();
        let scratch_path = scratch.path().to_path_buf();
        std::fs::write(scratch_path.join("manifest.mpd"), b"mpd").unwrap();

        let output = TranscodeOutput::new(
            Duration::from_secs(1),
            scratch_path.join("manifest.mpd"),
            vec!["manifest.mpd".to_string()],
            scratch,
        );
        assert!(scratch_path.exists());

        drop(output);
        assert!(!scratch_path.exists());
    }

    #[test]
    fn dash_args_describe_both_renditions() {
        let args = dash_args();
        assert!(args.contains(&"854x480"));
        assert!(args.contains(&"1280x720"));
        assert!(args.contains(&"dash"));
    }
}
