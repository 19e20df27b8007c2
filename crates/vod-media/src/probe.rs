//! FFprobe duration probe.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe a video file for its duration.
pub async fn probe_duration(path: impl AsRef<Path>) -> MediaResult<Duration> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("probe {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    duration_from_probe(&output.stdout)
}

/// Parse the duration out of raw ffprobe JSON.
fn duration_from_probe(stdout: &[u8]) -> MediaResult<Duration> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let raw = probe
        .format
        .duration
        .ok_or_else(|| MediaError::InvalidDuration("missing format.duration".to_string()))?;

    let seconds: f64 = raw
        .parse()
        .map_err(|_| MediaError::InvalidDuration(raw.clone()))?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(MediaError::InvalidDuration(raw));
    }

    Ok(Duration::from_secs_f64(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_from_probe_output() {
        let json = br#"{"format": {"duration": "120.5", "size": "1024"}}"#;
        assert_eq!(
            duration_from_probe(json).unwrap(),
            Duration::from_secs_f64(120.5)
        );
    }

    #[test]
    fn rejects_missing_duration() {
        let json = br#"{"format": {}}"#;
        assert!(matches!(
            duration_from_probe(json),
            Err(MediaError::InvalidDuration(_))
        ));
    }

    #[test]
    fn rejects_negative_duration() {
        let json = br#"{"format": {"duration": "-3.0"}}"#;
        assert!(matches!(
            duration_from_probe(json),
            Err(MediaError::InvalidDuration(_))
        ));
    }

    #[test]
    fn rejects_unparseable_duration() {
        let json = br#"{"format": {"duration": "abc"}}"#;
        assert!(matches!(
            duration_from_probe(json),
            Err(MediaError::InvalidDuration(_))
        ));
    }
}
