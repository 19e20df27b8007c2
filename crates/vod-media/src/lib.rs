//! Media toolchain integration.
//!
//! This crate wraps the external FFmpeg toolchain behind the [`Transcoder`]
//! port: probe a source with ffprobe, produce adaptive-bitrate DASH output
//! in a scratch directory, and hand the scratch area back to the caller as
//! an owned guard so it disappears when the caller is done promoting files.

pub mod error;
pub mod probe;
pub mod transcoder;

pub use error::{MediaError, MediaResult};
pub use transcoder::{FfmpegTranscoder, TranscodeOutput, Transcoder};
