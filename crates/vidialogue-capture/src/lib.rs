//! Producers that feed a conversation: periodic camera/video frames and user turns.

pub mod dialogue;
pub mod frames;

use std::{
    io,
    process::{Command, Stdio},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VDCaptureError {
    #[error("missing dependency: {0}")]
    MissingDependency(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),
    #[error("invalid dialogue script: {0}")]
    Script(String),
}

pub fn ensure_ffmpeg_installed() -> Result<(), VDCaptureError> {
    match Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if status.success() => Ok(()),
        _ => Err(VDCaptureError::MissingDependency(
            "ffmpeg is not installed or not found in PATH".to_string(),
        )),
    }
}
