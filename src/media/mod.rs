mod ffmpeg;
mod process;
mod ytdlp;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::recording::{MergePair, RecordingIndex};
use crate::session::SessionCookies;

pub(crate) use ffmpeg::FfmpegMerger;
pub(crate) use ytdlp::YtDlpFetcher;

/// One download attempt for a recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DownloadTask {
    pub(crate) index: RecordingIndex,
    pub(crate) url: String,
    pub(crate) referer: Option<String>,
    pub(crate) output_dir: PathBuf,
    pub(crate) force: bool,
}

#[derive(Debug, Error)]
pub(crate) enum FetchError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {status}")]
    Exit { program: String, status: String },
    #[error("download interrupted by user")]
    Interrupted,
}

#[derive(Debug, Error)]
pub(crate) enum MergeError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} failed: {detail}")]
    Exit { program: String, detail: String },
    #[error("merge produced no output at {}", .0.display())]
    MissingOutput(PathBuf),
    #[error("merge produced an invalid file ({bytes} bytes)")]
    OutputTooSmall { bytes: u64 },
}

/// Retrieves the raw stream files of one recording into its output directory.
pub(crate) trait MediaFetcher {
    fn fetch(&self, task: &DownloadTask, cookies: &SessionCookies) -> Result<(), FetchError>;
}

/// Combines a video-only and an audio-only stream into `dest`.
pub(crate) trait MediaMerger {
    fn merge(&self, pair: &MergePair, dest: &Path) -> Result<(), MergeError>;
}

pub(crate) fn resolve_tool_bin(env_value: Option<OsString>, default: &str) -> PathBuf {
    match env_value {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(default),
    }
}
