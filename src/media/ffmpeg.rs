use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use super::{MediaMerger, MergeError};
use crate::recording::MergePair;

/// Anything smaller is a broken mux rather than a recorded session.
pub(crate) const MIN_MERGED_BYTES: u64 = 1_000_000;

const STDERR_DETAIL_CHARS: usize = 200;

pub(crate) struct FfmpegMerger {
    bin: PathBuf,
    min_output_bytes: u64,
}

impl FfmpegMerger {
    pub(crate) fn new(bin: PathBuf) -> Self {
        Self {
            bin,
            min_output_bytes: MIN_MERGED_BYTES,
        }
    }

    fn program(&self) -> String {
        self.bin.display().to_string()
    }

    /// First line of `ffmpeg -version`.
    pub(crate) fn probe(&self) -> Result<String, MergeError> {
        let output = Command::new(&self.bin)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .map_err(|source| MergeError::Launch {
                program: self.program(),
                source,
            })?;
        if !output.status.success() {
            return Err(MergeError::Exit {
                program: self.program(),
                detail: format!("exited with {}", output.status),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or("unknown").trim().to_string())
    }

    pub(crate) fn merge_args(pair: &MergePair, dest: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-hide_banner".into()];
        args.extend(["-loglevel", "error"].map(OsString::from));
        args.push("-i".into());
        args.push(pair.video.clone().into_os_string());
        args.push("-i".into());
        args.push(pair.audio.clone().into_os_string());
        args.extend(
            [
                "-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac", "-b:a", "192k",
                "-shortest", "-movflags", "+faststart", "-f", "mp4",
            ]
            .map(OsString::from),
        );
        args.push(dest.as_os_str().to_os_string());
        args
    }
}

impl MediaMerger for FfmpegMerger {
    fn merge(&self, pair: &MergePair, dest: &Path) -> Result<(), MergeError> {
        println!("  Merging video + audio...");
        println!("    Video: {}", file_name(&pair.video));
        println!("    Audio: {}", file_name(&pair.audio));

        let args = Self::merge_args(pair, dest);
        debug!(program = %self.program(), ?args, "running merger");
        let output = Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| MergeError::Launch {
                program: self.program(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            let detail = if detail.is_empty() {
                format!("exited with {}", output.status)
            } else {
                detail.chars().take(STDERR_DETAIL_CHARS).collect()
            };
            return Err(MergeError::Exit {
                program: self.program(),
                detail,
            });
        }

        let bytes = fs::metadata(dest)
            .map_err(|_| MergeError::MissingOutput(dest.to_path_buf()))?
            .len();
        if bytes <= self.min_output_bytes {
            return Err(MergeError::OutputTooSmall { bytes });
        }
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingIndex;

    fn pair() -> MergePair {
        MergePair {
            index: RecordingIndex::new(3).expect("positive index"),
            video: PathBuf::from("Recording_03.fhls-1422.mp4"),
            audio: PathBuf::from("Recording_03.fhls-audio-high-Original.mp4"),
        }
    }

    #[test]
    fn merge_args_copy_video_and_map_one_stream_per_input() {
        let args: Vec<String> = FfmpegMerger::merge_args(&pair(), Path::new("out.merging"))
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args[0], "-y");
        assert!(args.windows(2).any(|w| w == ["-i", "Recording_03.fhls-1422.mp4"]));
        assert!(
            args.windows(2)
                .any(|w| w == ["-i", "Recording_03.fhls-audio-high-Original.mp4"])
        );
        assert!(args.windows(2).any(|w| w == ["-map", "0:v:0"]));
        assert!(args.windows(2).any(|w| w == ["-map", "1:a:0"]));
        assert!(args.windows(2).any(|w| w == ["-c:v", "copy"]));
        assert!(args.windows(2).any(|w| w == ["-f", "mp4"]));
        assert_eq!(args.last().map(String::as_str), Some("out.merging"));
    }

    /// Stand-in muxer: a shell script run with the merge arguments.
    #[cfg(unix)]
    fn script_merger(dir: &Path, body: &str) -> FfmpegMerger {
        use std::os::unix::fs::PermissionsExt;

        let bin = dir.join("fake-ffmpeg");
        fs::write(&bin, format!("#!/bin/sh\n{body}\n")).expect("write script");
        fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).expect("chmod script");
        FfmpegMerger::new(bin)
    }

    #[cfg(unix)]
    #[test]
    fn undersized_output_is_rejected_and_raw_pair_kept() {
        use crate::recording::{Outcome, merge_recording};

        let dir = tempfile::tempdir().expect("temp dir");
        let video = dir.path().join("Recording_03.fhls-1422.mp4");
        let audio = dir.path().join("Recording_03.fhls-audio-high-Original.mp4");
        fs::write(&video, b"video").expect("video");
        fs::write(&audio, b"audio").expect("audio");
        let pair = MergePair {
            index: RecordingIndex::new(3).expect("positive index"),
            video: video.clone(),
            audio: audio.clone(),
        };
        // Writes a few bytes to the last argument (the destination).
        let merger = script_merger(dir.path(), r#"for last; do :; done; printf tiny > "$last""#);

        let err = merger
            .merge(&pair, &dir.path().join("out.mp4"))
            .expect_err("tiny output should fail");
        assert!(matches!(err, MergeError::OutputTooSmall { bytes: 4 }));

        let outcome = merge_recording(dir.path(), &pair, &merger);
        assert!(matches!(outcome, Outcome::MergeFailed(_)));
        assert!(video.exists());
        assert!(audio.exists());
        assert!(!dir.path().join("Recording_03.mp4").exists());
        assert!(!dir.path().join(".Recording_03.mp4.merging").exists());
    }

    #[cfg(unix)]
    #[test]
    fn successful_exit_without_output_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let merger = script_merger(dir.path(), "exit 0");
        let dest = dir.path().join("out.mp4");

        let err = merger.merge(&pair(), &dest).expect_err("no output should fail");
        assert!(matches!(err, MergeError::MissingOutput(path) if path == dest));
    }

    #[test]
    fn merge_reports_launch_failure_for_missing_binary() {
        let merger = FfmpegMerger::new(PathBuf::from("/nonexistent/bootcamp-dl-ffmpeg"));
        let err = merger
            .merge(&pair(), Path::new("out.merging"))
            .expect_err("missing binary should fail");
        assert!(matches!(err, MergeError::Launch { .. }));
        assert!(matches!(merger.probe(), Err(MergeError::Launch { .. })));
    }
}
