use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use super::process::run_foreground;
use super::{DownloadTask, FetchError, MediaFetcher};
use crate::session::SessionCookies;

/// Best video + best audio, or the best single file when the source is muxed.
const FORMAT_SELECTOR: &str = "bv*+ba/b";

pub(crate) struct YtDlpFetcher {
    bin: PathBuf,
}

impl YtDlpFetcher {
    pub(crate) fn new(bin: PathBuf) -> Self {
        Self { bin }
    }

    pub(crate) fn build_args(task: &DownloadTask, cookies: &SessionCookies) -> Vec<OsString> {
        let output_template = task
            .output_dir
            .join(format!("{}.%(ext)s", task.index.stem()));

        let mut args: Vec<OsString> = vec![
            "--cookies".into(),
            cookies.netscape_file.clone().into_os_string(),
            "-o".into(),
            output_template.into_os_string(),
            "--progress".into(),
            "--newline".into(),
            "-f".into(),
            FORMAT_SELECTOR.into(),
            "--merge-output-format".into(),
            "mp4".into(),
            "--retries".into(),
            "3".into(),
        ];
        if let Some(referer) = &task.referer {
            args.push("--referer".into());
            args.push(referer.into());
        }
        if task.force {
            args.push("--force-overwrites".into());
        }
        args.push(task.url.as_str().into());
        args
    }
}

impl MediaFetcher for YtDlpFetcher {
    fn fetch(&self, task: &DownloadTask, cookies: &SessionCookies) -> Result<(), FetchError> {
        let program = self.bin.display().to_string();
        let args = Self::build_args(task, cookies);
        debug!(%program, ?args, "running downloader");

        println!("  Running yt-dlp...");
        let mut cmd = Command::new(&self.bin);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        let run = run_foreground(&mut cmd).map_err(|source| FetchError::Launch {
            program: program.clone(),
            source,
        })?;

        if run.interrupted {
            return Err(FetchError::Interrupted);
        }
        if !run.status.success() {
            return Err(FetchError::Exit {
                program,
                status: run.status.to_string(),
            });
        }
        Ok(())
    }
}
