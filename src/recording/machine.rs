use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use super::{
    ArtifactState, MergePair, RecordingArtifacts, RecordingIndex, Unresolved, classify,
    classify_fetched, scan_index,
};
use crate::media::{DownloadTask, FetchError, MediaFetcher, MediaMerger};
use crate::session::{PageResolver, SessionCookies};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Policy {
    pub(crate) force: bool,
    pub(crate) allow_split: bool,
}

/// Terminal result of processing one recording index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Skipped,
    Downloaded,
    Merged,
    KeptSplit,
    Failed(String),
    MergeFailed(String),
    Ambiguous(Unresolved),
    Interrupted,
}

impl Outcome {
    pub(crate) fn is_success(&self) -> bool {
        matches!(self, Self::Downloaded | Self::Merged | Self::KeptSplit)
    }

    pub(crate) fn describe(&self, index: RecordingIndex) -> String {
        match self {
            Self::Skipped => "Already downloaded, skipping (use --force to re-download)".to_string(),
            Self::Downloaded => "Download completed".to_string(),
            Self::Merged => format!("Merged video + audio into {}", index.canonical_file_name()),
            Self::KeptSplit => "Kept separate video/audio files".to_string(),
            Self::Failed(detail) => format!("Failed: {detail}"),
            Self::MergeFailed(detail) => {
                format!("Merge failed, split files kept for `--merge`: {detail}")
            }
            Self::Ambiguous(reason) => format!("Cannot pair split files ({reason}), left untouched"),
            Self::Interrupted => "Interrupted, partial files kept for the next run".to_string(),
        }
    }
}

/// Drives one index at a time from whatever is on disk to a terminal state.
pub(crate) struct Recorder<'a> {
    output_dir: &'a Path,
    resolver: &'a mut dyn PageResolver,
    fetcher: &'a dyn MediaFetcher,
    merger: Option<&'a dyn MediaMerger>,
    cookies: &'a SessionCookies,
    policy: Policy,
}

impl<'a> Recorder<'a> {
    pub(crate) fn new(
        output_dir: &'a Path,
        resolver: &'a mut dyn PageResolver,
        fetcher: &'a dyn MediaFetcher,
        merger: Option<&'a dyn MediaMerger>,
        cookies: &'a SessionCookies,
        policy: Policy,
    ) -> Self {
        Self {
            output_dir,
            resolver,
            fetcher,
            merger,
            cookies,
            policy,
        }
    }

    pub(crate) fn process(&mut self, index: RecordingIndex) -> Outcome {
        let state = match self.current_state(index) {
            Ok(state) => state,
            Err(outcome) => return outcome,
        };
        debug!(%index, ?state, force = self.policy.force, "classified recording");

        if !self.policy.force {
            match state {
                ArtifactState::Satisfied { .. } => return Outcome::Skipped,
                ArtifactState::SplitPresent(pair) => return self.finish_split(&pair),
                ArtifactState::Unfetched | ArtifactState::Ambiguous(_) => {}
            }
        }

        self.fetch(index)
    }

    fn current_state(&self, index: RecordingIndex) -> Result<ArtifactState, Outcome> {
        scan_index(self.output_dir, index)
            .map(|artifacts| classify(&artifacts))
            .map_err(|err| scan_failure(self.output_dir, err))
    }

    fn fetch(&mut self, index: RecordingIndex) -> Outcome {
        let source = match self.resolver.resolve(index) {
            Ok(source) => source,
            Err(err) => return Outcome::Failed(err.to_string()),
        };

        let task = DownloadTask {
            index,
            url: source.url,
            referer: source.referer,
            output_dir: self.output_dir.to_path_buf(),
            force: self.policy.force,
        };
        let before = match scan_index(self.output_dir, index) {
            Ok(artifacts) => fingerprints(&artifacts),
            Err(err) => return scan_failure(self.output_dir, err),
        };
        match self.fetcher.fetch(&task, self.cookies) {
            Ok(()) => {}
            Err(FetchError::Interrupted) => return Outcome::Interrupted,
            Err(err) => return Outcome::Failed(err.to_string()),
        }

        let after = scan_index(self.output_dir, index).map(|artifacts| {
            classify_fetched(&artifacts, |path| {
                before.get(path) != Some(&fingerprint(path))
            })
        });
        match after.map_err(|err| scan_failure(self.output_dir, err)) {
            Ok(ArtifactState::Satisfied { .. }) => Outcome::Downloaded,
            Ok(ArtifactState::SplitPresent(pair)) => self.finish_split(&pair),
            Ok(ArtifactState::Ambiguous(reason)) => Outcome::Ambiguous(reason),
            Ok(ArtifactState::Unfetched) => {
                Outcome::Failed("downloader finished without writing a recording file".to_string())
            }
            Err(outcome) => outcome,
        }
    }

    fn finish_split(&self, pair: &MergePair) -> Outcome {
        if self.policy.allow_split {
            return Outcome::KeptSplit;
        }
        match self.merger {
            Some(merger) => merge_recording(self.output_dir, pair, merger),
            None => Outcome::MergeFailed("no media merger available".to_string()),
        }
    }
}

/// Merges `pair` into the canonical file of its index. The raw streams are
/// only deleted once the canonical file is in place.
pub(crate) fn merge_recording(
    output_dir: &Path,
    pair: &MergePair,
    merger: &dyn MediaMerger,
) -> Outcome {
    let temp = output_dir.join(pair.index.merge_temp_file_name());
    let canonical = output_dir.join(pair.index.canonical_file_name());

    if let Err(err) = merger.merge(pair, &temp) {
        discard(&temp);
        return Outcome::MergeFailed(err.to_string());
    }
    if let Err(err) = fs::rename(&temp, &canonical) {
        discard(&temp);
        return Outcome::MergeFailed(format!(
            "failed to move merged output to {}: {err}",
            canonical.display()
        ));
    }

    for raw in [&pair.video, &pair.audio] {
        if let Err(err) = fs::remove_file(raw) {
            warn!(path = %raw.display(), error = %err, "failed to remove merged stream");
        }
    }
    Outcome::Merged
}

fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "failed to remove merge output"),
    }
}

type Fingerprint = Option<(u64, Option<SystemTime>)>;

fn fingerprint(path: &Path) -> Fingerprint {
    let meta = fs::metadata(path).ok()?;
    Some((meta.len(), meta.modified().ok()))
}

/// Size and mtime of every split stream and canonical file, so the rescan
/// can tell what the fetch rewrote.
fn fingerprints(artifacts: &RecordingArtifacts) -> HashMap<PathBuf, Fingerprint> {
    artifacts
        .canonical
        .iter()
        .chain(&artifacts.videos)
        .chain(&artifacts.audios)
        .map(|path| (path.clone(), fingerprint(path)))
        .collect()
}

fn scan_failure(dir: &Path, err: io::Error) -> Outcome {
    Outcome::Failed(format!("failed to scan {}: {err}", dir.display()))
}
