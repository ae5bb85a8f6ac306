use std::fs;
use std::io;
use std::path::Path;

use tracing::warn;

use super::{ArtifactState, Outcome, RecordingIndex, classify, merge_recording, scan_output_dir};
use crate::media::MediaMerger;

/// Merges every pairable split recording in `output_dir`, regardless of any
/// requested range. Indices with nothing to repair are not reported.
/// Downloader `.ytdl` state files are removed afterwards.
pub(crate) fn repair_all(
    output_dir: &Path,
    merger: &dyn MediaMerger,
) -> io::Result<Vec<(RecordingIndex, Outcome)>> {
    let mut report = Vec::new();
    let mut leftovers = Vec::new();
    for (index, artifacts) in scan_output_dir(output_dir)? {
        leftovers.extend(artifacts.ytdl_leftovers().cloned());
        let outcome = match classify(&artifacts) {
            ArtifactState::Satisfied { .. } if artifacts.has_split_files() => Outcome::Skipped,
            ArtifactState::Satisfied { .. } | ArtifactState::Unfetched => continue,
            ArtifactState::SplitPresent(pair) => merge_recording(output_dir, &pair, merger),
            ArtifactState::Ambiguous(reason) => Outcome::Ambiguous(reason),
        };
        report.push((index, outcome));
    }

    for path in leftovers {
        if let Err(err) = fs::remove_file(&path) {
            warn!(path = %path.display(), error = %err, "failed to remove downloader state file");
        }
    }
    Ok(report)
}
