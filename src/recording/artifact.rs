use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::RecordingIndex;

const CANONICAL_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv"];
const AUDIO_EXTENSIONS: &[&str] = &["m4a", "aac", "mp3", "opus", "ogg", "wav"];
const PARTIAL_EXTENSIONS: &[&str] = &["part", "ytdl", "tmp", "temp"];

// Recording_<n>.<ext> or Recording_<n>.<suffix>.<ext>
static ARTIFACT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Recording_(\d+)\.(?:(.+)\.)?([A-Za-z0-9]+)$").expect("valid artifact pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArtifactKind {
    Canonical,
    Video,
    Audio,
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MergePair {
    pub(crate) index: RecordingIndex,
    pub(crate) video: PathBuf,
    pub(crate) audio: PathBuf,
}

/// Why the split files of an index cannot be paired for merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Unresolved {
    MissingVideo,
    MissingAudio,
    MultipleVideos(usize),
    MultipleAudios(usize),
    Incomplete,
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVideo => write!(f, "audio only, no video file found"),
            Self::MissingAudio => write!(f, "video only, no audio file found"),
            Self::MultipleVideos(count) => write!(f, "{count} candidate video files"),
            Self::MultipleAudios(count) => write!(f, "{count} candidate audio files"),
            Self::Incomplete => write!(f, "a partial download is still present"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ArtifactState {
    Satisfied { path: PathBuf },
    Unfetched,
    SplitPresent(MergePair),
    Ambiguous(Unresolved),
}

/// Files on disk belonging to one recording index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordingArtifacts {
    pub(crate) index: RecordingIndex,
    pub(crate) canonical: Option<PathBuf>,
    pub(crate) videos: Vec<PathBuf>,
    pub(crate) audios: Vec<PathBuf>,
    pub(crate) partials: Vec<PathBuf>,
}

impl RecordingArtifacts {
    pub(crate) fn new(index: RecordingIndex) -> Self {
        Self {
            index,
            canonical: None,
            videos: Vec::new(),
            audios: Vec::new(),
            partials: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, kind: ArtifactKind, path: PathBuf) {
        match kind {
            ArtifactKind::Canonical => {
                // Prefer the .mp4 name the merger writes when several containers exist.
                let replace = match &self.canonical {
                    None => true,
                    Some(current) => !has_extension(current, "mp4") && has_extension(&path, "mp4"),
                };
                if replace {
                    self.canonical = Some(path);
                }
            }
            ArtifactKind::Video => self.videos.push(path),
            ArtifactKind::Audio => self.audios.push(path),
            ArtifactKind::Partial => self.partials.push(path),
        }
    }

    pub(crate) fn has_split_files(&self) -> bool {
        !self.videos.is_empty() || !self.audios.is_empty()
    }

    pub(crate) fn split_pair(&self) -> Result<MergePair, Unresolved> {
        let video = match self.videos.as_slice() {
            [] => return Err(Unresolved::MissingVideo),
            [single] => single,
            many => return Err(Unresolved::MultipleVideos(many.len())),
        };
        let audio = match self.audios.as_slice() {
            [] => return Err(Unresolved::MissingAudio),
            [single] => single,
            many => return Err(Unresolved::MultipleAudios(many.len())),
        };
        // Only a .part of one of the chosen streams means it is still being written.
        if [video, audio]
            .into_iter()
            .any(|stream| self.partials.contains(&part_file_of(stream)))
        {
            return Err(Unresolved::Incomplete);
        }
        Ok(MergePair {
            index: self.index,
            video: video.clone(),
            audio: audio.clone(),
        })
    }

    /// Downloader state files (`*.ytdl`) of this index.
    pub(crate) fn ytdl_leftovers(&self) -> impl Iterator<Item = &PathBuf> {
        self.partials
            .iter()
            .filter(|path| has_extension(path, "ytdl"))
    }

    fn sort(&mut self) {
        self.videos.sort();
        self.audios.sort();
        self.partials.sort();
    }
}

/// A canonical file always wins; split files only matter without one.
pub(crate) fn classify(artifacts: &RecordingArtifacts) -> ArtifactState {
    if let Some(path) = &artifacts.canonical {
        return ArtifactState::Satisfied { path: path.clone() };
    }
    if !artifacts.has_split_files() {
        return ArtifactState::Unfetched;
    }
    match artifacts.split_pair() {
        Ok(pair) => ArtifactState::SplitPresent(pair),
        Err(reason) => ArtifactState::Ambiguous(reason),
    }
}

/// Classification right after a fetch. A split pair that the fetch just
/// wrote outranks an older canonical file, which the merge then replaces.
pub(crate) fn classify_fetched(
    artifacts: &RecordingArtifacts,
    is_fresh: impl Fn(&Path) -> bool,
) -> ArtifactState {
    if let Ok(pair) = artifacts.split_pair()
        && (artifacts.canonical.is_none() || is_fresh(&pair.video) || is_fresh(&pair.audio))
    {
        return ArtifactState::SplitPresent(pair);
    }
    classify(artifacts)
}

pub(crate) fn parse_artifact_name(name: &str) -> Option<(RecordingIndex, ArtifactKind)> {
    let captures = ARTIFACT_NAME.captures(name)?;
    let index = captures[1].parse::<u32>().ok().and_then(RecordingIndex::new)?;
    let suffix = captures.get(2).map(|m| m.as_str());
    let ext = captures[3].to_ascii_lowercase();

    if PARTIAL_EXTENSIONS.contains(&ext.as_str()) {
        return Some((index, ArtifactKind::Partial));
    }
    let kind = match suffix {
        None if CANONICAL_EXTENSIONS.contains(&ext.as_str()) => ArtifactKind::Canonical,
        None if AUDIO_EXTENSIONS.contains(&ext.as_str()) => ArtifactKind::Audio,
        None => return None,
        Some(suffix) if is_audio_candidate(suffix, &ext) => ArtifactKind::Audio,
        Some(_) => ArtifactKind::Video,
    };
    Some((index, kind))
}

fn is_audio_candidate(suffix: &str, ext: &str) -> bool {
    suffix.to_ascii_lowercase().contains("audio") || AUDIO_EXTENSIONS.contains(&ext)
}

fn part_file_of(stream: &Path) -> PathBuf {
    let mut name = stream.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|value| value.to_str())
        .is_some_and(|value| value.eq_ignore_ascii_case(ext))
}

/// Groups every recognised artifact in `dir` by index. A missing directory
/// simply holds no artifacts.
pub(crate) fn scan_output_dir(dir: &Path) -> io::Result<BTreeMap<RecordingIndex, RecordingArtifacts>> {
    let mut grouped = BTreeMap::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(grouped),
        Err(err) => return Err(err),
    };

    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some((index, kind)) = parse_artifact_name(name) else {
            continue;
        };
        grouped
            .entry(index)
            .or_insert_with(|| RecordingArtifacts::new(index))
            .push(kind, entry.path());
    }

    for artifacts in grouped.values_mut() {
        artifacts.sort();
    }
    Ok(grouped)
}

pub(crate) fn scan_index(dir: &Path, index: RecordingIndex) -> io::Result<RecordingArtifacts> {
    Ok(scan_output_dir(dir)?
        .remove(&index)
        .unwrap_or_else(|| RecordingArtifacts::new(index)))
}
