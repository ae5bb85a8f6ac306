mod artifact;
mod machine;
mod repair;


use std::fmt;

pub(crate) use artifact::*;
pub(crate) use machine::*;
pub(crate) use repair::*;

/// 1-based number of a recorded session, as used in the page URL and in
/// every file name the downloader produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct RecordingIndex(u32);

impl RecordingIndex {
    pub(crate) fn new(value: u32) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    pub(crate) fn get(self) -> u32 {
        self.0
    }

    /// `Recording_07`: shared prefix of every artifact of this index.
    pub(crate) fn stem(self) -> String {
        format!("Recording_{self}")
    }

    pub(crate) fn canonical_file_name(self) -> String {
        format!("{}.mp4", self.stem())
    }

    /// Hidden while the merger writes it, so a crash mid-merge never shows up
    /// as an artifact of the index.
    pub(crate) fn merge_temp_file_name(self) -> String {
        format!(".{}.merging", self.canonical_file_name())
    }
}

impl fmt::Display for RecordingIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}
