use clap::{ArgGroup, Parser};

use crate::recording::RecordingIndex;

const EXAMPLES: &str = "\
Examples:
  bootcamp-dl --start 1 --end 25          Download recordings 1-25
  bootcamp-dl --video 5                   Download only recording 5
  bootcamp-dl --start 1 --end 5 --force   Re-download even if present
  bootcamp-dl --merge                     Merge any split audio/video files";

#[derive(Debug, Parser)]
#[command(
    name = "bootcamp-dl",
    version,
    about = "Download recorded bootcamp sessions for offline viewing",
    after_help = EXAMPLES
)]
#[command(group(
    ArgGroup::new("selection")
        .required(true)
        .args(["video", "start", "merge"])
))]
pub struct Cli {
    /// Download a single recording by number
    #[arg(short = 'v', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub video: Option<u32>,

    /// First recording number (use with --end)
    #[arg(short, long, requires = "end", value_parser = clap::value_parser!(u32).range(1..))]
    pub start: Option<u32>,

    /// Last recording number (use with --start)
    #[arg(short, long, requires = "start", value_parser = clap::value_parser!(u32).range(1..))]
    pub end: Option<u32>,

    /// Merge existing split audio/video files, then exit
    #[arg(short, long)]
    pub merge: bool,

    /// Run the browser without a visible window
    #[arg(long)]
    pub headless: bool,

    /// Download again even if the recording already exists
    #[arg(short, long)]
    pub force: bool,

    /// Keep separate audio/video files instead of requiring a merge
    #[arg(long)]
    pub allow_split: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Selection {
    Range {
        start: RecordingIndex,
        end: RecordingIndex,
    },
    Repair,
}

impl Selection {
    fn bounds(self) -> Option<(u32, u32)> {
        match self {
            Self::Range { start, end } => Some((start.get(), end.get())),
            Self::Repair => None,
        }
    }

    /// Lazily walks the selected range; a range may span the whole `u32` space.
    pub(crate) fn indices(self) -> impl Iterator<Item = RecordingIndex> {
        let (start, end) = self.bounds().unwrap_or((1, 0));
        (start..=end).filter_map(RecordingIndex::new)
    }

    pub(crate) fn recording_count(self) -> u64 {
        self.bounds()
            .map_or(0, |(start, end)| u64::from(end - start) + 1)
    }
}

impl Cli {
    pub(crate) fn selection(&self) -> Result<Selection, String> {
        if self.merge {
            return Ok(Selection::Repair);
        }
        let (start, end) = match (self.video, self.start, self.end) {
            (Some(video), _, _) => (video, video),
            (None, Some(start), Some(end)) => (start, end),
            (None, Some(_), None) => return Err("--end is required when using --start".to_string()),
            _ => return Err("one of --video, --start or --merge is required".to_string()),
        };
        if start > end {
            return Err("--start must be less than or equal to --end".to_string());
        }
        match (RecordingIndex::new(start), RecordingIndex::new(end)) {
            (Some(start), Some(end)) => Ok(Selection::Range { start, end }),
            _ => Err("recording numbers must be positive".to_string()),
        }
    }
}
