//! In-process stand-ins for the browser, downloader and merger.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::media::{DownloadTask, FetchError, MediaFetcher, MediaMerger, MergeError};
use crate::recording::{MergePair, RecordingIndex};
use crate::session::{MediaSource, PageResolver, ResolveError, SessionCookies};

pub(crate) fn idx(value: u32) -> RecordingIndex {
    RecordingIndex::new(value).expect("positive index")
}

pub(crate) fn cookies() -> SessionCookies {
    SessionCookies {
        netscape_file: PathBuf::from("cookies_netscape.txt"),
    }
}

pub(crate) fn touch(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

pub(crate) fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[derive(Default)]
pub(crate) struct FakeResolver {
    pub(crate) calls: Vec<RecordingIndex>,
    pub(crate) missing: Vec<u32>,
}

impl PageResolver for FakeResolver {
    fn resolve(&mut self, index: RecordingIndex) -> Result<MediaSource, ResolveError> {
        self.calls.push(index);
        let url = format!("https://recordings.test/{}", index.get());
        if self.missing.contains(&index.get()) {
            return Err(ResolveError::Navigation {
                url,
                detail: "page not found".to_string(),
            });
        }
        Ok(MediaSource { url, referer: None })
    }
}

/// What the fake downloader leaves behind for an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Produces {
    Combined,
    Split,
    VideoOnly,
    Nothing,
    PartialThenFail,
    Interrupt,
}

pub(crate) struct FakeFetcher {
    pub(crate) default: Produces,
    pub(crate) overrides: HashMap<u32, Produces>,
    pub(crate) calls: RefCell<Vec<DownloadTask>>,
}

impl FakeFetcher {
    pub(crate) fn new(default: Produces) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn with(mut self, index: u32, produces: Produces) -> Self {
        self.overrides.insert(index, produces);
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl MediaFetcher for FakeFetcher {
    fn fetch(&self, task: &DownloadTask, _cookies: &SessionCookies) -> Result<(), FetchError> {
        self.calls.borrow_mut().push(task.clone());
        let stem = task.index.stem();
        let dir = &task.output_dir;
        let partial = dir.join(format!("{stem}.fhls-1422.mp4.part"));
        match self.overrides.get(&task.index.get()).copied().unwrap_or(self.default) {
            Produces::Combined => {
                let _ = fs::remove_file(&partial);
                touch(dir, &format!("{stem}.mp4"), b"combined");
                Ok(())
            }
            Produces::Split => {
                // A resumed download replaces its .part file.
                let _ = fs::remove_file(&partial);
                touch(dir, &format!("{stem}.fhls-1422.mp4"), b"video");
                touch(dir, &format!("{stem}.fhls-audio-high-Original.mp4"), b"audio");
                Ok(())
            }
            Produces::VideoOnly => {
                touch(dir, &format!("{stem}.fhls-1422.mp4"), b"video");
                Ok(())
            }
            Produces::Nothing => Ok(()),
            Produces::PartialThenFail => {
                fs::write(&partial, b"half").expect("write partial");
                Err(FetchError::Exit {
                    program: "yt-dlp".to_string(),
                    status: "exit status: 1".to_string(),
                })
            }
            Produces::Interrupt => {
                fs::write(&partial, b"half").expect("write partial");
                Err(FetchError::Interrupted)
            }
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeMerger {
    pub(crate) fail: bool,
    pub(crate) calls: RefCell<Vec<MergePair>>,
}

impl FakeMerger {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl MediaMerger for FakeMerger {
    fn merge(&self, pair: &MergePair, dest: &Path) -> Result<(), MergeError> {
        self.calls.borrow_mut().push(pair.clone());
        if self.fail {
            // A real muxer may leave a truncated file behind.
            fs::write(dest, b"trunc").expect("write partial merge");
            return Err(MergeError::Exit {
                program: "ffmpeg".to_string(),
                detail: "Invalid data found when processing input".to_string(),
            });
        }
        fs::write(dest, b"merged").expect("write merged output");
        Ok(())
    }
}
