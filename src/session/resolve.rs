use thiserror::Error;

use crate::recording::RecordingIndex;

/// Embed hosts checked in order; the first iframe matching one wins.
const EMBED_HOSTS: &[&str] = &["vimeo", "youtube", "wistia", "player"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MediaSource {
    pub(crate) url: String,
    /// Set when the downloader must present the recording page, e.g. for
    /// embed-only players.
    pub(crate) referer: Option<String>,
}

#[derive(Debug, Error)]
pub(crate) enum ResolveError {
    #[error("could not open recording page {url}: {detail}")]
    Navigation { url: String, detail: String },
}

/// Turns a recording index into something the media fetcher can download.
pub(crate) trait PageResolver {
    fn resolve(&mut self, index: RecordingIndex) -> Result<MediaSource, ResolveError>;
}

/// What the browser found on a recording page, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PageProbe {
    pub(crate) video_src: Option<String>,
    pub(crate) iframe_srcs: Vec<String>,
    pub(crate) player_urls: Vec<String>,
}

pub(crate) fn recording_page_url(base_url: &str, index: RecordingIndex) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), index.get())
}

pub(crate) fn choose_media_source(page_url: &str, probe: &PageProbe) -> MediaSource {
    if let Some(src) = non_empty(probe.video_src.as_deref()) {
        return direct(src);
    }

    for host in EMBED_HOSTS {
        let Some(src) = probe
            .iframe_srcs
            .iter()
            .map(String::as_str)
            .find(|src| !src.trim().is_empty() && src.contains(host))
        else {
            continue;
        };
        // Vimeo refuses embed-only videos without the embedding page.
        if src.contains("vimeo") {
            return via_page(page_url);
        }
        return direct(src);
    }

    if let Some(url) = probe
        .player_urls
        .iter()
        .find_map(|url| non_empty(Some(url.as_str())))
    {
        return direct(url);
    }

    via_page(page_url)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn direct(url: &str) -> MediaSource {
    MediaSource {
        url: url.trim().to_string(),
        referer: None,
    }
}

fn via_page(page_url: &str) -> MediaSource {
    MediaSource {
        url: page_url.to_string(),
        referer: Some(page_url.to_string()),
    }
}
