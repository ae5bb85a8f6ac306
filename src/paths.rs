use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Files the browser session keeps between runs. Deleting the directory
/// forces a fresh login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub cookies_json: PathBuf,
    pub netscape_cookies: PathBuf,
    pub browser_profile: PathBuf,
    pub login_screenshot: PathBuf,
}

impl SessionPaths {
    pub fn resolve(override_dir: Option<&Path>) -> Result<Self> {
        let base = match override_dir {
            Some(dir) => dir.to_path_buf(),
            None => dirs::data_dir()
                .context("unable to resolve data directory")?
                .join("bootcamp-dl"),
        };
        Ok(Self::under(&base))
    }

    pub fn under(base: &Path) -> Self {
        Self {
            cookies_json: base.join("cookies.json"),
            netscape_cookies: base.join("cookies_netscape.txt"),
            browser_profile: base.join("browser-profile"),
            login_screenshot: base.join("login_debug.png"),
        }
    }
}
