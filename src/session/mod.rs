mod browser;
mod cookies;
mod resolve;

use std::path::PathBuf;

pub(crate) use browser::{BrowserSession, LaunchOptions};
pub(crate) use resolve::*;

/// Authenticated session handed to the fetch step: the cookie jar exported
/// from the browser after login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionCookies {
    pub(crate) netscape_file: PathBuf,
}
