use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    ClearBrowserCookiesParams, CookieParam, TimeSinceEpoch,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::cookies::{self, StoredCookie};
use super::resolve::{MediaSource, PageProbe, PageResolver, ResolveError};
use super::resolve::{choose_media_source, recording_page_url};
use super::SessionCookies;
use crate::config::Credentials;
use crate::paths::SessionPaths;
use crate::recording::RecordingIndex;

const LOGIN_URL: &str = "https://www.codecademy.com/login";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const EMAIL_SELECTOR: &str = r#"#user_login, input[name="user[login]"]"#;
const PASSWORD_SELECTOR: &str = r#"#login__user_password, input[name="user[password]"]"#;
const LOGGED_IN_SELECTORS: &[&str] = &[
    r#"[class*="Dashboard"]"#,
    r#"nav a[href*="learn"]"#,
    r#"a[href*="dashboard"]"#,
];
const LOGIN_ERROR_SELECTOR: &str = r#".error, .alert-danger, [role="alert"], .notification--error"#;

const VIDEO_SELECTOR: &str = "video source, video";
const PLAYER_SELECTORS: &[&str] = &[
    "[data-video-url]",
    "[data-src]",
    ".video-player",
    ".wistia_embed",
    ".vimeo-player",
];
const PLAYER_ATTRIBUTES: &[&str] = &["data-video-url", "data-src", "data-video-id"];

const REDIRECT_SETTLE: Duration = Duration::from_secs(2);
const FIELD_PAUSE: Duration = Duration::from_millis(500);
const POST_LOGIN_SETTLE: Duration = Duration::from_secs(3);
const PLAYER_SETTLE: Duration = Duration::from_secs(3);

pub(crate) struct LaunchOptions {
    pub(crate) headless: bool,
    pub(crate) profile_dir: PathBuf,
    pub(crate) base_url: String,
}

/// One authenticated Chromium context reused for every recording. The
/// browser client is async, so the session owns a runtime and blocks on it.
pub(crate) struct BrowserSession {
    runtime: Runtime,
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    base_url: String,
}

impl BrowserSession {
    pub(crate) fn launch(options: &LaunchOptions) -> Result<Self> {
        std::fs::create_dir_all(&options.profile_dir).with_context(|| {
            format!(
                "failed to create browser profile directory {}",
                options.profile_dir.display()
            )
        })?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&options.profile_dir)
            .window_size(1280, 720)
            .arg("--disable-blink-features=AutomationControlled");
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|err| anyhow!("invalid browser configuration: {err}"))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .context("failed to start async runtime for the browser")?;

        let (browser, mut handler) = runtime
            .block_on(Browser::launch(config))
            .context("failed to launch Chromium")?;
        let handler_task = runtime.spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "browser handler event failed");
                }
            }
        });

        let page = runtime.block_on(async {
            let page = browser.new_page("about:blank").await?;
            page.set_user_agent(USER_AGENT).await?;
            Ok::<_, chromiumoxide::error::CdpError>(page)
        });
        let page = match page {
            Ok(page) => page,
            Err(err) => {
                handler_task.abort();
                return Err(err).context("failed to open browser tab");
            }
        };

        Ok(Self {
            runtime,
            browser,
            page,
            handler_task,
            base_url: options.base_url.clone(),
        })
    }

    /// Logs in (reusing saved cookies when they are still valid) and exports
    /// the cookie jar for the downloader.
    pub(crate) fn sign_in(
        &mut self,
        credentials: &Credentials,
        paths: &SessionPaths,
    ) -> Result<SessionCookies> {
        let cookies_loaded = self.load_saved_cookies(&paths.cookies_json)?;

        println!("\n[1/4] Logging in...");
        if !self.login(credentials, &paths.login_screenshot)? {
            if !cookies_loaded {
                bail!("login failed, check your credentials");
            }
            println!("  Saved cookies may be expired, trying a fresh login...");
            self.runtime
                .block_on(self.page.execute(ClearBrowserCookiesParams::default()))
                .context("failed to clear browser cookies")?;
            if !self.login(credentials, &paths.login_screenshot)? {
                bail!("login failed, check your credentials");
            }
        }

        println!("\n[2/4] Saving session cookies...");
        let current = self.current_cookies()?;
        cookies::save(&paths.cookies_json, &current)?;
        println!("  Cookies saved to {}", paths.cookies_json.display());
        cookies::write_netscape(&paths.netscape_cookies, &current)?;
        println!("  Netscape cookies saved to {}", paths.netscape_cookies.display());

        Ok(SessionCookies {
            netscape_file: paths.netscape_cookies.clone(),
        })
    }

    pub(crate) fn shutdown(mut self) {
        if let Err(err) = self.runtime.block_on(self.browser.close()) {
            warn!(error = %err, "failed to close browser cleanly");
        }
        let _ = self.runtime.block_on(self.browser.wait());
        self.handler_task.abort();
    }

    fn load_saved_cookies(&self, path: &Path) -> Result<bool> {
        let saved = match cookies::load_saved(path) {
            Ok(Some(saved)) => saved,
            Ok(None) => return Ok(false),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "ignoring unreadable saved cookies");
                return Ok(false);
            }
        };

        let params = saved
            .iter()
            .map(to_cookie_param)
            .collect::<Result<Vec<_>>>()?;
        self.runtime
            .block_on(self.page.set_cookies(params))
            .context("failed to load saved cookies into the browser")?;
        println!("  Loaded cookies from {}", path.display());
        Ok(true)
    }

    fn current_cookies(&self) -> Result<Vec<StoredCookie>> {
        let cookies = self
            .runtime
            .block_on(self.page.get_cookies())
            .context("failed to read browser cookies")?;
        Ok(cookies
            .into_iter()
            .map(|cookie| StoredCookie {
                name: cookie.name,
                value: cookie.value,
                domain: cookie.domain,
                path: cookie.path,
                expires: cookie.expires,
                secure: cookie.secure,
                http_only: cookie.http_only,
            })
            .collect())
    }

    /// `Ok(false)` means the site did not accept the login; browser failures
    /// are errors.
    fn login(&self, credentials: &Credentials, screenshot: &Path) -> Result<bool> {
        let page = &self.page;
        self.runtime.block_on(async {
            println!("  Navigating to {LOGIN_URL}");
            page.goto(LOGIN_URL).await.context("failed to open login page")?;
            tokio::time::sleep(REDIRECT_SETTLE).await;

            let url = page.url().await?.unwrap_or_default();
            if !url.to_lowercase().contains("login") {
                println!("  Already logged in!");
                return Ok(true);
            }

            println!("  Entering email...");
            let email = page
                .find_element(EMAIL_SELECTOR)
                .await
                .context("login form has no email field")?;
            email.click().await?;
            email.type_str(&credentials.email).await?;
            tokio::time::sleep(FIELD_PAUSE).await;

            println!("  Entering password...");
            let password = page
                .find_element(PASSWORD_SELECTOR)
                .await
                .context("login form has no password field")?;
            password.click().await?;
            password.type_str(&credentials.password).await?;
            tokio::time::sleep(FIELD_PAUSE).await;

            println!("  Submitting login form...");
            password.press_key("Enter").await?;
            if let Err(err) = page.wait_for_navigation().await {
                debug!(error = %err, "no navigation after submitting login");
            }
            tokio::time::sleep(POST_LOGIN_SETTLE).await;

            let url = page.url().await?.unwrap_or_default();
            println!("  Current URL after login: {url}");
            for selector in LOGGED_IN_SELECTORS {
                if page.find_element(*selector).await.is_ok() {
                    println!("  Login successful! Found dashboard elements.");
                    return Ok(true);
                }
            }
            if !url.contains("/login") {
                println!("  Login successful! Redirected away from login page.");
                return Ok(true);
            }

            if let Ok(elements) = page.find_elements(LOGIN_ERROR_SELECTOR).await {
                for element in elements {
                    if let Ok(Some(text)) = element.inner_text().await
                        && !text.trim().is_empty()
                    {
                        println!("  Login error: {}", text.trim());
                    }
                }
            }
            match page
                .save_screenshot(ScreenshotParams::builder().build(), screenshot)
                .await
            {
                Ok(_) => println!("  Debug screenshot saved to: {}", screenshot.display()),
                Err(err) => warn!(error = %err, "failed to save login screenshot"),
            }
            println!("  Warning: Could not confirm login success");
            Ok::<_, anyhow::Error>(false)
        })
    }
}

impl PageResolver for BrowserSession {
    fn resolve(&mut self, index: RecordingIndex) -> Result<MediaSource, ResolveError> {
        let url = recording_page_url(&self.base_url, index);
        println!("  Navigating to {url}");
        let probe = self
            .runtime
            .block_on(probe_recording_page(&self.page, &url))
            .map_err(|err| ResolveError::Navigation {
                url: url.clone(),
                detail: err.to_string(),
            })?;
        debug!(%index, ?probe, "probed recording page");

        let source = choose_media_source(&url, &probe);
        if source.referer.is_some() {
            println!("  No direct video source found, handing the page URL to yt-dlp");
        } else {
            println!("  Found video source");
        }
        Ok(source)
    }
}

async fn probe_recording_page(page: &Page, url: &str) -> chromiumoxide::Result<PageProbe> {
    page.goto(url).await?;
    tokio::time::sleep(PLAYER_SETTLE).await;

    let mut probe = PageProbe::default();
    if let Ok(video) = page.find_element(VIDEO_SELECTOR).await {
        probe.video_src = video.attribute("src").await?;
    }
    if let Ok(frames) = page.find_elements("iframe").await {
        for frame in frames {
            if let Some(src) = frame.attribute("src").await? {
                probe.iframe_srcs.push(src);
            }
        }
    }
    for selector in PLAYER_SELECTORS {
        let Ok(element) = page.find_element(*selector).await else {
            continue;
        };
        let mut values = Vec::new();
        for attribute in PLAYER_ATTRIBUTES {
            values.push(element.attribute(*attribute).await?);
        }
        if let Some(value) = first_player_value(values) {
            probe.player_urls.push(value);
        }
    }
    Ok(probe)
}

/// First non-blank value among a player element's attributes.
fn first_player_value(values: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    values
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

fn to_cookie_param(cookie: &StoredCookie) -> Result<CookieParam> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone())
        .domain(cookie.domain.clone())
        .path(cookie.path.clone())
        .secure(cookie.secure)
        .http_only(cookie.http_only);
    if cookie.expires > 0.0 {
        builder = builder.expires(TimeSinceEpoch::new(cookie.expires));
    }
    builder
        .build()
        .map_err(|err| anyhow!("invalid saved cookie {}: {err}", cookie.name))
}
