use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Browser cookie as persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredCookie {
    pub(crate) name: String,
    pub(crate) value: String,
    pub(crate) domain: String,
    #[serde(default = "default_path")]
    pub(crate) path: String,
    /// Seconds since the epoch; zero or negative marks a session cookie.
    #[serde(default)]
    pub(crate) expires: f64,
    #[serde(default)]
    pub(crate) secure: bool,
    #[serde(default)]
    pub(crate) http_only: bool,
}

fn default_path() -> String {
    "/".to_string()
}

pub(crate) fn load_saved(path: &Path) -> Result<Option<Vec<StoredCookie>>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read saved cookies at {}", path.display()))?;
    let cookies = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse saved cookies at {}", path.display()))?;
    Ok(Some(cookies))
}

pub(crate) fn save(path: &Path, cookies: &[StoredCookie]) -> Result<()> {
    ensure_parent(path)?;
    let raw = serde_json::to_string_pretty(cookies)?;
    fs::write(path, raw)
        .with_context(|| format!("failed to write cookies to {}", path.display()))
}

pub(crate) fn write_netscape(path: &Path, cookies: &[StoredCookie]) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, to_netscape(cookies, Utc::now()))
        .with_context(|| format!("failed to write cookie jar to {}", path.display()))
}

/// Renders the cookie jar format understood by yt-dlp. Session cookies get a
/// one-year expiry so the downloader does not drop them.
pub(crate) fn to_netscape(cookies: &[StoredCookie], now: DateTime<Utc>) -> String {
    let session_expiry = (now + Duration::days(365)).timestamp();

    let mut out = String::from(
        "# Netscape HTTP Cookie File\n\
         # https://curl.haxx.se/rfc/cookie_spec.html\n\
         # This is a generated file! Do not edit.\n\n",
    );
    for cookie in cookies {
        let domain = if cookie.domain.starts_with('.') {
            cookie.domain.clone()
        } else {
            format!(".{}", cookie.domain)
        };
        let path = if cookie.path.is_empty() { "/" } else { cookie.path.as_str() };
        let secure = if cookie.secure { "TRUE" } else { "FALSE" };
        let expiry = if cookie.expires <= 0.0 {
            session_expiry
        } else {
            cookie.expires as i64
        };
        out.push_str(&format!(
            "{domain}\tTRUE\t{path}\t{secure}\t{expiry}\t{}\t{}\n",
            cookie.name, cookie.value
        ));
    }
    out
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cookie(name: &str, domain: &str, expires: f64, secure: bool) -> StoredCookie {
        StoredCookie {
            name: name.to_string(),
            value: format!("{name}-value"),
            domain: domain.to_string(),
            path: "/".to_string(),
            expires,
            secure,
            http_only: false,
        }
    }

    #[test]
    fn to_netscape_forces_leading_dot_and_keeps_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let jar = to_netscape(
            &[cookie("sid", "www.codecademy.com", 1_800_000_000.5, true)],
            now,
        );
        assert!(jar.starts_with("# Netscape HTTP Cookie File\n"));
        assert!(jar.contains(".www.codecademy.com\tTRUE\t/\tTRUE\t1800000000\tsid\tsid-value\n"));
    }

    #[test]
    fn to_netscape_extends_session_cookies_by_one_year() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let expected = (now + Duration::days(365)).timestamp();
        let jar = to_netscape(&[cookie("csrf", ".codecademy.com", -1.0, false)], now);
        assert!(jar.contains(&format!(
            ".codecademy.com\tTRUE\t/\tFALSE\t{expected}\tcsrf\tcsrf-value\n"
        )));
    }

    #[test]
    fn saved_cookies_survive_a_save_load_cycle() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("state").join("cookies.json");
        assert!(load_saved(&path).expect("load").is_none());

        let cookies = vec![cookie("sid", ".codecademy.com", 0.0, true)];
        save(&path, &cookies).expect("save");
        assert_eq!(load_saved(&path).expect("load"), Some(cookies));
    }

    #[test]
    fn load_saved_fills_defaults_for_sparse_entries() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("cookies.json");
        fs::write(&path, r#"[{"name":"a","value":"b","domain":"x.test"}]"#).expect("write");

        let cookies = load_saved(&path).expect("load").expect("present");
        assert_eq!(cookies[0].path, "/");
        assert_eq!(cookies[0].expires, 0.0);
        assert!(!cookies[0].secure);
    }
}
