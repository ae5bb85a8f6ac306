use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

pub(crate) const DEFAULT_BASE_URL: &str =
    "https://www.codecademy.com/bootcamps/fullstack-8/recordings";
pub(crate) const DEFAULT_OUTPUT_DIR: &str = "downloads";
const EXAMPLE_EMAIL: &str = "your_email@example.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ConfigError {
    #[error(
        "credentials not configured: set CODECADEMY_EMAIL and CODECADEMY_PASSWORD in the environment or a .env file"
    )]
    MissingCredentials,
    #[error("CODECADEMY_EMAIL is still the example address, edit your .env file")]
    ExampleCredentials,
}

#[derive(Clone)]
pub(crate) struct Credentials {
    pub(crate) email: String,
    pub(crate) password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"********")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) email: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) base_url: String,
    pub(crate) output_dir: PathBuf,
    pub(crate) state_dir: Option<PathBuf>,
    pub(crate) ytdlp_bin: Option<OsString>,
    pub(crate) ffmpeg_bin: Option<OsString>,
}

impl Config {
    /// Reads `.env` from the working directory (if any), then the environment.
    pub(crate) fn load() -> Self {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                warn!(error = %err, "failed to read .env file");
            }
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            email: get("CODECADEMY_EMAIL").map(|value| value.trim().to_string()),
            password: get("CODECADEMY_PASSWORD"),
            base_url: get("BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            output_dir: PathBuf::from(
                get("OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            ),
            state_dir: get("BOOTCAMP_DL_STATE_DIR").map(PathBuf::from),
            ytdlp_bin: get("BOOTCAMP_DL_YTDLP_BIN").map(OsString::from),
            ffmpeg_bin: get("BOOTCAMP_DL_FFMPEG_BIN").map(OsString::from),
        }
    }

    pub(crate) fn credentials(&self) -> Result<Credentials, ConfigError> {
        let (Some(email), Some(password)) = (&self.email, &self.password) else {
            return Err(ConfigError::MissingCredentials);
        };
        if email.eq_ignore_ascii_case(EXAMPLE_EMAIL) {
            return Err(ConfigError::ExampleCredentials);
        }
        Ok(Credentials {
            email: email.clone(),
            password: password.clone(),
        })
    }
}
