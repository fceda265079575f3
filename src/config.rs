//! Configuration loading.
//!
//! Settings come from environment variables, optionally seeded from a `.env`
//! file in the local data directory (`<data_local_dir>/likeify/.env`) or the
//! working directory. [`Config::from_lookup`] builds the same value from any
//! key lookup so callers can configure the daemon without touching the
//! process environment.

use std::{env, path::PathBuf, time::Duration};

pub const CLIENT_ID: &str = "SPOTIFY_API_AUTH_CLIENT_ID";
pub const CLIENT_SECRET: &str = "SPOTIFY_API_AUTH_CLIENT_SECRET";
pub const SCOPE: &str = "SPOTIFY_API_AUTH_SCOPE";
pub const AUTH_URL: &str = "SPOTIFY_API_AUTH_URL";
pub const TOKEN_URL: &str = "SPOTIFY_API_TOKEN_URL";
pub const API_URL: &str = "SPOTIFY_API_URL";
pub const BASE_URL: &str = "LIKEIFY_BASE_URL";
pub const WEB_PORT: &str = "LIKEIFY_WEB_PORT";
pub const PLAYLIST_NAME: &str = "LIKEIFY_PLAYLIST_NAME";
pub const PLAYLIST_DESCRIPTION: &str = "LIKEIFY_PLAYLIST_DESCRIPTION";
pub const PLAYLIST_PUBLIC: &str = "LIKEIFY_PLAYLIST_PUBLIC";
pub const REFRESH_INTERVAL_MS: &str = "LIKEIFY_REFRESH_INTERVAL_MS";
pub const USER_DELAY_SECS: &str = "LIKEIFY_USER_DELAY_SECS";
pub const MIN_RUN_SPACING_SECS: &str = "LIKEIFY_MIN_RUN_SPACING_SECS";
pub const SCHEDULE_BUFFER_SECS: &str = "LIKEIFY_SCHEDULE_BUFFER_SECS";
pub const SESSIONS_PATH: &str = "LIKEIFY_SESSIONS_PATH";

const DEFAULT_SCOPE: &str = "user-library-read playlist-modify-public playlist-read-private";

/// Loads a `.env` file into the process environment.
///
/// The data directory copy wins. Without it a `.env` in the working directory
/// is used. A missing file is not an error since every key can also be set
/// directly in the environment.
///
/// # Directory Structure
///
/// The data directory copy lives in:
/// - Linux: `~/.local/share/likeify/.env`
/// - macOS: `~/Library/Application Support/likeify/.env`
/// - Windows: `%LOCALAPPDATA%/likeify/.env`
///
/// # Errors
///
/// Returns an error string if the data directory cannot be created.
///
/// # Example
///
/// ```
/// use likeify::config;
///
/// #[tokio::main]
/// async fn main() {
///     if let Err(e) = config::load_env().await {
///         eprintln!("Configuration error: {}", e);
///     }
/// }
/// ```
pub async fn load_env() -> Result<(), String> {
    let mut path = data_dir();
    async_fs::create_dir_all(&path)
        .await
        .map_err(|e| e.to_string())?;
    path.push(".env");

    if dotenv::from_path(&path).is_err() {
        let _ = dotenv::dotenv();
    }
    Ok(())
}

fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("likeify");
    path
}

/// Name and description used for newly created mirror playlists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistDefaults {
    pub name: String,
    pub description: String,
    pub public: bool,
}

/// Timing knobs of the sync scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePolicy {
    /// Period between two full cycles.
    pub interval: Duration,
    /// Pause between two users of the same cycle.
    pub user_delay: Duration,
    /// Minimum time between two runs for the same user.
    pub min_spacing: Duration,
    /// Out-of-band syncs are only started when more than this remains before the next cycle.
    pub out_of_band_buffer: Duration,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(30 * 60 * 1000),
            user_delay: Duration::from_secs(10),
            min_spacing: Duration::from_secs(20 * 60),
            out_of_band_buffer: Duration::from_secs(2 * 60),
        }
    }
}

/// Complete runtime configuration of the daemon and the CLI.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub base_url: String,
    pub web_port: u16,
    pub playlist: PlaylistDefaults,
    pub schedule: SchedulePolicy,
    pub sessions_path: PathBuf,
}

impl Config {
    /// Builds the configuration from the process environment.
    ///
    /// Call [`load_env`] first to pick up a `.env` file.
    ///
    /// # Errors
    ///
    /// Fails when the client credentials are missing or a value cannot be
    /// parsed. The message names the offending key.
    ///
    /// # Example
    ///
    /// ```
    /// use likeify::{config::Config, error};
    ///
    /// let config = match Config::from_env() {
    ///     Ok(config) => config,
    ///     Err(e) => error!("{}", e),
    /// };
    /// ```
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Blank values count as unset. Every key except the client id and secret
    /// has a default, and trailing slashes are trimmed from the base and API
    /// URLs.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Returns the value for a key, or `None` when it is unset
    ///
    /// # Errors
    ///
    /// Fails on missing credentials, on numbers or booleans that do not parse
    /// and on a zero refresh interval.
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use likeify::config::{self, Config};
    ///
    /// let values = HashMap::from([
    ///     (config::CLIENT_ID, "client"),
    ///     (config::CLIENT_SECRET, "secret"),
    /// ]);
    /// let config = Config::from_lookup(|key| values.get(key).map(|v| v.to_string()))?;
    /// assert_eq!(config.web_port, 3000);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).ok_or_else(|| format!("{key} must be set"));
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let defaults = SchedulePolicy::default();
        let schedule = SchedulePolicy {
            interval: match get(REFRESH_INTERVAL_MS) {
                Some(v) => Duration::from_millis(parse_number(REFRESH_INTERVAL_MS, &v)?),
                None => defaults.interval,
            },
            user_delay: secs_or(get(USER_DELAY_SECS), USER_DELAY_SECS, defaults.user_delay)?,
            min_spacing: secs_or(
                get(MIN_RUN_SPACING_SECS),
                MIN_RUN_SPACING_SECS,
                defaults.min_spacing,
            )?,
            out_of_band_buffer: secs_or(
                get(SCHEDULE_BUFFER_SECS),
                SCHEDULE_BUFFER_SECS,
                defaults.out_of_band_buffer,
            )?,
        };

        if schedule.interval.is_zero() {
            return Err(format!("{REFRESH_INTERVAL_MS} must be greater than zero"));
        }

        let web_port = match get(WEB_PORT) {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .map_err(|e| format!("{WEB_PORT} is not a valid port ({v}): {e}"))?,
            None => 3000,
        };

        let public = match get(PLAYLIST_PUBLIC) {
            Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                other => return Err(format!("{PLAYLIST_PUBLIC} must be true or false, got {other}")),
            },
            None => true,
        };

        let sessions_path = match get(SESSIONS_PATH) {
            Some(p) => PathBuf::from(p),
            None => {
                let mut path = data_dir();
                path.push("sessions.json");
                path
            }
        };

        Ok(Self {
            client_id: required(CLIENT_ID)?,
            client_secret: required(CLIENT_SECRET)?,
            scope: or(SCOPE, DEFAULT_SCOPE),
            auth_url: or(AUTH_URL, "https://accounts.spotify.com/authorize"),
            token_url: or(TOKEN_URL, "https://accounts.spotify.com/api/token"),
            api_url: or(API_URL, "https://api.spotify.com/v1")
                .trim_end_matches('/')
                .to_string(),
            base_url: or(BASE_URL, "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            web_port,
            playlist: PlaylistDefaults {
                name: or(PLAYLIST_NAME, "Liked Songs"),
                description: or(PLAYLIST_DESCRIPTION, "Managed by Likeify."),
                public,
            },
            schedule,
            sessions_path,
        })
    }

    /// Redirect URI registered for the given route (`login` or `logout`).
    ///
    /// # Example
    ///
    /// ```
    /// assert_eq!(config.redirect_uri("login"), "http://localhost:3000/login");
    /// ```
    pub fn redirect_uri(&self, route: &str) -> String {
        format!("{}/{}", self.base_url, route)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, String> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("{key} is not a valid number ({value}): {e}"))
}

fn secs_or(value: Option<String>, key: &str, default: Duration) -> Result<Duration, String> {
    match value {
        Some(v) => Ok(Duration::from_secs(parse_number(key, &v)?)),
        None => Ok(default),
    }
}
