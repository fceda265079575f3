//! Likeify Library
//!
//! This library keeps the liked songs of every signed-in Spotify user mirrored
//! into a dedicated playlist. A background scheduler walks all enabled users on
//! a fixed period, keeps their credentials alive and rebuilds their mirror
//! playlist from the current liked-songs set.
//!
//! # Modules
//!
//! - `api` - HTTP handlers for the login/logout OAuth dance
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `management` - Credential store and session lifecycle
//! - `server` - HTTP server hosting the `api` handlers
//! - `spotify` - Spotify Web API client and rate-limited transport
//! - `sync` - Playlist reconciliation and the sync scheduler
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use likeify::{config, cli};
//!
//! #[tokio::main]
//! async fn main() -> likeify::Res<()> {
//!     config::load_env().await?;
//!     cli::sync(None).await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod management;
pub mod server;
pub mod spotify;
pub mod sync;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Used by the plumbing around the core (startup, CLI commands, the web
/// server) where a boxed error is all the caller needs. Components with
/// domain-specific failure handling expose their own error enums instead.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Timestamp prefix used by the logging macros.
#[doc(hidden)]
pub fn log_stamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Prints an informational message with a blue bullet point.
///
/// Each line starts with a UTC timestamp followed by a blue "o" indicator.
/// Used for progress and status lines of a sync cycle.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// info!("Starting sync for user {}", user_id);
/// info!("Fetched {} liked songs", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("{} [{}] {}", $crate::log_stamp(), "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// success!("Playlist {} rebuilt with {} tracks", playlist_id, count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("{} [{}] {}", $crate::log_stamp(), "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable situations such as skipped users, rate limiting or a
/// playlist that had to be recreated.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// warning!("Rate limited, retrying in {}s", secs);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("{} [{}] {}", $crate::log_stamp(), "!".yellow().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red cross to stderr and keeps running.
///
/// The daemon never stops because a single user failed. This is the macro for
/// remote failures, store write failures and anything else that only ends the
/// current step.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// failure!("Failed to add batch {}/{}: {}", index, total, err);
/// ```
#[macro_export]
macro_rules! failure {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("{} [{}] {}", $crate::log_stamp(), "x".red().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Behavior
///
/// This macro will cause the program to exit immediately after printing
/// the error message. It should only be used for fatal errors where
/// recovery is not possible, such as missing configuration at startup.
///
/// # Example
///
/// ```
/// error!("Missing required environment variable: {}", var_name);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("{} [{}] {}", $crate::log_stamp(), "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}
