//! # Config Loader
//!
//! Locates configuration files on disk and deserializes JSON content into
//! any `serde` type.
//!
//! ```no_run
//! use config_loader::{find_config_file, load_json};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Settings {
//!     threshold: f64,
//! }
//!
//! let path = find_config_file("codec_test.json", "CODEC_TEST_CONFIG")?;
//! let settings: Settings = load_json(&path)?;
//! # Ok::<(), config_loader::ConfigError>(())
//! ```

pub mod error;

pub use error::{ConfigError, Result};

use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads a configuration file into a `String` without interpreting it.
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))
}

/// Reads a JSON configuration file and deserializes it into `T`.
///
/// Missing fields are only accepted when `T` defaults them (`#[serde(default)]`).
pub fn load_json<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = load_config_file(path)?;
    parse_json(&content, &path.display().to_string())
}

/// Deserializes JSON text; `origin` names the source in error messages.
pub fn parse_json<T: DeserializeOwned>(content: &str, origin: &str) -> Result<T> {
    serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
        path: origin.to_string(),
        message: e.to_string(),
    })
}

/// Searches common locations for a configuration file.
///
/// Order:
/// 1. the path held by the environment variable `env_var` (if set and present)
/// 2. `./config/{filename}`
/// 3. `./{filename}`
pub fn find_config_file(filename: &str, env_var: &str) -> Result<PathBuf> {
    if let Ok(path) = env::var(env_var) {
        let path_buf = PathBuf::from(&path);
        if path_buf.exists() {
            return Ok(path_buf);
        }
    }

    let config_dir = PathBuf::from("./config").join(filename);
    if config_dir.exists() {
        return Ok(config_dir);
    }

    let current_dir = PathBuf::from("./").join(filename);
    if current_dir.exists() {
        return Ok(current_dir);
    }

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found. Searched: ${}, ./config/{}, ./{}",
        filename, env_var, filename, filename
    )))
}
