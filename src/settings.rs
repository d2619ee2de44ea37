use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AspectRatio;

/// The single persisted key: the last-selected aspect-ratio label.
#[derive(Debug, Serialize, Deserialize)]
struct Persisted {
    aspect_ratio: String,
}

/// Tiny settings store, read once at startup and written on every change.
/// Anything unreadable falls back to defaults without complaint.
pub struct Settings {
    path: PathBuf,
}

impl Settings {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location: `.binary-lens.json` in the home directory, or the
    /// working directory when no home is set.
    pub fn default_path() -> PathBuf {
        std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_default()
            .join(".binary-lens.json")
    }

    pub fn load_aspect_ratio(&self) -> Option<AspectRatio> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let persisted: Persisted = serde_json::from_str(&raw).ok()?;
        match AspectRatio::parse(&persisted.aspect_ratio) {
            Ok(ratio) => {
                debug!(ratio = %persisted.aspect_ratio, "restored aspect ratio");
                Some(ratio)
            }
            Err(_) => None,
        }
    }

    /// Persist the ratio label. Failure is logged, never fatal.
    pub fn store_aspect_ratio(&self, ratio: &AspectRatio) {
        let persisted = Persisted {
            aspect_ratio: ratio.label().to_string(),
        };
        let json = match serde_json::to_string(&persisted) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "could not serialize settings");
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, json) {
            warn!(path = %self.path.display(), error = %e, "could not write settings");
        }
    }
}
