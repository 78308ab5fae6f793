//! Layered application configuration

use crate::PilotError;
use frame_capture::CaptureConfig;
use line_vision::SegmenterConfig;
use navigation::NavigationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use viewer_broadcast::BroadcastConfig;

/// Row ranges of the two analysis bands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandConfig {
    /// Upper band rows `[start, end)`
    pub upper: (usize, usize),
    /// Lower band rows `[start, end)`
    pub lower: (usize, usize),
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            upper: (0, 80),
            lower: (160, 240),
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub segmenter: SegmenterConfig,
    pub bands: BandConfig,
    pub navigation: NavigationConfig,
    pub broadcast: BroadcastConfig,
    /// CSV control-log output path
    pub log_path: String,
}

impl AppConfig {
    /// Build the layered configuration: struct defaults, then the optional
    /// TOML file on top. A missing path argument means defaults only; a
    /// present but broken file is an error (fatal at startup).
    pub fn load(path: Option<&Path>) -> Result<Self, PilotError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let snapshot = builder.build()?.try_deserialize()?;
        Ok(snapshot)
    }
}

/// Reloadable configuration snapshot.
///
/// `reload` re-runs the layered build; on failure the previous snapshot
/// stays in effect rather than a partial apply.
pub struct ConfigStore {
    path: Option<PathBuf>,
    current: Mutex<AppConfig>,
}

impl ConfigStore {
    pub fn new(initial: AppConfig, path: Option<PathBuf>) -> Self {
        Self {
            path,
            current: Mutex::new(initial),
        }
    }

    pub fn current(&self) -> AppConfig {
        match self.current.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn reload(&self) -> Result<(), PilotError> {
        match AppConfig::load(self.path.as_deref()) {
            Ok(fresh) => {
                match self.current.lock() {
                    Ok(mut guard) => *guard = fresh,
                    Err(poisoned) => *poisoned.into_inner() = fresh,
                }
                info!("configuration reloaded");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "reload failed; previous snapshot retained");
                Err(e)
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            segmenter: SegmenterConfig::default(),
            bands: BandConfig::default(),
            navigation: NavigationConfig::default(),
            broadcast: BroadcastConfig::default(),
            log_path: "control-log.csv".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load_without_file() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.capture.width, 320);
        assert_eq!(config.broadcast.port, 24000);
        assert_eq!(config.bands.lower, (160, 240));
    }

    #[test]
    fn test_reload_keeps_previous_on_failure() {
        let store = ConfigStore::new(
            AppConfig::default(),
            Some(PathBuf::from("/definitely/not/here.toml")),
        );
        assert!(store.reload().is_err());
        assert_eq!(store.current().capture.width, 320);
    }
}
