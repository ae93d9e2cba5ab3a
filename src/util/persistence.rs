use std::fs;
use std::io;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde_json::Error as SerdeError;
use tracing::warn;

use crate::domain::session::SavedRoute;
use crate::domain::settings::SearchSettings;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "CargoRoutePlanner";
const APP_NAME: &str = "CargoRoutePlanner";
const ROUTE_FILE: &str = "multihop_route_cache.json";
const SETTINGS_FILE: &str = "settings.json";

/// On-disk home of the last completed multi-hop route.
#[derive(Clone, Debug)]
pub struct RouteStore {
    path: PathBuf,
}

impl RouteStore {
    /// Store backed by an explicit file path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the platform config location.
    pub fn default_location() -> Result<Self, PersistSaveError> {
        let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
            .ok_or(PersistSaveError::StorageUnavailable)?;
        Ok(Self {
            path: dirs.config_dir().join(ROUTE_FILE),
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn save(&self, route: &SavedRoute) -> Result<(), PersistSaveError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(route)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Read the saved route, if any. A file that no longer parses is deleted
    /// so it cannot shadow future saves.
    pub fn load(&self) -> Option<SavedRoute> {
        let data = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&data) {
            Ok(route) => Some(route),
            Err(error) => {
                warn!(path = %self.path.display(), %error, "discarding unreadable route file");
                let _ = fs::remove_file(&self.path);
                None
            }
        }
    }

    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error),
            _ => Ok(()),
        }
    }
}

/// Read search settings, falling back to defaults when the file is missing
/// or unreadable.
pub fn load_settings(path: &std::path::Path) -> SearchSettings {
    fs::read_to_string(path)
        .ok()
        .and_then(|data| serde_json::from_str(&data).ok())
        .unwrap_or_default()
}

pub fn save_settings(
    path: &std::path::Path,
    settings: &SearchSettings,
) -> Result<(), PersistSaveError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}

/// Settings file at the platform config location.
pub fn default_settings_path() -> Result<PathBuf, PersistSaveError> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or(PersistSaveError::StorageUnavailable)?;
    Ok(dirs.config_dir().join(SETTINGS_FILE))
}

#[derive(Debug, thiserror::Error)]
pub enum PersistSaveError {
    #[error("storage directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] SerdeError),
}
