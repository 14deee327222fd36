use std::env;
use std::fs;
use std::path::PathBuf;

use crate::catalog::Catalog;
use crate::error::Result;

pub const DB_ENV: &str = "LYRICLOOP_DB";
pub const CATALOG_ENV: &str = "LYRICLOOP_CATALOG";
const DEFAULT_DB_NAME: &str = "lyricloop.db";

/// Runtime settings: command-line flags first, then environment, then defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    /// `None` uses the built-in catalog
    pub catalog_path: Option<PathBuf>,
    pub sound: bool,
}

impl Config {
    pub fn resolve(db: Option<PathBuf>, catalog: Option<PathBuf>, sound: bool) -> Self {
        Self::resolve_with(db, catalog, sound, |key| env::var(key).ok())
    }

    fn resolve_with<F>(db: Option<PathBuf>, catalog: Option<PathBuf>, sound: bool, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = db
            .or_else(|| var(DB_ENV).map(PathBuf::from))
            .unwrap_or_else(default_db_path);
        let catalog_path = catalog.or_else(|| var(CATALOG_ENV).map(PathBuf::from));

        Self {
            db_path,
            catalog_path,
            sound,
        }
    }

    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    pub fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog_path {
            Some(path) => {
                log::info!("loading catalog from {}", path.display());
                Catalog::load(path)
            }
            None => Catalog::builtin(),
        }
    }
}

pub fn default_db_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lyricloop")
        .join(DEFAULT_DB_NAME)
}
