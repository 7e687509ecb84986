//! Settings store
//!
//! Loads a node configuration file into a key/value store. The file format is
//! picked from the extension (TOML by default, YAML or JSON otherwise) and
//! `SLAVESRV_`-prefixed environment variables are layered on top.

use std::fs;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    value::Dict,
    Figment,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};

/// Prefix for environment overrides (`SLAVESRV_LOG__LEVEL` -> `log.level`)
pub const ENV_PREFIX: &str = "SLAVESRV_";

/// Process-wide settings loaded once at startup
#[derive(Debug)]
pub struct Settings {
    figment: Figment,
    path: PathBuf,
}

impl Settings {
    /// Load settings from `path`
    ///
    /// A missing or unreadable file is an [`Error::Io`]; content that does not
    /// parse as the detected format is an [`Error::Parse`].
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::from_read(path, e))?;

        let base = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Figment::from(Yaml::string(&content)),
            Some("json") => Figment::from(Json::string(&content)),
            _ => Figment::from(Toml::string(&content)),
        };
        let figment = base.merge(Env::prefixed(ENV_PREFIX).split("__"));

        // Extracting the root forces the provider to parse the content
        let root: Dict = figment
            .extract()
            .map_err(|e| Error::Parse(format!("{}: {}", path.display(), e)))?;
        for (key, value) in &root {
            debug!("settings: {} = {:?}", key, value);
        }

        Ok(Self {
            figment,
            path: path.to_path_buf(),
        })
    }

    /// File the settings were loaded from
    pub fn source_path(&self) -> &Path {
        &self.path
    }

    /// Whether a value exists at the dotted `key`
    pub fn contains(&self, key: &str) -> bool {
        self.figment.contains(key)
    }

    /// Typed value at the dotted `key`, `None` when absent
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        if !self.figment.contains(key) {
            return Ok(None);
        }
        self.figment
            .extract_inner::<T>(key)
            .map(Some)
            .map_err(|e| Error::Config(format!("{}: {}", key, e)))
    }

    /// Typed value at `key`, falling back to `default` when absent
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get(key)?.unwrap_or(default))
    }
}
