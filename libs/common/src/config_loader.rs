//! Layered configuration loading
//!
//! Sources merge in increasing priority:
//! 1. `T::default()`
//! 2. `config/{service}.yaml` in the working directory, or an explicit file
//! 3. Environment variables prefixed `{SERVICE}_`, nested with `__`
//!    (e.g. `REGSRV_DATABASE__PATH`)

use crate::{Error, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default location of a service's YAML file
pub fn default_config_path(service_name: &str) -> PathBuf {
    PathBuf::from("config").join(format!("{}.yaml", service_name))
}

/// Build the figment for a service without extracting it
pub fn figment_for<T>(service_name: &str, config_file: Option<&Path>) -> Figment
where
    T: Serialize + Default,
{
    let file = config_file
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_config_path(service_name));
    debug!("Config file candidate: {}", file.display());

    Figment::from(Serialized::defaults(T::default()))
        .merge(Yaml::file(file))
        .merge(Env::prefixed(&format!("{}_", service_name.to_uppercase())).split("__"))
}

/// Load configuration for a service
///
/// An explicit `config_file` that does not exist is an error; the default
/// location is optional.
pub fn load_config<T>(service_name: &str, config_file: Option<&Path>) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Serialize + Default,
{
    if let Some(path) = config_file {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        info!("Loading configuration from {}", path.display());
    }

    figment_for::<T>(service_name, config_file)
        .extract()
        .map_err(|e| Error::Config(format!("Failed to load configuration: {}", e)))
}
