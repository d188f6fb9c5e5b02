use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Resolve `<crate_dir>/config`, whether we run from the workspace root or
/// from inside the crate directory.
pub fn configuration_directory(crate_dir: &str) -> Result<PathBuf, AppError> {
    let base_path = std::env::current_dir()?;

    if base_path.ends_with(crate_dir) {
        Ok(base_path.join("config"))
    } else {
        Ok(base_path.join(crate_dir).join("config"))
    }
}

/// Load settings from `base.yaml` in `config_dir` (optional) overlaid with
/// `APP_` environment variables, `__` separating nested keys.
///
/// `APP_API__BASE_URL=http://host/api/` sets `api.base_url`.
pub fn load_settings<T: DeserializeOwned>(config_dir: &Path) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let settings = Cfg::builder()
        .add_source(File::from(config_dir.join("base.yaml")).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
