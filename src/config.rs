use crate::models::AppConfig;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, String> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

    parse_config(&contents)
}

/// Parse and validate YAML configuration
pub fn parse_config(contents: &str) -> Result<AppConfig, String> {
    // An empty file means "all defaults"
    let config: AppConfig = if contents.trim().is_empty() {
        AppConfig::default()
    } else {
        serde_yaml::from_str(contents).map_err(|e| format!("Failed to parse YAML config: {}", e))?
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from CONFIG_PATH or the usual file names, then apply
/// environment overrides. Defaults are used only when no file exists; a file
/// that is present but fails to load is an error.
pub fn load_config_with_fallback() -> Result<AppConfig, String> {
    let config_path = std::env::var("CONFIG_PATH").ok();
    let mut config = find_config_file(config_path.as_deref(), Path::new("."))?.unwrap_or_else(|| {
        warn!("No configuration file found, using defaults (in-memory auth provider)");
        AppConfig::default()
    });

    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;

    info!(
        "Configuration ready: listening on {}:{}, auth provider '{}'",
        config.server.host,
        config.server.port,
        match &config.auth_provider {
            crate::models::AuthProviderConfig::Hosted(_) => "hosted",
            crate::models::AuthProviderConfig::Memory(_) => "memory",
        }
    );

    Ok(config)
}

/// Look for a config file: an explicit `config_path` must load, otherwise
/// `config.yaml`/`config.yml` under `search_dir` are tried.
fn find_config_file(
    config_path: Option<&str>,
    search_dir: &Path,
) -> Result<Option<AppConfig>, String> {
    if let Some(config_path) = config_path {
        return load_config(config_path)
            .map(Some)
            .map_err(|e| format!("Failed to load config from CONFIG_PATH ({}): {}", config_path, e));
    }

    for name in ["config.yaml", "config.yml"] {
        let path = search_dir.join(name);
        if path.exists() {
            return load_config(&path)
                .map(Some)
                .map_err(|e| format!("Failed to load config from '{}': {}", path.display(), e));
        }
    }

    Ok(None)
}
