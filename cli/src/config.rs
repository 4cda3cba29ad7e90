use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "kunja";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Contents of `config.toml`.
///
/// The same struct carries the effective settings once environment
/// variables and command line flags are layered on top.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_project: Option<i64>,
}

/// Values given on the command line. They win over env and file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Config {
    /// Layer `KUNJA_USERNAME`, `KUNJA_PASSWORD` and `KUNJA_BASEURL` on top.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(v) = non_empty("KUNJA_USERNAME") {
            self.username = v;
        }
        if let Some(v) = non_empty("KUNJA_PASSWORD") {
            self.password = v;
        }
        if let Some(v) = non_empty("KUNJA_BASEURL") {
            self.base_url = v;
        }
        self
    }

    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(v) = overrides.base_url.clone() {
            self.base_url = v;
        }
        if let Some(v) = overrides.username.clone() {
            self.username = v;
        }
        if let Some(v) = overrides.password.clone() {
            self.password = v;
        }
        self
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    // KUNJA_CONFIG_PATH overrides the default config directory
    if let Ok(path) = std::env::var("KUNJA_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }
    if let Some(dir) = dirs::config_dir() {
        return Ok(dir.join(APP_NAME));
    }
    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .context("Could not determine config directory")
}

/// `~/.kunja`, where older releases kept their config.
pub fn legacy_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(format!(".{}", APP_NAME)))
}

pub fn get_config_file() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the config file, creating it on first use.
pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    let legacy_dir = legacy_config_dir();
    let config_file = ensure_config_file(&config_dir, legacy_dir.as_deref())?;
    load_config_from(&config_file)
}

pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(&get_config_file()?, config)
}

/// Make sure `<dir>/config.toml` exists. A legacy file is copied over when
/// there is one, otherwise an empty file is created.
pub fn ensure_config_file(config_dir: &Path, legacy_dir: Option<&Path>) -> Result<PathBuf> {
    let config_file = config_dir.join(CONFIG_FILE_NAME);
    if config_file.exists() {
        return Ok(config_file);
    }

    create_config_dir(config_dir)?;

    let legacy_file = legacy_dir
        .filter(|dir| *dir != config_dir)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .filter(|file| file.exists());

    match legacy_file {
        Some(legacy) => {
            let contents = fs::read_to_string(&legacy)
                .with_context(|| format!("Failed to read legacy config file: {}", legacy.display()))?;
            write_private(&config_file, &contents)?;
            tracing::info!("Copied legacy config {} to {}", legacy.display(), config_file.display());
        }
        None => {
            write_private(&config_file, "")?;
            eprintln!("Created config file at {}", config_file.display());
        }
    }
    Ok(config_file)
}

pub fn load_config_from(config_file: &Path) -> Result<Config> {
    let contents = fs::read_to_string(config_file)
        .with_context(|| format!("Failed to read config file: {}", config_file.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", config_file.display()))
}

pub fn save_config_to(config_file: &Path, config: &Config) -> Result<()> {
    if let Some(dir) = config_file.parent() {
        create_config_dir(dir)?;
    }
    let contents = toml::to_string_pretty(config)?;
    write_private(config_file, &contents)
}

fn create_config_dir(config_dir: &Path) -> Result<()> {
    if config_dir.exists() {
        return Ok(());
    }
    fs::create_dir_all(config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o700);
        fs::set_permissions(config_dir, perms)?;
    }
    Ok(())
}

fn write_private(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

pub fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "base_url" => Some(config.base_url.clone()),
        "username" => Some(config.username.clone()),
        "password" => Some("********".to_string()), // Don't expose password
        "token" => Some(if config.token.is_empty() { String::new() } else { "********".to_string() }),
        "default_project" => Some(config.default_project.map(|id| id.to_string()).unwrap_or_default()),
        _ => None,
    }
}

pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "base_url" => config.base_url = value.to_string(),
        "username" => config.username = value.to_string(),
        "password" => config.password = value.to_string(),
        "token" => config.token = value.to_string(),
        "default_project" => {
            config.default_project = if value.is_empty() {
                None
            } else {
                Some(value.parse().with_context(|| format!("Invalid project ID: {}", value))?)
            }
        }
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
    Ok(())
}
