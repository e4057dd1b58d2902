use crate::constants::{
    CONFIG_FILE, DEFAULT_DATABASE_PATH, DEFAULT_INPUT_PATH, DEFAULT_LOG_DIR, DEFAULT_LOG_FILE,
    DEFAULT_SERVER_PORT,
};
use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Tab-delimited sales extract
    pub input_path: PathBuf,
    /// SQLite file holding the normalized schema
    pub database_path: PathBuf,
    /// Delete the store file before a run
    pub reset_store: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            reset_store: true,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Connection string handed over by the front-end. May carry credentials.
    pub database_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            database_url: None,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl ServerConfig {
    /// Store file the query surface should read from: `database_url` when set,
    /// otherwise the pipeline's database path.
    pub fn store_path(&self, fallback: &Path) -> Result<PathBuf> {
        match &self.database_url {
            Some(url) => resolve_store_path(url),
            None => Ok(fallback.to_path_buf()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_LOG_DIR),
            file_name: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory if present, then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = if Path::new(CONFIG_FILE).exists() {
            Self::from_path(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SALES_INPUT_PATH") {
            self.pipeline.input_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SALES_DATABASE_PATH") {
            self.pipeline.database_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SALES_SERVER_PORT") {
            self.server.port = v.trim().parse().map_err(|e| {
                EtlError::Config(format!("SALES_SERVER_PORT '{}' is not a port: {}", v, e))
            })?;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.server.database_url = Some(v);
            }
        }
        Ok(())
    }
}

/// Map a front-end connection string onto the SQLite file it names.
pub fn resolve_store_path(url: &str) -> Result<PathBuf> {
    let url = url.trim();
    let path = if let Some(rest) = url.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = url.strip_prefix("sqlite:") {
        rest
    } else if let Some(rest) = url.strip_prefix("file:") {
        rest
    } else if url.contains("://") {
        return Err(EtlError::Config(
            "DATABASE_URL must point at a SQLite file".to_string(),
        ));
    } else {
        url
    };

    // Drop any URI query string such as `?mode=ro`
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() {
        return Err(EtlError::Config("DATABASE_URL has no file path".to_string()));
    }
    Ok(PathBuf::from(path))
}
