use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A natural key that the dimension lookup does not know about.
    #[error("No {table} row for natural key '{key}'")]
    MissingKey { table: &'static str, key: String },

    #[error("Line {line}: cannot parse {field} from '{value}'")]
    Parse {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("Unknown report: {0}")]
    UnknownReport(String),
}

impl EtlError {
    pub fn parse(line: usize, field: &'static str, value: impl Into<String>) -> Self {
        EtlError::Parse {
            line,
            field,
            value: value.into(),
        }
    }

    pub fn missing_key(table: &'static str, key: impl Into<String>) -> Self {
        EtlError::MissingKey {
            table,
            key: key.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
