//! Schema tool configuration.
//!
//! The static part (schema location, output directory, dialect) lives in
//! `scribe.toml`. Credentials are never stored there: they are read from the
//! process environment each time a tool runs.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DATABASE_URL_VAR: &str = "TURSO_DATABASE_URL";
pub const AUTH_TOKEN_VAR: &str = "TURSO_AUTH_TOKEN";

const REMOTE_SCHEMES: &[&str] = &["libsql://", "https://", "http://", "wss://", "ws://"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingVar(&'static str),

    #[error("unsupported database url: {0}")]
    UnsupportedUrl(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Turso,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where the table declarations live.
    pub schema: PathBuf,
    /// Output directory for generated migration files.
    pub out: PathBuf,
    pub dialect: Dialect,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: PathBuf::from("crates/scribe-db/src/schema.rs"),
            out: PathBuf::from("migrations"),
            dialect: Dialect::default(),
        }
    }
}

impl Config {
    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub url: String,
    pub auth_token: Option<String>,
}

// Keeps the token out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v: &String| !v.trim().is_empty());
        let url = non_empty(DATABASE_URL_VAR).ok_or(ConfigError::MissingVar(DATABASE_URL_VAR))?;
        Ok(Self {
            url,
            auth_token: non_empty(AUTH_TOKEN_VAR),
        })
    }

    pub fn target(&self) -> Result<Target, ConfigError> {
        Target::parse(&self.url)
    }
}

/// Where a database url points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Memory,
    File(PathBuf),
    Remote(String),
}

impl Target {
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ConfigError::UnsupportedUrl(url.to_string()));
        }
        if url == ":memory:" || url == "file::memory:" {
            return Ok(Self::Memory);
        }
        if REMOTE_SCHEMES.iter().any(|s| url.starts_with(s)) {
            return Ok(Self::Remote(url.to_string()));
        }
        if let Some(path) = url.strip_prefix("file:") {
            let path = path.strip_prefix("//").unwrap_or(path);
            return Ok(Self::File(PathBuf::from(path)));
        }
        if url.contains("://") {
            return Err(ConfigError::UnsupportedUrl(url.to_string()));
        }
        Ok(Self::File(PathBuf::from(url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn url_is_required() {
        let err = Credentials::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(DATABASE_URL_VAR)));

        let err = Credentials::from_lookup(lookup(&[(DATABASE_URL_VAR, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));
    }

    #[test]
    fn token_is_optional() {
        let creds =
            Credentials::from_lookup(lookup(&[(DATABASE_URL_VAR, "libsql://db.turso.io")])).unwrap();
        assert_eq!(creds.auth_token, None);

        let creds = Credentials::from_lookup(lookup(&[
            (DATABASE_URL_VAR, "libsql://db.turso.io"),
            (AUTH_TOKEN_VAR, "secret"),
        ]))
        .unwrap();
        assert_eq!(creds.auth_token.as_deref(), Some("secret"));
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[test]
    fn classifies_targets() {
        assert_eq!(Target::parse(":memory:").unwrap(), Target::Memory);
        assert_eq!(
            Target::parse("file:local.db").unwrap(),
            Target::File(PathBuf::from("local.db"))
        );
        assert_eq!(
            Target::parse("data/app.db").unwrap(),
            Target::File(PathBuf::from("data/app.db"))
        );
        assert!(matches!(
            Target::parse("libsql://db-org.turso.io").unwrap(),
            Target::Remote(_)
        ));
        assert!(matches!(
            Target::parse("postgres://localhost/db"),
            Err(ConfigError::UnsupportedUrl(_))
        ));
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("scribe.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn loads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scribe.toml");
        std::fs::write(&path, "out = \"sql\"\ndialect = \"sqlite\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.out, PathBuf::from("sql"));
        assert_eq!(config.dialect, Dialect::Sqlite);
        assert_eq!(config.schema, Config::default().schema);

        std::fs::write(&path, "outdir = \"x\"\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }
}
