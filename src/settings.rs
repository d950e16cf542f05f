//! Layered settings: built-in defaults, then an optional `shelfkeeper.toml`
//! (or an explicitly named file), then `SHELFKEEPER_*` environment variables.
//! Command line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::password::{DEFAULT_ITERATIONS, DEFAULT_SALT_LENGTH, Pbkdf2Hasher};

pub const DEFAULT_DATABASE: &str = "~/.local/lib/calibre-web/app.db";
pub const DEFAULT_TEMPLATE_NICKNAME: &str = "template_account";
const FILE_NAME: &str = "shelfkeeper";
const ENV_PREFIX: &str = "SHELFKEEPER";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: String,
    pub template_nickname: String,
    pub hash_iterations: u32,
    pub salt_length: usize,
    pub backup_pages: i32,
    pub log_level: String,
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("database", DEFAULT_DATABASE)?
            .set_default("template_nickname", DEFAULT_TEMPLATE_NICKNAME)?
            .set_default("hash_iterations", i64::from(DEFAULT_ITERATIONS))?
            .set_default("salt_length", DEFAULT_SALT_LENGTH as i64)?
            .set_default("backup_pages", 1i64)?
            .set_default("log_level", "info")?;
        builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(FILE_NAME).required(false)),
        };
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn database_path(&self) -> PathBuf {
        expand_path(&self.database)
    }

    pub fn hasher(&self) -> Pbkdf2Hasher {
        Pbkdf2Hasher::new(self.hash_iterations, self.salt_length)
    }
}

/// Expands a leading `~` to the home directory and makes the path absolute.
pub fn expand_path(raw: &str) -> PathBuf {
    let expanded = match (raw.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with(['/', '\\']) => {
            home.join(rest.trim_start_matches(['/', '\\']))
        }
        _ => PathBuf::from(raw),
    };
    std::path::absolute(&expanded).unwrap_or(expanded)
}
