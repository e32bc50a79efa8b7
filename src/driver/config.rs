use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grammar::{FileResolver, STANDARD_GRAMMAR_ID};

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "scriptc.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// A compiler config file. Namely scriptc.toml
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logical id of the grammar documents are compiled against.
    pub grammar: Option<String>,
    /// Grammar files by logical id.
    pub grammars: BTreeMap<String, PathBuf>,
    pub output: Output,
}

/// Where and how compiled artifacts are written.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub format: OutputFormat,
    /// Directory artifacts are written to. Without it they go to stdout.
    pub directory: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human readable instruction listing.
    #[default]
    Listing,
    /// The artifact as JSON, for the interpreter.
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Listing => "lst",
            OutputFormat::Json => "json",
        }
    }
}

impl Config {
    /// Reads a config file. Relative paths in it are taken relative to the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&input).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or(Path::new("."));
        for grammar in config.grammars.values_mut() {
            *grammar = base.join(&*grammar);
        }
        if let Some(directory) = config.output.directory.as_mut() {
            *directory = base.join(&*directory);
        }

        tracing::debug!("loaded config {:?}: {:#?}", path, config);
        Ok(config)
    }

    /// Loads `scriptc.toml` from `dir` if there is one.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn grammar_id(&self) -> &str {
        self.grammar.as_deref().unwrap_or(STANDARD_GRAMMAR_ID)
    }

    pub fn resolver(&self) -> FileResolver {
        self.grammars
            .iter()
            .map(|(id, path)| (id.clone(), path.clone()))
            .collect()
    }
}
