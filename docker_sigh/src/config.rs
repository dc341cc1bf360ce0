use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::hostname::is_valid_hostname;

/// Name of the configuration file looked up in the current directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "docker-sigh.yaml";

/// Environment variable that overrides the configured default host.
pub const DOCKER_REMOTE_ENV: &str = "DOCKER_REMOTE";

/// `<owner>/<name>`. The owner follows docker's path component grammar: lowercase alphanumeric
/// runs joined by `.`, `_`, `__` or one or more `-`.
const CONTAINER_NAME_PATTERN: &str = r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*/[a-zA-Z0-9_.-]+$";

static CONTAINER_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CONTAINER_NAME_PATTERN).unwrap());

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("container_name must be set.")]
    MissingContainerName,

    #[error("container_name {0:?} must match regex '{pattern}'.", pattern = CONTAINER_NAME_PATTERN)]
    InvalidContainerName(String),

    #[error("If set, default_host must be a valid hostname, got {0:?}.")]
    InvalidDefaultHost(String),

    #[error("If set, the {env} env var must be a valid hostname, got {0:?}.", env = DOCKER_REMOTE_ENV)]
    InvalidDockerRemote(String),

    #[error("repository_root must be set.")]
    MissingRepositoryRoot,

    #[error("repository_root {0:?} must exist and be a non-bare Git root.")]
    NotAGitRoot(PathBuf),
}

/// Unvalidated settings as read from the configuration file and the command line.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Options {
    pub container_name: Option<String>,
    pub repository_root: Option<PathBuf>,
    pub default_host: Option<String>,
}

impl Options {
    /// Reads options from a YAML file. A relative `repository_root` is resolved against the
    /// directory containing the file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut options: Options =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_owned(),
                source,
            })?;

        if let (Some(root), Some(dir)) = (options.repository_root.as_mut(), path.parent()) {
            if root.is_relative() {
                *root = dir.join(&*root);
            }
        }

        Ok(options)
    }

    /// Like [`Options::from_file`], but returns the default options when the file does not exist.
    pub fn from_optional_file(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            debug!("no config file at {path:?}, using defaults");
            Ok(Self::default())
        }
    }

    /// Returns options where every field set in `overrides` replaces the one in `self`.
    pub fn merge(self, overrides: Options) -> Options {
        Options {
            container_name: overrides.container_name.or(self.container_name),
            repository_root: overrides.repository_root.or(self.repository_root),
            default_host: overrides.default_host.or(self.default_host),
        }
    }
}

/// Validated configuration. Construct it with [`Config::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    container_name: String,
    repository_root: PathBuf,
    default_host: Option<String>,
    host: Option<String>,
}

impl Config {
    /// Validates `options`, failing on the first violated condition. `docker_remote` is the value
    /// of the `DOCKER_REMOTE` environment variable and takes precedence over `default_host`.
    pub fn new(options: Options, docker_remote: Option<String>) -> Result<Self, ConfigError> {
        debug!("Validating options: {options:?}");

        let Options {
            container_name,
            repository_root,
            default_host,
        } = options;

        let container_name = container_name.ok_or(ConfigError::MissingContainerName)?;
        if !CONTAINER_NAME_REGEX.is_match(&container_name) {
            return Err(ConfigError::InvalidContainerName(container_name));
        }

        if let Some(host) = default_host.as_deref() {
            if !is_valid_hostname(host) {
                return Err(ConfigError::InvalidDefaultHost(host.to_owned()));
            }
        }

        if let Some(host) = docker_remote.as_deref() {
            if !is_valid_hostname(host) {
                return Err(ConfigError::InvalidDockerRemote(host.to_owned()));
            }
        }

        let host = docker_remote.or_else(|| default_host.clone());

        let repository_root = repository_root.ok_or(ConfigError::MissingRepositoryRoot)?;
        if !repository_root.join(".git").is_dir() {
            return Err(ConfigError::NotAGitRoot(repository_root));
        }

        debug!("Options successfully validated.");

        Ok(Config {
            container_name,
            repository_root,
            default_host,
            host,
        })
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn repository_root(&self) -> &Path {
        &self.repository_root
    }

    pub fn default_host(&self) -> Option<&str> {
        self.default_host.as_deref()
    }

    /// The registry host the parent image is pulled from, if any.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Returns `<container_name>:<tag>`.
    pub fn image(&self, tag: &str) -> String {
        format!("{name}:{tag}", name = self.container_name)
    }
}
