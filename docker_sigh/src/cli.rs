mod info;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use constcat::concat;
use log::debug;

use crate::{
    config::{Config, Options, DEFAULT_CONFIG_FILE, DOCKER_REMOTE_ENV},
    docker::Docker,
    tasks::{Task, Tasks},
    template::{DOCKERFILE, TEMPLATE_FILE},
    Result,
};

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long = "config", global = true, help = concat!("Path to a YAML configuration file. Defaults to \"", DEFAULT_CONFIG_FILE, "\" in the current directory, if present."))]
    config: Option<PathBuf>,

    /// Name of the image to build, as `owner/name`.
    #[arg(long = "container-name", global = true)]
    container_name: Option<String>,

    /// Root of the git checkout to build. Defaults to the current directory.
    #[arg(long = "repository-root", global = true)]
    repository_root: Option<PathBuf>,

    #[arg(long = "default-host", global = true, help = concat!("Registry host of the parent image, unless overridden by the ", DOCKER_REMOTE_ENV, " environment variable."))]
    default_host: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = concat!("Render \"", TEMPLATE_FILE, "\" into \"", DOCKERFILE, "\""))]
    Template,

    /// Build the image and tag it with the commit hash and branch name
    Build,

    #[command(about = concat!("Delete the generated \"", DOCKERFILE, "\""))]
    Clean,

    /// Push the branch and commit hash tags of a previously built image
    Push,

    /// Run template, build and clean in order
    Go,

    /// Show the configuration and repository state the tasks would use
    Info(info::InfoArgs),
}

impl Cli {
    /// Merges the configuration file with the flags passed on the command line.
    fn options(&self) -> Result<Options> {
        let file = match &self.config {
            Some(path) => Options::from_file(path)?,
            None => Options::from_optional_file(DEFAULT_CONFIG_FILE.as_ref())?,
        };

        let mut options = file.merge(Options {
            container_name: self.container_name.clone(),
            repository_root: self.repository_root.clone(),
            default_host: self.default_host.clone(),
        });
        options
            .repository_root
            .get_or_insert_with(|| PathBuf::from("."));

        Ok(options)
    }

    pub fn run(self) -> Result<()> {
        let docker_remote = std::env::var(DOCKER_REMOTE_ENV)
            .ok()
            .filter(|value| !value.is_empty());
        if let Some(value) = docker_remote.as_deref() {
            debug!("{DOCKER_REMOTE_ENV} is set to {value:?}");
        }

        let config = Config::new(self.options()?, docker_remote)?;
        let tasks = Tasks::new(&config, &Docker);

        match self.command {
            Commands::Template => tasks.run(Task::Template)?,
            Commands::Build => tasks.run(Task::Build)?,
            Commands::Clean => tasks.run(Task::Clean)?,
            Commands::Push => tasks.run(Task::Push)?,
            Commands::Go => tasks.run(Task::Go)?,
            Commands::Info(args) => info::info(&config, &tasks, args)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "docker-sigh",
            "go",
            "--container-name",
            "acme/app",
            "--repository-root",
            "/srv/app",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Go));
        assert_eq!(cli.container_name.as_deref(), Some("acme/app"));
        assert_eq!(cli.repository_root, Some(PathBuf::from("/srv/app")));
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(
            &path,
            "container_name: acme/from-file\ndefault_host: registry.example.com\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "docker-sigh",
            "--config",
            path.to_str().unwrap(),
            "--container-name",
            "acme/from-flag",
            "build",
        ])
        .unwrap();

        assert_eq!(
            cli.options().unwrap(),
            Options {
                container_name: Some("acme/from-flag".to_string()),
                repository_root: Some(PathBuf::from(".")),
                default_host: Some("registry.example.com".to_string()),
            }
        );
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yaml");
        let cli = Cli::try_parse_from(["docker-sigh", "--config", path.to_str().unwrap(), "clean"])
            .unwrap();
        assert!(cli.options().is_err());
    }
}
