use std::path::Path;

use clap::{Args, ValueEnum};
use serde::Serialize;

use crate::{config::Config, tag, tasks::Tasks, Result};

#[derive(Debug, Default, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Format {
    /// A human readable table.
    #[default]
    Table,
    /// A single JSON object.
    Json,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    #[arg(long = "format", value_enum, default_value_t)]
    pub format: Format,
}

#[derive(Debug, Serialize)]
struct Info<'a> {
    container_name: &'a str,
    default_host: Option<&'a str>,
    host: Option<&'a str>,
    branch: String,
    branch_tag: String,
    parent_tag: &'static str,
    commit: String,
    clean: bool,
    template: &'a Path,
    dockerfile: &'a Path,
    tags: Vec<String>,
}

impl Info<'_> {
    fn rows(&self) -> [(&'static str, String); 11] {
        [
            ("container name", self.container_name.to_owned()),
            ("default host", self.default_host.unwrap_or_default().to_owned()),
            ("host", self.host.unwrap_or_default().to_owned()),
            ("branch", self.branch.clone()),
            ("branch tag", self.branch_tag.clone()),
            ("parent tag", self.parent_tag.to_owned()),
            ("commit", self.commit.clone()),
            ("clean", self.clean.to_string()),
            ("template", self.template.display().to_string()),
            ("dockerfile", self.dockerfile.display().to_string()),
            ("tags", self.tags.join("\n")),
        ]
    }
}

pub fn info(config: &Config, tasks: &Tasks, args: InfoArgs) -> Result<()> {
    use comfy_table::{Attribute, Cell, ContentArrangement, Table};

    let git = tasks.git();
    let branch = git.branch()?;
    let info = Info {
        container_name: config.container_name(),
        default_host: config.default_host(),
        host: config.host(),
        branch_tag: git.branch_tag()?,
        parent_tag: tag::parent_tag(&branch),
        branch,
        commit: git.commit_hash()?,
        clean: git.is_clean()?,
        template: tasks.template_path(),
        dockerfile: tasks.dockerfile_path(),
        tags: git.image_tags()?,
    };

    match args.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&info)?),
        Format::Table => {
            let mut table = Table::new();
            table
                .load_preset(comfy_table::presets::UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            for (name, value) in info.rows() {
                table.add_row([Cell::new(name).add_attribute(Attribute::Bold), Cell::new(value)]);
            }

            println!("{table}");
        }
    }

    Ok(())
}
