use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use constcat::concat;
use log::debug;
use serde::Serialize;
use tera::{Context, Tera, Value};

pub const DOCKERFILE: &str = "Dockerfile";
pub const TEMPLATE_SUFFIX: &str = ".template.erb";
pub const TEMPLATE_FILE: &str = concat!(DOCKERFILE, TEMPLATE_SUFFIX);

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("'{}' must exist.", .0.display())]
    Missing(PathBuf),

    #[error("failed to read template {path:?}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to render template {path:?}")]
    Render {
        path: PathBuf,
        source: tera::Error,
    },

    #[error("failed to write {path:?}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Values available to a Dockerfile template.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext<'a> {
    pub host: Option<&'a str>,
    pub parent_tag: &'a str,
}

impl TemplateContext<'_> {
    /// Returns the `FROM` instruction for `image` at the parent tag, pulled from `host` when set.
    pub fn from_directive(&self, image: &str) -> String {
        match self.host {
            Some(host) => format!("FROM {host}/{image}:{tag}", tag = self.parent_tag),
            None => format!("FROM {image}:{tag}", tag = self.parent_tag),
        }
    }
}

/// Template function `from_directive(image="owner/name")`.
struct FromDirective {
    host: Option<String>,
    parent_tag: String,
}

impl tera::Function for FromDirective {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let image = match args.get("image") {
            Some(Value::String(image)) => image,
            Some(_) => return Err("from_directive: argument `image` must be a string".into()),
            None => return Err("from_directive: missing argument `image`".into()),
        };
        let context = TemplateContext {
            host: self.host.as_deref(),
            parent_tag: &self.parent_tag,
        };
        Ok(Value::String(context.from_directive(image)))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Returns the path of the Dockerfile generated from `template`: the `.template.erb` suffix of
/// the file name is dropped, so `app/Dockerfile.template.erb` becomes `app/Dockerfile`.
pub fn dockerfile_path(template: &Path) -> PathBuf {
    match template
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(TEMPLATE_SUFFIX))
    {
        Some(stem) if !stem.is_empty() => template.with_file_name(stem),
        _ => template.with_file_name(DOCKERFILE),
    }
}

/// Renders template `source` against `context`. `name` identifies the template in errors.
pub fn render(name: &str, source: &str, context: &TemplateContext) -> tera::Result<String> {
    let mut tera = Tera::default();
    tera.add_raw_template(name, source)?;
    tera.register_function(
        "from_directive",
        FromDirective {
            host: context.host.map(str::to_owned),
            parent_tag: context.parent_tag.to_owned(),
        },
    );
    tera.render(name, &Context::from_serialize(context)?)
}

/// Renders the template at `template` and writes the result to `output`.
pub fn render_file(
    template: &Path,
    output: &Path,
    context: &TemplateContext,
) -> Result<(), TemplateError> {
    if !template.is_file() {
        return Err(TemplateError::Missing(template.to_owned()));
    }

    let source = std::fs::read_to_string(template).map_err(|source| TemplateError::Read {
        path: template.to_owned(),
        source,
    })?;

    let rendered = render(&template.to_string_lossy(), &source, context).map_err(|source| {
        TemplateError::Render {
            path: template.to_owned(),
            source,
        }
    })?;

    debug!("writing {len} bytes to {output:?}", len = rendered.len());
    std::fs::write(output, rendered).map_err(|source| TemplateError::Write {
        path: output.to_owned(),
        source,
    })
}
