use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera, Value};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::markdown::render_markdown;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template error: {0}")]
    TeraError(#[from] tera::Error),

    #[error("could not write {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The `markdown` filter: `{{ post.content | markdown }}` or
/// `{% filter markdown %}...{% endfilter %}`.
struct MarkdownFilter;

impl tera::Filter for MarkdownFilter {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let html = match value {
            Value::Null => String::new(),
            Value::String(source) => render_markdown(source),
            other => render_markdown(&other.to_string()),
        };
        Ok(Value::String(html))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Named values a template is rendered against.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    context: Context,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value to the template context
    pub fn add_to_context<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        self.context.insert(key, value);
    }

    /// Drop a value so later renders no longer see it.
    pub fn remove(&mut self, key: &str) {
        self.context.remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.context.contains_key(key)
    }
}

/// Every usable template below a templates directory, compiled once per build.
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Compile the files below `templates_dir`, named by their relative
    /// `/`-separated path. Hidden files are ignored. A file that cannot be
    /// read or compiled, or that extends or imports a template that is not
    /// available, is logged and left out, so resolving it later yields
    /// `None`. A missing directory gives an empty set.
    pub fn new<P: AsRef<Path>>(templates_dir: P) -> Self {
        let templates_dir = templates_dir.as_ref();
        let mut tera = Tera::default();
        tera.register_filter("markdown", MarkdownFilter);

        let mut pending: Vec<(String, String)> = Vec::new();
        for entry in WalkDir::new(templates_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let Some(name) = template_name(templates_dir, entry.path()) else {
                continue;
            };
            if name.split('/').any(|part| part.starts_with('.')) {
                debug!(template = %name, "ignoring hidden file");
                continue;
            }
            match std::fs::read_to_string(entry.path()) {
                Ok(source) => pending.push((name, source)),
                Err(e) => warn!(template = %name, "could not read template, ignoring it: {e}"),
            }
        }

        // Parents and macro files have to be loaded before the templates
        // using them, so keep retrying until a pass adds nothing.
        let mut failures = Vec::new();
        loop {
            failures.clear();
            let mut added = false;
            for (name, source) in std::mem::take(&mut pending) {
                let mut candidate = tera.clone();
                match candidate.add_raw_template(&name, &source) {
                    Ok(()) => {
                        tera = candidate;
                        added = true;
                    }
                    Err(e) => {
                        failures.push(e);
                        pending.push((name, source));
                    }
                }
            }
            if !added || pending.is_empty() {
                break;
            }
        }

        for ((name, _), e) in pending.iter().zip(&failures) {
            warn!(template = %name, "could not compile template, ignoring it: {}", root_cause(e));
        }

        Self { tera }
    }

    /// Look a template up by name. `None` means "no such template": the
    /// caller skips the target instead of writing anything.
    pub fn resolve<'a>(&'a self, name: &'a str) -> Option<Template<'a>> {
        self.tera
            .get_template_names()
            .any(|n| n == name)
            .then_some(Template {
                tera: &self.tera,
                name,
            })
    }

    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.tera.get_template_names().collect();
        names.sort_unstable();
        names
    }
}

/// A resolved template.
#[derive(Clone, Copy)]
pub struct Template<'a> {
    tera: &'a Tera,
    name: &'a str,
}

impl Template<'_> {
    pub fn name(&self) -> &str {
        self.name
    }

    /// Render a template with the given context
    pub fn render(&self, context: &RenderContext) -> Result<String, TemplateError> {
        Ok(self.tera.render(self.name, &context.context)?)
    }

    /// Render a template and write it directly to a file
    pub fn render_to_file(&self, context: &RenderContext, output_path: &Path) -> Result<(), TemplateError> {
        let rendered = self.render(context)?;

        let io_error = |source| TemplateError::IoError {
            path: output_path.to_path_buf(),
            source,
        };

        // Ensure parent directory exists
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        std::fs::write(output_path, rendered).map_err(io_error)?;
        Ok(())
    }
}

/// Innermost source of a Tera error, usually the most specific message.
pub(crate) fn root_cause(e: &tera::Error) -> String {
    let mut cause: &dyn std::error::Error = e;
    while let Some(next) = cause.source() {
        cause = next;
    }
    cause.to_string()
}

fn template_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}
