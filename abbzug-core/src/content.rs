//! Content loading: Markdown posts with a metadata header.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Section;

/// Average reading speed used for [`reading_time`], in words per minute.
pub const WORDS_PER_MINUTE: f64 = 270.0;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("could not create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("frontmatter error in {path}: {message}")]
    Frontmatter { path: PathBuf, message: String },
}

/// A single Markdown document from a section's content directory.
///
/// Serializes as its metadata with the computed fields laid over it, so
/// templates can use `post.title` next to `post.url`.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
    /// Raw Markdown body, header stripped.
    pub content: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub url: String,
    pub reading_time: u64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFormat {
    /// `---` delimited YAML.
    Yaml,
    /// `+++` delimited TOML.
    Toml,
}

impl HeaderFormat {
    pub fn delimiter(&self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

/// Split a document into header format, header text and body.
///
/// The opening delimiter has to be the very first line. Returns `None` when
/// there is no header or it is never closed.
pub fn split_frontmatter(source: &str) -> Option<(HeaderFormat, &str, &str)> {
    let first_end = source.find('\n')?;
    let format = match source[..first_end].trim_end() {
        "---" => HeaderFormat::Yaml,
        "+++" => HeaderFormat::Toml,
        _ => return None,
    };

    let rest = &source[first_end + 1..];
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == format.delimiter() {
            let header = &rest[..offset];
            let body = rest[offset + line.len()..].trim_start_matches(['\r', '\n']);
            return Some((format, header, body));
        }
        offset += line.len();
    }

    None
}

/// Parse a document into its metadata and body.
pub fn parse_document(source: &str, path: &Path) -> Result<(Map<String, Value>, String), ContentError> {
    let Some((format, header, body)) = split_frontmatter(source) else {
        return Ok((Map::new(), source.to_string()));
    };
    if header.trim().is_empty() {
        return Ok((Map::new(), body.to_string()));
    }

    let error = |message: String| ContentError::Frontmatter {
        path: path.to_path_buf(),
        message,
    };

    let value: Value = match format {
        HeaderFormat::Yaml => serde_yaml::from_str(header).map_err(|e| error(e.to_string()))?,
        HeaderFormat::Toml => {
            let table: toml::Table = toml::from_str(header).map_err(|e| error(e.to_string()))?;
            toml_to_json(toml::Value::Table(table))
        }
    };

    let metadata = match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => return Err(error(format!("header must be a mapping, found {other}"))),
    };

    Ok((metadata, body.to_string()))
}

/// TOML header values as template values. Dates and times become their
/// TOML text, e.g. `2024-01-02`.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}

/// Whole minutes needed to read `body`, rounded to the nearest minute.
pub fn reading_time(body: &str) -> u64 {
    let words = body.split_whitespace().count();
    (words as f64 / WORDS_PER_MINUTE).round() as u64
}

/// Remove `tags` from the metadata and normalise it into a list of names.
fn take_tags(metadata: &mut Map<String, Value>) -> Vec<String> {
    match metadata.remove("tags") {
        Some(Value::Array(items)) => items.into_iter().filter_map(tag_name).collect(),
        Some(value) => tag_name(value).into_iter().collect(),
        None => Vec::new(),
    }
}

fn tag_name(value: Value) -> Option<String> {
    let name = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!name.is_empty()).then_some(name)
}

/// Loads the posts of one section and derives their computed fields.
pub struct ContentLoader<'a> {
    content_root: &'a Path,
    output_root: &'a Path,
    base_url: &'a str,
}

impl<'a> ContentLoader<'a> {
    pub fn new(content_root: &'a Path, output_root: &'a Path, base_url: &'a str) -> Self {
        Self {
            content_root,
            output_root,
            base_url,
        }
    }

    /// Load every `*.md` file under the section's content subdirectory.
    ///
    /// The section's output directory is created even when nothing is found.
    /// Sections without a content subdirectory load nothing.
    pub fn load_section(&self, section: &Section) -> Result<Vec<Post>, ContentError> {
        let Some(source) = &section.posts else {
            return Ok(Vec::new());
        };

        let out_dir = self.output_root.join(&section.location);
        std::fs::create_dir_all(&out_dir).map_err(|source| ContentError::OutputDir {
            path: out_dir.clone(),
            source,
        })?;

        let in_dir = self.content_root.join(&source.subdir);
        if !in_dir.is_dir() {
            debug!(section = %section.name, dir = %in_dir.display(), "content directory missing, section has no content");
            return Ok(Vec::new());
        }
        debug!(section = %section.name, dir = %in_dir.display(), "searching for content");

        let mut posts = Vec::new();
        for path in get_all_markdown_files(&in_dir) {
            match self.load_post(&path, &section.location, &out_dir) {
                Ok(Some(post)) => posts.push(post),
                Ok(None) => {}
                Err(e) => warn!(file = %path.display(), "skipping post: {e}"),
            }
        }

        if posts.is_empty() {
            debug!(section = %section.name, "section has no content");
        }

        Ok(posts)
    }

    fn load_post(&self, path: &Path, location: &str, out_dir: &Path) -> Result<Option<Post>, ContentError> {
        let Some(file_name) = path.file_name() else {
            return Ok(None);
        };

        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                warn!(file = %path.display(), "could not read post: {e}");
                return Ok(None);
            }
        };

        let (mut metadata, content) = parse_document(&source, path)?;
        let tags = take_tags(&mut metadata);

        let out_name = Path::new(file_name).with_extension("html");
        let out_name = out_name.to_string_lossy();

        Ok(Some(Post {
            metadata,
            reading_time: reading_time(&content),
            content,
            input_path: path.to_path_buf(),
            output_path: out_dir.join(out_name.as_ref()),
            url: format!("{}{}{}", self.base_url, location, out_name),
            tags,
        }))
    }
}

/// All Markdown files below `path`, sorted by file name within each directory.
fn get_all_markdown_files<P: AsRef<Path>>(path: P) -> Vec<PathBuf> {
    WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|p| {
            p.path().is_file() && p.path().extension().map(|ext| ext == "md").unwrap_or(false)
        })
        .map(|p| p.path().to_path_buf())
        .collect()
}
