use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use toml::{Table, Value};

/// Name of the reserved table holding site-wide settings.
pub const SITE_SECTION: &str = "ABBZUG";

/// File name of the site configuration inside a site directory.
pub const CONFIG_FILE: &str = "site.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parsing(#[from] toml::de::Error),

    #[error("config is not a valid abbzug config file: needs an [ABBZUG] section")]
    MissingSiteSection,

    #[error("unable to build section '{section}': no {key} specified")]
    MissingKey { section: String, key: &'static str },

    #[error("invalid value in section '{section}': {message}")]
    Invalid { section: String, message: String },
}

/// Settings read from the reserved `[ABBZUG]` table.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SiteSettings {
    pub sitename: Option<String>,
    pub base_url: String,
    pub template_dir: String,
    pub output_dir: String,
    pub static_dir: String,
    pub post_dir: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            sitename: None,
            base_url: "/".to_string(),
            template_dir: "templates/".to_string(),
            output_dir: "output/".to_string(),
            static_dir: "static/".to_string(),
            post_dir: "content/".to_string(),
        }
    }
}

/// Where a section's posts come from and how each one is rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct PostSource {
    pub subdir: String,
    pub template: String,
}

/// One `["/location"]` table, validated once at load time.
#[derive(Debug, Clone)]
pub struct Section {
    /// Table name as written in the config, e.g. `/blog/`.
    pub name: String,
    /// Name without the leading slash; empty for the root section.
    pub location: String,
    pub raw: Table,
    pub index_template: String,
    pub posts: Option<PostSource>,
    pub tag_template: Option<String>,
    pub tag_subdir: Option<String>,
}

#[derive(Deserialize)]
struct SectionKeys {
    post_subdir: Option<String>,
    post_template: Option<String>,
    index_template: Option<String>,
    tag_template: Option<String>,
    tag_subdir: Option<String>,
}

impl Section {
    fn from_table(name: &str, raw: Table) -> Result<Self, ConfigError> {
        let location = name.strip_prefix('/').unwrap_or(name);
        if location.starts_with('/') {
            return Err(ConfigError::Invalid {
                section: name.to_string(),
                message: "a section location must not start with '/'".to_string(),
            });
        }

        let keys: SectionKeys =
            Value::Table(raw.clone())
                .try_into()
                .map_err(|e: toml::de::Error| ConfigError::Invalid {
                    section: name.to_string(),
                    message: e.message().to_string(),
                })?;

        let index_template = keys.index_template.ok_or_else(|| ConfigError::MissingKey {
            section: name.to_string(),
            key: "index_template",
        })?;

        let posts = match keys.post_subdir {
            Some(subdir) => {
                let template = keys.post_template.ok_or_else(|| ConfigError::MissingKey {
                    section: name.to_string(),
                    key: "post_template",
                })?;
                Some(PostSource { subdir, template })
            }
            None => None,
        };

        Ok(Self {
            name: name.to_string(),
            location: location.to_string(),
            raw,
            index_template,
            posts,
            tag_template: keys.tag_template,
            tag_subdir: keys.tag_subdir,
        })
    }

    /// Template and output subdirectory for tag pages, only when both are set.
    pub fn tag_pages(&self) -> Option<(&str, &str)> {
        match (&self.tag_template, &self.tag_subdir) {
            (Some(template), Some(subdir)) => Some((template, subdir)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// The whole file, in file order.
    pub raw: Table,
    pub site: SiteSettings,
    /// Every table whose name starts with `/`, in file order.
    pub sections: Vec<Section>,
}

impl Config {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Self, ConfigError> {
        let raw: Table = toml::from_str(data)?;
        Self::from_table(raw)
    }

    pub fn from_table(raw: Table) -> Result<Self, ConfigError> {
        let site = match raw.get(SITE_SECTION) {
            Some(value @ Value::Table(_)) => {
                value
                    .clone()
                    .try_into()
                    .map_err(|e: toml::de::Error| ConfigError::Invalid {
                        section: SITE_SECTION.to_string(),
                        message: e.message().to_string(),
                    })?
            }
            _ => return Err(ConfigError::MissingSiteSection),
        };

        let mut sections = Vec::new();
        for (name, value) in &raw {
            if !name.starts_with('/') {
                continue;
            }
            let Value::Table(table) = value else {
                return Err(ConfigError::Invalid {
                    section: name.clone(),
                    message: "a section must be a table".to_string(),
                });
            };
            sections.push(Section::from_table(name, table.clone())?);
        }

        Ok(Self {
            raw,
            site,
            sections,
        })
    }

    /// The reserved table as written, for templates.
    pub fn site_table(&self) -> Option<&Table> {
        self.raw.get(SITE_SECTION).and_then(Value::as_table)
    }
}
