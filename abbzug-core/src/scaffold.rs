//! `newsite`: an empty site with a starter configuration.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::config::CONFIG_FILE;

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("{0} already exists")]
    AlreadyExists(PathBuf),

    #[error("IO error creating {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSite {
    pub sitename: String,
    pub template_dir: String,
    pub output_dir: String,
    pub static_dir: String,
    pub post_dir: String,
}

impl Default for NewSite {
    fn default() -> Self {
        Self {
            sitename: "My Site".to_string(),
            template_dir: "templates/".to_string(),
            output_dir: "output/".to_string(),
            static_dir: "static/".to_string(),
            post_dir: "content/".to_string(),
        }
    }
}

impl NewSite {
    pub fn config_file(&self) -> String {
        let quote = |s: &str| toml::Value::String(s.to_string()).to_string();
        format!(
            r#"[ABBZUG]
sitename = {sitename}
template_dir = {template_dir}
output_dir = {output_dir}
static_dir = {static_dir}
post_dir = {post_dir}
# base_url = "https://www.example.com/"

["/"]
index_template = "index.html"
post_template = "post.html"
tag_template = "tags.html"
# post_subdir = "posts/"
tag_subdir = "tags/"
"#,
            sitename = quote(&self.sitename),
            template_dir = quote(&self.template_dir),
            output_dir = quote(&self.output_dir),
            static_dir = quote(&self.static_dir),
            post_dir = quote(&self.post_dir),
        )
    }

    /// Create `site_dir` with a config file and the four site directories.
    /// Refuses to touch a directory that already exists.
    pub fn create(&self, site_dir: &Path) -> Result<PathBuf, ScaffoldError> {
        if site_dir.exists() {
            return Err(ScaffoldError::AlreadyExists(site_dir.to_path_buf()));
        }

        let io_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| ScaffoldError::Io { path, source }
        };

        fs::create_dir_all(site_dir).map_err(io_error(site_dir))?;

        let config_path = site_dir.join(CONFIG_FILE);
        fs::write(&config_path, self.config_file()).map_err(io_error(&config_path))?;

        for dir in [&self.template_dir, &self.output_dir, &self.static_dir, &self.post_dir] {
            let path = site_dir.join(dir);
            fs::create_dir_all(&path).map_err(io_error(&path))?;
        }

        info!(site = %site_dir.display(), "created new site");
        Ok(config_path)
    }
}
