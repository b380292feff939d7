pub mod assets;
pub mod builder;
pub mod cache;
pub mod config;
pub mod content;
pub mod markdown;
pub mod scaffold;
pub mod tags;
pub mod template;

use std::path::Path;

// Re-export main types
pub use builder::{BuildError, BuildReport, Phase, Site, SiteBuilder};
pub use config::{CONFIG_FILE, Config, ConfigError, Section};
pub use content::Post;
pub use markdown::render_markdown;
pub use scaffold::{NewSite, ScaffoldError};
pub use tags::{TagIndex, slugify};
pub use template::{TemplateError, TemplateRenderer};

/// Build the site rooted at `site_dir` from its `site.toml`.
pub fn build_site<P: AsRef<Path>>(site_dir: P, debug: bool) -> Result<BuildReport, BuildError> {
    SiteBuilder::new(site_dir).debug(debug).load()?.build()
}
