use std::error::Error as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info};

use crate::assets::{self, AssetError};
use crate::cache::ContentCache;
use crate::config::{CONFIG_FILE, Config, ConfigError, Section};
use crate::content::{ContentError, ContentLoader};
use crate::template::{RenderContext, Template, TemplateError, TemplateRenderer, root_cause};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Where a [`Site`] is in its single pass from config to output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Configured,
    Preloaded,
    Rendered,
    AssetsCopied,
    Done,
}

/// What one build produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub sections: usize,
    pub posts: usize,
    pub indexes: usize,
    pub tag_pages: usize,
    /// Render targets skipped because their template was missing or failed.
    pub skipped: usize,
    pub assets: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct SiteDirs {
    pub templates: PathBuf,
    pub output: PathBuf,
    pub static_files: PathBuf,
    pub content: PathBuf,
}

pub struct SiteBuilder {
    site_dir: PathBuf,
    config_file: PathBuf,
    debug: bool,
}

impl SiteBuilder {
    pub fn new<P: AsRef<Path>>(site_dir: P) -> Self {
        Self {
            site_dir: site_dir.as_ref().to_path_buf(),
            config_file: PathBuf::from(CONFIG_FILE),
            debug: false,
        }
    }

    /// Config file path, relative to the site directory.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = path.as_ref().to_path_buf();
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Read and validate the configuration.
    pub fn load(self) -> Result<Site, BuildError> {
        let config = Config::read(self.site_dir.join(&self.config_file))?;
        Ok(Site::new(self.site_dir, config, self.debug))
    }
}

/// One build of one site directory. Consumed by [`Site::build`]; a rebuild
/// needs a fresh `Site`.
pub struct Site {
    root: PathBuf,
    dirs: SiteDirs,
    base_url: String,
    debug: bool,
    config: Config,
    cache: ContentCache,
    phase: Phase,
}

impl Site {
    pub fn new(root: PathBuf, config: Config, debug: bool) -> Self {
        let dirs = SiteDirs {
            templates: root.join(&config.site.template_dir),
            output: root.join(&config.site.output_dir),
            static_files: root.join(&config.site.static_dir),
            content: root.join(&config.site.post_dir),
        };

        Self {
            root,
            dirs,
            base_url: config.site.base_url.clone(),
            debug,
            config,
            cache: ContentCache::new(),
            phase: Phase::Configured,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dirs(&self) -> &SiteDirs {
        &self.dirs
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Preload every section, render every section, then copy static files.
    pub fn build(mut self) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let sitename = match &self.config.site.sitename {
            Some(name) => name.clone(),
            None => {
                info!("[Hint: set sitename to the name of your site in the config file!]");
                "UNKNOWN".to_string()
            }
        };
        info!("Building site {sitename}...");

        let renderer = TemplateRenderer::new(&self.dirs.templates);
        let mut report = BuildReport {
            sections: self.config.sections.len(),
            ..BuildReport::default()
        };

        self.preload()?;
        self.render(&renderer, &mut report)?;
        self.copy_static(&mut report)?;

        self.advance(Phase::Done);
        report.elapsed = start.elapsed();
        info!(
            posts = report.posts,
            indexes = report.indexes,
            tag_pages = report.tag_pages,
            skipped = report.skipped,
            "Building site {sitename} took {:?}.",
            report.elapsed
        );

        Ok(report)
    }

    fn advance(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "build phase");
        self.phase = phase;
    }

    /// Load posts and discover tags for every section before anything renders.
    fn preload(&mut self) -> Result<(), BuildError> {
        let loader = ContentLoader::new(&self.dirs.content, &self.dirs.output, &self.base_url);

        for section in &self.config.sections {
            let posts = loader.load_section(section)?;
            debug!(section = %section.name, posts = posts.len(), "preloaded");
            self.cache.insert_section(&section.location, posts);
        }

        info!(posts = self.cache.post_count(), "[PRELOAD] Done");
        self.advance(Phase::Preloaded);
        Ok(())
    }

    fn render(&mut self, renderer: &TemplateRenderer, report: &mut BuildReport) -> Result<(), BuildError> {
        for section in &self.config.sections {
            self.cache
                .finalize_tags(section, &self.base_url, &self.dirs.output);
        }

        let mut context = self.site_context();
        for section in &self.config.sections {
            self.render_section(renderer, section, &mut context, report)?;
        }

        self.advance(Phase::Rendered);
        Ok(())
    }

    /// Site-wide values, serialized once per build. Every render reuses the
    /// same context; per-section and per-target values are overwritten in
    /// place and removed once their renders are done.
    fn site_context(&self) -> RenderContext {
        let mut context = RenderContext::new();
        context.add_to_context("site", &self.config.site_table());
        context.add_to_context("config", &self.config.raw);
        context.add_to_context("site_posts", self.cache.all_posts());
        context.add_to_context("site_tags", &self.cache.all_tag_views());
        context
    }

    fn render_section(
        &self,
        renderer: &TemplateRenderer,
        section: &Section,
        context: &mut RenderContext,
        report: &mut BuildReport,
    ) -> Result<(), BuildError> {
        info!("[LOCATION] /{}", section.location);

        context.add_to_context("section", &section.raw);
        context.add_to_context("section_name", &section.location);
        context.add_to_context("tags", &self.cache.tag_views(&section.location));
        context.remove("posts");

        if let Some(source) = &section.posts {
            let posts = self.cache.posts(&section.location);
            match renderer.resolve(&source.template) {
                Some(template) => {
                    for post in posts {
                        context.add_to_context("post", post);
                        context.add_to_context("content", &post.content);
                        if self.render_target(template, context, &post.output_path)? {
                            report.posts += 1;
                            debug!(
                                input = %post.input_path.display(),
                                output = %post.output_path.display(),
                                "rendered post"
                            );
                        } else {
                            report.skipped += 1;
                        }
                    }
                    context.remove("post");
                    context.remove("content");
                }
                None => {
                    error!(
                        template = %source.template,
                        section = %section.name,
                        "Could not find template. Skipping all content!"
                    );
                    report.skipped += posts.len();
                }
            }
            context.add_to_context("posts", posts);
        } else {
            debug!(section = %section.name, "This section has no content");
        }

        let index_path = self.dirs.output.join(&section.location).join("index.html");
        match renderer.resolve(&section.index_template) {
            Some(template) => {
                debug!(template = template.name(), output = %index_path.display(), "building index");
                if self.render_target(template, context, &index_path)? {
                    report.indexes += 1;
                } else {
                    report.skipped += 1;
                }
            }
            None => {
                error!(
                    template = %section.index_template,
                    section = %section.name,
                    "Could not find template. Skipping!"
                );
                report.skipped += 1;
            }
        }

        self.render_tag_pages(renderer, section, context, report)
    }

    fn render_tag_pages(
        &self,
        renderer: &TemplateRenderer,
        section: &Section,
        context: &mut RenderContext,
        report: &mut BuildReport,
    ) -> Result<(), BuildError> {
        let Some((template_name, _)) = section.tag_pages() else {
            debug!(section = %section.name, "no tag pages configured");
            return Ok(());
        };
        let Some(index) = self.cache.tags(&section.location).filter(|i| !i.is_empty()) else {
            return Ok(());
        };
        let Some(template) = renderer.resolve(template_name) else {
            error!(
                template = %template_name,
                section = %section.name,
                "Could not find template. Skipping all tags!"
            );
            report.skipped += index.len();
            return Ok(());
        };

        let posts = self.cache.posts(&section.location);
        for tag in index.iter() {
            let Some(page) = &tag.page else {
                continue;
            };
            context.add_to_context("tag", &tag.view(posts));
            context.add_to_context("tagname", &tag.name);
            if self.render_target(template, context, &page.output_path)? {
                report.tag_pages += 1;
            } else {
                report.skipped += 1;
            }
        }
        context.remove("tag");
        context.remove("tagname");

        Ok(())
    }

    /// Render one output file. Template failures are logged and reported as
    /// `false`; only I/O errors abort the build.
    fn render_target(&self, template: Template<'_>, context: &RenderContext, output_path: &Path) -> Result<bool, BuildError> {
        match template.render_to_file(context, output_path) {
            Ok(()) => Ok(true),
            Err(TemplateError::TeraError(e)) => {
                let cause = if self.debug {
                    error_chain(&e)
                } else {
                    root_cause(&e)
                };
                error!(
                    template = template.name(),
                    output = %output_path.display(),
                    "Could not render template. Skipping: {cause}"
                );
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn copy_static(&mut self, report: &mut BuildReport) -> Result<(), BuildError> {
        let dest = self.dirs.output.join(&self.config.site.static_dir);
        info!("[STATIC] Copying to {}.", dest.display());
        report.assets = assets::copy_tree(&self.dirs.static_files, &dest)?;
        self.advance(Phase::AssetsCopied);
        Ok(())
    }
}

fn error_chain(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
