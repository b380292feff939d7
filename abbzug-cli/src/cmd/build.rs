use std::path::PathBuf;

use abbzug_core::build_site;
use anyhow::{Context, Result, bail};
use clap::{Arg, ArgMatches, Command, value_parser};
use tracing::info;

use crate::config::CliSettings;

pub fn site_dir_arg() -> Arg {
    Arg::new("site_dir")
        .value_name("SITE_DIR")
        .help("Site directory containing site.toml")
        .default_value(".")
        .value_parser(value_parser!(PathBuf))
}

/// The `SITE_DIR` argument, which must name an existing directory.
pub fn site_dir(args: &ArgMatches) -> Result<PathBuf> {
    let site_dir = args
        .get_one::<PathBuf>("site_dir")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    if !site_dir.is_dir() {
        bail!("{} is not a directory", site_dir.display());
    }
    Ok(site_dir)
}

pub fn make_subcommand() -> Command {
    Command::new("build")
        .about("Build the site in SITE_DIR")
        .arg(site_dir_arg())
}

pub fn execute(args: &ArgMatches, settings: &CliSettings) -> Result<()> {
    let site_dir = site_dir(args)?;

    let report = build_site(&site_dir, settings.debug)
        .with_context(|| format!("could not build {}", site_dir.display()))?;

    info!(
        skipped = report.skipped,
        assets = report.assets,
        "Built {} posts, {} indexes and {} tag pages",
        report.posts,
        report.indexes,
        report.tag_pages
    );

    Ok(())
}
