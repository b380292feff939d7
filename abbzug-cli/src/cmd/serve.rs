use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use abbzug_core::SiteBuilder;
use anyhow::{Context, Result};
use clap::{ArgMatches, Command};
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use tracing::{debug, error, info, warn};

use super::build::{site_dir, site_dir_arg};
use crate::config::CliSettings;

/// Quiet period before a batch of file events triggers a rebuild.
const DEBOUNCE: Duration = Duration::from_millis(500);

pub fn make_subcommand() -> Command {
    Command::new("serve")
        .about("Build the site in SITE_DIR, then rebuild whenever a source file changes")
        .arg(site_dir_arg())
}

pub fn execute(args: &ArgMatches, settings: &CliSettings) -> Result<()> {
    let site_dir = site_dir(args)?
        .canonicalize()
        .context("could not resolve site directory")?;

    let site = SiteBuilder::new(&site_dir).debug(settings.debug).load()?;
    let mut output_dir = site.dirs().output.clone();
    site.build()?;

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(DEBOUNCE, tx).context("could not create file watcher")?;
    debouncer
        .watcher()
        .watch(&site_dir, RecursiveMode::Recursive)
        .with_context(|| format!("could not watch {}", site_dir.display()))?;

    info!("Watching {} for changes. Press Ctrl-C to stop.", site_dir.display());

    while let Ok(result) = rx.recv() {
        let mut changed = count_source_changes(result, &output_dir);
        // Drain batches queued while the last rebuild was running
        while let Ok(result) = rx.try_recv() {
            changed += count_source_changes(result, &output_dir);
        }
        if changed == 0 {
            continue;
        }

        info!("{changed} file(s) changed, rebuilding");
        if let Some(dir) = rebuild(&site_dir, settings.debug) {
            output_dir = dir;
        }
    }

    Ok(())
}

/// Load a fresh site from `site_dir` and build it, logging any failure.
/// Returns the output directory of the configuration that was loaded.
fn rebuild(site_dir: &Path, debug: bool) -> Option<PathBuf> {
    let site = match SiteBuilder::new(site_dir).debug(debug).load() {
        Ok(site) => site,
        Err(e) => {
            error!("Could not load site: {e}");
            return None;
        }
    };
    let output_dir = site.dirs().output.clone();

    match site.build() {
        Ok(report) => info!(
            posts = report.posts,
            skipped = report.skipped,
            "Rebuilt in {:?}",
            report.elapsed
        ),
        Err(e) => error!("Rebuild failed: {e}"),
    }

    Some(output_dir)
}

fn count_source_changes(result: DebounceEventResult, output_dir: &Path) -> usize {
    match result {
        Ok(events) => events
            .iter()
            .filter(|event| is_source_change(&event.path, output_dir))
            .inspect(|event| debug!(path = %event.path.display(), "changed"))
            .count(),
        Err(e) => {
            warn!("Watch error: {e}");
            0
        }
    }
}

/// Anything under the output directory is written by the build itself.
fn is_source_change(path: &Path, output_dir: &Path) -> bool {
    !path.starts_with(output_dir)
}
