use std::path::PathBuf;

use abbzug_core::NewSite;
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command, value_parser};
use tracing::info;

pub fn make_subcommand() -> Command {
    Command::new("newsite")
        .about("Create a new site with a starter site.toml")
        .arg(
            Arg::new("site_dir")
                .value_name("SITE_DIR")
                .help("Directory to create; must not exist yet")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(dir_arg("sitename", "NAME", "Name of the site [default: My Site]"))
        .arg(dir_arg("template_dir", "DIR", "Template directory [default: templates/]"))
        .arg(dir_arg("output_dir", "DIR", "Output directory [default: output/]"))
        .arg(dir_arg("static_dir", "DIR", "Static file directory [default: static/]"))
        .arg(dir_arg("post_dir", "DIR", "Content directory [default: content/]"))
}

fn dir_arg(name: &'static str, value_name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).value_name(value_name).help(help)
}

/// Command-line values laid over the scaffold defaults.
fn new_site(args: &ArgMatches) -> NewSite {
    let defaults = NewSite::default();
    let value = |name: &str, default: String| args.get_one::<String>(name).cloned().unwrap_or(default);

    NewSite {
        sitename: value("sitename", defaults.sitename),
        template_dir: value("template_dir", defaults.template_dir),
        output_dir: value("output_dir", defaults.output_dir),
        static_dir: value("static_dir", defaults.static_dir),
        post_dir: value("post_dir", defaults.post_dir),
    }
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let site_dir = args
        .get_one::<PathBuf>("site_dir")
        .cloned()
        .context("no site directory given")?;

    let config_path = new_site(args)
        .create(&site_dir)
        .with_context(|| format!("could not create site in {}", site_dir.display()))?;

    info!("Created {}", config_path.display());
    Ok(())
}
