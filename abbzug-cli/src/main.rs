mod cmd;
mod config;

use anyhow::{Result, bail};
use clap::{Arg, ArgAction, Command};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::CliSettings;

fn cli() -> Command {
    Command::new("abbzug")
        .about("Build static websites from Markdown content and Tera templates")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("debug")
                .long("debug")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging and full template error reports"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log verbosity"),
        )
        .subcommand(cmd::build::make_subcommand())
        .subcommand(cmd::serve::make_subcommand())
        .subcommand(cmd::newsite::make_subcommand())
}

fn init_tracing(settings: &CliSettings) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::from_default_env().add_directive(settings.level().into()))
        .init();
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    let Some((name, args)) = matches.subcommand() else {
        return Ok(());
    };

    let settings = CliSettings::load(args)?;
    init_tracing(&settings);

    match name {
        "build" => cmd::build::execute(args, &settings),
        "serve" => cmd::serve::execute(args, &settings),
        "newsite" => cmd::newsite::execute(args),
        other => bail!("unknown command '{other}'"),
    }
}
