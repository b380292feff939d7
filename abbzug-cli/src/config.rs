use anyhow::Result;
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment};
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `ABBZUG_DEBUG=true`.
pub const ENV_PREFIX: &str = "ABBZUG";

/// Process-level settings shared by every subcommand.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CliSettings {
    /// Debug logging, plus full error chains for templates that fail to render.
    pub debug: bool,
    /// Extra log verbosity on top of the default level.
    pub verbose: u8,
}

impl CliSettings {
    /// Load settings with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (ABBZUG_*)
    /// 3. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        Self::load_with_env(args, None)
    }

    /// As [`CliSettings::load`], reading environment variables from `env`
    /// instead of the process environment when given.
    pub fn load_with_env(args: &ArgMatches, env: Option<config::Map<String, String>>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder()
            .add_source(ConfigBuilder::try_from(&Self::default())?)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true).source(env));

        // Only flags that were actually given override the layers below
        if args.try_get_one::<bool>("debug").ok().flatten() == Some(&true) {
            builder = builder.set_override("debug", true)?;
        }
        if let Some(&verbose) = args.try_get_one::<u8>("verbose").ok().flatten() {
            if verbose > 0 {
                builder = builder.set_override("verbose", i64::from(verbose))?;
            }
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Log level for the default filter directive.
    pub fn level(&self) -> tracing::Level {
        match (self.debug, self.verbose) {
            (_, 2..) => tracing::Level::TRACE,
            (true, _) | (_, 1) => tracing::Level::DEBUG,
            _ => tracing::Level::INFO,
        }
    }
}
