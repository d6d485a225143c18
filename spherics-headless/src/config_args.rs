//! Choosing the [`PhysicsConfig`] from files and command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use spherics::config::PhysicsConfig;

/// [`clap::Args`] argument group struct for args that affect the physics configuration.
#[derive(Clone, Debug, clap::Args)]
pub(crate) struct ConfigArgs {
    /// JSON file containing physics configuration. Fields not present in the file take
    /// their default values.
    #[arg(long = "config", value_name = "FILE")]
    pub(crate) config_file: Option<PathBuf>,

    #[expect(clippy::doc_markdown, reason = "will be displayed in --help")]
    /// Override the value of a configuration field, instead of taking it from the file
    /// or defaults.
    ///
    /// The value is specified as a key-value pair where the key is an unquoted string, the
    /// separator is “=”, and the value is a JSON value; for example: -Stimescale=0.5
    #[arg(long = "set", short = 'S', value_parser = parse_override, value_name = "NAME=JSON")]
    pub(crate) set: Vec<(String, serde_json::Value)>,
}

impl ConfigArgs {
    /// Constructs the [`PhysicsConfig`] to run with, and checks that it is usable.
    pub(crate) fn build_config(self) -> Result<PhysicsConfig, anyhow::Error> {
        let Self { config_file, set } = self;

        let base = match config_file {
            Some(path) => read_config_file(&path)?,
            None => PhysicsConfig::default(),
        };

        let config = if set.is_empty() {
            base
        } else {
            let Ok(serde_json::Value::Object(mut fields)) = serde_json::to_value(&base) else {
                unreachable!("physics configuration should appear as a json object");
            };
            for (key, value) in set {
                fields.insert(key, value);
            }
            serde_json::from_value(serde_json::Value::Object(fields))
                .context("--set did not produce a valid configuration")?
        };

        config.validate().context("invalid physics configuration")?;
        Ok(config)
    }
}

fn read_config_file(path: &Path) -> Result<PhysicsConfig, anyhow::Error> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read configuration file {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse configuration file {}", path.display()))
}

fn parse_override(arg: &str) -> Result<(String, serde_json::Value), anyhow::Error> {
    let (key, value) = arg.split_once('=').ok_or_else(|| anyhow::anyhow!("missing '='"))?;
    let value = serde_json::from_str(value)?;
    Ok((key.to_owned(), value))
}
