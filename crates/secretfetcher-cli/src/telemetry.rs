use std::io::{self, IsTerminal};

use clap::ValueEnum;
use secretfetcher_core::EnvironmentView;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FORMAT_ENV: &str = "SECRETFETCHER_LOG_FORMAT";
const DEFAULT_FILTER: &str = "warn";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn from_env(env: &dyn EnvironmentView) -> Option<Self> {
        let raw = env.non_empty(LOG_FORMAT_ENV)?;
        LogFormat::from_str(raw.trim(), true).ok()
    }
}

/// Install the subscriber. Everything goes to stderr; stdout carries only
/// the payload.
pub fn init(format: LogFormat) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;
    let registry = tracing_subscriber::registry().with(env_filter);
    let ansi = io::stderr().is_terminal();

    match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_ansi(ansi)
                    .with_target(false),
            )
            .try_init()
            .ok(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(false)
                    .with_writer(io::stderr),
            )
            .try_init()
            .ok(),
    };

    Ok(())
}
