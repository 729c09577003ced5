mod telemetry;

use std::ffi::OsString;
use std::io;
use std::process;

use anyhow::Context;
use clap::Parser;
use secretfetcher_core::env::SECRET_NAME_ENV;
use secretfetcher_core::{EnvironmentView, ExitCode, Fetcher, FetcherConfig, ProcessEnv};
use secretfetcher_provider_gcp_sm::{ApplicationDefaultCredentials, GcpSecretManager};
use tracing::debug;

use crate::telemetry::LogFormat;

#[derive(Parser, Debug)]
#[command(
    name = "secretfetcher",
    version,
    about = "Write the latest version of a Google Secret Manager secret to stdout",
    after_help = EXIT_STATUS_HELP
)]
struct Cli {
    /// Secret name (e.g. 'my-secret') or full secret path
    /// (e.g. 'projects/PROJECT_ID/secrets/SECRET_ID'). Defaults to $SECRET_NAME.
    #[arg(long, value_name = "ID")]
    secret_identifier: Option<String>,

    /// Attempts before giving up on the backend [env: SECRETFETCHER_MAX_ATTEMPTS] [default: 5]
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: Option<u32>,

    /// Backoff step in milliseconds; attempt i waits i times this
    /// [env: SECRETFETCHER_BACKOFF_BASE_MS] [default: 2000]
    #[arg(long, value_name = "MS")]
    backoff_base_ms: Option<u64>,

    /// Log output format for stderr [env: SECRETFETCHER_LOG_FORMAT]
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

const EXIT_STATUS_HELP: &str = "Exit status:
  0  payload written to stdout
  1  no secret identifier given
  2  the identifier could not be resolved to a secret version
  3  the secret could not be read (also used when the process cannot start its runtime)
  4  the payload could not be written to stdout";

const LEGACY_FLAG: &str = "-secret-identifier";

/// Pipelines written for the Go flag package pass `-secret-identifier`.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some(text)
                if text == LEGACY_FLAG || text.starts_with(&format!("{LEGACY_FLAG}=")) =>
            {
                OsString::from(format!("-{text}"))
            }
            _ => arg,
        })
        .collect()
}

fn main() -> process::ExitCode {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    let env = ProcessEnv;

    let format = cli
        .log_format
        .or_else(|| LogFormat::from_env(&env))
        .unwrap_or_default();
    if let Err(err) = telemetry::init(format) {
        eprintln!("warning: logging disabled: {err:#}");
    }

    match real_main(cli, &env) {
        Ok(code) => code.into(),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::AccessFailed.into()
        }
    }
}

fn real_main(cli: Cli, env: &dyn EnvironmentView) -> anyhow::Result<ExitCode> {
    // An explicit flag wins even when empty.
    let identifier = cli
        .secret_identifier
        .or_else(|| env.var(SECRET_NAME_ENV))
        .filter(|value| !value.is_empty());

    let config = FetcherConfig::from_env(env).with_overrides(cli.max_attempts, cli.backoff_base_ms);
    debug!(
        max_attempts = config.max_attempts,
        backoff_base = ?config.backoff_base,
        "fetcher configured"
    );
    let fetcher = Fetcher::from_config(&config);
    let backend = GcpSecretManager::from_env(env);
    let credentials = ApplicationDefaultCredentials::from_env(env);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let mut stdout = io::stdout().lock();
    let outcome = runtime.block_on(fetcher.fetch_with_retry(
        identifier.as_deref(),
        env,
        &credentials,
        &backend,
        &mut stdout,
    ));

    Ok(match outcome {
        Ok(()) => ExitCode::Success,
        Err(failure) => {
            eprintln!("Error: {failure}");
            failure.exit_code()
        }
    })
}
