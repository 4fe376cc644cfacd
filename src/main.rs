use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use govlint::api::{self, AppState};
use govlint::cli::{Cli, Command, ValidateArgs};
use govlint::config::{Config, ConfigManager, SystemEnvProvider};
use govlint::{
    AuthenticatedFetchResolver, DiagnosticsFormat, DocumentLoader, ErrorReporter,
    FileAliasStore, FileAuthConfigStore, GovernanceError, HttpClientConfig, Output,
    ValidateOptions, ValidationEngine, VerbosityLevel, governance_summary, report,
};

const EXIT_INVALID: u8 = 1;
const EXIT_ERROR: u8 = 2;

fn init_tracing(verbosity: VerbosityLevel) {
    let default = match verbosity {
        VerbosityLevel::Verbose => "govlint=debug",
        VerbosityLevel::Normal => "warn",
        VerbosityLevel::Quiet => "error",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn validation_engine(config: &Config) -> Result<ValidationEngine, GovernanceError> {
    let resolver = AuthenticatedFetchResolver::new(
        Arc::new(FileAuthConfigStore::new(&config.paths.auth_config)),
        Arc::new(SystemEnvProvider),
    )
    .allow_insecure(config.network.allow_insecure_refs);
    ValidationEngine::with_resolver(resolver)
}

async fn run_validate(
    args: &ValidateArgs,
    config: &Config,
    verbosity: VerbosityLevel,
) -> Result<ExitCode, GovernanceError> {
    let reporter = ErrorReporter::new(verbosity);
    let output = Output::new(verbosity);

    let loader = DocumentLoader::new(
        Arc::new(FileAliasStore::new(&config.paths.context_file)),
        HttpClientConfig {
            user_agent: config.network.user_agent.clone(),
        },
    )
    .with_working_dir(std::env::current_dir()?);
    let document = loader
        .load(args.reference.as_deref(), args.explicit_kind())
        .await?;

    let fail_severity = ConfigManager::fail_severity(config);
    let options = ValidateOptions {
        fail_severity,
        suppress_warnings: args.suppress_warnings.clone(),
        suppress_all_warnings: args.suppress_all_warnings,
    };
    let engine = validation_engine(config)?;
    let verdict = engine.validate(&document, &options).await;

    let shown: Vec<_> = if args.display_only_failures {
        verdict
            .diagnostics
            .iter()
            .filter(|d| d.severity.fails(fail_severity))
            .cloned()
            .collect()
    } else {
        verdict.diagnostics.clone()
    };
    let format = DiagnosticsFormat::parse_or_default(&config.validation.diagnostics_format);

    match &args.output {
        Some(path) => {
            let rendered = govlint::output::format(&shown, format, fail_severity);
            if let Err(e) = report::save(path, format, &rendered).await {
                if e.is_non_fatal() {
                    reporter.report_warning(&e);
                } else {
                    return Err(e);
                }
            }
        }
        None if verbosity != VerbosityLevel::Quiet && !shown.is_empty() => {
            println!("{}", output.format(&shown, format, fail_severity));
        }
        None => {}
    }

    let status = verdict.status();
    let summary = governance_summary(&document.source_label, &verdict.diagnostics, status);
    if verbosity != VerbosityLevel::Quiet || !status.is_valid() {
        println!("{}", output.format_summary(&summary));
    }
    if verbosity == VerbosityLevel::Verbose
        && let Some(score) = verdict.score
    {
        println!("Score: {:.0}", score);
    }

    Ok(if status.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_INVALID)
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse_args();
    let verbosity = cli.verbosity();
    init_tracing(verbosity);
    let reporter = ErrorReporter::new(verbosity);

    let config = match ConfigManager::load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            reporter.report_config_error(&e);
            return Ok(ExitCode::from(EXIT_ERROR));
        }
    };

    match &cli.command {
        Command::Validate(args) => match run_validate(args, &config, verbosity).await {
            Ok(code) => Ok(code),
            Err(e) => {
                reporter.report(&e);
                Ok(ExitCode::from(EXIT_ERROR))
            }
        },
        Command::Serve(_) => {
            let engine = validation_engine(&config).context("building validation engine")?;
            api::serve(&config.server.bind, AppState::new(engine))
                .await
                .with_context(|| format!("serving on {}", config.server.bind))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
