use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use triad::cli::init::{self, InitConfig, InitResult};
use triad::cli::output::Output;
use triad::cli::{Cli, Commands};
use triad::llm::{HOSTED_MODELS, LOCAL_MODELS};
use triad::utils::toml_config::LoggingConfig;
use triad::utils::LogFormat;
use triad::{ChannelSink, ResearchPipeline, RunEvent, RunOutcome, SearchMode, TriadConfig};

/// Exit status for a run stopped by Ctrl-C
const EXIT_STOPPED: u8 = 130;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Commands::Init { path, force } => {
            let result = init::run(InitConfig { path, force }, &output);
            Ok(match result {
                InitResult::Success => ExitCode::SUCCESS,
                InitResult::AlreadyExists | InitResult::Error(_) => ExitCode::FAILURE,
            })
        }
        Commands::Models => {
            output.table_header(&["Provider", "Model"]);
            for &model in LOCAL_MODELS {
                output.table_row(&["local", model]);
            }
            for &model in HOSTED_MODELS {
                output.table_row(&["hosted", model]);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            topic,
            search,
            output: report_path,
            json,
        } => {
            let config = TriadConfig::load(&cli.config)
                .with_context(|| format!("loading {}", cli.config.display()))?;
            init_tracing(&config.logging, cli.verbose);
            if cli.config.exists() {
                tracing::info!(path = %cli.config.display(), "loaded configuration");
            } else {
                tracing::info!(path = %cli.config.display(), "no configuration file found, using defaults");
            }

            run_research(
                &config,
                topic.as_deref(),
                search,
                report_path,
                json,
                &output,
            )
            .await
        }
    }
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,reqwest=warn", level)));

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

async fn run_research(
    config: &TriadConfig,
    topic: Option<&str>,
    search: Option<SearchMode>,
    report_path: Option<std::path::PathBuf>,
    json: bool,
    output: &Output,
) -> anyhow::Result<ExitCode> {
    let credentials = config.resolve_credentials();
    let run_config = config.run_configuration(topic, search, credentials)?;
    let pipeline = ResearchPipeline::from_config(config, &run_config.credentials)?;

    if !json {
        output.banner();
        output.kv("Topic", &run_config.topic);
        output.kv("Search", run_config.search_mode.as_str());
        output.kv("Planner", &run_config.bindings.planner.to_string());
        output.kv("Researcher", &run_config.bindings.researcher.to_string());
        output.kv("Writer", &run_config.bindings.writer.to_string());
        output.header("Progress");
    }

    let (sink, mut events) = ChannelSink::new();
    let handle = pipeline.spawn(run_config, Arc::new(sink));

    if !json {
        output.info("Press Ctrl-C to stop the run");
    }

    let token = handle.token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping run");
            token.cancel();
        }
    });

    while let Some(event) = events.recv().await {
        if json {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }
        if let RunEvent::Progress(progress) = &event {
            output.progress(progress);
        }
    }

    let outcome = handle.wait().await;
    if !json {
        output.outcome(&outcome);
    }

    Ok(match outcome {
        RunOutcome::Completed { report } => {
            match report_path {
                Some(path) => {
                    std::fs::write(&path, &report)
                        .with_context(|| format!("writing report to {}", path.display()))?;
                    output.success(&format!("Report written to {}", path.display()));
                }
                None if !json => println!("{}", report),
                None => {}
            }
            ExitCode::SUCCESS
        }
        RunOutcome::Stopped { .. } => ExitCode::from(EXIT_STOPPED),
        RunOutcome::Failed { .. } => ExitCode::FAILURE,
    })
}
