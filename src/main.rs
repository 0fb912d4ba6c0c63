use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use synthesis_cache::cache::{Cache, PackageStore, RefreshOutcome, refresh_sources};
use synthesis_cache::config::{self, Config};
use synthesis_cache::error::QueryError;
use synthesis_cache::parser::SynthesisParser;
use synthesis_cache::query::{QueryEngine, QueryRequest, merge};
use synthesis_cache::source::{Source, load_manifest, select_sources};
use synthesis_cache::version::{PackageStatus, RpmInstalledLookup, classify};

#[derive(Parser)]
#[command(name = "synthesis-cache")]
#[command(version, about = "Query cached package metadata from configured sources")]
struct Cli {
    /// JSON source manifest
    #[arg(long, global = true)]
    sources: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Re-read metadata files whose cache is stale
    Refresh {
        /// Only refresh these sources (by name)
        #[arg(long = "source")]
        names: Vec<String>,
    },
    /// Search packages by name (and optionally summary)
    Query(QueryArgs),
    /// Show freshness of every known source
    Sources,
}

#[derive(Args)]
struct QueryArgs {
    /// Pattern, optionally `name=versionPrefix`; `*` and `?` are wildcards
    pattern: String,

    /// Match the name exactly
    #[arg(long)]
    exact: bool,

    /// Also search summaries
    #[arg(long)]
    summary: bool,

    /// List every source's version instead of only the newest
    #[arg(long)]
    all_versions: bool,

    /// Compare with the installed version
    #[arg(long)]
    status: bool,

    /// Only query these sources (by name)
    #[arg(long = "source")]
    names: Vec<String>,
}

fn init_logging(config: &Config) -> anyhow::Result<WorkerGuard> {
    let log_path = config::log_path();
    let log_dir = log_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_name = log_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "synthesis-cache.log".to_string());
    let appender = tracing_appender::rolling::never(&log_dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

fn load_sources(path: Option<PathBuf>) -> anyhow::Result<Vec<Source>> {
    let path = path.unwrap_or_else(|| config::data_dir().join("sources.json"));
    load_manifest(&path).with_context(|| "loading source manifest".to_string())
}

async fn run_refresh(cache: Arc<Cache>, config: &Config, sources: Vec<Source>) -> anyhow::Result<()> {
    let report = refresh_sources(
        cache,
        Arc::new(SynthesisParser::new()),
        sources,
        config.refresh.max_parallel,
    )
    .await;

    let mut failures = 0;
    for entry in &report {
        match &entry.result {
            Ok(RefreshOutcome::Fresh) => println!("{}: up to date", entry.source_name),
            Ok(RefreshOutcome::Refreshed { packages, skipped }) => {
                println!(
                    "{}: {} packages ({} malformed records skipped)",
                    entry.source_name, packages, skipped
                )
            }
            Err(e) => {
                failures += 1;
                eprintln!("{}: {}", entry.source_name, e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} sources failed to refresh", failures, report.len());
    }
    Ok(())
}

/// Drop cached data of sources no longer listed in the manifest
fn forget_removed_sources(cache: &Cache, sources: &[Source]) -> anyhow::Result<()> {
    for entry in cache.freshness_entries()? {
        if !sources.iter().any(|s| s.id == entry.source_id) {
            tracing::info!("Forgetting removed source {}", entry.source_id);
            cache.forget_source(&entry.source_id)?;
        }
    }
    Ok(())
}

fn run_query(cache: &Cache, sources: &[Source], args: QueryArgs) -> anyhow::Result<()> {
    let selected = select_sources(sources, &args.names);
    let request = QueryRequest::new(args.pattern)
        .exact(args.exact)
        .search_summary(args.summary);

    let outcome = match QueryEngine::new(cache).refresh_and_query(
        &SynthesisParser::new(),
        &selected,
        &request,
    ) {
        Ok(outcome) => outcome,
        Err(e @ QueryError::StaleSources(_)) => {
            anyhow::bail!("{e}\nCheck the metadata files and run `synthesis-cache refresh`.")
        }
        Err(e) => return Err(e.into()),
    };
    for failure in &outcome.failures {
        eprintln!("{}: skipped, {}", failure.source_name, failure.error);
    }

    let lookup = RpmInstalledLookup::new();
    for merged in merge(outcome.matches, args.all_versions) {
        let package = &merged.package;
        let mut line = format!(
            "{}\t{}\t{}\t{}",
            package.name,
            package.version_release(),
            package.arch,
            merged.source_name
        );

        if args.status {
            let status = classify(&lookup, package)
                .with_context(|| format!("checking installed version of {}", package.name))?;
            let status = match status {
                PackageStatus::NotInstalled => "not installed".to_string(),
                PackageStatus::Installed => "installed".to_string(),
                PackageStatus::UpgradeAvailable { local_version } => {
                    format!("upgrade from {local_version}")
                }
                PackageStatus::DowngradeAvailable { local_version } => {
                    format!("downgrade from {local_version}")
                }
            };
            line.push('\t');
            line.push_str(&status);
        }

        println!("{line}");
    }

    Ok(())
}

fn run_sources(cache: &Cache, sources: &[Source]) -> anyhow::Result<()> {
    for source in sources {
        let stored = cache.freshness(&source.id)?;
        let state = match (source.mtime, &stored) {
            (None, _) => "metadata missing".to_string(),
            (Some(_), None) => "never refreshed".to_string(),
            (Some(mtime), Some(entry)) if entry.stored_mtime >= mtime => {
                format!("fresh, {} packages", entry.package_count)
            }
            (Some(_), Some(_)) => "stale".to_string(),
        };
        let enabled = if source.enabled { "enabled" } else { "disabled" };
        println!("{}\t{}\t{}\t{}", source.name, enabled, state, source.url);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config.clone().unwrap_or_else(config::config_path))?;
    let _guard = init_logging(&config)?;

    let sources = load_sources(cli.sources)?;
    let cache = Arc::new(Cache::new(&config.db_path()).context("opening package cache")?);

    match cli.command {
        Command::Refresh { names } => {
            if names.is_empty() {
                forget_removed_sources(&cache, &sources)?;
            }
            let selected = select_sources(&sources, &names)
                .into_iter()
                .cloned()
                .collect();
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(run_refresh(cache, &config, selected))
        }
        Command::Query(args) => run_query(&cache, &sources, args),
        Command::Sources => run_sources(&cache, &sources),
    }
}
