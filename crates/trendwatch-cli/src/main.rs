use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trendwatch_core::{
    hand_off, Config, ExportFormat, Exporter, FallbackSummarizer, Notifier, Pipeline, RunRequest,
    TrendingReport,
};
use trendwatch_store::NoveltyStore;

#[derive(Parser)]
#[command(name = "trendwatch")]
#[command(version, about = "Finds repositories that just started trending", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Fetch, classify and rank today's trending repositories
    Run {
        /// daily, weekly or monthly
        #[arg(long)]
        period: Option<String>,
        /// Language filter; empty for all
        #[arg(long)]
        language: Option<String>,
        /// Max repositories to fetch
        #[arg(long)]
        limit: Option<usize>,
        /// text, json, csv or md
        #[arg(long, default_value = "text")]
        format: String,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Read history but don't record this run
        #[arg(long)]
        dry_run: bool,
    },
    /// Show what the history database knows
    Stats,
    /// Drop observations older than the retention window
    Prune {
        /// Keep this many days (defaults to novelty.retention_days)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand)]
enum ConfigAction {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging - helps when things go sideways
    let default_filter = if cli.verbose {
        "trendwatch=debug"
    } else {
        "trendwatch=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };

    match cli.command {
        Commands::Run {
            period,
            language,
            limit,
            format,
            output,
            dry_run,
        } => {
            let mut config = Config::load_from(&config_path)?;
            if let Some(period) = period {
                config.trending.period = period;
            }
            if let Some(language) = language {
                config.trending.language = language;
            }
            if let Some(limit) = limit {
                config.trending.limit = limit;
            }
            config.validate()?;
            let format: ExportFormat = format.parse()?;

            let mut request = RunRequest::from_config(&config)?;
            request.dry_run = dry_run;
            run(&config, &request, format, output.as_deref()).await?;
        }
        Commands::Stats => {
            let config = Config::load_from(&config_path)?;
            let store = NoveltyStore::new(config.db_path()?);
            let stats = store.session()?.statistics(today())?;

            println!("History: {}", store.path().display());
            println!("  Repositories tracked: {}", stats.total_repositories);
            println!("  Observations:         {}", stats.total_observations);
            println!("  First seen today:     {}", stats.first_seen_today);
        }
        Commands::Prune { days } => {
            let config = Config::load_from(&config_path)?;
            let days = days.unwrap_or(config.novelty.retention_days);
            let cutoff = today() - chrono::Duration::days(i64::from(days));

            let store = NoveltyStore::new(config.db_path()?);
            let removed = store.session()?.prune_before(cutoff)?;
            println!("Removed {} observations from before {}", removed, cutoff);
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists (use --force to overwrite)",
                        config_path.display()
                    );
                }
                Config::default().save_to(&config_path)?;
                println!("Wrote default config to {}", config_path.display());
            }
            ConfigAction::Show => {
                let mut config = Config::load_from(&config_path)?;
                if config.enrichment.token.is_some() {
                    config.enrichment.token = Some("********".into());
                }
                println!("# {}", config_path.display());
                print!("{}", toml::to_string_pretty(&config)?);
            }
        },
    }

    Ok(())
}

async fn run(
    config: &Config,
    request: &RunRequest,
    format: ExportFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let store = NoveltyStore::new(config.db_path()?);

    let report = pipeline.run(&store, request, today()).await?;

    if report.is_empty() {
        println!("No new data available");
        return Ok(());
    }

    match output {
        Some(path) => {
            Exporter::export_to_file_with_format(&report, path, format)
                .with_context(|| format!("writing report to {}", path.display()))?;
            println!(
                "Wrote {} entries ({} new) to {}",
                report.entries.len(),
                report.new_count,
                path.display()
            );
        }
        None => {
            hand_off(&report, &FallbackSummarizer, &StdoutNotifier { format }).await?;
        }
    }

    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Prints the report; text gets the per-entry summaries inline
struct StdoutNotifier {
    format: ExportFormat,
}

#[async_trait::async_trait]
impl Notifier for StdoutNotifier {
    async fn notify(
        &self,
        report: &TrendingReport,
        summaries: &[String],
    ) -> trendwatch_core::Result<()> {
        if self.format != ExportFormat::Text {
            print!("{}", Exporter::render(report, self.format)?);
            return Ok(());
        }

        println!(
            "Trending {} ({}): {} fetched, {} new\n",
            report.period.display_name().to_lowercase(),
            report.language.as_deref().unwrap_or("all languages"),
            report.total_fetched,
            report.new_count
        );
        for (entry, summary) in report.entries.iter().zip(summaries) {
            println!(
                "{:>3}. {} [{}] {:.3}  {}",
                entry.rank,
                entry.candidate.id,
                entry.novelty.label(),
                entry.composite_score,
                entry.candidate.id.html_url()
            );
            for line in summary.lines().filter(|l| l.trim() != "---") {
                println!("     {}", line);
            }
        }
        Ok(())
    }
}
