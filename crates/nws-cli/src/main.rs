mod fixture;
mod store;
mod writer;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::{env, io};

use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use nws_crawler::replay::ReplaySession;
use nws_crawler::{
    crawl_news, CrawlConfig, CrawlMode, CrawlerConfig, Lookaside, NoLookaside, Period,
    PresetPeriod,
};
use tokio::runtime;

use crate::fixture::load_result_set;
use crate::store::KnownStore;
use crate::writer::{default_output_file, write_records, CsvTerminator, CsvWriterConfig, OutputFormat};

/// News result crawler
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    #[command(name = "crawl")]
    Crawl(CrawlArgs),
    #[command(hide = true)]
    Completion,
}

/// Crawl a captured result set and write the collected articles
#[derive(Debug, clap::Args)]
pub struct CrawlArgs {
    /// Captured result set (yaml, or json by extension) replayed as the search page
    #[arg(long)]
    pub fixture: PathBuf,
    /// Optional yaml crawl configuration: query, categories, period
    #[arg(long)]
    pub query: Option<PathBuf>,
    /// Override the searched keyword
    #[arg(long, short)]
    pub keyword: Option<String>,
    /// Add a unified category filter
    #[arg(long = "category")]
    pub categories: Vec<String>,
    /// Add an incident category filter
    #[arg(long = "incident")]
    pub incidents: Vec<String>,
    /// Preset search period
    #[arg(value_enum, long, conflicts_with_all = ["from", "to"])]
    pub preset: Option<PresetPeriod>,
    /// Start of an explicit search period (YYYY-MM-DD)
    #[arg(long, requires = "to")]
    pub from: Option<NaiveDate>,
    /// End of an explicit search period (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    pub to: Option<NaiveDate>,
    /// Maximum number of articles to collect
    #[arg(long)]
    pub max_records: Option<usize>,
    /// Optional default crawler yaml configuration file
    #[arg(env = "NWS_CRAWLER_CONFIG", long)]
    pub crawler_config: Option<PathBuf>,
    /// Override crawler's number of workers
    #[arg(long)]
    pub num_workers: Option<usize>,
    /// Override crawler's mode
    #[arg(value_enum, long)]
    pub mode: Option<CrawlMode>,
    /// Override crawler's global deadline in milliseconds
    #[arg(long)]
    pub deadline_ms: Option<u64>,
    /// No SIGINT handling
    #[arg(long)]
    pub no_sigint: bool,
    /// JSON file of already stored articles, their detail view is skipped
    #[arg(long)]
    pub known: Option<PathBuf>,
    /// Store the collected articles into the `--known` file
    #[arg(long, requires = "known")]
    pub persist: bool,
    /// Output file, `-` for stdout, defaults to `{year}_{keyword}_article.{ext}`
    #[arg(long, short)]
    pub output_file: Option<PathBuf>,
    #[arg(value_enum, long, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,
    /// CSV field delimiter
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,
    /// Terminate CSV lines with CRLF
    #[arg(long)]
    pub crlf: bool,
    /// When quiet no logs are outputted
    #[arg(long, short)]
    pub quiet: bool,
}

impl TryFrom<&CrawlArgs> for CrawlerConfig {
    type Error = anyhow::Error;

    fn try_from(args: &CrawlArgs) -> Result<Self, Self::Error> {
        let mut conf = if let Some(file) = args.crawler_config.as_ref().map(File::open) {
            serde_yaml::from_reader(file?)?
        } else {
            CrawlerConfig::default()
        };
        if let Some(num_workers) = args.num_workers {
            conf.num_workers = Some(num_workers);
        }
        if let Some(mode) = args.mode {
            conf.mode = mode;
        }
        if let Some(deadline_ms) = args.deadline_ms {
            conf.deadline_ms = Some(deadline_ms);
        }
        if args.no_sigint {
            conf.handle_sigint = false;
        }
        Ok(conf)
    }
}

impl TryFrom<&CrawlArgs> for CrawlConfig {
    type Error = anyhow::Error;

    fn try_from(args: &CrawlArgs) -> Result<Self, Self::Error> {
        let mut conf = if let Some(file) = args.query.as_ref().map(File::open) {
            serde_yaml::from_reader(file?)?
        } else {
            CrawlConfig::new("")
        };
        if let Some(keyword) = &args.keyword {
            conf.query = keyword.to_string();
        }
        conf.unified_categories.extend(args.categories.iter().cloned());
        conf.incident_categories.extend(args.incidents.iter().cloned());
        if let Some(preset) = args.preset {
            conf.period = Period::Preset(preset);
        }
        if let (Some(start), Some(end)) = (args.from, args.to) {
            conf.period = Period::Range { start, end };
        }
        if let Some(max_records) = args.max_records {
            conf.max_records = Some(max_records);
        }
        conf.validate()?;
        Ok(conf)
    }
}

pub fn crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let crawler_conf = CrawlerConfig::try_from(&args)?;
    let crawl_conf = CrawlConfig::try_from(&args)?;
    let result_set = load_result_set(&args.fixture)?;

    let mut store = args.known.as_deref().map(KnownStore::load).transpose()?;
    let lookaside: Arc<dyn Lookaside> = match &store {
        Some(store) => store.lookaside(),
        None => Arc::new(NoLookaside),
    };

    let output = match &args.output_file {
        Some(path) if path.as_os_str() == "-" => None,
        Some(path) => Some(path.clone()),
        None => Some(default_output_file(
            crawl_conf.year(),
            &crawl_conf.query,
            args.format,
        )),
    };
    let csv_conf = CsvWriterConfig {
        delimiter: args.delimiter,
        terminator: if args.crlf {
            CsvTerminator::CRLF
        } else {
            CsvWriterConfig::default().terminator
        },
    };
    csv_conf.validate()?;
    let scope = crawler_conf.lookaside_scope.clone();

    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    let merged = rt.block_on(crawl_news::<ReplaySession>(
        crawler_conf,
        Arc::new(result_set),
        crawl_conf,
        lookaside,
    ));
    // Never block the exit on a blocking task still unwinding
    rt.shutdown_background();
    let merged = merged?;

    let stats = &merged.stats;
    log::info!(
        "{} articles from {} workers ({} incomplete, {} timed out), {} pages, {} failures, {} known",
        merged.records.len(),
        stats.workers,
        stats.workers_incomplete,
        stats.workers_timed_out,
        stats.pages_visited,
        stats.failures,
        stats.known
    );
    if stats.interrupted {
        log::warn!("Crawl was interrupted, writing the partial result");
    }

    write_records(&merged.records, args.format, output.as_deref(), &csv_conf)?;
    if let Some(path) = &output {
        log::info!("Articles written to {path:?}");
    }

    if args.persist {
        if let Some(store) = store.as_mut() {
            let stored = store.persist(&merged.records, &scope)?;
            log::info!("Stored {stored} articles in scope {scope:?}");
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.cmd {
        SubCommand::Crawl(args) => {
            if !args.quiet {
                if env::var_os("RUST_LOG").is_none() {
                    env::set_var("RUST_LOG", "nws_crawler=info,nws=info");
                }
                env_logger::init();
            }
            crawl(args)
        }
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "nws", &mut io::stdout());
            Ok(())
        }
    }
}
