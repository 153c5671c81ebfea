use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tabx_api::{AppState, RestApi};
use tabx_core::{Embedder, EmbedderBuilder, DEFAULT_EMBEDDING_DIM};
use tabx_matcher::{MatcherConfig, QueryMatcher, QueryResult, SnapshotBuilder, SnapshotHandle};
use tabx_schema::{AnalyzerConfig, SchemaAnalyzer};
use tabx_storage::{load_csv, ArtifactStore, CsvOptions, MemoryCache};
use tabx_templates::{GeneratorConfig, TemplateGenerator};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Natural-language queries over tabular data
#[derive(Parser, Debug)]
#[command(name = "tabx")]
#[command(about = "Ask questions of a CSV file in plain language", long_about = None)]
struct Args {
    /// Directory holding the persisted schema and templates
    #[arg(short, long, default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a dataset, generate its templates and persist both
    Setup(DatasetArgs),
    /// Print the persisted schema
    Info,
    /// Load a dataset and serve the HTTP API
    Serve {
        #[command(flatten)]
        dataset: DatasetArgs,

        /// HTTP API port
        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// Minimum template similarity for a hit (inclusive)
        #[arg(long, default_value_t = 0.6)]
        min_score: f32,

        /// Minimum trigram similarity for a fuzzy item match
        #[arg(long, default_value_t = 0.5)]
        fuzzy_threshold: f32,

        /// Time budget for embedding and retrieval per request, in milliseconds
        #[arg(long, default_value_t = 2000)]
        time_budget_ms: u64,

        /// Maximum number of cached sub-query results; 0 disables the cache
        #[arg(long, default_value_t = 10_000)]
        cache_size: u64,

        /// Lifetime of a cached result, in seconds
        #[arg(long, default_value_t = 300)]
        cache_ttl_secs: u64,
    },
}

#[derive(ClapArgs, Debug)]
struct DatasetArgs {
    /// Path to the CSV dataset
    csv: PathBuf,

    /// Normalize column names (lowercase, non-word runs to underscores)
    #[arg(long)]
    clean_columns: bool,

    /// Noun used for rows in count templates ("how many items do we have")
    #[arg(long, default_value = "items")]
    row_noun: String,

    /// Embedding dimension
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIM)]
    dim: usize,
}

impl DatasetArgs {
    fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            clean_columns: self.clean_columns,
            ..CsvOptions::default()
        }
    }

    fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig::default().row_noun(self.row_noun.as_str())
    }

    fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::new(EmbedderBuilder::new().dimension(self.dim).build())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Setup(dataset) => setup(&args.data_dir, &dataset),
        Command::Info => print_info(&args.data_dir),
        Command::Serve {
            dataset,
            port,
            min_score,
            fuzzy_threshold,
            time_budget_ms,
            cache_size,
            cache_ttl_secs,
        } => {
            let config = MatcherConfig::default()
                .min_score(min_score)
                .fuzzy_threshold(fuzzy_threshold)
                .time_budget(Duration::from_millis(time_budget_ms))
                .cache_ttl(Duration::from_secs(cache_ttl_secs));
            serve(&args.data_dir, dataset, config, cache_size, port).await
        }
    }
}

fn setup(data_dir: &Path, dataset: &DatasetArgs) -> anyhow::Result<()> {
    let table = load_csv(&dataset.csv, &dataset.csv_options())
        .with_context(|| format!("failed to read {:?}", dataset.csv))?;
    let schema = SchemaAnalyzer::new(AnalyzerConfig::default()).analyze(&table)?;

    let embedder = dataset.embedder();
    let set = TemplateGenerator::new(dataset.generator_config()).generate_set(&schema, embedder.as_ref());

    let artifacts = ArtifactStore::new(data_dir)?;
    artifacts.save_schema(&schema)?;
    artifacts.save_templates(&set)?;

    println!("Dataset:    {} ({} rows)", schema.table_name(), schema.row_count());
    for column in schema.columns() {
        let marker = if column.is_identifying { " [identifying]" } else { "" };
        println!(
            "  {:<24} {:<12} label '{}'{}",
            column.name,
            column.semantic_type.as_str(),
            column.label,
            marker
        );
    }
    println!("Templates:  {}", set.templates.len());
    println!("Written to: {:?}", artifacts.data_dir());
    Ok(())
}

fn print_info(data_dir: &Path) -> anyhow::Result<()> {
    let artifacts = ArtifactStore::new(data_dir)?;
    let schema = artifacts
        .load_schema()?
        .with_context(|| format!("no schema in {:?}; run `tabx setup <csv>` first", data_dir))?;
    println!("{}", serde_json::to_string_pretty(&schema)?);

    if let Some(set) = artifacts.load_templates()? {
        println!("{} templates (embedding dimension {})", set.templates.len(), set.embedding_dim);
    }
    Ok(())
}

async fn serve(
    data_dir: &Path,
    dataset: DatasetArgs,
    config: MatcherConfig,
    cache_size: u64,
    port: u16,
) -> anyhow::Result<()> {
    info!("Starting tabx v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", data_dir);
    info!("Dataset: {:?}", dataset.csv);

    let builder = SnapshotBuilder::new(dataset.embedder())
        .csv_options(dataset.csv_options())
        .generator_config(dataset.generator_config())
        .artifacts(ArtifactStore::new(data_dir)?);

    // Dataset errors are fatal at startup
    let snapshot = builder
        .build_from_csv(&dataset.csv, 1)
        .with_context(|| format!("failed to load {:?}", dataset.csv))?;
    let handle = Arc::new(SnapshotHandle::new(snapshot));

    let mut matcher = QueryMatcher::new(handle, config);
    if cache_size > 0 {
        let cache: Arc<MemoryCache<QueryResult>> = Arc::new(MemoryCache::new(cache_size));
        matcher = matcher.with_cache(cache);
    }

    let state = Arc::new(AppState::new(Arc::new(matcher), Arc::new(builder), dataset.csv));

    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(state, port).await {
                tracing::error!("HTTP server error: {}", e);
            }
        })
    });

    info!("tabx started successfully");
    info!("HTTP API: http://localhost:{}/", port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}
