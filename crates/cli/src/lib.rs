use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use column_session::{
    ChatAugmenter, ChatAugmenterConfig, CorpusLoader, FileCorpusLoader, LabelAugmenter,
    QuerySession, SessionDeps, SessionOptions, StartupReport,
};
use column_vector_store::{
    EmbeddingProvider, OpenAiEmbeddings, OpenAiEmbeddingsConfig, SnapshotStore, StubEmbeddings,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

pub mod config;
mod report;

use config::{EmbedMode, FileConfig, Overrides, Settings};
use report::{describe_startup, render_results, render_stats, ConsoleReporter, ProgressPrinter};

#[derive(Parser)]
#[command(name = "column-finder")]
#[command(about = "Semantic search over database column names", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Config file (default: ./column-finder.toml when present)
    #[arg(long, global = true, env = "COLUMN_FINDER_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: OverrideArgs,
}

#[derive(Args)]
struct OverrideArgs {
    /// Corpus file: schema export (*.json) or one label per line
    #[arg(long, global = true, env = "COLUMN_FINDER_CORPUS")]
    corpus: Option<PathBuf>,

    /// Keep only tables starting with these prefixes (comma-separated)
    #[arg(
        long = "table-prefix",
        global = true,
        value_delimiter = ',',
        env = "COLUMN_FINDER_TABLE_PREFIXES"
    )]
    table_prefixes: Vec<String>,

    /// Snapshot file (default: column_embeddings/column_embeddings.json)
    #[arg(long, global = true, env = "COLUMN_FINDER_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Embedding backend
    #[arg(long, global = true, value_enum, env = "COLUMN_FINDER_EMBEDDING_MODE")]
    embed_mode: Option<EmbedMode>,

    /// Embedding model id
    #[arg(long, global = true, env = "COLUMN_FINDER_EMBEDDING_MODEL")]
    embed_model: Option<String>,

    /// Vector dimension for the stub backend
    #[arg(long, global = true)]
    stub_dimension: Option<usize>,

    /// Chat model used to describe labels
    #[arg(long, global = true, env = "COLUMN_FINDER_CHAT_MODEL")]
    chat_model: Option<String>,

    /// Language of the generated label descriptions
    #[arg(long, global = true)]
    language: Option<String>,

    /// Embed raw labels without asking the chat model for descriptions
    #[arg(long, global = true)]
    no_augment: bool,

    /// API key for the embedding and chat endpoints
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    api_base: Option<String>,

    /// Results per query
    #[arg(long, global = true)]
    top_k: Option<usize>,

    /// Delay between embedding calls while generating (ms)
    #[arg(long, global = true)]
    throttle_ms: Option<u64>,

    /// Per-request timeout for provider calls (seconds)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

impl From<OverrideArgs> for Overrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            corpus: args.corpus,
            table_prefixes: args.table_prefixes,
            snapshot: args.snapshot,
            embed_mode: args.embed_mode,
            embed_model: args.embed_model,
            stub_dimension: args.stub_dimension,
            chat_model: args.chat_model,
            language: args.language,
            no_augment: args.no_augment,
            api_key: args.api_key,
            api_base: args.api_base,
            top_k: args.top_k,
            throttle_ms: args.throttle_ms,
            timeout_secs: args.timeout_secs,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load or build the index, then answer queries from stdin (default)
    Run,

    /// Regenerate the snapshot from the corpus
    Build(JsonArgs),

    /// Answer a single query
    Search(SearchArgs),

    /// Show index statistics
    Stats(JsonArgs),
}

#[derive(Args)]
struct JsonArgs {
    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SearchArgs {
    /// Search query
    query: String,

    /// Maximum number of results (defaults to --top-k)
    #[arg(long, short = 'n')]
    limit: Option<usize>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    results: Vec<column_vector_store::SearchResult>,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();
    let command = cli.command.take().unwrap_or(Commands::Run);

    // Keep stdout clean for JSON consumers
    let json_output = match &command {
        Commands::Build(args) | Commands::Stats(args) => args.json,
        Commands::Search(args) => args.json,
        Commands::Run => false,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.filter_module("reqwest", log::LevelFilter::Warn);
    builder.target(env_logger::Target::Stderr).init();

    let file = FileConfig::discover(cli.config.as_deref())?;
    let settings = Settings::resolve(file, cli.overrides.into());
    log::debug!(
        "Corpus {}, snapshot {}, embedding {:?}/{}, top-k {}",
        settings.corpus.display(),
        settings.snapshot.display(),
        settings.embed_mode,
        settings.embed_model,
        settings.top_k
    );

    match command {
        Commands::Run => run_interactive(&settings, !cli.quiet).await,
        Commands::Build(args) => run_build(&settings, args, !cli.quiet).await,
        Commands::Search(args) => run_search(&settings, args).await,
        Commands::Stats(args) => run_stats(&settings, args).await,
    }
}

fn build_embedder(settings: &Settings) -> Result<Arc<dyn EmbeddingProvider>> {
    match settings.embed_mode {
        EmbedMode::Stub => Ok(Arc::new(StubEmbeddings::new(settings.stub_dimension))),
        EmbedMode::Openai => {
            let config = OpenAiEmbeddingsConfig::new(settings.require_api_key()?)
                .with_model(&settings.embed_model)
                .with_base_url(&settings.api_base)
                .with_timeout(settings.timeout);
            Ok(Arc::new(
                OpenAiEmbeddings::new(config).context("Failed to create embedding client")?,
            ))
        }
    }
}

/// Descriptions come from the chat endpoint, so the stub backend never augments.
fn build_augmenter(settings: &Settings) -> Result<Option<Arc<dyn LabelAugmenter>>> {
    if !settings.augment || settings.embed_mode == EmbedMode::Stub {
        return Ok(None);
    }
    let mut config = ChatAugmenterConfig::new(settings.require_api_key()?);
    config.model.clone_from(&settings.chat_model);
    config.base_url.clone_from(&settings.api_base);
    config.language.clone_from(&settings.language);
    let augmenter = ChatAugmenter::new(config).context("Failed to create chat client")?;
    Ok(Some(Arc::new(augmenter)))
}

fn build_store(settings: &Settings) -> SnapshotStore {
    SnapshotStore::new(&settings.snapshot)
        .with_throttle(settings.throttle)
        .with_embed_timeout(Some(settings.timeout))
}

async fn start_session(
    settings: &Settings,
    force_rebuild: bool,
    show_progress: bool,
) -> Result<(QuerySession, StartupReport)> {
    let loader: Arc<dyn CorpusLoader> = Arc::new(
        FileCorpusLoader::new(&settings.corpus)
            .with_table_prefixes(settings.table_prefixes.clone()),
    );
    let deps = SessionDeps {
        loader,
        embedder: build_embedder(settings)?,
        augmenter: build_augmenter(settings)?,
    };
    let options = SessionOptions {
        top_k: settings.top_k,
        force_rebuild,
    };
    let store = build_store(settings);
    let mut progress = ProgressPrinter::new(show_progress);

    let (session, report) = QuerySession::start_with_observer(&store, deps, options, &mut progress)
        .await
        .with_context(|| {
            format!(
                "Failed to prepare index from {} (snapshot {})",
                settings.corpus.display(),
                settings.snapshot.display()
            )
        })?;
    log::info!("{}", describe_startup(&report));
    Ok((session, report))
}

async fn run_interactive(settings: &Settings, chatty: bool) -> Result<()> {
    let (session, _) = start_session(settings, false, chatty).await?;
    print!("{}", render_stats(&session.stats()));
    println!("Enter a search phrase ('exit' or an empty line to quit)");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut reporter = ConsoleReporter::new(true);
    let answered = session.run(stdin, &mut reporter).await?;
    log::debug!("Answered {answered} queries");
    Ok(())
}

async fn run_build(settings: &Settings, args: JsonArgs, chatty: bool) -> Result<()> {
    let (_, report) = start_session(settings, true, chatty && !args.json).await?;
    let StartupReport::Regenerated { save, .. } = &report else {
        anyhow::bail!("Rebuild did not regenerate the snapshot");
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(save)?);
    } else {
        println!("{}", describe_startup(&report));
    }
    Ok(())
}

async fn run_search(settings: &Settings, args: SearchArgs) -> Result<()> {
    let (session, _) = start_session(settings, false, !args.json).await?;
    let limit = args.limit.unwrap_or(session.top_k());
    let results = session
        .query_top(&args.query, limit)
        .await
        .with_context(|| format!("Search failed for '{}'", args.query))?;

    if args.json {
        let output = SearchOutput {
            query: &args.query,
            results,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", render_results(&results));
    }
    Ok(())
}

async fn run_stats(settings: &Settings, args: JsonArgs) -> Result<()> {
    let (session, _) = start_session(settings, false, !args.json).await?;
    let stats = session.stats();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", render_stats(&stats));
    }
    Ok(())
}
