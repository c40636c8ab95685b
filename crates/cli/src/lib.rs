use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use passage_search::{
    ContextConsumer, PromptContext, RetrievalConfig, RetrievedPassage, Retriever, ScoringFormula,
};
use passage_vector_store::{
    read_jsonl, Corpus, CorpusStorage, Embedder, HashEmbedder, JsonCorpusStorage,
};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "passage-finder")]
#[command(about = "Retrieve the most relevant corpus passages for a query", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a corpus file from JSON Lines passages
    Index(IndexArgs),

    /// Retrieve ranked passages for a query
    Retrieve(RetrieveArgs),

    /// Print the effective retrieval configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct IndexArgs {
    /// JSON Lines input: {"text": "...", "vector": [...]} per line
    #[arg(long)]
    input: PathBuf,

    /// Corpus file to write
    #[arg(long, default_value = "corpus.json")]
    output: PathBuf,

    /// Dimension of the built-in hash embedder used for passages without vectors
    #[arg(long, default_value_t = HashEmbedder::DEFAULT_DIMENSION)]
    dimension: usize,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RetrieveArgs {
    /// Query text
    query: String,

    /// Corpus file built by `index`
    #[arg(long, default_value = "corpus.json")]
    corpus: PathBuf,

    #[command(flatten)]
    retrieval: RetrievalArgs,

    /// Precomputed query vector (comma-separated); skips query embedding
    #[arg(long, value_delimiter = ',', num_args = 1.., allow_hyphen_values = true)]
    query_vector: Option<Vec<f32>>,

    /// Also print the generation prompt built from the results
    #[arg(long)]
    prompt: bool,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(flatten)]
    retrieval: RetrievalArgs,
}

#[derive(Args)]
struct RetrievalArgs {
    /// Retrieval config file (JSON or TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Nearest neighbours fetched before re-ranking
    #[arg(long)]
    pool_size: Option<usize>,

    /// Passages returned after re-ranking
    #[arg(long)]
    top_k: Option<usize>,

    /// Relevance formula used by the re-ranker: reference, similarity or similarity-minus-heuristic
    #[arg(long, value_parser = clap::value_parser!(ScoringFormula))]
    formula: Option<ScoringFormula>,
}

impl RetrievalArgs {
    fn resolve(&self) -> Result<RetrievalConfig> {
        let base = match &self.config {
            Some(path) => RetrievalConfig::from_file(path)?,
            None => RetrievalConfig::default(),
        };
        let config = base.with_overrides(self.pool_size, self.top_k, self.formula);
        config.validate()?;
        Ok(config)
    }
}

#[derive(Serialize)]
struct IndexOutput {
    corpus: PathBuf,
    passages: usize,
    dimension: usize,
    time_ms: u128,
}

#[derive(Serialize)]
struct RetrieveOutput {
    query: String,
    config: RetrievalConfig,
    results: Vec<RetrievedPassage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<String>,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON consumers
    let json_output = match &cli.command {
        Commands::Index(args) => args.json,
        Commands::Retrieve(args) => args.json,
        Commands::Config(_) => true,
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
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Index(args) => run_index(args).await?,
        Commands::Retrieve(args) => run_retrieve(args).await?,
        Commands::Config(args) => run_config(&args)?,
    }
    Ok(())
}

/// Import passages, embed the ones without vectors and persist the corpus
async fn run_index(args: IndexArgs) -> Result<()> {
    let started = Instant::now();
    let embedder = HashEmbedder::new(args.dimension)?;
    let entries = read_jsonl(&args.input)
        .await
        .with_context(|| format!("Failed to import passages from {}", args.input.display()))?;
    if entries.is_empty() {
        bail!("No passages found in {}", args.input.display());
    }

    let corpus = Corpus::from_entries(entries, &embedder)?;
    JsonCorpusStorage::new(&args.output)
        .save(&corpus)
        .await
        .with_context(|| format!("Failed to write corpus {}", args.output.display()))?;

    let output = IndexOutput {
        corpus: args.output.clone(),
        passages: corpus.len(),
        dimension: corpus.dimension(),
        time_ms: started.elapsed().as_millis(),
    };
    if args.json {
        print_stdout(&serde_json::to_string_pretty(&output)?)?;
    } else {
        eprintln!(
            "Indexed {} passages ({} dimensions) into {} in {}ms",
            output.passages,
            output.dimension,
            output.corpus.display(),
            output.time_ms
        );
    }
    Ok(())
}

/// Retrieve ranked passages from a saved corpus
async fn run_retrieve(args: RetrieveArgs) -> Result<()> {
    let config = args.retrieval.resolve()?;
    let retriever = load_retriever(&args.corpus, config).await?;

    let results = match &args.query_vector {
        Some(vector) => retriever.search_vector(vector, config.pool_size, config.top_k)?,
        None => retriever.search(&args.query, config.pool_size, config.top_k)?,
    };

    let prompt = if args.prompt {
        let passages: Vec<_> = results.iter().map(|r| r.passage.clone()).collect();
        Some(PromptContext::default().consume(&args.query, &passages)?)
    } else {
        None
    };

    if args.json {
        let output = RetrieveOutput {
            query: args.query,
            config,
            results,
            prompt,
        };
        print_stdout(&serde_json::to_string_pretty(&output)?)?;
        return Ok(());
    }

    let mut lines: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(rank, result)| format!("{}. {}", rank + 1, result.passage.text))
        .collect();
    if let Some(prompt) = prompt {
        lines.push(String::new());
        lines.push(prompt);
    }
    print_stdout(&lines.join("\n"))
}

fn run_config(args: &ConfigArgs) -> Result<()> {
    let config = args.retrieval.resolve()?;
    print_stdout(&serde_json::to_string_pretty(&config)?)
}

async fn load_retriever(corpus_path: &Path, config: RetrievalConfig) -> Result<Retriever> {
    let storage = JsonCorpusStorage::new(corpus_path);
    let corpus = storage
        .load()
        .await
        .with_context(|| format!("Failed to load corpus {}", corpus_path.display()))?;

    // Queries are embedded in the same space the corpus was indexed with.
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(corpus.dimension())?);
    Ok(Retriever::with_corpus(embedder, config, corpus)?)
}
