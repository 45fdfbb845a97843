use crate::loader::load_documents;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{debug, warn};
use lore_embeddings::{EmbeddingProvider, EmbeddingService, HashingEmbedder};
use lore_retrieval::{
    CrossEncoderModel, HybridRetrieval, LexicalSearcher, RankedResult, Reranker,
    RerankerProfile, RetrievalConfig, RetrievalError, SearchMethod, SemanticIndex,
    TermOverlapModel,
};
use lore_vector_store::{DocumentStore, VectorStore};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Hybrid search over a fiction project's notes and drafts
#[derive(Debug, Parser)]
#[command(name = "lore", version)]
pub struct LoreCli {
    #[command(subcommand)]
    pub command: LoreCommand,
}

#[derive(Debug, Subcommand)]
pub enum LoreCommand {
    /// Load .md/.txt files into the document store
    Index(IndexArgs),

    /// Search the indexed documents
    Search(SearchArgs),

    /// Show lexical, semantic and hybrid results side by side
    Compare(CompareArgs),

    /// Show store status and statistics
    Status(StatusArgs),

    /// Delete the document store
    Clear(ClearArgs),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// Feature hashing, no model download
    #[default]
    Hashing,
    /// Neural embeddings via fastembed
    Neural,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RerankerKind {
    /// Term overlap heuristic, no model download
    #[default]
    Overlap,
    /// Cross-encoder model via fastembed
    CrossEncoder,
}

#[derive(Debug, Args)]
pub struct StoreArgs {
    /// Path to the document store (defaults to .lore/store.json)
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Embedding provider; must match the one used to index
    #[arg(long, value_enum, default_value_t = EmbedderKind::Hashing)]
    pub embedder: EmbedderKind,
}

#[derive(Debug, Args)]
pub struct RetrievalArgs {
    /// Number of results to return
    #[arg(short = 'k', long = "top-k", default_value_t = 5)]
    pub k: usize,

    /// TOML file with retrieval settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Reranker profile: fast, accurate or multilingual
    #[arg(long, value_name = "PROFILE")]
    pub profile: Option<RerankerProfile>,

    /// Relevance model used for reranking
    #[arg(long, value_enum, default_value_t = RerankerKind::Overlap)]
    pub reranker: RerankerKind,
}

#[derive(Debug, Parser)]
pub struct IndexArgs {
    /// Project directory to load
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Path to the document store (defaults to <DIR>/.lore/store.json)
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = EmbedderKind::Hashing)]
    pub embedder: EmbedderKind,
}

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Search query
    #[arg(value_name = "QUERY")]
    pub query: String,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,

    /// Use semantic search alone instead of hybrid fusion
    #[arg(long)]
    pub no_hybrid: bool,

    /// Skip the reranking stage
    #[arg(long)]
    pub no_rerank: bool,

    /// Show full documents and search statistics
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Parser)]
pub struct CompareArgs {
    /// Search query
    #[arg(value_name = "QUERY")]
    pub query: String,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,
}

#[derive(Debug, Parser)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Debug, Parser)]
pub struct ClearArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl LoreCli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            LoreCommand::Index(args) => run_index(args).await,
            LoreCommand::Search(args) => run_search(args).await,
            LoreCommand::Compare(args) => run_compare(args).await,
            LoreCommand::Status(args) => run_status(args).await,
            LoreCommand::Clear(args) => run_clear(args).await,
        }
    }
}

fn default_store_path(root: &Path) -> PathBuf {
    root.join(".lore").join("store.json")
}

fn resolve_store_path(store: Option<PathBuf>) -> Result<PathBuf> {
    match store {
        Some(path) => Ok(path),
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            Ok(default_store_path(&cwd))
        }
    }
}

async fn create_embedder(kind: EmbedderKind) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(match kind {
        EmbedderKind::Hashing => Arc::new(HashingEmbedder::default()),
        EmbedderKind::Neural => Arc::new(
            EmbeddingService::new()
                .await
                .context("Failed to load embedding model")?,
        ),
    })
}

async fn open_store(path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> Result<VectorStore> {
    VectorStore::new(path, embedder)
        .await
        .with_context(|| format!("Failed to open document store at {}", path.display()))
}

fn load_config(args: &RetrievalArgs) -> Result<RetrievalConfig> {
    let mut config = match &args.config {
        Some(path) => RetrievalConfig::from_toml_file(path)?,
        None => RetrievalConfig::default(),
    };
    if let Some(profile) = args.profile {
        config.reranker_model_profile = profile;
    }
    Ok(config)
}

fn create_reranker(kind: RerankerKind, config: &RetrievalConfig) -> Option<Reranker> {
    match kind {
        RerankerKind::Overlap => Some(Reranker::from_config(
            Arc::new(TermOverlapModel::new()),
            config,
        )),
        RerankerKind::CrossEncoder => match CrossEncoderModel::new(config.reranker_model_profile)
        {
            Ok(model) => Some(Reranker::from_config(Arc::new(model), config)),
            Err(err) => {
                warn!("Continuing without reranker: {err}");
                None
            }
        },
    }
}

async fn open_retrieval(store: StoreArgs, retrieval: &RetrievalArgs) -> Result<HybridRetrieval> {
    let store_path = resolve_store_path(store.store)?;
    if !store_path.exists() {
        anyhow::bail!(
            "No document store at {}. Run 'lore index <DIR>' first.",
            store_path.display()
        );
    }

    let config = load_config(retrieval)?;
    let embedder = create_embedder(store.embedder).await?;
    let document_store: Arc<dyn DocumentStore> =
        Arc::new(open_store(&store_path, Arc::clone(&embedder)).await?);

    let lexical = Arc::new(LexicalSearcher::from_config(&config));
    match lexical.rebuild_from_store(document_store.as_ref()).await {
        Ok(count) => debug!("Lexical index holds {count} documents"),
        Err(RetrievalError::EmptyCollection) => debug!("Document store is empty"),
        Err(err) => warn!("Lexical index unavailable: {err}"),
    }

    let reranker = create_reranker(retrieval.reranker, &config);

    HybridRetrieval::new(
        config,
        Some(lexical),
        Some(SemanticIndex::new(embedder, document_store)),
        reranker,
    )
    .context("Failed to initialize retrieval engine")
}

async fn run_index(args: IndexArgs) -> Result<()> {
    let store_path = args
        .store
        .unwrap_or_else(|| default_store_path(&args.dir));

    println!(
        "{} Loading documents from {}",
        "▶".bright_blue(),
        args.dir.display()
    );
    let documents = load_documents(&args.dir)?;
    let loaded = documents.len();

    let embedder = create_embedder(args.embedder).await?;
    let store = open_store(&store_path, embedder).await?;
    let added = store
        .add(documents)
        .await
        .context("Failed to store documents")?;
    let total = store.count().await?;

    println!("\n{} Indexing complete!", "✓".bright_green());
    println!("  Files loaded: {}", loaded.bright_cyan());
    println!("  New documents: {}", added.bright_cyan());
    println!("  Documents in store: {}", total.bright_cyan());
    println!("  Store: {}", store_path.display().to_string().bright_cyan());

    Ok(())
}

async fn run_search(args: SearchArgs) -> Result<()> {
    let retrieval = open_retrieval(args.store, &args.retrieval).await?;

    let result = retrieval
        .retrieve(&args.query, args.retrieval.k, !args.no_hybrid, !args.no_rerank)
        .await
        .context("Search failed")?;

    print_degradations(&result);

    if result.is_empty() {
        println!("{} No results found", "✗".bright_red());
        return Ok(());
    }

    println!(
        "{} Found {} results in {}ms\n",
        "✓".bright_green(),
        result.len().to_string().bright_cyan(),
        result.stats.total_time_ms.to_string().bright_cyan()
    );

    for ranked in &result.results {
        println!(
            "{}. {}",
            (ranked.rank + 1).to_string().bright_yellow(),
            ranked.document.source().bright_cyan()
        );
        println!(
            "   {} {:.3} {} {}",
            "Score:".bright_black(),
            ranked.score.bright_green(),
            "Method:".bright_black(),
            ranked.method
        );

        if args.verbose {
            for line in ranked.document.content.lines().take(10) {
                println!("   {}", line.dimmed());
            }
            if ranked.document.content.lines().count() > 10 {
                println!("   {}", "...".dimmed());
            }
        } else {
            println!("   {}", ranked.document.preview(160).dimmed());
        }
        println!();
    }

    if args.verbose {
        let stats = &result.stats;
        println!("{}", "Search Statistics:".bright_blue());
        println!(
            "  Retrieval: {}ms ({} lexical, {} semantic, retrieve_k {})",
            stats.retrieval_time_ms, stats.lexical_count, stats.semantic_count, stats.retrieve_k
        );
        println!(
            "  Fusion: {}ms ({} candidates)",
            stats.fusion_time_ms, stats.fused_count
        );
        println!(
            "  Reranking: {}ms{}",
            stats.rerank_time_ms,
            if stats.reranked { "" } else { " (skipped)" }
        );
    }

    Ok(())
}

async fn run_compare(args: CompareArgs) -> Result<()> {
    let retrieval = open_retrieval(args.store, &args.retrieval).await?;

    let methods = retrieval
        .compare_methods(&args.query, args.retrieval.k)
        .await
        .context("Comparison failed")?;

    for (method, documents) in &methods {
        let title = match method {
            SearchMethod::Lexical => "Lexical (BM25)",
            SearchMethod::Semantic => "Semantic (embeddings)",
            SearchMethod::Hybrid => "Hybrid + rerank",
        };
        println!("{} {}", "▶".bright_blue(), title.bold());

        if documents.is_empty() {
            println!("   {}", "no results".dimmed());
        }
        for (i, document) in documents.iter().enumerate() {
            println!(
                "   {}. {} {}",
                (i + 1).to_string().bright_yellow(),
                document.source().bright_cyan(),
                document.preview(80).dimmed()
            );
        }
        println!();
    }

    Ok(())
}

async fn run_status(args: StatusArgs) -> Result<()> {
    let store_path = resolve_store_path(args.store.store)?;

    if !store_path.exists() {
        println!(
            "{} No document store at {}",
            "✗".bright_red(),
            store_path.display()
        );
        println!("  Run 'lore index <DIR>' to create one.");
        return Ok(());
    }

    let embedder = create_embedder(args.store.embedder).await?;
    let embedder_name = embedder.name().to_string();
    let store = open_store(&store_path, embedder).await?;
    let count = store.count().await?;
    let size = std::fs::metadata(&store_path)
        .map(|metadata| metadata.len())
        .unwrap_or(0);

    println!("{} Store Status", "▶".bright_blue());
    println!(
        "  Location: {}",
        store_path.display().to_string().bright_cyan()
    );
    println!("  Documents: {}", count.bright_cyan());
    println!(
        "  Embeddings: {} ({} dims)",
        embedder_name.bright_cyan(),
        store.embedding_dim()
    );
    println!(
        "  Size: {:.2} MB",
        (size as f64 / 1024.0 / 1024.0).bright_cyan()
    );

    Ok(())
}

async fn run_clear(args: ClearArgs) -> Result<()> {
    let store_path = resolve_store_path(args.store.store)?;

    if !store_path.exists() {
        println!(
            "{} No document store at {}",
            "✗".bright_red(),
            store_path.display()
        );
        return Ok(());
    }

    if !args.yes {
        print!(
            "Are you sure you want to remove every document from {}? [y/N] ",
            store_path.display()
        );
        use std::io::{self, Write};
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let embedder = create_embedder(args.store.embedder).await?;
    let store = open_store(&store_path, embedder).await?;
    store.clear().await.context("Failed to clear document store")?;

    println!("{} Store cleared", "✓".bright_green());

    Ok(())
}

fn print_degradations(result: &RankedResult) {
    for degradation in &result.degradations {
        println!("{} {degradation}", "⚠".bright_yellow());
    }
}
